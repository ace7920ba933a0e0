//! Construction et mise en cache du schéma d'un service
//!
//! Le [`SchemaBuilder`] est le seul à écrire le schéma en mémoire. Chaque
//! reconstruction produit une table complète avant de la publier : deux
//! reconstructions concurrentes sont possibles, la dernière l'emporte.

use crate::cache::{FUNCTIONS_KEY, SchemaCache, TYPES_KEY};
use crate::dispatch::OperationTable;
use crate::error::Result;
use crate::functions::{FunctionsTable, build_functions_table};
use crate::transport::SoapTransport;
use crate::types::{ParseReport, TypesTable, parse_types};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// Tables `functions` et `types` d'une même découverte
#[derive(Debug, Clone, Default)]
pub struct SchemaSnapshot {
    pub functions: Arc<FunctionsTable>,
    pub types: Arc<TypesTable>,
}

#[derive(Default)]
struct SchemaState {
    functions: Arc<FunctionsTable>,
    types: Arc<TypesTable>,
    operations: Arc<OperationTable>,
    report: ParseReport,
}

/// Schéma d'un service : état en mémoire + miroir dans le cache
pub struct SchemaBuilder {
    transport: Arc<dyn SoapTransport>,
    cache: SchemaCache,
    state: RwLock<SchemaState>,
}

impl SchemaBuilder {
    pub fn new(transport: Arc<dyn SoapTransport>, cache: SchemaCache) -> Self {
        Self {
            transport,
            cache,
            state: RwLock::new(SchemaState::default()),
        }
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    /// Table des types
    ///
    /// # Arguments
    ///
    /// * `refresh` - Ignore la table en mémoire (le cache est tout de même consulté)
    pub async fn get_types(&self, refresh: bool) -> Result<Arc<TypesTable>> {
        if !refresh {
            let current = self.state.read().types.clone();
            if !current.is_empty() {
                return Ok(current);
            }
        }

        if let Some(cached) = self.cache.get::<TypesTable>(TYPES_KEY).await {
            let cached = Arc::new(cached);
            let mut state = self.state.write();
            state.types = cached.clone();
            // table relue du cache : aucun rejet à signaler
            state.report.parsed_types = cached.len();
            state.report.dropped_types = 0;
            state.report.dropped_fields = 0;
            return Ok(cached);
        }

        let raws = self.transport.types().await?;
        let (types, report) = parse_types(&raws);
        info!(
            parsed = report.parsed_types,
            dropped = report.dropped_types,
            dropped_fields = report.dropped_fields,
            "SOAP types table rebuilt"
        );

        self.cache.put(TYPES_KEY, &types, true).await;

        let types = Arc::new(types);
        {
            let mut state = self.state.write();
            state.types = types.clone();
            state.report.parsed_types = report.parsed_types;
            state.report.dropped_types = report.dropped_types;
            state.report.dropped_fields = report.dropped_fields;
        }
        Ok(types)
    }

    /// Table des opérations, indexée par nom en minuscules
    ///
    /// Installe aussi la table de dispatch correspondante.
    pub async fn get_functions(&self, refresh: bool) -> Result<Arc<FunctionsTable>> {
        if !refresh {
            let current = self.state.read().functions.clone();
            if !current.is_empty() {
                return Ok(current);
            }
        }

        if let Some(cached) = self.cache.get::<FunctionsTable>(FUNCTIONS_KEY).await {
            return Ok(self.install_functions(cached, None));
        }

        let raws = self.transport.functions().await?;
        let types = self.get_types(refresh).await?;

        let mut report = ParseReport::default();
        let functions = build_functions_table(&raws, &types, &mut report);
        info!(
            parsed = report.parsed_functions,
            dropped = report.dropped_functions,
            "SOAP functions table rebuilt"
        );

        self.cache.put(FUNCTIONS_KEY, &functions, false).await;
        Ok(self.install_functions(functions, Some(report)))
    }

    fn install_functions(
        &self,
        functions: FunctionsTable,
        report: Option<ParseReport>,
    ) -> Arc<FunctionsTable> {
        let operations = Arc::new(OperationTable::from_functions(&functions, &self.transport));
        let functions = Arc::new(functions);

        let mut state = self.state.write();
        state.functions = functions.clone();
        state.operations = operations;
        match report {
            Some(report) => {
                state.report.parsed_functions = report.parsed_functions;
                state.report.dropped_functions = report.dropped_functions;
            }
            None => {
                state.report.parsed_functions = functions.len();
                state.report.dropped_functions = 0;
            }
        }
        functions
    }

    /// Table de dispatch courante (construit le schéma si nécessaire)
    pub async fn operations(&self) -> Result<Arc<OperationTable>> {
        {
            let state = self.state.read();
            if !state.functions.is_empty() {
                return Ok(state.operations.clone());
            }
        }

        self.get_functions(false).await?;
        Ok(self.state.read().operations.clone())
    }

    /// Schéma complet (construit si nécessaire)
    pub async fn snapshot(&self) -> Result<SchemaSnapshot> {
        let functions = self.get_functions(false).await?;
        let types = self.get_types(false).await?;
        Ok(SchemaSnapshot { functions, types })
    }

    /// Invalide le schéma : entrées du cache puis tables en mémoire
    ///
    /// Le prochain accès reconstruit le schéma depuis le service SOAP.
    pub async fn refresh_table_cache(&self) {
        self.cache.remove(FUNCTIONS_KEY).await;
        self.cache.remove(TYPES_KEY).await;

        let mut state = self.state.write();
        state.functions = Arc::default();
        state.types = Arc::default();
        state.operations = Arc::default();
        debug!("SOAP schema invalidated");
    }

    /// Compteurs des dernières reconstructions
    pub fn last_report(&self) -> ParseReport {
        self.state.read().report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheStore, DEFAULT_CACHE_TTL, MemoryCacheStore};
    use crate::transport::{Payload, SoapValue, TransportError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingTransport {
        functions_calls: AtomicUsize,
        types_calls: AtomicUsize,
        unavailable: AtomicBool,
    }

    #[async_trait]
    impl SoapTransport for CountingTransport {
        async fn functions(&self) -> std::result::Result<Vec<String>, TransportError> {
            self.functions_calls.fetch_add(1, Ordering::SeqCst);
            if self.unavailable.load(Ordering::SeqCst) {
                return Err(TransportError::transport("service unavailable"));
            }
            Ok(vec![
                "Greeting Hello(Person $person)".to_string(),
                "void Ping()".to_string(),
            ])
        }

        async fn types(&self) -> std::result::Result<Vec<String>, TransportError> {
            self.types_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                "struct Person { string name; int age }".to_string(),
                "string Greeting".to_string(),
                "broken".to_string(),
            ])
        }

        async fn call(
            &self,
            _operation: &str,
            _payload: Payload,
        ) -> std::result::Result<SoapValue, TransportError> {
            Ok(SoapValue::Null)
        }
    }

    fn builder(transport: Arc<CountingTransport>) -> SchemaBuilder {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
        SchemaBuilder::new(transport, SchemaCache::new(store, 1, DEFAULT_CACHE_TTL))
    }

    #[tokio::test]
    async fn test_functions_build_installs_operations() {
        let transport = Arc::new(CountingTransport::default());
        let schema = builder(transport.clone());

        let functions = schema.get_functions(false).await.unwrap();
        assert_eq!(functions.len(), 2);

        let operations = schema.operations().await.unwrap();
        assert_eq!(operations.names(), vec!["Hello", "Ping"]);
        assert_eq!(transport.functions_calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.types_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_report_counts_drops() {
        let schema = builder(Arc::new(CountingTransport::default()));
        schema.snapshot().await.unwrap();

        let report = schema.last_report();
        assert_eq!(report.parsed_types, 2);
        assert_eq!(report.dropped_types, 1);
        assert_eq!(report.parsed_functions, 2);
        assert_eq!(report.dropped(), 1);
    }

    #[tokio::test]
    async fn test_refresh_table_cache_clears_everything() {
        let transport = Arc::new(CountingTransport::default());
        let schema = builder(transport.clone());

        schema.get_functions(false).await.unwrap();
        schema.refresh_table_cache().await;
        assert!(schema.cache().get::<TypesTable>(TYPES_KEY).await.is_none());

        schema.get_functions(false).await.unwrap();
        assert_eq!(transport.functions_calls.load(Ordering::SeqCst), 2);
        assert_eq!(transport.types_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_previous_tables() {
        let transport = Arc::new(CountingTransport::default());
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
        let schema = SchemaBuilder::new(
            transport.clone(),
            SchemaCache::new(store, 1, DEFAULT_CACHE_TTL).with_enabled(false),
        );

        let before = schema.get_functions(false).await.unwrap();
        transport.unavailable.store(true, Ordering::SeqCst);

        assert!(schema.get_functions(true).await.is_err());

        let after = schema.get_functions(false).await.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(schema.operations().await.unwrap().names(), vec!["Hello", "Ping"]);
        assert_eq!(schema.last_report().parsed_functions, 2);
    }

    #[tokio::test]
    async fn test_cache_install_resets_report() {
        let transport = Arc::new(CountingTransport::default());
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());

        let first = SchemaBuilder::new(
            transport.clone(),
            SchemaCache::new(store.clone(), 1, DEFAULT_CACHE_TTL),
        );
        first.snapshot().await.unwrap();
        assert_eq!(first.last_report().dropped_types, 1);

        let second = SchemaBuilder::new(
            transport.clone(),
            SchemaCache::new(store, 1, DEFAULT_CACHE_TTL),
        );
        second.snapshot().await.unwrap();
        assert_eq!(transport.functions_calls.load(Ordering::SeqCst), 1);

        let report = second.last_report();
        assert_eq!(report.parsed_functions, 2);
        assert_eq!(report.parsed_types, 2);
        assert_eq!(report.dropped(), 0);
    }
}
