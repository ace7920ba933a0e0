//! Service SOAP exposé comme collection de ressources REST

use crate::access::AccessMask;
use crate::cache::{CacheStore, SchemaCache};
use crate::config::ServiceConfig;
use crate::config_ext::SoapConfigExt;
use crate::dispatch::Dispatcher;
use crate::docs::{self, DocFragment};
use crate::error::{Result, SoapServiceError};
use crate::functions::{FunctionsTable, OperationName};
use crate::headers::{SoapHeader, build_headers};
use crate::schema::{SchemaBuilder, SchemaSnapshot};
use crate::transport::{ConnectRequest, Payload, SoapConnector};
use crate::types::{ParseReport, TypesTable};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Service SOAP configuré et connecté
pub struct SoapService {
    config: ServiceConfig,
    headers: Vec<SoapHeader>,
    schema: Arc<SchemaBuilder>,
    dispatcher: Dispatcher,
}

impl SoapService {
    /// Établit un service à partir de sa configuration
    ///
    /// # Arguments
    ///
    /// * `config` - Configuration du service
    /// * `connector` - Fournisseur du client SOAP
    /// * `store` - Cache partagé des schémas
    /// * `default_ttl` - TTL utilisé si le service n'en configure pas
    ///
    /// # Errors
    ///
    /// - [`SoapServiceError::Configuration`] sans point d'accès complet
    /// - [`SoapServiceError::Construction`] si les en-têtes sont invalides ou
    ///   si le client SOAP ne peut pas être établi
    pub async fn connect(
        config: ServiceConfig,
        connector: &dyn SoapConnector,
        store: Arc<dyn CacheStore>,
        default_ttl: Duration,
    ) -> Result<Self> {
        let endpoint = config.endpoint()?;
        let headers = build_headers(&config.headers)?;

        let request = ConnectRequest {
            endpoint,
            options: config.resolved_options(),
            headers: headers.clone(),
        };
        let transport = connector.connect(request).await.map_err(|e| {
            warn!(service = %config.name, error = %e, "Failed to establish SOAP client");
            SoapServiceError::Construction(e.to_string())
        })?;

        let cache = SchemaCache::new(store, config.id, config.cache_ttl_or(default_ttl))
            .with_enabled(config.cache_enabled);
        let schema = Arc::new(SchemaBuilder::new(transport, cache));
        let dispatcher = Dispatcher::new(config.name.clone(), schema.clone());

        info!(
            service = %config.name,
            id = config.id,
            headers = headers.len(),
            "SOAP service ready"
        );

        Ok(Self {
            config,
            headers,
            schema,
            dispatcher,
        })
    }

    /// Établit un service déclaré dans la configuration pmoconfig
    ///
    /// Le TTL par défaut est lu dans `soap.cache.ttl`.
    pub async fn connect_configured(
        config: &pmoconfig::Config,
        name: &str,
        connector: &dyn SoapConnector,
        store: Arc<dyn CacheStore>,
    ) -> Result<Self> {
        let service = config
            .get_soap_service(name)
            .map_err(|e| SoapServiceError::Configuration(e.to_string()))?;
        Self::connect(service, connector, store, config.get_soap_cache_ttl()).await
    }

    pub fn id(&self) -> u32 {
        self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// En-têtes transmis au client SOAP
    pub fn headers(&self) -> &[SoapHeader] {
        &self.headers
    }

    pub fn schema(&self) -> &Arc<SchemaBuilder> {
        &self.schema
    }

    pub async fn get_functions(&self, refresh: bool) -> Result<Arc<FunctionsTable>> {
        self.schema.get_functions(refresh).await
    }

    pub async fn get_types(&self, refresh: bool) -> Result<Arc<TypesTable>> {
        self.schema.get_types(refresh).await
    }

    pub async fn snapshot(&self) -> Result<SchemaSnapshot> {
        self.schema.snapshot().await
    }

    /// Invalide le schéma en mémoire et en cache
    pub async fn refresh_table_cache(&self) {
        info!(service = %self.config.name, "Refreshing SOAP schema");
        self.schema.refresh_table_cache().await;
    }

    /// Nom canonique d'une opération (insensible à la casse)
    pub async fn resolve(&self, name: &str) -> Result<Option<OperationName>> {
        self.dispatcher.resolve(name).await
    }

    pub async fn exists(&self, name: &str) -> Result<bool> {
        self.dispatcher.exists(name).await
    }

    /// Invoque une opération et renvoie sa réponse normalisée
    pub async fn invoke(&self, name: &str, payload: Payload) -> Result<Value> {
        self.dispatcher.invoke(name, payload).await
    }

    /// Noms canoniques des opérations, triés
    pub async fn operation_names(&self) -> Result<Vec<String>> {
        Ok(self.schema.operations().await?.names())
    }

    /// Fragment de documentation (chemins + définitions)
    pub async fn build_docs<F>(&self, permissions_of: F) -> Result<DocFragment>
    where
        F: Fn(&OperationName) -> AccessMask,
    {
        let snapshot = self.snapshot().await?;
        Ok(docs::build_docs(&self.config.name, &snapshot, permissions_of))
    }

    /// Document Swagger complet du service
    pub async fn api_docs<F>(&self, permissions_of: F) -> Result<Value>
    where
        F: Fn(&OperationName) -> AccessMask,
    {
        let fragment = self.build_docs(permissions_of).await?;
        let mut document =
            docs::base_document(&self.config.name, self.config.description.as_deref());
        fragment.merge_into(&mut document);
        Ok(document)
    }

    /// Compteurs des entrées ignorées lors des dernières reconstructions
    pub fn last_build_report(&self) -> ParseReport {
        self.schema.last_report()
    }
}
