//! Résolution et invocation des opérations
//!
//! Les opérations sont appelées au travers d'une table explicite
//! nom → [`OperationHandle`], reconstruite à chaque installation d'une
//! nouvelle table des fonctions par le [`SchemaBuilder`].

use crate::error::{Result, SoapServiceError};
use crate::functions::{FunctionsTable, OperationName};
use crate::normalize::{MAX_NORMALIZE_DEPTH, normalize_with_depth};
use crate::schema::SchemaBuilder;
use crate::transport::{Payload, SoapTransport, SoapValue, TransportError};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Nom de l'événement publié à chaque appel d'une opération
pub fn call_event(service: &str, operation: &str) -> String {
    format!("{}.{}.call", service, operation)
}

/// Nom de l'événement publié après chaque appel, quelle que soit l'opération
pub fn function_called_event(service: &str) -> String {
    format!("{}.function_called", service)
}

/// Opération invocable
#[derive(Clone)]
pub struct OperationHandle {
    name: OperationName,
    transport: Arc<dyn SoapTransport>,
}

impl OperationHandle {
    pub fn new(name: OperationName, transport: Arc<dyn SoapTransport>) -> Self {
        Self { name, transport }
    }

    pub fn name(&self) -> &OperationName {
        &self.name
    }

    /// Appelle l'opération avec `payload` comme unique argument
    pub async fn call(&self, payload: Payload) -> std::result::Result<SoapValue, TransportError> {
        self.transport.call(self.name.canonical(), payload).await
    }
}

/// Table de dispatch : clé en minuscules → opération
#[derive(Clone, Default)]
pub struct OperationTable {
    handles: HashMap<String, OperationHandle>,
}

impl OperationTable {
    pub fn from_functions(functions: &FunctionsTable, transport: &Arc<dyn SoapTransport>) -> Self {
        let handles = functions
            .iter()
            .map(|(key, function)| {
                (
                    key.clone(),
                    OperationHandle::new(function.operation_name(), transport.clone()),
                )
            })
            .collect();
        Self { handles }
    }

    pub fn get(&self, key: &str) -> Option<&OperationHandle> {
        self.handles.get(key)
    }

    /// Noms canoniques, triés
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handles
            .values()
            .map(|handle| handle.name().canonical().to_string())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}

/// Dispatcher d'un service SOAP
pub struct Dispatcher {
    service: String,
    schema: Arc<SchemaBuilder>,
    max_depth: usize,
}

impl Dispatcher {
    pub fn new(service: impl Into<String>, schema: Arc<SchemaBuilder>) -> Self {
        Self {
            service: service.into(),
            schema,
            max_depth: MAX_NORMALIZE_DEPTH,
        }
    }

    /// Change la profondeur maximale de normalisation des réponses
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Résout un nom d'opération sans tenir compte de la casse
    ///
    /// Construit le schéma s'il n'existe pas encore.
    ///
    /// # Returns
    ///
    /// Le nom canonique de l'opération, ou `None` si elle n'existe pas
    ///
    /// # Errors
    ///
    /// [`SoapServiceError::InvalidArgument`] si `name` est vide
    pub async fn resolve(&self, name: &str) -> Result<Option<OperationName>> {
        if name.trim().is_empty() {
            return Err(SoapServiceError::InvalidArgument(
                "Operation name must not be empty".to_string(),
            ));
        }

        let functions = self.schema.get_functions(false).await?;
        Ok(functions
            .get(&OperationName::lookup_key(name))
            .map(|function| function.operation_name()))
    }

    /// Vérifie l'existence d'une opération
    pub async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.resolve(name).await?.is_some())
    }

    /// Invoque une opération et normalise sa réponse
    pub async fn invoke(&self, name: &str, payload: Payload) -> Result<Value> {
        let operation = self
            .resolve(name)
            .await?
            .ok_or_else(|| SoapServiceError::NotFound(name.to_string()))?;

        let operations = self.schema.operations().await?;
        let handle = operations
            .get(operation.key())
            .ok_or_else(|| SoapServiceError::NotFound(name.to_string()))?;

        let event = call_event(&self.service, operation.canonical());
        info!(
            event = %event,
            service = %self.service,
            operation = %operation,
            "Calling SOAP operation"
        );

        let response = handle.call(payload).await?;

        debug!(
            event = %function_called_event(&self.service),
            service = %self.service,
            operation = %operation,
            "SOAP operation returned"
        );

        normalize_with_depth(&response, self.max_depth)
    }
}
