//! Frontière avec la couche SOAP
//!
//! Le transport SOAP (sérialisation XML, HTTP, WS-Security) n'est pas implémenté
//! ici : il est fourni par un [`SoapConnector`] qui établit un [`SoapTransport`]
//! à partir de la configuration du service.

use crate::config::{Endpoint, SoapOptions};
use crate::headers::SoapHeader;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Arguments d'une opération SOAP (paires nom/valeur)
pub type Payload = Map<String, Value>;

/// Erreur renvoyée par la couche SOAP
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// SOAP Fault renvoyé par le serveur distant
    #[error("SOAP fault ({code}): {message}")]
    Fault { code: String, message: String },

    /// Erreur de transport (réseau, WSDL illisible, etc.)
    #[error("{0}")]
    Transport(String),
}

impl TransportError {
    /// Crée une erreur depuis un SOAP Fault
    pub fn fault(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fault {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Crée une erreur de transport
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

/// Valeur renvoyée par une opération SOAP
///
/// Ensemble fermé des formes possibles d'une réponse : scalaires,
/// séquences et objets (attributs ordonnés).
#[derive(Debug, Clone, PartialEq)]
pub enum SoapValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<SoapValue>),
    Object(SoapObject),
}

/// Objet renvoyé par le client SOAP (classe optionnelle + attributs visibles)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoapObject {
    class: Option<String>,
    attributes: Vec<(String, SoapValue)>,
}

impl SoapObject {
    /// Crée un objet anonyme vide
    pub fn new() -> Self {
        Self::default()
    }

    /// Crée un objet vide d'une classe donnée (ex: "GetWeatherResponse")
    pub fn of_class(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            attributes: Vec::new(),
        }
    }

    /// Ajoute un attribut (style builder)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<SoapValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Définit un attribut, en remplaçant la valeur existante le cas échéant
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<SoapValue>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&SoapValue> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Attributs visibles, dans l'ordre de déclaration
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &SoapValue)> {
        self.attributes.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl From<bool> for SoapValue {
    fn from(value: bool) -> Self {
        SoapValue::Bool(value)
    }
}

impl From<i64> for SoapValue {
    fn from(value: i64) -> Self {
        SoapValue::Int(value)
    }
}

impl From<i32> for SoapValue {
    fn from(value: i32) -> Self {
        SoapValue::Int(value.into())
    }
}

impl From<f64> for SoapValue {
    fn from(value: f64) -> Self {
        SoapValue::Float(value)
    }
}

impl From<&str> for SoapValue {
    fn from(value: &str) -> Self {
        SoapValue::String(value.to_string())
    }
}

impl From<String> for SoapValue {
    fn from(value: String) -> Self {
        SoapValue::String(value)
    }
}

impl From<Vec<SoapValue>> for SoapValue {
    fn from(value: Vec<SoapValue>) -> Self {
        SoapValue::List(value)
    }
}

impl From<SoapObject> for SoapValue {
    fn from(value: SoapObject) -> Self {
        SoapValue::Object(value)
    }
}

/// Capacité SOAP : introspection et invocation
#[async_trait]
pub trait SoapTransport: Send + Sync {
    /// Signatures brutes des opérations
    /// (ex: `GetWeatherResponse GetWeather(GetWeather $parameters)`)
    async fn functions(&self) -> Result<Vec<String>, TransportError>;

    /// Déclarations brutes des types
    /// (ex: `struct GetWeather { string city; }`)
    async fn types(&self) -> Result<Vec<String>, TransportError>;

    /// Invoque l'opération `operation` avec `payload` comme unique argument
    async fn call(&self, operation: &str, payload: Payload) -> Result<SoapValue, TransportError>;
}

/// Paramètres de connexion transmis au [`SoapConnector`]
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectRequest {
    pub endpoint: Endpoint,
    pub options: SoapOptions,
    pub headers: Vec<SoapHeader>,
}

/// Établit un transport SOAP à partir de la configuration d'un service
#[async_trait]
pub trait SoapConnector: Send + Sync {
    async fn connect(
        &self,
        request: ConnectRequest,
    ) -> Result<Arc<dyn SoapTransport>, TransportError>;
}
