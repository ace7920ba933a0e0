//! Configuration d'un service SOAP
//!
//! Un service est décrit dans la configuration YAML sous `soap.services` :
//!
//! ```yaml
//! soap:
//!   services:
//!     - id: 1
//!       name: weather
//!       wsdl: http://example.com/weather?wsdl
//!       options:
//!         soap_version: SOAP_1_2
//!         connection_timeout: "30"
//!       headers:
//!         - type: wsse
//!           data: '{"username": "bob", "password": "secret"}'
//! ```

use crate::error::{Result, SoapServiceError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Options transmises au client SOAP
pub type SoapOptions = BTreeMap<String, Value>;

/// Constantes SOAP reconnues dans les valeurs d'options
const SOAP_CONSTANTS: &[(&str, i64)] = &[
    ("SOAP_1_1", 1),
    ("SOAP_1_2", 2),
    ("SOAP_PERSISTENCE_SESSION", 1),
    ("SOAP_PERSISTENCE_REQUEST", 2),
    ("SOAP_ENCODED", 1),
    ("SOAP_LITERAL", 2),
    ("SOAP_RPC", 1),
    ("SOAP_DOCUMENT", 2),
    ("SOAP_COMPRESSION_ACCEPT", 32),
    ("SOAP_COMPRESSION_GZIP", 0),
    ("SOAP_COMPRESSION_DEFLATE", 16),
    ("SOAP_AUTHENTICATION_BASIC", 0),
    ("SOAP_AUTHENTICATION_DIGEST", 1),
    ("SOAP_SINGLE_ELEMENT_ARRAYS", 1),
    ("SOAP_WAIT_ONE_WAY_CALLS", 2),
    ("SOAP_USE_XSI_ARRAY_TYPE", 4),
    ("WSDL_CACHE_NONE", 0),
    ("WSDL_CACHE_DISK", 1),
    ("WSDL_CACHE_MEMORY", 2),
    ("WSDL_CACHE_BOTH", 3),
    ("SOAP_SSL_METHOD_TLS", 0),
    ("SOAP_SSL_METHOD_SSLv2", 1),
    ("SOAP_SSL_METHOD_SSLv3", 2),
    ("SOAP_SSL_METHOD_SSLv23", 3),
];

/// Valeur entière d'une constante SOAP
pub fn soap_constant(name: &str) -> Option<i64> {
    SOAP_CONSTANTS
        .iter()
        .find(|(constant, _)| *constant == name)
        .map(|(_, value)| *value)
}

/// Résout une valeur d'option
///
/// Une chaîne numérique devient un nombre, le nom d'une constante SOAP
/// devient sa valeur ; toute autre valeur est conservée.
pub fn resolve_option(value: &Value) -> Value {
    let Value::String(s) = value else {
        return value.clone();
    };

    let trimmed = s.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::from(i);
    }
    if let Some(number) = trimmed
        .parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
    {
        return Value::Number(number);
    }
    match soap_constant(trimmed) {
        Some(constant) => Value::from(constant),
        None => value.clone(),
    }
}

/// Point d'accès du service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Mode WSDL
    Wsdl(String),
    /// Mode non-WSDL : adresse du service et namespace cible
    Direct { location: String, uri: String },
}

/// Type d'en-tête SOAP
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderKind {
    /// WS-Security UsernameToken
    Wsse,
    #[default]
    #[serde(other)]
    Generic,
}

/// Déclaration d'un en-tête SOAP
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderConfig {
    #[serde(rename = "type", default)]
    pub kind: HeaderKind,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Données de l'en-tête ; JSON pour `wsse`
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub must_understand: bool,
    #[serde(default)]
    pub actor: Option<String>,
}

impl HeaderConfig {
    /// En-tête WS-Security avec identifiants
    pub fn wsse(username: &str, password: &str) -> Self {
        Self {
            kind: HeaderKind::Wsse,
            data: Some(
                serde_json::json!({"username": username, "password": password}).to_string(),
            ),
            ..Default::default()
        }
    }

    /// En-tête générique
    pub fn generic(namespace: &str, name: &str, data: &str) -> Self {
        Self {
            kind: HeaderKind::Generic,
            namespace: Some(namespace.to_string()),
            name: Some(name.to_string()),
            data: Some(data.to_string()),
            ..Default::default()
        }
    }
}

fn default_cache_enabled() -> bool {
    true
}

/// Configuration d'un service SOAP
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Identifiant (préfixe des clés de cache)
    pub id: u32,
    /// Nom du service, utilisé dans les chemins REST
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub wsdl: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub options: SoapOptions,
    #[serde(default)]
    pub headers: Vec<HeaderConfig>,
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
    /// TTL du cache en secondes
    #[serde(default)]
    pub cache_ttl: Option<u64>,
}

impl ServiceConfig {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            wsdl: None,
            location: None,
            uri: None,
            options: SoapOptions::new(),
            headers: Vec::new(),
            cache_enabled: true,
            cache_ttl: None,
        }
    }

    pub fn with_wsdl(mut self, wsdl: impl Into<String>) -> Self {
        self.wsdl = Some(wsdl.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>, uri: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self.uri = Some(uri.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_option(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(name.into(), value.into());
        self
    }

    pub fn with_header(mut self, header: HeaderConfig) -> Self {
        self.headers.push(header);
        self
    }

    pub fn with_cache(mut self, enabled: bool, ttl: Option<u64>) -> Self {
        self.cache_enabled = enabled;
        self.cache_ttl = ttl;
        self
    }

    /// Point d'accès du service
    ///
    /// Le WSDL est prioritaire ; sans WSDL, `location` et `uri` sont requis.
    ///
    /// # Errors
    ///
    /// [`SoapServiceError::Configuration`] si aucun point d'accès n'est complet
    pub fn endpoint(&self) -> Result<Endpoint> {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        if let Some(wsdl) = non_empty(&self.wsdl) {
            return Ok(Endpoint::Wsdl(wsdl));
        }

        match (non_empty(&self.location), non_empty(&self.uri)) {
            (Some(location), Some(uri)) => Ok(Endpoint::Direct { location, uri }),
            _ => Err(SoapServiceError::Configuration(format!(
                "service '{}' requires either a WSDL or both a location and a URI",
                self.name
            ))),
        }
    }

    /// Options avec les constantes SOAP résolues
    pub fn resolved_options(&self) -> SoapOptions {
        self.options
            .iter()
            .map(|(name, value)| (name.clone(), resolve_option(value)))
            .collect()
    }

    /// TTL du cache, ou `default` si non configuré
    pub fn cache_ttl_or(&self, default: Duration) -> Duration {
        self.cache_ttl.map(Duration::from_secs).unwrap_or(default)
    }
}
