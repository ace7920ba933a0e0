//! En-têtes SOAP
//!
//! Construits à partir des [`HeaderConfig`] du service et transmis au
//! [`SoapConnector`](crate::transport::SoapConnector) qui les attache à chaque
//! requête. Deux sortes d'en-têtes :
//!
//! - `wsse` : WS-Security UsernameToken (identifiants lus dans un JSON)
//! - générique : namespace + nom + données libres
//!
//! Les données JSON sont rendues en XML avec les conventions suivantes :
//! une clé `@nom` devient un attribut, la clé `#text` devient le contenu
//! texte, un tableau produit un élément par valeur.

use crate::config::{HeaderConfig, HeaderKind};
use crate::error::{Result, SoapServiceError};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};
use xmltree::{Element, XMLNode};

/// Namespace WS-Security 1.0
pub const WSSE_NAMESPACE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";

/// Type du mot de passe en clair
pub const WSSE_PASSWORD_TEXT: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";

const SOAP_ENVELOPE_NAMESPACE: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// En-tête SOAP prêt à être attaché aux requêtes
#[derive(Debug, Clone, PartialEq)]
pub struct SoapHeader {
    pub namespace: String,
    pub name: String,
    pub data: Value,
    pub must_understand: bool,
    pub actor: Option<String>,
}

impl SoapHeader {
    /// En-tête WS-Security UsernameToken
    pub fn wsse(username: &str, password: &str) -> Self {
        Self {
            namespace: WSSE_NAMESPACE.to_string(),
            name: "Security".to_string(),
            data: json!({
                "wsse:UsernameToken": {
                    "wsse:Username": username,
                    "wsse:Password": {
                        "@Type": WSSE_PASSWORD_TEXT,
                        "#text": password
                    }
                }
            }),
            must_understand: false,
            actor: None,
        }
    }

    fn prefix(&self) -> &'static str {
        if self.namespace == WSSE_NAMESPACE {
            "wsse"
        } else {
            "ns"
        }
    }

    /// Élément XML de l'en-tête
    pub fn to_element(&self) -> Element {
        let prefix = self.prefix();
        let mut element = Element::new(&format!("{}:{}", prefix, self.name));
        element
            .attributes
            .insert(format!("xmlns:{}", prefix), self.namespace.clone());

        if self.must_understand || self.actor.is_some() {
            element
                .attributes
                .insert("xmlns:s".to_string(), SOAP_ENVELOPE_NAMESPACE.to_string());
        }
        if self.must_understand {
            element
                .attributes
                .insert("s:mustUnderstand".to_string(), "1".to_string());
        }
        if let Some(actor) = &self.actor {
            element
                .attributes
                .insert("s:actor".to_string(), actor.clone());
        }

        fill_element(&mut element, &self.data);
        element
    }

    /// Rendu XML de l'en-tête, sans déclaration de document
    pub fn to_xml(&self) -> std::result::Result<String, xmltree::Error> {
        let mut buf = Vec::new();
        let config = xmltree::EmitterConfig::new()
            .write_document_declaration(false)
            .perform_indent(false);
        self.to_element().write_with_config(&mut buf, config)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn fill_element(element: &mut Element, data: &Value) {
    match data {
        Value::Object(map) => {
            for (key, value) in map {
                if let Some(attribute) = key.strip_prefix('@') {
                    if let Some(text) = scalar_text(value) {
                        element.attributes.insert(attribute.to_string(), text);
                    }
                } else if key == "#text" {
                    if let Some(text) = scalar_text(value) {
                        element.children.push(XMLNode::Text(text));
                    }
                } else if let Value::Array(items) = value {
                    for item in items {
                        element.children.push(XMLNode::Element(child(key, item)));
                    }
                } else {
                    element.children.push(XMLNode::Element(child(key, value)));
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                fill_element(element, item);
            }
        }
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                element.children.push(XMLNode::Text(text));
            }
        }
    }
}

fn child(name: &str, value: &Value) -> Element {
    let mut element = Element::new(name);
    fill_element(&mut element, value);
    element
}

#[derive(Deserialize)]
struct WsseCredentials {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Construit les en-têtes déclarés par un service
///
/// Les déclarations incomplètes sont ignorées.
///
/// # Errors
///
/// [`SoapServiceError::Construction`] si les données d'un en-tête `wsse`
/// ne sont pas un JSON valide
pub fn build_headers(configs: &[HeaderConfig]) -> Result<Vec<SoapHeader>> {
    let mut headers = Vec::new();

    for config in configs {
        match config.kind {
            HeaderKind::Wsse => {
                let Some(data) = non_empty(&config.data) else {
                    warn!("Ignoring WSSE header without credentials");
                    continue;
                };
                let credentials: WsseCredentials = serde_json::from_str(data).map_err(|e| {
                    SoapServiceError::Construction(format!("invalid WSSE header data: {}", e))
                })?;

                match (
                    non_empty(&credentials.username),
                    non_empty(&credentials.password),
                ) {
                    (Some(username), Some(password)) => {
                        headers.push(SoapHeader::wsse(username, password));
                    }
                    _ => warn!("Ignoring WSSE header without username or password"),
                }
            }
            HeaderKind::Generic => {
                match (
                    non_empty(&config.namespace),
                    non_empty(&config.name),
                    non_empty(&config.data),
                ) {
                    (Some(namespace), Some(name), Some(data)) => {
                        let data = serde_json::from_str(data)
                            .unwrap_or_else(|_| Value::String(data.to_string()));
                        headers.push(SoapHeader {
                            namespace: namespace.to_string(),
                            name: name.to_string(),
                            data,
                            must_understand: config.must_understand,
                            actor: config.actor.clone(),
                        });
                    }
                    _ => debug!(
                        name = ?config.name,
                        "Ignoring incomplete SOAP header declaration"
                    ),
                }
            }
        }
    }

    Ok(headers)
}
