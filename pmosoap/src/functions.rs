//! Signatures des opérations SOAP
//!
//! Le client SOAP décrit chaque opération par une signature textuelle :
//!
//! ```text
//! GetWeatherResponse GetWeather(GetWeather $parameters)
//! ```
//!
//! Le premier mot est le type de réponse, vient ensuite le nom de l'opération
//! puis ses paramètres. Le type du premier paramètre est le type de requête.

use crate::types::{ParseReport, TypeDescriptor, TypesTable};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

static SIGNATURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?s)(.+)\s+(\w+)\s*\((.*)\)$").expect("valid SOAP signature pattern")
});

/// Table des opérations, indexée par nom en minuscules
pub type FunctionsTable = BTreeMap<String, FunctionSchema>;

/// Nom d'une opération : clé de recherche (minuscules) + nom canonique
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationName {
    key: String,
    canonical: String,
}

impl OperationName {
    pub fn new(canonical: impl Into<String>) -> Self {
        let canonical = canonical.into();
        Self {
            key: Self::lookup_key(&canonical),
            canonical,
        }
    }

    /// Clé de recherche insensible à la casse
    pub fn lookup_key(name: &str) -> String {
        name.to_lowercase()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Nom tel que déclaré par le service
    pub fn canonical(&self) -> &str {
        &self.canonical
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Schéma d'une opération SOAP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Nom de l'opération (casse d'origine)
    pub name: String,
    /// Type de la requête (vide si l'opération ne prend aucun paramètre)
    pub request_type: String,
    /// Type de la réponse
    pub response_type: String,
    /// Descripteur du type de requête, s'il est connu
    #[serde(default)]
    pub request_fields: Option<TypeDescriptor>,
    /// Descripteur du type de réponse, s'il est connu
    #[serde(default)]
    pub response_fields: Option<TypeDescriptor>,
    /// Signature brute
    pub description: String,
}

impl FunctionSchema {
    /// Parse une signature brute
    ///
    /// # Returns
    ///
    /// Le schéma de l'opération (sans les descripteurs de types), ou `None`
    /// si la signature n'est pas reconnue
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let captures = SIGNATURE.captures(raw)?;

        let response_type = captures.get(1)?.as_str().trim().to_string();
        let name = captures.get(2)?.as_str().to_string();
        let request_type = captures
            .get(3)
            .and_then(|params| params.as_str().split(',').next())
            .and_then(|first| first.split_whitespace().next())
            .filter(|token| !token.starts_with('$'))
            .unwrap_or_default()
            .to_string();

        Some(Self {
            name,
            request_type,
            response_type,
            request_fields: None,
            response_fields: None,
            description: raw.to_string(),
        })
    }

    /// Associe les descripteurs des types de requête et de réponse
    pub fn resolve_fields(&mut self, types: &TypesTable) {
        self.request_fields = types.get(&self.request_type).cloned();
        self.response_fields = types.get(&self.response_type).cloned();
    }

    pub fn operation_name(&self) -> OperationName {
        OperationName::new(self.name.clone())
    }

    /// Clé d'indexation dans la [`FunctionsTable`]
    pub fn key(&self) -> String {
        OperationName::lookup_key(&self.name)
    }
}

/// Construit la table des opérations à partir des signatures brutes
///
/// Deux opérations ne différant que par la casse partagent la même clé :
/// la dernière écrase la précédente.
pub fn build_functions_table<I, S>(
    raws: I,
    types: &TypesTable,
    report: &mut ParseReport,
) -> FunctionsTable
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut functions = FunctionsTable::new();

    for raw in raws {
        let raw = raw.as_ref();
        match FunctionSchema::parse(raw) {
            Some(mut function) => {
                function.resolve_fields(types);
                report.parsed_functions += 1;
                functions.insert(function.key(), function);
            }
            None => {
                report.dropped_functions += 1;
                debug!(raw = %raw, "Dropping unrecognized SOAP function signature");
            }
        }
    }

    functions
}
