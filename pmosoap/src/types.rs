//! Descripteurs de types issus de l'introspection SOAP
//!
//! Le client SOAP expose ses types sous forme de chaînes peu structurées :
//!
//! ```text
//! struct GetWeather {
//!  string city;
//!  int days;
//! }
//! string Token
//! ```
//!
//! Ce module les transforme en [`TypeDescriptor`]. Le parsing est volontairement
//! permissif : les déclarations mal formées sont ignorées (et comptabilisées
//! dans un [`ParseReport`]) au lieu de provoquer une erreur.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const STRUCT_PREFIX: &str = "struct ";

/// Table des types, triée par nom
pub type TypesTable = BTreeMap<String, TypeDescriptor>;

/// Description d'un type SOAP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TypeDescriptor {
    /// Type simple : uniquement le nom du type sous-jacent
    Scalar {
        #[serde(rename = "type")]
        type_name: String,
    },
    /// Structure : champ -> nom de type, dans l'ordre de déclaration
    Struct { fields: IndexMap<String, String> },
}

impl TypeDescriptor {
    pub fn scalar(type_name: impl Into<String>) -> Self {
        TypeDescriptor::Scalar {
            type_name: type_name.into(),
        }
    }

    /// Construit une structure à partir de paires (champ, type)
    pub fn structure<I, F, T>(fields: I) -> Self
    where
        I: IntoIterator<Item = (F, T)>,
        F: Into<String>,
        T: Into<String>,
    {
        TypeDescriptor::Struct {
            fields: fields
                .into_iter()
                .map(|(f, t)| (f.into(), t.into()))
                .collect(),
        }
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, TypeDescriptor::Struct { .. })
    }

    pub fn fields(&self) -> Option<&IndexMap<String, String>> {
        match self {
            TypeDescriptor::Struct { fields } => Some(fields),
            TypeDescriptor::Scalar { .. } => None,
        }
    }
}

/// Compteurs de la dernière construction du schéma
///
/// Permet d'observer les entrées ignorées silencieusement par les parsers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseReport {
    /// Types retenus
    pub parsed_types: usize,
    /// Déclarations de types ignorées
    pub dropped_types: usize,
    /// Champs de structures ignorés
    pub dropped_fields: usize,
    /// Opérations retenues
    pub parsed_functions: usize,
    /// Signatures d'opérations ignorées
    pub dropped_functions: usize,
}

impl ParseReport {
    /// Nombre total d'entrées ignorées
    pub fn dropped(&self) -> usize {
        self.dropped_types + self.dropped_fields + self.dropped_functions
    }
}

/// Parser de déclarations de types
#[derive(Debug, Default)]
pub struct TypeParser {
    report: ParseReport,
}

impl TypeParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse une déclaration brute
    ///
    /// # Returns
    ///
    /// Le nom du type et son descripteur, ou `None` si la déclaration est ignorée
    pub fn parse(&mut self, raw: &str) -> Option<(String, TypeDescriptor)> {
        let parsed = match raw.strip_prefix(STRUCT_PREFIX) {
            Some(rest) => self.parse_struct(rest),
            None => parse_scalar(raw),
        };

        match parsed {
            Some(_) => self.report.parsed_types += 1,
            None => {
                self.report.dropped_types += 1;
                debug!(raw = %raw, "Dropping malformed SOAP type declaration");
            }
        }
        parsed
    }

    fn parse_struct(&mut self, rest: &str) -> Option<(String, TypeDescriptor)> {
        let (name, body) = rest.split_once(' ').unwrap_or((rest, ""));
        if name.is_empty() {
            return None;
        }

        let body = body.trim_matches(|c: char| c == '{' || c == '}' || c.is_whitespace());
        let mut fields = IndexMap::new();

        for fragment in body.split(';') {
            let fragment = fragment.trim();
            if fragment.is_empty() {
                continue;
            }

            let mut tokens = fragment.split(' ');
            match (tokens.next(), tokens.next()) {
                (Some(field_type), Some(field_name))
                    if !field_type.is_empty() && !field_name.is_empty() =>
                {
                    fields.insert(field_name.to_string(), field_type.to_string());
                }
                _ => {
                    self.report.dropped_fields += 1;
                    debug!(type_name = %name, fragment = %fragment, "Dropping malformed struct field");
                }
            }
        }

        Some((name.to_string(), TypeDescriptor::Struct { fields }))
    }

    pub fn report(&self) -> &ParseReport {
        &self.report
    }

    pub fn into_report(self) -> ParseReport {
        self.report
    }
}

fn parse_scalar(raw: &str) -> Option<(String, TypeDescriptor)> {
    let mut tokens = raw.split(' ');
    match (tokens.next(), tokens.next(), tokens.next()) {
        (Some(type_name), Some(name), None) if !type_name.is_empty() && !name.is_empty() => {
            Some((name.to_string(), TypeDescriptor::scalar(type_name)))
        }
        _ => None,
    }
}

/// Parse une seule déclaration de type
pub fn parse_type(raw: &str) -> Option<(String, TypeDescriptor)> {
    TypeParser::new().parse(raw)
}

/// Parse une liste de déclarations et construit la table des types
///
/// Les doublons s'écrasent (le dernier gagne). La table est triée par nom.
pub fn parse_types<I, S>(raws: I) -> (TypesTable, ParseReport)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = TypeParser::new();
    let mut types = TypesTable::new();

    for raw in raws {
        if let Some((name, descriptor)) = parser.parse(raw.as_ref()) {
            types.insert(name, descriptor);
        }
    }

    (types, parser.into_report())
}
