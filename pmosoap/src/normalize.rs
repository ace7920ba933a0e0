//! Conversion des réponses SOAP en valeurs JSON
//!
//! Les objets deviennent des mappings (ordre des attributs conservé), les
//! séquences sont converties élément par élément et les scalaires passent
//! tels quels. La profondeur est bornée par [`MAX_NORMALIZE_DEPTH`].

use crate::error::{Result, SoapServiceError};
use crate::transport::SoapValue;
use serde_json::{Map, Number, Value};

/// Profondeur maximale d'imbrication d'une réponse
pub const MAX_NORMALIZE_DEPTH: usize = 128;

/// Convertit une réponse SOAP en JSON avec la profondeur par défaut
pub fn normalize(value: &SoapValue) -> Result<Value> {
    normalize_with_depth(value, MAX_NORMALIZE_DEPTH)
}

/// Convertit une réponse SOAP en JSON
///
/// # Errors
///
/// [`SoapServiceError::ResponseTooDeep`] si l'imbrication dépasse `max_depth`
pub fn normalize_with_depth(value: &SoapValue, max_depth: usize) -> Result<Value> {
    walk(value, 0, max_depth)
}

fn walk(value: &SoapValue, depth: usize, max_depth: usize) -> Result<Value> {
    if depth > max_depth {
        return Err(SoapServiceError::ResponseTooDeep(max_depth));
    }

    Ok(match value {
        SoapValue::Null => Value::Null,
        SoapValue::Bool(b) => Value::Bool(*b),
        SoapValue::Int(i) => Value::Number((*i).into()),
        // JSON n'a pas de NaN ni d'infini
        SoapValue::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
        SoapValue::String(s) => Value::String(s.clone()),
        SoapValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| walk(item, depth + 1, max_depth))
                .collect::<Result<Vec<_>>>()?,
        ),
        SoapValue::Object(object) => {
            let mut map = Map::with_capacity(object.len());
            for (name, attribute) in object.attributes() {
                map.insert(name.to_string(), walk(attribute, depth + 1, max_depth)?);
            }
            Value::Object(map)
        }
    })
}
