//! Génération de la documentation (Swagger 2.0) d'un service SOAP
//!
//! Chaque opération accessible devient un chemin `POST /<service>/<opération>`,
//! chaque type une définition. Le fragment produit se fusionne dans un
//! document de base (voir [`base_document`]).

use crate::access::AccessMask;
use crate::dispatch::{call_event, function_called_event};
use crate::functions::{FunctionSchema, OperationName};
use crate::schema::SchemaSnapshot;
use crate::types::{TypeDescriptor, TypesTable};
use serde_json::{Map, Value, json};

/// Nom du modèle d'erreur partagé
pub const ERROR_MODEL: &str = "Error";

/// Chemins et définitions générés pour un service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocFragment {
    pub paths: Map<String, Value>,
    pub definitions: Map<String, Value>,
}

impl DocFragment {
    /// Fusionne le fragment dans un document de base
    ///
    /// Union superficielle : une entrée générée remplace l'entrée de même nom
    /// du document, les autres clés du document ne sont pas modifiées.
    pub fn merge_into(&self, base: &mut Value) {
        if !base.is_object() {
            *base = Value::Object(Map::new());
        }
        let Some(document) = base.as_object_mut() else {
            return;
        };

        for (section, entries) in [("paths", &self.paths), ("definitions", &self.definitions)] {
            let target = document
                .entry(section)
                .or_insert_with(|| Value::Object(Map::new()));
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Some(target) = target.as_object_mut() {
                for (name, entry) in entries {
                    target.insert(name.clone(), entry.clone());
                }
            }
        }
    }

    pub fn into_value(self) -> Value {
        json!({
            "paths": self.paths,
            "definitions": self.definitions,
        })
    }
}

/// Document Swagger de base d'un service, avec le modèle d'erreur partagé
pub fn base_document(service: &str, description: Option<&str>) -> Value {
    json!({
        "swagger": "2.0",
        "info": {
            "title": service,
            "description": description.unwrap_or_default(),
            "version": "1.0.0"
        },
        "consumes": ["application/json"],
        "produces": ["application/json"],
        "paths": {},
        "definitions": {
            ERROR_MODEL: {
                "type": "object",
                "required": ["error"],
                "properties": {
                    "error": {"type": "string"}
                }
            }
        }
    })
}

/// Génère la documentation d'un service
///
/// # Arguments
///
/// * `service` - Nom du service
/// * `snapshot` - Schéma du service
/// * `permissions_of` - Droits de l'appelant pour une opération ; les
///   opérations sans aucun droit ne sont pas documentées
pub fn build_docs<F>(service: &str, snapshot: &SchemaSnapshot, permissions_of: F) -> DocFragment
where
    F: Fn(&OperationName) -> AccessMask,
{
    let mut fragment = DocFragment::default();

    for function in snapshot.functions.values() {
        let operation = function.operation_name();
        if permissions_of(&operation).is_empty() {
            continue;
        }
        fragment.paths.insert(
            format!("/{}/{}", service, operation.canonical()),
            json!({ "post": operation_entry(service, function, &snapshot.types) }),
        );
    }

    for (name, descriptor) in snapshot.types.iter() {
        fragment.definitions.insert(
            definition_name(name, &snapshot.types),
            definition(descriptor, &snapshot.types),
        );
    }

    fragment
}

fn operation_entry(service: &str, function: &FunctionSchema, types: &TypesTable) -> Value {
    let operation_id = format!("call{}{}", capitalize(service), capitalize(&function.name));

    let mut success = json!({"description": "Successful operation"});
    if !function.response_type.is_empty() && function.response_type != "void" {
        success["schema"] = schema_for(&function.response_type, types);
    }

    let mut entry = json!({
        "tags": [service],
        "operationId": operation_id,
        "summary": operation_id,
        "description": function.description,
        "responses": {
            "200": success,
            "default": {
                "description": "Error",
                "schema": {"$ref": format!("#/definitions/{}", ERROR_MODEL)}
            }
        },
        "x-publishedEvents": [
            call_event(service, &function.name),
            function_called_event(service)
        ]
    });

    if !function.request_type.is_empty() {
        entry["parameters"] = json!([{
            "in": "body",
            "name": "body",
            "required": true,
            "schema": schema_for(&function.request_type, types)
        }]);
    }

    entry
}

fn definition(descriptor: &TypeDescriptor, types: &TypesTable) -> Value {
    match descriptor {
        TypeDescriptor::Struct { fields } => {
            let properties: Map<String, Value> = fields
                .iter()
                .map(|(field, field_type)| (field.clone(), schema_for(field_type, types)))
                .collect();
            json!({"type": "object", "properties": properties})
        }
        TypeDescriptor::Scalar { type_name } => json!({
            "type": "object",
            "properties": {
                "value": schema_for(type_name, types)
            }
        }),
    }
}

/// Schéma JSON d'un nom de type SOAP
///
/// Les types du service deviennent des `$ref`, les types primitifs XSD leur
/// équivalent JSON. Un nom inconnu n'a pas de définition : il est décrit par
/// `x-soap-type`.
pub fn schema_for(type_name: &str, types: &TypesTable) -> Value {
    if types.contains_key(type_name) {
        let reference = format!("#/definitions/{}", definition_name(type_name, types));
        return json!({ "$ref": reference });
    }

    match xsd_primitive(type_name) {
        Some(primitive) => primitive,
        None => json!({"type": "object", "x-soap-type": type_name}),
    }
}

/// Nom de la définition d'un type du service
///
/// Un type qui porte le nom du modèle d'erreur partagé est renommé
/// (`ErrorType`, puis `ErrorType_`...) pour ne pas l'écraser à la fusion.
pub fn definition_name(type_name: &str, types: &TypesTable) -> String {
    if type_name != ERROR_MODEL {
        return type_name.to_string();
    }
    let mut alias = format!("{}Type", type_name);
    while types.contains_key(&alias) {
        alias.push('_');
    }
    alias
}

fn xsd_primitive(type_name: &str) -> Option<Value> {
    let schema = match type_name {
        "string" | "normalizedString" | "token" | "anyURI" | "QName" | "language" | "NMTOKEN"
        | "ID" | "IDREF" | "duration" | "time" => json!({"type": "string"}),
        "date" => json!({"type": "string", "format": "date"}),
        "dateTime" => json!({"type": "string", "format": "date-time"}),
        "base64Binary" => json!({"type": "string", "format": "byte"}),
        "hexBinary" => json!({"type": "string", "format": "binary"}),
        "int" | "short" | "byte" | "unsignedShort" | "unsignedByte" => {
            json!({"type": "integer", "format": "int32"})
        }
        "long" | "unsignedInt" | "unsignedLong" => json!({"type": "integer", "format": "int64"}),
        "integer" | "positiveInteger" | "negativeInteger" | "nonNegativeInteger"
        | "nonPositiveInteger" => json!({"type": "integer"}),
        "float" => json!({"type": "number", "format": "float"}),
        "double" => json!({"type": "number", "format": "double"}),
        "decimal" => json!({"type": "number"}),
        "boolean" => json!({"type": "boolean"}),
        "anyType" => json!({"type": "object"}),
        _ => return None,
    };
    Some(schema)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
