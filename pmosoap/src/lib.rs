//! # pmosoap - Services SOAP exposés comme ressources REST
//!
//! Cette crate découvre les opérations et les types d'un service SOAP par
//! introspection, les met en cache, route les appels vers l'opération SOAP
//! correspondante et génère la documentation Swagger du service.
//!
//! ## Vue d'ensemble
//!
//! - Parsing des déclarations de types (`struct X { ... }`, `string Y`)
//! - Parsing des signatures d'opérations (`Resp Op(Req $p)`)
//! - Construction paresseuse du schéma, mise en cache avec TTL (`moka`)
//! - Résolution des opérations insensible à la casse et invocation
//! - Normalisation des réponses SOAP en JSON
//! - Documentation filtrée par les droits de l'appelant
//! - Intégration avec `pmoconfig` (`soap.services`, `soap.cache`)
//!
//! Le client SOAP lui-même (XML, HTTP, WS-Security) n'est pas implémenté ici :
//! il est fourni par un [`SoapConnector`].
//!
//! ## Architecture
//!
//! ```text
//! pmosoap/
//! ├── src/
//! │   ├── lib.rs          # Module principal (ce fichier)
//! │   ├── service.rs      # SoapService : façade d'un service configuré
//! │   ├── schema.rs       # Construction et invalidation du schéma
//! │   ├── types.rs        # Parsing des types
//! │   ├── functions.rs    # Parsing des signatures d'opérations
//! │   ├── cache.rs        # Cache des tables (moka)
//! │   ├── dispatch.rs     # Table de dispatch et invocation
//! │   ├── normalize.rs    # Réponses SOAP -> JSON
//! │   ├── docs.rs         # Documentation Swagger
//! │   ├── access.rs       # Droits REST
//! │   ├── config.rs       # Configuration d'un service
//! │   ├── config_ext.rs   # Extension pmoconfig
//! │   ├── headers.rs      # En-têtes SOAP
//! │   ├── transport.rs    # Frontière avec le client SOAP
//! │   ├── error.rs        # Gestion des erreurs
//! │   ├── api.rs          # Endpoints REST (feature `api`)
//! │   └── openapi.rs      # Documentation OpenAPI (feature `api`)
//! ```
//!
//! ## Utilisation
//!
//! ```rust,ignore
//! use pmosoap::{MemoryCacheStore, SoapService, ServiceConfig, DEFAULT_CACHE_TTL};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServiceConfig::new(1, "weather").with_wsdl("http://example.com/weather?wsdl");
//!     let store = Arc::new(MemoryCacheStore::new());
//!
//!     // `connector` implémente SoapConnector
//!     let service = SoapService::connect(config, &connector, store, DEFAULT_CACHE_TTL).await?;
//!
//!     let forecast = service
//!         .invoke("getweather", serde_json::json!({"city": "Paris"}).as_object().cloned().unwrap_or_default())
//!         .await?;
//!     println!("{}", forecast);
//!     Ok(())
//! }
//! ```
//!
//! ## Cache
//!
//! Les tables sont stockées sous `service_<id>:functions` et
//! `service_<id>:types`. La table des types n'expire pas ; celle des
//! opérations suit le TTL du service (`cache_ttl`, sinon `soap.cache.ttl`,
//! 300 secondes par défaut). `refresh_table_cache` invalide les deux.

pub mod access;
pub mod cache;
pub mod config;
pub mod config_ext;
pub mod dispatch;
pub mod docs;
pub mod error;
pub mod functions;
pub mod headers;
pub mod normalize;
pub mod schema;
pub mod service;
pub mod transport;
pub mod types;

#[cfg(feature = "api")]
pub mod api;
#[cfg(feature = "api")]
pub mod openapi;

pub use access::AccessMask;
pub use cache::{
    CacheStore, DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL, MemoryCacheStore, SchemaCache,
};
pub use config::{Endpoint, HeaderConfig, HeaderKind, ServiceConfig, SoapOptions};
pub use config_ext::SoapConfigExt;
pub use dispatch::{Dispatcher, OperationHandle, OperationTable};
pub use docs::{DocFragment, base_document, build_docs};
pub use error::{Result, SoapServiceError};
pub use functions::{FunctionSchema, FunctionsTable, OperationName};
pub use headers::SoapHeader;
pub use normalize::{MAX_NORMALIZE_DEPTH, normalize};
pub use schema::{SchemaBuilder, SchemaSnapshot};
pub use service::SoapService;
pub use transport::{
    ConnectRequest, Payload, SoapConnector, SoapObject, SoapTransport, SoapValue, TransportError,
};
pub use types::{ParseReport, TypeDescriptor, TypeParser, TypesTable};

#[cfg(feature = "api")]
pub use api::{create_router, create_services_router};
#[cfg(feature = "api")]
pub use openapi::ApiDoc;
