//! Endpoints API REST des services SOAP
//!
//! Chaque service est monté sous `/<service>` :
//!
//! - `GET /<service>` : opérations accessibles
//! - `GET /<service>/_doc` : documentation Swagger générée
//! - `POST /<service>/_refresh` : invalide le schéma
//! - `POST /<service>/{operation}` : appelle une opération (corps JSON objet)

use crate::access::AccessMask;
use crate::error::SoapServiceError;
use crate::functions::OperationName;
use crate::service::SoapService;
use crate::transport::Payload;
use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

/// Droits de l'appelant sur une opération
pub type PermissionFn = Arc<dyn Fn(&OperationName) -> AccessMask + Send + Sync>;

/// État partagé des routes d'un service
#[derive(Clone)]
pub struct SoapApiState {
    pub service: Arc<SoapService>,
    pub permissions: PermissionFn,
}

impl SoapApiState {
    /// État donnant tous les droits sur toutes les opérations
    pub fn new(service: Arc<SoapService>) -> Self {
        Self {
            service,
            permissions: Arc::new(|_| AccessMask::ALL),
        }
    }

    pub fn with_permissions<F>(mut self, permissions: F) -> Self
    where
        F: Fn(&OperationName) -> AccessMask + Send + Sync + 'static,
    {
        self.permissions = Arc::new(permissions);
        self
    }
}

/// Opérations d'un service
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OperationList {
    pub service: String,
    /// Noms canoniques, triés
    pub operations: Vec<String>,
}

/// Réponse d'une invalidation du schéma
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub success: bool,
    pub message: String,
}

/// Corps des réponses d'erreur
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Crée le router d'un service (tous droits)
pub fn create_router(service: Arc<SoapService>) -> Router {
    create_router_with_state(SoapApiState::new(service))
}

/// Crée le router d'un service avec un état explicite
pub fn create_router_with_state(state: SoapApiState) -> Router {
    Router::new()
        .route("/", get(list_operations))
        .route("/_doc", get(get_docs))
        .route("/_refresh", post(refresh_schema))
        .route("/{operation}", post(call_operation))
        .with_state(state)
}

/// Monte chaque service sous `/<nom du service>`
pub fn create_services_router<I>(services: I) -> Router
where
    I: IntoIterator<Item = Arc<SoapService>>,
{
    services.into_iter().fold(Router::new(), |router, service| {
        let prefix = format!("/{}", service.name());
        router.nest(&prefix, create_router(service))
    })
}

/// GET /{service} - Liste des opérations accessibles
#[utoipa::path(
    get,
    path = "/{service}",
    tag = "soap",
    params(("service" = String, Path, description = "Nom du service SOAP")),
    responses(
        (status = 200, description = "Opérations du service", body = OperationList),
        (status = 502, description = "Introspection SOAP impossible", body = ErrorResponse)
    )
)]
pub async fn list_operations(
    State(state): State<SoapApiState>,
) -> Result<Json<OperationList>, AppError> {
    let operations = state
        .service
        .operation_names()
        .await?
        .into_iter()
        .filter(|name| !(state.permissions)(&OperationName::new(name.clone())).is_empty())
        .collect();

    Ok(Json(OperationList {
        service: state.service.name().to_string(),
        operations,
    }))
}

/// GET /{service}/_doc - Documentation Swagger du service
#[utoipa::path(
    get,
    path = "/{service}/_doc",
    tag = "soap",
    params(("service" = String, Path, description = "Nom du service SOAP")),
    responses(
        (status = 200, description = "Document Swagger 2.0", body = serde_json::Value),
        (status = 502, description = "Introspection SOAP impossible", body = ErrorResponse)
    )
)]
pub async fn get_docs(State(state): State<SoapApiState>) -> Result<Json<Value>, AppError> {
    let permissions = state.permissions.clone();
    let document = state
        .service
        .api_docs(move |operation| permissions(operation))
        .await?;
    Ok(Json(document))
}

/// POST /{service}/_refresh - Invalide le schéma du service
#[utoipa::path(
    post,
    path = "/{service}/_refresh",
    tag = "soap",
    params(("service" = String, Path, description = "Nom du service SOAP")),
    responses(
        (status = 200, description = "Schéma invalidé", body = RefreshResponse)
    )
)]
pub async fn refresh_schema(State(state): State<SoapApiState>) -> Json<RefreshResponse> {
    state.service.refresh_table_cache().await;
    Json(RefreshResponse {
        success: true,
        message: format!("Schema of '{}' will be rebuilt on next access", state.service.name()),
    })
}

/// POST /{service}/{operation} - Appelle une opération SOAP
#[utoipa::path(
    post,
    path = "/{service}/{operation}",
    tag = "soap",
    params(
        ("service" = String, Path, description = "Nom du service SOAP"),
        ("operation" = String, Path, description = "Nom de l'opération (insensible à la casse)")
    ),
    request_body(content = serde_json::Value, description = "Arguments de l'opération (objet JSON)"),
    responses(
        (status = 200, description = "Réponse normalisée", body = serde_json::Value),
        (status = 400, description = "Arguments invalides", body = ErrorResponse),
        (status = 403, description = "Opération non autorisée", body = ErrorResponse),
        (status = 404, description = "Opération inconnue", body = ErrorResponse),
        (status = 502, description = "Erreur du service SOAP", body = ErrorResponse)
    )
)]
pub async fn call_operation(
    State(state): State<SoapApiState>,
    Path(operation): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let payload: Payload = if body.iter().all(u8::is_ascii_whitespace) {
        Payload::new()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            SoapServiceError::InvalidArgument(format!("request body must be a JSON object: {}", e))
        })?
    };

    let Some(name) = state.service.resolve(&operation).await? else {
        return Err(SoapServiceError::NotFound(operation).into());
    };
    if !(state.permissions)(&name).contains(AccessMask::POST) {
        debug!(operation = %name, "Rejected SOAP call without POST permission");
        return Err(AppError::Forbidden(name.to_string()));
    }

    let result = state.service.invoke(name.canonical(), payload).await?;
    Ok(Json(result))
}

// ============ Gestion des erreurs ============

/// Erreur renvoyée par les handlers
#[derive(Debug)]
pub enum AppError {
    Service(SoapServiceError),
    Forbidden(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Service(err) => (
                StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                err.to_string(),
            ),
            AppError::Forbidden(operation) => (
                StatusCode::FORBIDDEN,
                format!("Calling '{}' is not allowed", operation),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<SoapServiceError> for AppError {
    fn from(err: SoapServiceError) -> Self {
        AppError::Service(err)
    }
}
