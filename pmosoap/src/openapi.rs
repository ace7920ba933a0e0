use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "pmosoap API",
        version = "0.1.0",
        description = "Services SOAP exposés comme ressources REST"
    ),
    paths(
        crate::api::list_operations,
        crate::api::get_docs,
        crate::api::refresh_schema,
        crate::api::call_operation,
    ),
    components(
        schemas(
            crate::api::OperationList,
            crate::api::RefreshResponse,
            crate::api::ErrorResponse,
        )
    ),
    tags(
        (name = "soap", description = "Appel et documentation des services SOAP")
    )
)]
pub struct ApiDoc;
