mod support;

use pmosoap::{
    AccessMask, CacheStore, DEFAULT_CACHE_TTL, HeaderConfig, MemoryCacheStore, Payload,
    ServiceConfig, SoapConfigExt, SoapService, SoapServiceError, TransportError, TypeDescriptor,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use support::{MockConnector, MockTransport, init_tracing};

fn weather_config(id: u32) -> ServiceConfig {
    ServiceConfig::new(id, "weather")
        .with_wsdl("http://example.com/weather?wsdl")
        .with_description("Weather forecasts")
}

async fn connect(
    config: ServiceConfig,
    transport: Arc<MockTransport>,
    store: Arc<dyn CacheStore>,
) -> SoapService {
    let connector = MockConnector::new(transport);
    SoapService::connect(config, &connector, store, DEFAULT_CACHE_TTL)
        .await
        .unwrap()
}

async fn weather_service() -> (SoapService, Arc<MockTransport>) {
    init_tracing();
    let transport = Arc::new(MockTransport::weather());
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let service = connect(weather_config(1), transport.clone(), store).await;
    (service, transport)
}

fn payload(value: serde_json::Value) -> Payload {
    value.as_object().cloned().unwrap_or_default()
}

// ============ Schéma ============

#[tokio::test]
async fn test_types_are_sorted_and_resolved() {
    let (service, _) = weather_service().await;

    let types = service.get_types(false).await.unwrap();
    let names: Vec<&str> = types.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec!["Forecast", "GetWeather", "GetWeatherResponse", "Greeting", "Person"]
    );

    let functions = service.get_functions(false).await.unwrap();
    let hello = &functions["hello"];
    assert_eq!(
        hello.request_fields,
        Some(TypeDescriptor::structure([("name", "string"), ("age", "int")]))
    );
    assert_eq!(hello.response_fields, Some(TypeDescriptor::scalar("string")));
}

#[tokio::test]
async fn test_build_report_counts_silent_drops() {
    let (service, _) = weather_service().await;
    service.snapshot().await.unwrap();

    let report = service.last_build_report();
    assert_eq!(report.parsed_types, 5);
    assert_eq!(report.dropped_types, 1);
    assert_eq!(report.parsed_functions, 3);
    assert_eq!(report.dropped_functions, 1);
}

#[tokio::test]
async fn test_get_functions_is_idempotent() {
    let (service, transport) = weather_service().await;

    let first = service.get_functions(false).await.unwrap();
    let second = service.get_functions(false).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(transport.functions_calls(), 1);
    assert_eq!(transport.types_calls(), 1);
}

#[tokio::test]
async fn test_refresh_table_cache_forces_rebuild() {
    let (service, transport) = weather_service().await;

    service.get_functions(false).await.unwrap();
    service.refresh_table_cache().await;
    service.get_functions(false).await.unwrap();
    service.get_types(false).await.unwrap();

    assert_eq!(transport.functions_calls(), 2);
    assert_eq!(transport.types_calls(), 2);
}

#[tokio::test]
async fn test_refresh_flag_reads_cache_before_rebuilding() {
    let (service, transport) = weather_service().await;

    service.get_functions(false).await.unwrap();
    service.get_functions(true).await.unwrap();

    // les tables sont encore en cache : pas de nouvelle introspection
    assert_eq!(transport.functions_calls(), 1);
}

#[tokio::test]
async fn test_cache_is_shared_between_instances_with_same_id() {
    init_tracing();
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());

    let first_transport = Arc::new(MockTransport::weather());
    let first = connect(weather_config(7), first_transport.clone(), store.clone()).await;
    first.get_functions(false).await.unwrap();

    let second_transport = Arc::new(MockTransport::weather());
    let second = connect(weather_config(7), second_transport.clone(), store.clone()).await;
    let functions = second.get_functions(false).await.unwrap();

    assert_eq!(functions.len(), 3);
    assert_eq!(second_transport.functions_calls(), 0);
    assert!(store.get("service_7:functions").await.is_some());
    assert!(store.get("service_7:types").await.is_some());

    let other_transport = Arc::new(MockTransport::weather());
    let other = connect(weather_config(8), other_transport.clone(), store).await;
    other.get_functions(false).await.unwrap();
    assert_eq!(other_transport.functions_calls(), 1);
}

#[tokio::test]
async fn test_disabled_cache_is_never_written() {
    init_tracing();
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let transport = Arc::new(MockTransport::weather());
    let config = weather_config(9).with_cache(false, None);

    let service = connect(config, transport, store.clone()).await;
    service.get_functions(false).await.unwrap();

    assert!(store.get("service_9:functions").await.is_none());
    assert!(store.get("service_9:types").await.is_none());
}

#[tokio::test]
async fn test_functions_entry_follows_service_ttl() {
    init_tracing();
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let transport = Arc::new(MockTransport::weather());
    let connector = MockConnector::new(transport);

    let service = SoapService::connect(
        weather_config(10),
        &connector,
        store.clone(),
        Duration::from_millis(50),
    )
    .await
    .unwrap();
    service.get_functions(false).await.unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(store.get("service_10:functions").await.is_none());
    assert!(store.get("service_10:types").await.is_some());
}

// ============ Dispatch ============

#[tokio::test]
async fn test_resolve_is_case_insensitive() {
    let (service, _) = weather_service().await;

    let upper = service.resolve("GETWEATHER").await.unwrap().unwrap();
    let lower = service.resolve("getweather").await.unwrap().unwrap();
    assert_eq!(upper, lower);
    assert_eq!(upper.canonical(), "GetWeather");

    assert!(service.exists("ping").await.unwrap());
    assert!(!service.exists("doesNotExist").await.unwrap());
}

#[tokio::test]
async fn test_empty_name_is_invalid() {
    let (service, _) = weather_service().await;

    for name in ["", "   "] {
        let err = service.resolve(name).await.unwrap_err();
        assert!(err.is_invalid_argument());
        assert_eq!(err.status_code(), 400);
    }
}

#[tokio::test]
async fn test_unknown_operation_is_not_found() {
    let (service, transport) = weather_service().await;

    let err = service
        .invoke("doesNotExist", Payload::new())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("doesNotExist"));
    assert!(transport.last_call().is_none());
}

#[tokio::test]
async fn test_invoke_uses_canonical_name_and_normalizes() {
    let (service, transport) = weather_service().await;

    let result = service
        .invoke("getweather", payload(json!({"city": "Paris", "days": 2})))
        .await
        .unwrap();

    assert_eq!(
        result,
        json!({"forecast": {"city": "Paris", "temperatures": [21.5, 19.0]}})
    );

    let (operation, sent) = transport.last_call().unwrap();
    assert_eq!(operation, "GetWeather");
    assert_eq!(sent, payload(json!({"city": "Paris", "days": 2})));
}

#[tokio::test]
async fn test_upstream_fault_keeps_its_message() {
    let (service, transport) = weather_service().await;
    transport.fail("Hello", TransportError::fault("Server", "Unknown person"));

    let err = service.invoke("hello", Payload::new()).await.unwrap_err();

    assert!(matches!(err, SoapServiceError::Upstream(_)));
    assert_eq!(err.to_string(), "SOAP fault (Server): Unknown person");

    // l'échec d'un appel ne touche pas au schéma
    assert!(service.exists("hello").await.unwrap());
}

#[tokio::test]
async fn test_introspection_failure_propagates() {
    init_tracing();
    let transport = Arc::new(MockTransport::weather());
    transport.fail_introspection(TransportError::transport("WSDL unreachable"));
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let service = connect(weather_config(11), transport, store).await;

    let err = service.resolve("GetWeather").await.unwrap_err();
    assert!(matches!(err, SoapServiceError::Upstream(_)));
    assert_eq!(err.to_string(), "WSDL unreachable");
}

// ============ Construction ============

#[tokio::test]
async fn test_missing_endpoint_is_a_configuration_error() {
    init_tracing();
    let connector = MockConnector::new(Arc::new(MockTransport::weather()));
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());

    let result = SoapService::connect(
        ServiceConfig::new(1, "broken"),
        &connector,
        store,
        DEFAULT_CACHE_TTL,
    )
    .await;

    let err = result.err().unwrap();
    assert!(matches!(err, SoapServiceError::Configuration(_)));
    assert!(err.is_fatal());
    assert!(connector.requests.lock().is_empty());
}

#[tokio::test]
async fn test_connector_failure_is_a_construction_error() {
    init_tracing();
    let connector = MockConnector::failing(TransportError::transport("Connection refused"));
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());

    let err = SoapService::connect(weather_config(1), &connector, store, DEFAULT_CACHE_TTL)
        .await
        .err()
        .unwrap();

    assert!(matches!(err, SoapServiceError::Construction(_)));
    assert!(err.to_string().contains("Connection refused"));
}

#[tokio::test]
async fn test_connect_request_carries_options_and_headers() {
    init_tracing();
    let connector = MockConnector::new(Arc::new(MockTransport::weather()));
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let config = weather_config(1)
        .with_option("soap_version", "SOAP_1_2")
        .with_header(HeaderConfig::wsse("bob", "secret"))
        .with_header(HeaderConfig::generic("urn:auth", "Token", ""));

    let service = SoapService::connect(config, &connector, store, DEFAULT_CACHE_TTL)
        .await
        .unwrap();

    assert_eq!(service.headers().len(), 1);
    let requests = connector.requests.lock();
    assert_eq!(requests[0].options["soap_version"], json!(2));
    assert_eq!(requests[0].headers.len(), 1);
    assert_eq!(requests[0].headers[0].name, "Security");
}

#[tokio::test]
async fn test_connect_from_pmoconfig() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let config = pmoconfig::Config::load_config(dir.path().to_str().unwrap()).unwrap();
    config.set_soap_cache_ttl(Duration::from_secs(60)).unwrap();
    config.set_soap_service(&weather_config(3)).unwrap();

    assert_eq!(config.get_soap_cache_ttl(), Duration::from_secs(60));
    assert_eq!(config.get_soap_services().unwrap().len(), 1);

    let connector = MockConnector::new(Arc::new(MockTransport::weather()));
    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let service = SoapService::connect_configured(&config, "Weather", &connector, store.clone())
        .await
        .unwrap();
    assert_eq!(service.id(), 3);

    let err = SoapService::connect_configured(&config, "unknown", &connector, store)
        .await
        .err()
        .unwrap();
    assert!(matches!(err, SoapServiceError::Configuration(_)));
}

// ============ Documentation ============

#[tokio::test]
async fn test_docs_respect_permissions() {
    let (service, _) = weather_service().await;

    let docs = service
        .build_docs(|operation| match operation.key() {
            "ping" => AccessMask::NONE,
            _ => AccessMask::POST,
        })
        .await
        .unwrap();

    assert!(docs.paths.contains_key("/weather/GetWeather"));
    assert!(docs.paths.contains_key("/weather/Hello"));
    assert!(!docs.paths.contains_key("/weather/Ping"));
    assert_eq!(docs.definitions.len(), 5);
}

#[tokio::test]
async fn test_api_docs_merges_into_base_document() {
    let (service, _) = weather_service().await;

    let document = service.api_docs(|_| AccessMask::ALL).await.unwrap();

    assert_eq!(document["swagger"], "2.0");
    assert_eq!(document["info"]["description"], "Weather forecasts");
    assert!(document["definitions"]["Error"].is_object());
    assert_eq!(
        document["paths"]["/weather/GetWeather"]["post"]["operationId"],
        "callWeatherGetWeather"
    );
    assert_eq!(
        document["definitions"]["Forecast"]["properties"]["temperatures"],
        json!({"type": "object", "x-soap-type": "ArrayOfDouble"})
    );
    assert!(document["definitions"].get("ArrayOfDouble").is_none());
}
