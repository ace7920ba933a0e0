#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use pmosoap::{
    ConnectRequest, Payload, SoapConnector, SoapObject, SoapTransport, SoapValue, TransportError,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("pmosoap=debug")
        .try_init();
}

/// Client SOAP simulé : introspection fixe, réponses programmées
#[derive(Default)]
pub struct MockTransport {
    pub functions: Vec<String>,
    pub types: Vec<String>,
    responses: Mutex<HashMap<String, Result<SoapValue, TransportError>>>,
    introspection_error: Mutex<Option<TransportError>>,
    pub calls: Mutex<Vec<(String, Payload)>>,
    pub functions_calls: AtomicUsize,
    pub types_calls: AtomicUsize,
}

impl MockTransport {
    /// Service météo de démonstration
    pub fn weather() -> Self {
        let transport = Self {
            functions: vec![
                "GetWeatherResponse GetWeather(GetWeather $parameters)".to_string(),
                "Greeting Hello(Person $person)".to_string(),
                "void Ping()".to_string(),
                "this is not a signature".to_string(),
            ],
            types: vec![
                "struct GetWeather {\n string city;\n int days;\n}".to_string(),
                "struct GetWeatherResponse {\n Forecast forecast;\n}".to_string(),
                "struct Forecast {\n string city;\n ArrayOfDouble temperatures;\n}".to_string(),
                "struct Person { string name; int age }".to_string(),
                "string Greeting".to_string(),
                "malformed".to_string(),
            ],
            ..Default::default()
        };

        transport.respond(
            "GetWeather",
            SoapObject::of_class("GetWeatherResponse")
                .with(
                    "forecast",
                    SoapObject::of_class("Forecast")
                        .with("city", "Paris")
                        .with(
                            "temperatures",
                            vec![SoapValue::from(21.5), SoapValue::from(19.0)],
                        ),
                )
                .into(),
        );
        transport.respond("Hello", SoapValue::from("Hello Bob"));
        transport
    }

    pub fn respond(&self, operation: &str, value: SoapValue) {
        self.responses
            .lock()
            .insert(operation.to_string(), Ok(value));
    }

    pub fn fail(&self, operation: &str, error: TransportError) {
        self.responses
            .lock()
            .insert(operation.to_string(), Err(error));
    }

    pub fn fail_introspection(&self, error: TransportError) {
        *self.introspection_error.lock() = Some(error);
    }

    pub fn functions_calls(&self) -> usize {
        self.functions_calls.load(Ordering::SeqCst)
    }

    pub fn types_calls(&self) -> usize {
        self.types_calls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<(String, Payload)> {
        self.calls.lock().last().cloned()
    }
}

#[async_trait]
impl SoapTransport for MockTransport {
    async fn functions(&self) -> Result<Vec<String>, TransportError> {
        self.functions_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.introspection_error.lock().clone() {
            return Err(error);
        }
        Ok(self.functions.clone())
    }

    async fn types(&self) -> Result<Vec<String>, TransportError> {
        self.types_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.introspection_error.lock().clone() {
            return Err(error);
        }
        Ok(self.types.clone())
    }

    async fn call(&self, operation: &str, payload: Payload) -> Result<SoapValue, TransportError> {
        self.calls.lock().push((operation.to_string(), payload));
        self.responses
            .lock()
            .get(operation)
            .cloned()
            .unwrap_or(Ok(SoapValue::Null))
    }
}

/// Connecteur renvoyant toujours le même client simulé
pub struct MockConnector {
    pub transport: Arc<MockTransport>,
    pub failure: Option<TransportError>,
    pub requests: Mutex<Vec<ConnectRequest>>,
}

impl MockConnector {
    pub fn new(transport: Arc<MockTransport>) -> Self {
        Self {
            transport,
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: TransportError) -> Self {
        Self {
            transport: Arc::new(MockTransport::default()),
            failure: Some(error),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SoapConnector for MockConnector {
    async fn connect(
        &self,
        request: ConnectRequest,
    ) -> Result<Arc<dyn SoapTransport>, TransportError> {
        self.requests.lock().push(request);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(self.transport.clone()),
        }
    }
}
