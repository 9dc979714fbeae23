#![allow(dead_code)]
//! Shared fixtures: a scripted in-memory transport and a `persons` site.

use async_trait::async_trait;
use cloudsite_link::{
    Session, Transport, TransportError, TransportRequest, TransportResponse,
};
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

pub const CUSTOMER_ID: &str = "0f4b1c52-2d3e-4a5b-9c6d-7e8f9a0b1c2d";
pub const SITE_ID: &str = "1a2b3c4d-5e6f-4a7b-8c9d-0e1f2a3b4c5d";
pub const PERSONS_ID: &str = "6c1d2e3f-4a5b-4c6d-8e7f-9a0b1c2d3e4f";
pub const ANN_EID: &str = "7b1e2d3c-4f5a-4b6c-8d7e-9f0a1b2c3d4e";

/// Records every request and answers from a queue of scripted responses.
/// An empty queue answers `404`.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, status: u16, body: JsonValue) {
        self.responses
            .lock()
            .push_back(Ok(TransportResponse::new(status, body)));
    }

    pub fn respond_with(&self, response: TransportResponse) {
        self.responses.lock().push_back(Ok(response));
    }

    pub fn fail(&self, error: TransportError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Sleep this long before answering each request
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> TransportRequest {
        self.requests
            .lock()
            .last()
            .cloned()
            .expect("no request was sent")
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().push(request);
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.responses.lock().pop_front();
        scripted.unwrap_or_else(|| Err(TransportError::Status {
            status: 404,
            body: "no scripted response".into(),
        }))
    }
}

/// Schema document of a `crm` application holding `persons`
/// (partition key `pk`, cluster key `ck`, view `byPk`).
pub fn schema_document() -> JsonValue {
    json!({
        "crm": {
            "resources": [{
                "id": PERSONS_ID,
                "name": "persons",
                "attributes": [
                    {"id": "6c1d2e3f-0000-4c6d-8e7f-000000000001", "name": "eid", "type": "UUID"},
                    {"id": "6c1d2e3f-0000-4c6d-8e7f-000000000002", "name": "firstName", "type": "TEXT"},
                    {"id": "6c1d2e3f-0000-4c6d-8e7f-000000000003", "name": "age", "type": "NUMBER_INTEGER"},
                    {"id": "6c1d2e3f-0000-4c6d-8e7f-000000000004", "name": "cra", "type": "CREATED_AT"}
                ],
                "views": [
                    {
                        "name": "persons",
                        "primary": true,
                        "partitionKeys": [{"name": "pk", "type": "TEXT"}],
                        "clusterKeys": [{"name": "ck", "type": "TEXT", "orderBy": "ASC"}]
                    },
                    {
                        "name": "byPk",
                        "primary": false,
                        "partitionKeys": [{"name": "pk", "type": "TEXT"}]
                    }
                ]
            }]
        }
    })
}

pub fn session_with(transport: Arc<MockTransport>) -> Session {
    Session::builder()
        .base_url("https://site.example.com")
        .customer_id(CUSTOMER_ID)
        .site_id(SITE_ID)
        .api_key("site-key")
        .max_workers(2)
        .transport(transport)
        .build()
        .expect("valid session configuration")
}

/// Session with the schema already loaded; the init request is recorded
/// as the transport's first request.
pub async fn initialized_session() -> (Session, Arc<MockTransport>) {
    let transport = MockTransport::new();
    transport.respond(200, schema_document());
    let session = session_with(Arc::clone(&transport));
    session.init().await.expect("init succeeds");
    (session, transport)
}
