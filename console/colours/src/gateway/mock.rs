use super::{GatewayError, GraphQlRequest, RawResponse, Transport};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

enum Scripted {
    Response(RawResponse),
    Failure(String),
}

#[derive(Default)]
struct MockState {
    script: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<GraphQlRequest>>,
    gate: Mutex<Option<Arc<Notify>>>,
}

/// A transport that replays scripted responses in order and records every
/// request it receives.
#[derive(Clone, Default)]
pub(crate) struct MockTransport(Arc<MockState>);

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a successful response whose `data` is the given value.
    pub fn respond(&self, data: Value) {
        self.respond_raw(200, json!({ "data": data }));
    }

    pub fn respond_raw(&self, status: u16, body: Value) {
        self.respond_bytes(status, body.to_string().into_bytes());
    }

    pub fn respond_bytes(&self, status: u16, body: Vec<u8>) {
        self.push(Scripted::Response(RawResponse { status, body }));
    }

    pub fn fail(&self, message: &str) {
        self.push(Scripted::Failure(message.to_owned()));
    }

    /// Holds every subsequent request until the returned handle is notified.
    pub fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.0.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    pub fn requests(&self) -> Vec<GraphQlRequest> {
        self.0.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.0.requests.lock().unwrap().len()
    }

    fn push(&self, scripted: Scripted) {
        self.0.script.lock().unwrap().push_back(scripted);
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: &GraphQlRequest) -> Result<RawResponse, GatewayError> {
        self.0.requests.lock().unwrap().push(request.clone());
        let gate = self.0.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.0.script.lock().unwrap().pop_front() {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Failure(message)) => Err(GatewayError::Transport(message)),
            None => Err(GatewayError::Transport(format!(
                "unscripted request {}",
                request.operation_name
            ))),
        }
    }
}
