//! Mock transports for testing
//!
//! These let the coordinator be driven without a server.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::TransportError;
use crate::transport::{ChatRequest, ChatResponse, ChatTransport};

/// Transport that returns queued responses in order
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<ChatResponse, TransportError>>>,
    /// Record of all requests made
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_response(&self, response: ChatResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: TransportError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no mock response queued".into())))
    }
}

/// Transport that records the request, then parks until [`release`] is
/// called, so a test can act while the request is in flight.
///
/// [`release`]: GatedTransport::release
pub struct GatedTransport {
    inner: MockTransport,
    arrived: Notify,
    gate: Notify,
}

impl GatedTransport {
    pub fn new(response: Result<ChatResponse, TransportError>) -> Self {
        let inner = MockTransport::new();
        match response {
            Ok(body) => inner.queue_response(body),
            Err(e) => inner.queue_error(e),
        }
        Self {
            inner,
            arrived: Notify::new(),
            gate: Notify::new(),
        }
    }

    /// Wait until a request has reached the transport.
    pub async fn wait_for_request(&self) {
        self.arrived.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }

    pub fn call_count(&self) -> usize {
        self.inner.call_count()
    }
}

#[async_trait]
impl ChatTransport for GatedTransport {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, TransportError> {
        self.inner.requests.lock().unwrap().push(request.clone());
        self.arrived.notify_one();
        self.gate.notified().await;
        self.inner
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no mock response queued".into())))
    }
}
