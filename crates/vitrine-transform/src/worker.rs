//! Worker offload for the transform stage.
//!
//! Transforming is CPU-bound and runs against hostile input, so it can be
//! pushed onto a dedicated worker. Requests and responses are serde wire
//! types with explicit ids: the orchestrator only honors the response whose
//! id matches the current input's request, which is how superseded work gets
//! discarded. The in-process worker here talks over channels; the same
//! message shapes move out-of-process unchanged.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::failure::Failure;
use crate::transform::{transform, TransformConfig};

/// A transform request crossing the worker boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformRequest {
    /// Correlation id; echoed verbatim in the response.
    pub id: String,

    /// Raw source text.
    pub source: String,

    /// Diagnostic label for the module.
    pub label: String,

    #[serde(rename = "transformOptions", default)]
    pub options: TransformConfig,
}

/// A transform response crossing the worker boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformResponse {
    /// Correlation id copied from the request.
    pub id: String,

    #[serde(flatten)]
    pub payload: TransformPayload,
}

/// Response body: transformed code or a wire-shaped error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformPayload {
    Success { code: String },
    Error { error: WireError },
}

/// Error shape carried over the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireError {
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl From<Failure> for WireError {
    fn from(failure: Failure) -> Self {
        Self {
            message: failure.message,
            name: Some(format!("{}Error", capitalize(failure.stage.as_str()))),
            stack: failure.detail,
        }
    }
}

impl WireError {
    /// Fold a wire error back into the pipeline failure shape.
    pub fn into_failure(self) -> Failure {
        let failure = Failure::transform(self.message);
        match self.stack {
            Some(stack) => failure.with_detail(stack),
            None => failure,
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Handle to the transform worker thread.
///
/// Dropping the handle closes the request channel and ends the worker loop.
pub struct TransformWorker {
    requests: Sender<TransformRequest>,
    responses: Receiver<TransformResponse>,
    _handle: JoinHandle<()>,
}

impl TransformWorker {
    /// Spawn the worker thread.
    pub fn spawn() -> Self {
        let (req_tx, req_rx) = mpsc::channel::<TransformRequest>();
        let (resp_tx, resp_rx) = mpsc::channel::<TransformResponse>();

        let handle = thread::Builder::new()
            .name("vitrine-transform".to_string())
            .spawn(move || worker_loop(req_rx, resp_tx))
            .expect("failed to spawn transform worker");

        Self {
            requests: req_tx,
            responses: resp_rx,
            _handle: handle,
        }
    }

    /// Submit a request. Returns false if the worker has shut down.
    pub fn submit(&self, request: TransformRequest) -> bool {
        self.requests.send(request).is_ok()
    }

    /// Non-blocking poll for the next response.
    pub fn try_recv(&self) -> Option<TransformResponse> {
        self.responses.try_recv().ok()
    }

    /// Blocking receive with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<TransformResponse> {
        self.responses.recv_timeout(timeout).ok()
    }
}

fn worker_loop(requests: Receiver<TransformRequest>, responses: Sender<TransformResponse>) {
    while let Ok(request) = requests.recv() {
        let TransformRequest {
            id,
            source,
            label,
            options,
        } = request;

        tracing::debug!(%id, %label, "transform worker handling request");

        // A panic in the compiler must surface as an error response, never
        // take the worker (or the host) down.
        let outcome = catch_unwind(AssertUnwindSafe(|| transform(&source, &label, &options)));

        let payload = match outcome {
            Ok(Ok(module)) => TransformPayload::Success { code: module.code },
            Ok(Err(failure)) => TransformPayload::Error {
                error: WireError::from(failure),
            },
            Err(_) => TransformPayload::Error {
                error: WireError {
                    message: "transformer panicked".to_string(),
                    name: Some("InternalError".to_string()),
                    stack: None,
                },
            },
        };

        if responses.send(TransformResponse { id, payload }).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str, source: &str) -> TransformRequest {
        TransformRequest {
            id: id.to_string(),
            source: source.to_string(),
            label: format!("{id}.tsx"),
            options: TransformConfig::default(),
        }
    }

    #[test]
    fn round_trips_success_over_the_worker() {
        let worker = TransformWorker::spawn();
        assert!(worker.submit(request("r1", "export default function A() { return null; }")));

        let response = worker
            .recv_timeout(Duration::from_secs(5))
            .expect("worker response");

        assert_eq!(response.id, "r1");
        match response.payload {
            TransformPayload::Success { code } => {
                assert!(code.contains("exports.default = A;"));
            }
            TransformPayload::Error { error } => panic!("unexpected error: {}", error.message),
        }
    }

    #[test]
    fn reports_failures_as_error_payloads() {
        let worker = TransformWorker::spawn();
        assert!(worker.submit(request("r2", "not valid {{{")));

        let response = worker
            .recv_timeout(Duration::from_secs(5))
            .expect("worker response");

        assert_eq!(response.id, "r2");
        match response.payload {
            TransformPayload::Error { error } => assert!(!error.message.is_empty()),
            TransformPayload::Success { .. } => panic!("expected an error payload"),
        }
    }

    #[test]
    fn preserves_request_order_and_ids() {
        let worker = TransformWorker::spawn();
        worker.submit(request("a", "export default 1;"));
        worker.submit(request("b", "export default 2;"));

        let first = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = worker.recv_timeout(Duration::from_secs(5)).unwrap();

        assert_eq!(first.id, "a");
        assert_eq!(second.id, "b");
    }

    #[test]
    fn serializes_wire_shapes() {
        let response = TransformResponse {
            id: "preview-3".to_string(),
            payload: TransformPayload::Success {
                code: "exports.default = 1;".to_string(),
            },
        };
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains(r#""id":"preview-3""#));
        assert!(json.contains(r#""type":"success""#));

        let request = request("preview-3", "export default 1;");
        let json = serde_json::to_string(&request).unwrap();

        assert!(json.contains(r#""transformOptions""#));
    }
}
