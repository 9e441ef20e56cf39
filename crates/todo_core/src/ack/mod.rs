//! Remote acknowledgement of collection mutations.
//!
//! # Responsibility
//! - Describe acknowledgement requests (method + intent payload).
//! - Run each acknowledgement off the caller's thread and hand back a
//!   `PendingAck` handle carrying the eventual display message.
//!
//! # Invariants
//! - Acknowledgements never gate or roll back local mutations.
//! - Dispatched requests are never cancelled or retried.
//! - Response messages are surfaced verbatim, whatever the status.

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

pub mod endpoint;
mod http_client;
mod local_client;

pub use http_client::HttpAckClient;
pub use local_client::LocalAckClient;

pub type AckResult<T> = Result<T, AckError>;

/// HTTP method of an acknowledgement request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AckMethod {
    Post,
    Put,
    Patch,
    Delete,
    /// Any method the endpoint does not support.
    Other(String),
}

impl AckMethod {
    /// Parses a method name case-insensitively.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Other(value) => value.as_str(),
        }
    }
}

impl Display for AckMethod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intent payload sent with an acknowledgement request.
///
/// The endpoint ignores it when building its response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AckPayload {
    Create { title: String, content: String },
    Toggle { completed: bool },
    Update { title: String, content: String },
}

/// One acknowledgement request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckRequest {
    pub method: AckMethod,
    pub payload: Option<AckPayload>,
}

impl AckRequest {
    pub fn created(title: &str, content: &str) -> Self {
        Self {
            method: AckMethod::Post,
            payload: Some(AckPayload::Create {
                title: title.to_string(),
                content: content.to_string(),
            }),
        }
    }

    /// `completed` is the state being requested, i.e. after the flip.
    pub fn toggled(completed: bool) -> Self {
        Self {
            method: AckMethod::Put,
            payload: Some(AckPayload::Toggle { completed }),
        }
    }

    pub fn updated(title: &str, content: &str) -> Self {
        Self {
            method: AckMethod::Put,
            payload: Some(AckPayload::Update {
                title: title.to_string(),
                content: content.to_string(),
            }),
        }
    }

    pub fn deleted() -> Self {
        Self {
            method: AckMethod::Delete,
            payload: None,
        }
    }
}

/// Status and display message returned by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckResponse {
    pub status: u16,
    pub message: String,
}

impl AckResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Wire body of an endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckBody {
    pub message: String,
}

/// Why an acknowledgement produced no message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckError {
    /// Network-level failure or unreadable response stream.
    Transport(String),
    /// Body was present but not `{message: string}`.
    Decode { status: u16, error: String },
    /// Response carried no body at all.
    MissingMessage { status: u16 },
    /// Worker ended without reporting an outcome.
    WorkerLost,
}

impl Display for AckError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "acknowledgement request failed: {err}"),
            Self::Decode { status, error } => {
                write!(f, "acknowledgement body (status {status}) is invalid: {error}")
            }
            Self::MissingMessage { status } => {
                write!(f, "acknowledgement (status {status}) carried no message")
            }
            Self::WorkerLost => write!(f, "acknowledgement worker exited without a result"),
        }
    }
}

impl Error for AckError {}

/// Decodes a response body into an `AckResponse`.
pub fn parse_response(status: u16, body: &str) -> AckResult<AckResponse> {
    if body.trim().is_empty() {
        return Err(AckError::MissingMessage { status });
    }
    let decoded: AckBody = serde_json::from_str(body).map_err(|err| AckError::Decode {
        status,
        error: err.to_string(),
    })?;
    Ok(AckResponse {
        status,
        message: decoded.message,
    })
}

/// Transport to the acknowledgement endpoint.
///
/// Implementations block; `dispatch` moves them off the caller's thread.
pub trait AckClient: Send + Sync {
    fn acknowledge(&self, request: &AckRequest) -> AckResult<AckResponse>;
}

/// Handle to one in-flight acknowledgement.
#[derive(Debug)]
pub struct PendingAck {
    method: AckMethod,
    receiver: Receiver<AckResult<AckResponse>>,
    outcome: Option<AckResult<AckResponse>>,
}

impl PendingAck {
    /// Wraps an outcome that is already known.
    pub fn ready(method: AckMethod, outcome: AckResult<AckResponse>) -> Self {
        let (_sender, receiver) = mpsc::channel();
        Self {
            method,
            receiver,
            outcome: Some(outcome),
        }
    }

    pub fn method(&self) -> &AckMethod {
        &self.method
    }

    /// Blocks until the outcome is known.
    pub fn wait(mut self) -> AckResult<AckResponse> {
        if let Some(outcome) = self.outcome.take() {
            return outcome;
        }
        self.receiver.recv().unwrap_or(Err(AckError::WorkerLost))
    }

    /// Returns the outcome if it has arrived, without blocking.
    pub fn try_outcome(&mut self) -> Option<&AckResult<AckResponse>> {
        if self.outcome.is_none() {
            match self.receiver.try_recv() {
                Ok(outcome) => self.outcome = Some(outcome),
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => self.outcome = Some(Err(AckError::WorkerLost)),
            }
        }
        self.outcome.as_ref()
    }

    pub fn is_done(&mut self) -> bool {
        self.try_outcome().is_some()
    }
}

/// Runs `request` on a worker thread and returns its handle immediately.
pub fn dispatch(client: Arc<dyn AckClient>, request: AckRequest) -> PendingAck {
    let (sender, receiver) = mpsc::channel();
    let method = request.method.clone();

    let spawned = thread::Builder::new()
        .name("todo-ack".to_string())
        .spawn(move || {
            let outcome = client.acknowledge(&request);
            log_outcome(&request.method, &outcome);
            // Receiver may be gone; the outcome is simply dropped then.
            let _ = sender.send(outcome);
        });

    match spawned {
        Ok(_) => PendingAck {
            method,
            receiver,
            outcome: None,
        },
        Err(err) => {
            let outcome = Err(AckError::Transport(format!("failed to spawn worker: {err}")));
            log_outcome(&method, &outcome);
            PendingAck::ready(method, outcome)
        }
    }
}

fn log_outcome(method: &AckMethod, outcome: &AckResult<AckResponse>) {
    match outcome {
        Ok(response) if response.is_success() => info!(
            "event=ack_done module=ack status=ok method={} http_status={}",
            method, response.status
        ),
        Ok(response) => warn!(
            "event=ack_done module=ack status=rejected method={} http_status={}",
            method, response.status
        ),
        Err(err) => warn!(
            "event=ack_done module=ack status=error method={} error={}",
            method, err
        ),
    }
}
