//! HTTP acknowledgement client.
//!
//! # Invariants
//! - Non-2xx responses are still read; their message is displayable.
//! - Transport failures are reported, never retried.

use super::{parse_response, AckClient, AckError, AckRequest, AckResponse, AckResult};
use std::time::Duration;

/// Sends acknowledgement requests to one endpoint URL.
pub struct HttpAckClient {
    agent: ureq::Agent,
    url: String,
}

impl HttpAckClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            url: url.into(),
        }
    }
}

impl AckClient for HttpAckClient {
    fn acknowledge(&self, request: &AckRequest) -> AckResult<AckResponse> {
        let call = self
            .agent
            .request(request.method.as_str(), &self.url)
            .set("Accept", "application/json");

        let result = match &request.payload {
            Some(payload) => call.send_json(payload),
            None => call.call(),
        };

        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => return Err(AckError::Transport(err.to_string())),
        };

        let status = response.status();
        let body = response
            .into_string()
            .map_err(|err| AckError::Transport(err.to_string()))?;
        parse_response(status, &body)
    }
}
