//! In-process acknowledgement client.

use super::endpoint::respond;
use super::{AckClient, AckRequest, AckResponse, AckResult};

/// Answers requests with the endpoint contract directly, without network.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAckClient;

impl AckClient for LocalAckClient {
    fn acknowledge(&self, request: &AckRequest) -> AckResult<AckResponse> {
        Ok(respond(&request.method))
    }
}
