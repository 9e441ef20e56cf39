//! Acknowledgement endpoint contract.
//!
//! One endpoint, dispatched on method only. The request body never affects
//! the response.

use super::{AckMethod, AckResponse};

pub const CREATED_MESSAGE: &str = "todoを作成しました";
pub const UPDATED_MESSAGE: &str = "todoを更新しました";
pub const DELETED_MESSAGE: &str = "todoを削除しました";
pub const UNSUPPORTED_MESSAGE: &str = "エラー";

pub const STATUS_CREATED: u16 = 201;
pub const STATUS_OK: u16 = 200;
pub const STATUS_NO_CONTENT: u16 = 204;
pub const STATUS_METHOD_NOT_ALLOWED: u16 = 405;

/// Builds the endpoint response for `method`.
pub fn respond(method: &AckMethod) -> AckResponse {
    let (status, message) = match method {
        AckMethod::Post => (STATUS_CREATED, CREATED_MESSAGE),
        AckMethod::Put | AckMethod::Patch => (STATUS_OK, UPDATED_MESSAGE),
        AckMethod::Delete => (STATUS_NO_CONTENT, DELETED_MESSAGE),
        AckMethod::Other(_) => (STATUS_METHOD_NOT_ALLOWED, UNSUPPORTED_MESSAGE),
    };
    AckResponse {
        status,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respond_follows_method_table() {
        let cases = [
            (AckMethod::Post, 201, CREATED_MESSAGE),
            (AckMethod::Put, 200, UPDATED_MESSAGE),
            (AckMethod::Patch, 200, UPDATED_MESSAGE),
            (AckMethod::Delete, 204, DELETED_MESSAGE),
            (AckMethod::parse("GET"), 405, UNSUPPORTED_MESSAGE),
        ];
        for (method, status, message) in cases {
            let response = respond(&method);
            assert_eq!(response.status, status, "status for {method}");
            assert_eq!(response.message, message, "message for {method}");
        }
    }
}
