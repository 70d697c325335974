//! Origin probe wire format.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Body an advanced-mode origin returns on every request.
///
/// `token` is unique per response; seeing the same token twice in a row
/// means something between the leaf and the origin served a cached copy.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct OriginResponse {
    #[serde(default)]
    pub identifier: String,
    pub server_time: String,
    pub token: String,
}

impl OriginResponse {
    /// A new response stamped with the current time and a fresh token.
    pub fn fresh(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            server_time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            token: fresh_token(),
        }
    }
}

/// 256 random bits, hex encoded.
pub fn fresh_token() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_tokens_differ() {
        let a = fresh_token();
        let b = fresh_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_token_decodes_to_32_bytes() {
        let token = fresh_token();
        assert_eq!(hex::decode(&token).unwrap().len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_fresh_response_is_rfc3339() {
        let rsp = OriginResponse::fresh("origin-1");
        assert_eq!(rsp.identifier, "origin-1");
        assert!(DateTime::parse_from_rfc3339(&rsp.server_time).is_ok());
    }

    #[test]
    fn test_identifier_optional_on_the_wire() {
        let rsp: OriginResponse =
            serde_json::from_str(r#"{"server_time": "2024-01-01T00:00:00Z", "token": "t"}"#).unwrap();
        assert!(rsp.identifier.is_empty());
    }
}
