//! The clinic API's JSON response envelope.
//!
//! Every endpoint answers `{ success, data, message }`. Unknown extra keys
//! are tolerated — the server adds fields ahead of deployed clients — but a
//! success without its payload is a protocol error, not a silent `None`.

use serde::Deserialize;

use chairside_core::{BackendError, BackendResult};

/// Wire shape of every clinic API response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Unwraps the payload of a successful envelope.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Rejected`] with the server's message (or a
    /// generic fallback) when `success` is false, and
    /// [`BackendError::MissingData`] when a success carries no payload.
    pub fn into_data(self) -> BackendResult<T> {
        if !self.success {
            return Err(BackendError::Rejected(self.message.unwrap_or_else(|| {
                "the server rejected the request".to_owned()
            })));
        }
        self.data.ok_or(BackendError::MissingData)
    }

    /// Checks a successful envelope whose payload does not matter.
    pub fn into_unit(self) -> BackendResult<()> {
        if !self.success {
            return Err(BackendError::Rejected(self.message.unwrap_or_else(|| {
                "the server rejected the request".to_owned()
            })));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_a_successful_payload() {
        let envelope: Envelope<u32> =
            serde_json::from_str(r#"{"success": true, "data": 7}"#).expect("parse");
        assert_eq!(envelope.into_data().expect("payload"), 7);
    }

    #[test]
    fn failure_surfaces_the_server_message() {
        let envelope: Envelope<u32> =
            serde_json::from_str(r#"{"success": false, "message": "Mã giảm giá đã hết hạn"}"#)
                .expect("parse");
        let err = envelope.into_data().expect_err("failure envelope");
        assert!(
            matches!(err, BackendError::Rejected(ref reason) if reason == "Mã giảm giá đã hết hạn")
        );
    }

    #[test]
    fn failure_without_a_message_gets_a_generic_one() {
        let envelope: Envelope<u32> =
            serde_json::from_str(r#"{"success": false}"#).expect("parse");
        let err = envelope.into_data().expect_err("failure envelope");
        assert!(matches!(err, BackendError::Rejected(_)));
    }

    #[test]
    fn success_without_data_is_a_protocol_error() {
        let envelope: Envelope<u32> = serde_json::from_str(r#"{"success": true}"#).expect("parse");
        let err = envelope.into_data().expect_err("missing payload");
        assert!(matches!(err, BackendError::MissingData));
    }

    #[test]
    fn unit_responses_only_require_success() {
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"success": true}"#).expect("parse");
        envelope.into_unit().expect("unit success");
    }

    #[test]
    fn extra_keys_are_tolerated() {
        let envelope: Envelope<u32> =
            serde_json::from_str(r#"{"success": true, "data": 1, "requestId": "abc"}"#)
                .expect("unknown keys must not fail parsing");
        assert_eq!(envelope.into_data().expect("payload"), 1);
    }
}
