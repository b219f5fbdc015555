//! Transfer Request Boundary
//!
//! Turns a raw request body into a coordinator call and the coordinator's
//! answer into `{"success": {...}}` or `{"error": "..."}`. Nothing escapes
//! this layer as a panic or an unstructured failure.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use super::coordinator::TransferCoordinator;
use super::error::TransferError;
use super::types::{TransferEnvelope, TransferObject};

/// Reply envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub enum TransferReply {
    #[serde(rename = "success")]
    Success(TransferObject),
    #[serde(rename = "error")]
    Error(String),
}

impl TransferReply {
    pub fn is_success(&self) -> bool {
        matches!(self, TransferReply::Success(_))
    }
}

impl From<&TransferError> for TransferReply {
    fn from(err: &TransferError) -> Self {
        TransferReply::Error(err.to_string())
    }
}

/// Parse the body leniently: empty or malformed input becomes `{}`
pub fn parse_envelope(body: &str) -> TransferEnvelope {
    if body.trim().is_empty() {
        return TransferEnvelope::default();
    }
    match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, "Malformed transfer body, treating as empty");
            TransferEnvelope::default()
        }
    }
}

fn status_of(err: &TransferError) -> StatusCode {
    StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Handle one transfer request body
pub async fn handle_request(
    coordinator: &TransferCoordinator,
    body: &str,
) -> (StatusCode, TransferReply) {
    let Some(object) = parse_envelope(body).object else {
        let err = TransferError::Validation("input object is null".to_string());
        return (status_of(&err), TransferReply::from(&err));
    };

    match coordinator.execute(object).await {
        Ok(object) => {
            debug!(object_id = ?object.object_id, processed = ?object.processed, "Transfer request handled");
            (StatusCode::OK, TransferReply::Success(object))
        }
        Err(err) => {
            warn!(code = err.code(), error = %err, "Transfer request failed");
            (status_of(&err), TransferReply::from(&err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::BankRegistry;
    use crate::config::CoordinatorConfig;
    use crate::ledger::MemoryLedger;
    use std::sync::Arc;

    fn coordinator() -> TransferCoordinator {
        TransferCoordinator::new(
            Arc::new(MemoryLedger::new()),
            BankRegistry::new(),
            CoordinatorConfig::default(),
        )
    }

    #[test]
    fn test_reply_shape() {
        let reply = TransferReply::Error("input object is null".into());
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"error":"input object is null"}"#
        );

        let reply = TransferReply::Success(TransferObject {
            object_id: Some("tx1".into()),
            processed: Some(true),
            ..Default::default()
        });
        assert_eq!(
            serde_json::to_string(&reply).unwrap(),
            r#"{"success":{"objectId":"tx1","processed":true}}"#
        );
    }

    #[test]
    fn test_parse_envelope_is_lenient() {
        assert!(parse_envelope("").object.is_none());
        assert!(parse_envelope("{not json").object.is_none());
        assert!(parse_envelope(r#"{"object":{"objectId":"a"}}"#).object.is_some());
    }

    #[tokio::test]
    async fn test_null_object() {
        let coordinator = coordinator();
        for body in ["", "{}", r#"{"object":null}"#, "garbage"] {
            let (status, reply) = handle_request(&coordinator, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(reply, TransferReply::Error("input object is null".into()));
        }
    }

    #[tokio::test]
    async fn test_unsent_object_is_acknowledged() {
        let coordinator = coordinator();
        let body = r#"{"object":{"objectId":"tx1","from":"+1","to":"+2","amount":5,"sent":false,"processed":true}}"#;
        let (status, reply) = handle_request(&coordinator, body).await;
        assert_eq!(status, StatusCode::OK);
        let TransferReply::Success(object) = reply else {
            panic!("expected success");
        };
        assert_eq!(object.sent, None);
        assert_eq!(object.processed, None);
        assert_eq!(object.object_id.as_deref(), Some("tx1"));
    }

    #[tokio::test]
    async fn test_unregistered_number() {
        let coordinator = coordinator();
        let body = r#"{"object":{"objectId":"tx1","from":"+1111","to":"+9999","amount":50.0,"sent":true}}"#;
        let (status, reply) = handle_request(&coordinator, body).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            reply,
            TransferReply::Error("Could not lookup number: +1111".into())
        );
    }
}
