//! API Response types

use serde::Serialize;
use utoipa::ToSchema;

use crate::ledger::LedgerPhase;

/// Unified API response wrapper
///
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or absent (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, HTTP status for errors
    #[schema(example = 0)]
    pub code: i32,
    #[schema(example = "ok")]
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Ledger view of one transfer
#[derive(Debug, Serialize, ToSchema)]
pub struct TransferStatusData {
    #[schema(example = "tx1")]
    pub transfer_id: String,
    /// NONE, STARTED, PENDING, COMPLETED or COMPENSATED
    #[schema(example = "COMPLETED")]
    pub phase: String,
    pub terminal: bool,
    /// Sender debited, receiver not yet credited
    pub in_flight: bool,
    /// Phase whose bank leg has an unknown outcome in this process
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "PENDING")]
    pub unsettled: Option<String>,
}

impl TransferStatusData {
    pub fn new(transfer_id: impl Into<String>, phase: LedgerPhase) -> Self {
        Self {
            transfer_id: transfer_id.into(),
            phase: phase.as_str().to_string(),
            terminal: phase.is_terminal(),
            in_flight: phase.is_in_flight(),
            unsettled: None,
        }
    }

    pub fn with_unsettled(mut self, leg: Option<LedgerPhase>) -> Self {
        self.unsettled = leg.map(|phase| phase.as_str().to_string());
        self
    }
}
