//! Transfer Error Types
//!
//! Every failure carries enough context for an operator to reconcile a
//! halted transfer: the transfer id and the last phase durably recorded.

use thiserror::Error;

use crate::ledger::{LedgerError, LedgerPhase};

/// Transfer error types
#[derive(Error, Debug, Clone)]
pub enum TransferError {
    // === Validation Errors ===
    #[error("{0}")]
    Validation(String),

    #[error("Amount must be greater than zero")]
    InvalidAmount,

    // === Routing Errors ===
    #[error("Could not lookup number: {0}")]
    RoutingNotFound(String),

    #[error("Unsupported bank: {0}")]
    UnsupportedBank(String),

    #[error("Directory lookup failed for {routing_ref}: {source}")]
    Lookup {
        routing_ref: String,
        #[source]
        source: LedgerError,
    },

    // === Ledger Errors ===
    #[error("Ledger unavailable: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Transfer {transfer_id}: illegal transition {from} -> {to}")]
    InvalidTransition {
        transfer_id: String,
        from: LedgerPhase,
        to: LedgerPhase,
    },

    // === Saga Errors ===
    #[error("Transfer {transfer_id}: bank {bank} rejected adjustment at {reached}: {detail}")]
    AdapterRejected {
        transfer_id: String,
        bank: String,
        reached: LedgerPhase,
        detail: String,
    },

    #[error("Transfer {transfer_id} halted at {reached}: {reason}")]
    PartialTransfer {
        transfer_id: String,
        reached: LedgerPhase,
        reason: String,
    },

    #[error("Transfer {transfer_id} compensated: {detail}")]
    Compensated { transfer_id: String, detail: String },

    #[error("Transfer {0} was already compensated")]
    AlreadyCompensated(String),

    #[error("Transfer {transfer_id} exceeded its deadline at {reached}")]
    DeadlineExceeded {
        transfer_id: String,
        reached: LedgerPhase,
    },
}

impl TransferError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TransferError::Validation(_) => "VALIDATION_ERROR",
            TransferError::InvalidAmount => "INVALID_AMOUNT",
            TransferError::RoutingNotFound(_) => "ROUTING_NOT_FOUND",
            TransferError::UnsupportedBank(_) => "UNSUPPORTED_BANK",
            TransferError::Lookup { .. } => "LOOKUP_FAILED",
            TransferError::Ledger(_) => "LEDGER_UNAVAILABLE",
            TransferError::InvalidTransition { .. } => "INVALID_STATE_TRANSITION",
            TransferError::AdapterRejected { .. } => "ADAPTER_REJECTED",
            TransferError::PartialTransfer { .. } => "PARTIAL_TRANSFER",
            TransferError::Compensated { .. } => "COMPENSATED",
            TransferError::AlreadyCompensated(_) => "ALREADY_COMPENSATED",
            TransferError::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            TransferError::Validation(_) | TransferError::InvalidAmount => 400,
            TransferError::RoutingNotFound(_) => 404,
            TransferError::Compensated { .. } | TransferError::AlreadyCompensated(_) => 409,
            TransferError::UnsupportedBank(_) => 422,
            TransferError::InvalidTransition { .. } => 500,
            TransferError::Lookup { .. }
            | TransferError::AdapterRejected { .. }
            | TransferError::PartialTransfer { .. } => 502,
            TransferError::Ledger(_) => 503,
            TransferError::DeadlineExceeded { .. } => 504,
        }
    }

    /// Last phase durably recorded before the failure, when one is known.
    /// `None` for failures raised before the ledger phase was read.
    pub fn reached_phase(&self) -> Option<LedgerPhase> {
        match self {
            TransferError::AdapterRejected { reached, .. }
            | TransferError::PartialTransfer { reached, .. }
            | TransferError::DeadlineExceeded { reached, .. } => Some(*reached),
            TransferError::InvalidTransition { from, .. } => Some(*from),
            TransferError::Compensated { .. } | TransferError::AlreadyCompensated(_) => {
                Some(LedgerPhase::Compensated)
            }
            TransferError::RoutingNotFound(_)
            | TransferError::UnsupportedBank(_)
            | TransferError::Validation(_)
            | TransferError::InvalidAmount
            | TransferError::Lookup { .. }
            | TransferError::Ledger(_) => None,
        }
    }
}
