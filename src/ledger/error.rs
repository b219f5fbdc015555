use thiserror::Error;

use super::phase::LedgerPhase;

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Ledger transport failed: {0}")]
    Transport(String),

    #[error("Ledger RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Malformed ledger response: {0}")]
    Malformed(String),

    #[error("Ledger rejected {phase} transition for {transfer_id}")]
    TransitionRejected {
        transfer_id: String,
        phase: LedgerPhase,
    },
}

impl LedgerError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::Transport(_) => "LEDGER_TRANSPORT",
            LedgerError::Rpc { .. } => "LEDGER_RPC",
            LedgerError::Malformed(_) => "LEDGER_MALFORMED",
            LedgerError::TransitionRejected { .. } => "LEDGER_TRANSITION_REJECTED",
        }
    }
}
