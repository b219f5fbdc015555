//! Ledger Client
//!
//! The ledger is the system of record for transfer progress and for the
//! routing registrations that map a phone number to a bank account. It is
//! consumed as an opaque append-only store:
//!
//! - **Registration log**: queried by routing reference
//! - **Transfer state**: one phase per transfer id, advanced by appends only
//!
//! # Backends
//!
//! - [`RpcLedger`] - JSON-RPC over HTTP to a ledger node
//! - [`MemoryLedger`] - in-process store for local runs and tests

pub mod error;
pub mod memory;
pub mod phase;
pub mod rpc;

pub use error::LedgerError;
pub use memory::MemoryLedger;
pub use phase::LedgerPhase;
pub use rpc::RpcLedger;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::config::{LedgerBackend, LedgerConfig};
use crate::directory::AccountRef;

/// Append-only ledger interface
///
/// Implementations must apply `append_transition` atomically per transfer id
/// and never record a phase twice.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Look up the registration for a routing reference.
    ///
    /// `Ok(None)` means the ledger answered and holds no registration.
    async fn find_registration(&self, routing_ref: &str)
    -> Result<Option<AccountRef>, LedgerError>;

    /// Append a phase transition for a transfer.
    async fn append_transition(
        &self,
        transfer_id: &str,
        phase: LedgerPhase,
    ) -> Result<(), LedgerError>;

    /// Read the current phase of a transfer (`None` if never started)
    async fn read_phase(&self, transfer_id: &str) -> Result<LedgerPhase, LedgerError>;
}

/// Build the configured ledger backend
pub fn connect(config: &LedgerConfig) -> Result<Arc<dyn LedgerClient>, LedgerError> {
    match config.backend {
        LedgerBackend::Rpc => Ok(Arc::new(RpcLedger::new(
            config.rpc_url.clone(),
            Duration::from_millis(config.timeout_ms),
        )?)),
        LedgerBackend::Memory => {
            let ledger = MemoryLedger::new();
            for fixture in &config.registrations {
                ledger.register(
                    fixture.routing_ref.clone(),
                    AccountRef::new(fixture.bank_name.clone(), fixture.account_id.clone()),
                );
            }
            warn!(
                registrations = config.registrations.len(),
                "Using in-memory ledger; transfer state is lost on restart"
            );
            Ok(Arc::new(ledger))
        }
    }
}
