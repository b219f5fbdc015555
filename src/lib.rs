//! Routed Transfer
//!
//! Moves money between two bank accounts that are registered on a ledger
//! under routing references (phone numbers). The ledger records each
//! transfer's phase; pluggable bank adapters apply the debit and credit.
//!
//! # Modules
//!
//! - [`ledger`] - Ledger client: phases, JSON-RPC and in-memory backends
//! - [`directory`] - Routing reference → bank account lookup
//! - [`bank`] - Bank adapters and the registry that selects them
//! - [`transfer`] - Transfer saga coordinator and request boundary
//! - [`gateway`] - HTTP gateway (axum) with OpenAPI docs
//! - [`config`] - YAML configuration with environment overrides
//! - [`logging`] - tracing subscriber setup

pub mod bank;
pub mod config;
pub mod directory;
pub mod gateway;
pub mod ledger;
pub mod logging;
pub mod transfer;

// Convenient re-exports at crate root
pub use bank::{AdjustmentResult, BankAdapter, BankRegistry};
pub use config::AppConfig;
pub use directory::{AccountRef, DirectoryLookup, Lookup};
pub use ledger::{LedgerClient, LedgerError, LedgerPhase, MemoryLedger, RpcLedger};
pub use transfer::{TransferCoordinator, TransferError, TransferObject, TransferReply};
