//! Routed Transfer Saga
//!
//! Moves an amount between two accounts registered on the ledger under
//! routing references (phone numbers). The ledger records how far each
//! transfer got; the banks hold the money.
//!
//! # State Machine
//!
//! ```text
//! NONE → STARTED → PENDING → COMPLETED
//!                     ↓
//!                COMPENSATED
//! ```
//!
//! - STARTED is appended before the debit, PENDING only after the debit applied
//! - COMPLETED is appended only after the credit applied
//! - COMPENSATED is appended after a rejected credit was refunded
//!
//! # Safety Invariants
//!
//! 1. **Gating**: every ledger append must succeed before the next leg runs
//! 2. **Explicit Fail Rule**: refund only on an explicit rejection, never on an
//!    unknown outcome
//! 3. **Idempotency**: the transfer id keys the ledger entry; a leg already
//!    passed is never repeated, and a leg with an unknown outcome is not
//!    re-issued unless `replay_unsettled` is set
//! 4. **Serialization**: one execution per transfer id at a time within a process

pub mod api;
pub mod coordinator;
pub mod error;
pub mod types;

pub use api::{TransferReply, handle_request};
pub use coordinator::TransferCoordinator;
pub use error::TransferError;
pub use types::{TransferEnvelope, TransferObject, TransferRequest};
