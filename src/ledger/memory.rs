//! In-Memory Ledger Backend
//!
//! Keeps registrations and per-transfer phase history in process. Used by the
//! `memory` backend mode for local runs and by the coordinator tests. Appends
//! enforce the same forward-only walk a ledger contract would.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};
use tracing::debug;

use super::error::LedgerError;
use super::phase::LedgerPhase;
use super::LedgerClient;
use crate::directory::AccountRef;

#[derive(Default)]
pub struct MemoryLedger {
    registrations: DashMap<String, AccountRef>,
    transfers: DashMap<String, Vec<LedgerPhase>>,
    /// Fault injection: appends of these phases fail with a transport error
    rejected_phases: DashSet<LedgerPhase>,
    unreachable: AtomicBool,
    /// Fault injection: the next N appends fail before touching state
    fail_next: AtomicUsize,
    /// Fault injection: the next N appends land but report a transport error
    lost_acks: AtomicUsize,
    append_calls: AtomicUsize,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a routing registration
    pub fn register(&self, routing_ref: impl Into<String>, account: AccountRef) {
        self.registrations.insert(routing_ref.into(), account);
    }

    /// Phase history for a transfer, oldest first
    pub fn history(&self, transfer_id: &str) -> Vec<LedgerPhase> {
        self.transfers
            .get(transfer_id)
            .map(|phases| phases.clone())
            .unwrap_or_default()
    }

    /// Make every append of `phase` fail until cleared
    pub fn reject_transitions_to(&self, phase: LedgerPhase) {
        self.rejected_phases.insert(phase);
    }

    pub fn clear_rejections(&self) {
        self.rejected_phases.clear();
    }

    /// Fail the next `n` appends with a transport error
    pub fn fail_next_appends(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    /// Record the next `n` appends but answer each with a transport error
    pub fn lose_next_acks(&self, n: usize) {
        self.lost_acks.store(n, Ordering::SeqCst);
    }

    /// Make every call fail as if the node were down
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of append attempts seen (including rejected ones)
    pub fn append_calls(&self) -> usize {
        self.append_calls.load(Ordering::SeqCst)
    }

    fn take_one(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn check_reachable(&self) -> Result<(), LedgerError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("ledger unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerClient for MemoryLedger {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn find_registration(
        &self,
        routing_ref: &str,
    ) -> Result<Option<AccountRef>, LedgerError> {
        self.check_reachable()?;
        Ok(self.registrations.get(routing_ref).map(|r| r.clone()))
    }

    async fn append_transition(
        &self,
        transfer_id: &str,
        phase: LedgerPhase,
    ) -> Result<(), LedgerError> {
        self.append_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;

        if self.rejected_phases.contains(&phase) {
            return Err(LedgerError::Transport(format!(
                "injected failure appending {}",
                phase
            )));
        }
        if Self::take_one(&self.fail_next) {
            return Err(LedgerError::Transport("injected transient failure".to_string()));
        }

        // The entry guard holds the shard lock, so check-and-push is atomic
        let mut phases = self.transfers.entry(transfer_id.to_string()).or_default();
        let current = phases.last().copied().unwrap_or_default();
        if !current.can_advance_to(phase) {
            return Err(LedgerError::TransitionRejected {
                transfer_id: transfer_id.to_string(),
                phase,
            });
        }

        phases.push(phase);
        debug!(transfer_id = %transfer_id, from = %current, to = %phase, "Memory ledger transition");
        drop(phases);

        if Self::take_one(&self.lost_acks) {
            return Err(LedgerError::Transport("injected lost acknowledgement".to_string()));
        }
        Ok(())
    }

    async fn read_phase(&self, transfer_id: &str) -> Result<LedgerPhase, LedgerError> {
        self.check_reachable()?;
        Ok(self
            .transfers
            .get(transfer_id)
            .and_then(|phases| phases.last().copied())
            .unwrap_or_default())
    }
}
