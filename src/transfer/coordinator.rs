//! Transfer Coordinator
//!
//! Drives one transfer through its ledger phases, calling the sender's bank
//! for the debit leg and the receiver's bank for the credit leg. Each step
//! starts from the phase the ledger reports, so re-running a transfer never
//! repeats a leg the ledger has already moved past.
//!
//! A leg whose outcome is unknown (bank unreachable, deadline hit, execution
//! dropped, or applied but not yet recorded) stays marked as unsettled until
//! the ledger moves past its phase. Replays refuse to re-issue an unsettled
//! leg unless `replay_unsettled` is configured.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::error::TransferError;
use super::types::{TransferObject, TransferRequest};
use crate::bank::{AdjustmentResult, BankAdapter, BankRegistry};
use crate::config::CoordinatorConfig;
use crate::directory::{AccountRef, DirectoryLookup, Lookup};
use crate::ledger::{LedgerClient, LedgerError, LedgerPhase};

/// Both parties of a transfer with their adapters, resolved before any side effect
struct Route {
    from: AccountRef,
    to: AccountRef,
    debit: Arc<dyn BankAdapter>,
    credit: Arc<dyn BankAdapter>,
}

/// Run `fut` unless the deadline passes first
async fn bounded<F: Future>(
    transfer_id: &str,
    reached: LedgerPhase,
    deadline: Instant,
    fut: F,
) -> Result<F::Output, TransferError> {
    tokio::time::timeout_at(deadline, fut).await.map_err(|_| {
        error!(transfer_id = %transfer_id, reached = %reached, "Transfer deadline exceeded");
        TransferError::DeadlineExceeded {
            transfer_id: transfer_id.to_string(),
            reached,
        }
    })
}

fn expect_account(
    routing_ref: &str,
    lookup: Result<Lookup, LedgerError>,
) -> Result<AccountRef, TransferError> {
    match lookup {
        Ok(Lookup::Found(account)) => Ok(account),
        Ok(Lookup::NotFound) => Err(TransferError::RoutingNotFound(routing_ref.to_string())),
        Err(source) => Err(TransferError::Lookup {
            routing_ref: routing_ref.to_string(),
            source,
        }),
    }
}

type Gates = DashMap<String, Arc<Mutex<()>>>;

/// One caller's claim on a transfer id's gate. Dropping it releases the map
/// entry once no other caller holds the same gate, even when the execution
/// is cancelled mid-flight.
struct GateClaim<'a> {
    gates: &'a Gates,
    transfer_id: &'a str,
    gate: Option<Arc<Mutex<()>>>,
}

impl<'a> GateClaim<'a> {
    fn enter(gates: &'a Gates, transfer_id: &'a str) -> Self {
        let gate = gates.entry(transfer_id.to_string()).or_default().clone();
        Self {
            gates,
            transfer_id,
            gate: Some(gate),
        }
    }

    async fn lock(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        }
    }
}

impl Drop for GateClaim<'_> {
    fn drop(&mut self) {
        drop(self.gate.take());
        self.gates
            .remove_if(self.transfer_id, |_, gate| Arc::strong_count(gate) == 1);
    }
}

pub struct TransferCoordinator {
    ledger: Arc<dyn LedgerClient>,
    directory: DirectoryLookup,
    registry: BankRegistry,
    config: CoordinatorConfig,
    /// Per transfer id gate; an entry lives only while someone holds it
    in_flight: Gates,
    /// Transfer id → phase whose bank leg was issued with no known outcome
    unsettled: DashMap<String, LedgerPhase>,
}

impl TransferCoordinator {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        registry: BankRegistry,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            directory: DirectoryLookup::new(ledger.clone()),
            ledger,
            registry,
            config,
            in_flight: DashMap::new(),
            unsettled: DashMap::new(),
        }
    }

    /// Execute with the configured deadline
    pub async fn execute(&self, object: TransferObject) -> Result<TransferObject, TransferError> {
        let deadline = Instant::now() + Duration::from_millis(self.config.deadline_ms);
        self.execute_until(object, deadline).await
    }

    /// Execute a transfer object, abandoning it once `deadline` passes.
    ///
    /// Unsent objects are acknowledged without touching the ledger or any
    /// bank. Sent objects are validated, serialized per transfer id and run
    /// to a terminal phase. On success the object comes back with
    /// `processed = true`.
    pub async fn execute_until(
        &self,
        mut object: TransferObject,
        deadline: Instant,
    ) -> Result<TransferObject, TransferError> {
        if !object.is_sent() {
            debug!(object_id = ?object.object_id, "Transfer staged, not sent");
            object.sent = None;
            object.processed = None;
            return Ok(object);
        }

        let req = TransferRequest::from_object(&object)?;

        let claim = GateClaim::enter(&self.in_flight, &req.transfer_id);
        let result = {
            let _held = claim.lock().await;
            self.run(&req, deadline).await
        };
        drop(claim);

        result?;
        object.processed = Some(true);
        Ok(object)
    }

    /// Current ledger phase of a transfer
    pub async fn phase_of(&self, transfer_id: &str) -> Result<LedgerPhase, LedgerError> {
        self.ledger.read_phase(transfer_id).await
    }

    pub fn ledger(&self) -> &Arc<dyn LedgerClient> {
        &self.ledger
    }

    /// Number of transfer ids currently gated
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Phase whose bank leg was issued without a known outcome, if any
    pub fn unsettled_leg(&self, transfer_id: &str) -> Option<LedgerPhase> {
        self.unsettled.get(transfer_id).map(|phase| *phase)
    }

    /// Mark the leg at `phase` as issued.
    ///
    /// Refuses when an earlier attempt at the same phase left the outcome
    /// unknown, unless `replay_unsettled` is set.
    fn claim_leg(
        &self,
        transfer_id: &str,
        phase: LedgerPhase,
        leg: &str,
    ) -> Result<(), TransferError> {
        if self.unsettled_leg(transfer_id) == Some(phase) {
            if !self.config.replay_unsettled {
                error!(
                    transfer_id = %transfer_id,
                    leg,
                    "Earlier outcome unknown, refusing to re-issue"
                );
                return Err(TransferError::PartialTransfer {
                    transfer_id: transfer_id.to_string(),
                    reached: phase,
                    reason: format!(
                        "{} outcome unknown from an earlier attempt, reconcile first",
                        leg
                    ),
                });
            }
            warn!(transfer_id = %transfer_id, leg, "Re-issuing leg with unknown earlier outcome");
        }
        self.unsettled.insert(transfer_id.to_string(), phase);
        Ok(())
    }

    fn settle(&self, transfer_id: &str) {
        self.unsettled.remove(transfer_id);
    }

    async fn run(&self, req: &TransferRequest, deadline: Instant) -> Result<(), TransferError> {
        let id = req.transfer_id.as_str();
        let route = self.resolve(req, deadline).await?;

        let initial = bounded(id, LedgerPhase::None, deadline, self.ledger.read_phase(id)).await??;
        debug!(transfer_id = %id, phase = %initial, "Ledger phase read");

        let mut phase = initial;
        loop {
            phase = match phase {
                LedgerPhase::None => {
                    self.advance(id, LedgerPhase::None, LedgerPhase::Started, deadline)
                        .await?
                }
                LedgerPhase::Started => self.step_started(req, &route, deadline).await?,
                LedgerPhase::Pending => self.step_pending(req, &route, deadline).await?,
                LedgerPhase::Completed => {
                    self.settle(id);
                    if initial == LedgerPhase::Completed {
                        info!(transfer_id = %id, "Transfer already completed, nothing to do");
                    } else {
                        info!(
                            transfer_id = %id,
                            from = %route.from,
                            to = %route.to,
                            amount = %req.amount,
                            "Transfer completed"
                        );
                    }
                    return Ok(());
                }
                LedgerPhase::Compensated => {
                    self.settle(id);
                    return Err(TransferError::AlreadyCompensated(id.to_string()));
                }
            };
        }
    }

    /// Resolve both parties and their adapters. No side effects.
    async fn resolve(
        &self,
        req: &TransferRequest,
        deadline: Instant,
    ) -> Result<Route, TransferError> {
        let (from, to) = bounded(&req.transfer_id, LedgerPhase::None, deadline, async {
            tokio::join!(
                self.directory.resolve(&req.from_ref),
                self.directory.resolve(&req.to_ref)
            )
        })
        .await?;

        let from = expect_account(&req.from_ref, from)?;
        let to = expect_account(&req.to_ref, to)?;

        Ok(Route {
            debit: self.registry.get(&from.bank_name)?,
            credit: self.registry.get(&to.bank_name)?,
            from,
            to,
        })
    }

    /// STARTED: debit the sender
    async fn step_started(
        &self,
        req: &TransferRequest,
        route: &Route,
        deadline: Instant,
    ) -> Result<LedgerPhase, TransferError> {
        let id = req.transfer_id.as_str();
        self.claim_leg(id, LedgerPhase::Started, "debit")?;
        let result = bounded(
            id,
            LedgerPhase::Started,
            deadline,
            route.debit.adjust(&route.from.account_id, -req.amount),
        )
        .await?;

        match result {
            AdjustmentResult::Applied(_) => {
                debug!(transfer_id = %id, account = %route.from, "Debit applied");
                let next = self
                    .advance(id, LedgerPhase::Started, LedgerPhase::Pending, deadline)
                    .await?;
                self.settle(id);
                Ok(next)
            }
            AdjustmentResult::Rejected(detail) => {
                self.settle(id);
                error!(
                    transfer_id = %id,
                    account = %route.from,
                    detail = %detail,
                    "Debit rejected"
                );
                Err(TransferError::AdapterRejected {
                    transfer_id: id.to_string(),
                    bank: route.from.bank_name.clone(),
                    reached: LedgerPhase::Started,
                    detail,
                })
            }
            AdjustmentResult::Unreachable(detail) => {
                error!(
                    transfer_id = %id,
                    account = %route.from,
                    detail = %detail,
                    "Debit outcome unknown"
                );
                Err(TransferError::PartialTransfer {
                    transfer_id: id.to_string(),
                    reached: LedgerPhase::Started,
                    reason: format!("debit outcome unknown: {}", detail),
                })
            }
        }
    }

    /// PENDING: credit the receiver, refund the sender if the credit is refused
    async fn step_pending(
        &self,
        req: &TransferRequest,
        route: &Route,
        deadline: Instant,
    ) -> Result<LedgerPhase, TransferError> {
        let id = req.transfer_id.as_str();
        self.claim_leg(id, LedgerPhase::Pending, "credit")?;
        let result = bounded(
            id,
            LedgerPhase::Pending,
            deadline,
            route.credit.adjust(&route.to.account_id, req.amount),
        )
        .await?;

        match result {
            AdjustmentResult::Applied(_) => {
                debug!(transfer_id = %id, account = %route.to, "Credit applied");
                let next = self
                    .advance(id, LedgerPhase::Pending, LedgerPhase::Completed, deadline)
                    .await?;
                self.settle(id);
                Ok(next)
            }
            AdjustmentResult::Rejected(detail) => {
                self.compensate(req, route, detail, deadline).await
            }
            AdjustmentResult::Unreachable(detail) => {
                // The credit may have landed, so refunding could pay twice
                error!(
                    transfer_id = %id,
                    account = %route.to,
                    detail = %detail,
                    "Credit outcome unknown"
                );
                Err(TransferError::PartialTransfer {
                    transfer_id: id.to_string(),
                    reached: LedgerPhase::Pending,
                    reason: format!("credit outcome unknown: {}", detail),
                })
            }
        }
    }

    async fn compensate(
        &self,
        req: &TransferRequest,
        route: &Route,
        credit_detail: String,
        deadline: Instant,
    ) -> Result<LedgerPhase, TransferError> {
        let id = req.transfer_id.as_str();
        warn!(
            transfer_id = %id,
            account = %route.to,
            detail = %credit_detail,
            "Credit rejected, refunding sender"
        );

        let refund = bounded(
            id,
            LedgerPhase::Pending,
            deadline,
            route.debit.adjust(&route.from.account_id, req.amount),
        )
        .await?;

        match refund {
            AdjustmentResult::Applied(_) => {
                self.advance(id, LedgerPhase::Pending, LedgerPhase::Compensated, deadline)
                    .await?;
                self.settle(id);
                warn!(transfer_id = %id, account = %route.from, "Transfer compensated");
                Err(TransferError::Compensated {
                    transfer_id: id.to_string(),
                    detail: format!("credit rejected by {}: {}", route.to.bank_name, credit_detail),
                })
            }
            AdjustmentResult::Rejected(detail) | AdjustmentResult::Unreachable(detail) => {
                error!(
                    transfer_id = %id,
                    account = %route.from,
                    detail = %detail,
                    "Compensation failed, sender debited without credit"
                );
                Err(TransferError::PartialTransfer {
                    transfer_id: id.to_string(),
                    reached: LedgerPhase::Pending,
                    reason: format!("compensation failed: {}", detail),
                })
            }
        }
    }

    /// Append `to`, retrying per policy.
    ///
    /// Before each retry the phase is re-read: an append that landed despite
    /// an error counts as done.
    async fn advance(
        &self,
        transfer_id: &str,
        from: LedgerPhase,
        to: LedgerPhase,
        deadline: Instant,
    ) -> Result<LedgerPhase, TransferError> {
        if !from.can_advance_to(to) {
            return Err(TransferError::InvalidTransition {
                transfer_id: transfer_id.to_string(),
                from,
                to,
            });
        }

        let policy = self.config.ledger_retry;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let err = match bounded(
                transfer_id,
                from,
                deadline,
                self.ledger.append_transition(transfer_id, to),
            )
            .await?
            {
                Ok(()) => {
                    info!(
                        transfer_id = %transfer_id,
                        from = %from,
                        to = %to,
                        attempt,
                        "Phase advanced"
                    );
                    return Ok(to);
                }
                Err(e) => e,
            };

            match bounded(transfer_id, from, deadline, self.ledger.read_phase(transfer_id)).await? {
                Ok(current) if current == to => {
                    info!(
                        transfer_id = %transfer_id,
                        from = %from,
                        to = %to,
                        attempt,
                        "Phase advanced (confirmed on re-read)"
                    );
                    return Ok(to);
                }
                Ok(current) if current != from => {
                    error!(
                        transfer_id = %transfer_id,
                        current = %current,
                        to = %to,
                        "Ledger moved underneath the coordinator"
                    );
                    return Err(TransferError::InvalidTransition {
                        transfer_id: transfer_id.to_string(),
                        from: current,
                        to,
                    });
                }
                Ok(_) => {}
                Err(read_err) => {
                    warn!(transfer_id = %transfer_id, error = %read_err, "Phase re-read failed");
                }
            }

            if attempt >= max_attempts {
                error!(
                    transfer_id = %transfer_id,
                    reached = %from,
                    to = %to,
                    attempts = attempt,
                    error = %err,
                    "Ledger append failed, giving up"
                );
                return Err(TransferError::PartialTransfer {
                    transfer_id: transfer_id.to_string(),
                    reached: from,
                    reason: format!(
                        "ledger append of {} failed after {} attempts: {}",
                        to, attempt, err
                    ),
                });
            }

            warn!(
                transfer_id = %transfer_id,
                to = %to,
                attempt,
                error = %err,
                "Ledger append failed, retrying"
            );
            bounded(
                transfer_id,
                from,
                deadline,
                tokio::time::sleep(Duration::from_millis(policy.backoff_ms)),
            )
            .await?;
            attempt += 1;
        }
    }
}
