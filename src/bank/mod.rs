//! Bank Adapters
//!
//! Each adapter applies a signed amount adjustment to an account at one bank.
//! Adapters own no state of their own: the balance lives at the bank, and the
//! only thing the coordinator learns is the [`AdjustmentResult`].
//!
//! The registry never retries. Retry and compensation policy belongs to the
//! coordinator.

pub mod faas;
pub mod whisk;

pub use faas::FaasAdapter;
pub use whisk::WhiskAdapter;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::BankConfig;
use crate::transfer::error::TransferError;

/// Outcome of one adjustment call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjustmentResult {
    /// Gateway accepted the adjustment (raw provider response)
    Applied(String),
    /// Gateway answered and refused (safe to compensate)
    Rejected(String),
    /// Transport error or timeout - outcome unknown, NOT safe to compensate
    Unreachable(String),
}

impl AdjustmentResult {
    #[inline]
    pub fn is_applied(&self) -> bool {
        matches!(self, AdjustmentResult::Applied(_))
    }

    #[inline]
    pub fn is_rejected(&self) -> bool {
        matches!(self, AdjustmentResult::Rejected(_))
    }

    #[inline]
    pub fn is_unreachable(&self) -> bool {
        matches!(self, AdjustmentResult::Unreachable(_))
    }

    /// Provider response or failure detail
    pub fn detail(&self) -> &str {
        match self {
            AdjustmentResult::Applied(s)
            | AdjustmentResult::Rejected(s)
            | AdjustmentResult::Unreachable(s) => s,
        }
    }
}

/// Bank adapter trait for balance adjustments
///
/// A negative amount debits the account, a positive amount credits it.
#[async_trait]
pub trait BankAdapter: Send + Sync {
    /// Adapter name for logging
    fn name(&self) -> &str;

    async fn adjust(&self, account_id: &str, amount: Decimal) -> AdjustmentResult;
}

/// Known adapter implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BankKind {
    /// HTTP function behind a FaaS gateway
    Faas,
    /// OpenWhisk action invoked through the REST API
    Whisk,
}

/// Bank name → adapter
#[derive(Default, Clone)]
pub struct BankRegistry {
    adapters: HashMap<String, Arc<dyn BankAdapter>>,
}

impl BankRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every configured bank
    pub fn from_config(banks: &[BankConfig]) -> anyhow::Result<Self> {
        let mut registry = Self::new();
        for bank in banks {
            let (adapter, endpoint): (Arc<dyn BankAdapter>, String) = match bank.kind {
                BankKind::Faas => {
                    let adapter = FaasAdapter::from_config(bank)?;
                    let endpoint = adapter.endpoint().to_string();
                    (Arc::new(adapter), endpoint)
                }
                BankKind::Whisk => {
                    let adapter = WhiskAdapter::from_config(bank)?;
                    let endpoint = adapter.endpoint().to_string();
                    (Arc::new(adapter), endpoint)
                }
            };
            info!(
                bank = %bank.name,
                kind = ?bank.kind,
                endpoint = %endpoint,
                "Bank adapter registered"
            );
            registry.register(bank.name.clone(), adapter);
        }
        Ok(registry)
    }

    pub fn register(&mut self, bank_name: impl Into<String>, adapter: Arc<dyn BankAdapter>) {
        self.adapters.insert(bank_name.into(), adapter);
    }

    pub fn with(mut self, bank_name: impl Into<String>, adapter: Arc<dyn BankAdapter>) -> Self {
        self.register(bank_name, adapter);
        self
    }

    /// Select the adapter for a bank; unknown banks are an error, never a no-op
    pub fn get(&self, bank_name: &str) -> Result<Arc<dyn BankAdapter>, TransferError> {
        self.adapters
            .get(bank_name)
            .cloned()
            .ok_or_else(|| TransferError::UnsupportedBank(bank_name.to_string()))
    }

    pub async fn adjust(
        &self,
        bank_name: &str,
        account_id: &str,
        amount: Decimal,
    ) -> Result<AdjustmentResult, TransferError> {
        let adapter = self.get(bank_name)?;
        Ok(adapter.adjust(account_id, amount).await)
    }

    pub fn bank_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Mock adapter for testing
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// One observed adjustment, in call order across all adapters sharing a journal
    #[derive(Debug, Clone, PartialEq)]
    pub struct AdjustCall {
        pub bank: String,
        pub account_id: String,
        pub amount: Decimal,
    }

    pub type Journal = Arc<Mutex<Vec<AdjustCall>>>;

    pub struct MockBankAdapter {
        name: String,
        journal: Journal,
        reject_debits: AtomicBool,
        reject_credits: AtomicBool,
        unreachable_credits: AtomicBool,
        delay: Mutex<Option<Duration>>,
    }

    impl MockBankAdapter {
        pub fn new(name: &str, journal: Journal) -> Self {
            Self {
                name: name.to_string(),
                journal,
                reject_debits: AtomicBool::new(false),
                reject_credits: AtomicBool::new(false),
                unreachable_credits: AtomicBool::new(false),
                delay: Mutex::new(None),
            }
        }

        pub fn set_reject_debits(&self, reject: bool) {
            self.reject_debits.store(reject, Ordering::SeqCst);
        }

        pub fn set_reject_credits(&self, reject: bool) {
            self.reject_credits.store(reject, Ordering::SeqCst);
        }

        pub fn set_unreachable_credits(&self, unreachable: bool) {
            self.unreachable_credits.store(unreachable, Ordering::SeqCst);
        }

        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }

        pub fn calls(&self) -> Vec<AdjustCall> {
            self.journal
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.bank == self.name)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl BankAdapter for MockBankAdapter {
        fn name(&self) -> &str {
            &self.name
        }

        async fn adjust(&self, account_id: &str, amount: Decimal) -> AdjustmentResult {
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            self.journal.lock().unwrap().push(AdjustCall {
                bank: self.name.clone(),
                account_id: account_id.to_string(),
                amount,
            });

            let is_debit = amount.is_sign_negative();
            if is_debit && self.reject_debits.load(Ordering::SeqCst) {
                AdjustmentResult::Rejected("Mock debit rejected".to_string())
            } else if !is_debit && self.unreachable_credits.load(Ordering::SeqCst) {
                AdjustmentResult::Unreachable("Mock credit timed out".to_string())
            } else if !is_debit && self.reject_credits.load(Ordering::SeqCst) {
                AdjustmentResult::Rejected("Mock credit rejected".to_string())
            } else {
                AdjustmentResult::Applied("{\"success\":\"ok\"}".to_string())
            }
        }
    }
}

#[cfg(test)]
pub use mock::MockBankAdapter;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_adjustment_result() {
        assert!(AdjustmentResult::Applied("ok".into()).is_applied());
        assert!(!AdjustmentResult::Applied("ok".into()).is_rejected());

        let rejected = AdjustmentResult::Rejected("HTTP 500".into());
        assert!(rejected.is_rejected());
        assert_eq!(rejected.detail(), "HTTP 500");

        assert!(AdjustmentResult::Unreachable("timeout".into()).is_unreachable());
    }

    #[tokio::test]
    async fn test_unknown_bank_is_an_error() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let registry =
            BankRegistry::new().with("faas", Arc::new(MockBankAdapter::new("faas", journal.clone())));

        let err = registry
            .adjust("hsbc", "A1", Decimal::from(10))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::UnsupportedBank(ref b) if b == "hsbc"));
        assert!(journal.lock().unwrap().is_empty());

        let ok = registry
            .adjust("faas", "55700", Decimal::from(-10))
            .await
            .unwrap();
        assert!(ok.is_applied());
        assert_eq!(journal.lock().unwrap()[0].amount, Decimal::from(-10));
    }

    #[test]
    fn test_bank_names_sorted() {
        let journal = Arc::new(Mutex::new(Vec::new()));
        let registry = BankRegistry::new()
            .with("whisk", Arc::new(MockBankAdapter::new("whisk", journal.clone())))
            .with("faas", Arc::new(MockBankAdapter::new("faas", journal)));
        assert_eq!(registry.bank_names(), vec!["faas", "whisk"]);
    }

    #[test]
    fn test_bank_kind_serde() {
        let kind: BankKind = serde_yaml::from_str("whisk").unwrap();
        assert_eq!(kind, BankKind::Whisk);
        assert!(serde_yaml::from_str::<BankKind>("swift").is_err());
    }
}
