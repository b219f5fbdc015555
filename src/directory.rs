//! Directory Lookup
//!
//! Resolves a routing reference (a phone number) to the bank account it is
//! registered to, by querying the ledger's registration log on every call.
//! Registrations can land while transfers are running, so nothing is cached.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ledger::{LedgerClient, LedgerError};

/// Bank account a routing reference is registered to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRef {
    pub bank_name: String,
    pub account_id: String,
}

impl AccountRef {
    pub fn new(bank_name: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            bank_name: bank_name.into(),
            account_id: account_id.into(),
        }
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bank_name, self.account_id)
    }
}

/// Outcome of a lookup the ledger answered
///
/// `NotFound` is a normal result, not an error. Query failures come back as
/// `Err(LedgerError)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(AccountRef),
    NotFound,
}

impl Lookup {
    pub fn into_account(self) -> Option<AccountRef> {
        match self {
            Lookup::Found(account) => Some(account),
            Lookup::NotFound => None,
        }
    }
}

#[derive(Clone)]
pub struct DirectoryLookup {
    ledger: Arc<dyn LedgerClient>,
}

impl DirectoryLookup {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }

    pub async fn resolve(&self, routing_ref: &str) -> Result<Lookup, LedgerError> {
        let routing_ref = routing_ref.trim();
        if routing_ref.is_empty() {
            return Ok(Lookup::NotFound);
        }

        let lookup = match self.ledger.find_registration(routing_ref).await? {
            Some(account) => Lookup::Found(account),
            None => Lookup::NotFound,
        };
        debug!(routing_ref = %routing_ref, outcome = ?lookup, "Directory lookup");
        Ok(lookup)
    }
}
