//! Ledger Phase Definitions
//!
//! The forward walk is NONE → STARTED → PENDING → COMPLETED, with COMPENSATED
//! as the alternative terminal phase reachable only from PENDING.

use std::fmt;
use std::str::FromStr;

use super::error::LedgerError;

/// Transfer progress as recorded on the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LedgerPhase {
    /// No transition recorded yet
    #[default]
    None,

    /// START appended, nothing debited yet
    Started,

    /// Sender debited - funds are IN-FLIGHT until COMPLETED or COMPENSATED
    Pending,

    /// Terminal: receiver credited
    Completed,

    /// Terminal: credit leg rejected, sender refunded
    Compensated,
}

impl LedgerPhase {
    /// Check if this is a terminal phase (no more transitions possible)
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, LedgerPhase::Completed | LedgerPhase::Compensated)
    }

    /// Check if funds are in-flight (sender debited, receiver not confirmed)
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        matches!(self, LedgerPhase::Pending)
    }

    /// Legal forward transitions. Anything else would rewind or skip a phase.
    pub fn can_advance_to(&self, next: LedgerPhase) -> bool {
        matches!(
            (self, next),
            (LedgerPhase::None, LedgerPhase::Started)
                | (LedgerPhase::Started, LedgerPhase::Pending)
                | (LedgerPhase::Pending, LedgerPhase::Completed)
                | (LedgerPhase::Pending, LedgerPhase::Compensated)
        )
    }

    /// Position on the forward walk; both terminal phases share the last slot
    pub fn rank(&self) -> u8 {
        match self {
            LedgerPhase::None => 0,
            LedgerPhase::Started => 1,
            LedgerPhase::Pending => 2,
            LedgerPhase::Completed | LedgerPhase::Compensated => 3,
        }
    }

    /// Wire name used by the ledger
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerPhase::None => "NONE",
            LedgerPhase::Started => "STARTED",
            LedgerPhase::Pending => "PENDING",
            LedgerPhase::Completed => "COMPLETED",
            LedgerPhase::Compensated => "COMPENSATED",
        }
    }
}

impl fmt::Display for LedgerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LedgerPhase {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(LedgerPhase::None),
            "STARTED" => Ok(LedgerPhase::Started),
            "PENDING" => Ok(LedgerPhase::Pending),
            "COMPLETED" => Ok(LedgerPhase::Completed),
            "COMPENSATED" => Ok(LedgerPhase::Compensated),
            other => Err(LedgerError::Malformed(format!("unknown phase '{}'", other))),
        }
    }
}
