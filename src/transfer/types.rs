//! Transfer Types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::TransferError;

/// Transfer object as it travels on the wire
///
/// Every field is optional; [`TransferRequest::from_object`] decides what is
/// required. Cleared flags are omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TransferObject {
    /// Caller-supplied transfer id, the ledger key and idempotency token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,

    /// Sender routing reference (phone number)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,

    /// Receiver routing reference (phone number)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,

    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<f64>, example = 50.0)]
    pub amount: Option<Decimal>,

    /// Caller confirms the transfer should execute, not just be staged
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent: Option<bool>,

    /// Set once execution finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed: Option<bool>,
}

impl TransferObject {
    #[inline]
    pub fn is_sent(&self) -> bool {
        self.sent == Some(true)
    }
}

/// Request envelope `{"object": {...}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TransferEnvelope {
    #[serde(default)]
    pub object: Option<TransferObject>,
}

/// Validated transfer ready for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub transfer_id: String,
    pub from_ref: String,
    pub to_ref: String,
    /// Always > 0
    pub amount: Decimal,
}

fn required(value: &Option<String>, field: &str) -> Result<String, TransferError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(TransferError::Validation(format!("{} is required", field))),
    }
}

impl TransferRequest {
    pub fn from_object(object: &TransferObject) -> Result<Self, TransferError> {
        let transfer_id = required(&object.object_id, "objectId")?;
        let from_ref = required(&object.from, "from")?;
        let to_ref = required(&object.to, "to")?;

        let amount = object.amount.ok_or(TransferError::InvalidAmount)?;
        if amount <= Decimal::ZERO {
            return Err(TransferError::InvalidAmount);
        }

        Ok(Self {
            transfer_id,
            from_ref,
            to_ref,
            amount,
        })
    }
}
