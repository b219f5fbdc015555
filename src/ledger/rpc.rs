//! JSON-RPC Ledger Backend
//!
//! Talks to the ledger node's registration and transfer-state contracts over
//! JSON-RPC 2.0. Write calls return a receipt; a transition only counts as
//! recorded when the receipt carries the matching event.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::LedgerError;
use super::phase::LedgerPhase;
use super::LedgerClient;
use crate::directory::AccountRef;

/// JSON-RPC request structure
#[derive(Serialize)]
struct JsonRpcRequest<'a, T> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

/// Transaction receipt returned by contract calls
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Receipt {
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub events: Vec<ReceiptEvent>,
}

/// Events emitted by the registration and transfer-state contracts
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event")]
pub(crate) enum ReceiptEvent {
    RegistrationFound {
        #[serde(rename = "telNo")]
        tel_no: String,
        bank: String,
        #[serde(rename = "accNo")]
        acc_no: String,
    },
    RegistrationNotFound {
        #[serde(rename = "telNo")]
        tel_no: String,
    },
    TransferStarted {
        #[serde(rename = "txId")]
        tx_id: String,
    },
    TransferPending {
        #[serde(rename = "txId")]
        tx_id: String,
    },
    TransferCompleted {
        #[serde(rename = "txId")]
        tx_id: String,
    },
    TransferCompensated {
        #[serde(rename = "txId")]
        tx_id: String,
    },
    /// Events we do not consume (e.g. AlreadyExisted)
    #[serde(other)]
    Other,
}

/// Contract method that appends `phase`
fn transition_method(phase: LedgerPhase) -> Option<&'static str> {
    match phase {
        LedgerPhase::Started => Some("transferState_start"),
        LedgerPhase::Pending => Some("transferState_pending"),
        LedgerPhase::Completed => Some("transferState_complete"),
        LedgerPhase::Compensated => Some("transferState_compensate"),
        LedgerPhase::None => None,
    }
}

/// Decode a lookup receipt.
///
/// Found wins over NotFound; a receipt with neither is a protocol error.
pub(crate) fn registration_from_receipt(
    receipt: &Receipt,
) -> Result<Option<AccountRef>, LedgerError> {
    let found = receipt.events.iter().find_map(|e| match e {
        ReceiptEvent::RegistrationFound {
            tel_no,
            bank,
            acc_no,
        } => Some((tel_no, AccountRef::new(bank.clone(), acc_no.clone()))),
        _ => None,
    });
    if let Some((tel_no, account)) = found {
        debug!(tel_no = %tel_no, account = %account, "RegistrationFound");
        return Ok(Some(account));
    }

    if receipt
        .events
        .iter()
        .any(|e| matches!(e, ReceiptEvent::RegistrationNotFound { .. }))
    {
        return Ok(None);
    }

    Err(LedgerError::Malformed(
        "lookup receipt carries no registration event".to_string(),
    ))
}

/// Check that a transition receipt records `phase` for `transfer_id`
pub(crate) fn transition_confirmed(receipt: &Receipt, transfer_id: &str, phase: LedgerPhase) -> bool {
    receipt.events.iter().any(|e| match (e, phase) {
        (ReceiptEvent::TransferStarted { tx_id }, LedgerPhase::Started)
        | (ReceiptEvent::TransferPending { tx_id }, LedgerPhase::Pending)
        | (ReceiptEvent::TransferCompleted { tx_id }, LedgerPhase::Completed)
        | (ReceiptEvent::TransferCompensated { tx_id }, LedgerPhase::Compensated) => {
            tx_id == transfer_id
        }
        _ => false,
    })
}

/// Ledger backend that connects to a ledger node via JSON-RPC
pub struct RpcLedger {
    url: String,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl RpcLedger {
    /// Create a new RPC ledger client
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LedgerError> {
        let url = url.into();
        info!("Initializing RPC ledger at {}", url);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LedgerError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url,
            client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Make a JSON-RPC call
    async fn rpc_call<T, R>(&self, method: &str, params: T) -> Result<R, LedgerError>
    where
        T: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("HTTP request failed: {}", e)))?;

        let rpc_response: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| LedgerError::Malformed(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = rpc_response.error {
            return Err(LedgerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| LedgerError::Malformed(format!("No result in {} response", method)))
    }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    fn name(&self) -> &'static str {
        "rpc"
    }

    async fn find_registration(
        &self,
        routing_ref: &str,
    ) -> Result<Option<AccountRef>, LedgerError> {
        let receipt: Receipt = self
            .rpc_call("registration_findByTelNo", [routing_ref])
            .await?;
        registration_from_receipt(&receipt)
    }

    async fn append_transition(
        &self,
        transfer_id: &str,
        phase: LedgerPhase,
    ) -> Result<(), LedgerError> {
        let rejected = || LedgerError::TransitionRejected {
            transfer_id: transfer_id.to_string(),
            phase,
        };
        let method = transition_method(phase).ok_or_else(rejected)?;

        let receipt: Receipt = self.rpc_call(method, [transfer_id]).await?;
        if !transition_confirmed(&receipt, transfer_id, phase) {
            return Err(rejected());
        }

        debug!(
            transfer_id = %transfer_id,
            phase = %phase,
            tx_hash = receipt.transaction_hash.as_deref().unwrap_or("-"),
            "Transition recorded"
        );
        Ok(())
    }

    async fn read_phase(&self, transfer_id: &str) -> Result<LedgerPhase, LedgerError> {
        let phase: String = self
            .rpc_call("transferState_phaseOf", [transfer_id])
            .await?;
        phase.parse()
    }
}
