//! FaaS Gateway Adapter
//!
//! Posts `{accountId, amount}` to a function behind an HTTP FaaS gateway.
//! HTTP 200 means the adjustment was applied; any other status is a refusal
//! carrying the raw response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, warn};

use super::{AdjustmentResult, BankAdapter};
use crate::config::BankConfig;

pub const DEFAULT_GATEWAY_URL: &str = "http://gateway:8080";
pub const DEFAULT_FUNCTION_PATH: &str = "/function/hivectl";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AdjustBody<'a> {
    account_id: &'a str,
    /// Sent as a decimal string
    amount: String,
}

/// Map a gateway answer to an adjustment outcome
fn gateway_outcome(status: StatusCode, body: String) -> AdjustmentResult {
    if status == StatusCode::OK {
        AdjustmentResult::Applied(body)
    } else {
        AdjustmentResult::Rejected(format!("HTTP {}: {}", status, body))
    }
}

pub struct FaasAdapter {
    name: String,
    endpoint: String,
    client: reqwest::Client,
}

impl FaasAdapter {
    pub fn new(
        name: impl Into<String>,
        gateway_url: &str,
        path: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            name: name.into(),
            endpoint: format!("{}{}", gateway_url.trim_end_matches('/'), path),
            client,
        })
    }

    pub fn from_config(config: &BankConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            config.name.clone(),
            config.url.as_deref().unwrap_or(DEFAULT_GATEWAY_URL),
            config.path.as_deref().unwrap_or(DEFAULT_FUNCTION_PATH),
            Duration::from_millis(config.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BankAdapter for FaasAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn adjust(&self, account_id: &str, amount: Decimal) -> AdjustmentResult {
        let body = AdjustBody {
            account_id,
            amount: amount.normalize().to_string(),
        };
        debug!(bank = %self.name, account_id = %account_id, amount = %amount, "FaaS adjust");

        let response = match self.client.post(&self.endpoint).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(bank = %self.name, error = %e, "FaaS gateway unreachable");
                return AdjustmentResult::Unreachable(e.to_string());
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        gateway_outcome(status, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::BankKind;

    #[test]
    fn test_gateway_outcome() {
        assert_eq!(
            gateway_outcome(StatusCode::OK, "done".into()),
            AdjustmentResult::Applied("done".into())
        );

        let rejected = gateway_outcome(StatusCode::BAD_GATEWAY, "boom".into());
        assert!(rejected.is_rejected());
        assert!(rejected.detail().contains("502"));
        assert!(rejected.detail().contains("boom"));

        // 2xx other than 200 is not treated as success
        assert!(gateway_outcome(StatusCode::ACCEPTED, String::new()).is_rejected());
    }

    #[test]
    fn test_body_shape() {
        let body = AdjustBody {
            account_id: "55700",
            amount: Decimal::new(-500, 1).normalize().to_string(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["accountId"], "55700");
        assert_eq!(json["amount"], "-50");
    }

    #[test]
    fn test_defaults_from_config() {
        let config = BankConfig::new("faas", BankKind::Faas);
        let adapter = FaasAdapter::from_config(&config).unwrap();
        assert_eq!(adapter.endpoint(), "http://gateway:8080/function/hivectl");
        assert_eq!(adapter.name(), "faas");
    }

    #[tokio::test]
    async fn test_unreachable_gateway() {
        let adapter =
            FaasAdapter::new("faas", "http://127.0.0.1:9", "/fn", Duration::from_millis(300))
                .unwrap();
        let result = adapter.adjust("55700", Decimal::from(5)).await;
        assert!(result.is_unreachable());
    }
}
