//! OpenWhisk Action Adapter
//!
//! Invokes an account-control action through the OpenWhisk REST API as a
//! blocking call and reads the activation record. The adjustment counts as
//! applied only when the activation reports `response.success == true`.
//! A 202 means the action outlived the blocking wait and is still running, so
//! its outcome is unknown.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{AdjustmentResult, BankAdapter};
use crate::config::BankConfig;

pub const DEFAULT_WHISK_URL: &str = "https://whisk:443";
pub const DEFAULT_NAMESPACE: &str = "guest";
pub const DEFAULT_ACTION: &str = "account_ctl";
const DEFAULT_TIMEOUT_MS: u64 = 60_000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionParams<'a> {
    account_id: &'a str,
    /// Sent as a JSON number
    #[serde(with = "rust_decimal::serde::float")]
    amount: Decimal,
}

#[derive(Deserialize)]
struct Activation {
    response: ActivationResponse,
}

#[derive(Deserialize)]
struct ActivationResponse {
    success: bool,
}

fn activation_outcome(status: StatusCode, body: String) -> AdjustmentResult {
    if status == StatusCode::ACCEPTED {
        return AdjustmentResult::Unreachable(format!("activation still running: {}", body));
    }
    if status != StatusCode::OK {
        return AdjustmentResult::Rejected(format!("HTTP {}: {}", status, body));
    }
    match serde_json::from_str::<Activation>(&body) {
        Ok(activation) if activation.response.success => AdjustmentResult::Applied(body),
        Ok(_) => AdjustmentResult::Rejected(body),
        Err(e) => AdjustmentResult::Rejected(format!("unreadable activation ({}): {}", e, body)),
    }
}

pub struct WhiskAdapter {
    name: String,
    endpoint: String,
    api_key: String,
    api_pass: String,
    client: reqwest::Client,
}

impl WhiskAdapter {
    pub fn from_config(config: &BankConfig) -> Result<Self, reqwest::Error> {
        let base = config
            .url
            .as_deref()
            .unwrap_or(DEFAULT_WHISK_URL)
            .trim_end_matches('/');
        let namespace = config.namespace.as_deref().unwrap_or(DEFAULT_NAMESPACE);
        let action = config.action.as_deref().unwrap_or(DEFAULT_ACTION);

        if config.api_key.is_empty() || config.api_pass.is_empty() {
            warn!(bank = %config.name, "OpenWhisk credentials are empty; invocations will be refused");
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(
                config.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            ))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            name: config.name.clone(),
            endpoint: format!(
                "{}/api/v1/namespaces/{}/actions/{}?blocking=true&result=false",
                base, namespace, action
            ),
            api_key: config.api_key.clone(),
            api_pass: config.api_pass.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BankAdapter for WhiskAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn adjust(&self, account_id: &str, amount: Decimal) -> AdjustmentResult {
        debug!(bank = %self.name, account_id = %account_id, amount = %amount, "OpenWhisk adjust");

        let response = match self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.api_key, Some(&self.api_pass))
            .json(&ActionParams { account_id, amount })
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(bank = %self.name, error = %e, "OpenWhisk API unreachable");
                return AdjustmentResult::Unreachable(e.to_string());
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        activation_outcome(status, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bank::BankKind;

    #[test]
    fn test_activation_success() {
        let body = r#"{"activationId":"a1","response":{"success":true,"status":"success","result":{"success":"ok"}}}"#;
        assert!(activation_outcome(StatusCode::OK, body.to_string()).is_applied());
    }

    #[test]
    fn test_activation_failure() {
        let body = r#"{"activationId":"a1","response":{"success":false,"status":"application error","result":{"error":"502 Bad Gateway"}}}"#;
        let result = activation_outcome(StatusCode::OK, body.to_string());
        assert!(result.is_rejected());
        assert!(result.detail().contains("application error"));
    }

    #[test]
    fn test_still_running_activation_is_unknown() {
        let result = activation_outcome(StatusCode::ACCEPTED, r#"{"activationId":"a2"}"#.into());
        assert!(result.is_unreachable());
        assert!(result.detail().contains("a2"));
    }

    #[test]
    fn test_non_200_and_garbage() {
        assert!(activation_outcome(StatusCode::UNAUTHORIZED, "denied".into()).is_rejected());
        assert!(activation_outcome(StatusCode::OK, "not json".into()).is_rejected());
    }

    #[test]
    fn test_amount_is_a_number() {
        let params = ActionParams {
            account_id: "A1234",
            amount: Decimal::new(-505, 1),
        };
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["accountId"], "A1234");
        assert_eq!(json["amount"].as_f64(), Some(-50.5));
    }

    #[test]
    fn test_endpoint_from_config() {
        let mut config = BankConfig::new("whisk", BankKind::Whisk);
        config.url = Some("https://whisk.local/".to_string());
        let adapter = WhiskAdapter::from_config(&config).unwrap();
        assert_eq!(
            adapter.endpoint(),
            "https://whisk.local/api/v1/namespaces/guest/actions/account_ctl?blocking=true&result=false"
        );
    }
}
