//! USDT contract helper bound to one node and fee policy.

use crate::config::TronConfig;
use alloy::primitives::U256;
use alloy::primitives::utils::format_units;
use anyhow::{Context, Result};
use tron::{FeePolicy, PreparedTrigger, Trc20Token, TronAddress, TronHttp};

pub struct UsdtContract {
    http: TronHttp,
    token: Trc20Token,
    fee_policy: FeePolicy,
}

impl UsdtContract {
    pub fn new(cfg: &TronConfig) -> Result<Self> {
        let http = TronHttp::new(&cfg.api_url, cfg.api_key.as_deref(), cfg.timeout)
            .with_context(|| format!("create Tron HTTP client for {}", cfg.api_url))?;
        Ok(Self::from_parts(http, cfg.usdt_contract, cfg.fee_policy))
    }

    pub fn from_parts(http: TronHttp, contract: TronAddress, fee_policy: FeePolicy) -> Self {
        Self {
            http,
            token: Trc20Token::new(contract),
            fee_policy,
        }
    }

    pub fn http(&self) -> &TronHttp {
        &self.http
    }

    pub fn address(&self) -> TronAddress {
        self.token.contract
    }

    pub async fn balance_of(&self, owner: TronAddress) -> Result<U256> {
        self.token
            .balance_of(&self.http, owner)
            .await
            .map_err(|e| self.explain(e))
            .context("load USDT balance")
    }

    pub async fn allowance(&self, owner: TronAddress, spender: TronAddress) -> Result<U256> {
        self.token
            .allowance(&self.http, owner, spender)
            .await
            .map_err(|e| self.explain(e))
            .context("load USDT allowance")
    }

    pub async fn trx_balance_sun(&self, owner: TronAddress) -> Result<u64> {
        let account = self
            .http
            .get_account(owner)
            .await
            .context("load TRX balance")?;
        Ok(account.balance)
    }

    pub async fn build_approve(
        &self,
        owner: TronAddress,
        spender: TronAddress,
        amount: U256,
    ) -> Result<PreparedTrigger> {
        self.token
            .build_approve(&self.http, owner, spender, amount, self.fee_policy)
            .await
            .map_err(|e| self.explain(e))
    }

    /// Adds a hint when the node says the configured contract does not exist.
    fn explain(&self, err: anyhow::Error) -> anyhow::Error {
        let msg = format!("{err:#}").to_ascii_lowercase();
        if msg.contains("no contract") || msg.contains("not a smart contract") {
            return err.context(format!(
                "USDT contract {} is not deployed on this network; check TRON_NETWORK or TRON_USDT_CONTRACT",
                self.token.contract
            ));
        }
        err
    }
}

/// Renders a base-unit amount with `decimals` fractional digits, trimming trailing zeros.
pub fn display_units(value: U256, decimals: u8) -> String {
    let Ok(text) = format_units(value, decimals) else {
        return value.to_string();
    };
    match text.split_once('.') {
        Some((whole, frac)) => match frac.trim_end_matches('0') {
            "" => whole.to_string(),
            frac => format!("{whole}.{frac}"),
        },
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    const USDT: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";

    fn contract(server: &MockServer) -> UsdtContract {
        let http = TronHttp::new(&server.uri(), None, Duration::from_secs(5)).unwrap();
        UsdtContract::from_parts(http, USDT.parse().unwrap(), FeePolicy::default())
    }

    #[test]
    fn display_units_trims_fraction() {
        assert_eq!(display_units(U256::from(1_500_000u64), 6), "1.5");
        assert_eq!(display_units(U256::from(2_000_000u64), 6), "2");
        assert_eq!(display_units(U256::from(1u64), 6), "0.000001");
        assert_eq!(display_units(U256::ZERO, 6), "0");
        assert_eq!(display_units(U256::from(123u64), 0), "123");
    }

    #[tokio::test]
    async fn missing_contract_gets_a_hint() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/wallet/triggerconstantcontract"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": {
                    "code": "CONTRACT_VALIDATE_ERROR",
                    "message": hex::encode("No contract or not a smart contract")
                }
            })))
            .mount(&server)
            .await;

        let c = contract(&server);
        let err = c.balance_of(USDT.parse().unwrap()).await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("is not deployed on this network"), "{msg}");
    }

    #[tokio::test]
    async fn trx_balance_reads_account() {
        let server = MockServer::start().await;
        Mock::given(matchers::method("POST"))
            .and(matchers::path("/wallet/getaccount"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "address": USDT,
                "balance": 42_000_000u64
            })))
            .mount(&server)
            .await;

        let c = contract(&server);
        assert_eq!(c.trx_balance_sun(USDT.parse().unwrap()).await.unwrap(), 42_000_000);
    }
}
