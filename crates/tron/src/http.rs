use crate::TronAddress;
use crate::transaction::Transaction;
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Header full nodes behind TronGrid use for API keys.
pub const API_KEY_HEADER: &str = "TRON-PRO-API-KEY";

/// Thin client for the full node HTTP JSON API (`/wallet/*`).
#[derive(Debug, Clone)]
pub struct TronHttp {
    base_url: String,
    client: reqwest::Client,
}

/// `result` object most `/wallet/*` endpoints return.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeResult {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl NodeResult {
    /// Node messages are usually hex-encoded UTF-8.
    pub fn decoded_message(&self) -> Option<String> {
        self.message.as_deref().map(decode_node_message)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstantCallResult {
    #[serde(default)]
    pub result: NodeResult,
    #[serde(default)]
    pub constant_result: Vec<String>,
    #[serde(default)]
    pub energy_used: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct TriggerResponse {
    #[serde(default)]
    result: NodeResult,
    #[serde(default)]
    transaction: Option<Transaction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BroadcastResult {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl BroadcastResult {
    pub fn decoded_message(&self) -> Option<String> {
        self.message.as_deref().map(decode_node_message)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionReceipt {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub energy_usage_total: u64,
    #[serde(default)]
    pub net_usage: u64,
    #[serde(default)]
    pub net_fee: u64,
    #[serde(default)]
    pub energy_fee: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub id: String,
    #[serde(default)]
    pub block_number: u64,
    #[serde(default)]
    pub block_time_stamp: u64,
    #[serde(default)]
    pub fee: u64,
    #[serde(default)]
    pub receipt: TransactionReceipt,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default, rename = "resMessage")]
    pub res_message: Option<String>,
}

impl TransactionInfo {
    /// `true` unless the node reports a failed execution.
    pub fn succeeded(&self) -> bool {
        self.result.as_deref() != Some("FAILED")
            && self
                .receipt
                .result
                .as_deref()
                .is_none_or(|r| r == "SUCCESS")
    }

    pub fn decoded_res_message(&self) -> Option<String> {
        self.res_message.as_deref().map(decode_node_message)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainParameter {
    pub key: String,
    #[serde(default)]
    pub value: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainParameters {
    #[serde(default, rename = "chainParameter")]
    pub chain_parameter: Vec<ChainParameter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub balance: u64,
}

#[derive(Debug, Serialize)]
struct ContractCallRequest<'a> {
    owner_address: String,
    contract_address: String,
    function_selector: &'a str,
    parameter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    fee_limit: Option<u64>,
    call_value: u64,
    visible: bool,
}

impl TronHttp {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
            headers.insert(
                API_KEY_HEADER,
                reqwest::header::HeaderValue::from_str(key).context("invalid TRON API key")?,
            );
        }
        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("build tron http client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let started = std::time::Instant::now();
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("POST {path}"))?;
        let status = resp.status();
        let text = resp.text().await.with_context(|| format!("read {path} body"))?;
        tracing::debug!(
            path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tron http call"
        );
        if !status.is_success() {
            anyhow::bail!("{path} returned http {}: {}", status.as_u16(), truncate(&text, 256));
        }
        if let Ok(v) = serde_json::from_str::<Value>(&text)
            && let Some(err) = v.get("Error").and_then(Value::as_str)
        {
            anyhow::bail!("{path} node error: {err}");
        }
        serde_json::from_str(&text).with_context(|| format!("decode {path} response"))
    }

    /// Read-only contract call (`/wallet/triggerconstantcontract`).
    pub async fn trigger_constant_contract(
        &self,
        owner: TronAddress,
        contract: TronAddress,
        function_selector: &str,
        parameter: &[u8],
    ) -> Result<ConstantCallResult> {
        let req = ContractCallRequest {
            owner_address: owner.to_base58check(),
            contract_address: contract.to_base58check(),
            function_selector,
            parameter: hex::encode(parameter),
            fee_limit: None,
            call_value: 0,
            visible: true,
        };
        let res: ConstantCallResult = self.post("/wallet/triggerconstantcontract", &req).await?;
        if !res.result.result {
            anyhow::bail!(
                "constant call {function_selector} failed: code={:?} msg={}",
                res.result.code,
                res.result.decoded_message().unwrap_or_else(|| "<missing>".to_string())
            );
        }
        Ok(res)
    }

    /// Asks the node to build an unsigned TriggerSmartContract tx.
    pub async fn trigger_smart_contract(
        &self,
        owner: TronAddress,
        contract: TronAddress,
        function_selector: &str,
        parameter: &[u8],
        fee_limit_sun: u64,
        call_value_sun: u64,
    ) -> Result<Transaction> {
        let req = ContractCallRequest {
            owner_address: owner.to_base58check(),
            contract_address: contract.to_base58check(),
            function_selector,
            parameter: hex::encode(parameter),
            fee_limit: Some(fee_limit_sun),
            call_value: call_value_sun,
            visible: true,
        };
        let res: TriggerResponse = self.post("/wallet/triggersmartcontract", &req).await?;
        if !res.result.result {
            anyhow::bail!(
                "node returned no transaction for {function_selector}: code={:?} msg={}",
                res.result.code,
                res.result.decoded_message().unwrap_or_else(|| "<missing>".to_string())
            );
        }
        res.transaction.context("node returned no transaction")
    }

    pub async fn broadcast_transaction(&self, tx: &Transaction) -> Result<BroadcastResult> {
        if !tx.is_signed() {
            anyhow::bail!("refusing to broadcast an unsigned transaction");
        }
        self.post("/wallet/broadcasttransaction", tx).await
    }

    /// Returns `None` until the transaction has been included in a block.
    pub async fn get_transaction_info_by_id(&self, txid: [u8; 32]) -> Result<Option<TransactionInfo>> {
        let v: Value = self
            .post(
                "/wallet/gettransactioninfobyid",
                &json!({ "value": hex::encode(txid) }),
            )
            .await?;
        if v.as_object().is_none_or(|m| m.is_empty()) {
            return Ok(None);
        }
        let info: TransactionInfo =
            serde_json::from_value(v).context("decode TransactionInfo")?;
        Ok(Some(info))
    }

    pub async fn get_chain_parameters(&self) -> Result<ChainParameters> {
        self.post("/wallet/getchainparameters", &json!({})).await
    }

    /// Missing accounts (never activated) decode as a zero balance.
    pub async fn get_account(&self, address: TronAddress) -> Result<Account> {
        self.post(
            "/wallet/getaccount",
            &json!({ "address": address.to_base58check(), "visible": true }),
        )
        .await
    }
}

/// Decodes a hex-encoded node message, falling back to the raw text.
pub fn decode_node_message(msg: &str) -> String {
    match hex::decode(msg) {
        Ok(bytes) if !msg.is_empty() => String::from_utf8(bytes).unwrap_or_else(|_| msg.to_string()),
        _ => msg.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_node_message_handles_hex_and_plain_text() {
        assert_eq!(
            decode_node_message("436f6e74726163742076616c6964617465206572726f72"),
            "Contract validate error"
        );
        assert_eq!(decode_node_message("plain text"), "plain text");
        assert_eq!(decode_node_message(""), "");
    }

    #[test]
    fn transaction_info_success_flags() {
        let ok: TransactionInfo = serde_json::from_value(json!({
            "id": "ab",
            "blockNumber": 10,
            "receipt": {"result": "SUCCESS", "energy_usage_total": 14000}
        }))
        .unwrap();
        assert!(ok.succeeded());
        assert_eq!(ok.receipt.energy_usage_total, 14000);

        let reverted: TransactionInfo = serde_json::from_value(json!({
            "id": "ab",
            "blockNumber": 10,
            "result": "FAILED",
            "resMessage": "5245564552540a",
            "receipt": {"result": "REVERT"}
        }))
        .unwrap();
        assert!(!reverted.succeeded());
        assert_eq!(reverted.decoded_res_message().as_deref(), Some("REVERT\n"));
    }
}
