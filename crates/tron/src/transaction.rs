use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Bytes a single 65-byte signature adds to the protobuf-encoded transaction.
const SIGNATURE_FIELD_BYTES: u64 = 67;
/// Bandwidth accounting also charges for the `ret` entry nodes append.
const RET_FIELD_BYTES: u64 = 64;

/// A transaction in the node HTTP API's JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "txID")]
    pub tx_id: String,
    pub raw_data: Value,
    pub raw_data_hex: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<String>,
    #[serde(default)]
    pub visible: bool,
}

impl Transaction {
    pub fn txid(&self) -> Result<[u8; 32]> {
        let bytes = hex::decode(self.tx_id.trim_start_matches("0x")).context("invalid txID hex")?;
        bytes
            .try_into()
            .map_err(|b: Vec<u8>| anyhow::anyhow!("txID must be 32 bytes (got {})", b.len()))
    }

    /// `sha256(raw_data_bytes)`, recomputed locally.
    pub fn computed_txid(&self) -> Result<[u8; 32]> {
        let raw = hex::decode(&self.raw_data_hex).context("invalid raw_data_hex")?;
        Ok(Sha256::digest(&raw).into())
    }

    /// Fails when the node-provided txID does not commit to `raw_data_hex`.
    pub fn verify_txid(&self) -> Result<[u8; 32]> {
        let claimed = self.txid()?;
        let computed = self.computed_txid()?;
        if claimed != computed {
            anyhow::bail!(
                "txID mismatch: node=0x{} computed=0x{}",
                hex::encode(claimed),
                hex::encode(computed)
            );
        }
        Ok(computed)
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty()
    }

    pub fn fee_limit_sun(&self) -> Option<u64> {
        self.raw_data.get("fee_limit").and_then(Value::as_u64)
    }

    /// Expiration timestamp in unix millis.
    pub fn expiration_ms(&self) -> Option<u64> {
        self.raw_data.get("expiration").and_then(Value::as_u64)
    }

    /// Estimated on-chain size once a single signature is attached.
    pub fn estimated_size_bytes(&self) -> u64 {
        let raw_len = u64::try_from(self.raw_data_hex.len() / 2).unwrap_or(u64::MAX);
        raw_len
            .saturating_add(SIGNATURE_FIELD_BYTES)
            .saturating_add(RET_FIELD_BYTES)
    }
}
