//! Building, signing, broadcasting and confirming `approve(spender, amount)`.

use crate::config::ApproveConfig;
use crate::contract::{UsdtContract, display_units};
use crate::network::{TronNetwork, USDT_DECIMALS};
use crate::wallet::{SignOutcome, TxSigner};
use alloy::primitives::U256;
use alloy::primitives::utils::parse_units;
use anyhow::Result;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info, warn};
use tron::TronAddress;
use tron::http::TransactionInfo;

/// Grace period past `raw_data.expiration` before a missing tx counts as expired.
const EXPIRATION_GRACE_MS: u64 = 3_000;
const MAX_POLL_DELAY: Duration = Duration::from_secs(30);
/// Keeps `whole * 10^6` inside a U256.
const MAX_WHOLE_DIGITS: usize = 70;

/// User-facing reasons an approval did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApproveFailure {
    #[error("invalid spender address: {0}")]
    InvalidSpender(String),

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("transaction was rejected in the wallet")]
    UserRejected,

    #[error("wallet does not support signing Tron transactions over WalletConnect")]
    UnsupportedWallet,

    #[error("WalletConnect session ended; run `approver connect`")]
    SessionEnded,

    #[error("not enough TRX to pay for energy or bandwidth: {0}")]
    InsufficientResources(String),

    #[error("contract execution failed: {0}")]
    Reverted(String),

    #[error("signature was not accepted: {0}")]
    BadSignature(String),

    #[error("transaction expired before it was included in a block")]
    Expired,

    #[error("network error: {0}")]
    Network(String),

    #[error("no confirmation after {polls} checks (txid {txid}); it may still be mined")]
    Timeout { txid: String, polls: u32 },

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApproveAmount {
    Exact(U256),
    Unlimited,
}

impl ApproveAmount {
    /// Parses a decimal USDT amount (at most 6 fractional digits) or `unlimited`/`max`.
    pub fn parse(s: &str) -> Result<Self, ApproveFailure> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unlimited") || s.eq_ignore_ascii_case("max") {
            return Ok(Self::Unlimited);
        }
        let invalid = |why: &str| ApproveFailure::InvalidAmount(format!("{s:?}: {why}"));

        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if whole.is_empty() && frac.is_empty() {
            return Err(invalid("empty"));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected a decimal number"));
        }
        // parse_units silently truncates extra decimals.
        if frac.len() > usize::from(USDT_DECIMALS) {
            return Err(invalid("USDT has at most 6 decimal places"));
        }
        if whole.len() > MAX_WHOLE_DIGITS {
            return Err(invalid("too large"));
        }

        let value = parse_units(s, USDT_DECIMALS)
            .map_err(|e| invalid(&e.to_string()))?
            .get_absolute();
        if value.is_zero() {
            return Err(invalid("must be greater than zero"));
        }
        Ok(Self::Exact(value))
    }

    pub fn base_units(self) -> U256 {
        match self {
            Self::Exact(v) => v,
            Self::Unlimited => U256::MAX,
        }
    }
}

impl fmt::Display for ApproveAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "{} USDT", display_units(*v, USDT_DECIMALS)),
            Self::Unlimited => f.write_str("unlimited USDT"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ApproveRequest {
    pub spender: TronAddress,
    pub amount: ApproveAmount,
}

impl ApproveRequest {
    pub fn parse(spender: &str, amount: &str) -> Result<Self, ApproveFailure> {
        let spender = TronAddress::parse_text(spender.trim())
            .map_err(|e| ApproveFailure::InvalidSpender(format!("{spender}: {e}")))?;
        Ok(Self {
            spender,
            amount: ApproveAmount::parse(amount)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ApproveReceipt {
    pub txid: String,
    pub block_number: u64,
    pub fee_sun: u64,
    pub explorer_url: String,
}

/// Runs the whole approval and maps any failure to an [`ApproveFailure`].
pub async fn approve(
    contract: &UsdtContract,
    signer: &dyn TxSigner,
    req: &ApproveRequest,
    cfg: ApproveConfig,
    network: TronNetwork,
) -> Result<ApproveReceipt, ApproveFailure> {
    submit(contract, signer, req, cfg, network)
        .await
        .map_err(|e| {
            let failure = classify(&e);
            warn!(error = %format!("{e:#}"), %failure, "approval failed");
            failure
        })
}

async fn submit(
    contract: &UsdtContract,
    signer: &dyn TxSigner,
    req: &ApproveRequest,
    cfg: ApproveConfig,
    network: TronNetwork,
) -> Result<ApproveReceipt> {
    let owner = signer.address();
    if owner == req.spender {
        return Err(ApproveFailure::InvalidSpender("spender equals the owner".to_string()).into());
    }

    let prepared = contract
        .build_approve(owner, req.spender, req.amount.base_units())
        .await?;
    info!(
        owner = %owner,
        spender = %req.spender,
        amount = %req.amount,
        fee_limit_sun = prepared.fee_limit_sun,
        energy = prepared.energy_required,
        txid = %prepared.tx.tx_id,
        "approve transaction built"
    );

    let expiration_ms = prepared.tx.expiration_ms();
    let txid = match signer.sign(&prepared.tx).await? {
        SignOutcome::Signed(tx) => {
            let txid = contract.http().broadcast_signed(&tx).await?;
            info!(txid = %hex::encode(txid), wallet = %signer.kind(), "approve broadcast");
            txid
        }
        SignOutcome::Broadcast { txid } => {
            info!(txid = %hex::encode(txid), wallet = %signer.kind(), "wallet broadcast approve");
            txid
        }
    };

    let info = wait_for_confirmation(contract, txid, expiration_ms, cfg).await?;
    if !info.succeeded() {
        let reason = info
            .decoded_res_message()
            .or_else(|| info.receipt.result.clone())
            .unwrap_or_else(|| "FAILED".to_string());
        anyhow::bail!("approve execution failed: {reason}");
    }

    let txid = hex::encode(txid);
    Ok(ApproveReceipt {
        explorer_url: network.explorer_tx_url(&txid),
        txid,
        block_number: info.block_number,
        fee_sun: info.fee,
    })
}

async fn wait_for_confirmation(
    contract: &UsdtContract,
    txid: [u8; 32],
    expiration_ms: Option<u64>,
    cfg: ApproveConfig,
) -> Result<TransactionInfo> {
    for attempt in 0..cfg.max_polls {
        match contract.http().get_transaction_info_by_id(txid).await {
            Ok(Some(info)) if info.block_number > 0 => return Ok(info),
            Ok(_) => debug!(attempt, "approve not yet mined"),
            Err(e) => warn!(attempt, error = %e, "transaction info lookup failed"),
        }
        if let Some(exp) = expiration_ms
            && now_millis() > exp.saturating_add(EXPIRATION_GRACE_MS)
        {
            return Err(ApproveFailure::Expired.into());
        }
        if attempt + 1 < cfg.max_polls {
            tokio::time::sleep(poll_delay(cfg.poll_interval, attempt)).await;
        }
    }
    Err(ApproveFailure::Timeout {
        txid: hex::encode(txid),
        polls: cfg.max_polls,
    }
    .into())
}

/// Doubles the interval every few attempts, capped.
fn poll_delay(base: Duration, attempt: u32) -> Duration {
    let shift = (attempt / 3).min(4);
    base.saturating_mul(1u32 << shift).min(MAX_POLL_DELAY.max(base))
}

/// Maps an error chain to the message shown to the user.
pub fn classify(err: &anyhow::Error) -> ApproveFailure {
    for cause in err.chain() {
        if let Some(f) = cause.downcast_ref::<ApproveFailure>() {
            return f.clone();
        }
        if let Some(wc) = cause.downcast_ref::<walletconnect::Error>() {
            if wc.is_user_rejection() {
                return ApproveFailure::UserRejected;
            }
            if wc.is_unsupported_method() {
                return ApproveFailure::UnsupportedWallet;
            }
            if matches!(
                wc,
                walletconnect::Error::SessionExpired | walletconnect::Error::SessionNotFound(_)
            ) {
                return ApproveFailure::SessionEnded;
            }
            if let walletconnect::Error::Timeout(m) = wc {
                return ApproveFailure::Other(format!("wallet did not respond: {m}"));
            }
        }
        if let Some(re) = cause.downcast_ref::<reqwest::Error>()
            && (re.is_connect() || re.is_timeout() || re.is_request())
        {
            return ApproveFailure::Network(re.to_string());
        }
    }

    let full = format!("{err:#}");
    let msg = full.to_ascii_lowercase();
    if msg.contains("user rejected") || msg.contains("denied") || msg.contains("cancelled") {
        ApproveFailure::UserRejected
    } else if msg.contains("sigerror") || msg.contains("signature") {
        ApproveFailure::BadSignature(full)
    } else if msg.contains("balance is not sufficient")
        || msg.contains("insufficient")
        || msg.contains("out_of_energy")
        || msg.contains("bandwith_error")
        || msg.contains("bandwidth")
    {
        ApproveFailure::InsufficientResources(full)
    } else if msg.contains("revert") || msg.contains("execution failed") {
        ApproveFailure::Reverted(full)
    } else if msg.contains("transaction_expiration_error") || msg.contains("expired") {
        ApproveFailure::Expired
    } else {
        ApproveFailure::Other(full)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
