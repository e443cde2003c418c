//! Plain-text status rendering for the terminal.

use crate::approve::{ApproveFailure, ApproveReceipt};
use crate::contract::display_units;
use crate::network::{TronNetwork, USDT_DECIMALS};
use crate::wallet::{ActiveWallet, HookStatus};
use alloy::primitives::U256;
use std::fmt::Write;

const SUN_PER_TRX: u8 = 6;

/// Everything the `status` command shows. Fields are `None` when unknown or not loaded.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub network: TronNetwork,
    pub usdt_contract: String,
    pub native_available: bool,
    pub walletconnect: Option<HookStatus>,
    pub active: Option<ActiveWallet>,
    pub trx_balance_sun: Option<u64>,
    pub usdt_balance: Option<U256>,
    /// `(spender, allowance)`.
    pub allowance: Option<(String, U256)>,
}

pub fn render_status(r: &StatusReport) -> String {
    let mut out = String::new();
    let testnet = if r.network.is_testnet() { " (testnet)" } else { "" };
    let _ = writeln!(out, "Network:        {}{testnet}", r.network);
    let _ = writeln!(out, "USDT contract:  {}", r.usdt_contract);
    let _ = writeln!(
        out,
        "Native key:     {}",
        if r.native_available { "available" } else { "not configured" }
    );
    let wc = match &r.walletconnect {
        Some(status) => status.to_string(),
        None => "disabled (set WC_PROJECT_ID)".to_string(),
    };
    let _ = writeln!(out, "WalletConnect:  {wc}");

    match &r.active {
        Some(w) => {
            let _ = writeln!(out, "Active wallet:  {} [{} via {}]", w.address, w.kind, w.source);
        }
        None => {
            let _ = writeln!(out, "Active wallet:  none");
            return out;
        }
    }
    if let Some(sun) = r.trx_balance_sun {
        let _ = writeln!(out, "TRX balance:    {}", format_trx(sun));
    }
    if let Some(bal) = r.usdt_balance {
        let _ = writeln!(out, "USDT balance:   {}", format_usdt(bal));
    }
    if let Some((spender, allowance)) = &r.allowance {
        let _ = writeln!(out, "Allowance:      {} for {spender}", format_usdt(*allowance));
    }
    out
}

pub fn format_trx(sun: u64) -> String {
    format!("{} TRX", display_units(U256::from(sun), SUN_PER_TRX))
}

/// `U256::MAX` reads as unlimited.
pub fn format_usdt(v: U256) -> String {
    if v == U256::MAX {
        return "unlimited USDT".to_string();
    }
    format!("{} USDT", display_units(v, USDT_DECIMALS))
}

pub fn render_receipt(r: &ApproveReceipt) -> String {
    format!(
        "Approval confirmed in block {}\n  txid: {}\n  fee:  {}\n  {}\n",
        r.block_number,
        r.txid,
        format_trx(r.fee_sun),
        r.explorer_url
    )
}

pub fn render_failure(f: &ApproveFailure) -> String {
    let hint = match f {
        ApproveFailure::UserRejected => Some("Confirm the request in your wallet to continue."),
        ApproveFailure::UnsupportedWallet => {
            Some("Use a Tron-compatible wallet such as TronLink or Trust Wallet.")
        }
        ApproveFailure::SessionEnded => {
            Some("The wallet closed or expired the session; pair again to continue.")
        }
        ApproveFailure::InsufficientResources(_) => {
            Some("Top up TRX or stake for energy, then retry.")
        }
        ApproveFailure::InvalidSpender(_) => Some("Spender must be a base58 (T...) Tron address."),
        ApproveFailure::Expired => Some("The wallet took too long to sign; retry."),
        _ => None,
    };
    match hint {
        Some(h) => format!("Approval failed: {f}\n{h}\n"),
        None => format!("Approval failed: {f}\n"),
    }
}
