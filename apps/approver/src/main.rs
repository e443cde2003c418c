mod approve;
mod config;
mod contract;
mod network;
mod qrcode;
mod ui;
mod wallet;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tron::TronAddress;

use crate::approve::{ApproveFailure, ApproveRequest};
use crate::config::AppConfig;
use crate::contract::UsdtContract;
use crate::network::TronNetwork;
use crate::qrcode::PairingQr;
use crate::wallet::{NativeProvider, WalletConnectHook, WalletContext};

/// Approve USDT spending on Tron from a local key or a WalletConnect wallet.
#[derive(Debug, Parser)]
#[command(name = "approver", version)]
struct Cli {
    /// Overrides TRON_NETWORK.
    #[arg(long, global = true, value_enum)]
    network: Option<TronNetwork>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Show network, wallet and balances.
    Status {
        /// Also show the allowance granted to this spender.
        #[arg(long)]
        spender: Option<String>,
    },
    /// Pair a wallet over WalletConnect.
    Connect,
    /// End the WalletConnect session.
    Disconnect,
    /// TRX and USDT balance of an address (defaults to the active wallet).
    Balance { address: Option<String> },
    /// USDT allowance from `owner` (defaults to the active wallet) to `spender`.
    Allowance {
        spender: String,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Submit `approve(spender, amount)`; amount is in USDT or `unlimited`.
    Approve { spender: String, amount: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cfg = config::load_config(cli.network)?;
    tracing::info!(
        network = %cfg.network,
        api_url = %cfg.tron.api_url,
        usdt_contract = %cfg.tron.usdt_contract,
        walletconnect = cfg.walletconnect.is_some(),
        "config loaded"
    );

    let native = NativeProvider::detect(cfg.tron.private_key)?;
    let hook = match &cfg.walletconnect {
        Some(wc) => Some(WalletConnectHook::open(wc.clone(), cfg.network)?),
        None => None,
    };
    let mut ctx = WalletContext::new(native, hook);
    let contract = UsdtContract::new(&cfg.tron)?;

    tokio::select! {
        res = shutdown_signal() => {
            res?;
            tracing::info!("interrupted");
            Ok(ExitCode::from(130))
        },
        res = run(cli.command, &cfg, &mut ctx, &contract) => match res {
            Ok(()) => Ok(ExitCode::SUCCESS),
            Err(e) => match e.downcast_ref::<ApproveFailure>() {
                Some(failure) => {
                    eprint!("{}", ui::render_failure(failure));
                    Ok(ExitCode::FAILURE)
                }
                None => Err(e),
            },
        },
    }
}

async fn run(
    command: Command,
    cfg: &AppConfig,
    ctx: &mut WalletContext,
    contract: &UsdtContract,
) -> Result<()> {
    match command {
        Command::Status { spender } => {
            let spender = spender
                .as_deref()
                .map(TronAddress::parse_text)
                .transpose()
                .context("parse --spender")?;
            status(cfg, ctx, contract, spender).await
        }
        Command::Connect => {
            let hook = ctx.walletconnect_mut().context(
                "WalletConnect is not configured: set WC_PROJECT_ID to a WalletConnect Cloud project id",
            )?;
            let addr = hook.connect(|uri| PairingQr::new(uri).print()).await?;
            let kind = hook.kind().map(|k| k.to_string()).unwrap_or_default();
            println!("Connected {addr} ({kind}) on {}", cfg.network);
            Ok(())
        }
        Command::Disconnect => {
            match ctx.walletconnect_mut() {
                Some(hook) => hook.disconnect().await?,
                None => tracing::info!("WalletConnect is not configured; nothing to disconnect"),
            }
            println!("Disconnected");
            Ok(())
        }
        Command::Balance { address } => {
            let owner = owner_or_active(ctx, address.as_deref()).await?;
            let (trx, usdt) = tokio::try_join!(
                contract.trx_balance_sun(owner),
                contract.balance_of(owner)
            )?;
            println!("{owner}");
            println!("  TRX:  {}", ui::format_trx(trx));
            println!("  USDT: {}", ui::format_usdt(usdt));
            Ok(())
        }
        Command::Allowance { spender, owner } => {
            let spender = TronAddress::parse_text(&spender).context("parse spender")?;
            let owner = owner_or_active(ctx, owner.as_deref()).await?;
            let allowance = contract.allowance(owner, spender).await?;
            println!("{owner} -> {spender}: {}", ui::format_usdt(allowance));
            Ok(())
        }
        Command::Approve { spender, amount } => {
            let req = ApproveRequest::parse(&spender, &amount)?;
            let signer = ctx.signer().await?;
            println!(
                "Approving {} for {} from {} ({})",
                req.amount,
                req.spender,
                signer.address(),
                signer.kind()
            );
            let receipt =
                approve::approve(contract, signer.as_ref(), &req, cfg.approve, cfg.network).await?;
            print!("{}", ui::render_receipt(&receipt));
            Ok(())
        }
    }
}

async fn status(
    cfg: &AppConfig,
    ctx: &mut WalletContext,
    contract: &UsdtContract,
    spender: Option<TronAddress>,
) -> Result<()> {
    if let Some(hook) = ctx.walletconnect_mut() {
        hook.sync_events().await;
    }
    let active = ctx.active();
    let mut report = ui::StatusReport {
        network: cfg.network,
        usdt_contract: contract.address().to_string(),
        native_available: ctx.native().is_available(),
        walletconnect: ctx.walletconnect().map(|h| h.status().clone()),
        active,
        trx_balance_sun: None,
        usdt_balance: None,
        allowance: None,
    };

    if let Some(wallet) = active {
        let owner = wallet.address;
        match contract.trx_balance_sun(owner).await {
            Ok(sun) => report.trx_balance_sun = Some(sun),
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "TRX balance unavailable"),
        }
        match contract.balance_of(owner).await {
            Ok(v) => report.usdt_balance = Some(v),
            Err(e) => tracing::warn!(error = %format!("{e:#}"), "USDT balance unavailable"),
        }
        if let Some(spender) = spender {
            match contract.allowance(owner, spender).await {
                Ok(v) => report.allowance = Some((spender.to_string(), v)),
                Err(e) => tracing::warn!(error = %format!("{e:#}"), "allowance unavailable"),
            }
        }
    }

    print!("{}", ui::render_status(&report));
    Ok(())
}

async fn owner_or_active(ctx: &mut WalletContext, address: Option<&str>) -> Result<TronAddress> {
    if let Some(s) = address {
        return TronAddress::parse_text(s).context("parse address");
    }
    if let Some(hook) = ctx.walletconnect_mut() {
        hook.sync_events().await;
    }
    ctx.active()
        .map(|w| w.address)
        .context("no address given and no wallet is connected")
}

async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate()).context("install SIGTERM handler")?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
        Ok(())
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.context("ctrl-c")?;
        Ok(())
    }
}
