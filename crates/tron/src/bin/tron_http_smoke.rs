use anyhow::{Context, Result};
use std::time::Duration;
use tron::{TronAddress, TronHttp, TronWallet, Trc20Token};

fn decode_hex32(s: &str) -> Result<[u8; 32]> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).context("invalid hex")?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("expected 32-byte hex, got {}", b.len()))
}

/// Read-only check against a node: account balance, token balance and an allowance.
fn main() -> Result<()> {
    let api_url = std::env::var("TRON_API_URL").context("missing TRON_API_URL")?;
    let token = std::env::var("TRON_USDT_CONTRACT").context("missing TRON_USDT_CONTRACT")?;
    let pk = std::env::var("TRON_PRIVATE_KEY_HEX").context("missing TRON_PRIVATE_KEY_HEX")?;
    let spender = std::env::var("TRON_SPENDER").ok();

    let wallet = TronWallet::new(decode_hex32(&pk)?).context("TronWallet::new")?;
    let token = Trc20Token::new(TronAddress::parse_text(&token).context("parse TRON_USDT_CONTRACT")?);

    let rt = tokio::runtime::Runtime::new().context("tokio runtime")?;
    rt.block_on(async move {
        let http = TronHttp::new(
            &api_url,
            std::env::var("TRON_API_KEY").ok().as_deref(),
            Duration::from_secs(15),
        )?;

        let addr = wallet.address();
        let account = http.get_account(addr).await.context("get_account")?;
        println!("wallet: {addr} balance_sun={}", account.balance);

        let symbol = token.symbol(&http, addr).await.unwrap_or_else(|_| "?".to_string());
        let decimals = token.decimals(&http, addr).await.context("decimals")?;
        let balance = token.balance_of(&http, addr).await.context("balanceOf")?;
        println!("token: {} symbol={symbol} decimals={decimals} balance={balance}", token.contract);

        if let Some(s) = spender {
            let spender = TronAddress::parse_text(&s).context("parse TRON_SPENDER")?;
            let allowance = token.allowance(&http, addr, spender).await.context("allowance")?;
            println!("allowance: spender={spender} amount={allowance}");
        }

        Ok::<_, anyhow::Error>(())
    })?;

    Ok(())
}
