use crate::abi::{
    self, SIG_ALLOWANCE, SIG_APPROVE, SIG_BALANCE_OF, SIG_DECIMALS, SIG_SYMBOL,
    decode_string_hex, decode_uint256_hex,
};
use crate::http::TronHttp;
use crate::resources::FeePolicy;
use crate::sender::PreparedTrigger;
use crate::TronAddress;
use alloy::primitives::U256;
use anyhow::{Context, Result};

/// A TRC20 token contract reached through a full node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trc20Token {
    pub contract: TronAddress,
}

impl Trc20Token {
    pub fn new(contract: TronAddress) -> Self {
        Self { contract }
    }

    async fn call_uint(
        &self,
        http: &TronHttp,
        caller: TronAddress,
        selector: &str,
        args: &[u8],
    ) -> Result<U256> {
        let res = http
            .trigger_constant_contract(caller, self.contract, selector, args)
            .await?;
        match res.constant_result.first() {
            Some(word) => decode_uint256_hex(word).with_context(|| format!("decode {selector}")),
            None => Ok(U256::ZERO),
        }
    }

    pub async fn balance_of(&self, http: &TronHttp, owner: TronAddress) -> Result<U256> {
        self.call_uint(http, owner, SIG_BALANCE_OF, &abi::encode_balance_of_args(owner.evm()))
            .await
    }

    pub async fn allowance(
        &self,
        http: &TronHttp,
        owner: TronAddress,
        spender: TronAddress,
    ) -> Result<U256> {
        self.call_uint(
            http,
            owner,
            SIG_ALLOWANCE,
            &abi::encode_allowance_args(owner.evm(), spender.evm()),
        )
        .await
    }

    pub async fn decimals(&self, http: &TronHttp, caller: TronAddress) -> Result<u8> {
        let v = self.call_uint(http, caller, SIG_DECIMALS, &[]).await?;
        u8::try_from(v).context("decimals out of range")
    }

    pub async fn symbol(&self, http: &TronHttp, caller: TronAddress) -> Result<String> {
        let res = http
            .trigger_constant_contract(caller, self.contract, SIG_SYMBOL, &[])
            .await?;
        let word = res.constant_result.first().context("symbol() returned nothing")?;
        decode_string_hex(word)
    }

    /// Builds (but does not sign) `approve(spender, amount)` from `owner`.
    pub async fn build_approve(
        &self,
        http: &TronHttp,
        owner: TronAddress,
        spender: TronAddress,
        amount: U256,
        fee_policy: FeePolicy,
    ) -> Result<PreparedTrigger> {
        http.build_trigger_smart_contract(
            owner,
            self.contract,
            SIG_APPROVE,
            &abi::encode_approve_args(spender.evm(), amount),
            0,
            fee_policy,
        )
        .await
        .context("build approve tx")
    }
}
