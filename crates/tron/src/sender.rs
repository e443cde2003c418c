use super::http::{BroadcastResult, TronHttp};
use super::resources::{FALLBACK_ENERGY_REQUIRED, FeePolicy, parse_chain_fees, quote_fee_limit_sun};
use super::transaction::Transaction;
use super::{TronAddress, TronWallet};
use anyhow::{Context, Result};

/// An unsigned node-built TriggerSmartContract tx plus the numbers its fee limit came from.
#[derive(Debug, Clone)]
pub struct PreparedTrigger {
    pub tx: Transaction,
    pub fee_limit_sun: u64,
    pub energy_required: u64,
    pub tx_size_bytes: u64,
}

impl TronHttp {
    /// Builds an unsigned TriggerSmartContract tx with a fee limit derived from chain parameters.
    ///
    /// The fee limit is `energy_required * getEnergyFee + tx_size_bytes * getTransactionFee`,
    /// plus policy headroom and cap. The tx is built twice when the first size guess changes the
    /// quote, since `fee_limit` is itself part of `raw_data`.
    pub async fn build_trigger_smart_contract(
        &self,
        owner: TronAddress,
        contract: TronAddress,
        function_selector: &str,
        parameter: &[u8],
        call_value_sun: u64,
        fee_policy: FeePolicy,
    ) -> Result<PreparedTrigger> {
        let chain_params = self.get_chain_parameters().await?;
        let fees = parse_chain_fees(&chain_params)?;

        let estimate = self
            .trigger_constant_contract(owner, contract, function_selector, parameter)
            .await
            .with_context(|| format!("estimate energy for {function_selector}"))?;
        let mut energy_required = estimate.energy_used;
        // Some private Tron networks report zero energy even for state-changing calls.
        if energy_required == 0 {
            energy_required = FALLBACK_ENERGY_REQUIRED;
        }

        let tx0 = self
            .trigger_smart_contract(
                owner,
                contract,
                function_selector,
                parameter,
                fee_policy.fee_limit_cap_sun,
                call_value_sun,
            )
            .await
            .context("trigger_smart_contract")?;
        let size0 = tx0.estimated_size_bytes();
        let fee_limit = fee_policy.apply(quote_fee_limit_sun(energy_required, size0, fees));

        let (tx, size) = if tx0.fee_limit_sun() == Some(fee_limit) {
            (tx0, size0)
        } else {
            let tx1 = self
                .trigger_smart_contract(
                    owner,
                    contract,
                    function_selector,
                    parameter,
                    fee_limit,
                    call_value_sun,
                )
                .await
                .context("trigger_smart_contract")?;
            let size1 = tx1.estimated_size_bytes();
            (tx1, size1)
        };

        tx.verify_txid().context("node built an inconsistent transaction")?;

        tracing::debug!(
            function_selector,
            energy_required,
            fee_limit_sun = fee_limit,
            tx_size_bytes = size,
            "prepared trigger tx"
        );

        Ok(PreparedTrigger {
            tx,
            fee_limit_sun: fee_limit,
            energy_required,
            tx_size_bytes: size,
        })
    }

    /// Broadcasts a signed tx and maps a node rejection to an error with the decoded reason.
    pub async fn broadcast_signed(&self, tx: &Transaction) -> Result<[u8; 32]> {
        let res: BroadcastResult = self.broadcast_transaction(tx).await?;
        if !res.result {
            anyhow::bail!(
                "broadcast rejected: code={} msg={}",
                res.code.as_deref().unwrap_or("<missing>"),
                res.decoded_message().unwrap_or_else(|| "<missing>".to_string())
            );
        }
        tx.txid()
    }
}

impl TronWallet {
    /// Signs a node-built tx locally and broadcasts it.
    pub async fn sign_and_broadcast(&self, http: &TronHttp, tx: Transaction) -> Result<[u8; 32]> {
        let signed = self.sign_transaction(tx)?;
        http.broadcast_signed(&signed).await
    }
}
