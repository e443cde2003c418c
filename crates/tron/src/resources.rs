use crate::http::ChainParameters;
use anyhow::{Context, Result};

/// Key names returned by `getchainparameters`.
///
/// Tron nodes expose a list of (key,value) params. We only consume the fee-related ones.
pub const CHAIN_PARAM_ENERGY_FEE: &str = "getEnergyFee";
pub const CHAIN_PARAM_TX_FEE_PER_BYTE: &str = "getTransactionFee";

/// Energy assumed for a state-changing call when the node's estimate comes back as zero.
pub const FALLBACK_ENERGY_REQUIRED: u64 = 50_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainFees {
    /// Sun per energy unit.
    pub energy_fee_sun_per_energy: u64,
    /// Sun per bandwidth byte.
    pub tx_fee_sun_per_byte: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeePolicy {
    /// Cap (sun) applied after headroom.
    pub fee_limit_cap_sun: u64,
    /// Extra headroom applied as parts-per-million.
    pub fee_limit_headroom_ppm: u64,
}

impl FeePolicy {
    pub fn apply(&self, base: u64) -> u64 {
        let headroom = base.saturating_mul(self.fee_limit_headroom_ppm.min(1_000_000)) / 1_000_000;
        base.saturating_add(headroom).min(self.fee_limit_cap_sun)
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self {
            // 100 TRX, the common wallet default for token calls.
            fee_limit_cap_sun: 100_000_000,
            fee_limit_headroom_ppm: 200_000,
        }
    }
}

/// Picks the fee parameters out of `getchainparameters`; both must be present.
pub fn parse_chain_fees(params: &ChainParameters) -> Result<ChainFees> {
    Ok(ChainFees {
        energy_fee_sun_per_energy: chain_param(params, CHAIN_PARAM_ENERGY_FEE)?,
        tx_fee_sun_per_byte: chain_param(params, CHAIN_PARAM_TX_FEE_PER_BYTE)?,
    })
}

fn chain_param(params: &ChainParameters, key: &str) -> Result<u64> {
    let p = params
        .chain_parameter
        .iter()
        .find(|p| p.key == key)
        .with_context(|| format!("missing chain parameter {key}"))?;
    u64::try_from(p.value).with_context(|| format!("chain parameter {key} is negative"))
}

/// Worst-case fee: `energy_required * energy_fee + tx_size_bytes * tx_fee_per_byte`.
pub fn quote_fee_limit_sun(energy_required: u64, tx_size_bytes: u64, fees: ChainFees) -> u64 {
    energy_required
        .saturating_mul(fees.energy_fee_sun_per_energy)
        .saturating_add(tx_size_bytes.saturating_mul(fees.tx_fee_sun_per_byte))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(v: serde_json::Value) -> ChainParameters {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn chain_fees_come_from_node_parameters() {
        let p = params(json!({"chainParameter": [
            {"key": "getMaintenanceTimeInterval", "value": 21_600_000},
            {"key": "getTransactionFee", "value": 1000},
            {"key": "getEnergyFee", "value": 210}
        ]}));
        assert_eq!(
            parse_chain_fees(&p).unwrap(),
            ChainFees {
                energy_fee_sun_per_energy: 210,
                tx_fee_sun_per_byte: 1000
            }
        );
    }

    #[test]
    fn missing_or_negative_fee_parameter_is_an_error() {
        let missing = params(json!({"chainParameter": [{"key": "getEnergyFee", "value": 210}]}));
        let err = parse_chain_fees(&missing).unwrap_err().to_string();
        assert!(err.contains("getTransactionFee"), "{err}");

        let negative = params(json!({"chainParameter": [
            {"key": "getEnergyFee", "value": -1},
            {"key": "getTransactionFee", "value": 1000}
        ]}));
        assert!(parse_chain_fees(&negative).is_err());
    }

    #[test]
    fn usdt_approve_quote_at_mainnet_prices() {
        let fees = ChainFees {
            energy_fee_sun_per_energy: 210,
            tx_fee_sun_per_byte: 1000,
        };
        // ~14.6k energy and ~345 bytes for a first-time approve.
        let quote = quote_fee_limit_sun(14_650, 345, fees);
        assert_eq!(quote, 14_650 * 210 + 345 * 1000);
        assert_eq!(FeePolicy::default().apply(quote), quote + quote / 5);
    }

    #[test]
    fn fee_policy_caps_after_headroom() {
        let policy = FeePolicy {
            fee_limit_cap_sun: 1_000,
            fee_limit_headroom_ppm: 100_000,
        };
        assert_eq!(policy.apply(500), 550);
        assert_eq!(policy.apply(950), 1_000);
        assert_eq!(policy.apply(u64::MAX), 1_000);
        assert_eq!(FeePolicy::default().apply(u64::MAX), 100_000_000);
    }
}
