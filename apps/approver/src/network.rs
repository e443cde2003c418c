//! Tron networks the client can target.

use anyhow::Result;
use std::fmt;

/// USDT on every supported network uses 6 decimals.
pub const USDT_DECIMALS: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum TronNetwork {
    Mainnet,
    Nile,
    Shasta,
}

impl TronNetwork {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "mainnet" => Ok(Self::Mainnet),
            "nile" => Ok(Self::Nile),
            "shasta" => Ok(Self::Shasta),
            other => anyhow::bail!("unsupported TRON_NETWORK: {other} (expected: mainnet|nile|shasta)"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Nile => "nile",
            Self::Shasta => "shasta",
        }
    }

    pub fn full_node_url(self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.trongrid.io",
            Self::Nile => "https://nile.trongrid.io",
            Self::Shasta => "https://api.shasta.trongrid.io",
        }
    }

    pub fn usdt_contract(self) -> &'static str {
        match self {
            Self::Mainnet => "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t",
            Self::Nile => "TNUC9Qb1rRpS5CbWLmNMxXBjyFoydXjWFR",
            Self::Shasta => "TG3XXyExBkPp9nzdajDZsozEu4BkaSJozs",
        }
    }

    /// CAIP-2 chain id used in WalletConnect namespaces (genesis block hash suffix).
    pub fn chain_id(self) -> &'static str {
        match self {
            Self::Mainnet => "tron:0x2b6653dc",
            Self::Nile => "tron:0xcd8690dc",
            Self::Shasta => "tron:0x94a9059e",
        }
    }

    pub fn explorer_tx_url(self, txid: &str) -> String {
        let host = match self {
            Self::Mainnet => "https://tronscan.org",
            Self::Nile => "https://nile.tronscan.org",
            Self::Shasta => "https://shasta.tronscan.org",
        };
        format!("{host}/#/transaction/{txid}")
    }

    pub fn is_testnet(self) -> bool {
        self != Self::Mainnet
    }
}

impl fmt::Display for TronNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tron::TronAddress;

    #[test]
    fn parse_defaults_to_mainnet_and_rejects_unknown() {
        assert_eq!(TronNetwork::parse("").unwrap(), TronNetwork::Mainnet);
        assert_eq!(TronNetwork::parse(" NILE ").unwrap(), TronNetwork::Nile);
        assert_eq!(TronNetwork::parse("shasta").unwrap(), TronNetwork::Shasta);

        let err = TronNetwork::parse("ropsten").unwrap_err().to_string();
        assert!(err.contains("unsupported TRON_NETWORK"));
    }

    #[test]
    fn usdt_contracts_are_valid_addresses() {
        for net in [TronNetwork::Mainnet, TronNetwork::Nile, TronNetwork::Shasta] {
            let addr = TronAddress::parse_text(net.usdt_contract()).unwrap();
            assert_eq!(addr.to_string(), net.usdt_contract());
        }
    }

    #[test]
    fn chain_ids_are_distinct() {
        assert_ne!(TronNetwork::Nile.chain_id(), TronNetwork::Shasta.chain_id());
        assert!(TronNetwork::Mainnet.chain_id().starts_with("tron:0x"));
    }
}
