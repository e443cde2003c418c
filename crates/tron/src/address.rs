use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Version byte prepended to every mainnet/testnet Tron account address.
pub const TRON_ADDRESS_PREFIX: u8 = 0x41;

/// A Tron account address: `0x41` followed by the 20-byte EVM address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TronAddress([u8; 21]);

impl TronAddress {
    pub fn from_evm(addr: Address) -> Self {
        let mut out = [0u8; 21];
        out[0] = TRON_ADDRESS_PREFIX;
        out[1..].copy_from_slice(addr.as_slice());
        Self(out)
    }

    pub fn from_prefixed_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 21 {
            anyhow::bail!("tron address must be 21 bytes (got {})", bytes.len());
        }
        if bytes[0] != TRON_ADDRESS_PREFIX {
            anyhow::bail!("tron address must start with 0x41 (got 0x{:02x})", bytes[0]);
        }
        let mut out = [0u8; 21];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Parses base58check (`T...`), `41`-prefixed hex or a plain 20-byte EVM hex address.
    pub fn parse_text(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            anyhow::bail!("empty tron address");
        }

        if s.starts_with('T') {
            let bytes = bs58::decode(s)
                .with_check(Some(TRON_ADDRESS_PREFIX))
                .into_vec()
                .with_context(|| format!("invalid base58check tron address: {s}"))?;
            return Self::from_prefixed_bytes(&bytes);
        }

        let hex_str = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(hex_str).with_context(|| format!("invalid hex address: {s}"))?;
        match bytes.len() {
            21 => Self::from_prefixed_bytes(&bytes),
            20 => Ok(Self::from_evm(Address::from_slice(&bytes))),
            n => anyhow::bail!("address must be 20 or 21 bytes (got {n})"),
        }
    }

    pub fn prefixed_bytes(&self) -> [u8; 21] {
        self.0
    }

    pub fn evm(&self) -> Address {
        Address::from_slice(&self.0[1..])
    }

    pub fn to_base58check(&self) -> String {
        bs58::encode(self.0).with_check().into_string()
    }

    /// `41`-prefixed lowercase hex, as used by node APIs with `visible=false`.
    pub fn to_hex41(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for TronAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58check())
    }
}

impl FromStr for TronAddress {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_text(s)
    }
}

impl Serialize for TronAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58check())
    }
}

impl<'de> Deserialize<'de> for TronAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_text(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mainnet USDT.
    const USDT_BASE58: &str = "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t";
    const USDT_HEX41: &str = "41a614f803b6fd780986a42c78ec9c7f77e6ded13c";

    #[test]
    fn base58_and_hex_forms_agree() {
        let a = TronAddress::parse_text(USDT_BASE58).unwrap();
        let b = TronAddress::parse_text(USDT_HEX41).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), USDT_BASE58);
        assert_eq!(a.to_hex41(), USDT_HEX41);
    }

    #[test]
    fn evm_hex_gets_tron_prefix() {
        let a = TronAddress::parse_text("0xa614f803b6fd780986a42c78ec9c7f77e6ded13c").unwrap();
        assert_eq!(a.to_string(), USDT_BASE58);
        assert_eq!(TronAddress::from_evm(a.evm()), a);
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut s = USDT_BASE58.to_string();
        s.pop();
        s.push('u');
        assert!(TronAddress::parse_text(&s).is_err());
    }

    #[test]
    fn rejects_wrong_prefix_and_length() {
        assert!(TronAddress::parse_text("42a614f803b6fd780986a42c78ec9c7f77e6ded13c").is_err());
        assert!(TronAddress::parse_text("0x1234").is_err());
        assert!(TronAddress::parse_text("   ").is_err());
    }

    #[test]
    fn serde_uses_base58check() {
        let a = TronAddress::parse_text(USDT_BASE58).unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, format!("\"{USDT_BASE58}\""));
        let back: TronAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}
