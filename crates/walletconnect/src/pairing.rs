//! `wc:` pairing URIs.

use crate::crypto::SymKey;
use crate::error::{Error, Result};
use relay_rpc::domain::Topic;
use std::fmt;
use std::str::FromStr;
use url::Url;

pub const RELAY_PROTOCOL_IRN: &str = "irn";
/// Pairings stay valid for five minutes unless the wallet answers.
pub const PAIRING_TTL_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingUri {
    pub topic: Topic,
    pub sym_key: SymKey,
    pub relay_protocol: String,
    pub expiry: Option<u64>,
}

impl PairingUri {
    pub fn new(sym_key: SymKey, now_secs: u64) -> Self {
        Self {
            topic: sym_key.topic(),
            sym_key,
            relay_protocol: RELAY_PROTOCOL_IRN.to_string(),
            expiry: Some(now_secs + PAIRING_TTL_SECS),
        }
    }
}

impl fmt::Display for PairingUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "wc:{}@2?relay-protocol={}&symKey={}",
            self.topic,
            self.relay_protocol,
            self.sym_key.to_hex()
        )?;
        if let Some(expiry) = self.expiry {
            write!(f, "&expiryTimestamp={expiry}")?;
        }
        Ok(())
    }
}

impl FromStr for PairingUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let url = Url::parse(s.trim())?;
        if url.scheme() != "wc" {
            return Err(Error::InvalidUri(format!("unexpected scheme {}", url.scheme())));
        }
        let (topic, version) = url
            .path()
            .split_once('@')
            .ok_or_else(|| Error::InvalidUri("missing @version".to_string()))?;
        if version != "2" {
            return Err(Error::InvalidUri(format!("unsupported version {version}")));
        }

        let mut relay_protocol = None;
        let mut sym_key = None;
        let mut expiry = None;
        for (k, v) in url.query_pairs() {
            match k.as_ref() {
                "relay-protocol" => relay_protocol = Some(v.into_owned()),
                "symKey" => sym_key = Some(SymKey::from_hex(&v)?),
                "expiryTimestamp" => {
                    expiry = Some(
                        v.parse::<u64>()
                            .map_err(|e| Error::InvalidUri(format!("invalid expiryTimestamp: {e}")))?,
                    )
                }
                _ => {}
            }
        }

        let sym_key = sym_key.ok_or_else(|| Error::InvalidUri("missing symKey".to_string()))?;
        let topic = Topic::from(topic.to_string());
        if sym_key.topic() != topic {
            return Err(Error::InvalidUri("topic does not match symKey".to_string()));
        }
        Ok(Self {
            topic,
            sym_key,
            relay_protocol: relay_protocol
                .ok_or_else(|| Error::InvalidUri("missing relay-protocol".to_string()))?,
            expiry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_roundtrips_through_text() {
        let uri = PairingUri::new(SymKey::from_bytes([7u8; 32]), 1_700_000_000);
        let text = uri.to_string();
        assert!(text.starts_with(&format!("wc:{}@2?relay-protocol=irn&symKey=", uri.topic)));
        assert!(text.ends_with("&expiryTimestamp=1700000300"));
        assert_eq!(text.parse::<PairingUri>().unwrap(), uri);
    }

    #[test]
    fn rejects_topic_key_mismatch() {
        let key = SymKey::from_bytes([1u8; 32]);
        let text = format!(
            "wc:{}@2?relay-protocol=irn&symKey={}",
            "00".repeat(32),
            key.to_hex()
        );
        assert!(text.parse::<PairingUri>().is_err());
    }

    #[test]
    fn rejects_v1_and_missing_key() {
        let key = SymKey::from_bytes([1u8; 32]);
        let v1 = format!("wc:{}@1?bridge=x&key={}", key.topic(), key.to_hex());
        assert!(v1.parse::<PairingUri>().is_err());
        let no_key = format!("wc:{}@2?relay-protocol=irn", key.topic());
        assert!(no_key.parse::<PairingUri>().is_err());
    }
}
