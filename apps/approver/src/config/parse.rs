use anyhow::{Context, Result};
use std::time::Duration;
use tron::TronAddress;

pub(super) fn parse_tron_address(label: &str, s: &str) -> Result<TronAddress> {
    TronAddress::parse_text(s.trim()).with_context(|| format!("invalid {label}: {s}"))
}

pub(super) fn parse_hex_32(label: &str, s: &str) -> Result<[u8; 32]> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).with_context(|| format!("invalid hex for {label}"))?;
    if bytes.len() != 32 {
        anyhow::bail!("{label} must be 32 bytes (got {})", bytes.len());
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

pub(super) fn parse_optional_hex_32(label: &str, s: &str) -> Result<Option<[u8; 32]>> {
    if s.trim().is_empty() {
        return Ok(None);
    }
    parse_hex_32(label, s).map(Some)
}

pub(super) fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(super) fn secs(label: &str, v: u64) -> Result<Duration> {
    if v == 0 {
        anyhow::bail!("{label} must be > 0");
    }
    Ok(Duration::from_secs(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_32_accepts_0x_and_rejects_wrong_len() {
        let ok = format!("0x{}", "11".repeat(32));
        assert_eq!(parse_hex_32("K", &ok).unwrap(), [0x11u8; 32]);

        let err = parse_hex_32("K", "0x11").unwrap_err().to_string();
        assert!(err.contains("must be 32 bytes"));
    }

    #[test]
    fn optional_hex_treats_blank_as_none() {
        assert!(parse_optional_hex_32("K", "  ").unwrap().is_none());
        assert!(parse_optional_hex_32("K", "zz").is_err());
    }

    #[test]
    fn parse_tron_address_reports_label() {
        let a = parse_tron_address("C", " TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t ").unwrap();
        assert_eq!(a.to_string(), "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t");

        let err = parse_tron_address("TRON_USDT_CONTRACT", "nope").unwrap_err().to_string();
        assert!(err.contains("invalid TRON_USDT_CONTRACT"));
    }

    #[test]
    fn secs_rejects_zero() {
        assert_eq!(secs("T", 5).unwrap(), Duration::from_secs(5));
        assert!(secs("T", 0).is_err());
    }
}
