use alloy::primitives::{Address, U256, keccak256};
use anyhow::{Context, Result};

pub const SIG_APPROVE: &str = "approve(address,uint256)";
pub const SIG_BALANCE_OF: &str = "balanceOf(address)";
pub const SIG_ALLOWANCE: &str = "allowance(address,address)";
pub const SIG_DECIMALS: &str = "decimals()";
pub const SIG_SYMBOL: &str = "symbol()";

pub fn selector(sig: &str) -> [u8; 4] {
    let hash = keccak256(sig.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

pub fn encode_address(addr: Address) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[12..].copy_from_slice(addr.as_slice());
    out
}

pub fn encode_u256(v: U256) -> [u8; 32] {
    v.to_be_bytes()
}

/// ABI-encoded arguments of `approve(spender, amount)`, without the selector.
pub fn encode_approve_args(spender: Address, amount: U256) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(&encode_address(spender));
    out.extend_from_slice(&encode_u256(amount));
    out
}

pub fn encode_balance_of_args(owner: Address) -> Vec<u8> {
    encode_address(owner).to_vec()
}

pub fn encode_allowance_args(owner: Address, spender: Address) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(&encode_address(owner));
    out.extend_from_slice(&encode_address(spender));
    out
}

/// Full calldata (selector + args) for `approve`.
pub fn encode_trc20_approve(spender: Address, amount: U256) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + 64);
    out.extend_from_slice(&selector(SIG_APPROVE));
    out.extend_from_slice(&encode_approve_args(spender, amount));
    out
}

/// Decodes a single uint256 return word from a node's hex `constant_result`.
///
/// Nodes sometimes return an empty string for contracts without code, and some return fewer
/// than 32 bytes; both are tolerated. Extra leading bytes are ignored (last word wins).
pub fn decode_uint256_hex(s: &str) -> Result<U256> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(U256::ZERO);
    }
    let padded;
    let s = if s.len() % 2 == 1 {
        padded = format!("0{s}");
        padded.as_str()
    } else {
        s
    };
    let bytes = hex::decode(s).with_context(|| format!("invalid uint256 hex: {s}"))?;

    let mut buf = [0u8; 32];
    if bytes.len() >= 32 {
        buf.copy_from_slice(&bytes[bytes.len() - 32..]);
    } else {
        buf[32 - bytes.len()..].copy_from_slice(&bytes);
    }
    Ok(U256::from_be_bytes(buf))
}

/// Decodes an ABI `string` return value (offset, length, bytes).
pub fn decode_string_hex(s: &str) -> Result<String> {
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).with_context(|| format!("invalid string hex: {s}"))?;
    if bytes.len() < 64 {
        anyhow::bail!("string return too short ({} bytes)", bytes.len());
    }

    let offset = word_to_usize(&bytes[..32]).context("string offset")?;
    let len_end = offset.checked_add(32).context("string offset overflow")?;
    let len_word = bytes.get(offset..len_end).context("string length out of range")?;
    let len = word_to_usize(len_word).context("string length")?;
    let data_end = len_end.checked_add(len).context("string length overflow")?;
    let data = bytes.get(len_end..data_end).context("string data out of range")?;
    String::from_utf8(data.to_vec()).context("string is not utf-8")
}

fn word_to_usize(word: &[u8]) -> Result<usize> {
    let v = U256::from_be_slice(word);
    let v = u64::try_from(v).context("word does not fit u64")?;
    usize::try_from(v).context("word does not fit usize")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approve_selector_matches_erc20() {
        assert_eq!(selector(SIG_APPROVE), [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(selector(SIG_BALANCE_OF), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(selector(SIG_ALLOWANCE), [0xdd, 0x62, 0xed, 0x3e]);
    }

    #[test]
    fn encode_trc20_approve_layout() {
        let spender: Address = "0x00000000000000000000000000000000000000aa"
            .parse()
            .unwrap();
        let data = encode_trc20_approve(spender, U256::from(1234u64));

        assert_eq!(data.len(), 4 + 32 + 32);
        assert_eq!(&data[..4], &selector(SIG_APPROVE));
        assert_eq!(&data[4..4 + 12], &[0u8; 12]);
        assert_eq!(&data[4 + 12..4 + 32], spender.as_slice());
        assert_eq!(data[4 + 32 + 30], 0x04);
        assert_eq!(data[4 + 32 + 31], 0xD2);
    }

    #[test]
    fn unlimited_approve_is_all_ones() {
        let spender = Address::ZERO;
        let args = encode_approve_args(spender, U256::MAX);
        assert!(args[32..].iter().all(|b| *b == 0xff));
    }

    #[test]
    fn decode_uint256_hex_handles_node_quirks() {
        assert_eq!(decode_uint256_hex("").unwrap(), U256::ZERO);
        assert_eq!(decode_uint256_hex("0x").unwrap(), U256::ZERO);
        assert_eq!(decode_uint256_hex("f4240").unwrap(), U256::from(1_000_000u64));
        let word = format!("{:064x}", 42u64);
        assert_eq!(decode_uint256_hex(&word).unwrap(), U256::from(42u64));
        let two_words = format!("{:064x}{:064x}", 7u64, 9u64);
        assert_eq!(decode_uint256_hex(&two_words).unwrap(), U256::from(9u64));
        assert!(decode_uint256_hex("zz").is_err());
    }

    #[test]
    fn decode_string_hex_reads_symbol() {
        let hex_str = concat!(
            "0000000000000000000000000000000000000000000000000000000000000020",
            "0000000000000000000000000000000000000000000000000000000000000004",
            "5553445400000000000000000000000000000000000000000000000000000000"
        );
        assert_eq!(decode_string_hex(hex_str).unwrap(), "USDT");
        assert!(decode_string_hex("00").is_err());
    }
}
