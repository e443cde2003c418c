use crate::TronAddress;
use crate::transaction::Transaction;
use alloy::primitives::{Address, keccak256};
use anyhow::{Context, Result};
use k256::ecdsa::SigningKey;

/// A locally held secp256k1 key that signs Tron transactions.
#[derive(Clone)]
pub struct TronWallet {
    pub(crate) key: SigningKey,
    pub(crate) address: TronAddress,
}

impl std::fmt::Debug for TronWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TronWallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl TronWallet {
    pub fn new(private_key: [u8; 32]) -> Result<Self> {
        let key = SigningKey::from_slice(&private_key).context("invalid secp256k1 private key")?;
        let address = address_from_key(&key);
        Ok(Self { key, address })
    }

    pub fn address(&self) -> TronAddress {
        self.address
    }

    /// Signs a 32-byte txid, returning `r || s || v` with `v = recid + 27`.
    pub fn sign_txid(&self, txid: &[u8; 32]) -> Result<[u8; 65]> {
        let (sig, recid) = self
            .key
            .sign_prehash_recoverable(txid)
            .context("sign Tron tx")?;
        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&sig.to_bytes());
        out[64] = recid.to_byte() + 27;
        Ok(out)
    }

    /// Verifies the node-built txID against `raw_data_hex` and appends this wallet's signature.
    pub fn sign_transaction(&self, mut tx: Transaction) -> Result<Transaction> {
        let txid = tx.verify_txid()?;
        let sig = self.sign_txid(&txid)?;
        tx.signature.push(hex::encode(sig));
        Ok(tx)
    }
}

fn address_from_key(key: &SigningKey) -> TronAddress {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    TronAddress::from_evm(Address::from_slice(&hash[12..]))
}
