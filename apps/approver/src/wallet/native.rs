use super::{SignOutcome, TxSigner, WalletKind};
use anyhow::{Context, Result};
use async_trait::async_trait;
use tron::{Transaction, TronAddress, TronWallet};

/// The in-process signer, available when a private key is configured.
#[derive(Debug, Default)]
pub struct NativeProvider {
    wallet: Option<TronWallet>,
}

impl NativeProvider {
    pub fn detect(private_key: Option<[u8; 32]>) -> Result<Self> {
        let wallet = private_key
            .map(TronWallet::new)
            .transpose()
            .context("load TRON_PRIVATE_KEY_HEX")?;
        if let Some(w) = &wallet {
            tracing::debug!(address = %w.address(), "native provider available");
        }
        Ok(Self { wallet })
    }

    pub fn is_available(&self) -> bool {
        self.wallet.is_some()
    }

    pub fn address(&self) -> Option<TronAddress> {
        self.wallet.as_ref().map(TronWallet::address)
    }

    pub fn wallet(&self) -> Option<&TronWallet> {
        self.wallet.as_ref()
    }
}

#[async_trait]
impl TxSigner for TronWallet {
    fn address(&self) -> TronAddress {
        TronWallet::address(self)
    }

    fn kind(&self) -> WalletKind {
        WalletKind::Local
    }

    async fn sign(&self, tx: &Transaction) -> Result<SignOutcome> {
        let signed = self.sign_transaction(tx.clone())?;
        Ok(SignOutcome::Signed(signed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u8) -> [u8; 32] {
        let mut k = [0u8; 32];
        k[31] = n;
        k
    }

    #[test]
    fn unavailable_without_key() {
        let p = NativeProvider::detect(None).unwrap();
        assert!(!p.is_available());
        assert!(p.address().is_none());
    }

    #[test]
    fn exposes_address_of_configured_key() {
        let p = NativeProvider::detect(Some(key(1))).unwrap();
        assert!(p.is_available());
        let expected = TronWallet::new(key(1)).unwrap().address();
        assert_eq!(p.address(), Some(expected));
    }

    #[test]
    fn rejects_zero_key() {
        assert!(NativeProvider::detect(Some([0u8; 32])).is_err());
    }
}
