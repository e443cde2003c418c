use super::{NativeProvider, TxSigner, WalletConnectHook, WalletKind};
use anyhow::Result;
use std::fmt;
use tron::TronAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletSource {
    Native,
    WalletConnect,
}

impl fmt::Display for WalletSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::WalletConnect => f.write_str("walletconnect"),
        }
    }
}

/// The wallet operations are performed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWallet {
    pub address: TronAddress,
    pub kind: WalletKind,
    pub source: WalletSource,
}

/// Merges the native provider and the WalletConnect hook into one view.
pub struct WalletContext {
    native: NativeProvider,
    walletconnect: Option<WalletConnectHook>,
}

impl WalletContext {
    pub fn new(native: NativeProvider, walletconnect: Option<WalletConnectHook>) -> Self {
        Self {
            native,
            walletconnect,
        }
    }

    pub fn native(&self) -> &NativeProvider {
        &self.native
    }

    pub fn walletconnect(&self) -> Option<&WalletConnectHook> {
        self.walletconnect.as_ref()
    }

    pub fn walletconnect_mut(&mut self) -> Option<&mut WalletConnectHook> {
        self.walletconnect.as_mut()
    }

    pub fn active(&self) -> Option<ActiveWallet> {
        let wc = self
            .walletconnect
            .as_ref()
            .and_then(|h| Some((h.address()?, h.kind()?)));
        resolve_active(self.native.address(), wc)
    }

    /// Signer for [`Self::active`].
    pub async fn signer(&mut self) -> Result<Box<dyn TxSigner>> {
        if let Some(hook) = self.walletconnect.as_mut() {
            hook.sync_events().await;
            if hook.address().is_some() {
                return Ok(Box::new(hook.signer().await?));
            }
        }
        match self.native.wallet() {
            Some(wallet) => Ok(Box::new(wallet.clone())),
            None => anyhow::bail!(
                "no wallet available: set TRON_PRIVATE_KEY_HEX or pair one with `approver connect`"
            ),
        }
    }
}

/// A connected WalletConnect session wins over the native provider.
fn resolve_active(
    native: Option<TronAddress>,
    walletconnect: Option<(TronAddress, WalletKind)>,
) -> Option<ActiveWallet> {
    if let Some((address, kind)) = walletconnect {
        return Some(ActiveWallet {
            address,
            kind,
            source: WalletSource::WalletConnect,
        });
    }
    native.map(|address| ActiveWallet {
        address,
        kind: WalletKind::Local,
        source: WalletSource::Native,
    })
}
