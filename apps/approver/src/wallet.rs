//! Wallet sources (native key, WalletConnect) and the context that merges them.

mod connect;
mod context;
mod detect;
mod native;
mod session_store;

pub use connect::{HookStatus, SessionRequester, WalletConnectHook, sign_with_fallback};
pub use context::{ActiveWallet, WalletContext, WalletSource};
pub use detect::WalletKind;
pub use native::NativeProvider;

use anyhow::Result;
use async_trait::async_trait;
use tron::{Transaction, TronAddress};

/// What a wallet handed back for a transaction it was asked to sign.
#[derive(Debug, Clone, PartialEq)]
pub enum SignOutcome {
    /// Signed locally or by the wallet; the caller still has to broadcast it.
    Signed(Transaction),
    /// The wallet broadcast the transaction itself.
    Broadcast { txid: [u8; 32] },
}

#[async_trait]
pub trait TxSigner: Send + Sync {
    fn address(&self) -> TronAddress;

    fn kind(&self) -> WalletKind;

    async fn sign(&self, tx: &Transaction) -> Result<SignOutcome>;
}
