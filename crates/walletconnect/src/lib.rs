//! Minimal WalletConnect v2 sign client for dapps.
//!
//! Pairs with a wallet over the `irn` relay, settles a session and forwards signing
//! requests. Relay auth and the websocket come from `relay_rpc` and `relay_client`;
//! only the dapp (proposer) side of the sign protocol is implemented here.

pub mod auth;
pub mod client;
pub mod crypto;
pub mod error;
pub mod pairing;
pub mod relay;
pub mod rpc;
pub mod session;
pub mod transport;

pub use client::{SessionApproval, SignClient};
pub use error::{Error, Result};
pub use pairing::PairingUri;
pub use relay::{RelayConfig, RelayTransport};
pub use relay_rpc::domain::Topic;
pub use session::{Metadata, ProposalNamespace, ProposalNamespaces, Session, SessionEvent};
pub use transport::{MemoryRelay, Transport};

use std::time::{SystemTime, UNIX_EPOCH};

pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

pub(crate) fn now_secs() -> u64 {
    now_millis() / 1000
}
