use crate::network::TronNetwork;
use std::path::PathBuf;
use std::time::Duration;
use tron::{FeePolicy, TronAddress};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub network: TronNetwork,
    pub tron: TronConfig,
    pub walletconnect: Option<WalletConnectConfig>,
    pub approve: ApproveConfig,
}

#[derive(Clone)]
pub struct TronConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub usdt_contract: TronAddress,
    pub private_key: Option<[u8; 32]>,
    pub fee_policy: FeePolicy,
}

impl std::fmt::Debug for TronConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TronConfig")
            .field("api_url", &self.api_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("usdt_contract", &self.usdt_contract)
            .field("private_key", &self.private_key.map(|_| "<redacted>"))
            .field("fee_policy", &self.fee_policy)
            .finish()
    }
}

/// Present only when `WC_PROJECT_ID` is set.
#[derive(Debug, Clone)]
pub struct WalletConnectConfig {
    pub project_id: String,
    pub relay_url: String,
    pub session_file: PathBuf,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct ApproveConfig {
    pub poll_interval: Duration,
    pub max_polls: u32,
}
