use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(super) struct Env {
    /// `mainnet`, `nile` or `shasta`.
    pub tron_network: String,

    /// Overrides the network's public full node.
    pub tron_api_url: String,

    pub tron_api_key: Option<String>,

    pub tron_http_timeout_secs: u64,

    /// Local signer key. Leave empty to rely on WalletConnect only.
    pub tron_private_key_hex: String,

    /// Overrides the network's USDT contract.
    pub tron_usdt_contract: String,

    pub tron_fee_limit_cap_sun: u64,

    pub tron_fee_limit_headroom_ppm: u64,

    pub wc_project_id: String,

    pub wc_relay_url: String,

    pub wc_session_file: String,

    pub wc_connect_timeout_secs: u64,

    pub wc_request_timeout_secs: u64,

    pub approve_poll_interval_secs: u64,

    pub approve_max_polls: u32,
}

impl Default for Env {
    fn default() -> Self {
        Self {
            tron_network: "mainnet".to_string(),
            tron_api_url: String::new(),
            tron_api_key: None,
            tron_http_timeout_secs: 15,
            tron_private_key_hex: String::new(),
            tron_usdt_contract: String::new(),
            tron_fee_limit_cap_sun: 100_000_000,
            tron_fee_limit_headroom_ppm: 200_000,
            wc_project_id: String::new(),
            wc_relay_url: walletconnect::relay::DEFAULT_RELAY_URL.to_string(),
            wc_session_file: ".walletconnect-session.json".to_string(),
            wc_connect_timeout_secs: 300,
            wc_request_timeout_secs: 300,
            approve_poll_interval_secs: 3,
            approve_max_polls: 20,
        }
    }
}
