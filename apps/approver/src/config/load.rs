use super::env::Env;
use super::parse::{non_empty, parse_optional_hex_32, parse_tron_address, secs};
use super::{AppConfig, ApproveConfig, TronConfig, WalletConnectConfig};
use crate::network::TronNetwork;
use anyhow::{Context, Result};
use std::path::PathBuf;
use tron::FeePolicy;

pub(super) fn load_config(network_override: Option<TronNetwork>) -> Result<AppConfig> {
    let env: Env = envy::from_env().context("load approver env config")?;
    from_env(env, network_override)
}

fn from_env(env: Env, network_override: Option<TronNetwork>) -> Result<AppConfig> {
    let network = match network_override {
        Some(n) => n,
        None => TronNetwork::parse(&env.tron_network)?,
    };

    let api_url = non_empty(&env.tron_api_url)
        .unwrap_or_else(|| network.full_node_url().to_string())
        .trim_end_matches('/')
        .to_string();

    let usdt_contract = match non_empty(&env.tron_usdt_contract) {
        Some(s) => parse_tron_address("TRON_USDT_CONTRACT", &s)?,
        None => parse_tron_address("USDT contract", network.usdt_contract())?,
    };

    if env.tron_fee_limit_headroom_ppm > 1_000_000 {
        anyhow::bail!("TRON_FEE_LIMIT_HEADROOM_PPM must be <= 1000000");
    }
    if env.tron_fee_limit_cap_sun == 0 {
        anyhow::bail!("TRON_FEE_LIMIT_CAP_SUN must be > 0");
    }

    let tron = TronConfig {
        api_url,
        api_key: env.tron_api_key.as_deref().and_then(non_empty),
        timeout: secs("TRON_HTTP_TIMEOUT_SECS", env.tron_http_timeout_secs)?,
        usdt_contract,
        private_key: parse_optional_hex_32("TRON_PRIVATE_KEY_HEX", &env.tron_private_key_hex)?,
        fee_policy: FeePolicy {
            fee_limit_cap_sun: env.tron_fee_limit_cap_sun,
            fee_limit_headroom_ppm: env.tron_fee_limit_headroom_ppm,
        },
    };

    let walletconnect = match non_empty(&env.wc_project_id) {
        Some(project_id) => {
            let relay_url = non_empty(&env.wc_relay_url)
                .context("WC_RELAY_URL must not be empty when WC_PROJECT_ID is set")?;
            let session_file = non_empty(&env.wc_session_file)
                .context("WC_SESSION_FILE must not be empty when WC_PROJECT_ID is set")?;
            Some(WalletConnectConfig {
                project_id,
                relay_url,
                session_file: PathBuf::from(session_file),
                connect_timeout: secs("WC_CONNECT_TIMEOUT_SECS", env.wc_connect_timeout_secs)?,
                request_timeout: secs("WC_REQUEST_TIMEOUT_SECS", env.wc_request_timeout_secs)?,
            })
        }
        None => None,
    };

    if tron.private_key.is_none() && walletconnect.is_none() {
        tracing::warn!("neither TRON_PRIVATE_KEY_HEX nor WC_PROJECT_ID is set; no wallet can sign");
    }

    if env.approve_max_polls == 0 {
        anyhow::bail!("APPROVE_MAX_POLLS must be > 0");
    }
    let approve = ApproveConfig {
        poll_interval: secs("APPROVE_POLL_INTERVAL_SECS", env.approve_poll_interval_secs)?,
        max_polls: env.approve_max_polls,
    };

    Ok(AppConfig {
        network,
        tron,
        walletconnect,
        approve,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_follow_the_selected_network() {
        let cfg = from_env(Env::default(), Some(TronNetwork::Nile)).unwrap();
        assert_eq!(cfg.network, TronNetwork::Nile);
        assert_eq!(cfg.tron.api_url, "https://nile.trongrid.io");
        assert_eq!(
            cfg.tron.usdt_contract.to_string(),
            TronNetwork::Nile.usdt_contract()
        );
        assert!(cfg.tron.private_key.is_none());
        assert!(cfg.walletconnect.is_none());
        assert_eq!(cfg.tron.fee_policy, FeePolicy::default());
        assert_eq!(cfg.approve.poll_interval, Duration::from_secs(3));
    }

    #[test]
    fn cli_network_overrides_env() {
        let env = Env {
            tron_network: "shasta".to_string(),
            ..Env::default()
        };
        let cfg = from_env(env, Some(TronNetwork::Mainnet)).unwrap();
        assert_eq!(cfg.network, TronNetwork::Mainnet);

        let env = Env {
            tron_network: "shasta".to_string(),
            ..Env::default()
        };
        assert_eq!(from_env(env, None).unwrap().network, TronNetwork::Shasta);
    }

    #[test]
    fn explicit_endpoints_win_over_network_defaults() {
        let env = Env {
            tron_api_url: "http://127.0.0.1:8090/".to_string(),
            tron_usdt_contract: "TXYZopYRdj2D9XRtbG411XZZ3kM5VkAeBf".to_string(),
            tron_api_key: Some("  ".to_string()),
            ..Env::default()
        };
        let cfg = from_env(env, None).unwrap();
        assert_eq!(cfg.tron.api_url, "http://127.0.0.1:8090");
        assert_eq!(
            cfg.tron.usdt_contract.to_string(),
            "TXYZopYRdj2D9XRtbG411XZZ3kM5VkAeBf"
        );
        assert!(cfg.tron.api_key.is_none());
    }

    #[test]
    fn walletconnect_enabled_by_project_id() {
        let env = Env {
            wc_project_id: "abc123".to_string(),
            ..Env::default()
        };
        let wc = from_env(env, None).unwrap().walletconnect.unwrap();
        assert_eq!(wc.project_id, "abc123");
        assert_eq!(wc.relay_url, walletconnect::relay::DEFAULT_RELAY_URL);
        assert_eq!(wc.session_file, PathBuf::from(".walletconnect-session.json"));
    }

    #[test]
    fn rejects_invalid_values() {
        let env = Env {
            tron_network: "goerli".to_string(),
            ..Env::default()
        };
        assert!(from_env(env, None).is_err());

        let env = Env {
            tron_private_key_hex: "0x1234".to_string(),
            ..Env::default()
        };
        let err = from_env(env, None).unwrap_err().to_string();
        assert!(err.contains("must be 32 bytes"));

        let env = Env {
            tron_fee_limit_headroom_ppm: 2_000_000,
            ..Env::default()
        };
        assert!(from_env(env, None).is_err());

        let env = Env {
            approve_max_polls: 0,
            ..Env::default()
        };
        assert!(from_env(env, None).is_err());
    }
}
