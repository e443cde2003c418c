use anyhow::Result;

mod env;
mod load;
mod parse;
mod types;

pub use types::*;

pub fn load_config(network_override: Option<crate::network::TronNetwork>) -> Result<AppConfig> {
    load::load_config(network_override)
}
