pub mod abi;
mod address;
pub mod http;
pub mod resources;
mod sender;
mod transaction;
pub mod trc20;
mod wallet;

pub use address::{TRON_ADDRESS_PREFIX, TronAddress};
pub use http::TronHttp;
pub use resources::{ChainFees, FeePolicy};
pub use sender::PreparedTrigger;
pub use transaction::Transaction;
pub use trc20::Trc20Token;
pub use wallet::TronWallet;
