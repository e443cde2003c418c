//! Client error types.

use thiserror::Error;

/// JSON-RPC / WalletConnect codes a wallet uses to say the user declined.
const USER_REJECTED_CODES: &[i64] = &[4001, 5000, 5001, 5002];
/// Codes meaning the wallet does not implement the requested method.
const UNSUPPORTED_METHOD_CODES: &[i64] = &[-32601, 5101, 10001];
const INVALID_PARAMS_CODE: i64 = -32602;

#[derive(Debug, Error)]
pub enum Error {
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("relay error: {0}")]
    Relay(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("invalid pairing uri: {0}")]
    InvalidUri(String),

    #[error("wallet error {code}: {message}")]
    Wallet { code: i64, message: String },

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session expired")]
    SessionExpired,

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("channel closed")]
    ChannelClosed,

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl Error {
    pub fn is_user_rejection(&self) -> bool {
        match self {
            Error::Wallet { code, message } => {
                if USER_REJECTED_CODES.contains(code) {
                    return true;
                }
                let m = message.to_ascii_lowercase();
                m.contains("reject") || m.contains("denied") || m.contains("cancel")
            }
            _ => false,
        }
    }

    pub fn is_unsupported_method(&self) -> bool {
        match self {
            Error::Wallet { code, message } => {
                if UNSUPPORTED_METHOD_CODES.contains(code) {
                    return true;
                }
                let m = message.to_ascii_lowercase();
                m.contains("not supported")
                    || m.contains("unsupported")
                    || m.contains("method not found")
                    || m.contains("unknown method")
            }
            _ => false,
        }
    }

    /// The wallet understood the method but not the shape of its params.
    pub fn is_invalid_params(&self) -> bool {
        match self {
            Error::Wallet { code, message } => {
                *code == INVALID_PARAMS_CODE || message.to_ascii_lowercase().contains("invalid params")
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(code: i64, message: &str) -> Error {
        Error::Wallet {
            code,
            message: message.to_string(),
        }
    }

    #[test]
    fn classifies_rejections() {
        assert!(wallet(5000, "User rejected.").is_user_rejection());
        assert!(wallet(4001, "").is_user_rejection());
        assert!(wallet(0, "Request denied by user").is_user_rejection());
        assert!(!wallet(5101, "Unsupported methods.").is_user_rejection());
        assert!(!Error::ChannelClosed.is_user_rejection());
    }

    #[test]
    fn classifies_unsupported_methods() {
        assert!(wallet(5101, "").is_unsupported_method());
        assert!(wallet(-32601, "Method not found").is_unsupported_method());
        assert!(wallet(1, "tron_sendTransaction is not supported").is_unsupported_method());
        assert!(!wallet(5000, "User rejected.").is_unsupported_method());
    }

    #[test]
    fn classifies_invalid_params() {
        assert!(wallet(-32602, "").is_invalid_params());
        assert!(wallet(0, "Invalid params: expected object").is_invalid_params());
        assert!(!wallet(-32602, "Invalid params").is_user_rejection());
        assert!(!wallet(5000, "User rejected.").is_invalid_params());
        assert!(!Error::SessionExpired.is_invalid_params());
    }
}
