use std::fmt;
use walletconnect::Metadata;

/// Wallet families the client recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletKind {
    TronLink,
    TrustWallet,
    /// Any other WalletConnect wallet.
    Generic,
    /// The in-process key from `TRON_PRIVATE_KEY_HEX`.
    Local,
}

impl WalletKind {
    /// Classifies a remote wallet from the metadata it announced when settling.
    pub fn from_metadata(meta: &Metadata) -> Self {
        let haystack = format!("{} {}", meta.name, meta.url).to_ascii_lowercase();
        if haystack.contains("tronlink") {
            Self::TronLink
        } else if haystack.contains("trust") {
            Self::TrustWallet
        } else {
            Self::Generic
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TronLink => "TronLink",
            Self::TrustWallet => "Trust Wallet",
            Self::Generic => "WalletConnect wallet",
            Self::Local => "local key",
        }
    }
}

impl fmt::Display for WalletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str, url: &str) -> Metadata {
        Metadata {
            name: name.to_string(),
            url: url.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn detects_known_wallets_by_name_or_url() {
        assert_eq!(WalletKind::from_metadata(&meta("TronLink", "")), WalletKind::TronLink);
        assert_eq!(
            WalletKind::from_metadata(&meta("Wallet", "https://www.tronlink.org")),
            WalletKind::TronLink
        );
        assert_eq!(
            WalletKind::from_metadata(&meta("Trust Wallet", "https://trustwallet.com")),
            WalletKind::TrustWallet
        );
        assert_eq!(
            WalletKind::from_metadata(&meta("Bitget", "https://web3.bitget.com")),
            WalletKind::Generic
        );
    }
}
