//! Terminal QR code for WalletConnect pairing.

use anyhow::{Context, Result};
use tracing::{error, info};
use url::Url;
use walletconnect::PairingUri;

/// A pairing URI ready to be scanned by a wallet app.
pub struct PairingQr {
    uri: String,
}

impl PairingQr {
    pub fn new(uri: &PairingUri) -> Self {
        Self {
            uri: uri.to_string(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Deep link that opens the pairing directly in a wallet app on the same device.
    pub fn deep_link(&self, scheme: &str) -> Result<String> {
        let mut link = Url::parse(&format!("{scheme}://wc"))
            .with_context(|| format!("invalid deep link scheme {scheme:?}"))?;
        link.query_pairs_mut().append_pair("uri", &self.uri);
        Ok(link.into())
    }

    /// Print the QR Code and the raw URI to the terminal.
    pub fn print(&self) {
        info!("Scan the QR code with a Tron wallet (TronLink, Trust Wallet) to connect");
        qr2term::print_qr(self.uri.as_str())
            .unwrap_or_else(|error| error!(message = "Failed to generate QR Code", %error));
        println!("\n{}\n", self.uri());
        match self.deep_link("tronlinkoutside") {
            Ok(link) => println!("TronLink on this device: {link}\n"),
            Err(e) => error!(error = %format!("{e:#}"), "deep link unavailable"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walletconnect::crypto::SymKey;

    #[test]
    fn deep_link_percent_encodes_the_uri() {
        let uri = PairingUri::new(SymKey::from_bytes([1u8; 32]), 1_700_000_000);
        let qr = PairingQr::new(&uri);

        assert!(qr.uri().starts_with("wc:"));
        let link = qr.deep_link("tronlinkoutside").unwrap();
        assert!(link.starts_with("tronlinkoutside://wc?uri=wc%3A"), "{link}");
        assert!(!link["tronlinkoutside://wc?uri=".len()..].contains('&'));
        assert!(link.contains("relay-protocol%3Dirn"));

        let parsed = Url::parse(&link).unwrap();
        let (key, value) = parsed.query_pairs().next().unwrap();
        assert_eq!(key, "uri");
        assert_eq!(value, qr.uri());
    }

    #[test]
    fn deep_link_rejects_bad_scheme() {
        let uri = PairingUri::new(SymKey::from_bytes([1u8; 32]), 1_700_000_000);
        assert!(PairingQr::new(&uri).deep_link("not a scheme").is_err());
    }
}
