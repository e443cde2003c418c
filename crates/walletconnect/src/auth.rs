//! Relay authentication: a client key and the JWT the relay expects on connect.

use crate::error::{Error, Result};
use rand::RngCore;
use rand::rngs::OsRng;
use relay_rpc::auth::ed25519_dalek::SigningKey;
use relay_rpc::auth::{AuthToken, SerializedAuthToken};
use std::time::Duration;

pub const JWT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct ClientIdentity {
    key: SigningKey,
}

impl ClientIdentity {
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
        }
    }

    /// Signs a relay token for `aud`, issued by this client's `did:key`.
    pub fn relay_token(&self, aud: &str) -> Result<SerializedAuthToken> {
        let mut sub = [0u8; 32];
        OsRng.fill_bytes(&mut sub);
        AuthToken::new(hex::encode(sub))
            .aud(aud)
            .ttl(JWT_TTL)
            .as_jwt(&self.key)
            .map_err(|e| Error::Crypto(format!("sign relay jwt: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn claims(jwt: &str) -> serde_json::Value {
        let parts: Vec<&str> = jwt.split('.').collect();
        assert_eq!(parts.len(), 3);
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[1]).unwrap()).unwrap()
    }

    #[test]
    fn token_is_issued_by_ed25519_did_key() {
        let id = ClientIdentity::from_seed([9u8; 32]);
        let jwt = id.relay_token("wss://relay.walletconnect.org").unwrap().to_string();
        let claims = claims(&jwt);

        assert_eq!(claims["aud"], "wss://relay.walletconnect.org");
        // base58btc of the 0xed01 multicodec prefix always starts with "z6Mk".
        assert!(claims["iss"].as_str().unwrap().starts_with("did:key:z6Mk"), "{claims}");
        let ttl = claims["exp"].as_u64().unwrap() - claims["iat"].as_u64().unwrap();
        assert_eq!(ttl, JWT_TTL.as_secs());
    }

    #[test]
    fn same_seed_same_issuer() {
        let a = claims(&ClientIdentity::from_seed([1u8; 32]).relay_token("wss://a").unwrap().to_string());
        let b = claims(&ClientIdentity::from_seed([1u8; 32]).relay_token("wss://a").unwrap().to_string());
        let c = claims(&ClientIdentity::generate().relay_token("wss://a").unwrap().to_string());
        assert_eq!(a["iss"], b["iss"]);
        assert_ne!(a["sub"], b["sub"]);
        assert_ne!(a["iss"], c["iss"]);
    }
}
