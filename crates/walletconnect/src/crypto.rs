//! Envelope encryption and key agreement used on WalletConnect topics.

use crate::error::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use rand::rngs::OsRng;
use relay_rpc::domain::Topic;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use x25519_dalek::{PublicKey, StaticSecret};

const ENVELOPE_TYPE_0: u8 = 0;
const ENVELOPE_TYPE_1: u8 = 1;
const IV_LEN: usize = 12;

/// 32-byte symmetric key protecting one topic.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SymKey([u8; 32]);

impl SymKey {
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| Error::Crypto(format!("invalid key hex: {e}")))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| Error::Crypto(format!("key must be 32 bytes (got {})", b.len())))?;
        Ok(Self(key))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Topic a key protects: `hex(sha256(key))`.
    pub fn topic(&self) -> Topic {
        Topic::from(hex::encode(Sha256::digest(self.0)))
    }
}

impl std::fmt::Debug for SymKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SymKey(..)")
    }
}

impl Serialize for SymKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SymKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Seals `plaintext` into a base64 type-0 envelope: `0x00 || iv || ciphertext+tag`.
pub fn encrypt(key: &SymKey, plaintext: &[u8]) -> Result<String> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let sealed = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext)
        .map_err(|_| Error::Crypto("encrypt envelope".to_string()))?;

    let mut envelope = Vec::with_capacity(1 + IV_LEN + sealed.len());
    envelope.push(ENVELOPE_TYPE_0);
    envelope.extend_from_slice(&iv);
    envelope.extend_from_slice(&sealed);
    Ok(BASE64.encode(envelope))
}

pub fn decrypt(key: &SymKey, message: &str) -> Result<Vec<u8>> {
    let envelope = BASE64
        .decode(message.trim())
        .map_err(|e| Error::Crypto(format!("envelope is not base64: {e}")))?;
    let Some((&ty, rest)) = envelope.split_first() else {
        return Err(Error::Crypto("empty envelope".to_string()));
    };
    match ty {
        ENVELOPE_TYPE_0 => {}
        ENVELOPE_TYPE_1 => {
            return Err(Error::Crypto("type 1 envelopes are not supported".to_string()));
        }
        other => return Err(Error::Crypto(format!("unknown envelope type {other}"))),
    }
    if rest.len() < IV_LEN + 16 {
        return Err(Error::Crypto("envelope too short".to_string()));
    }
    let (iv, sealed) = rest.split_at(IV_LEN);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key.as_bytes()));
    cipher
        .decrypt(Nonce::from_slice(iv), sealed)
        .map_err(|_| Error::Crypto("envelope authentication failed".to_string()))
}

/// X25519 key pair held by the proposer until the wallet answers.
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public_hex(&self) -> String {
        hex::encode(self.public.as_bytes())
    }

    /// Session key: HKDF-SHA256 over the X25519 shared secret, no salt and no info.
    pub fn derive_sym_key(&self, peer_public_hex: &str) -> Result<SymKey> {
        let bytes = hex::decode(peer_public_hex.trim())
            .map_err(|e| Error::Crypto(format!("invalid peer public key hex: {e}")))?;
        let peer: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::Crypto("peer public key must be 32 bytes".to_string()))?;
        let shared = self.secret.diffie_hellman(&PublicKey::from(peer));

        let hk = Hkdf::<Sha256>::new(None, shared.as_bytes());
        let mut okm = [0u8; 32];
        hk.expand(&[], &mut okm)
            .map_err(|_| Error::Crypto("hkdf expand".to_string()))?;
        Ok(SymKey(okm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_decrypts_with_same_key() {
        let key = SymKey::generate();
        let msg = encrypt(&key, br#"{"id":1}"#).unwrap();
        assert_eq!(decrypt(&key, &msg).unwrap(), br#"{"id":1}"#);
    }

    #[test]
    fn envelope_rejects_other_key_and_tampering() {
        let key = SymKey::generate();
        let msg = encrypt(&key, b"hello").unwrap();
        assert!(decrypt(&SymKey::generate(), &msg).is_err());

        let mut raw = BASE64.decode(&msg).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        assert!(decrypt(&key, &BASE64.encode(raw)).is_err());
    }

    #[test]
    fn type1_envelope_is_rejected() {
        let mut raw = vec![ENVELOPE_TYPE_1];
        raw.extend_from_slice(&[0u8; 60]);
        let err = decrypt(&SymKey::generate(), &BASE64.encode(raw)).unwrap_err();
        assert!(err.to_string().contains("type 1"));
    }

    #[test]
    fn both_sides_derive_the_same_session_key() {
        let dapp = KeyPair::generate();
        let wallet = KeyPair::generate();
        let a = dapp.derive_sym_key(&wallet.public_hex()).unwrap();
        let b = wallet.derive_sym_key(&dapp.public_hex()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.topic(), b.topic());
        assert_eq!(a.topic().to_string().len(), 64);
    }

    #[test]
    fn sym_key_serde_is_hex() {
        let key = SymKey::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        assert_eq!(serde_json::from_str::<SymKey>(&json).unwrap(), key);
    }
}
