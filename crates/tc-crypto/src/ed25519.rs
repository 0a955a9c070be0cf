//! # Ed25519 Keys and Signatures
//!
//! Key generation and signing for DID provisioning, and verification of
//! DID proofs presented by callers.
//!
//! - The private half of an [`Ed25519KeyPair`] is never serialized. The only
//!   way out is [`Ed25519KeyPair::secret_hex`], which returns a zeroizing
//!   buffer so the caller can hand it to the DID owner exactly once.
//! - Public keys and signatures serialize as lowercase hex strings.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::hex;

/// An Ed25519 public key (32 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey(pub [u8; 32]);

/// An Ed25519 signature (64 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

/// An Ed25519 key pair. Does not implement `Serialize` or `Debug`.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

// ---------------------------------------------------------------------------
// Ed25519PublicKey
// ---------------------------------------------------------------------------

impl Ed25519PublicKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse a public key from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        hex::decode_array::<32>(s)
            .map(Self)
            .map_err(|e| CryptoError::Key(format!("public key: {e}")))
    }

    /// Verify `signature` over `message`.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let vk = ed25519_dalek::VerifyingKey::from_bytes(&self.0)
            .map_err(|e| CryptoError::Key(format!("invalid public key: {e}")))?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        vk.verify(message, &sig)
            .map_err(|e| CryptoError::VerificationFailed(e.to_string()))
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", &self.to_hex()[..8])
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519Signature
// ---------------------------------------------------------------------------

impl Ed25519Signature {
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse a signature from a 128-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        hex::decode_array::<64>(s)
            .map(Self)
            .map_err(|e| CryptoError::VerificationFailed(format!("signature: {e}")))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", &self.to_hex()[..8])
    }
}

impl std::fmt::Display for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519KeyPair
// ---------------------------------------------------------------------------

impl Ed25519KeyPair {
    /// Generate a new key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        let signing_key = ed25519_dalek::SigningKey::generate(&mut rand_core::OsRng);
        Self { signing_key }
    }

    /// Rebuild a key pair from its 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Rebuild a key pair from a hex-encoded seed.
    pub fn from_secret_hex(s: &str) -> Result<Self, CryptoError> {
        let seed = Zeroizing::new(
            hex::decode_array::<32>(s).map_err(|e| CryptoError::Key(format!("secret key: {e}")))?,
        );
        Ok(Self::from_seed(&seed))
    }

    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Hex-encoded private seed in a buffer wiped on drop.
    pub fn secret_hex(&self) -> Zeroizing<String> {
        let seed = Zeroizing::new(self.signing_key.to_bytes());
        Zeroizing::new(hex::encode(&seed[..]))
    }

    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_and_verify() {
        let kp = Ed25519KeyPair::generate();
        let sig = kp.sign(b"payload");
        assert!(kp.public_key().verify(b"payload", &sig).is_ok());
        assert!(matches!(
            kp.public_key().verify(b"other", &sig),
            Err(CryptoError::VerificationFailed(_))
        ));
    }

    #[test]
    fn seed_is_deterministic() {
        let a = Ed25519KeyPair::from_seed(&[7u8; 32]);
        let b = Ed25519KeyPair::from_seed(&[7u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(b"m"), b.sign(b"m"));
    }

    #[test]
    fn secret_hex_round_trips_to_same_key() {
        let kp = Ed25519KeyPair::generate();
        let secret = kp.secret_hex();
        assert_eq!(secret.len(), 64);
        let back = Ed25519KeyPair::from_secret_hex(&secret).unwrap();
        assert_eq!(back.public_key(), kp.public_key());
    }

    #[test]
    fn public_key_serializes_as_hex() {
        let kp = Ed25519KeyPair::from_seed(&[1u8; 32]);
        let json = serde_json::to_string(&kp.public_key()).unwrap();
        assert_eq!(json, format!("\"{}\"", kp.public_key().to_hex()));
        let back: Ed25519PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(back, kp.public_key());
    }

    #[test]
    fn malformed_signature_hex_is_rejected() {
        assert!(Ed25519Signature::from_hex("abcd").is_err());
        assert!(Ed25519Signature::from_hex(&"zz".repeat(64)).is_err());
    }

    #[test]
    fn debug_does_not_print_full_key() {
        let kp = Ed25519KeyPair::from_seed(&[2u8; 32]);
        let dbg = format!("{:?}", kp.public_key());
        assert!(dbg.len() < kp.public_key().to_hex().len());
    }
}
