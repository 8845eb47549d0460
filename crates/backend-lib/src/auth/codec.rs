// ============================
// crates/backend-lib/src/auth/codec.rs
// ============================
//! Secret material codecs, one per storage mode.
//!
//! A codec turns a raw secret into the string persisted in a credential
//! record and later decides whether a submitted secret matches it. Codecs
//! are synchronous and may be slow; `CredentialVerifier` runs them off the
//! async workers.
use std::fmt;
use std::str::FromStr;

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use scrypt::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Params, Scrypt,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use super::error::VerifierError;

/// Length of the AES-256-GCM key in bytes
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes
const NONCE_LEN: usize = 12;

/// Leading byte of every encrypted payload
const ENCRYPTED_FORMAT_VERSION: u8 = 1;

/// Accepted range for the scrypt cost factor (log2 of N)
pub const MIN_COST_FACTOR: u8 = 4;
pub const MAX_COST_FACTOR: u8 = 20;

/// Default scrypt cost factor (N = 2^15)
pub const DEFAULT_COST_FACTOR: u8 = 15;

/// How secret material is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageMode {
    /// Raw secret, stored as submitted
    Plain,
    /// AES-256-GCM under the process-wide key
    ReversibleEncryption,
    /// Salted scrypt hash in PHC string format
    OneWayHash,
}

impl StorageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageMode::Plain => "plain",
            StorageMode::ReversibleEncryption => "reversible-encryption",
            StorageMode::OneWayHash => "one-way-hash",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageMode {
    type Err = VerifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plain" => Ok(StorageMode::Plain),
            "reversible-encryption" => Ok(StorageMode::ReversibleEncryption),
            "one-way-hash" => Ok(StorageMode::OneWayHash),
            other => Err(VerifierError::Configuration(format!(
                "unknown storage mode '{other}'"
            ))),
        }
    }
}

/// Encode/verify contract shared by every storage mode.
pub trait SecretCodec: Send + Sync + 'static {
    /// Mode implemented by this codec
    fn mode(&self) -> StorageMode;

    /// Produce the secret material stored at registration
    fn encode(&self, raw: &str) -> Result<String, VerifierError>;

    /// Check a submitted secret against stored material.
    /// A mismatch is `Ok(false)`, never an error.
    fn verify(&self, raw: &str, material: &str) -> Result<bool, VerifierError>;
}

/// Stores secrets verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCodec;

impl SecretCodec for PlainCodec {
    fn mode(&self) -> StorageMode {
        StorageMode::Plain
    }

    fn encode(&self, raw: &str) -> Result<String, VerifierError> {
        Ok(raw.to_owned())
    }

    fn verify(&self, raw: &str, material: &str) -> Result<bool, VerifierError> {
        Ok(raw.as_bytes() == material.as_bytes())
    }
}

/// Encrypts secrets with AES-256-GCM.
///
/// Material layout, base64 encoded: `version (1) || nonce (12) || ciphertext+tag`.
/// Each call draws a fresh nonce, so encoding the same secret twice yields
/// different material.
#[derive(Clone)]
pub struct EncryptedCodec {
    cipher: Aes256Gcm,
}

impl fmt::Debug for EncryptedCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptedCodec").finish_non_exhaustive()
    }
}

impl EncryptedCodec {
    /// Build the codec from a base64-encoded 32-byte key
    pub fn from_base64_key(encoded: &str) -> Result<Self, VerifierError> {
        let key = Zeroizing::new(STANDARD.decode(encoded.trim()).map_err(|e| {
            VerifierError::Configuration(format!("secret key is not valid base64: {e}"))
        })?);
        Self::from_key_bytes(&key)
    }

    pub fn from_key_bytes(key: &[u8]) -> Result<Self, VerifierError> {
        if key.len() != KEY_LEN {
            return Err(VerifierError::Configuration(format!(
                "secret key must be {KEY_LEN} bytes, got {}",
                key.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|_| VerifierError::Configuration("invalid AES-256 key".to_string()))?;
        Ok(Self { cipher })
    }

    /// Generate a fresh random key, base64 encoded
    pub fn generate_key() -> String {
        let mut key = Zeroizing::new([0u8; KEY_LEN]);
        rand::rng().fill_bytes(&mut key[..]);
        STANDARD.encode(&key[..])
    }

    fn decrypt(&self, material: &str) -> Result<Zeroizing<Vec<u8>>, VerifierError> {
        let bytes = STANDARD
            .decode(material)
            .map_err(|e| VerifierError::Decryption(format!("material is not valid base64: {e}")))?;

        let (version, rest) = bytes
            .split_first()
            .ok_or_else(|| VerifierError::Decryption("material is empty".to_string()))?;
        if *version != ENCRYPTED_FORMAT_VERSION {
            return Err(VerifierError::Decryption(format!(
                "unsupported format version {version}"
            )));
        }
        if rest.len() < NONCE_LEN {
            return Err(VerifierError::Decryption("material is truncated".to_string()));
        }

        let (nonce, ciphertext) = rest.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| VerifierError::Decryption("authentication failed".to_string()))?;
        Ok(Zeroizing::new(plain))
    }
}

impl SecretCodec for EncryptedCodec {
    fn mode(&self) -> StorageMode {
        StorageMode::ReversibleEncryption
    }

    fn encode(&self, raw: &str) -> Result<String, VerifierError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, raw.as_bytes())
            .map_err(|_| VerifierError::Encoding("encryption failed".to_string()))?;

        let mut combined = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        combined.push(ENCRYPTED_FORMAT_VERSION);
        combined.extend_from_slice(&nonce);
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(combined))
    }

    fn verify(&self, raw: &str, material: &str) -> Result<bool, VerifierError> {
        let plain = self.decrypt(material)?;
        Ok(plain.as_slice() == raw.as_bytes())
    }
}

/// Hashes secrets with scrypt.
///
/// The salt and cost parameters travel inside the PHC string, so verifying
/// old material keeps working after the configured cost changes.
#[derive(Debug, Clone, Copy)]
pub struct HashedCodec {
    params: Params,
}

impl HashedCodec {
    pub fn new(cost_factor: u8) -> Result<Self, VerifierError> {
        if !(MIN_COST_FACTOR..=MAX_COST_FACTOR).contains(&cost_factor) {
            return Err(VerifierError::Configuration(format!(
                "cost factor must be between {MIN_COST_FACTOR} and {MAX_COST_FACTOR}, got {cost_factor}"
            )));
        }
        let params = Params::new(
            cost_factor,
            Params::RECOMMENDED_R,
            Params::RECOMMENDED_P,
            Params::RECOMMENDED_LEN,
        )
        .map_err(|e| VerifierError::Configuration(format!("invalid scrypt parameters: {e}")))?;
        Ok(Self { params })
    }

    pub fn cost_factor(&self) -> u8 {
        self.params.log_n()
    }
}

impl SecretCodec for HashedCodec {
    fn mode(&self) -> StorageMode {
        StorageMode::OneWayHash
    }

    fn encode(&self, raw: &str) -> Result<String, VerifierError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Scrypt
            .hash_password_customized(raw.as_bytes(), None, None, self.params, &salt)
            .map_err(|e| VerifierError::Encoding(format!("hashing failed: {e}")))?;
        Ok(hash.to_string())
    }

    fn verify(&self, raw: &str, material: &str) -> Result<bool, VerifierError> {
        let parsed = match PasswordHash::new(material) {
            Ok(h) => h,
            Err(_) => return Ok(false),
        };
        Ok(Scrypt.verify_password(raw.as_bytes(), &parsed).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

    /// Replace the character at `idx` with a different base64 character
    fn tamper(material: &str, idx: usize) -> String {
        let mut chars: Vec<char> = material.chars().collect();
        chars[idx] = if chars[idx] == 'A' { 'B' } else { 'A' };
        chars.into_iter().collect()
    }

    #[test]
    fn test_plain_codec() {
        let codec = PlainCodec;
        let material = codec.encode("correct-horse").unwrap();

        assert_eq!(material, "correct-horse");
        assert!(codec.verify("correct-horse", &material).unwrap());
        assert!(!codec.verify("Correct-horse", &material).unwrap());
        assert!(!codec.verify("correct-horse ", &material).unwrap());
    }

    #[test]
    fn test_encrypted_codec_round_trip() {
        let codec = EncryptedCodec::from_base64_key(TEST_KEY).unwrap();

        let first = codec.encode("correct-horse").unwrap();
        let second = codec.encode("correct-horse").unwrap();

        assert_ne!(first, "correct-horse");
        assert_ne!(first, second);
        assert!(codec.verify("correct-horse", &first).unwrap());
        assert!(codec.verify("correct-horse", &second).unwrap());
        assert!(!codec.verify("wrong-password", &first).unwrap());
    }

    #[test]
    fn test_encrypted_codec_rejects_tampering() {
        let codec = EncryptedCodec::from_base64_key(TEST_KEY).unwrap();
        let material = codec.encode("correct-horse").unwrap();

        let tampered = tamper(&material, material.len() / 2);
        assert!(matches!(
            codec.verify("correct-horse", &tampered),
            Err(VerifierError::Decryption(_))
        ));

        assert!(matches!(
            codec.verify("correct-horse", "not base64 at all!"),
            Err(VerifierError::Decryption(_))
        ));
        assert!(matches!(
            codec.verify("correct-horse", ""),
            Err(VerifierError::Decryption(_))
        ));
    }

    #[test]
    fn test_encrypted_codec_rejects_foreign_key() {
        let codec = EncryptedCodec::from_base64_key(TEST_KEY).unwrap();
        let other = EncryptedCodec::from_base64_key(&EncryptedCodec::generate_key()).unwrap();

        let material = codec.encode("correct-horse").unwrap();
        assert!(other.verify("correct-horse", &material).is_err());
    }

    #[test]
    fn test_encrypted_codec_key_validation() {
        assert!(matches!(
            EncryptedCodec::from_base64_key("c2hvcnQ="),
            Err(VerifierError::Configuration(_))
        ));
        assert!(matches!(
            EncryptedCodec::from_base64_key("%%%"),
            Err(VerifierError::Configuration(_))
        ));
        assert!(EncryptedCodec::from_base64_key(&EncryptedCodec::generate_key()).is_ok());
    }

    #[test]
    fn test_hashed_codec_round_trip() {
        let codec = HashedCodec::new(MIN_COST_FACTOR).unwrap();

        let first = codec.encode("correct-horse").unwrap();
        let second = codec.encode("correct-horse").unwrap();

        assert!(first.starts_with("$scrypt$"));
        assert_ne!(first, second);
        assert!(codec.verify("correct-horse", &first).unwrap());
        assert!(codec.verify("correct-horse", &second).unwrap());
        assert!(!codec.verify("wrong-password", &first).unwrap());
    }

    #[test]
    fn test_hashed_codec_never_errors_on_bad_material() {
        let codec = HashedCodec::new(MIN_COST_FACTOR).unwrap();
        let material = codec.encode("correct-horse").unwrap();

        let tampered = tamper(&material, material.len() - 10);
        assert!(!codec.verify("correct-horse", &tampered).unwrap());
        assert!(!codec.verify("correct-horse", "garbage").unwrap());
        assert!(!codec.verify("", "").unwrap());
    }

    #[test]
    fn test_hashed_codec_cost_bounds() {
        assert!(HashedCodec::new(MIN_COST_FACTOR - 1).is_err());
        assert!(HashedCodec::new(MAX_COST_FACTOR + 1).is_err());
        assert_eq!(HashedCodec::new(10).unwrap().cost_factor(), 10);
    }

    #[test]
    fn test_storage_mode_names() {
        for mode in [
            StorageMode::Plain,
            StorageMode::ReversibleEncryption,
            StorageMode::OneWayHash,
        ] {
            assert_eq!(mode.as_str().parse::<StorageMode>().unwrap(), mode);
        }
        assert!("bcrypt".parse::<StorageMode>().is_err());
    }
}
