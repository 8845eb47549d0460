// ============================
// crates/backend-lib/src/auth/verifier.rs
// ============================
//! Credential verifier: the single encode/verify entry point used by the
//! registration and login handlers.
use std::sync::Arc;

use tokio::task;
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::codec::{EncryptedCodec, HashedCodec, PlainCodec, SecretCodec, StorageMode};
use super::error::VerifierError;
use super::token_generator::generate_secure_token;
use crate::config::AuthSettings;

/// Wraps the codec for the active storage mode.
///
/// Cloning is cheap and every clone shares the same immutable codec.
#[derive(Clone)]
pub struct CredentialVerifier {
    codec: Arc<dyn SecretCodec>,
    /// Material for a random secret, checked when an identifier has no record
    decoy: Arc<str>,
}

impl std::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("mode", &self.codec.mode())
            .finish()
    }
}

impl CredentialVerifier {
    /// Build the verifier for the configured mode.
    ///
    /// Any problem with the key or cost factor is reported here, once, as
    /// `VerifierError::Configuration`.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, VerifierError> {
        let codec: Arc<dyn SecretCodec> = match settings.mode {
            StorageMode::Plain => {
                warn!("secrets are stored in plain text");
                Arc::new(PlainCodec)
            },
            StorageMode::ReversibleEncryption => {
                let key = settings
                    .secret_key
                    .as_deref()
                    .filter(|key| !key.trim().is_empty())
                    .ok_or_else(|| {
                        VerifierError::Configuration(
                            "reversible-encryption mode requires auth.secret_key".to_string(),
                        )
                    })?;
                Arc::new(EncryptedCodec::from_base64_key(key)?)
            },
            StorageMode::OneWayHash => Arc::new(HashedCodec::new(settings.cost_factor)?),
        };

        let verifier = Self::from_codec(codec)?;
        info!(mode = %verifier.mode(), "credential verifier ready");
        Ok(verifier)
    }

    pub fn with_codec<C: SecretCodec>(codec: C) -> Result<Self, VerifierError> {
        Self::from_codec(Arc::new(codec))
    }

    fn from_codec(codec: Arc<dyn SecretCodec>) -> Result<Self, VerifierError> {
        let decoy = codec.encode(&generate_secure_token())?;
        Ok(Self {
            codec,
            decoy: decoy.into(),
        })
    }

    pub fn mode(&self) -> StorageMode {
        self.codec.mode()
    }

    /// Encode a raw secret into storable material on the blocking pool
    pub async fn encode(&self, raw: &str) -> Result<String, VerifierError> {
        let codec = Arc::clone(&self.codec);
        let raw = Zeroizing::new(raw.to_owned());
        task::spawn_blocking(move || codec.encode(&raw)).await?
    }

    /// Check a submitted secret against stored material.
    ///
    /// Unreadable material counts as a mismatch; the cause is logged and
    /// never reaches the caller.
    pub async fn verify(&self, raw: &str, material: &str) -> bool {
        match self.try_verify(raw, material).await {
            Ok(matched) => matched,
            Err(err) => {
                warn!(mode = %self.mode(), error = %err, "stored secret material rejected");
                false
            },
        }
    }

    /// Run a verification against throwaway material and discard the outcome.
    ///
    /// Used when no record exists, so an unknown identifier costs as much as
    /// a wrong secret.
    pub async fn verify_decoy(&self, raw: &str) {
        let _ = self.try_verify(raw, &self.decoy).await;
    }

    /// Like `verify`, but surfaces decryption and task failures
    pub async fn try_verify(&self, raw: &str, material: &str) -> Result<bool, VerifierError> {
        let codec = Arc::clone(&self.codec);
        let raw = Zeroizing::new(raw.to_owned());
        let material = material.to_owned();
        task::spawn_blocking(move || codec.verify(&raw, &material)).await?
    }
}
