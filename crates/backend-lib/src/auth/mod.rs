// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod codec;
pub mod error;
pub mod rate_limit;
pub mod session;
pub mod token_generator;
mod verifier;

pub use codec::{EncryptedCodec, HashedCodec, PlainCodec, SecretCodec, StorageMode};
pub use error::VerifierError;
pub use rate_limit::AuthRateLimiter;
pub use session::{Session, SessionManager};
pub use verifier::CredentialVerifier;
