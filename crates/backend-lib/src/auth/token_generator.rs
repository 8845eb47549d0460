// ============================
// crates/backend-lib/src/auth/token_generator.rs
// ============================
//! Secure token generation for session identifiers.
//! Tokens are drawn from the thread-local CSPRNG and carry no structure.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

/// Default token size in bytes (32 bytes = 256 bits of entropy)
const DEFAULT_TOKEN_BYTES: usize = 32;

/** Generate a cryptographically secure random token
# Returns
A base64 URL-safe encoded string without padding */
pub fn generate_secure_token() -> String {
    generate_secure_token_with_size(DEFAULT_TOKEN_BYTES)
}

/** Generate a cryptographically secure random token with specified size
# Arguments
* `bytes` - The size of the random token in bytes */
pub fn generate_secure_token_with_size(bytes: usize) -> String {
    let mut buffer = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buffer);
    URL_SAFE_NO_PAD.encode(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_generation() {
        let token1 = generate_secure_token();
        let token2 = generate_secure_token();

        assert_ne!(token1, token2);

        // 32 bytes -> 43 base64 characters without padding
        assert_eq!(token1.len(), 43);
        assert!(!token1.contains('='));

        let small_token = generate_secure_token_with_size(16);
        let large_token = generate_secure_token_with_size(64);

        assert!(small_token.len() < token1.len());
        assert!(large_token.len() > token1.len());
    }
}
