// crates/backend-lib/tests/verifier.rs
use secrets_backend_lib::auth::{CredentialVerifier, StorageMode, VerifierError};
use secrets_backend_lib::config::AuthSettings;

const TEST_KEY: &str = "MDEyMzQ1Njc4OWFiY2RlZjAxMjM0NTY3ODlhYmNkZWY=";

const SAMPLES: [&str; 6] = [
    "correct-horse",
    "Correct-Horse",
    " padded ",
    "unicode-pässwörd-🔑",
    "x",
    "a much longer passphrase with spaces and punctuation!?",
];

fn verifier(mode: StorageMode) -> CredentialVerifier {
    CredentialVerifier::from_settings(&AuthSettings {
        mode,
        secret_key: Some(TEST_KEY.to_string()),
        cost_factor: 4,
    })
    .unwrap()
}

fn all_modes() -> [CredentialVerifier; 3] {
    [
        verifier(StorageMode::Plain),
        verifier(StorageMode::ReversibleEncryption),
        verifier(StorageMode::OneWayHash),
    ]
}

/// Swap one character for a different base64 character
fn tamper(material: &str, idx: usize) -> String {
    let mut chars: Vec<char> = material.chars().collect();
    chars[idx] = if chars[idx] == 'A' { 'B' } else { 'A' };
    chars.into_iter().collect()
}

#[tokio::test]
async fn test_round_trip_in_every_mode() {
    for verifier in all_modes() {
        for secret in SAMPLES {
            let material = verifier.encode(secret).await.unwrap();
            assert!(
                verifier.verify(secret, &material).await,
                "{} failed round trip for {secret:?}",
                verifier.mode()
            );
        }
    }
}

#[tokio::test]
async fn test_distinct_secrets_never_match() {
    for verifier in all_modes() {
        for stored in SAMPLES {
            let material = verifier.encode(stored).await.unwrap();
            for submitted in SAMPLES.iter().filter(|s| **s != stored) {
                assert!(
                    !verifier.verify(submitted, &material).await,
                    "{} matched {submitted:?} against {stored:?}",
                    verifier.mode()
                );
            }
        }
    }
}

#[tokio::test]
async fn test_hash_mode_salts_every_encoding() {
    let verifier = verifier(StorageMode::OneWayHash);

    let first = verifier.encode("correct-horse").await.unwrap();
    let second = verifier.encode("correct-horse").await.unwrap();

    assert_ne!(first, second);
    assert!(verifier.verify("correct-horse", &first).await);
    assert!(verifier.verify("correct-horse", &second).await);
}

#[tokio::test]
async fn test_encryption_mode_verifies_its_own_output() {
    let verifier = verifier(StorageMode::ReversibleEncryption);

    for _ in 0..4 {
        let material = verifier.encode("correct-horse").await.unwrap();
        assert_ne!(material, "correct-horse");
        assert!(verifier.verify("correct-horse", &material).await);
    }
}

#[tokio::test]
async fn test_tampered_material_never_verifies() {
    for verifier in all_modes() {
        let material = verifier.encode("correct-horse").await.unwrap();

        for idx in [0, material.len() / 2, material.len() - 2] {
            let tampered = tamper(&material, idx);
            assert!(
                !verifier.verify("correct-horse", &tampered).await,
                "{} accepted material tampered at {idx}",
                verifier.mode()
            );
        }
    }
}

#[tokio::test]
async fn test_material_from_another_key_is_a_decryption_error() {
    let verifier = verifier(StorageMode::ReversibleEncryption);
    let other = CredentialVerifier::from_settings(&AuthSettings {
        mode: StorageMode::ReversibleEncryption,
        secret_key: Some(secrets_backend_lib::auth::EncryptedCodec::generate_key()),
        cost_factor: 4,
    })
    .unwrap();

    let material = other.encode("correct-horse").await.unwrap();
    assert!(matches!(
        verifier.try_verify("correct-horse", &material).await,
        Err(VerifierError::Decryption(_))
    ));
    assert!(!verifier.verify("correct-horse", &material).await);
}
