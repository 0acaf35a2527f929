//! Per-patient key derivation and ChaCha20-Poly1305 report encryption.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use habitstake_core::AccountId;

use crate::error::{EnvelopeError, Result};

const KEY_CONTEXT: &str = "habitstake-report-v1 encryption key";

/// Fixed and public. Part of the key format, never change it.
const KEY_SALT: &[u8] = b"habitstake_report_salt";

const NONCE_LEN: usize = 12;

/// A 256-bit report key. Deliberately not `Debug`-printable.
#[derive(Clone)]
pub struct ReportKey([u8; 32]);

impl ReportKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for ReportKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ReportKey(..)")
    }
}

impl PartialEq for ReportKey {
    fn eq(&self, other: &Self) -> bool {
        blake3::Hash::from(self.0) == blake3::Hash::from(other.0)
    }
}

impl Eq for ReportKey {}

/// Base64 of `nonce || ciphertext || tag`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CipherText(String);

impl CipherText {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Derive the report key for an account.
///
/// Address spellings that differ only in case derive the same key.
pub fn derive_key(account: &AccountId) -> ReportKey {
    let mut hasher = blake3::Hasher::new_derive_key(KEY_CONTEXT);
    hasher.update(account.normalized().as_bytes());
    hasher.update(KEY_SALT);
    ReportKey(*hasher.finalize().as_bytes())
}

fn cipher_for(key: &ReportKey) -> std::result::Result<ChaCha20Poly1305, String> {
    ChaCha20Poly1305::new_from_slice(key.as_bytes()).map_err(|e| e.to_string())
}

/// Encrypt a report for `account` under a fresh random nonce.
pub fn encrypt(plaintext: &str, account: &AccountId) -> Result<CipherText> {
    let cipher = cipher_for(&derive_key(account)).map_err(EnvelopeError::Encryption)?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let sealed = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|e| EnvelopeError::Encryption(e.to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(CipherText(STANDARD.encode(out)))
}

/// Decrypt a report with the key for `account`.
///
/// Fails with [`EnvelopeError::Decryption`] on bad base64, a truncated
/// payload, a wrong key or a tampered ciphertext.
pub fn decrypt(cipher_text: &CipherText, account: &AccountId) -> Result<String> {
    let raw = STANDARD
        .decode(cipher_text.as_str())
        .map_err(|e| EnvelopeError::Decryption(format!("invalid base64: {e}")))?;

    if raw.len() <= NONCE_LEN {
        return Err(EnvelopeError::Decryption("ciphertext too short".into()));
    }
    let (nonce, sealed) = raw.split_at(NONCE_LEN);

    let cipher = cipher_for(&derive_key(account)).map_err(EnvelopeError::Decryption)?;
    let plain = cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| EnvelopeError::Decryption("authentication failed".into()))?;

    String::from_utf8(plain).map_err(|e| EnvelopeError::Decryption(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALICE: &str = "0x8ba1f109551bD432803012645Ac136ddd64DBA72";
    const BOB: &str = "0x2222222222222222222222222222222222222222";

    #[test]
    fn test_key_is_deterministic() {
        let a = AccountId::new(ALICE);
        assert_eq!(derive_key(&a), derive_key(&a));
        assert_ne!(derive_key(&a), derive_key(&AccountId::new(BOB)));
    }

    #[test]
    fn test_key_ignores_address_case() {
        let mixed = AccountId::new(ALICE);
        let lower = AccountId::new(ALICE.to_lowercase());
        assert_eq!(derive_key(&mixed), derive_key(&lower));
    }

    #[test]
    fn test_key_debug_is_redacted() {
        let key = derive_key(&AccountId::new(ALICE));
        assert_eq!(format!("{key:?}"), "ReportKey(..)");
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let alice = AccountId::new(ALICE);
        let cipher = encrypt("session notes", &alice).unwrap();
        assert_eq!(decrypt(&cipher, &alice).unwrap(), "session notes");
    }

    #[test]
    fn test_nonce_is_fresh_per_encryption() {
        let alice = AccountId::new(ALICE);
        let a = encrypt("same", &alice).unwrap();
        let b = encrypt("same", &alice).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_account_fails() {
        let cipher = encrypt("private", &AccountId::new(ALICE)).unwrap();
        let err = decrypt(&cipher, &AccountId::new(BOB)).unwrap_err();
        assert!(matches!(err, EnvelopeError::Decryption(_)));
    }

    #[test]
    fn test_malformed_ciphertext_fails() {
        let alice = AccountId::new(ALICE);
        assert!(decrypt(&CipherText::new("not base64!"), &alice).is_err());
        assert!(decrypt(&CipherText::new(STANDARD.encode([0u8; 8])), &alice).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let alice = AccountId::new(ALICE);
        let cipher = encrypt("private", &alice).unwrap();
        let mut raw = STANDARD.decode(cipher.as_str()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = CipherText::new(STANDARD.encode(raw));
        assert!(decrypt(&tampered, &alice).is_err());
    }

    proptest! {
        #[test]
        fn test_roundtrip_any_plaintext(plaintext in ".*", body in "[0-9a-fA-F]{40}") {
            let account = AccountId::new(format!("0x{body}"));
            let cipher = encrypt(&plaintext, &account).unwrap();
            prop_assert_eq!(decrypt(&cipher, &account).unwrap(), plaintext);
        }

        #[test]
        fn test_roundtrip_non_address_ids(plaintext in ".{0,64}", id in "[a-z0-9_-]{1,32}") {
            let account = AccountId::new(id);
            let cipher = encrypt(&plaintext, &account).unwrap();
            prop_assert_eq!(decrypt(&cipher, &account).unwrap(), plaintext);
        }
    }
}
