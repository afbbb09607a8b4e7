//! Symmetric encryption of secret material before it ever reaches storage.
//!
//! Each call generates a fresh random 24-byte nonce, so encrypting the same
//! plaintext twice yields different tokens that both decrypt identically.
//! The Poly1305 tag makes tampering and wrong-key decryption detectable.
//! Token format: `{nonce_hex}:{ciphertext_hex}`.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use rand::RngExt;

/// XChaCha20-Poly1305 nonce length in bytes.
const NONCE_LEN: usize = 24;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("malformed ciphertext token: {0}")]
    Malformed(&'static str),
    #[error("decryption failed (wrong master key or tampered data)")]
    Decryption,
    #[error("encryption failed")]
    Encryption,
}

/// Encrypts and decrypts opaque secret strings with a fixed 32-byte master
/// key. Plaintext and key material never appear in logs or error messages.
#[derive(Clone)]
pub struct SecretCipher {
    key: [u8; 32],
}

impl SecretCipher {
    pub fn new(key: [u8; 32]) -> Self {
        Self { key }
    }

    /// Encrypt a plaintext secret into a `{nonce_hex}:{ciphertext_hex}` token.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let cipher = XChaCha20Poly1305::new((&self.key).into());
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| VaultError::Encryption)?;

        Ok(format!(
            "{}:{}",
            hex::encode(nonce_bytes),
            hex::encode(ciphertext)
        ))
    }

    /// Decrypt a token produced by [`encrypt`](Self::encrypt).
    ///
    /// Splits on the first `:`, so ciphertext of plaintexts containing `:`
    /// is unaffected. Malformed tokens (missing separator, bad hex, wrong
    /// nonce length) and failed tag checks are distinct from absence, which
    /// is the caller's concern.
    pub fn decrypt(&self, token: &str) -> Result<String, VaultError> {
        let (nonce_hex, ct_hex) = token
            .split_once(':')
            .ok_or(VaultError::Malformed("missing ':' separator"))?;

        let nonce_bytes =
            hex::decode(nonce_hex).map_err(|_| VaultError::Malformed("nonce is not valid hex"))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(VaultError::Malformed("wrong nonce length"));
        }
        let ciphertext =
            hex::decode(ct_hex).map_err(|_| VaultError::Malformed("ciphertext is not valid hex"))?;

        let cipher = XChaCha20Poly1305::new((&self.key).into());
        let nonce = XNonce::from_slice(&nonce_bytes);

        let plaintext = cipher
            .decrypt(nonce, ciphertext.as_ref())
            .map_err(|_| VaultError::Decryption)?;

        String::from_utf8(plaintext).map_err(|_| VaultError::Decryption)
    }
}

impl std::fmt::Debug for SecretCipher {
    // Never expose key material, even in debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> SecretCipher {
        SecretCipher::new([0xAA; 32])
    }

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let c = cipher();
        let secret = "gsk_abcdef0123456789ABCDEF";
        let token = c.encrypt(secret).unwrap();
        assert_ne!(token, secret);
        assert_eq!(c.decrypt(&token).unwrap(), secret);
    }

    #[test]
    fn roundtrip_empty_string() {
        let c = cipher();
        let token = c.encrypt("").unwrap();
        assert_eq!(c.decrypt(&token).unwrap(), "");
    }

    #[test]
    fn roundtrip_plaintext_containing_separator() {
        let c = cipher();
        let secret = "left:middle:right";
        let token = c.encrypt(secret).unwrap();
        assert_eq!(c.decrypt(&token).unwrap(), secret);
    }

    #[test]
    fn roundtrip_unicode() {
        let c = cipher();
        let secret = "clé-日本語-🦀";
        let token = c.encrypt(secret).unwrap();
        assert_eq!(c.decrypt(&token).unwrap(), secret);
    }

    #[test]
    fn nonce_is_fresh_per_call() {
        let c = cipher();
        let t1 = c.encrypt("same-data").unwrap();
        let t2 = c.encrypt("same-data").unwrap();
        assert_ne!(t1, t2);
        assert_eq!(c.decrypt(&t1).unwrap(), "same-data");
        assert_eq!(c.decrypt(&t2).unwrap(), "same-data");
    }

    #[test]
    fn token_shape_is_nonce_colon_ciphertext() {
        let c = cipher();
        let token = c.encrypt("shape").unwrap();
        let (nonce_hex, ct_hex) = token.split_once(':').unwrap();
        assert_eq!(nonce_hex.len(), NONCE_LEN * 2);
        assert!(!ct_hex.is_empty());
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let c = cipher();
        let token = c.encrypt("sensitive-data").unwrap();
        let (nonce_hex, ct_hex) = token.split_once(':').unwrap();
        let mut ct = hex::decode(ct_hex).unwrap();
        ct[0] ^= 0xff;
        let tampered = format!("{}:{}", nonce_hex, hex::encode(ct));
        assert!(matches!(c.decrypt(&tampered), Err(VaultError::Decryption)));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let token = cipher().encrypt("secret").unwrap();
        let other = SecretCipher::new([0xBB; 32]);
        assert!(matches!(other.decrypt(&token), Err(VaultError::Decryption)));
    }

    #[test]
    fn missing_separator_is_malformed() {
        assert!(matches!(
            cipher().decrypt("deadbeef"),
            Err(VaultError::Malformed(_))
        ));
    }

    #[test]
    fn odd_length_hex_is_malformed() {
        let nonce_hex = "ab".repeat(NONCE_LEN);
        assert!(matches!(
            cipher().decrypt(&format!("{nonce_hex}:abc")),
            Err(VaultError::Malformed(_))
        ));
    }

    #[test]
    fn wrong_nonce_length_is_malformed() {
        assert!(matches!(
            cipher().decrypt("aabbccdd:deadbeef"),
            Err(VaultError::Malformed(_))
        ));
    }

    #[test]
    fn debug_output_hides_key() {
        let repr = format!("{:?}", cipher());
        assert!(!repr.contains("aa"));
        assert!(!repr.contains("170"));
    }
}
