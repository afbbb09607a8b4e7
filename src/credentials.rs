//! Plaintext-in / plaintext-out credential operations.
//!
//! Composes the cipher and the store so that callers never see ciphertext
//! and storage never sees plaintext. Authorization is the caller's job —
//! handlers must have checked admin permissions before calling `set` or
//! `remove`.

use crate::store::{SecretName, SecretStore};
use crate::vault::{SecretCipher, VaultError};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Caller-supplied secret fails its format check. Reported to the
    /// immediate caller only.
    #[error("{0}")]
    Validation(String),
    /// Stored ciphertext cannot be read with the current master key.
    /// Distinct from absence: the admin must reset the secret.
    #[error("stored secret cannot be decrypted with the current master key")]
    Decryption,
    /// Store failure. Writes are idempotent, so retrying is safe.
    #[error("secret store error: {0}")]
    Store(#[from] anyhow::Error),
}

pub struct CredentialService {
    store: SecretStore,
    cipher: SecretCipher,
}

impl CredentialService {
    pub fn new(store: SecretStore, cipher: SecretCipher) -> Self {
        Self { store, cipher }
    }

    /// Validate, encrypt and upsert a credential.
    pub fn set(
        &self,
        tenant_id: &str,
        name: SecretName,
        plaintext: &str,
    ) -> Result<(), CredentialError> {
        validate(name, plaintext)?;
        let ciphertext = self
            .cipher
            .encrypt(plaintext)
            .map_err(|e| CredentialError::Store(e.into()))?;
        self.store.put(tenant_id, name, &ciphertext)?;
        Ok(())
    }

    /// Fetch and decrypt a credential. `Ok(None)` means no secret is
    /// configured — a normal state, not a fault.
    pub fn get_plaintext(
        &self,
        tenant_id: &str,
        name: SecretName,
    ) -> Result<Option<String>, CredentialError> {
        let Some(ciphertext) = self.store.get(tenant_id, name)? else {
            return Ok(None);
        };
        match self.cipher.decrypt(&ciphertext) {
            Ok(plaintext) => Ok(Some(plaintext)),
            Err(VaultError::Malformed(_) | VaultError::Decryption | VaultError::Encryption) => {
                Err(CredentialError::Decryption)
            }
        }
    }

    /// Delete a credential, reporting whether one existed.
    pub fn remove(&self, tenant_id: &str, name: SecretName) -> Result<bool, CredentialError> {
        Ok(self.store.delete(tenant_id, name)?)
    }

    /// Tenants holding a secret of the given name (startup enumeration).
    pub fn tenants_with(&self, name: SecretName) -> Result<Vec<String>, CredentialError> {
        Ok(self.store.list_tenants_with(name)?)
    }
}

fn validate(name: SecretName, plaintext: &str) -> Result<(), CredentialError> {
    match name {
        SecretName::LlmApiKey => {
            if !plaintext.starts_with("gsk_") || plaintext.len() < 20 {
                return Err(CredentialError::Validation(
                    "that does not look like a valid Groq API key (keys start with gsk_)".into(),
                ));
            }
        }
        SecretName::BotToken => {
            if plaintext.len() < 32 || plaintext.chars().any(char::is_whitespace) {
                return Err(CredentialError::Validation(
                    "that does not look like a valid bot token".into(),
                ));
            }
        }
    }
    Ok(())
}
