// src/services/encryption.rs
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as BASE64, Engine as _};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncryptionError {
    #[error("Encryption secret not configured")]
    SecretNotConfigured,

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid encrypted data format")]
    InvalidDataFormat,
}

/// Authenticated encryption for values handed to the browser.
///
/// AES-256-GCM both hides and signs the payload: anything not produced with
/// the same secret fails to decrypt.
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService")
            .field("cipher", &"<encrypted>")
            .finish()
    }
}

impl EncryptionService {
    /// Derive the AES-256 key from an arbitrary-length secret
    #[allow(deprecated)]
    pub fn from_secret(secret: &str) -> Result<Self, EncryptionError> {
        if secret.is_empty() {
            return Err(EncryptionError::SecretNotConfigured);
        }

        let digest = Sha256::digest(secret.as_bytes());
        let key = aes_gcm::Key::<Aes256Gcm>::from_slice(digest.as_slice());
        let cipher = Aes256Gcm::new(key);

        Ok(Self { cipher })
    }

    /// Generate a new random secret (URL-safe base64 of 32 random bytes)
    #[allow(dead_code)]
    pub fn generate_secret() -> String {
        let mut key = [0u8; 32];
        OsRng.fill_bytes(&mut key);
        BASE64.encode(key)
    }

    /// Encrypt a plaintext string and return URL-safe base64 of nonce + ciphertext
    #[allow(deprecated)]
    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        // Generate random nonce (12 bytes for GCM)
        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| EncryptionError::EncryptionFailed(e.to_string()))?;

        let mut combined = nonce_bytes.to_vec();
        combined.extend_from_slice(&ciphertext);

        Ok(BASE64.encode(combined))
    }

    /// Decrypt a value produced by `encrypt` and return the plaintext
    #[allow(deprecated)]
    pub fn decrypt(&self, encrypted: &str) -> Result<String, EncryptionError> {
        let combined = BASE64
            .decode(encrypted.as_bytes())
            .map_err(|_| EncryptionError::InvalidDataFormat)?;

        if combined.len() < 12 {
            return Err(EncryptionError::InvalidDataFormat);
        }

        let (nonce_bytes, ciphertext) = combined.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext_bytes = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|e| EncryptionError::DecryptionFailed(e.to_string()))?;

        String::from_utf8(plaintext_bytes)
            .map_err(|_| EncryptionError::DecryptionFailed("invalid UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_secret() {
        let secret = EncryptionService::generate_secret();
        assert_eq!(secret.len(), 43);

        let service = EncryptionService::from_secret(&secret);
        assert!(service.is_ok());
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(matches!(
            EncryptionService::from_secret(""),
            Err(EncryptionError::SecretNotConfigured)
        ));
    }

    #[test]
    fn test_encrypt_decrypt() {
        let service = EncryptionService::from_secret("session-secret").unwrap();

        let plaintext = r#"{"userId":"abc123"}"#;
        let encrypted = service.encrypt(plaintext).unwrap();

        assert_ne!(encrypted, plaintext);
        assert!(!encrypted.contains(';') && !encrypted.contains('='));
        assert_eq!(service.decrypt(&encrypted).unwrap(), plaintext);
    }

    #[test]
    fn test_encrypt_produces_different_ciphertext() {
        let service = EncryptionService::from_secret("session-secret").unwrap();

        let encrypted1 = service.encrypt("test_data").unwrap();
        let encrypted2 = service.encrypt("test_data").unwrap();

        // Random nonce per call
        assert_ne!(encrypted1, encrypted2);
        assert_eq!(service.decrypt(&encrypted1).unwrap(), "test_data");
        assert_eq!(service.decrypt(&encrypted2).unwrap(), "test_data");
    }

    #[test]
    fn test_other_secret_cannot_decrypt() {
        let service = EncryptionService::from_secret("secret-one").unwrap();
        let other = EncryptionService::from_secret("secret-two").unwrap();

        let encrypted = service.encrypt("payload").unwrap();
        assert!(matches!(
            other.decrypt(&encrypted),
            Err(EncryptionError::DecryptionFailed(_))
        ));
    }

    #[test]
    fn test_decrypt_invalid_data() {
        let service = EncryptionService::from_secret("session-secret").unwrap();

        assert!(service.decrypt("invalid encrypted data!").is_err());
        assert!(matches!(
            service.decrypt("AAAA"),
            Err(EncryptionError::InvalidDataFormat)
        ));
    }
}
