//! Secret codec for integration API keys stored at rest.
//!
//! Tokens are AES-256-GCM encrypted and serialized as
//! `base64(nonce) "." base64(ciphertext) "." base64(tag)` with a 12-byte nonce
//! and a 16-byte tag. This format is persisted in the database, so it must stay
//! byte-compatible with previously stored values.

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use thiserror::Error;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const KEY_LEN: usize = 32;
const SEPARATOR: char = '.';

/// Errors that can occur during secret encryption or decryption.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The operator secret is missing.
    #[error("encryption secret is not configured")]
    Configuration,

    /// The token does not have exactly three parts.
    #[error("malformed token: expected 3 parts, got {0}")]
    Format(usize),

    /// The token could not be decoded or failed tag verification.
    #[error("token failed authentication")]
    Authentication,

    /// The cipher refused to encrypt.
    #[error("encryption failed")]
    Encryption,
}

/// Encrypts and decrypts small secret strings.
///
/// The key is derived once from the operator passphrase: used verbatim if it
/// is exactly 32 bytes, otherwise hashed with SHA-256.
#[derive(Clone)]
pub struct SecretCodec {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for SecretCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCodec")
            .field("cipher", &"[REDACTED]")
            .finish()
    }
}

impl SecretCodec {
    /// Build a codec from the operator secret.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Configuration` if the secret is absent or empty.
    pub fn new(secret: Option<&SecretString>) -> Result<Self, CodecError> {
        let secret = secret
            .map(|s| s.expose_secret())
            .filter(|s| !s.is_empty())
            .ok_or(CodecError::Configuration)?;

        let key = derive_key(secret.as_bytes());
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|_| CodecError::Configuration)?;
        Ok(Self { cipher })
    }

    /// Encrypt a plaintext into a `nonce.ciphertext.tag` token.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encryption` if the cipher fails.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CodecError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rng().fill(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        // aes-gcm appends the tag to the ciphertext
        let sealed = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CodecError::Encryption)?;
        let split = sealed
            .len()
            .checked_sub(TAG_LEN)
            .ok_or(CodecError::Encryption)?;
        let (ciphertext, tag) = sealed.split_at(split);

        Ok(format!(
            "{}{SEPARATOR}{}{SEPARATOR}{}",
            BASE64.encode(nonce_bytes),
            BASE64.encode(ciphertext),
            BASE64.encode(tag)
        ))
    }

    /// Decrypt a token produced by [`SecretCodec::encrypt`].
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Format` if the token does not have three parts and
    /// `CodecError::Authentication` if any part fails to decode, has the wrong
    /// length, or the tag does not verify.
    pub fn decrypt(&self, token: &str) -> Result<String, CodecError> {
        let parts: Vec<&str> = token.split(SEPARATOR).collect();
        let [nonce_b64, ciphertext_b64, tag_b64] = parts.as_slice() else {
            return Err(CodecError::Format(parts.len()));
        };

        let nonce_bytes = decode_part(nonce_b64)?;
        let ciphertext = decode_part(ciphertext_b64)?;
        let tag = decode_part(tag_b64)?;

        if nonce_bytes.len() != NONCE_LEN || tag.len() != TAG_LEN {
            return Err(CodecError::Authentication);
        }

        let mut sealed = ciphertext;
        sealed.extend_from_slice(&tag);

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), sealed.as_slice())
            .map_err(|_| CodecError::Authentication)?;

        String::from_utf8(plaintext).map_err(|_| CodecError::Authentication)
    }
}

fn derive_key(secret: &[u8]) -> [u8; KEY_LEN] {
    if let Ok(key) = <[u8; KEY_LEN]>::try_from(secret) {
        return key;
    }
    Sha256::digest(secret).into()
}

fn decode_part(part: &str) -> Result<Vec<u8>, CodecError> {
    BASE64.decode(part).map_err(|_| CodecError::Authentication)
}
