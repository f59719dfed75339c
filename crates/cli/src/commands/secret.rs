//! Secret codec commands.
//!
//! # Environment Variables
//!
//! - `BRICKYARD_ENCRYPTION_SECRET` - Operator passphrase (same as the server)

use std::io::Read;

use brickyard_app::config::{self, ConfigError};
use brickyard_app::crypto::{CodecError, SecretCodec};
use thiserror::Error;

/// Errors that can occur in secret commands.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Failed to read stdin: {0}")]
    Stdin(#[from] std::io::Error),

    #[error("No input given")]
    EmptyInput,
}

/// Encrypt a value and print the token.
///
/// # Errors
///
/// Returns `SecretError` if the secret is not configured or input is empty.
pub fn encrypt(value: Option<String>) -> Result<(), SecretError> {
    let plaintext = input(value)?;
    let token = codec()?.encrypt(&plaintext)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{token}");
    }
    Ok(())
}

/// Decrypt a token and print the plaintext.
///
/// # Errors
///
/// Returns `SecretError` if the secret is not configured or the token is
/// malformed or fails authentication.
pub fn decrypt(token: Option<String>) -> Result<(), SecretError> {
    let token = input(token)?;
    let plaintext = codec()?.decrypt(&token)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{plaintext}");
    }
    Ok(())
}

fn codec() -> Result<SecretCodec, SecretError> {
    let secret = config::encryption_secret_from_env()?;
    Ok(SecretCodec::new(secret.as_ref())?)
}

/// Use the argument if given, otherwise read stdin. Trailing newlines are dropped.
fn input(value: Option<String>) -> Result<String, SecretError> {
    let raw = match value {
        Some(v) => v,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    let trimmed = raw.trim_end_matches(['\r', '\n']);
    if trimmed.is_empty() {
        return Err(SecretError::EmptyInput);
    }
    Ok(trimmed.to_string())
}
