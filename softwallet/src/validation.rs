use crate::errors::{WalletError, WalletResult};
use once_cell::sync::Lazy;
use regex::Regex;

static PRIVATE_KEY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[xX])?[a-fA-F0-9]{64}$").expect("private key regex"));
static ADDRESS_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^0[xX][a-fA-F0-9]{40}$").expect("address regex"));
static DERIVATION_PATH_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^m(/[0-9]{1,10}'?)*$").expect("derivation path regex"));

const MNEMONIC_WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];
const MAX_MNEMONIC_BYTES: usize = 1024;
const MAX_KEYSTORE_BYTES: usize = 64 * 1024;

/// Syntax checks applied to credential inputs before any cryptography runs.
///
/// Error messages never echo the rejected input.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a hex-encoded secp256k1 private key, with or without `0x`.
    pub fn validate_private_key_hex(&self, key: &str) -> WalletResult<()> {
        if key.is_empty() {
            return Err(WalletError::ValidationError(
                "Private key cannot be empty".to_string(),
            ));
        }

        if !PRIVATE_KEY_PATTERN.is_match(key) {
            return Err(WalletError::ValidationError(
                "Private key must be 64 hexadecimal characters".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate a `0x`-prefixed 20-byte hex address. Checksums are checked by `Address`.
    pub fn validate_address(&self, address: &str) -> WalletResult<()> {
        if address.is_empty() {
            return Err(WalletError::ValidationError(
                "Address cannot be empty".to_string(),
            ));
        }

        if !ADDRESS_PATTERN.is_match(address) {
            return Err(WalletError::ValidationError(
                "Address format is invalid".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate derivation path syntax such as `m/44'/60'/0'/0`.
    pub fn validate_derivation_path(&self, path: &str) -> WalletResult<()> {
        if path.len() > 256 {
            return Err(WalletError::ValidationError(
                "Derivation path too long".to_string(),
            ));
        }

        if !DERIVATION_PATH_PATTERN.is_match(path) {
            return Err(WalletError::ValidationError(format!(
                "Derivation path '{}' is malformed",
                path
            )));
        }

        Ok(())
    }

    /// Validate mnemonic shape (size and word count). Checksum is left to BIP-39 parsing.
    pub fn validate_mnemonic_shape(&self, phrase: &str) -> WalletResult<()> {
        if phrase.len() > MAX_MNEMONIC_BYTES {
            return Err(WalletError::ValidationError(
                "Mnemonic phrase too long".to_string(),
            ));
        }

        let words = phrase.split_whitespace().count();
        if !MNEMONIC_WORD_COUNTS.contains(&words) {
            return Err(WalletError::ValidationError(format!(
                "Invalid word count {}: must be 12, 15, 18, 21, or 24",
                words
            )));
        }

        Ok(())
    }

    pub fn validate_keystore_size(&self, payload: &str) -> WalletResult<()> {
        if payload.trim().is_empty() {
            return Err(WalletError::ValidationError(
                "Keystore payload cannot be empty".to_string(),
            ));
        }

        if payload.len() > MAX_KEYSTORE_BYTES {
            return Err(WalletError::ValidationError(
                "Keystore payload too large".to_string(),
            ));
        }

        Ok(())
    }
}
