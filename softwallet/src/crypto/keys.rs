use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use super::KeyDerivation;
use crate::account::Account;
use crate::errors::CryptoError;
use crate::secret::{SigningMaterial, PRIVATE_KEY_LEN};
use crate::validation::InputValidator;

/// Hex-encoded secp256k1 private keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Keys;

impl Secp256k1Keys {
    pub fn new() -> Self {
        Self
    }
}

impl KeyDerivation for Secp256k1Keys {
    fn from_private_key(&self, key: &SecretString) -> Result<Account, CryptoError> {
        let raw = key.expose_secret().trim();
        InputValidator::new()
            .validate_private_key_hex(raw)
            .map_err(|e| CryptoError::new(e.to_string()))?;

        let body = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        let mut bytes = Zeroizing::new([0u8; PRIVATE_KEY_LEN]);
        hex::decode_to_slice(body, &mut bytes[..])
            .map_err(|_| CryptoError::new("private key is not valid hex"))?;

        let signing = SigningMaterial::from_slice(&bytes[..])?;
        Ok(Account::from_signing_material(signing))
    }
}
