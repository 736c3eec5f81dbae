use std::ops::Range;

use async_trait::async_trait;
use bip39::{Language, Mnemonic};
use coins_bip32::xkeys::{Parent, XPriv};
use k256::ecdsa::SigningKey;
use secrecy::{ExposeSecret, SecretString};
use zeroize::{Zeroize, Zeroizing};

use super::MnemonicDerivation;
use crate::account::{Account, Address};
use crate::errors::CryptoError;
use crate::path::DerivationPath;
use crate::secret::{Seed, SigningMaterial};
use crate::validation::InputValidator;

/// BIP-39 seeds with BIP-32 secp256k1 child derivation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bip39Derivation;

impl Bip39Derivation {
    pub fn new() -> Self {
        Self
    }

    fn branch(seed: &Seed, path: &DerivationPath) -> Result<XPriv, CryptoError> {
        let mut key = XPriv::root_from_seed(seed.as_bytes(), None)
            .map_err(|e| CryptoError::new(format!("master key derivation failed: {e}")))?;
        for segment in path.segments() {
            key = key
                .derive_child(*segment)
                .map_err(|e| CryptoError::new(format!("child derivation failed: {e}")))?;
        }
        Ok(key)
    }

    fn child_account(branch: &XPriv, index: u32) -> Result<Account, CryptoError> {
        if index >= crate::path::HARDENED_OFFSET {
            return Err(CryptoError::new(format!(
                "account index {index} is outside the non-hardened range"
            )));
        }
        let child = branch
            .derive_child(index)
            .map_err(|e| CryptoError::new(format!("child derivation failed: {e}")))?;
        let signing_key: &SigningKey = child.as_ref();
        Ok(Account::from_signing_material(
            SigningMaterial::from_signing_key(signing_key.clone()),
        ))
    }
}

#[async_trait]
impl MnemonicDerivation for Bip39Derivation {
    async fn seed(
        &self,
        phrase: &SecretString,
        password: Option<&SecretString>,
    ) -> Result<Seed, CryptoError> {
        let phrase = Zeroizing::new(phrase.expose_secret().trim().to_string());
        let password = Zeroizing::new(
            password
                .map(|p| p.expose_secret().to_string())
                .unwrap_or_default(),
        );

        tokio::task::spawn_blocking(move || {
            InputValidator::new()
                .validate_mnemonic_shape(&phrase)
                .map_err(|e| CryptoError::new(e.to_string()))?;
            let mnemonic = Mnemonic::parse_in_normalized(Language::English, &phrase)
                .map_err(|e| CryptoError::new(format!("invalid mnemonic: {e}")))?;

            let mut bytes = mnemonic.to_seed(password.as_str());
            let seed = Seed::from_bytes(bytes);
            bytes.zeroize();
            Ok(seed)
        })
        .await
        .map_err(|e| CryptoError::new(format!("seed derivation task failed: {e}")))?
    }

    fn derive_account(
        &self,
        seed: &Seed,
        path: &DerivationPath,
        index: u32,
    ) -> Result<Account, CryptoError> {
        let branch = Self::branch(seed, path)?;
        Self::child_account(&branch, index)
    }

    fn derive_addresses(
        &self,
        seed: &Seed,
        path: &DerivationPath,
        indices: Range<u32>,
    ) -> Result<Vec<Address>, CryptoError> {
        // Walk the branch once; only the final segment differs per index.
        let branch = Self::branch(seed, path)?;
        indices
            .map(|index| Self::child_account(&branch, index).map(Account::into_address))
            .collect()
    }
}
