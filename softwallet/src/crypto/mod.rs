//! Cryptographic collaborators.
//!
//! The resolver and pager only see the traits below. The default
//! implementations cover secp256k1 private keys, BIP-39/BIP-32 mnemonics
//! and Web3 Secret Storage v3 keystores.

use std::ops::Range;

use async_trait::async_trait;
use secrecy::SecretString;
use sha3::{Digest, Keccak256};

use crate::account::{Account, Address};
use crate::errors::CryptoError;
use crate::path::DerivationPath;
use crate::secret::Seed;

pub mod hd;
pub mod keys;
pub mod keystore;

pub use hd::Bip39Derivation;
pub use keys::Secp256k1Keys;
pub use keystore::{KeystoreParams, Web3Keystore};

/// Private key to account conversion.
pub trait KeyDerivation: Send + Sync {
    fn from_private_key(&self, key: &SecretString) -> Result<Account, CryptoError>;
}

/// Mnemonic seed generation and HD derivation.
#[async_trait]
pub trait MnemonicDerivation: Send + Sync {
    /// Compute the seed. Implementations should keep the iterated KDF off the async scheduler.
    async fn seed(
        &self,
        phrase: &SecretString,
        password: Option<&SecretString>,
    ) -> Result<Seed, CryptoError>;

    fn derive_account(
        &self,
        seed: &Seed,
        path: &DerivationPath,
        index: u32,
    ) -> Result<Account, CryptoError>;

    fn derive_address(
        &self,
        seed: &Seed,
        path: &DerivationPath,
        index: u32,
    ) -> Result<Address, CryptoError> {
        self.derive_account(seed, path, index)
            .map(Account::into_address)
    }

    /// Derive a contiguous run of addresses. Any single failure fails the whole run.
    fn derive_addresses(
        &self,
        seed: &Seed,
        path: &DerivationPath,
        indices: Range<u32>,
    ) -> Result<Vec<Address>, CryptoError> {
        indices
            .map(|index| self.derive_address(seed, path, index))
            .collect()
    }
}

/// Keystore payload decryption.
#[async_trait]
pub trait KeystoreDecryption: Send + Sync {
    async fn recover(&self, payload: &str, password: &SecretString)
        -> Result<Account, CryptoError>;
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Keccak256::digest(data));
    out
}
