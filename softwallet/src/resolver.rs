use std::fmt;
use std::sync::Arc;

use secrecy::SecretString;

use crate::account::Account;
use crate::crypto::{
    Bip39Derivation, KeyDerivation, KeystoreDecryption, MnemonicDerivation, Secp256k1Keys,
    Web3Keystore,
};
use crate::errors::ResolveError;
use crate::path::DerivationPath;

/// One credential source. The variant is the only dispatch key.
pub enum Credential {
    /// Hex-encoded secp256k1 private key, `0x` prefix optional.
    PrivateKey(SecretString),
    Mnemonic {
        phrase: SecretString,
        password: Option<SecretString>,
        path: DerivationPath,
        index: u32,
    },
    /// Web3 v3 keystore JSON.
    Keystore {
        payload: String,
        password: SecretString,
    },
}

impl Credential {
    pub fn kind(&self) -> &'static str {
        match self {
            Credential::PrivateKey(_) => "private-key",
            Credential::Mnemonic { .. } => "mnemonic",
            Credential::Keystore { .. } => "keystore",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::PrivateKey(_) => f.write_str("Credential::PrivateKey(<redacted>)"),
            Credential::Mnemonic { path, index, .. } => f
                .debug_struct("Credential::Mnemonic")
                .field("phrase", &"<redacted>")
                .field("path", path)
                .field("index", index)
                .finish(),
            Credential::Keystore { .. } => f.write_str("Credential::Keystore(<redacted>)"),
        }
    }
}

/// Informational notices raised during resolution. Never errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    DirectPrivateKeyUse,
}

impl Advisory {
    pub fn message(&self) -> &'static str {
        match self {
            Advisory::DirectPrivateKeyUse => {
                "Private key is being used directly. Even though it is handled with care, \
                 avoid this in production environments."
            }
        }
    }
}

pub trait AdvisorySink: Send + Sync {
    fn advise(&self, advisory: Advisory);
}

/// Forwards advisories to the `log` facade at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAdvisorySink;

impl AdvisorySink for LogAdvisorySink {
    fn advise(&self, advisory: Advisory) {
        log::warn!("ATTENTION: {}", advisory.message());
    }
}

/// Drops every advisory.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentAdvisorySink;

impl AdvisorySink for SilentAdvisorySink {
    fn advise(&self, _advisory: Advisory) {}
}

/// Turns credentials into accounts through the configured collaborators.
#[derive(Clone)]
pub struct CredentialResolver {
    keys: Arc<dyn KeyDerivation>,
    mnemonic: Arc<dyn MnemonicDerivation>,
    keystore: Arc<dyn KeystoreDecryption>,
    advisories: Arc<dyn AdvisorySink>,
}

impl CredentialResolver {
    pub fn new(
        keys: Arc<dyn KeyDerivation>,
        mnemonic: Arc<dyn MnemonicDerivation>,
        keystore: Arc<dyn KeystoreDecryption>,
        advisories: Arc<dyn AdvisorySink>,
    ) -> Self {
        Self {
            keys,
            mnemonic,
            keystore,
            advisories,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            Arc::new(Secp256k1Keys::new()),
            Arc::new(Bip39Derivation::new()),
            Arc::new(Web3Keystore::new()),
            Arc::new(LogAdvisorySink),
        )
    }

    pub fn with_advisory_sink(mut self, advisories: Arc<dyn AdvisorySink>) -> Self {
        self.advisories = advisories;
        self
    }

    pub fn key_derivation(&self) -> Arc<dyn KeyDerivation> {
        Arc::clone(&self.keys)
    }

    pub fn mnemonic_derivation(&self) -> Arc<dyn MnemonicDerivation> {
        Arc::clone(&self.mnemonic)
    }

    pub fn keystore_decryption(&self) -> Arc<dyn KeystoreDecryption> {
        Arc::clone(&self.keystore)
    }

    pub async fn resolve(&self, credential: &Credential) -> Result<Account, ResolveError> {
        let account = match credential {
            Credential::PrivateKey(key) => self.resolve_private_key(key)?,
            Credential::Mnemonic {
                phrase,
                password,
                path,
                index,
            } => {
                self.resolve_mnemonic(phrase, password.as_ref(), path, *index)
                    .await?
            }
            Credential::Keystore { payload, password } => {
                self.resolve_keystore(payload, password).await?
            }
        };

        log::debug!(
            "Resolved {} credential to {}",
            credential.kind(),
            account.address()
        );
        Ok(account)
    }

    fn resolve_private_key(&self, key: &SecretString) -> Result<Account, ResolveError> {
        self.advisories.advise(Advisory::DirectPrivateKeyUse);
        self.keys
            .from_private_key(key)
            .map_err(|e| ResolveError::InvalidPrivateKey(e.0))
    }

    async fn resolve_mnemonic(
        &self,
        phrase: &SecretString,
        password: Option<&SecretString>,
        path: &DerivationPath,
        index: u32,
    ) -> Result<Account, ResolveError> {
        let seed = self
            .mnemonic
            .seed(phrase, password)
            .await
            .map_err(|e| ResolveError::InvalidMnemonic(e.0))?;
        self.mnemonic
            .derive_account(&seed, path, index)
            .map_err(|e| ResolveError::InvalidMnemonic(e.0))
    }

    async fn resolve_keystore(
        &self,
        payload: &str,
        password: &SecretString,
    ) -> Result<Account, ResolveError> {
        self.keystore.recover(payload, password).await.map_err(|e| {
            log::debug!("Keystore recovery failed: {}", e);
            ResolveError::DecryptionFailed
        })
    }
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keystore::PBKDF2_TEST_VECTOR;
    use parking_lot::Mutex;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<Advisory>>);

    impl AdvisorySink for RecordingSink {
        fn advise(&self, advisory: Advisory) {
            self.0.lock().push(advisory);
        }
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn resolver_with(sink: Arc<RecordingSink>) -> CredentialResolver {
        CredentialResolver::with_defaults().with_advisory_sink(sink)
    }

    #[tokio::test]
    async fn private_key_is_stable_and_advised() {
        let sink = Arc::new(RecordingSink::default());
        let resolver = resolver_with(Arc::clone(&sink));
        let credential = Credential::PrivateKey(secret(KEY));

        let first = resolver.resolve(&credential).await.unwrap();
        let second = resolver.resolve(&credential).await.unwrap();
        assert_eq!(first.address(), second.address());
        assert_eq!(
            first.address().to_string(),
            "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"
        );
        assert_eq!(
            *sink.0.lock(),
            vec![Advisory::DirectPrivateKeyUse, Advisory::DirectPrivateKeyUse]
        );
    }

    #[tokio::test]
    async fn malformed_private_keys_fail() {
        let resolver = CredentialResolver::with_defaults()
            .with_advisory_sink(Arc::new(SilentAdvisorySink));
        for bad in [
            "0x1234".to_string(),
            format!("0x{}", "zz".repeat(32)),
            format!("0x{}", "0".repeat(64)),
            format!("{}00", KEY),
        ] {
            let err = resolver
                .resolve(&Credential::PrivateKey(secret(&bad)))
                .await
                .unwrap_err();
            assert!(matches!(err, ResolveError::InvalidPrivateKey(_)), "{bad}");
        }
    }

    #[tokio::test]
    async fn mnemonic_resolves_reference_vector_without_advisory() {
        let sink = Arc::new(RecordingSink::default());
        let resolver = resolver_with(Arc::clone(&sink));
        let credential = Credential::Mnemonic {
            phrase: secret(PHRASE),
            password: Some(secret("")),
            path: DerivationPath::parse("m/44'/60'/0'/0").unwrap(),
            index: 0,
        };

        let account = resolver.resolve(&credential).await.unwrap();
        assert_eq!(
            account.address().to_string(),
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );
        assert!(sink.0.lock().is_empty());
    }

    #[tokio::test]
    async fn bad_mnemonic_fails() {
        let resolver = CredentialResolver::with_defaults();
        let credential = Credential::Mnemonic {
            phrase: secret("not a real mnemonic phrase at all"),
            password: None,
            path: DerivationPath::ethereum(),
            index: 0,
        };
        let err = resolver.resolve(&credential).await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidMnemonic(_)));
    }

    #[tokio::test]
    async fn keystore_resolves_and_wrong_password_fails() {
        let resolver = CredentialResolver::with_defaults();
        let good = Credential::Keystore {
            payload: PBKDF2_TEST_VECTOR.to_string(),
            password: secret("testpassword"),
        };
        let account = resolver.resolve(&good).await.unwrap();
        assert_eq!(
            account.address().to_lower_hex(),
            "0x008aeeda4d805471df9b2a5b0f38a0c3bcba786b"
        );

        let bad = Credential::Keystore {
            payload: PBKDF2_TEST_VECTOR.to_string(),
            password: secret("not-the-password"),
        };
        assert_eq!(
            resolver.resolve(&bad).await.unwrap_err(),
            ResolveError::DecryptionFailed
        );

        let malformed = Credential::Keystore {
            payload: "{}".to_string(),
            password: secret("testpassword"),
        };
        assert_eq!(
            resolver.resolve(&malformed).await.unwrap_err(),
            ResolveError::DecryptionFailed
        );
    }

    #[test]
    fn credential_debug_is_redacted() {
        let credential = Credential::Mnemonic {
            phrase: secret(PHRASE),
            password: None,
            path: DerivationPath::ethereum(),
            index: 3,
        };
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("abandon"));
        assert!(rendered.contains("m/44'/60'/0'/0"));

        let key = format!("{:?}", Credential::PrivateKey(secret(KEY)));
        assert!(!key.contains("4c0883"));
    }
}
