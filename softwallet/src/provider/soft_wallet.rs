use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use super::{
    AccountOptions, ProviderFactory, ProviderHandle, SessionContext, SignedTransaction,
    TransactionRequest,
};
use crate::account::{Account, Address};
use crate::crypto::{KeystoreParams, Web3Keystore};
use crate::errors::ProviderError;
use crate::network::Network;
use crate::secret::SigningMaterial;

/// Creates in-process soft wallet providers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SoftWalletFactory {
    params: KeystoreParams,
}

impl SoftWalletFactory {
    pub fn new(params: KeystoreParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> KeystoreParams {
        self.params
    }
}

impl ProviderFactory for SoftWalletFactory {
    fn create(&self, network: &Network) -> Result<Arc<dyn ProviderHandle>, ProviderError> {
        Ok(Arc::new(SoftWalletProvider::new(network.clone(), self.params)))
    }
}

struct BoundKey {
    context: SessionContext,
    /// The account key, re-encrypted under the caller's passphrase.
    keystore: Arc<String>,
    options: AccountOptions,
}

/// Holds the bound key only in encrypted form; decrypts per signature.
pub struct SoftWalletProvider {
    network: Network,
    params: KeystoreParams,
    codec: Web3Keystore,
    state: RwLock<Option<BoundKey>>,
}

impl SoftWalletProvider {
    pub fn new(network: Network, params: KeystoreParams) -> Self {
        Self {
            network,
            params,
            codec: Web3Keystore::new(),
            state: RwLock::new(None),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.state.read().is_some()
    }

    /// Address of the bound account, if any.
    pub fn address(&self) -> Option<Address> {
        self.state.read().as_ref().map(|bound| bound.context.address)
    }

    fn password_bytes(passphrase: &SecretString) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(passphrase.expose_secret().as_bytes().to_vec())
    }
}

#[async_trait]
impl ProviderHandle for SoftWalletProvider {
    async fn init(
        &self,
        account: &Account,
        options: AccountOptions,
    ) -> Result<SessionContext, ProviderError> {
        if self.is_initialized() {
            return Err(ProviderError::Init(
                "provider already holds an account".to_string(),
            ));
        }

        let passphrase = options.passphrase.passphrase().await?;
        let password = Self::password_bytes(&passphrase);
        let key_bytes = account.signing_material().to_bytes();
        let codec = self.codec;
        let params = self.params;

        let keystore = tokio::task::spawn_blocking(move || {
            let signing = SigningMaterial::from_slice(&key_bytes[..])?;
            codec.encrypt(&signing, &password, params)
        })
        .await
        .map_err(|e| ProviderError::Init(format!("keystore task failed: {e}")))?
        .map_err(|e| ProviderError::Init(e.0))?;

        let context = SessionContext::new(self.network.clone(), account.address());
        let mut state = self.state.write();
        if state.is_some() {
            return Err(ProviderError::Init(
                "provider already holds an account".to_string(),
            ));
        }
        *state = Some(BoundKey {
            context: context.clone(),
            keystore: Arc::new(keystore),
            options,
        });

        log::debug!(
            "Soft wallet initialized for {} on {}",
            context.address,
            context.network
        );
        Ok(context)
    }

    async fn sign_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<SignedTransaction, ProviderError> {
        let (address, keystore, options) = {
            let state = self.state.read();
            let bound = state.as_ref().ok_or(ProviderError::NotInitialized)?;
            (
                bound.context.address,
                Arc::clone(&bound.keystore),
                bound.options.clone(),
            )
        };

        if request.from != address {
            return Err(ProviderError::AddressMismatch {
                expected: address.to_string(),
                actual: request.from.to_string(),
            });
        }
        if !options.approval.approve(request).await {
            log::info!("Signing request for {} rejected", address);
            return Err(ProviderError::Rejected);
        }

        let passphrase = options.passphrase.passphrase().await?;
        let password = Self::password_bytes(&passphrase);
        let hash = request.signing_hash();
        let codec = self.codec;

        let signature = tokio::task::spawn_blocking(move || {
            let account = codec.decrypt(&keystore, &password).map_err(|_| {
                ProviderError::Passphrase("passphrase does not unlock the key".to_string())
            })?;
            if account.address() != address {
                return Err(ProviderError::Signing(
                    "stored key does not match bound address".to_string(),
                ));
            }
            account
                .signing_material()
                .sign_prehash(&hash)
                .map_err(|e| ProviderError::Signing(e.0))
        })
        .await
        .map_err(|e| ProviderError::Signing(format!("signing task failed: {e}")))??;

        Ok(SignedTransaction { hash, signature })
    }

    async fn shutdown(&self) {
        if let Some(bound) = self.state.write().take() {
            log::debug!("Soft wallet for {} shut down", bound.context.address);
        }
    }
}
