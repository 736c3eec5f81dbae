//! Provider seam: the runtime object a resolved account is bound to.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{Account, Address};
use crate::errors::ProviderError;
use crate::network::Network;
use crate::secret::RecoverableSignature;

pub mod soft_wallet;

pub use soft_wallet::{SoftWalletFactory, SoftWalletProvider};

/// Supplies the passphrase guarding the provider's copy of the key.
#[async_trait]
pub trait PassphraseProvider: Send + Sync {
    async fn passphrase(&self) -> Result<SecretString, ProviderError>;
}

#[async_trait]
impl<F> PassphraseProvider for F
where
    F: Fn() -> Result<SecretString, ProviderError> + Send + Sync,
{
    async fn passphrase(&self) -> Result<SecretString, ProviderError> {
        self()
    }
}

/// Decides whether a signing request may proceed.
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn approve(&self, request: &TransactionRequest) -> bool;
}

#[async_trait]
impl<F> ApprovalGate for F
where
    F: Fn(&TransactionRequest) -> bool + Send + Sync,
{
    async fn approve(&self, request: &TransactionRequest) -> bool {
        self(request)
    }
}

/// Callbacks handed to the provider on init.
#[derive(Clone)]
pub struct AccountOptions {
    pub passphrase: Arc<dyn PassphraseProvider>,
    pub approval: Arc<dyn ApprovalGate>,
}

impl fmt::Debug for AccountOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountOptions").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRequest {
    pub from: Address,
    /// Opaque payload; signed as keccak256(payload).
    pub payload: Vec<u8>,
}

impl TransactionRequest {
    pub fn new(from: Address, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            from,
            payload: payload.into(),
        }
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        crate::crypto::keccak256(&self.payload)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub hash: [u8; 32],
    pub signature: RecoverableSignature,
}

impl SignedTransaction {
    /// Recover the signer's address from the signature.
    pub fn signer(&self) -> Result<Address, ProviderError> {
        self.signature
            .recover(&self.hash)
            .map(|key| Address::from_verifying_key(&key))
            .map_err(|e| ProviderError::Signing(e.0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub session_id: Uuid,
    pub network: Network,
    pub address: Address,
}

impl SessionContext {
    pub fn new(network: Network, address: Address) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            network,
            address,
        }
    }
}

/// One provider instance, bound to at most one account.
#[async_trait]
pub trait ProviderHandle: Send + Sync {
    async fn init(
        &self,
        account: &Account,
        options: AccountOptions,
    ) -> Result<SessionContext, ProviderError>;

    async fn sign_transaction(
        &self,
        request: &TransactionRequest,
    ) -> Result<SignedTransaction, ProviderError>;

    /// Release provider-held resources. Idempotent.
    async fn shutdown(&self);
}

pub trait ProviderFactory: Send + Sync {
    fn create(&self, network: &Network) -> Result<Arc<dyn ProviderHandle>, ProviderError>;
}
