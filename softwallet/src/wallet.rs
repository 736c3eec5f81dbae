//! The `WalletSession` facade.
//!
//! Binding operations (`set_account_by_*`) resolve a credential, bind it to a
//! fresh provider and install the resulting session as the active one.
//! Read-only operations (`get_account*`) resolve or page addresses and never
//! touch a provider.

use std::sync::Arc;

use parking_lot::RwLock;
use secrecy::SecretString;

use crate::account::Address;
use crate::binder::SessionBinder;
use crate::config_store::WalletConfig;
use crate::crypto::{KeyDerivation, KeystoreDecryption, MnemonicDerivation};
use crate::errors::{BindError, WalletError, WalletResult};
use crate::network::Network;
use crate::pager::{AccountPager, PageRequest, DEFAULT_PAGE_LIMIT};
use crate::path::DerivationPath;
use crate::provider::{
    ApprovalGate, PassphraseProvider, ProviderFactory, SessionContext, SignedTransaction,
    SoftWalletFactory, TransactionRequest,
};
use crate::resolver::{
    AdvisorySink, Credential, CredentialResolver, LogAdvisorySink, SilentAdvisorySink,
};
use crate::session::Session;

pub struct WalletSession {
    resolver: CredentialResolver,
    pager: AccountPager,
    binder: SessionBinder,
    passphrase: Arc<dyn PassphraseProvider>,
    approval: Arc<dyn ApprovalGate>,
    default_path: DerivationPath,
    default_page_limit: u32,
    active: RwLock<Option<Arc<Session>>>,
}

impl WalletSession {
    pub fn builder(network: Network) -> WalletSessionBuilder {
        WalletSessionBuilder::new(network)
    }

    /// Facade over the default collaborators and the soft wallet provider.
    pub fn from_config<P, A>(config: &WalletConfig, passphrase: P, approval: A) -> WalletResult<Self>
    where
        P: PassphraseProvider + 'static,
        A: ApprovalGate + 'static,
    {
        config.validate()?;
        let advisories: Arc<dyn AdvisorySink> = if config.advisory.warn_on_private_key {
            Arc::new(LogAdvisorySink)
        } else {
            Arc::new(SilentAdvisorySink)
        };

        let session = Self::builder(config.network.to_network())
            .passphrase_provider(passphrase)
            .approval_gate(approval)
            .advisory_sink(advisories)
            .provider_factory(Arc::new(SoftWalletFactory::new(config.keystore)))
            .default_path(config.derivation.default_path.clone())
            .default_page_limit(config.derivation.default_page_limit)
            .build()?;
        log::info!(
            "Wallet session ready on {} ({} environment)",
            session.network(),
            config.environment
        );
        Ok(session)
    }

    pub fn network(&self) -> &Network {
        self.binder.network()
    }

    pub fn default_path(&self) -> &DerivationPath {
        &self.default_path
    }

    /// Page request over the configured default path and page size.
    pub fn page_request(&self, page: u32) -> PageRequest {
        PageRequest::new(self.default_path.clone(), self.default_page_limit, page)
    }

    pub async fn set_account_by_private_key(
        &self,
        private_key: SecretString,
    ) -> WalletResult<SessionContext> {
        self.bind_credential(Credential::PrivateKey(private_key))
            .await
    }

    pub async fn set_account_by_mnemonic(
        &self,
        phrase: SecretString,
        password: Option<SecretString>,
        path: DerivationPath,
        index: u32,
    ) -> WalletResult<SessionContext> {
        self.bind_credential(Credential::Mnemonic {
            phrase,
            password,
            path,
            index,
        })
        .await
    }

    pub async fn set_account_by_keystore(
        &self,
        payload: impl Into<String>,
        password: SecretString,
    ) -> WalletResult<SessionContext> {
        self.bind_credential(Credential::Keystore {
            payload: payload.into(),
            password,
        })
        .await
    }

    pub async fn get_account_by_private_key(
        &self,
        private_key: SecretString,
    ) -> WalletResult<Address> {
        self.resolve_address(Credential::PrivateKey(private_key))
            .await
    }

    pub async fn get_account_by_mnemonic(
        &self,
        phrase: SecretString,
        password: Option<SecretString>,
        path: DerivationPath,
        index: u32,
    ) -> WalletResult<Address> {
        self.resolve_address(Credential::Mnemonic {
            phrase,
            password,
            path,
            index,
        })
        .await
    }

    pub async fn get_accounts_by_mnemonic(
        &self,
        phrase: &SecretString,
        password: Option<&SecretString>,
        request: &PageRequest,
    ) -> WalletResult<Vec<Address>> {
        Ok(self.pager.list(phrase, password, request).await?)
    }

    pub async fn get_account_by_keystore(
        &self,
        payload: impl Into<String>,
        password: SecretString,
    ) -> WalletResult<Address> {
        self.resolve_address(Credential::Keystore {
            payload: payload.into(),
            password,
        })
        .await
    }

    pub fn is_bound(&self) -> bool {
        self.active_session().is_some()
    }

    pub fn active_address(&self) -> Option<Address> {
        self.active_session().and_then(|session| session.address())
    }

    pub fn session_context(&self) -> Option<SessionContext> {
        self.active_session().and_then(|session| session.context())
    }

    pub async fn sign_transaction(
        &self,
        request: &TransactionRequest,
    ) -> WalletResult<SignedTransaction> {
        let session = self.active_session().ok_or(WalletError::NotBound)?;
        Ok(session.sign_transaction(request).await?)
    }

    /// Tear down the active session, if any.
    pub async fn logout(&self) {
        let previous = self.active.write().take();
        if let Some(session) = previous {
            session.teardown().await;
        }
    }

    fn active_session(&self) -> Option<Arc<Session>> {
        self.active.read().clone()
    }

    async fn resolve_address(&self, credential: Credential) -> WalletResult<Address> {
        let account = self.resolver.resolve(&credential).await?;
        Ok(account.into_address())
    }

    async fn bind_credential(&self, credential: Credential) -> WalletResult<SessionContext> {
        let account = self.resolver.resolve(&credential).await?;
        drop(credential);

        let session = self
            .binder
            .bind(
                account,
                Some(Arc::clone(&self.passphrase)),
                Some(Arc::clone(&self.approval)),
            )
            .await?;
        let context = session.context().ok_or(WalletError::NotBound)?;

        let displaced = self.active.write().replace(Arc::new(session));
        if let Some(previous) = displaced {
            previous.teardown().await;
        }
        Ok(context)
    }
}

pub struct WalletSessionBuilder {
    network: Network,
    passphrase: Option<Arc<dyn PassphraseProvider>>,
    approval: Option<Arc<dyn ApprovalGate>>,
    keys: Option<Arc<dyn KeyDerivation>>,
    mnemonic: Option<Arc<dyn MnemonicDerivation>>,
    keystore: Option<Arc<dyn KeystoreDecryption>>,
    advisories: Option<Arc<dyn AdvisorySink>>,
    factory: Option<Arc<dyn ProviderFactory>>,
    default_path: DerivationPath,
    default_page_limit: u32,
}

impl WalletSessionBuilder {
    pub fn new(network: Network) -> Self {
        Self {
            network,
            passphrase: None,
            approval: None,
            keys: None,
            mnemonic: None,
            keystore: None,
            advisories: None,
            factory: None,
            default_path: DerivationPath::default(),
            default_page_limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn passphrase_provider<P: PassphraseProvider + 'static>(mut self, provider: P) -> Self {
        self.passphrase = Some(Arc::new(provider));
        self
    }

    pub fn approval_gate<A: ApprovalGate + 'static>(mut self, gate: A) -> Self {
        self.approval = Some(Arc::new(gate));
        self
    }

    pub fn key_derivation(mut self, keys: Arc<dyn KeyDerivation>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn mnemonic_derivation(mut self, mnemonic: Arc<dyn MnemonicDerivation>) -> Self {
        self.mnemonic = Some(mnemonic);
        self
    }

    pub fn keystore_decryption(mut self, keystore: Arc<dyn KeystoreDecryption>) -> Self {
        self.keystore = Some(keystore);
        self
    }

    pub fn advisory_sink(mut self, advisories: Arc<dyn AdvisorySink>) -> Self {
        self.advisories = Some(advisories);
        self
    }

    pub fn provider_factory(mut self, factory: Arc<dyn ProviderFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn default_path(mut self, path: DerivationPath) -> Self {
        self.default_path = path;
        self
    }

    pub fn default_page_limit(mut self, limit: u32) -> Self {
        self.default_page_limit = limit;
        self
    }

    pub fn build(self) -> WalletResult<WalletSession> {
        let passphrase = self
            .passphrase
            .ok_or(BindError::MissingCallback("passphrase provider"))?;
        let approval = self
            .approval
            .ok_or(BindError::MissingCallback("approval gate"))?;
        if self.default_page_limit == 0 {
            return Err(WalletError::ValidationError(
                "Default page limit must be greater than zero".to_string(),
            ));
        }

        let advisories: Arc<dyn AdvisorySink> = match self.advisories {
            Some(advisories) => advisories,
            None => Arc::new(LogAdvisorySink),
        };
        let defaults = CredentialResolver::with_defaults();
        let resolver = CredentialResolver::new(
            self.keys.unwrap_or_else(|| defaults.key_derivation()),
            self.mnemonic
                .unwrap_or_else(|| defaults.mnemonic_derivation()),
            self.keystore
                .unwrap_or_else(|| defaults.keystore_decryption()),
            advisories,
        );
        let pager = AccountPager::new(resolver.mnemonic_derivation());
        let factory: Arc<dyn ProviderFactory> = match self.factory {
            Some(factory) => factory,
            None => Arc::new(SoftWalletFactory::default()),
        };

        Ok(WalletSession {
            resolver,
            pager,
            binder: SessionBinder::new(self.network, factory),
            passphrase,
            approval,
            default_path: self.default_path,
            default_page_limit: self.default_page_limit,
            active: RwLock::new(None),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keystore::PBKDF2_TEST_VECTOR;
    use crate::crypto::KeystoreParams;
    use crate::environment::Environment;
    use crate::errors::{ProviderError, ResolveError};
    use crate::provider::ProviderHandle;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn passphrase() -> Result<SecretString, ProviderError> {
        Ok(SecretString::from("correct horse".to_string()))
    }

    fn approve_all(_: &TransactionRequest) -> bool {
        true
    }

    /// Soft wallet factory that can be switched to fail, counting creations.
    struct SwitchableFactory {
        inner: SoftWalletFactory,
        failing: AtomicBool,
        created: AtomicUsize,
    }

    impl SwitchableFactory {
        fn new() -> Self {
            Self {
                inner: SoftWalletFactory::new(KeystoreParams {
                    log_n: 10,
                    r: 8,
                    p: 1,
                }),
                failing: AtomicBool::new(false),
                created: AtomicUsize::new(0),
            }
        }
    }

    impl ProviderFactory for SwitchableFactory {
        fn create(&self, network: &Network) -> Result<Arc<dyn ProviderHandle>, ProviderError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            if self.failing.load(Ordering::SeqCst) {
                return Err(ProviderError::Transport("provider offline".to_string()));
            }
            self.inner.create(network)
        }
    }

    fn wallet(factory: Arc<SwitchableFactory>) -> WalletSession {
        WalletSession::builder(Network::goerli())
            .passphrase_provider(passphrase)
            .approval_gate(approve_all)
            .advisory_sink(Arc::new(SilentAdvisorySink))
            .provider_factory(factory)
            .build()
            .unwrap()
    }

    #[test]
    fn builder_requires_both_callbacks() {
        let err = WalletSession::builder(Network::mainnet())
            .approval_gate(approve_all)
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            WalletError::Bind(BindError::MissingCallback("passphrase provider"))
        ));

        let err = WalletSession::builder(Network::mainnet())
            .passphrase_provider(passphrase)
            .build()
            .err()
            .unwrap();
        assert!(matches!(
            err,
            WalletError::Bind(BindError::MissingCallback("approval gate"))
        ));
    }

    #[test]
    fn builder_rejects_zero_page_limit() {
        let err = WalletSession::builder(Network::mainnet())
            .passphrase_provider(passphrase)
            .approval_gate(approve_all)
            .default_page_limit(0)
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, WalletError::ValidationError(_)));
    }

    #[tokio::test]
    async fn read_only_operations_never_bind() {
        let factory = Arc::new(SwitchableFactory::new());
        let wallet = wallet(factory.clone());

        let address = wallet
            .get_account_by_private_key(secret(KEY))
            .await
            .unwrap();
        assert_eq!(
            address.to_string(),
            "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23"
        );
        let mnemonic = wallet
            .get_account_by_mnemonic(secret(PHRASE), None, DerivationPath::ethereum(), 0)
            .await
            .unwrap();
        assert_eq!(
            mnemonic.to_string(),
            "0x9858EfFD232B4033E47d90003D41EC34EcaEda94"
        );
        let page = wallet
            .get_accounts_by_mnemonic(&secret(PHRASE), None, &wallet.page_request(0))
            .await
            .unwrap();
        assert_eq!(page.len(), DEFAULT_PAGE_LIMIT as usize);
        assert_eq!(page[0], mnemonic);
        let keystore = wallet
            .get_account_by_keystore(PBKDF2_TEST_VECTOR, secret("testpassword"))
            .await
            .unwrap();
        assert_eq!(
            keystore.to_lower_hex(),
            "0x008aeeda4d805471df9b2a5b0f38a0c3bcba786b"
        );

        assert!(!wallet.is_bound());
        assert_eq!(factory.created.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn sequential_binds_stand_on_their_own() {
        let factory = Arc::new(SwitchableFactory::new());
        let wallet = wallet(factory.clone());

        let first = wallet
            .set_account_by_private_key(secret(KEY))
            .await
            .unwrap();
        assert_eq!(wallet.active_address(), Some(first.address));
        assert_eq!(first.network, Network::goerli());

        factory.failing.store(true, Ordering::SeqCst);
        let err = wallet
            .set_account_by_mnemonic(secret(PHRASE), None, DerivationPath::ethereum(), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::Bind(BindError::ProviderInitFailed(ProviderError::Transport(_)))
        ));
        assert_eq!(wallet.session_context(), Some(first.clone()));

        factory.failing.store(false, Ordering::SeqCst);
        let second = wallet
            .set_account_by_mnemonic(secret(PHRASE), None, DerivationPath::ethereum(), 0)
            .await
            .unwrap();
        assert_ne!(second.session_id, first.session_id);
        assert_eq!(
            wallet.active_address().map(|a| a.to_string()),
            Some("0x9858EfFD232B4033E47d90003D41EC34EcaEda94".to_string())
        );
        assert_eq!(factory.created.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn resolution_failure_leaves_active_session() {
        let factory = Arc::new(SwitchableFactory::new());
        let wallet = wallet(factory.clone());
        let context = wallet
            .set_account_by_private_key(secret(KEY))
            .await
            .unwrap();

        let err = wallet
            .set_account_by_keystore(PBKDF2_TEST_VECTOR, secret("wrong"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WalletError::Resolve(ResolveError::DecryptionFailed)
        ));
        assert_eq!(wallet.session_context(), Some(context));
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sign_and_logout() {
        let wallet = wallet(Arc::new(SwitchableFactory::new()));
        let request_before = TransactionRequest::new(Address::from_bytes([0u8; 20]), vec![1u8]);
        assert!(matches!(
            wallet.sign_transaction(&request_before).await,
            Err(WalletError::NotBound)
        ));

        let context = wallet
            .set_account_by_private_key(secret(KEY))
            .await
            .unwrap();
        let request = TransactionRequest::new(context.address, b"payload".to_vec());
        let signed = wallet.sign_transaction(&request).await.unwrap();
        assert_eq!(signed.signer().unwrap(), context.address);

        wallet.logout().await;
        assert!(!wallet.is_bound());
        assert!(wallet.session_context().is_none());
        wallet.logout().await;
    }

    #[tokio::test]
    async fn from_config_uses_configured_network_and_path() {
        let mut config = WalletConfig::new(Environment::Test);
        config.network.chain_id = 11_155_111;
        config.network.name = "sepolia".to_string();
        config.keystore = KeystoreParams {
            log_n: 10,
            r: 8,
            p: 1,
        };
        config.derivation.default_page_limit = 2;

        let wallet = WalletSession::from_config(&config, passphrase, approve_all).unwrap();
        assert_eq!(wallet.network(), &Network::sepolia());
        assert_eq!(wallet.page_request(3).index_range().unwrap(), 6..8);

        let context = wallet
            .set_account_by_private_key(secret(KEY))
            .await
            .unwrap();
        assert_eq!(context.network, Network::sepolia());
    }
}
