use std::sync::Arc;

use crate::account::Account;
use crate::errors::BindError;
use crate::network::Network;
use crate::provider::{AccountOptions, ApprovalGate, PassphraseProvider, ProviderFactory};
use crate::session::Session;

/// Binds resolved accounts to fresh provider instances on one network.
#[derive(Clone)]
pub struct SessionBinder {
    network: Network,
    factory: Arc<dyn ProviderFactory>,
}

impl SessionBinder {
    pub fn new(network: Network, factory: Arc<dyn ProviderFactory>) -> Self {
        Self { network, factory }
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Bind `account` into a new session.
    pub async fn bind(
        &self,
        account: Account,
        passphrase: Option<Arc<dyn PassphraseProvider>>,
        approval: Option<Arc<dyn ApprovalGate>>,
    ) -> Result<Session, BindError> {
        let session = Session::new();
        self.bind_into(&session, account, passphrase, approval)
            .await?;
        Ok(session)
    }

    /// Bind `account` into a caller-held session, which must be empty.
    pub async fn bind_into(
        &self,
        session: &Session,
        account: Account,
        passphrase: Option<Arc<dyn PassphraseProvider>>,
        approval: Option<Arc<dyn ApprovalGate>>,
    ) -> Result<(), BindError> {
        let options = Self::account_options(passphrase, approval)?;
        let guard = session.begin_bind()?;

        let provider = self
            .factory
            .create(&self.network)
            .map_err(BindError::ProviderInitFailed)?;
        let context = provider
            .init(&account, options)
            .await
            .map_err(|e| {
                log::warn!("Provider init failed on {}: {}", self.network, e);
                BindError::ProviderInitFailed(e)
            })?;

        log::info!(
            "Bound {} on {} (session {})",
            context.address,
            context.network,
            context.session_id
        );
        guard.complete(account, provider, context);
        Ok(())
    }

    fn account_options(
        passphrase: Option<Arc<dyn PassphraseProvider>>,
        approval: Option<Arc<dyn ApprovalGate>>,
    ) -> Result<AccountOptions, BindError> {
        let passphrase = passphrase.ok_or(BindError::MissingCallback("passphrase provider"))?;
        let approval = approval.ok_or(BindError::MissingCallback("approval gate"))?;
        Ok(AccountOptions {
            passphrase,
            approval,
        })
    }
}
