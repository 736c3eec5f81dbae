// lib.rs - credential resolution and session binding for software wallets

pub mod account;
pub mod binder;
pub mod config_store;
pub mod crypto;
pub mod environment;
pub mod errors;
pub mod network;
pub mod pager;
pub mod path;
pub mod provider;
pub mod resolver;
pub mod secret;
pub mod session;
pub mod validation;
pub mod wallet;

// Re-export common types
pub use account::{Account, Address};
pub use binder::SessionBinder;
pub use config_store::{ConfigStore, WalletConfig};
pub use environment::{apply_env_overrides, Environment};
pub use errors::{BindError, CryptoError, ProviderError, ResolveError, WalletError, WalletResult};
pub use network::Network;
pub use pager::{AccountPager, PageRequest};
pub use path::{DerivationPath, KNOWN_PATHS};
pub use provider::{
    AccountOptions, ApprovalGate, PassphraseProvider, ProviderFactory, ProviderHandle,
    SessionContext, SignedTransaction, SoftWalletFactory, TransactionRequest,
};
pub use resolver::{Advisory, AdvisorySink, Credential, CredentialResolver, LogAdvisorySink};
pub use session::Session;
pub use wallet::{WalletSession, WalletSessionBuilder};
