use std::fmt;

/// Failures produced while turning a credential into an account or address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    InvalidPrivateKey(String),
    InvalidMnemonic(String),
    /// Wrong password, malformed payload, or unsupported parameters.
    /// Deliberately carries no detail.
    DecryptionFailed,
    InvalidPageRequest(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResolveError::InvalidPrivateKey(msg) => write!(f, "Invalid private key: {}", msg),
            ResolveError::InvalidMnemonic(msg) => {
                write!(f, "Cannot derive account from mnemonic: {}", msg)
            }
            ResolveError::DecryptionFailed => write!(f, "Cannot decrypt keystore"),
            ResolveError::InvalidPageRequest(msg) => write!(f, "Invalid page request: {}", msg),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Errors reported by a provider implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The approval gate declined the request.
    Rejected,
    Passphrase(String),
    Init(String),
    NotInitialized,
    AddressMismatch { expected: String, actual: String },
    Signing(String),
    Transport(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProviderError::Rejected => write!(f, "Request rejected by approval gate"),
            ProviderError::Passphrase(msg) => write!(f, "Passphrase unavailable: {}", msg),
            ProviderError::Init(msg) => write!(f, "Provider initialization failed: {}", msg),
            ProviderError::NotInitialized => write!(f, "Provider not initialized"),
            ProviderError::AddressMismatch { expected, actual } => write!(
                f,
                "Request sender {} does not match bound account {}",
                actual, expected
            ),
            ProviderError::Signing(msg) => write!(f, "Signing failed: {}", msg),
            ProviderError::Transport(msg) => write!(f, "Transport error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Failures produced while binding a resolved account to a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// A required signing callback was not supplied.
    MissingCallback(&'static str),
    /// The provider rejected initialization; the inner error is passed through untouched.
    ProviderInitFailed(ProviderError),
    AlreadyBound,
    BindInProgress,
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BindError::MissingCallback(name) => write!(f, "Missing required callback: {}", name),
            BindError::ProviderInitFailed(err) => write!(f, "{}", err),
            BindError::AlreadyBound => write!(f, "Session already has a bound account"),
            BindError::BindInProgress => write!(f, "Session bind already in progress"),
        }
    }
}

impl std::error::Error for BindError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BindError::ProviderInitFailed(err) => Some(err),
            _ => None,
        }
    }
}

/// Failure inside a cryptographic collaborator. Never contains secret material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoError(pub String);

impl CryptoError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Cryptographic error: {}", self.0)
    }
}

impl std::error::Error for CryptoError {}

#[derive(Debug, Clone)]
pub enum WalletError {
    // Credential and session errors
    Resolve(ResolveError),
    Bind(BindError),
    Provider(ProviderError),
    NotBound,

    // Storage errors
    StorageError(String),
    FileNotFound(String),
    PermissionDenied(String),

    // Validation errors
    ValidationError(String),
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            WalletError::Resolve(err) => write!(f, "{}", err),
            WalletError::Bind(err) => write!(f, "{}", err),
            WalletError::Provider(err) => write!(f, "{}", err),
            WalletError::NotBound => write!(f, "No account bound to the wallet session"),

            WalletError::StorageError(msg) => write!(f, "Storage error: {}", msg),
            WalletError::FileNotFound(msg) => write!(f, "File not found: {}", msg),
            WalletError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),

            WalletError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
        }
    }
}

impl std::error::Error for WalletError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WalletError::Resolve(err) => Some(err),
            WalletError::Bind(err) => Some(err),
            WalletError::Provider(err) => Some(err),
            _ => None,
        }
    }
}

pub type WalletResult<T> = Result<T, WalletError>;

impl From<ResolveError> for WalletError {
    fn from(error: ResolveError) -> Self {
        WalletError::Resolve(error)
    }
}

impl From<BindError> for WalletError {
    fn from(error: BindError) -> Self {
        WalletError::Bind(error)
    }
}

impl From<ProviderError> for WalletError {
    fn from(error: ProviderError) -> Self {
        WalletError::Provider(error)
    }
}

impl From<std::io::Error> for WalletError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::NotFound => WalletError::FileNotFound(error.to_string()),
            std::io::ErrorKind::PermissionDenied => {
                WalletError::PermissionDenied(error.to_string())
            }
            _ => WalletError::StorageError(error.to_string()),
        }
    }
}

impl From<serde_json::Error> for WalletError {
    fn from(error: serde_json::Error) -> Self {
        WalletError::ValidationError(format!("JSON error: {}", error))
    }
}
