use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::KeystoreParams;
use crate::environment::Environment;
use crate::errors::{WalletError, WalletResult};
use crate::network::Network;
use crate::pager::DEFAULT_PAGE_LIMIT;
use crate::path::DerivationPath;

const CONFIG_VERSION: u16 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    pub chain_id: u64,
    pub name: String,
}

impl NetworkConfig {
    pub fn to_network(&self) -> Network {
        Network::new(self.chain_id, self.name.clone())
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let network = Network::mainnet();
        Self {
            chain_id: network.chain_id,
            name: network.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DerivationConfig {
    pub default_path: DerivationPath,
    pub default_page_limit: u32,
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            default_path: DerivationPath::default(),
            default_page_limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdvisoryConfig {
    pub warn_on_private_key: bool,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            warn_on_private_key: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletConfig {
    pub network: NetworkConfig,
    pub derivation: DerivationConfig,
    /// Scrypt strength for the soft wallet's in-memory keystore.
    pub keystore: KeystoreParams,
    pub advisory: AdvisoryConfig,
    pub environment: Environment,
    pub last_updated: DateTime<Utc>,
    pub version: u16,
}

impl WalletConfig {
    pub fn new(environment: Environment) -> Self {
        let keystore = match environment {
            Environment::Test => KeystoreParams::light(),
            Environment::Development | Environment::Production => KeystoreParams::standard(),
        };
        Self {
            network: NetworkConfig::default(),
            derivation: DerivationConfig::default(),
            keystore,
            advisory: AdvisoryConfig::default(),
            environment,
            last_updated: Utc::now(),
            version: CONFIG_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    pub fn validate(&self) -> WalletResult<()> {
        if self.derivation.default_page_limit == 0 {
            return Err(WalletError::ValidationError(
                "Default page limit must be greater than zero".to_string(),
            ));
        }
        self.keystore
            .validate()
            .map_err(|e| WalletError::ValidationError(e.0))?;
        if self.network.name.trim().is_empty() {
            return Err(WalletError::ValidationError(
                "Network name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

/// On-disk form: the config plus a blake3 digest of its JSON encoding.
#[derive(Debug, Serialize, Deserialize)]
struct ConfigEnvelope {
    version: u16,
    digest: String,
    config: WalletConfig,
}

impl ConfigEnvelope {
    fn seal(config: WalletConfig) -> WalletResult<Self> {
        Ok(Self {
            version: CONFIG_VERSION,
            digest: digest(&config)?,
            config,
        })
    }

    fn open(self) -> WalletResult<WalletConfig> {
        if self.version != CONFIG_VERSION {
            return Err(WalletError::ValidationError(format!(
                "Unsupported config version {}",
                self.version
            )));
        }
        if digest(&self.config)? != self.digest {
            return Err(WalletError::ValidationError(
                "Config integrity verification failed".to_string(),
            ));
        }
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Reads and writes a `WalletConfig` at a fixed path.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load the stored config, writing `WalletConfig::new(environment)` first
    /// when no file exists yet.
    pub fn load_or_default(&self, environment: Environment) -> WalletResult<WalletConfig> {
        if !self.path.exists() {
            log::info!(
                "No wallet config at {}, writing {} defaults",
                self.path.display(),
                environment
            );
            let config = WalletConfig::new(environment);
            self.write(&config)?;
            return Ok(config);
        }

        let envelope: ConfigEnvelope = serde_json::from_slice(&fs::read(&self.path)?)?;
        envelope.open()
    }

    /// Persist `config` with a fresh `last_updated`.
    pub fn save(&self, config: &WalletConfig) -> WalletResult<()> {
        let mut stamped = config.clone();
        stamped.touch();
        self.write(&stamped)
    }

    /// Load, apply `updater`, and save. Nothing is written if `updater` or
    /// validation fails.
    pub fn update<F>(&self, environment: Environment, updater: F) -> WalletResult<WalletConfig>
    where
        F: FnOnce(&mut WalletConfig) -> WalletResult<()>,
    {
        let mut config = self.load_or_default(environment)?;
        updater(&mut config)?;
        config.touch();
        self.write(&config)?;
        Ok(config)
    }

    fn write(&self, config: &WalletConfig) -> WalletResult<()> {
        config.validate()?;
        let bytes = serde_json::to_vec_pretty(&ConfigEnvelope::seal(config.clone())?)?;
        write_replacing(&self.path, &bytes)?;
        log::debug!("Saved wallet config to {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn digest(config: &WalletConfig) -> WalletResult<String> {
    let encoded = serde_json::to_vec(config)?;
    Ok(blake3::hash(&encoded).to_hex().to_string())
}

/// Write to a sibling temp file, sync it, then rename over `path`.
fn write_replacing(path: &Path, bytes: &[u8]) -> WalletResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let staging = path.with_extension("new");
    let mut file = File::create(&staging)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(&staging, path)?;
    Ok(())
}
