use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config_store::WalletConfig;
use crate::errors::{WalletError, WalletResult};
use crate::path::DerivationPath;

pub const ENV_SELECTOR: &str = "SOFTWALLET_ENV";

const VAR_CHAIN_ID: &str = "SOFTWALLET_CHAIN_ID";
const VAR_NETWORK_NAME: &str = "SOFTWALLET_NETWORK_NAME";
const VAR_DERIVATION_PATH: &str = "SOFTWALLET_DERIVATION_PATH";
const VAR_PAGE_LIMIT: &str = "SOFTWALLET_PAGE_LIMIT";
const VAR_SCRYPT_LOG_N: &str = "SOFTWALLET_SCRYPT_LOG_N";
const VAR_SCRYPT_R: &str = "SOFTWALLET_SCRYPT_R";
const VAR_SCRYPT_P: &str = "SOFTWALLET_SCRYPT_P";
const VAR_WARN_PRIVATE_KEY: &str = "SOFTWALLET_WARN_PRIVATE_KEY";

/// Deployment environment, selected through `SOFTWALLET_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
    Test,
}

impl Environment {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" | "testing" => Environment::Test,
            _ => Environment::Development,
        }
    }

    pub fn from_env() -> Self {
        std::env::var(ENV_SELECTOR)
            .map(|value| Self::parse(&value))
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
            Environment::Test => "test",
        }
    }

    pub fn is_production(&self) -> bool {
        *self == Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Apply `SOFTWALLET_*` variables from the process environment.
pub fn apply_env_overrides(config: &mut WalletConfig) -> WalletResult<()> {
    apply_overrides(config, |name| std::env::var(name).ok())
}

/// Apply overrides from an arbitrary lookup. Empty values and values with
/// control characters are skipped; malformed values are errors.
pub fn apply_overrides<F>(config: &mut WalletConfig, lookup: F) -> WalletResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| -> Option<String> {
        let value = lookup(name)?;
        if value.trim().is_empty() {
            log::warn!("Environment variable {} is empty", name);
            return None;
        }
        if value.chars().any(|c| c.is_control()) {
            log::warn!(
                "Environment variable {} contains control characters, ignoring",
                name
            );
            return None;
        }
        log::debug!("Applying configuration override from {}", name);
        Some(value)
    };

    if let Some(value) = read(VAR_CHAIN_ID) {
        config.network.chain_id = u64::from(parse_u32_value(&value, VAR_CHAIN_ID)?);
    }
    if let Some(value) = read(VAR_NETWORK_NAME) {
        config.network.name = value.trim().to_string();
    }
    if let Some(value) = read(VAR_DERIVATION_PATH) {
        config.derivation.default_path = DerivationPath::parse(value.trim())?;
    }
    if let Some(value) = read(VAR_PAGE_LIMIT) {
        let limit = parse_u32_value(&value, VAR_PAGE_LIMIT)?;
        if limit == 0 {
            return Err(WalletError::ValidationError(format!(
                "Configuration key '{}' must be greater than zero",
                VAR_PAGE_LIMIT
            )));
        }
        config.derivation.default_page_limit = limit;
    }
    if let Some(value) = read(VAR_SCRYPT_LOG_N) {
        let log_n = parse_u32_value(&value, VAR_SCRYPT_LOG_N)?;
        config.keystore.log_n = u8::try_from(log_n).map_err(|_| {
            WalletError::ValidationError(format!(
                "Invalid numeric value '{}' for key '{}'",
                value, VAR_SCRYPT_LOG_N
            ))
        })?;
    }
    if let Some(value) = read(VAR_SCRYPT_R) {
        config.keystore.r = parse_u32_value(&value, VAR_SCRYPT_R)?;
    }
    if let Some(value) = read(VAR_SCRYPT_P) {
        config.keystore.p = parse_u32_value(&value, VAR_SCRYPT_P)?;
    }
    if let Some(value) = read(VAR_WARN_PRIVATE_KEY) {
        config.advisory.warn_on_private_key = parse_bool_flag(&value, VAR_WARN_PRIVATE_KEY)?;
    }

    config.validate()
}

fn parse_bool_flag(value: &str, key: &str) -> WalletResult<bool> {
    if value.len() > 128 {
        return Err(WalletError::ValidationError(format!(
            "Configuration '{}' must not exceed 128 characters",
            key
        )));
    }
    let normalized = value.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return Err(WalletError::ValidationError(format!(
            "Configuration key '{}' cannot be empty",
            key
        )));
    }

    match normalized.as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(WalletError::ValidationError(format!(
            "Invalid boolean value '{}' for key '{}'",
            value, key
        ))),
    }
}

fn parse_u32_value(value: &str, key: &str) -> WalletResult<u32> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.len() > 32 {
        return Err(WalletError::ValidationError(format!(
            "Configuration key '{}' has an empty or oversized value",
            key
        )));
    }

    trimmed.parse::<u32>().map_err(|_| {
        WalletError::ValidationError(format!(
            "Invalid numeric value '{}' for key '{}'",
            value, key
        ))
    })
}
