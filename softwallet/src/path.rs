//! HD derivation paths.
//!
//! A `DerivationPath` is a branch template such as `m/44'/60'/0'/0`; the
//! account index is appended as a final non-hardened segment when an
//! address is derived.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{WalletError, WalletResult};
use crate::validation::InputValidator;

/// Offset marking a hardened child index.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Default branch used by Metamask, Jaxx, Exodus, imToken, TREZOR and BitBox.
pub const DEFAULT_PATH: &str = "m/44'/60'/0'/0";

/// Well-known branch templates and the wallets or networks that use them.
pub const KNOWN_PATHS: &[(&str, &str)] = &[
    ("m/44'/60'/0'/0", "Ethereum (Metamask, Jaxx, Exodus, imToken, TREZOR, BitBox)"),
    ("m/44'/60'/0'", "Ledger (ETH)"),
    ("m/44'/60'/160720'/0'", "Ledger (ETC)"),
    ("m/44'/61'/0'/0", "TREZOR (ETC)"),
    ("m/0'/0'/0'", "SingularDTV"),
    ("m/44'/1'/0'/0", "Testnets"),
    ("m/44'/40'/0'/0", "Expanse"),
    ("m/44'/108'/0'/0", "Ubiq"),
    ("m/44'/163'/0'/0", "Ellaism"),
    ("m/44'/1987'/0'/0", "EtherGem"),
    ("m/44'/820'/0'/0", "Callisto"),
    ("m/44'/1128'/0'/0", "Ethereum Social"),
    ("m/44'/184'/0'/0", "Musicoin"),
    ("m/44'/6060'/0'/0", "GoChain"),
    ("m/44'/2018'/0'/0", "EOS Classic"),
    ("m/44'/200625'/0'/0", "Akroma (AKA)"),
    ("m/44'/31102'/0'/0", "EtherSocial Network (ESN)"),
    ("m/44'/164'/0'/0", "PIRL"),
    ("m/44'/1313114'/0'/0", "Ether-1 (ETHO)"),
    ("m/44'/1620'/0'/0", "Atheios (ATH)"),
    ("m/44'/889'/0'/0", "TomoChain (TOMO)"),
    ("m/44'/76'/0'/0", "Mix Blockchain (MIX)"),
    ("m/44'/1171337'/0'/0", "Iolite (ILT)"),
];

#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    segments: Vec<u32>,
}

impl DerivationPath {
    pub fn parse(path: &str) -> WalletResult<Self> {
        InputValidator::new().validate_derivation_path(path)?;

        let mut segments = Vec::new();
        for raw in path.split('/').skip(1) {
            let (digits, hardened) = match raw.strip_suffix('\'') {
                Some(digits) => (digits, true),
                None => (raw, false),
            };
            let index: u32 = digits.parse().map_err(|_| {
                WalletError::ValidationError(format!("Path segment '{}' is not a u32", raw))
            })?;
            if index >= HARDENED_OFFSET {
                return Err(WalletError::ValidationError(format!(
                    "Path segment '{}' exceeds 2^31 - 1",
                    raw
                )));
            }
            segments.push(if hardened { index | HARDENED_OFFSET } else { index });
        }

        Ok(Self { segments })
    }

    /// The default Ethereum branch, `m/44'/60'/0'/0`.
    pub fn ethereum() -> Self {
        Self {
            segments: vec![
                44 | HARDENED_OFFSET,
                60 | HARDENED_OFFSET,
                HARDENED_OFFSET,
                0,
            ],
        }
    }

    /// Branch segments, hardened ones carrying `HARDENED_OFFSET`.
    pub fn segments(&self) -> &[u32] {
        &self.segments
    }

    /// Label of the matching well-known preset, if any.
    pub fn known_label(&self) -> Option<&'static str> {
        let rendered = self.to_string();
        KNOWN_PATHS
            .iter()
            .find(|(path, _)| *path == rendered)
            .map(|(_, label)| *label)
    }
}

impl Default for DerivationPath {
    fn default() -> Self {
        Self::ethereum()
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for segment in &self.segments {
            if segment & HARDENED_OFFSET != 0 {
                write!(f, "/{}'", segment & !HARDENED_OFFSET)?;
            } else {
                write!(f, "/{}", segment)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DerivationPath({})", self)
    }
}

impl FromStr for DerivationPath {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DerivationPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DerivationPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
