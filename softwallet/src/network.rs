use std::fmt;

use serde::{Deserialize, Serialize};

/// Network a provider binds to, identified by chain id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Network {
    pub chain_id: u64,
    pub name: String,
}

impl Network {
    pub fn new(chain_id: u64, name: impl Into<String>) -> Self {
        Self {
            chain_id,
            name: name.into(),
        }
    }

    pub fn mainnet() -> Self {
        Self::new(1, "mainnet")
    }

    pub fn ropsten() -> Self {
        Self::new(3, "ropsten")
    }

    pub fn rinkeby() -> Self {
        Self::new(4, "rinkeby")
    }

    pub fn goerli() -> Self {
        Self::new(5, "goerli")
    }

    pub fn kovan() -> Self {
        Self::new(42, "kovan")
    }

    pub fn sepolia() -> Self {
        Self::new(11_155_111, "sepolia")
    }

    /// Look up a well-known network by chain id, falling back to a generic name.
    pub fn from_chain_id(chain_id: u64) -> Self {
        match chain_id {
            1 => Self::mainnet(),
            3 => Self::ropsten(),
            4 => Self::rinkeby(),
            5 => Self::goerli(),
            42 => Self::kovan(),
            11_155_111 => Self::sepolia(),
            other => Self::new(other, format!("chain-{}", other)),
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_chain_ids_resolve_to_names() {
        assert_eq!(Network::from_chain_id(1).name, "mainnet");
        assert_eq!(Network::from_chain_id(4), Network::rinkeby());
        assert_eq!(Network::from_chain_id(1337).name, "chain-1337");
    }
}
