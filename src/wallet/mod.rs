//! Wallet capability and deposit initiation
//!
//! The interaction layer never holds keys. Everything it needs from a wallet
//! goes through [`WalletProvider`]; [`JsonRpcWallet`] talks to an
//! Ethereum-style JSON-RPC node and tests use a scripted fake.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::{PanelError, PanelResult};

pub mod deposit;
pub mod json_rpc;
pub mod units;

pub use deposit::{DepositInitiator, DepositOutcome};
pub use json_rpc::JsonRpcWallet;

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address pattern is valid")
});

/// Check the shape of a hex account address
pub fn validate_address(address: &str) -> PanelResult<&str> {
    let trimmed = address.trim();
    if ADDRESS_RE.is_match(trimmed) {
        Ok(trimmed)
    } else {
        Err(PanelError::InvalidAddress(address.to_string()))
    }
}

/// Network the wallet is connected to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkType {
    Main,
    Goerli,
    Sepolia,
    Private(u64),
}

impl NetworkType {
    pub fn from_chain_id(id: u64) -> Self {
        match id {
            1 => NetworkType::Main,
            5 => NetworkType::Goerli,
            11_155_111 => NetworkType::Sepolia,
            other => NetworkType::Private(other),
        }
    }

    pub fn is_main(&self) -> bool {
        matches!(self, NetworkType::Main)
    }
}

impl fmt::Display for NetworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkType::Main => write!(f, "main"),
            NetworkType::Goerli => write!(f, "goerli"),
            NetworkType::Sepolia => write!(f, "sepolia"),
            NetworkType::Private(_) => write!(f, "private"),
        }
    }
}

/// Value transfer handed to the provider; never persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub from: String,
    pub to: String,
    pub value_wei: u128,
}

/// What the interaction layer needs from a connected wallet
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Whether an account is connected and usable
    async fn is_connected(&self) -> bool;

    async fn network_type(&self) -> PanelResult<NetworkType>;

    /// Accounts exposed by the wallet, the selected one first
    async fn accounts(&self) -> PanelResult<Vec<String>>;

    /// Submit a transfer; returns the transaction hash
    async fn send_value(&self, tx: &WalletTransaction) -> PanelResult<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        let good = "0x52908400098527886E0F7030069857D2E4169EE7";
        assert_eq!(validate_address(good).unwrap(), good);
        assert_eq!(validate_address(&format!(" {}\n", good)).unwrap(), good);
        assert!(validate_address("0x1234").is_err());
        assert!(validate_address("").is_err());
        assert!(validate_address("52908400098527886E0F7030069857D2E4169EE7").is_err());
    }

    #[test]
    fn test_network_names() {
        assert_eq!(NetworkType::from_chain_id(1).to_string(), "main");
        assert_eq!(NetworkType::from_chain_id(11_155_111), NetworkType::Sepolia);
        assert_eq!(NetworkType::from_chain_id(1337), NetworkType::Private(1337));
        assert!(!NetworkType::Goerli.is_main());
    }
}
