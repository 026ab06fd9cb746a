use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::units::{ether_to_wei, DEPOSIT_ETHER};
use super::{validate_address, NetworkType, WalletProvider, WalletTransaction};
use crate::errors::PanelResult;
use crate::surface::{Surface, RECIPIENT_ELEMENT};

/// How a deposit-window invocation ended
///
/// Nothing here reaches the user; the outcome exists for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DepositOutcome {
    /// Wallet not connected; nothing was attempted
    NotConnected,
    /// Page did not carry a usable recipient address
    InvalidRecipient,
    /// Network query failed; nothing was sent
    NetworkUnavailable,
    /// Network gate is on and the wallet is elsewhere
    NetworkRejected(NetworkType),
    /// Account query failed
    AccountsUnavailable,
    /// Wallet returned an empty account list
    NoAccounts,
    /// Provider acknowledged the transfer
    Sent { tx_hash: String },
    /// Provider refused or failed the transfer
    SendFailed,
}

/// Sends the fixed deposit from the connected wallet to the structure
pub struct DepositInitiator {
    provider: Arc<dyn WalletProvider>,
    surface: Arc<dyn Surface>,
    value_wei: u128,
    require_main_network: bool,
}

impl DepositInitiator {
    pub fn new(provider: Arc<dyn WalletProvider>, surface: Arc<dyn Surface>) -> PanelResult<Self> {
        Ok(Self {
            provider,
            surface,
            value_wei: ether_to_wei(DEPOSIT_ETHER)?,
            require_main_network: false,
        })
    }

    /// Override the deposit amount (decimal ether)
    pub fn with_amount(mut self, ether: &str) -> PanelResult<Self> {
        self.value_wei = ether_to_wei(ether)?;
        Ok(self)
    }

    /// Refuse to send unless the wallet is on the main network
    pub fn require_main_network(mut self, required: bool) -> Self {
        self.require_main_network = required;
        self
    }

    pub fn value_wei(&self) -> u128 {
        self.value_wei
    }

    /// Send one transfer to the recipient shown on the page.
    ///
    /// Fire-and-forget: no receipt tracking, no retry.
    pub async fn open_deposit_window(&self) -> DepositOutcome {
        if !self.provider.is_connected().await {
            debug!("Wallet not connected, deposit skipped");
            return DepositOutcome::NotConnected;
        }

        let raw_recipient = self.surface.text_of(RECIPIENT_ELEMENT).unwrap_or_default();
        let recipient = match validate_address(&raw_recipient) {
            Ok(address) => address.to_string(),
            Err(e) => {
                error!(error = %e, "Deposit recipient unreadable");
                return DepositOutcome::InvalidRecipient;
            }
        };

        let network = match self.provider.network_type().await {
            Ok(network) => network,
            Err(e) => {
                error!(error = %e, "Network type query failed, deposit abandoned");
                return DepositOutcome::NetworkUnavailable;
            }
        };
        info!(network = %network, is_main = network.is_main(), "Wallet network");
        if self.require_main_network && !network.is_main() {
            warn!(network = %network, "Deposit refused outside the main network");
            return DepositOutcome::NetworkRejected(network);
        }

        let accounts = match self.provider.accounts().await {
            Ok(accounts) => accounts,
            Err(e) => {
                error!(error = %e, "Account query failed");
                return DepositOutcome::AccountsUnavailable;
            }
        };
        let Some(from) = accounts.into_iter().next() else {
            error!("Wallet exposed no accounts");
            return DepositOutcome::NoAccounts;
        };

        let tx = WalletTransaction {
            from,
            to: recipient,
            value_wei: self.value_wei,
        };
        match self.provider.send_value(&tx).await {
            Ok(tx_hash) => {
                info!(
                    from = %tx.from,
                    to = %tx.to,
                    value_wei = %tx.value_wei,
                    tx_hash = %tx_hash,
                    "Deposit submitted"
                );
                DepositOutcome::Sent { tx_hash }
            }
            Err(e) => {
                error!(from = %tx.from, to = %tx.to, error = %e, "Deposit transfer failed");
                DepositOutcome::SendFailed
            }
        }
    }
}
