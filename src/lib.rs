//! ERC360 structure panel interaction layer
//!
//! Async orchestration behind the structure page: a retrying form channel,
//! the two-step structure refresh, the wallet deposit initiator, and the
//! amount/tab state machines. The page itself and the wallet are reached only
//! through the [`surface::Surface`] and [`wallet::WalletProvider`] capabilities.

pub mod amount;
pub mod channel;
pub mod config;
pub mod errors;
pub mod observability;
pub mod refresh;
pub mod session;
pub mod surface;
pub mod tabs;
pub mod test_utils;
pub mod wallet;

// Re-export commonly used types
pub use channel::{FormFields, RetryChannel, RetryPolicy, SubmissionHandle, SubmissionStatus};
pub use errors::{PanelError, PanelResult};
pub use refresh::{RefreshCoordinator, Stage, StructureAddress};
pub use wallet::{DepositInitiator, DepositOutcome, WalletProvider};
