//! Spend validation for multi-signature custody wallets.
//! A spend is authorized when enough distinct owners signed it and its
//! outputs account for exactly the wallet balance.

pub mod types; // Wallet records, spend requests, transaction context and verdicts.
pub mod validation; // Quorum and balance checks and the validator combining them.
pub mod instrument; // Tracing and profiling scopes around a validation.
pub mod api; // JSON-RPC surface for host ledgers.
pub mod config; // Defines and loads service configuration.

// Re-export commonly used types and configurations for easier access.
pub use types::*;
pub use config::Config;
pub use validation::Validator;
