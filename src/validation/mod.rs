//! Spend Validation Module
//!
//! This module decides whether a spend from a multi-signature custody wallet
//! is authorized. It combines two leaf checks:
//! - Quorum: enough distinct owners signed the transaction
//! - Balance: the outputs account for exactly the wallet balance
//!
//! The balance leg only runs once the quorum leg has passed.

mod balance;
mod quorum;
mod signature;
mod validator;

#[cfg(test)]
mod tests;

pub use balance::{ExactSum, Reconciler, check_balance, sum_outputs};
pub use quorum::{MatchingPolicy, count_matches, verify_quorum};
pub use signature::{EcdsaVerifier, SignatureVerifier};
pub use validator::Validator;
