//! API Module
//!
//! This module exposes the validator over JSON-RPC so a host ledger can
//! submit spends for authorization.

mod server;
pub use server::{Server, ServiceValidator};
