//! Balance Reconciler
//!
//! Checks that the transaction outputs account for exactly the value the
//! wallet is expected to hold.

use crate::{Rejection, TxOut};
use ethers::types::U256;

/// Balance leg of the validator
pub trait Reconciler: Send + Sync {
    fn reconcile(&self, outputs: &[TxOut], expected: U256) -> Result<(), Rejection>;
}

/// Strict equality between the output sum and the expected balance
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactSum;

impl Reconciler for ExactSum {
    fn reconcile(&self, outputs: &[TxOut], expected: U256) -> Result<(), Rejection> {
        let total = sum_outputs(outputs).ok_or(Rejection::OutputSumOverflow)?;

        if total != expected {
            return Err(Rejection::BalanceMismatch {
                outputs: total,
                expected,
            });
        }

        Ok(())
    }
}

/// Sum output values left to right, `None` on overflow
pub fn sum_outputs(outputs: &[TxOut]) -> Option<U256> {
    outputs
        .iter()
        .try_fold(U256::zero(), |acc, out| acc.checked_add(out.value))
}

/// `true` iff the outputs sum to exactly `expected`
pub fn check_balance(outputs: &[TxOut], expected: U256) -> bool {
    ExactSum.reconcile(outputs, expected).is_ok()
}
