use ethers::types::{Address, H256, Signature, U256};
use ethers::utils::keccak256;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// On-chain record of a custody wallet
///
/// The validator never mutates this record. A successful spend certifies a
/// transition; the ledger replaces the record wholesale afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    /// Keys allowed to co-sign a spend
    pub owners: Vec<Address>,
    /// Minimum number of distinct owner signatures
    pub threshold: i64,
    /// Expected value held by the wallet
    pub balance: U256,
}

impl WalletState {
    /// Build a freshly provisioned wallet with a zero balance
    ///
    /// # Returns
    /// * `Ok(WalletState)` if the owner set and threshold are well formed
    /// * `Err(WalletError)` describing the first problem found
    pub fn new(owners: Vec<Address>, threshold: i64) -> Result<Self, WalletError> {
        let state = Self {
            owners,
            threshold,
            balance: U256::zero(),
        };
        state.check_well_formed()?;
        Ok(state)
    }

    /// Replace the balance, keeping owners and threshold
    pub fn with_balance(mut self, balance: U256) -> Self {
        self.balance = balance;
        self
    }

    /// Check the structural invariants of the record
    ///
    /// `0 < threshold <= owners.len()` and owners must be distinct. A
    /// duplicated owner would let one key fill two quorum slots.
    pub fn check_well_formed(&self) -> Result<(), WalletError> {
        if self.owners.is_empty() {
            return Err(WalletError::NoOwners);
        }
        if self.threshold <= 0 {
            return Err(WalletError::NonPositiveThreshold(self.threshold));
        }
        if self.threshold as u64 > self.owners.len() as u64 {
            return Err(WalletError::ThresholdExceedsOwners {
                threshold: self.threshold,
                owners: self.owners.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.owners.len());
        for owner in &self.owners {
            if !seen.insert(owner) {
                return Err(WalletError::DuplicateOwner(*owner));
            }
        }

        Ok(())
    }
}

/// Witness data for one spend attempt. Untrusted, any length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendRequest {
    pub signatures: Vec<Signature>,
}

/// A single transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOut {
    pub address: Address,
    pub value: U256,
}

/// Transaction data supplied by the host ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContext {
    /// Identifier of the wallet being spent from
    pub wallet: Address,
    pub nonce: u64,
    pub outputs: Vec<TxOut>,
}

impl TransactionContext {
    /// Compute the digest owners sign to authorize this transaction
    pub fn signing_hash(&self) -> H256 {
        let mut data = Vec::with_capacity(20 + 8 + self.outputs.len() * 52);
        data.extend_from_slice(self.wallet.as_bytes());
        data.extend_from_slice(&self.nonce.to_be_bytes());

        for output in &self.outputs {
            data.extend_from_slice(output.address.as_bytes());

            let mut value_bytes = [0u8; 32];
            output.value.to_big_endian(&mut value_bytes);
            data.extend_from_slice(&value_bytes);
        }

        H256::from_slice(&keccak256(data))
    }
}

/// Structural problems with a wallet record
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum WalletError {
    #[error("wallet has no owners")]
    NoOwners,
    #[error("threshold must be positive, got {0}")]
    NonPositiveThreshold(i64),
    #[error("threshold {threshold} exceeds owner count {owners}")]
    ThresholdExceedsOwners { threshold: i64, owners: usize },
    #[error("owner {0:?} listed more than once")]
    DuplicateOwner(Address),
}

/// Reason a spend was not authorized
///
/// Rejection is a normal outcome, not a failure of the validator.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Rejection {
    #[error("malformed wallet: {0}")]
    MalformedWallet(WalletError),
    #[error("insufficient signatures: {matched} matched, {required} required")]
    InsufficientSignatures { matched: usize, required: i64 },
    #[error("balance mismatch: outputs sum to {outputs}, wallet holds {expected}")]
    BalanceMismatch { outputs: U256, expected: U256 },
    #[error("output values overflow")]
    OutputSumOverflow,
}

/// Result of a validation, as returned to callers of the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verdict {
    pub tx_hash: H256,
    pub status: VerdictStatus,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerdictStatus {
    Authorized,
    Rejected { reason: String },
}

impl Verdict {
    pub fn new(tx_hash: H256, outcome: &Result<(), Rejection>) -> Self {
        let status = match outcome {
            Ok(()) => VerdictStatus::Authorized,
            Err(rejection) => VerdictStatus::Rejected {
                reason: rejection.to_string(),
            },
        };

        Self {
            tx_hash,
            status,
            timestamp: chrono::Utc::now().timestamp() as u64,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.status == VerdictStatus::Authorized
    }
}
