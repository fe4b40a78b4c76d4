//! Signature oracles consulted by the quorum check

use ethers::types::{Address, H256, Signature};
use tracing::trace;

/// Decides whether a signature over `message` was produced by `key`
///
/// Implementations must be deterministic and free of side effects on the
/// validation outcome.
pub trait SignatureVerifier: Send + Sync {
    fn verify_signature(&self, message: H256, key: &Address, signature: &Signature) -> bool;
}

/// Recoverable ECDSA (secp256k1) verifier
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaVerifier;

impl SignatureVerifier for EcdsaVerifier {
    fn verify_signature(&self, message: H256, key: &Address, signature: &Signature) -> bool {
        // Recover the signer and compare against the claimed key
        match signature.recover(message) {
            Ok(recovered) => recovered == *key,
            Err(e) => {
                trace!("Signature recovery failed: {}", e);
                false
            }
        }
    }
}
