use ethers::types::H256;
use tracing::debug;
use tracing::span::EnteredSpan;

/// Logs entry on creation and exit on drop, inside a `validate` span
pub struct TraceScope {
    tx_hash: H256,
    _span: EnteredSpan,
}

impl TraceScope {
    pub fn enter(tx_hash: H256) -> Self {
        let span = tracing::debug_span!("validate", tx = ?tx_hash).entered();
        debug!("Validation started for {:?}", tx_hash);
        Self {
            tx_hash,
            _span: span,
        }
    }
}

impl Drop for TraceScope {
    fn drop(&mut self) {
        debug!("Validation finished for {:?}", self.tx_hash);
    }
}
