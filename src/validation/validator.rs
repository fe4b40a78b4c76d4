use crate::{
    Rejection, SpendRequest, TransactionContext, WalletState,
    instrument::{HostMeter, Profile, ProfileScope, TraceScope},
    validation::{ExactSum, MatchingPolicy, Reconciler, SignatureVerifier, count_matches},
};
use ethers::types::H256;
use std::sync::Arc;
use tracing::{debug, warn};

/// Decides whether a spend from a custody wallet is authorized
///
/// Holds no state between calls; a single instance can serve many threads.
pub struct Validator<V, R = ExactSum> {
    verifier: V,
    reconciler: R,
    policy: MatchingPolicy,
    meter: Option<Arc<dyn HostMeter>>,
}

impl<V: SignatureVerifier> Validator<V> {
    pub fn new(verifier: V, policy: MatchingPolicy) -> Self {
        Self {
            verifier,
            reconciler: ExactSum,
            policy,
            meter: None,
        }
    }
}

impl<V: SignatureVerifier, R: Reconciler> Validator<V, R> {
    /// Swap the balance leg
    pub fn with_reconciler<R2: Reconciler>(self, reconciler: R2) -> Validator<V, R2> {
        Validator {
            verifier: self.verifier,
            reconciler,
            policy: self.policy,
            meter: self.meter,
        }
    }

    /// Profile every validation against `meter`
    pub fn with_meter(mut self, meter: Arc<dyn HostMeter>) -> Self {
        self.meter = Some(meter);
        self
    }

    pub fn policy(&self) -> MatchingPolicy {
        self.policy
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    /// Returns `true` if the spend is authorized
    pub fn validate(
        &self,
        ctx: &TransactionContext,
        state: &WalletState,
        request: &SpendRequest,
    ) -> bool {
        self.check(ctx, state, request).is_ok()
    }

    /// Validate a spend, reporting why it was rejected
    ///
    /// # Arguments
    /// * `ctx` - Transaction supplied by the host ledger (outputs and signing data)
    /// * `state` - Wallet record the spend draws from
    /// * `request` - Signatures collected from the owners
    ///
    /// # Order
    /// 1. Wallet record must be well formed
    /// 2. Owner signatures must reach the threshold
    /// 3. Outputs must sum to the wallet balance
    ///
    /// Each step runs only if the previous one passed.
    ///
    /// # Returns
    /// * `Ok(())` if the spend is authorized
    /// * `Err(Rejection)` naming the first check that failed
    pub fn check(
        &self,
        ctx: &TransactionContext,
        state: &WalletState,
        request: &SpendRequest,
    ) -> Result<(), Rejection> {
        self.check_profiled(ctx, state, request).0
    }

    /// Like [`check`](Self::check), also returning the host profile when a
    /// meter is configured
    ///
    /// Gas is counted per call, so concurrent validations each report only
    /// their own signature checks.
    pub fn check_profiled(
        &self,
        ctx: &TransactionContext,
        state: &WalletState,
        request: &SpendRequest,
    ) -> (Result<(), Rejection>, Option<Profile>) {
        // Every owner signs the same digest of the transaction
        let tx_hash = ctx.signing_hash();
        let _trace = TraceScope::enter(tx_hash);
        let profile = self.meter.as_deref().map(ProfileScope::enter);

        let outcome = self.run(ctx, state, request, tx_hash, profile.as_ref());

        (outcome, profile.map(ProfileScope::finish))
    }

    fn run(
        &self,
        ctx: &TransactionContext,
        state: &WalletState,
        request: &SpendRequest,
        tx_hash: H256,
        profile: Option<&ProfileScope<'_>>,
    ) -> Result<(), Rejection> {
        // 1. Refuse degenerate records before touching the oracle
        if let Err(e) = state.check_well_formed() {
            warn!("Rejecting spend from {:?}: malformed wallet: {}", ctx.wallet, e);
            return Err(Rejection::MalformedWallet(e));
        }

        // 2. Quorum; a failure here skips the balance leg
        self.check_quorum(state, request, tx_hash, profile)?;

        // 3. Outputs must account for the whole balance
        self.check_balance(ctx, state)?;

        debug!("Spend from {:?} authorized", ctx.wallet);
        Ok(())
    }

    fn check_quorum(
        &self,
        state: &WalletState,
        request: &SpendRequest,
        tx_hash: H256,
        profile: Option<&ProfileScope<'_>>,
    ) -> Result<(), Rejection> {
        let matched = count_matches(
            &state.owners,
            &request.signatures,
            self.policy,
            |owner, signature| {
                if let Some(profile) = profile {
                    profile.charge_signature_check();
                }
                self.verifier.verify_signature(tx_hash, owner, signature)
            },
        );

        if (matched as i64) < state.threshold {
            warn!(
                "Quorum check failed: {} of {} required signatures ({} submitted)",
                matched,
                state.threshold,
                request.signatures.len()
            );
            return Err(Rejection::InsufficientSignatures {
                matched,
                required: state.threshold,
            });
        }

        debug!("Quorum reached with {} signatures", matched);
        Ok(())
    }

    fn check_balance(&self, ctx: &TransactionContext, state: &WalletState) -> Result<(), Rejection> {
        self.reconciler
            .reconcile(&ctx.outputs, state.balance)
            .inspect_err(|e| warn!("Balance check failed: {}", e))
    }
}
