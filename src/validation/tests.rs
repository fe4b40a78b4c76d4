//! Tests for the spend validator
//!
//! Uses real secp256k1 keys so the quorum leg runs through ECDSA recovery.

#[cfg(test)]
mod tests {
    use crate::{
        Rejection, SpendRequest, TransactionContext, TxOut, WalletError, WalletState,
        instrument::SystemMeter,
        validation::{
            EcdsaVerifier, ExactSum, MatchingPolicy, Reconciler, SignatureVerifier, Validator,
        },
    };
    use ethers::signers::{LocalWallet, Signer};
    use ethers::types::{Address, H256, Signature, U256};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Barrier};

    /// Reconciler that counts how often it is consulted
    #[derive(Default)]
    struct SpyReconciler {
        calls: Arc<AtomicUsize>,
    }

    impl Reconciler for SpyReconciler {
        fn reconcile(&self, outputs: &[TxOut], expected: U256) -> Result<(), Rejection> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            ExactSum.reconcile(outputs, expected)
        }
    }

    /// ECDSA verifier that counts oracle calls
    #[derive(Default)]
    struct CountingVerifier {
        calls: AtomicUsize,
    }

    impl SignatureVerifier for CountingVerifier {
        fn verify_signature(&self, message: H256, key: &Address, signature: &Signature) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            EcdsaVerifier.verify_signature(message, key, signature)
        }
    }

    fn validator_calls(validator: &Validator<CountingVerifier>) -> usize {
        validator.verifier().calls.load(Ordering::SeqCst)
    }

    /// ECDSA verifier whose calls on two threads proceed in lockstep
    struct LockstepVerifier {
        barrier: Barrier,
    }

    impl SignatureVerifier for LockstepVerifier {
        fn verify_signature(&self, message: H256, key: &Address, signature: &Signature) -> bool {
            self.barrier.wait();
            EcdsaVerifier.verify_signature(message, key, signature)
        }
    }

    fn key(seed: u8) -> LocalWallet {
        LocalWallet::from_bytes(&[seed; 32]).unwrap()
    }

    /// Owners A, B, C
    fn owner_keys() -> [LocalWallet; 3] {
        [key(1), key(2), key(3)]
    }

    /// Wallet with owners A, B, C, threshold 2, balance 100
    fn create_wallet(keys: &[LocalWallet]) -> WalletState {
        WalletState::new(keys.iter().map(|k| k.address()).collect(), 2)
            .unwrap()
            .with_balance(U256::from(100))
    }

    fn create_context(values: &[u64]) -> TransactionContext {
        TransactionContext {
            wallet: Address::from_low_u64_be(0xc0ffee),
            nonce: 7,
            outputs: values
                .iter()
                .enumerate()
                .map(|(i, &v)| TxOut {
                    address: Address::from_low_u64_be(i as u64 + 100),
                    value: U256::from(v),
                })
                .collect(),
        }
    }

    fn sign(ctx: &TransactionContext, signers: &[&LocalWallet]) -> SpendRequest {
        let hash = ctx.signing_hash();
        SpendRequest {
            signatures: signers
                .iter()
                .map(|k| k.sign_hash(hash).unwrap())
                .collect(),
        }
    }

    fn validator() -> Validator<EcdsaVerifier> {
        Validator::new(EcdsaVerifier, MatchingPolicy::SetBased)
    }

    #[test]
    fn test_two_of_three_with_matching_outputs_is_authorized() {
        let [a, b, _c] = owner_keys();
        let wallet = create_wallet(&owner_keys());
        let ctx = create_context(&[60, 40]);
        let request = sign(&ctx, &[&a, &b]);

        assert!(validator().validate(&ctx, &wallet, &request));
    }

    #[test]
    fn test_single_signature_fails_quorum() {
        let [a, _b, _c] = owner_keys();
        let wallet = create_wallet(&owner_keys());
        let ctx = create_context(&[60, 40]);
        let request = sign(&ctx, &[&a]);

        assert_eq!(
            validator().check(&ctx, &wallet, &request),
            Err(Rejection::InsufficientSignatures {
                matched: 1,
                required: 2
            })
        );
    }

    #[test]
    fn test_outputs_short_by_one_fail_balance() {
        let [a, b, _c] = owner_keys();
        let wallet = create_wallet(&owner_keys());
        let ctx = create_context(&[60, 39]);
        let request = sign(&ctx, &[&a, &b]);

        assert_eq!(
            validator().check(&ctx, &wallet, &request),
            Err(Rejection::BalanceMismatch {
                outputs: U256::from(99),
                expected: U256::from(100),
            })
        );
    }

    #[test]
    fn test_zero_threshold_wallet_is_rejected() {
        let mut wallet = create_wallet(&owner_keys());
        wallet.threshold = 0;
        let ctx = create_context(&[60, 40]);

        assert_eq!(
            validator().check(&ctx, &wallet, &SpendRequest::default()),
            Err(Rejection::MalformedWallet(WalletError::NonPositiveThreshold(0)))
        );
    }

    #[test]
    fn test_empty_outputs_balance_zero() {
        let [a, b, _c] = owner_keys();
        let wallet = create_wallet(&owner_keys()).with_balance(U256::zero());
        let ctx = create_context(&[]);
        let request = sign(&ctx, &[&a, &b]);

        assert!(validator().validate(&ctx, &wallet, &request));
    }

    #[test]
    fn test_quorum_failure_skips_balance_check() {
        let [a, _b, _c] = owner_keys();
        let wallet = create_wallet(&owner_keys());
        let ctx = create_context(&[60, 40]);

        let spy = SpyReconciler::default();
        let calls = spy.calls.clone();
        let validator = validator().with_reconciler(spy);

        assert!(!validator.validate(&ctx, &wallet, &sign(&ctx, &[&a])));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(!validator.validate(&ctx, &wallet, &SpendRequest::default()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_quorum_success_runs_balance_check_once() {
        let [a, b, _c] = owner_keys();
        let wallet = create_wallet(&owner_keys());
        let ctx = create_context(&[60, 40]);

        let spy = SpyReconciler::default();
        let calls = spy.calls.clone();
        let validator = validator().with_reconciler(spy);

        assert!(validator.validate(&ctx, &wallet, &sign(&ctx, &[&a, &b])));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validation_is_deterministic() {
        let [a, _b, c] = owner_keys();
        let wallet = create_wallet(&owner_keys());
        let ctx = create_context(&[100]);
        let request = sign(&ctx, &[&c, &a]);
        let validator = validator();

        let first = validator.check(&ctx, &wallet, &request);
        let second = validator.check(&ctx, &wallet, &request);
        assert_eq!(first, second);
        assert_eq!(first, Ok(()));
    }

    #[test]
    fn test_signature_order_under_each_policy() {
        let [a, b, _c] = owner_keys();
        let wallet = create_wallet(&owner_keys());
        let ctx = create_context(&[60, 40]);
        let in_order = sign(&ctx, &[&a, &b]);
        let reversed = sign(&ctx, &[&b, &a]);

        let set_based = Validator::new(EcdsaVerifier, MatchingPolicy::SetBased);
        assert!(set_based.validate(&ctx, &wallet, &in_order));
        assert!(set_based.validate(&ctx, &wallet, &reversed));

        let positional = Validator::new(EcdsaVerifier, MatchingPolicy::Positional);
        assert!(positional.validate(&ctx, &wallet, &in_order));
        assert_eq!(
            positional.check(&ctx, &wallet, &reversed),
            Err(Rejection::InsufficientSignatures {
                matched: 0,
                required: 2
            })
        );
    }

    #[test]
    fn test_one_owner_cannot_fill_two_slots() {
        let [a, _b, _c] = owner_keys();
        let wallet = create_wallet(&owner_keys());
        let ctx = create_context(&[60, 40]);
        let request = sign(&ctx, &[&a, &a, &a]);

        assert_eq!(
            validator().check(&ctx, &wallet, &request),
            Err(Rejection::InsufficientSignatures {
                matched: 1,
                required: 2
            })
        );
    }

    #[test]
    fn test_outsider_and_garbage_signatures_are_ignored() {
        let [a, _b, _c] = owner_keys();
        let outsider = key(9);
        let wallet = create_wallet(&owner_keys());
        let ctx = create_context(&[60, 40]);

        let mut request = sign(&ctx, &[&a, &outsider]);
        request.signatures.push(Signature {
            r: U256::zero(),
            s: U256::zero(),
            v: 27,
        });

        assert!(!validator().validate(&ctx, &wallet, &request));
    }

    #[test]
    fn test_signatures_for_another_transaction_do_not_count() {
        let [a, b, _c] = owner_keys();
        let wallet = create_wallet(&owner_keys());
        let signed = create_context(&[60, 40]);
        let mut submitted = signed.clone();
        submitted.outputs[0].address = Address::from_low_u64_be(0xbad);

        let request = sign(&signed, &[&a, &b]);
        assert!(validator().validate(&signed, &wallet, &request));
        assert!(!validator().validate(&submitted, &wallet, &request));
    }

    #[test]
    fn test_malformed_wallet_never_consults_oracle() {
        let [a, b, _c] = owner_keys();
        let ctx = create_context(&[100]);
        let request = sign(&ctx, &[&a, &b]);
        let validator = Validator::new(CountingVerifier::default(), MatchingPolicy::SetBased);

        let mut duplicated = create_wallet(&owner_keys());
        duplicated.owners[2] = a.address();
        assert_eq!(
            validator.check(&ctx, &duplicated, &request),
            Err(Rejection::MalformedWallet(WalletError::DuplicateOwner(
                a.address()
            )))
        );

        let mut unreachable = create_wallet(&owner_keys());
        unreachable.threshold = 4;
        assert!(!validator.validate(&ctx, &unreachable, &request));

        let empty = WalletState {
            owners: vec![],
            threshold: 1,
            balance: U256::from(100),
        };
        assert!(!validator.validate(&ctx, &empty, &request));

        assert_eq!(validator_calls(&validator), 0);
    }

    #[test]
    fn test_profile_reports_gas_per_oracle_call() {
        let [a, b, _c] = owner_keys();
        let wallet = create_wallet(&owner_keys());
        let ctx = create_context(&[60, 40]);
        let request = sign(&ctx, &[&a, &b]);

        let validator = Validator::new(EcdsaVerifier, MatchingPolicy::SetBased)
            .with_meter(Arc::new(SystemMeter::new(10)));

        let (outcome, profile) = validator.check_profiled(&ctx, &wallet, &request);
        assert_eq!(outcome, Ok(()));

        // Two signatures checked against three owners
        let profile = profile.unwrap();
        assert_eq!(profile.gas, 60);
        assert!(profile.elapsed >= chrono::Duration::zero());
    }

    #[test]
    fn test_concurrent_profiles_report_only_their_own_gas() {
        let keys = owner_keys();
        let wallet = create_wallet(&keys);
        let validator = Validator::new(
            LockstepVerifier {
                barrier: Barrier::new(2),
            },
            MatchingPolicy::SetBased,
        )
        .with_meter(Arc::new(SystemMeter::new(10)));

        let gases: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..2u64)
                .map(|i| {
                    let keys = &keys;
                    let wallet = &wallet;
                    let validator = &validator;
                    scope.spawn(move || {
                        let mut ctx = create_context(&[60, 40]);
                        ctx.nonce = i;
                        let request = sign(&ctx, &[&keys[0], &keys[1]]);
                        let (outcome, profile) = validator.check_profiled(&ctx, wallet, &request);
                        assert_eq!(outcome, Ok(()));
                        profile.unwrap().gas
                    })
                })
                .collect();

            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        // Each call checks two signatures against three owners
        assert_eq!(gases, vec![60, 60]);
    }

    #[test]
    fn test_no_meter_means_no_profile() {
        let ctx = create_context(&[100]);
        let wallet = create_wallet(&owner_keys());
        let (_, profile) = validator().check_profiled(&ctx, &wallet, &SpendRequest::default());
        assert!(profile.is_none());
    }

    #[test]
    fn test_concurrent_validations_share_one_validator() {
        let keys = owner_keys();
        let wallet = create_wallet(&keys);
        let validator = validator();

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8u64)
                .map(|i| {
                    let keys = &keys;
                    let wallet = &wallet;
                    let validator = &validator;
                    scope.spawn(move || {
                        let mut ctx = create_context(&[60, 40]);
                        ctx.nonce = i;
                        let signers: Vec<&LocalWallet> = if i % 2 == 0 {
                            vec![&keys[0], &keys[2]]
                        } else {
                            vec![&keys[1]]
                        };
                        let request = sign(&ctx, &signers);
                        (i, validator.validate(&ctx, wallet, &request))
                    })
                })
                .collect();

            for handle in handles {
                let (i, authorized) = handle.join().unwrap();
                assert_eq!(authorized, i % 2 == 0);
            }
        });
    }
}
