//! Quorum Checker
//!
//! Counts how many submitted signatures correspond to wallet owners and
//! compares the count against the threshold.
//!
//! # Matching Policies
//! - **SetBased**: any signature may match any owner, but each owner is
//!   consumed at most once. The count is the size of a maximum matching
//!   between owners and signatures.
//! - **Positional**: signature `i` counts only if it is valid for owner `i`.

use ethers::types::{Address, Signature};
use serde::Deserialize;

/// How signatures are paired with owners
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchingPolicy {
    #[default]
    SetBased,
    Positional,
}

/// Check whether enough owners signed
///
/// `verify` is called with each candidate (owner, signature) pair. The
/// threshold is not special-cased, so the result is monotone in it.
pub fn verify_quorum<F>(
    owners: &[Address],
    signatures: &[Signature],
    threshold: i64,
    policy: MatchingPolicy,
    verify: F,
) -> bool
where
    F: Fn(&Address, &Signature) -> bool,
{
    let matched = count_matches(owners, signatures, policy, verify);
    matched as i64 >= threshold
}

/// Number of signatures matched to distinct owners under `policy`
pub fn count_matches<F>(
    owners: &[Address],
    signatures: &[Signature],
    policy: MatchingPolicy,
    verify: F,
) -> usize
where
    F: Fn(&Address, &Signature) -> bool,
{
    match policy {
        MatchingPolicy::Positional => owners
            .iter()
            .zip(signatures)
            .filter(|&(owner, signature)| verify(owner, signature))
            .count(),
        MatchingPolicy::SetBased => {
            // valid[s] lists the owners signature s verifies under
            let valid: Vec<Vec<usize>> = signatures
                .iter()
                .map(|signature| {
                    owners
                        .iter()
                        .enumerate()
                        .filter(|&(_, owner)| verify(owner, signature))
                        .map(|(i, _)| i)
                        .collect()
                })
                .collect();

            let mut assignment = OwnerAssignment::new(owners.len());
            (0..signatures.len())
                .filter(|&sig| assignment.try_assign(sig, &valid))
                .count()
        }
    }
}

/// Owner index -> signature index that consumed it
struct OwnerAssignment {
    consumed_by: Vec<Option<usize>>,
}

impl OwnerAssignment {
    fn new(owners: usize) -> Self {
        Self {
            consumed_by: vec![None; owners],
        }
    }

    /// Find an owner for `sig`, re-seating earlier signatures if needed
    fn try_assign(&mut self, sig: usize, valid: &[Vec<usize>]) -> bool {
        let mut visited = vec![false; self.consumed_by.len()];
        self.augment(sig, valid, &mut visited)
    }

    fn augment(&mut self, sig: usize, valid: &[Vec<usize>], visited: &mut [bool]) -> bool {
        for &owner in &valid[sig] {
            if visited[owner] {
                continue;
            }
            visited[owner] = true;

            let free = match self.consumed_by[owner] {
                None => true,
                Some(holder) => self.augment(holder, valid, visited),
            };
            if free {
                self.consumed_by[owner] = Some(sig);
                return true;
            }
        }
        false
    }
}
