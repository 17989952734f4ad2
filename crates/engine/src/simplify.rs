//! Debt simplification.
//!
//! Greedy matching of the largest remaining debtor with the largest remaining
//! creditor. Each step fully settles at least one of the two, so `n` non-zero
//! balances produce at most `n - 1` transactions. The result is not always
//! the global minimum (that problem is NP-hard) but it is bounded and
//! deterministic: ties on amount are broken by user id, ascending.

use std::{cmp::Ordering, collections::BinaryHeap, fmt};

use serde::{Deserialize, Serialize};

use crate::{EngineError, Money, NetBalances, ResultEngine};

/// A suggested payment: `from_user_id` pays `to_user_id` the `amount`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedTransaction {
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: Money,
}

impl fmt::Display for SimplifiedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pays {} {}",
            self.from_user_id, self.to_user_id, self.amount
        )
    }
}

/// One side of the matching with what is left to settle (always positive).
#[derive(Debug, PartialEq, Eq)]
struct Party {
    remaining: Money,
    user_id: String,
}

impl Ord for Party {
    // Max-heap order: larger amounts first, then smaller user ids first.
    fn cmp(&self, other: &Self) -> Ordering {
        self.remaining
            .cmp(&other.remaining)
            .then_with(|| other.user_id.cmp(&self.user_id))
    }
}

impl PartialOrd for Party {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Reduce net balances to a list of pairwise payments that zero everyone.
///
/// Fails with [`EngineError::LedgerImbalance`] if the balances do not sum to
/// zero: a creditor or debtor left without counterpart means the upstream
/// facts are corrupt, and emitting a partial plan would hide it.
pub fn simplify(balances: &NetBalances) -> ResultEngine<Vec<SimplifiedTransaction>> {
    let total = balances.total();
    if !total.is_zero() {
        return Err(EngineError::LedgerImbalance(format!(
            "balances sum to {total} instead of zero"
        )));
    }

    let mut creditors = BinaryHeap::new();
    let mut debtors = BinaryHeap::new();
    for (user_id, balance) in balances {
        let party = Party {
            remaining: balance.abs(),
            user_id: user_id.clone(),
        };
        if balance.is_positive() {
            creditors.push(party);
        } else if balance.is_negative() {
            debtors.push(party);
        }
    }

    let mut transactions = Vec::with_capacity(balances.len().saturating_sub(1));
    loop {
        match (debtors.pop(), creditors.pop()) {
            (Some(mut debtor), Some(mut creditor)) => {
                let amount = debtor.remaining.min(creditor.remaining);
                debtor.remaining -= amount;
                creditor.remaining -= amount;

                transactions.push(SimplifiedTransaction {
                    from_user_id: debtor.user_id.clone(),
                    to_user_id: creditor.user_id.clone(),
                    amount,
                });

                if !debtor.remaining.is_zero() {
                    debtors.push(debtor);
                }
                if !creditor.remaining.is_zero() {
                    creditors.push(creditor);
                }
            }
            (None, None) => break,
            (Some(unmatched), None) | (None, Some(unmatched)) => {
                return Err(EngineError::LedgerImbalance(format!(
                    "{} is left with {} and no counterpart",
                    unmatched.user_id, unmatched.remaining
                )));
            }
        }
    }

    tracing::debug!(
        users = balances.len(),
        transactions = transactions.len(),
        "simplified debts"
    );

    Ok(transactions)
}
