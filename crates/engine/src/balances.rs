//! Net balance accumulation.
//!
//! Folds a [`FactSet`] into one signed amount per user:
//! - a payment adds `amount_paid` to the payer;
//! - an obligation subtracts `amount_owed` from the participant;
//! - a completed settlement subtracts from the payer and adds to the receiver.
//!
//! Every term has an opposite term somewhere else, so the balances of any
//! valid fact set sum to exactly zero.

use std::collections::{BTreeMap, btree_map};

use serde::Serialize;
use uuid::Uuid;

use crate::{EngineError, FactSet, Money, ResultEngine};

/// Net position of every user with a non-zero balance, ordered by user id.
///
/// Positive = owed money, negative = owes money.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NetBalances(BTreeMap<String, Money>);

impl NetBalances {
    /// Balance of `user_id`, zero when absent.
    pub fn get(&self, user_id: &str) -> Money {
        self.0.get(user_id).copied().unwrap_or(Money::ZERO)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Money> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all balances; zero for a consistent ledger.
    pub fn total(&self) -> Money {
        self.0.values().sum()
    }

    pub fn into_inner(self) -> BTreeMap<String, Money> {
        self.0
    }

    fn add(&mut self, user_id: &str, amount: Money) {
        match self.0.get_mut(user_id) {
            Some(balance) => *balance += amount,
            None => {
                self.0.insert(user_id.to_string(), amount);
            }
        }
    }

    fn try_add(&mut self, user_id: &str, amount: Money) -> ResultEngine<()> {
        let balance = self.0.entry(user_id.to_string()).or_default();
        *balance = balance.checked_add(amount).ok_or_else(|| {
            EngineError::InvalidAmount(format!("balance of {user_id} is too large"))
        })?;
        Ok(())
    }

    fn drop_settled(&mut self) {
        self.0.retain(|_, balance| !balance.is_zero());
    }
}

impl<S: Into<String>> FromIterator<(S, Money)> for NetBalances {
    /// Builds balances from raw `(user, amount)` terms, summing repeated users
    /// and dropping the ones that end at zero.
    fn from_iter<T: IntoIterator<Item = (S, Money)>>(iter: T) -> Self {
        let mut balances = NetBalances::default();
        for (user_id, amount) in iter {
            balances.add(&user_id.into(), amount);
        }
        balances.drop_settled();
        balances
    }
}

impl<'a> IntoIterator for &'a NetBalances {
    type Item = (&'a String, &'a Money);
    type IntoIter = btree_map::Iter<'a, String, Money>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Fold the facts into net balances.
///
/// Fails with [`EngineError::LedgerImbalance`] when an expense in the set does
/// not pay out exactly what its participants owe, since folding it would
/// create or destroy money.
pub fn accumulate(facts: &FactSet) -> ResultEngine<NetBalances> {
    ensure_expenses_balanced(facts)?;

    let mut balances = NetBalances::default();

    for payment in &facts.payments {
        balances.try_add(&payment.user_id, payment.amount_paid)?;
    }

    for obligation in &facts.obligations {
        balances.try_add(&obligation.user_id, -obligation.amount_owed)?;
    }

    for settlement in facts.settlements.iter().filter(|s| s.is_completed()) {
        balances.try_add(&settlement.from_user_id, settlement.amount)?;
        balances.try_add(&settlement.to_user_id, -settlement.amount)?;
    }

    balances.drop_settled();

    tracing::debug!(
        users = balances.len(),
        payments = facts.payments.len(),
        obligations = facts.obligations.len(),
        settlements = facts.settlements.len(),
        "accumulated net balances"
    );

    Ok(balances)
}

fn ensure_expenses_balanced(facts: &FactSet) -> ResultEngine<()> {
    let too_large = |expense_id: &Uuid| {
        EngineError::InvalidAmount(format!("expense {expense_id} total is too large"))
    };
    let mut per_expense: BTreeMap<Uuid, (Money, Money)> = BTreeMap::new();
    for payment in &facts.payments {
        let paid = &mut per_expense.entry(payment.expense_id).or_default().0;
        *paid = paid
            .checked_add(payment.amount_paid)
            .ok_or_else(|| too_large(&payment.expense_id))?;
    }
    for obligation in &facts.obligations {
        let owed = &mut per_expense.entry(obligation.expense_id).or_default().1;
        *owed = owed
            .checked_add(obligation.amount_owed)
            .ok_or_else(|| too_large(&obligation.expense_id))?;
    }

    match per_expense.iter().find(|(_, (paid, owed))| paid != owed) {
        Some((expense_id, (paid, owed))) => Err(EngineError::LedgerImbalance(format!(
            "expense {expense_id} was paid {paid} but is owed {owed}"
        ))),
        None => Ok(()),
    }
}
