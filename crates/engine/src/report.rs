//! Balance report assembly.
//!
//! Shapes the result of a balance query for one viewer. No ledger logic
//! lives here: totals are sums over already simplified transactions.

use serde::Serialize;

use crate::{
    EngineError, FactSet, FactSource, Money, NetBalances, ResultEngine, Scope,
    SimplifiedTransaction, balances::accumulate, simplify::simplify,
};

/// Result of a balance query.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    /// What the viewer has to pay, summed over the suggested transactions.
    pub you_owe: Money,
    /// What the viewer should receive, summed over the suggested transactions.
    pub you_are_owed: Money,
    pub simplified_transactions: Vec<SimplifiedTransaction>,
    /// Net balances the transactions were derived from.
    pub balances: NetBalances,
}

impl BalanceReport {
    /// Package balances and transactions for `viewer_id`.
    pub fn assemble(
        viewer_id: &str,
        balances: NetBalances,
        simplified_transactions: Vec<SimplifiedTransaction>,
    ) -> Self {
        let you_owe = simplified_transactions
            .iter()
            .filter(|t| t.from_user_id == viewer_id)
            .map(|t| t.amount)
            .sum();
        let you_are_owed = simplified_transactions
            .iter()
            .filter(|t| t.to_user_id == viewer_id)
            .map(|t| t.amount)
            .sum();

        Self {
            you_owe,
            you_are_owed,
            simplified_transactions,
            balances,
        }
    }
}

/// Run the whole pure pipeline on an already collected fact set.
pub fn compute_report(viewer_id: &str, facts: &FactSet) -> ResultEngine<BalanceReport> {
    let balances = accumulate(facts)?;
    let transactions = simplify(&balances)?;
    Ok(BalanceReport::assemble(viewer_id, balances, transactions))
}

/// Collect the facts of `scope` from `source` and build the viewer's report.
pub async fn balance_report<S: FactSource>(source: &S, scope: &Scope) -> ResultEngine<BalanceReport> {
    let facts = source.collect(scope).await?;
    compute_report(&scope.viewer_id, &facts).inspect_err(|err| {
        if let EngineError::LedgerImbalance(detail) = err {
            tracing::error!(
                viewer = scope.viewer_id.as_str(),
                group = scope.group_id.as_deref().unwrap_or("-"),
                "ledger does not balance: {detail}"
            );
        }
    })
}
