//! Ledger facts and their collection.
//!
//! A balance query never looks at storage directly: a [`FactSource`] first
//! gathers the [`FactSet`] for a [`Scope`], and the rest of the pipeline is a
//! pure function of that set.
//!
//! Scope rules:
//! - **global**: every payment and obligation of each expense the viewer
//!   paid for or shares, plus every completed settlement the viewer is part of;
//! - **group**: every payment and obligation of each expense in the group,
//!   whether or not the viewer took part, plus every completed settlement
//!   tagged with the group.

use std::{collections::HashSet, future::Future};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    EngineError, Expense, ExpenseObligation, ExpensePayment, NewExpense, NewSettlement,
    ResultEngine, Settlement, SettlementStatus,
};

/// Which facts a balance query considers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scope {
    pub viewer_id: String,
    pub group_id: Option<String>,
}

impl Scope {
    pub fn global(viewer_id: impl Into<String>) -> Self {
        Self {
            viewer_id: viewer_id.into(),
            group_id: None,
        }
    }

    pub fn group(viewer_id: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            viewer_id: viewer_id.into(),
            group_id: Some(group_id.into()),
        }
    }
}

/// Immutable input of the balance pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FactSet {
    pub payments: Vec<ExpensePayment>,
    pub obligations: Vec<ExpenseObligation>,
    pub settlements: Vec<Settlement>,
}

impl FactSet {
    pub fn is_empty(&self) -> bool {
        self.payments.is_empty() && self.obligations.is_empty() && self.settlements.is_empty()
    }
}

/// Something that can collect the facts of a scope.
///
/// Implementations must not drop records silently: a failed retrieval is
/// reported as [`EngineError::DataUnavailable`] instead of a partial set.
pub trait FactSource {
    fn collect(&self, scope: &Scope) -> impl Future<Output = ResultEngine<FactSet>> + Send;
}

/// In-memory ledger.
///
/// Useful for tests and for callers that already hold the facts.
#[derive(Clone, Debug, Default)]
pub struct MemoryLedger {
    expenses: Vec<Expense>,
    payments: Vec<ExpensePayment>,
    obligations: Vec<ExpenseObligation>,
    settlements: Vec<Settlement>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and store an expense, returning its id.
    pub fn record_expense(&mut self, expense: NewExpense) -> ResultEngine<Uuid> {
        let (expense, payments, obligations) = expense.into_parts(Utc::now())?;
        let id = expense.id;
        self.expenses.push(expense);
        self.payments.extend(payments);
        self.obligations.extend(obligations);
        Ok(id)
    }

    /// Validate and store a settlement, returning its id.
    pub fn record_settlement(&mut self, settlement: NewSettlement) -> ResultEngine<Uuid> {
        let settlement = settlement.into_settlement(Utc::now())?;
        let id = settlement.id;
        self.settlements.push(settlement);
        Ok(id)
    }

    /// Move a settlement along its lifecycle.
    pub fn set_settlement_status(
        &mut self,
        settlement_id: Uuid,
        status: SettlementStatus,
    ) -> ResultEngine<()> {
        let settlement = self
            .settlements
            .iter_mut()
            .find(|s| s.id == settlement_id)
            .ok_or_else(|| EngineError::KeyNotFound("settlement not exists".to_string()))?;
        settlement.status.ensure_transition(status)?;
        settlement.status = status;
        Ok(())
    }

    fn collect_now(&self, scope: &Scope) -> FactSet {
        let expense_ids: HashSet<Uuid> = match scope.group_id.as_deref() {
            Some(group_id) => self
                .expenses
                .iter()
                .filter(|e| e.group_id.as_deref() == Some(group_id))
                .map(|e| e.id)
                .collect(),
            None => self
                .payments
                .iter()
                .filter(|p| p.user_id == scope.viewer_id)
                .map(|p| p.expense_id)
                .chain(
                    self.obligations
                        .iter()
                        .filter(|o| o.user_id == scope.viewer_id)
                        .map(|o| o.expense_id),
                )
                .collect(),
        };

        let settlements = self
            .settlements
            .iter()
            .filter(|s| s.is_completed())
            .filter(|s| match scope.group_id.as_deref() {
                Some(group_id) => s.group_id.as_deref() == Some(group_id),
                None => s.involves(&scope.viewer_id),
            })
            .cloned()
            .collect();

        FactSet {
            payments: self
                .payments
                .iter()
                .filter(|p| expense_ids.contains(&p.expense_id))
                .cloned()
                .collect(),
            obligations: self
                .obligations
                .iter()
                .filter(|o| expense_ids.contains(&o.expense_id))
                .cloned()
                .collect(),
            settlements,
        }
    }
}

impl FactSource for MemoryLedger {
    fn collect(&self, scope: &Scope) -> impl Future<Output = ResultEngine<FactSet>> + Send {
        std::future::ready(Ok(self.collect_now(scope)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Money;

    fn expense(group: Option<&str>, payer: &str, total: i64, participants: &[&str]) -> NewExpense {
        let total = Money::new(total);
        NewExpense {
            group_id: group.map(ToString::to_string),
            description: "test".to_string(),
            created_by: payer.to_string(),
            payments: vec![(payer.to_string(), total)],
            obligations: participants
                .iter()
                .map(|p| p.to_string())
                .zip(total.split_evenly(participants.len()))
                .collect(),
        }
    }

    fn settlement(from: &str, to: &str, amount: i64, group: Option<&str>) -> NewSettlement {
        NewSettlement {
            from_user_id: from.to_string(),
            to_user_id: to.to_string(),
            amount: Money::new(amount),
            group_id: group.map(ToString::to_string),
            status: None,
        }
    }

    #[test]
    fn global_scope_takes_whole_expenses_the_viewer_is_part_of() {
        let mut ledger = MemoryLedger::new();
        ledger
            .record_expense(expense(Some("trip"), "u1", 300, &["u1", "u2", "u3"]))
            .unwrap();
        ledger
            .record_expense(expense(None, "u4", 200, &["u4", "u5"]))
            .unwrap();
        ledger
            .record_expense(expense(None, "u5", 100, &["u2"]))
            .unwrap();

        let facts = ledger.collect_now(&Scope::global("u2"));
        // Both expenses u2 shares, with all their rows; not the u4/u5 one.
        assert_eq!(facts.payments.len(), 2);
        assert_eq!(facts.obligations.len(), 4);
        assert!(facts.obligations.iter().any(|o| o.user_id == "u3"));
        assert!(facts.payments.iter().all(|p| p.user_id != "u4"));
    }

    #[test]
    fn group_scope_ignores_viewer_involvement() {
        let mut ledger = MemoryLedger::new();
        ledger
            .record_expense(expense(Some("trip"), "u1", 300, &["u1", "u2", "u3"]))
            .unwrap();
        ledger
            .record_expense(expense(Some("home"), "u9", 100, &["u9", "u8"]))
            .unwrap();
        ledger
            .record_settlement(settlement("u2", "u1", 100, Some("trip")))
            .unwrap();
        ledger
            .record_settlement(settlement("u3", "u1", 50, None))
            .unwrap();

        let facts = ledger.collect_now(&Scope::group("outsider", "trip"));
        assert_eq!(facts.payments.len(), 1);
        assert_eq!(facts.obligations.len(), 3);
        assert_eq!(facts.settlements.len(), 1);
        assert_eq!(facts.settlements[0].group_id.as_deref(), Some("trip"));
    }

    #[test]
    fn only_completed_settlements_are_collected() {
        let mut ledger = MemoryLedger::new();
        let mut pending = settlement("u2", "u1", 100, None);
        pending.status = Some(SettlementStatus::Pending);
        let pending_id = ledger.record_settlement(pending).unwrap();
        let done_id = ledger
            .record_settlement(settlement("u1", "u3", 40, None))
            .unwrap();

        let facts = ledger.collect_now(&Scope::global("u1"));
        assert_eq!(facts.settlements.len(), 1);

        ledger
            .set_settlement_status(pending_id, SettlementStatus::Completed)
            .unwrap();
        ledger
            .set_settlement_status(done_id, SettlementStatus::Cancelled)
            .unwrap();
        let facts = ledger.collect_now(&Scope::global("u1"));
        assert_eq!(facts.settlements.len(), 1);
        assert_eq!(facts.settlements[0].id, pending_id);

        assert!(matches!(
            ledger.set_settlement_status(done_id, SettlementStatus::Completed),
            Err(EngineError::InvalidSettlement(_))
        ));
        assert!(matches!(
            ledger.set_settlement_status(Uuid::new_v4(), SettlementStatus::Completed),
            Err(EngineError::KeyNotFound(_))
        ));
    }

    #[test]
    fn empty_ledger_collects_nothing() {
        let ledger = MemoryLedger::new();
        assert!(ledger.collect_now(&Scope::global("u1")).is_empty());
    }
}
