//! Expense headers.
//!
//! An [`Expense`] groups the payments (who paid) and the obligations (who
//! owes) of one shared cost. The header only carries descriptive data and the
//! total; balances are always derived from
//! [`ExpensePayment`](crate::ExpensePayment) and
//! [`ExpenseObligation`](crate::ExpenseObligation) rows.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, ExpenseObligation, ExpensePayment, Money, ResultEngine,
    util::{normalize_optional_text, normalize_user_id, parse_uuid},
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub group_id: Option<String>,
    pub description: String,
    pub amount: Money,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// How an expense total is shared among participants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Split {
    /// Everyone owes the same share; leftover cents go to the first listed.
    Equal { participants: Vec<String> },
    /// Explicit share per participant.
    Exact { shares: Vec<(String, Money)> },
}

impl Split {
    /// Turn the split into per-user obligations for `total`.
    pub fn obligations(&self, total: Money) -> ResultEngine<Vec<(String, Money)>> {
        match self {
            Split::Equal { participants } => {
                if participants.is_empty() {
                    return Err(EngineError::InvalidExpense(
                        "equal split needs at least one participant".to_string(),
                    ));
                }
                Ok(participants
                    .iter()
                    .cloned()
                    .zip(total.split_evenly(participants.len()))
                    .collect())
            }
            Split::Exact { shares } => Ok(shares.clone()),
        }
    }
}

/// Input for recording an expense with its payers and obligors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewExpense {
    pub group_id: Option<String>,
    pub description: String,
    pub created_by: String,
    pub payments: Vec<(String, Money)>,
    pub obligations: Vec<(String, Money)>,
}

impl NewExpense {
    /// Validate the expense and split it into the header and its rows.
    ///
    /// Payments and obligations must both be non-empty, non-negative and add
    /// up to the same positive total.
    pub(crate) fn into_parts(
        self,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<(Expense, Vec<ExpensePayment>, Vec<ExpenseObligation>)> {
        if self.payments.is_empty() {
            return Err(EngineError::InvalidExpense(
                "expense needs at least one payer".to_string(),
            ));
        }
        if self.obligations.is_empty() {
            return Err(EngineError::InvalidExpense(
                "expense needs at least one participant".to_string(),
            ));
        }

        let id = Uuid::new_v4();
        let mut payments = Vec::with_capacity(self.payments.len());
        for (user_id, amount) in self.payments {
            let user_id = normalize_user_id(&user_id).ok_or_else(|| {
                EngineError::InvalidExpense("payer user id must not be empty".to_string())
            })?;
            if amount.is_negative() {
                return Err(EngineError::InvalidAmount(format!(
                    "payment of {user_id} must be >= 0"
                )));
            }
            payments.push(ExpensePayment::new(id, user_id, amount));
        }

        let mut obligations = Vec::with_capacity(self.obligations.len());
        for (user_id, amount) in self.obligations {
            let user_id = normalize_user_id(&user_id).ok_or_else(|| {
                EngineError::InvalidExpense("participant user id must not be empty".to_string())
            })?;
            if amount.is_negative() {
                return Err(EngineError::InvalidAmount(format!(
                    "share of {user_id} must be >= 0"
                )));
            }
            obligations.push(ExpenseObligation::new(id, user_id, amount));
        }

        let too_large = || EngineError::InvalidAmount("expense total too large".to_string());
        let paid =
            Money::checked_sum(payments.iter().map(|p| p.amount_paid)).ok_or_else(too_large)?;
        let owed =
            Money::checked_sum(obligations.iter().map(|o| o.amount_owed)).ok_or_else(too_large)?;
        if !paid.is_positive() {
            return Err(EngineError::InvalidAmount(
                "expense total must be > 0".to_string(),
            ));
        }
        if paid != owed {
            return Err(EngineError::InvalidExpense(format!(
                "payments total {paid} does not match shares total {owed}"
            )));
        }

        let created_by = normalize_user_id(&self.created_by).ok_or_else(|| {
            EngineError::InvalidExpense("creator user id must not be empty".to_string())
        })?;
        let expense = Expense {
            id,
            group_id: normalize_optional_text(self.group_id.as_deref()),
            description: self.description.trim().to_string(),
            amount: paid,
            created_by,
            created_at,
        };

        Ok((expense, payments, obligations))
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub group_id: Option<String>,
    pub description: String,
    pub amount_minor: i64,
    pub created_by: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::expense_payments::Entity")]
    Payments,
    #[sea_orm(has_many = "super::expense_obligations::Entity")]
    Obligations,
}

impl Related<super::expense_payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl Related<super::expense_obligations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Obligations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(expense: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(expense.id.to_string()),
            group_id: ActiveValue::Set(expense.group_id.clone()),
            description: ActiveValue::Set(expense.description.clone()),
            amount_minor: ActiveValue::Set(expense.amount.minor()),
            created_by: ActiveValue::Set(expense.created_by.clone()),
            created_at: ActiveValue::Set(expense.created_at),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "expense")?,
            group_id: model.group_id,
            description: model.description,
            amount: Money::new(model.amount_minor),
            created_by: model.created_by,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_expense(payments: &[(&str, i64)], obligations: &[(&str, i64)]) -> NewExpense {
        NewExpense {
            group_id: Some(" trip ".to_string()),
            description: "Dinner".to_string(),
            created_by: "u1".to_string(),
            payments: payments
                .iter()
                .map(|(u, a)| (ToString::to_string(u), Money::new(*a)))
                .collect(),
            obligations: obligations
                .iter()
                .map(|(u, a)| (ToString::to_string(u), Money::new(*a)))
                .collect(),
        }
    }

    #[test]
    fn equal_split_distributes_leftover_cents() {
        let split = Split::Equal {
            participants: vec!["u1".into(), "u2".into(), "u3".into()],
        };
        let shares = split.obligations(Money::new(1000)).unwrap();
        assert_eq!(
            shares,
            vec![
                ("u1".to_string(), Money::new(334)),
                ("u2".to_string(), Money::new(333)),
                ("u3".to_string(), Money::new(333)),
            ]
        );
        let empty = Split::Equal {
            participants: Vec::new(),
        };
        assert!(empty.obligations(Money::new(1000)).is_err());
    }

    #[test]
    fn into_parts_links_rows_to_the_expense() {
        let (expense, payments, obligations) =
            new_expense(&[("u1", 200), ("u2", 100)], &[("u1", 100), ("u2", 100), ("u3", 100)])
                .into_parts(Utc::now())
                .unwrap();
        assert_eq!(expense.amount, Money::new(300));
        assert_eq!(expense.group_id.as_deref(), Some("trip"));
        assert!(payments.iter().all(|p| p.expense_id == expense.id));
        assert!(obligations.iter().all(|o| o.expense_id == expense.id));
        assert_eq!(obligations.len(), 3);
    }

    #[test]
    fn into_parts_rejects_unbalanced_or_empty_expenses() {
        assert!(matches!(
            new_expense(&[("u1", 300)], &[("u1", 100), ("u2", 100)]).into_parts(Utc::now()),
            Err(EngineError::InvalidExpense(_))
        ));
        assert!(matches!(
            new_expense(&[], &[("u1", 100)]).into_parts(Utc::now()),
            Err(EngineError::InvalidExpense(_))
        ));
        assert!(matches!(
            new_expense(&[("u1", 0)], &[("u1", 0)]).into_parts(Utc::now()),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            new_expense(&[("u1", 100), ("u2", -50)], &[("u1", 50)]).into_parts(Utc::now()),
            Err(EngineError::InvalidAmount(_))
        ));
        assert!(matches!(
            new_expense(&[(" ", 100)], &[("u1", 100)]).into_parts(Utc::now()),
            Err(EngineError::InvalidExpense(_))
        ));
    }

    #[test]
    fn into_parts_rejects_totals_that_overflow() {
        let huge = Money::from_major_lossy(5e16);
        assert_eq!(huge, Money::new(5_000_000_000_000_000_000));
        let expense = NewExpense {
            group_id: None,
            description: "yacht".to_string(),
            created_by: "u1".to_string(),
            payments: vec![("u1".to_string(), huge), ("u2".to_string(), huge)],
            obligations: vec![("u1".to_string(), huge), ("u2".to_string(), huge)],
        };
        assert!(matches!(
            expense.into_parts(Utc::now()),
            Err(EngineError::InvalidAmount(_))
        ));
    }
}
