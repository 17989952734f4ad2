use chrono::Utc;
use uuid::Uuid;

use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*};

use crate::{
    EngineError, Expense, ExpenseObligation, ExpensePayment, NewExpense, ResultEngine,
    expense_obligations, expense_payments, expenses,
};

use super::{Engine, with_tx};

/// An expense with the rows that feed balances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpenseDetail {
    pub expense: Expense,
    pub payments: Vec<ExpensePayment>,
    pub obligations: Vec<ExpenseObligation>,
}

impl Engine {
    /// Record an expense together with its payments and obligations.
    ///
    /// The three inserts share one DB transaction, so a balance query never
    /// sees an expense with only part of its rows.
    pub async fn record_expense(&self, expense: NewExpense) -> ResultEngine<Uuid> {
        let (expense, payments, obligations) = expense.into_parts(Utc::now())?;
        with_tx!(self, |db_tx| {
            expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
            for payment in &payments {
                expense_payments::ActiveModel::from(payment)
                    .insert(&db_tx)
                    .await?;
            }
            for obligation in &obligations {
                expense_obligations::ActiveModel::from(obligation)
                    .insert(&db_tx)
                    .await?;
            }

            tracing::info!(
                expense_id = %expense.id,
                group = expense.group_id.as_deref().unwrap_or("-"),
                amount = %expense.amount,
                payers = payments.len(),
                participants = obligations.len(),
                "recorded expense"
            );
            Ok::<_, EngineError>(expense.id)
        })
    }

    /// Return an expense with its payments and obligations.
    pub async fn expense(&self, expense_id: Uuid) -> ResultEngine<ExpenseDetail> {
        let id = expense_id.to_string();
        let model = expenses::Entity::find_by_id(id.clone())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;

        let payments = expense_payments::Entity::find()
            .filter(expense_payments::Column::ExpenseId.eq(id.as_str()))
            .order_by_asc(expense_payments::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(ExpensePayment::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let obligations = expense_obligations::Entity::find()
            .filter(expense_obligations::Column::ExpenseId.eq(id.as_str()))
            .order_by_asc(expense_obligations::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(ExpenseObligation::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        Ok(ExpenseDetail {
            expense: Expense::try_from(model)?,
            payments,
            obligations,
        })
    }
}
