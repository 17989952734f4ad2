use std::future::Future;

use sea_orm::{
    Condition, DbErr, QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Query,
};

use crate::{
    BalanceReport, EngineError, ExpenseObligation, ExpensePayment, FactSet, FactSource,
    ResultEngine, Scope, Settlement, SettlementStatus, expense_obligations, expense_payments,
    expenses, report::balance_report, settlements, util::normalize_optional_text,
};

use super::Engine;

fn unavailable(err: DbErr) -> EngineError {
    EngineError::DataUnavailable(err.to_string())
}

/// Restrict `column` (an expense id column) to the expenses of `scope`.
fn expenses_in_scope<C: ColumnTrait>(column: C, scope: &Scope) -> Condition {
    match scope.group_id.as_deref() {
        Some(group_id) => Condition::all().add(
            column.in_subquery(
                Query::select()
                    .column(expenses::Column::Id)
                    .from(expenses::Entity)
                    .and_where(expenses::Column::GroupId.eq(group_id))
                    .to_owned(),
            ),
        ),
        None => Condition::any()
            .add(
                column.in_subquery(
                    Query::select()
                        .column(expense_payments::Column::ExpenseId)
                        .from(expense_payments::Entity)
                        .and_where(expense_payments::Column::UserId.eq(scope.viewer_id.as_str()))
                        .to_owned(),
                ),
            )
            .add(
                column.in_subquery(
                    Query::select()
                        .column(expense_obligations::Column::ExpenseId)
                        .from(expense_obligations::Entity)
                        .and_where(
                            expense_obligations::Column::UserId.eq(scope.viewer_id.as_str()),
                        )
                        .to_owned(),
                ),
            ),
    }
}

fn settlements_in_scope(scope: &Scope) -> Condition {
    let completed = settlements::Column::Status.eq(SettlementStatus::Completed.as_str());
    match scope.group_id.as_deref() {
        Some(group_id) => Condition::all()
            .add(completed)
            .add(settlements::Column::GroupId.eq(group_id)),
        None => Condition::all().add(completed).add(
            Condition::any()
                .add(settlements::Column::FromUserId.eq(scope.viewer_id.as_str()))
                .add(settlements::Column::ToUserId.eq(scope.viewer_id.as_str())),
        ),
    }
}

impl Engine {
    /// Load every fact of `scope` from the database.
    ///
    /// The three reads share one DB transaction, so an expense committed
    /// meanwhile is seen either whole or not at all. They fail as
    /// [`EngineError::DataUnavailable`]; no partial set is ever returned.
    async fn collect_facts(&self, scope: &Scope) -> ResultEngine<FactSet> {
        let db_tx = self.database.begin().await.map_err(unavailable)?;

        let payments = expense_payments::Entity::find()
            .filter(expenses_in_scope(expense_payments::Column::ExpenseId, scope))
            .order_by_asc(expense_payments::Column::ExpenseId)
            .order_by_asc(expense_payments::Column::Id)
            .all(&db_tx)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(ExpensePayment::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let obligations = expense_obligations::Entity::find()
            .filter(expenses_in_scope(
                expense_obligations::Column::ExpenseId,
                scope,
            ))
            .order_by_asc(expense_obligations::Column::ExpenseId)
            .order_by_asc(expense_obligations::Column::Id)
            .all(&db_tx)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(ExpenseObligation::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        let settlements = settlements::Entity::find()
            .filter(settlements_in_scope(scope))
            .order_by_asc(settlements::Column::CreatedAt)
            .order_by_asc(settlements::Column::Id)
            .all(&db_tx)
            .await
            .map_err(unavailable)?
            .into_iter()
            .map(Settlement::try_from)
            .collect::<ResultEngine<Vec<_>>>()?;

        db_tx.commit().await.map_err(unavailable)?;

        tracing::debug!(
            viewer = scope.viewer_id.as_str(),
            group = scope.group_id.as_deref().unwrap_or("-"),
            payments = payments.len(),
            obligations = obligations.len(),
            settlements = settlements.len(),
            "collected ledger facts"
        );

        Ok(FactSet {
            payments,
            obligations,
            settlements,
        })
    }

    /// Compute the balance report of `viewer_id`, across every group or
    /// within `group_id` only.
    ///
    /// - `group_id` is trimmed like stored group ids; a blank one means
    ///   every group.
    /// - Only completed settlements are considered.
    /// - Nothing is written: the report is derived fresh on every call.
    pub async fn compute_balances(
        &self,
        viewer_id: &str,
        group_id: Option<&str>,
    ) -> ResultEngine<BalanceReport> {
        let scope = match normalize_optional_text(group_id) {
            Some(group_id) => Scope::group(viewer_id.trim(), group_id),
            None => Scope::global(viewer_id.trim()),
        };
        balance_report(self, &scope).await
    }
}

impl FactSource for Engine {
    fn collect(&self, scope: &Scope) -> impl Future<Output = ResultEngine<FactSet>> + Send {
        self.collect_facts(scope)
    }
}
