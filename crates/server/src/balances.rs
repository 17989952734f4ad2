//! Balances API endpoint.

use api_types::balances::{BalanceReportView, BalancesQuery, TransactionView};
use axum::{
    Extension, Json,
    extract::{Query, State},
};
use engine::BalanceReport;

use crate::{
    ServerError,
    server::{ServerState, Viewer},
};

fn view(report: BalanceReport) -> BalanceReportView {
    BalanceReportView {
        you_owe_minor: report.you_owe.minor(),
        you_are_owed_minor: report.you_are_owed.minor(),
        simplified_transactions: report
            .simplified_transactions
            .into_iter()
            .map(|tx| TransactionView {
                from_user_id: tx.from_user_id,
                to_user_id: tx.to_user_id,
                amount_minor: tx.amount.minor(),
            })
            .collect(),
        balances: report
            .balances
            .into_inner()
            .into_iter()
            .map(|(user_id, amount)| (user_id, amount.minor()))
            .collect(),
    }
}

pub async fn get(
    Extension(viewer): Extension<Viewer>,
    State(state): State<ServerState>,
    Query(query): Query<BalancesQuery>,
) -> Result<Json<BalanceReportView>, ServerError> {
    let group_id = query
        .group_id
        .as_deref()
        .map(str::trim)
        .filter(|group| !group.is_empty());
    let report = state.engine.compute_balances(&viewer.0, group_id).await?;
    Ok(Json(view(report)))
}
