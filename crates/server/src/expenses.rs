//! Expenses API endpoints.

use api_types::expense::{ExpenseCreated, ExpenseNew, PayerShare, SplitNew};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::{EngineError, Money, NewExpense, Split};

use crate::{
    ServerError,
    server::{ServerState, Viewer},
};

fn shares(entries: Vec<PayerShare>) -> Vec<(String, Money)> {
    entries
        .into_iter()
        .map(|share| (share.user_id, Money::from_major_lossy(share.amount)))
        .collect()
}

pub async fn expense_new(
    Extension(viewer): Extension<Viewer>,
    State(state): State<ServerState>,
    Json(payload): Json<ExpenseNew>,
) -> Result<(StatusCode, Json<ExpenseCreated>), ServerError> {
    let payments = shares(payload.payers);
    let total = Money::checked_sum(payments.iter().map(|(_, amount)| *amount))
        .ok_or_else(|| EngineError::InvalidAmount("expense total too large".to_string()))?;

    let split = match payload.split {
        SplitNew::Equal { participants } => Split::Equal { participants },
        SplitNew::Exact { shares: entries } => Split::Exact {
            shares: shares(entries),
        },
    };
    let obligations = split.obligations(total)?;

    let id = state
        .engine
        .record_expense(NewExpense {
            group_id: payload.group_id,
            description: payload.description,
            created_by: viewer.0,
            payments,
            obligations,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ExpenseCreated { id })))
}
