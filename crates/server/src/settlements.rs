//! Settlements API endpoints.
//!
//! The caller is always the payer of a new settlement. Only the two parties
//! of a settlement can see or change it.

use api_types::settlement::{SettlementNew, SettlementStatus as ApiStatus, SettlementView};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};
use engine::{EngineError, Money, NewSettlement, Settlement, SettlementStatus};
use uuid::Uuid;

use crate::{
    ServerError,
    server::{ServerState, Viewer},
};

fn map_status(status: SettlementStatus) -> ApiStatus {
    match status {
        SettlementStatus::Pending => ApiStatus::Pending,
        SettlementStatus::Completed => ApiStatus::Completed,
        SettlementStatus::Cancelled => ApiStatus::Cancelled,
    }
}

fn view(settlement: Settlement) -> SettlementView {
    SettlementView {
        id: settlement.id,
        from_user_id: settlement.from_user_id,
        to_user_id: settlement.to_user_id,
        amount_minor: settlement.amount.minor(),
        group_id: settlement.group_id,
        status: map_status(settlement.status),
        created_at: settlement.created_at,
    }
}

/// Load a settlement the viewer takes part in.
async fn owned_settlement(
    state: &ServerState,
    viewer: &Viewer,
    id: Uuid,
) -> Result<Settlement, ServerError> {
    let settlement = state.engine.settlement(id).await?;
    if !settlement.involves(&viewer.0) {
        return Err(EngineError::KeyNotFound("settlement not exists".to_string()).into());
    }
    Ok(settlement)
}

pub async fn settlement_new(
    Extension(viewer): Extension<Viewer>,
    State(state): State<ServerState>,
    Json(payload): Json<SettlementNew>,
) -> Result<(StatusCode, Json<SettlementView>), ServerError> {
    let id = state
        .engine
        .record_settlement(NewSettlement {
            from_user_id: viewer.0,
            to_user_id: payload.to_user_id,
            amount: Money::from_major_lossy(payload.amount),
            group_id: payload.group_id,
            status: payload.pending.then_some(SettlementStatus::Pending),
        })
        .await?;
    let settlement = state.engine.settlement(id).await?;

    Ok((StatusCode::CREATED, Json(view(settlement))))
}

pub async fn settlement_complete(
    Extension(viewer): Extension<Viewer>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SettlementView>, ServerError> {
    owned_settlement(&state, &viewer, id).await?;
    let settlement = state.engine.complete_settlement(id).await?;
    Ok(Json(view(settlement)))
}

pub async fn settlement_cancel(
    Extension(viewer): Extension<Viewer>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SettlementView>, ServerError> {
    owned_settlement(&state, &viewer, id).await?;
    let settlement = state.engine.cancel_settlement(id).await?;
    Ok(Json(view(settlement)))
}
