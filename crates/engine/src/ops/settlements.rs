use chrono::Utc;
use uuid::Uuid;

use sea_orm::{ActiveValue, TransactionTrait, prelude::*};

use crate::{
    EngineError, NewSettlement, ResultEngine, Settlement, SettlementStatus, settlements,
};

use super::{Engine, with_tx};

impl Engine {
    /// Record a settlement between two users.
    ///
    /// Defaults to `completed`; a `pending` settlement only counts once
    /// [`Engine::complete_settlement`] is called.
    pub async fn record_settlement(&self, settlement: NewSettlement) -> ResultEngine<Uuid> {
        let settlement = settlement.into_settlement(Utc::now())?;
        settlements::ActiveModel::from(&settlement)
            .insert(&self.database)
            .await?;

        tracing::info!(
            settlement_id = %settlement.id,
            from = settlement.from_user_id.as_str(),
            to = settlement.to_user_id.as_str(),
            amount = %settlement.amount,
            status = settlement.status.as_str(),
            "recorded settlement"
        );
        Ok(settlement.id)
    }

    /// Return a settlement.
    pub async fn settlement(&self, settlement_id: Uuid) -> ResultEngine<Settlement> {
        let model = settlements::Entity::find_by_id(settlement_id.to_string())
            .one(&self.database)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("settlement not exists".to_string()))?;
        Settlement::try_from(model)
    }

    /// Mark a pending settlement as completed.
    pub async fn complete_settlement(&self, settlement_id: Uuid) -> ResultEngine<Settlement> {
        self.transition_settlement(settlement_id, SettlementStatus::Completed)
            .await
    }

    /// Cancel a pending or completed settlement.
    ///
    /// Reports computed before the cancellation are not affected; later ones
    /// simply stop counting the settlement.
    pub async fn cancel_settlement(&self, settlement_id: Uuid) -> ResultEngine<Settlement> {
        self.transition_settlement(settlement_id, SettlementStatus::Cancelled)
            .await
    }

    async fn transition_settlement(
        &self,
        settlement_id: Uuid,
        status: SettlementStatus,
    ) -> ResultEngine<Settlement> {
        with_tx!(self, |db_tx| {
            let model = settlements::Entity::find_by_id(settlement_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("settlement not exists".to_string()))?;
            let mut settlement = Settlement::try_from(model)?;
            settlement.status.ensure_transition(status)?;

            let active = settlements::ActiveModel {
                id: ActiveValue::Set(settlement.id.to_string()),
                status: ActiveValue::Set(status.as_str().to_string()),
                ..Default::default()
            };
            active.update(&db_tx).await?;

            tracing::info!(
                settlement_id = %settlement.id,
                from = settlement.status.as_str(),
                to = status.as_str(),
                "settlement status changed"
            );
            settlement.status = status;
            Ok::<_, EngineError>(settlement)
        })
    }
}
