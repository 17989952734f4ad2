//! Settlements.
//!
//! A [`Settlement`] records a real-world payment from one user to another that
//! discharges part of a debt. Only [`SettlementStatus::Completed`] settlements
//! count towards balances.
//!
//! Lifecycle:
//! - `pending` -> `completed`
//! - `pending` | `completed` -> `cancelled`
//!
//! `cancelled` is terminal.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    EngineError, Money, ResultEngine,
    util::{normalize_optional_text, normalize_user_id, parse_uuid},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementStatus {
    Pending,
    Completed,
    Cancelled,
}

impl SettlementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Checks whether the lifecycle allows moving from `self` to `next`.
    pub fn ensure_transition(self, next: SettlementStatus) -> ResultEngine<()> {
        match (self, next) {
            (Self::Pending, Self::Completed)
            | (Self::Pending, Self::Cancelled)
            | (Self::Completed, Self::Cancelled) => Ok(()),
            (from, to) => Err(EngineError::InvalidSettlement(format!(
                "cannot move settlement from {} to {}",
                from.as_str(),
                to.as_str()
            ))),
        }
    }
}

impl TryFrom<&str> for SettlementStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(EngineError::InvalidSettlement(format!(
                "invalid settlement status: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub id: Uuid,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: Money,
    pub group_id: Option<String>,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
}

impl Settlement {
    /// Build a validated settlement.
    ///
    /// The amount must be positive and the two users must differ. Whether the
    /// amount exceeds the outstanding debt is not checked: over-settlement is
    /// accepted and simply flips the sign of the balances.
    pub fn new(
        from_user_id: impl Into<String>,
        to_user_id: impl Into<String>,
        amount: Money,
        group_id: Option<String>,
        status: SettlementStatus,
        created_at: DateTime<Utc>,
    ) -> ResultEngine<Self> {
        let from_user_id = from_user_id.into();
        let to_user_id = to_user_id.into();
        if !amount.is_positive() {
            return Err(EngineError::InvalidAmount(
                "settlement amount must be > 0".to_string(),
            ));
        }
        if from_user_id == to_user_id {
            return Err(EngineError::InvalidSettlement(
                "a user cannot settle with themselves".to_string(),
            ));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            from_user_id,
            to_user_id,
            amount,
            group_id,
            status,
            created_at,
        })
    }

    pub fn is_completed(&self) -> bool {
        self.status == SettlementStatus::Completed
    }

    pub fn involves(&self, user_id: &str) -> bool {
        self.from_user_id == user_id || self.to_user_id == user_id
    }
}

/// Input for recording a settlement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewSettlement {
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount: Money,
    pub group_id: Option<String>,
    /// `None` records an already completed payment.
    pub status: Option<SettlementStatus>,
}

impl NewSettlement {
    pub(crate) fn into_settlement(self, created_at: DateTime<Utc>) -> ResultEngine<Settlement> {
        let from_user_id = normalize_user_id(&self.from_user_id).ok_or_else(|| {
            EngineError::InvalidSettlement("payer user id must not be empty".to_string())
        })?;
        let to_user_id = normalize_user_id(&self.to_user_id).ok_or_else(|| {
            EngineError::InvalidSettlement("receiver user id must not be empty".to_string())
        })?;
        let status = self.status.unwrap_or(SettlementStatus::Completed);
        if status == SettlementStatus::Cancelled {
            return Err(EngineError::InvalidSettlement(
                "cannot record a cancelled settlement".to_string(),
            ));
        }
        Settlement::new(
            from_user_id,
            to_user_id,
            self.amount,
            normalize_optional_text(self.group_id.as_deref()),
            status,
            created_at,
        )
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settlements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub amount_minor: i64,
    pub group_id: Option<String>,
    pub status: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Settlement> for ActiveModel {
    fn from(settlement: &Settlement) -> Self {
        Self {
            id: ActiveValue::Set(settlement.id.to_string()),
            from_user_id: ActiveValue::Set(settlement.from_user_id.clone()),
            to_user_id: ActiveValue::Set(settlement.to_user_id.clone()),
            amount_minor: ActiveValue::Set(settlement.amount.minor()),
            group_id: ActiveValue::Set(settlement.group_id.clone()),
            status: ActiveValue::Set(settlement.status.as_str().to_string()),
            created_at: ActiveValue::Set(settlement.created_at),
        }
    }
}

impl TryFrom<Model> for Settlement {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(&model.id, "settlement")?,
            from_user_id: model.from_user_id,
            to_user_id: model.to_user_id,
            amount: Money::new(model.amount_minor),
            group_id: model.group_id,
            status: SettlementStatus::try_from(model.status.as_str())?,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        use SettlementStatus::*;
        assert!(Pending.ensure_transition(Completed).is_ok());
        assert!(Pending.ensure_transition(Cancelled).is_ok());
        assert!(Completed.ensure_transition(Cancelled).is_ok());
        assert!(Completed.ensure_transition(Pending).is_err());
        assert!(Cancelled.ensure_transition(Completed).is_err());
        assert!(Cancelled.ensure_transition(Cancelled).is_err());
    }

    #[test]
    fn new_rejects_self_settlement_and_non_positive_amounts() {
        let now = Utc::now();
        assert!(matches!(
            Settlement::new("a", "a", Money::new(100), None, SettlementStatus::Completed, now),
            Err(EngineError::InvalidSettlement(_))
        ));
        assert!(matches!(
            Settlement::new("a", "b", Money::ZERO, None, SettlementStatus::Completed, now),
            Err(EngineError::InvalidAmount(_))
        ));
        let ok = Settlement::new("a", "b", Money::new(1), None, SettlementStatus::Pending, now)
            .unwrap();
        assert!(!ok.is_completed());
        assert!(ok.involves("b"));
    }

    #[test]
    fn new_settlement_defaults_to_completed() {
        let settlement = NewSettlement {
            from_user_id: " u2 ".to_string(),
            to_user_id: "u1".to_string(),
            amount: Money::new(100),
            group_id: Some("".to_string()),
            status: None,
        }
        .into_settlement(Utc::now())
        .unwrap();
        assert_eq!(settlement.status, SettlementStatus::Completed);
        assert_eq!(settlement.from_user_id, "u2");
        assert_eq!(settlement.group_id, None);

        let cancelled = NewSettlement {
            from_user_id: "u2".to_string(),
            to_user_id: "u1".to_string(),
            amount: Money::new(100),
            group_id: None,
            status: Some(SettlementStatus::Cancelled),
        }
        .into_settlement(Utc::now());
        assert!(matches!(cancelled, Err(EngineError::InvalidSettlement(_))));
    }
}
