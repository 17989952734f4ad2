//! Expense payments: one row per payer of an expense.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

/// One payer's contribution to one expense.
///
/// A multi-payer expense has several payments; together they add up to the
/// expense total.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpensePayment {
    pub expense_id: Uuid,
    pub user_id: String,
    pub amount_paid: Money,
}

impl ExpensePayment {
    pub fn new(expense_id: Uuid, user_id: impl Into<String>, amount_paid: Money) -> Self {
        Self {
            expense_id,
            user_id: user_id.into(),
            amount_paid,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub expense_id: String,
    pub user_id: String,
    pub amount_minor: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::expenses::Entity",
        from = "Column::ExpenseId",
        to = "super::expenses::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Expenses,
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&ExpensePayment> for ActiveModel {
    fn from(payment: &ExpensePayment) -> Self {
        Self {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            expense_id: ActiveValue::Set(payment.expense_id.to_string()),
            user_id: ActiveValue::Set(payment.user_id.clone()),
            amount_minor: ActiveValue::Set(payment.amount_paid.minor()),
        }
    }
}

impl TryFrom<Model> for ExpensePayment {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            expense_id: parse_uuid(&model.expense_id, "expense")?,
            user_id: model.user_id,
            amount_paid: Money::new(model.amount_minor),
        })
    }
}
