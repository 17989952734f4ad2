//! Expense obligations: one row per participant sharing an expense.

use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, Money, util::parse_uuid};

/// One participant's share of one expense.
///
/// The same user may also appear as a payer of the expense; the two terms
/// cancel out in the balance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseObligation {
    pub expense_id: Uuid,
    pub user_id: String,
    pub amount_owed: Money,
}

impl ExpenseObligation {
    pub fn new(expense_id: Uuid, user_id: impl Into<String>, amount_owed: Money) -> Self {
        Self {
            expense_id,
            user_id: user_id.into(),
            amount_owed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "expense_obligations")]
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

impl From<&ExpenseObligation> for ActiveModel {
    fn from(obligation: &ExpenseObligation) -> Self {
        Self {
            id: ActiveValue::Set(Uuid::new_v4().to_string()),
            expense_id: ActiveValue::Set(obligation.expense_id.to_string()),
            user_id: ActiveValue::Set(obligation.user_id.clone()),
            amount_minor: ActiveValue::Set(obligation.amount_owed.minor()),
        }
    }
}

impl TryFrom<Model> for ExpenseObligation {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            expense_id: parse_uuid(&model.expense_id, "expense")?,
            user_id: model.user_id,
            amount_owed: Money::new(model.amount_minor),
        })
    }
}
