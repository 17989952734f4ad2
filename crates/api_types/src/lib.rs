use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod expense {
    use super::*;

    /// One payer of an expense and how much they paid, in major units.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct PayerShare {
        pub user_id: String,
        pub amount: f64,
    }

    /// How the expense total is divided among participants.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum SplitNew {
        Equal { participants: Vec<String> },
        Exact { shares: Vec<PayerShare> },
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub group_id: Option<String>,
        pub description: String,
        pub payers: Vec<PayerShare>,
        pub split: SplitNew,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseCreated {
        pub id: Uuid,
    }
}

pub mod settlement {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum SettlementStatus {
        Pending,
        Completed,
        Cancelled,
    }

    /// Request body for recording a settlement; the caller is the payer.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementNew {
        pub to_user_id: String,
        /// Major units.
        pub amount: f64,
        pub group_id: Option<String>,
        /// Record as pending instead of completed.
        #[serde(default)]
        pub pending: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SettlementView {
        pub id: Uuid,
        pub from_user_id: String,
        pub to_user_id: String,
        pub amount_minor: i64,
        pub group_id: Option<String>,
        pub status: SettlementStatus,
        pub created_at: DateTime<Utc>,
    }
}

pub mod balances {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct BalancesQuery {
        pub group_id: Option<String>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TransactionView {
        pub from_user_id: String,
        pub to_user_id: String,
        pub amount_minor: i64,
    }

    /// Balance report of the caller.
    ///
    /// `balances` maps every user with a non-zero position to their net
    /// amount: positive means they are owed.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceReportView {
        pub you_owe_minor: i64,
        pub you_are_owed_minor: i64,
        pub simplified_transactions: Vec<TransactionView>,
        pub balances: BTreeMap<String, i64>,
    }
}
