use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{run, run_with_listener, spawn_with_listener};

mod balances;
mod expenses;
mod server;
mod settlements;

pub mod types {
    pub mod expense {
        pub use api_types::expense::{ExpenseCreated, ExpenseNew, PayerShare, SplitNew};
    }

    pub mod settlement {
        pub use api_types::settlement::{SettlementNew, SettlementStatus, SettlementView};
    }

    pub mod balances {
        pub use api_types::balances::{BalanceReportView, BalancesQuery, TransactionView};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::KeyNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::LedgerImbalance(_) => StatusCode::CONFLICT,
        EngineError::DataUnavailable(_) | EngineError::Database(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        EngineError::InvalidMoney(_)
        | EngineError::InvalidAmount(_)
        | EngineError::InvalidExpense(_)
        | EngineError::InvalidSettlement(_) => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::DataUnavailable(detail) => {
            tracing::error!("ledger data unavailable: {detail}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => (status_for_engine_error(&err), message_for_engine_error(err)),
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}
