//! Balance and debt-simplification engine for shared expenses.
//!
//! The engine answers two questions for a viewer, optionally within a group:
//! what is everyone's net position, and which payments would settle it.
//!
//! The computation is a pure pipeline over ledger facts:
//!
//! 1. a [`FactSource`] collects the [`FactSet`] of a [`Scope`];
//! 2. [`accumulate`] folds it into [`NetBalances`];
//! 3. [`simplify`] turns the balances into [`SimplifiedTransaction`]s;
//! 4. [`BalanceReport::assemble`] sums what the viewer owes and is owed.
//!
//! [`Engine`] is the SQLite-backed fact source (and recorder); a
//! [`MemoryLedger`] serves the same purpose in memory.
//!
//! ```rust
//! use engine::{Money, NetBalances, simplify};
//!
//! let balances: NetBalances = [
//!     ("u1", Money::new(5_000)),
//!     ("u2", Money::new(3_000)),
//!     ("u3", Money::new(-8_000)),
//! ]
//! .into_iter()
//! .collect();
//!
//! let plan = simplify(&balances).unwrap();
//! assert_eq!(plan[0].to_string(), "u3 pays u1 50.00");
//! assert_eq!(plan[1].to_string(), "u3 pays u2 30.00");
//! ```

pub use balances::{NetBalances, accumulate};
pub use error::EngineError;
pub use expense_obligations::ExpenseObligation;
pub use expense_payments::ExpensePayment;
pub use expenses::{Expense, NewExpense, Split};
pub use facts::{FactSet, FactSource, MemoryLedger, Scope};
pub use money::{Money, Sign};
pub use ops::{Engine, EngineBuilder, ExpenseDetail};
pub use report::{BalanceReport, balance_report, compute_report};
pub use settlements::{NewSettlement, Settlement, SettlementStatus};
pub use simplify::{SimplifiedTransaction, simplify};

mod balances;
mod error;
mod expense_obligations;
mod expense_payments;
mod expenses;
mod facts;
mod money;
mod ops;
mod report;
mod settlements;
mod simplify;
mod util;

pub type ResultEngine<T> = Result<T, EngineError>;
