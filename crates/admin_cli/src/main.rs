use std::error::Error;

use clap::{Args, Parser, Subcommand};
use engine::{BalanceReport, Engine, Money, NewExpense, NewSettlement, SettlementStatus, Split};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "splitledger_admin")]
#[command(about = "Admin utilities for SplitLedger (record expenses/settlements, inspect balances)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./splitledger.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Expense(Expense),
    Settlement(Settlement),
    /// Print the balance report of a user.
    Balances(BalancesArgs),
}

#[derive(Args, Debug)]
struct Expense {
    #[command(subcommand)]
    command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    Add(ExpenseAddArgs),
}

/// `user=amount`, amount in major units (e.g. `u1=12.50`).
#[derive(Clone, Debug)]
struct UserAmount {
    user_id: String,
    amount: Money,
}

fn parse_user_amount(raw: &str) -> Result<UserAmount, String> {
    let (user_id, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected user=amount, got {raw:?}"))?;
    let amount = amount.parse::<Money>().map_err(|err| err.to_string())?;
    Ok(UserAmount {
        user_id: user_id.trim().to_string(),
        amount,
    })
}

#[derive(Args, Debug)]
struct ExpenseAddArgs {
    #[arg(long)]
    description: String,
    #[arg(long)]
    group: Option<String>,
    /// User recording the expense.
    #[arg(long)]
    created_by: String,
    /// Who paid and how much; repeatable.
    #[arg(long = "payer", required = true, value_parser = parse_user_amount)]
    payers: Vec<UserAmount>,
    /// Split the total evenly among these users.
    #[arg(long, value_delimiter = ',', conflicts_with = "shares")]
    equal: Vec<String>,
    /// Explicit share per user; repeatable.
    #[arg(long = "share", value_parser = parse_user_amount)]
    shares: Vec<UserAmount>,
}

#[derive(Args, Debug)]
struct Settlement {
    #[command(subcommand)]
    command: SettlementCommand,
}

#[derive(Subcommand, Debug)]
enum SettlementCommand {
    Add(SettlementAddArgs),
    Complete(SettlementIdArgs),
    Cancel(SettlementIdArgs),
}

#[derive(Args, Debug)]
struct SettlementAddArgs {
    #[arg(long)]
    from: String,
    #[arg(long)]
    to: String,
    #[arg(long, value_parser = parse_money)]
    amount: Money,
    #[arg(long)]
    group: Option<String>,
    /// Record as pending; it counts only once completed.
    #[arg(long)]
    pending: bool,
}

#[derive(Args, Debug)]
struct SettlementIdArgs {
    id: Uuid,
}

#[derive(Args, Debug)]
struct BalancesArgs {
    #[arg(long)]
    viewer: String,
    #[arg(long)]
    group: Option<String>,
}

fn parse_money(raw: &str) -> Result<Money, String> {
    raw.parse::<Money>().map_err(|err| err.to_string())
}

fn split_for(args: &ExpenseAddArgs) -> Result<Split, String> {
    match (args.equal.is_empty(), args.shares.is_empty()) {
        (false, true) => Ok(Split::Equal {
            participants: args.equal.clone(),
        }),
        (true, false) => Ok(Split::Exact {
            shares: args
                .shares
                .iter()
                .map(|share| (share.user_id.clone(), share.amount))
                .collect(),
        }),
        _ => Err("provide either --equal or at least one --share".to_string()),
    }
}

fn print_report(viewer: &str, report: &BalanceReport) {
    println!("viewer: {viewer}");
    println!("you owe: {}", report.you_owe);
    println!("you are owed: {}", report.you_are_owed);
    if report.simplified_transactions.is_empty() {
        println!("all settled up");
        return;
    }
    println!("suggested payments:");
    for tx in &report.simplified_transactions {
        println!("  {tx}");
    }
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = connect_db(&cli.database_url).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Expense(Expense {
            command: ExpenseCommand::Add(args),
        }) => {
            let split = match split_for(&args) {
                Ok(split) => split,
                Err(err) => {
                    eprintln!("{err}");
                    std::process::exit(2);
                }
            };
            let payments: Vec<(String, Money)> = args
                .payers
                .iter()
                .map(|payer| (payer.user_id.clone(), payer.amount))
                .collect();
            let Some(total) = Money::checked_sum(payments.iter().map(|(_, amount)| *amount))
            else {
                eprintln!("expense total too large");
                std::process::exit(2);
            };
            let obligations = split.obligations(total)?;

            let expense_id = engine
                .record_expense(NewExpense {
                    group_id: args.group,
                    description: args.description.clone(),
                    created_by: args.created_by,
                    payments,
                    obligations,
                })
                .await?;
            println!("recorded expense: {} ({expense_id})", args.description);
        }
        Command::Settlement(Settlement {
            command: SettlementCommand::Add(args),
        }) => {
            let settlement_id = engine
                .record_settlement(NewSettlement {
                    from_user_id: args.from,
                    to_user_id: args.to,
                    amount: args.amount,
                    group_id: args.group,
                    status: args.pending.then_some(SettlementStatus::Pending),
                })
                .await?;
            println!("recorded settlement: {settlement_id}");
        }
        Command::Settlement(Settlement {
            command: SettlementCommand::Complete(args),
        }) => {
            let settlement = engine.complete_settlement(args.id).await?;
            println!(
                "completed settlement {}: {} pays {} {}",
                settlement.id, settlement.from_user_id, settlement.to_user_id, settlement.amount
            );
        }
        Command::Settlement(Settlement {
            command: SettlementCommand::Cancel(args),
        }) => {
            let settlement = engine.cancel_settlement(args.id).await?;
            println!("cancelled settlement {}", settlement.id);
        }
        Command::Balances(args) => {
            let report = engine
                .compute_balances(&args.viewer, args.group.as_deref())
                .await?;
            print_report(&args.viewer, &report);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_amount_parses_major_units() {
        let parsed = parse_user_amount("u1=12.345").unwrap();
        assert_eq!(parsed.user_id, "u1");
        assert_eq!(parsed.amount, Money::new(1_235));

        assert!(parse_user_amount("u1").is_err());
        assert!(parse_user_amount("u1=abc").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn equal_and_exact_splits_are_exclusive() {
        let cli = Cli::try_parse_from([
            "splitledger_admin",
            "expense",
            "add",
            "--description",
            "dinner",
            "--created-by",
            "u1",
            "--payer",
            "u1=30",
            "--equal",
            "u1,u2,u3",
        ])
        .unwrap();
        let Command::Expense(Expense {
            command: ExpenseCommand::Add(args),
        }) = cli.command
        else {
            panic!("expected expense add");
        };
        assert_eq!(
            split_for(&args).unwrap(),
            Split::Equal {
                participants: vec!["u1".to_string(), "u2".to_string(), "u3".to_string()]
            }
        );

        let conflict = Cli::try_parse_from([
            "splitledger_admin",
            "expense",
            "add",
            "--description",
            "dinner",
            "--created-by",
            "u1",
            "--payer",
            "u1=30",
            "--equal",
            "u1,u2",
            "--share",
            "u2=30",
        ]);
        assert!(conflict.is_err());
    }
}
