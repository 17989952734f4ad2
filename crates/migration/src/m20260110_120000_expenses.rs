use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    GroupId,
    Description,
    AmountMinor,
    CreatedBy,
    CreatedAt,
}

#[derive(Iden)]
enum ExpensePayments {
    Table,
    Id,
    ExpenseId,
    UserId,
    AmountMinor,
}

#[derive(Iden)]
enum ExpenseObligations {
    Table,
    Id,
    ExpenseId,
    UserId,
    AmountMinor,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::GroupId).string().null())
                    .col(ColumnDef::new(Expenses::Description).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::CreatedBy).string().not_null())
                    .col(ColumnDef::new(Expenses::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-group_id")
                    .table(Expenses::Table)
                    .col(Expenses::GroupId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpensePayments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpensePayments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExpensePayments::ExpenseId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ExpensePayments::UserId).string().not_null())
                    .col(
                        ColumnDef::new(ExpensePayments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_payments-expense_id")
                            .from(ExpensePayments::Table, ExpensePayments::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_payments-user_id")
                    .table(ExpensePayments::Table)
                    .col(ExpensePayments::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_payments-expense_id")
                    .table(ExpensePayments::Table)
                    .col(ExpensePayments::ExpenseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ExpenseObligations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ExpenseObligations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ExpenseObligations::ExpenseId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseObligations::UserId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ExpenseObligations::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expense_obligations-expense_id")
                            .from(ExpenseObligations::Table, ExpenseObligations::ExpenseId)
                            .to(Expenses::Table, Expenses::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_obligations-user_id")
                    .table(ExpenseObligations::Table)
                    .col(ExpenseObligations::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expense_obligations-expense_id")
                    .table(ExpenseObligations::Table)
                    .col(ExpenseObligations::ExpenseId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExpenseObligations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ExpensePayments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        Ok(())
    }
}
