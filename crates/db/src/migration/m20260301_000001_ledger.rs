//! Ledger schema: accounts, journals, ledger transactions, and audit logs.
//!
//! Built with the schema builder so the same migration runs on SQLite and
//! Postgres. Amounts are text columns holding exact decimals.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::AccountType).string_len(16).not_null())
                    .col(ColumnDef::new(Accounts::CurrencyCode).string_len(8).not_null())
                    .col(ColumnDef::new(Accounts::ParentAccountId).uuid().null())
                    .col(ColumnDef::new(Accounts::Description).text().null())
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Accounts::DeletedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Journals::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Journals::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Journals::JournalDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Journals::Description).text().null())
                    .col(ColumnDef::new(Journals::CurrencyCode).string_len(8).not_null())
                    .col(ColumnDef::new(Journals::Status).string_len(16).not_null())
                    .col(ColumnDef::new(Journals::TotalAmount).string().not_null())
                    .col(ColumnDef::new(Journals::TransactionCount).big_integer().not_null())
                    .col(ColumnDef::new(Journals::DisplayType).string_len(16).not_null())
                    .col(ColumnDef::new(Journals::ReversingJournalId).uuid().null())
                    .col(ColumnDef::new(Journals::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Journals::UpdatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Journals::DeletedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(LedgerTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerTransactions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerTransactions::JournalId).uuid().not_null())
                    .col(ColumnDef::new(LedgerTransactions::AccountId).uuid().not_null())
                    .col(ColumnDef::new(LedgerTransactions::Amount).string().not_null())
                    .col(
                        ColumnDef::new(LedgerTransactions::TransactionType)
                            .string_len(8)
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerTransactions::CurrencyCode).string_len(8).not_null())
                    .col(
                        ColumnDef::new(LedgerTransactions::TransactionDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerTransactions::Notes).text().null())
                    .col(ColumnDef::new(LedgerTransactions::ExchangeRate).string().null())
                    .col(ColumnDef::new(LedgerTransactions::RunningBalance).string().not_null())
                    .col(
                        ColumnDef::new(LedgerTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ledger_transactions_journal")
                            .from(LedgerTransactions::Table, LedgerTransactions::JournalId)
                            .to(Journals::Table, Journals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Ground-truth replay and "latest line" lookups.
        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_transactions_account_chrono")
                    .table(LedgerTransactions::Table)
                    .col(LedgerTransactions::AccountId)
                    .col(LedgerTransactions::TransactionDate)
                    .col(LedgerTransactions::CreatedAt)
                    .col(LedgerTransactions::Id)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_transactions_journal")
                    .table(LedgerTransactions::Table)
                    .col(LedgerTransactions::JournalId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AuditLogs::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AuditLogs::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AuditLogs::EntityType).string_len(32).not_null())
                    .col(ColumnDef::new(AuditLogs::EntityId).uuid().not_null())
                    .col(ColumnDef::new(AuditLogs::Action).string_len(16).not_null())
                    .col(ColumnDef::new(AuditLogs::Changes).json().not_null())
                    .col(ColumnDef::new(AuditLogs::Timestamp).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_audit_logs_entity")
                    .table(AuditLogs::Table)
                    .col(AuditLogs::EntityId)
                    .col(AuditLogs::Timestamp)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLogs::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(LedgerTransactions::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Journals::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).if_exists().to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Name,
    AccountType,
    CurrencyCode,
    ParentAccountId,
    Description,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum Journals {
    Table,
    Id,
    JournalDate,
    Description,
    CurrencyCode,
    Status,
    TotalAmount,
    TransactionCount,
    DisplayType,
    ReversingJournalId,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum LedgerTransactions {
    Table,
    Id,
    JournalId,
    AccountId,
    Amount,
    TransactionType,
    CurrencyCode,
    TransactionDate,
    Notes,
    ExchangeRate,
    RunningBalance,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(DeriveIden)]
enum AuditLogs {
    Table,
    Id,
    EntityType,
    EntityId,
    Action,
    Changes,
    Timestamp,
}
