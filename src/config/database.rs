//! Database configuration module for `GiftBuddy`.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with
//! `Schema::create_table_from_entity`; the composite unique keys the engine
//! relies on for de-duplication are added as separate index statements.
//! Every statement is `IF NOT EXISTS`, so start-up is idempotent.

use crate::entities::{
    Chat, ContributionReport, ContributionReportColumn, Event, EventColumn, Membership,
    MembershipColumn, SchedulerConfig, User,
};
use crate::errors::Result;
use sea_orm::sea_query::{Index, IndexCreateStatement};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/gift_buddy.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL` environment variable.
///
/// Falls back to a default local `SQLite` file if no environment variable is set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    tracing::info!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables and unique indexes if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    create_table(db, User).await?;
    create_table(db, Chat).await?;
    create_table(db, Membership).await?;
    create_table(db, Event).await?;
    create_table(db, ContributionReport).await?;
    create_table(db, SchedulerConfig).await?;

    let builder = db.get_database_backend();
    for index in unique_indexes() {
        db.execute(builder.build(&index)).await?;
    }

    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);
    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(builder.build(&table)).await?;
    Ok(())
}

fn unique_indexes() -> Vec<IndexCreateStatement> {
    vec![
        Index::create()
            .name("idx_memberships_chat_user")
            .table(Membership)
            .col(MembershipColumn::ChatId)
            .col(MembershipColumn::UserId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_events_user_chat_date")
            .table(Event)
            .col(EventColumn::UserId)
            .col(EventColumn::ChatId)
            .col(EventColumn::DateEvent)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_reports_user_chat_event")
            .table(ContributionReport)
            .col(ContributionReportColumn::UserId)
            .col(ContributionReportColumn::ChatId)
            .col(ContributionReportColumn::EventId)
            .unique()
            .if_not_exists()
            .to_owned(),
    ]
}
