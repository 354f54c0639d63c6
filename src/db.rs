use migration::Migrator;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use sea_orm_migration::MigratorTrait;

use crate::error::AppResult;

const PRAGMAS: [&str; 2] = ["PRAGMA journal_mode=WAL", "PRAGMA synchronous=NORMAL"];

/// Opens the SQLite database and brings its schema up to date.
///
/// Call once at startup and hand the connection to [`crate::store::MovieStore`].
/// In-memory databases live per connection, so they are pinned to a pool of one.
pub async fn connect_and_migrate(database_url: &str) -> AppResult<DatabaseConnection> {
    let mut options = ConnectOptions::new(database_url.to_string());
    options.sqlx_logging(false);
    if database_url.contains(":memory:") {
        options.max_connections(1).min_connections(1);
    }

    let db = Database::connect(options).await?;

    for pragma in PRAGMAS {
        db.execute(Statement::from_string(db.get_database_backend(), pragma.to_string())).await?;
    }

    Migrator::up(&db, None).await?;
    tracing::debug!(database_url = %database_url, "database ready");
    Ok(db)
}
