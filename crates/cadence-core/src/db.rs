use crate::error::CoreError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Executor, SqlitePool};

/// SQLite permits a single writer at a time, and the sqlx driver only
/// commits the implicit transaction wrapping an `INSERT ... RETURNING`
/// once the statement's result is fully drained — a row fetched via
/// `fetch_one` on a freshly-acquired pooled connection can otherwise be
/// stranded, invisible to the next connection handed out. Pinning the pool
/// to one connection serializes access so every write is observed by the
/// following read, while the partial UNIQUE index remains the authority
/// for the at-most-one-instance invariant under concurrent callers.
const MAX_CONNECTIONS: u32 = 1;

pub type DbPool = SqlitePool;

/// Task storage schema. The partial unique index is the final authority for
/// the at-most-one-instance-per-(series, date) invariant; the engine's
/// existence check is only an optimization on top of it.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    id BLOB PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT,
    assigned_to_id BLOB,
    client_id BLOB,
    space_id BLOB,
    campaign_id BLOB,
    status TEXT NOT NULL DEFAULT 'todo',
    due_date TEXT,
    completed_at TEXT,
    created_at TEXT NOT NULL,
    is_recurring INTEGER NOT NULL DEFAULT 0,
    recurring_pattern TEXT,
    recurring_interval INTEGER,
    recurring_end_date TEXT,
    schedule_from TEXT,
    checklist TEXT NOT NULL DEFAULT '[]',
    recurrence_series_id TEXT,
    recurrence_instance_date TEXT
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_series_instance
    ON tasks (recurrence_series_id, recurrence_instance_date)
    WHERE recurrence_series_id IS NOT NULL
      AND recurrence_instance_date IS NOT NULL;

CREATE INDEX IF NOT EXISTS idx_tasks_is_recurring
    ON tasks (is_recurring)
    WHERE is_recurring = 1;
"#;

/// Open (creating if missing) the SQLite database at `database_path` and
/// ensure the schema exists.
pub async fn establish_connection(database_path: &str) -> Result<DbPool, CoreError> {
    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;
    pool.execute(SCHEMA).await?;

    Ok(pool)
}
