use domain::storage::KeyValueStore;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use shared::types::Result;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// SQLite-backed namespace → value store holding the client's durable state.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::setup_db(&conn)?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::setup_db(&conn)?;
        Ok(Self { conn })
    }

    fn setup_db(conn: &Connection) -> SqlResult<()> {
        // journal_mode answers with a row; in-memory databases report "memory".
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.execute_batch(
            "
            PRAGMA synchronous=NORMAL;
            CREATE TABLE IF NOT EXISTS kv_store (
                namespace TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
        ",
        )
    }

    pub fn namespaces(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT namespace FROM kv_store ORDER BY namespace")?;
        let mut rows = stmt.query([])?;
        let mut names = Vec::new();
        while let Some(row) = rows.next()? {
            names.push(row.get(0)?);
        }
        Ok(names)
    }
}

impl KeyValueStore for SqliteStore {
    fn read(&self, namespace: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE namespace = ?1",
                params![namespace],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn write(&self, namespace: &str, value: &str) -> Result<()> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;
        self.conn.execute(
            "INSERT OR REPLACE INTO kv_store (namespace, value, updated_at) VALUES (?1, ?2, ?3)",
            params![namespace, value, now],
        )?;
        tracing::debug!(namespace, bytes = value.len(), "stored value");
        Ok(())
    }
}
