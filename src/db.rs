use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;

const MIGRATIONS: &[(&str, &str)] = &[("001_secrets", include_str!("migrations/001_secrets.sql"))];

/// A single pragma-tuned SQLite connection behind a mutex. Write volume in
/// this service is tiny (admin key changes), so one connection is plenty and
/// keeps transactional reasoning trivial.
pub struct Db {
    conn: Mutex<Connection>,
}

impl Db {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run a closure against the connection. Callers keep the closure short;
    /// nothing async may happen while the lock is held.
    pub fn with<F, T>(&self, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&Connection) -> anyhow::Result<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }
}

pub fn run_migrations(db: &Db) -> anyhow::Result<()> {
    db.with(|conn| {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS _migrations (
                name TEXT PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
            )",
        )?;

        for (name, sql) in MIGRATIONS {
            let applied: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )?;

            if !applied {
                conn.execute_batch(sql)?;
                conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])?;
                tracing::info!("applied migration: {}", name);
            }
        }
        Ok(())
    })
}

#[cfg(test)]
pub(crate) fn temp_db() -> (tempfile::TempDir, std::sync::Arc<Db>) {
    let dir = tempfile::TempDir::new().unwrap();
    let db = Db::open(&dir.path().join("test.db")).unwrap();
    run_migrations(&db).unwrap();
    (dir, std::sync::Arc::new(db))
}
