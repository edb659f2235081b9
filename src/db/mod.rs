use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Schema for persisted client state.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS session_state (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// SQLite key-value store backing the persisted session.
pub struct Database {
  conn: Mutex<Connection>,
}

impl Database {
  /// Open or create the database at `path`, or at the default location.
  pub fn open(path: Option<&Path>) -> Result<Self> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
    }

    let conn = Connection::open(&path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open a throwaway in-memory database.
  #[cfg(test)]
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    let db = Self {
      conn: Mutex::new(conn),
    };
    db.run_migrations()?;
    Ok(db)
  }

  /// Get the default database path
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("fsadmin").join("session.db"))
  }

  /// Run database migrations
  fn run_migrations(&self) -> Result<()> {
    let conn = self.conn()?;
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| eyre!("Failed to run migrations: {}", e))?;
    Ok(())
  }

  fn conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
    self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))
  }

  pub fn get(&self, key: &str) -> Result<Option<String>> {
    let conn = self.conn()?;
    conn
      .query_row(
        "SELECT value FROM session_state WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read {}: {}", key, e))
  }

  pub fn set(&self, key: &str, value: &str) -> Result<()> {
    self.set_many(&[(key, value)])
  }

  /// Write several entries atomically: either all of them land or none.
  pub fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
    let mut conn = self.conn()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to start transaction: {}", e))?;
    for (key, value) in entries {
      tx.execute(
        "INSERT OR REPLACE INTO session_state (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(|e| eyre!("Failed to write {}: {}", key, e))?;
    }
    tx.commit()
      .map_err(|e| eyre!("Failed to commit session state: {}", e))
  }

  pub fn remove(&self, keys: &[&str]) -> Result<()> {
    let mut conn = self.conn()?;
    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to start transaction: {}", e))?;
    for key in keys {
      tx.execute("DELETE FROM session_state WHERE key = ?", params![key])
        .map_err(|e| eyre!("Failed to remove {}: {}", key, e))?;
    }
    tx.commit()
      .map_err(|e| eyre!("Failed to commit session state: {}", e))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_set_get_remove() {
    let db = Database::open_in_memory().unwrap();
    assert_eq!(db.get("adminToken").unwrap(), None);

    db.set("adminToken", "abc").unwrap();
    db.set("adminToken", "def").unwrap();
    assert_eq!(db.get("adminToken").unwrap().as_deref(), Some("def"));

    db.remove(&["adminToken", "adminUser"]).unwrap();
    assert_eq!(db.get("adminToken").unwrap(), None);
  }

  #[test]
  fn test_failed_batch_writes_nothing() {
    let db = Database::open_in_memory().unwrap();
    db.conn()
      .unwrap()
      .execute_batch(
        "CREATE TRIGGER reject_user BEFORE INSERT ON session_state
         WHEN NEW.key = 'adminUser'
         BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
      )
      .unwrap();

    let err = db
      .set_many(&[("adminToken", "abc"), ("adminUser", "{}")])
      .unwrap_err();

    assert!(err.to_string().contains("Failed to write adminUser"));
    assert_eq!(db.get("adminToken").unwrap(), None);
  }

  #[test]
  fn test_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("session.db");

    Database::open(Some(&path)).unwrap().set("adminUser", "{}").unwrap();
    let reopened = Database::open(Some(&path)).unwrap();
    assert_eq!(reopened.get("adminUser").unwrap().as_deref(), Some("{}"));
  }
}
