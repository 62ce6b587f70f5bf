use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::Connection;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".song-pamphlet-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "pamphlets.sqlite";

/// Resolve the application data directory inside the user's home. The identity
/// file and the log file live next to the database, so this is shared instead
/// of private to the connection code.
pub fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

/// Ensure the database file exists at its well-known location, run lazy
/// migrations, and return a live connection.
pub fn ensure_schema() -> Result<Connection> {
    let dir = data_dir()?;
    fs::create_dir_all(&dir).context("failed to create data directory")?;
    open_store(&dir.join(DB_FILE_NAME))
}

/// Open (or create) a store at an explicit path and bring its schema up to
/// date. Integration tests point this at a temp directory; production code
/// goes through [`ensure_schema`].
pub fn open_store(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).context("failed to open SQLite database")?;
    apply_schema(&conn)?;
    Ok(conn)
}

/// Apply the schema to an existing connection. The function also toggles
/// `PRAGMA foreign_keys = ON`, which SQLite scopes per connection, so the
/// referential integrity checks behave the same during tests and production
/// runs.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY
        )",
        [],
    )
    .context("failed to create users table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS user_references (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create user_references table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS pamphlets (
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            PRIMARY KEY (user_id, name),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create pamphlets table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS songs (
            user_id TEXT NOT NULL,
            pamphlet TEXT NOT NULL,
            id TEXT NOT NULL,
            title TEXT NOT NULL,
            text TEXT NOT NULL,
            creator TEXT NOT NULL,
            PRIMARY KEY (user_id, pamphlet, id),
            FOREIGN KEY(user_id, pamphlet) REFERENCES pamphlets(user_id, name) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create songs table")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap();
        let rows = stmt.query_map([], |row| row.get::<_, String>(0)).unwrap();
        rows.collect::<Result<Vec<_>, _>>().unwrap()
    }

    #[test]
    fn test_apply_schema_creates_all_tables() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let tables = table_names(&conn);
        for expected in ["users", "user_references", "pamphlets", "songs"] {
            assert!(tables.iter().any(|name| name == expected), "missing {expected}");
        }
    }

    #[test]
    fn test_apply_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();
    }

    #[test]
    fn test_apply_schema_enables_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }
}
