use anyhow::{Context, Result};
use rusqlite::{params, Connection, Error as SqlError, ErrorCode, OptionalExtension};
use tracing::debug;

use super::StoreError;
use crate::models::Pamphlet;

/// Retrieve every pamphlet owned by one user, sorted by name so the grid stays
/// stable across reloads. The query doubles as the single source of truth for
/// how pamphlets are ordered in the UI.
pub fn fetch_pamphlets(conn: &Connection, user_id: &str) -> Result<Vec<Pamphlet>> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM pamphlets
             WHERE user_id = ?1
             ORDER BY name COLLATE NOCASE, name",
        )
        .context("failed to prepare pamphlet query")?;

    let pamphlets = stmt
        .query_map([user_id], |row| Ok(Pamphlet { name: row.get(0)? }))
        .context("failed to load pamphlets")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect pamphlets")?;

    Ok(pamphlets)
}

/// Check whether the pamphlet row itself exists. Empty pamphlets count: the
/// answer must not depend on any songs having been added yet.
pub fn pamphlet_exists(conn: &Connection, user_id: &str, name: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM pamphlets WHERE user_id = ?1 AND name = ?2",
            params![user_id, name],
            |_| Ok(()),
        )
        .optional()
        .context("failed to check pamphlet existence")?;

    Ok(found.is_some())
}

/// Create a pamphlet unless one with this name already exists. Returns whether
/// a row was actually inserted, so the caller can tell "created" apart from
/// "was already there" without a second query. `INSERT OR IGNORE` keeps
/// repeats idempotent; the foreign key on the owning user still aborts and is
/// mapped to a domain error.
pub fn create_pamphlet(conn: &Connection, user_id: &str, name: &str) -> Result<bool> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO pamphlets (user_id, name) VALUES (?1, ?2)",
            params![user_id, name],
        )
        .map_err(map_missing_user)
        .context("failed to insert pamphlet")?;

    if inserted > 0 {
        debug!(user = user_id, pamphlet = name, "created pamphlet");
    }
    Ok(inserted > 0)
}

/// Delete a pamphlet row. The songs table cascades, so every song inside the
/// pamphlet disappears in the same statement. Returns whether anything was
/// removed.
pub fn delete_pamphlet(conn: &Connection, user_id: &str, name: &str) -> Result<bool> {
    let deleted = conn
        .execute(
            "DELETE FROM pamphlets WHERE user_id = ?1 AND name = ?2",
            params![user_id, name],
        )
        .context("failed to delete pamphlet")?;

    if deleted > 0 {
        debug!(user = user_id, pamphlet = name, "deleted pamphlet");
    }
    Ok(deleted > 0)
}

/// Coerce SQLite constraint errors into the typed domain error. With
/// `INSERT OR IGNORE` swallowing duplicate names, the only constraint left to
/// trip on insert is the foreign key on the owning user.
fn map_missing_user(err: SqlError) -> anyhow::Error {
    if matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    ) {
        StoreError::UserNotFound.into()
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{apply_schema, create_song, fetch_songs, generate_user};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn
    }

    fn test_user(conn: &Connection) -> String {
        generate_user(conn).unwrap().user_id
    }

    #[test]
    fn test_created_pamphlet_exists_before_any_songs() {
        let conn = test_conn();
        let user = test_user(&conn);

        assert!(create_pamphlet(&conn, &user, "Hymns").unwrap());
        assert!(pamphlet_exists(&conn, &user, "Hymns").unwrap());
    }

    #[test]
    fn test_create_pamphlet_is_idempotent() {
        let conn = test_conn();
        let user = test_user(&conn);

        assert!(create_pamphlet(&conn, &user, "Hymns").unwrap());
        assert!(!create_pamphlet(&conn, &user, "Hymns").unwrap());
        assert_eq!(fetch_pamphlets(&conn, &user).unwrap().len(), 1);
    }

    #[test]
    fn test_same_name_under_different_users_is_independent() {
        let conn = test_conn();
        let first = test_user(&conn);
        let second = test_user(&conn);

        assert!(create_pamphlet(&conn, &first, "Hymns").unwrap());
        assert!(create_pamphlet(&conn, &second, "Hymns").unwrap());

        assert!(delete_pamphlet(&conn, &first, "Hymns").unwrap());
        assert!(pamphlet_exists(&conn, &second, "Hymns").unwrap());
    }

    #[test]
    fn test_create_pamphlet_for_unknown_user_is_a_domain_error() {
        let conn = test_conn();

        let err = create_pamphlet(&conn, "ghost", "Hymns").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::UserNotFound)
        ));
    }

    #[test]
    fn test_delete_pamphlet_reports_whether_anything_was_removed() {
        let conn = test_conn();
        let user = test_user(&conn);
        create_pamphlet(&conn, &user, "Hymns").unwrap();

        assert!(delete_pamphlet(&conn, &user, "Hymns").unwrap());
        assert!(!pamphlet_exists(&conn, &user, "Hymns").unwrap());
        assert!(!delete_pamphlet(&conn, &user, "Hymns").unwrap());
    }

    #[test]
    fn test_delete_pamphlet_cascades_to_its_songs() {
        let conn = test_conn();
        let user = test_user(&conn);
        create_pamphlet(&conn, &user, "Hymns").unwrap();
        create_song(&conn, &user, "Hymns", "Amazing Grace", "Amazing grace", "Newton").unwrap();
        create_song(&conn, &user, "Hymns", "Abide With Me", "", "").unwrap();

        assert!(delete_pamphlet(&conn, &user, "Hymns").unwrap());

        // Recreating the same name starts from a clean slate.
        assert!(create_pamphlet(&conn, &user, "Hymns").unwrap());
        assert!(fetch_songs(&conn, &user, "Hymns").unwrap().is_empty());
    }

    #[test]
    fn test_fetch_pamphlets_sorts_case_insensitively() {
        let conn = test_conn();
        let user = test_user(&conn);
        create_pamphlet(&conn, &user, "Weddings").unwrap();
        create_pamphlet(&conn, &user, "campfire").unwrap();
        create_pamphlet(&conn, &user, "Hymns").unwrap();

        let names: Vec<String> = fetch_pamphlets(&conn, &user)
            .unwrap()
            .into_iter()
            .map(|pamphlet| pamphlet.name)
            .collect();
        assert_eq!(names, vec!["campfire", "Hymns", "Weddings"]);
    }
}
