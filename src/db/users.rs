use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;
use uuid::Uuid;

use crate::models::Identity;

/// Mint a brand new anonymous user together with its first share reference.
/// Both ids are random UUIDs; nothing about the user is asked for or stored
/// beyond the keys themselves.
pub fn generate_user(conn: &Connection) -> Result<Identity> {
    let user_id = Uuid::new_v4().to_string();
    conn.execute("INSERT INTO users (id) VALUES (?1)", params![user_id])
        .context("failed to insert user")?;

    let reference = create_user_reference(conn, &user_id)?;
    info!(user = %user_id, "generated anonymous user");

    Ok(Identity { user_id, reference })
}

/// Mint a fresh share token that resolves to an existing user. Several tokens
/// may point at the same user; handing out a new one never invalidates the
/// old ones.
pub fn create_user_reference(conn: &Connection, user_id: &str) -> Result<String> {
    let reference = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO user_references (id, user_id) VALUES (?1, ?2)",
        params![reference, user_id],
    )
    .context("failed to insert user reference")?;

    Ok(reference)
}

/// Look up which user a share token belongs to. Unknown tokens resolve to
/// `None` instead of an error so callers can phrase their own message.
pub fn resolve_reference(conn: &Connection, reference: &str) -> Result<Option<String>> {
    let user_id = conn
        .query_row(
            "SELECT user_id FROM user_references WHERE id = ?1",
            params![reference],
            |row| row.get(0),
        )
        .optional()
        .context("failed to resolve user reference")?;

    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::apply_schema;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_generate_user_mints_distinct_identities() {
        let conn = test_conn();
        let first = generate_user(&conn).unwrap();
        let second = generate_user(&conn).unwrap();

        assert_ne!(first.user_id, second.user_id);
        assert_ne!(first.reference, second.reference);
    }

    #[test]
    fn test_reference_resolves_to_its_own_user() {
        let conn = test_conn();
        let first = generate_user(&conn).unwrap();
        let second = generate_user(&conn).unwrap();

        assert_eq!(
            resolve_reference(&conn, &first.reference).unwrap().as_deref(),
            Some(first.user_id.as_str())
        );
        assert_eq!(
            resolve_reference(&conn, &second.reference).unwrap().as_deref(),
            Some(second.user_id.as_str())
        );
    }

    #[test]
    fn test_unknown_reference_resolves_to_none() {
        let conn = test_conn();
        generate_user(&conn).unwrap();

        assert_eq!(resolve_reference(&conn, "no-such-token").unwrap(), None);
    }

    #[test]
    fn test_extra_reference_points_at_same_user() {
        let conn = test_conn();
        let identity = generate_user(&conn).unwrap();
        let extra = create_user_reference(&conn, &identity.user_id).unwrap();

        assert_ne!(extra, identity.reference);
        assert_eq!(
            resolve_reference(&conn, &extra).unwrap(),
            Some(identity.user_id)
        );
    }
}
