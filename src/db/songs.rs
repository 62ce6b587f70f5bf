use anyhow::{Context, Result};
use rusqlite::{params, Connection, Error as SqlError, ErrorCode, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use super::StoreError;
use crate::models::Song;

/// Fetch one song by id, or `None` when the id does not exist in this
/// pamphlet. The edit flow re-reads the row it is about to change so a stale
/// selection surfaces as a message instead of a save against nothing.
pub fn fetch_song(
    conn: &Connection,
    user_id: &str,
    pamphlet: &str,
    song_id: &str,
) -> Result<Option<Song>> {
    let song = conn
        .query_row(
            "SELECT id, title, text, creator FROM songs
             WHERE user_id = ?1 AND pamphlet = ?2 AND id = ?3",
            params![user_id, pamphlet, song_id],
            |row| {
                Ok(Song {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    text: row.get(2)?,
                    creator: row.get(3)?,
                })
            },
        )
        .optional()
        .context("failed to load song")?;

    Ok(song)
}

/// Get every song in one pamphlet, ordered by id so the listing and the
/// carousel page through songs in the same stable order.
pub fn fetch_songs(conn: &Connection, user_id: &str, pamphlet: &str) -> Result<Vec<Song>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, title, text, creator FROM songs
             WHERE user_id = ?1 AND pamphlet = ?2
             ORDER BY id",
        )
        .context("failed to prepare song query")?;

    let songs = stmt
        .query_map(params![user_id, pamphlet], |row| {
            Ok(Song {
                id: row.get(0)?,
                title: row.get(1)?,
                text: row.get(2)?,
                creator: row.get(3)?,
            })
        })
        .context("failed to iterate songs")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect songs")?;

    Ok(songs)
}

/// Retrieve distinct creators across the user's whole library for the
/// auto-complete widget. The ordering sorts by lowercase first but falls back
/// to the original text to keep accents and capitalization intact.
pub fn fetch_creators(conn: &Connection, user_id: &str) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT creator FROM songs
             WHERE user_id = ?1 AND creator <> ''
             ORDER BY LOWER(creator), creator",
        )
        .context("failed to prepare creator query")?;

    let mut rows = stmt
        .query([user_id])
        .context("failed to execute creator query")?;

    let mut creators = Vec::new();
    while let Some(row) = rows.next().context("failed to fetch creator row")? {
        let creator: String = row.get(0).context("failed to read creator value")?;
        creators.push(creator);
    }

    Ok(creators)
}

/// Insert a brand new song under a freshly minted id. We echo the hydrated
/// struct so callers can update UI state without having to re-query the
/// database. Empty titles, texts and creators are all legal at this level;
/// whatever validation the form wants happens before the call.
pub fn create_song(
    conn: &Connection,
    user_id: &str,
    pamphlet: &str,
    title: &str,
    text: &str,
    creator: &str,
) -> Result<Song> {
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO songs (user_id, pamphlet, id, title, text, creator)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![user_id, pamphlet, id, title, text, creator],
    )
    .map_err(map_missing_pamphlet)
    .context("failed to insert song")?;

    debug!(user = user_id, pamphlet, song = id.as_str(), "created song");
    Ok(Song {
        id,
        title: title.to_string(),
        text: text.to_string(),
        creator: creator.to_string(),
    })
}

/// Update all editable song fields. Like other update helpers, we surface an
/// explicit error when zero rows are touched.
pub fn update_song(
    conn: &Connection,
    user_id: &str,
    pamphlet: &str,
    song_id: &str,
    title: &str,
    text: &str,
    creator: &str,
) -> Result<()> {
    let updated = conn
        .execute(
            "UPDATE songs SET title = ?1, text = ?2, creator = ?3
             WHERE user_id = ?4 AND pamphlet = ?5 AND id = ?6",
            params![title, text, creator, user_id, pamphlet, song_id],
        )
        .context("failed to update song")?;

    if updated == 0 {
        Err(StoreError::SongNotFound.into())
    } else {
        Ok(())
    }
}

/// Permanently delete one song, erroring when the id was not there to begin
/// with so callers never mistake a no-op for a removal.
pub fn delete_song(conn: &Connection, user_id: &str, pamphlet: &str, song_id: &str) -> Result<()> {
    let deleted = conn
        .execute(
            "DELETE FROM songs WHERE user_id = ?1 AND pamphlet = ?2 AND id = ?3",
            params![user_id, pamphlet, song_id],
        )
        .context("failed to delete song")?;

    if deleted == 0 {
        Err(StoreError::SongNotFound.into())
    } else {
        debug!(user = user_id, pamphlet, song = song_id, "deleted song");
        Ok(())
    }
}

/// Coerce SQLite constraint errors into the typed domain error. A fresh UUID
/// cannot collide with the composite primary key, so a constraint failure on
/// insert means the parent pamphlet row is missing.
fn map_missing_pamphlet(err: SqlError) -> anyhow::Error {
    if matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    ) {
        StoreError::PamphletNotFound.into()
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{apply_schema, create_pamphlet, generate_user};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn
    }

    fn seeded_user(conn: &Connection) -> String {
        let user = generate_user(conn).unwrap().user_id;
        create_pamphlet(conn, &user, "Hymns").unwrap();
        user
    }

    #[test]
    fn test_created_song_shows_up_in_fetches() {
        let conn = test_conn();
        let user = seeded_user(&conn);
        let created = create_song(
            &conn,
            &user,
            "Hymns",
            "Amazing Grace",
            "Amazing grace, how sweet the sound",
            "John Newton",
        )
        .unwrap();

        let songs = fetch_songs(&conn, &user, "Hymns").unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, created.id);
        assert_eq!(songs[0].title, "Amazing Grace");
        assert_eq!(songs[0].text, "Amazing grace, how sweet the sound");
        assert_eq!(songs[0].creator, "John Newton");

        assert!(fetch_song(&conn, &user, "Hymns", &created.id)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_song_with_every_field_empty_is_storable() {
        let conn = test_conn();
        let user = seeded_user(&conn);
        let created = create_song(&conn, &user, "Hymns", "", "", "").unwrap();

        let fetched = fetch_song(&conn, &user, "Hymns", &created.id)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.title, "");
        assert_eq!(fetched.text, "");
        assert_eq!(fetched.creator, "");
    }

    #[test]
    fn test_fetch_song_returns_none_for_unknown_id() {
        let conn = test_conn();
        let user = seeded_user(&conn);

        assert!(fetch_song(&conn, &user, "Hymns", "no-such-id")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_update_song_overwrites_every_field() {
        let conn = test_conn();
        let user = seeded_user(&conn);
        let created = create_song(&conn, &user, "Hymns", "Draft", "la la", "").unwrap();

        update_song(
            &conn,
            &user,
            "Hymns",
            &created.id,
            "Abide With Me",
            "Abide with me, fast falls the eventide",
            "Henry Lyte",
        )
        .unwrap();

        let fetched = fetch_song(&conn, &user, "Hymns", &created.id)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.title, "Abide With Me");
        assert_eq!(fetched.text, "Abide with me, fast falls the eventide");
        assert_eq!(fetched.creator, "Henry Lyte");
    }

    #[test]
    fn test_update_missing_song_is_a_domain_error() {
        let conn = test_conn();
        let user = seeded_user(&conn);

        let err = update_song(&conn, &user, "Hymns", "no-such-id", "t", "x", "c").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::SongNotFound)
        ));
    }

    #[test]
    fn test_delete_song_removes_only_that_song() {
        let conn = test_conn();
        let user = seeded_user(&conn);
        let first = create_song(&conn, &user, "Hymns", "First", "", "").unwrap();
        let second = create_song(&conn, &user, "Hymns", "Second", "", "").unwrap();

        delete_song(&conn, &user, "Hymns", &first.id).unwrap();

        let songs = fetch_songs(&conn, &user, "Hymns").unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].id, second.id);
    }

    #[test]
    fn test_delete_missing_song_is_a_domain_error() {
        let conn = test_conn();
        let user = seeded_user(&conn);

        let err = delete_song(&conn, &user, "Hymns", "no-such-id").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::SongNotFound)
        ));
    }

    #[test]
    fn test_create_song_without_pamphlet_is_a_domain_error() {
        let conn = test_conn();
        let user = generate_user(&conn).unwrap().user_id;

        let err = create_song(&conn, &user, "Nope", "Title", "", "").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::PamphletNotFound)
        ));
    }

    #[test]
    fn test_fetch_songs_orders_by_id() {
        let conn = test_conn();
        let user = seeded_user(&conn);
        for title in ["One", "Two", "Three"] {
            create_song(&conn, &user, "Hymns", title, "", "").unwrap();
        }

        let ids: Vec<String> = fetch_songs(&conn, &user, "Hymns")
            .unwrap()
            .into_iter()
            .map(|song| song.id)
            .collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_fetch_creators_is_distinct_sorted_and_skips_blank() {
        let conn = test_conn();
        let user = seeded_user(&conn);
        create_pamphlet(&conn, &user, "Campfire").unwrap();
        create_song(&conn, &user, "Hymns", "A", "", "newton").unwrap();
        create_song(&conn, &user, "Hymns", "B", "", "Bach").unwrap();
        create_song(&conn, &user, "Hymns", "C", "", "").unwrap();
        create_song(&conn, &user, "Campfire", "D", "", "Bach").unwrap();

        let creators = fetch_creators(&conn, &user).unwrap();
        assert_eq!(creators, vec!["Bach", "newton"]);
    }

    #[test]
    fn test_songs_are_scoped_to_their_pamphlet() {
        let conn = test_conn();
        let user = seeded_user(&conn);
        create_pamphlet(&conn, &user, "Campfire").unwrap();
        let hymn = create_song(&conn, &user, "Hymns", "Hymn", "", "").unwrap();
        create_song(&conn, &user, "Campfire", "Chorus", "", "").unwrap();

        let hymns = fetch_songs(&conn, &user, "Hymns").unwrap();
        assert_eq!(hymns.len(), 1);
        assert_eq!(hymns[0].title, "Hymn");

        assert!(fetch_song(&conn, &user, "Campfire", &hymn.id)
            .unwrap()
            .is_none());
    }
}
