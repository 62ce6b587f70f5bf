//! End-to-end exercise of the sharing flow: an owner builds up a pamphlet,
//! hands out a reference token, and a viewer resolves that token against the
//! same store without ever learning the owner's user id.

use song_pamphlet_manager::db::{
    create_pamphlet, create_song, create_user_reference, fetch_songs, generate_user, open_store,
    pamphlet_exists, resolve_reference,
};

#[test]
fn test_shared_reference_resolves_to_owner_songs() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_store(&dir.path().join("pamphlets.sqlite")).unwrap();

    let owner = generate_user(&conn).unwrap();
    assert!(create_pamphlet(&conn, &owner.user_id, "Campfire").unwrap());
    create_song(
        &conn,
        &owner.user_id,
        "Campfire",
        "Kumbaya",
        "Kumbaya my Lord\nKumbaya",
        "Trad.",
    )
    .unwrap();
    create_song(&conn, &owner.user_id, "Campfire", "Home on the Range", "", "").unwrap();

    // The viewer only ever holds the reference string.
    let resolved = resolve_reference(&conn, &owner.reference).unwrap();
    assert_eq!(resolved.as_deref(), Some(owner.user_id.as_str()));

    let viewer_user = resolved.unwrap();
    assert!(pamphlet_exists(&conn, &viewer_user, "Campfire").unwrap());
    let songs = fetch_songs(&conn, &viewer_user, "Campfire").unwrap();
    assert_eq!(songs.len(), 2);
    assert!(songs.iter().any(|song| song.title == "Kumbaya"));
}

#[test]
fn test_unknown_reference_resolves_to_nobody() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_store(&dir.path().join("pamphlets.sqlite")).unwrap();

    generate_user(&conn).unwrap();

    let resolved = resolve_reference(&conn, "not-a-real-reference").unwrap();
    assert!(resolved.is_none());
}

#[test]
fn test_extra_references_resolve_to_the_same_owner() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_store(&dir.path().join("pamphlets.sqlite")).unwrap();

    let owner = generate_user(&conn).unwrap();
    let second = create_user_reference(&conn, &owner.user_id).unwrap();
    assert_ne!(second, owner.reference);

    assert_eq!(
        resolve_reference(&conn, &owner.reference).unwrap().as_deref(),
        Some(owner.user_id.as_str())
    );
    assert_eq!(
        resolve_reference(&conn, &second).unwrap().as_deref(),
        Some(owner.user_id.as_str())
    );
}

#[test]
fn test_empty_pamphlet_is_distinguishable_from_missing() {
    let dir = tempfile::tempdir().unwrap();
    let conn = open_store(&dir.path().join("pamphlets.sqlite")).unwrap();

    let owner = generate_user(&conn).unwrap();
    assert!(create_pamphlet(&conn, &owner.user_id, "Empty For Now").unwrap());

    let viewer_user = resolve_reference(&conn, &owner.reference)
        .unwrap()
        .unwrap();

    // An existing pamphlet with no songs opens as an empty carousel.
    assert!(pamphlet_exists(&conn, &viewer_user, "Empty For Now").unwrap());
    assert!(fetch_songs(&conn, &viewer_user, "Empty For Now")
        .unwrap()
        .is_empty());

    // A name the owner never created is reported as missing instead.
    assert!(!pamphlet_exists(&conn, &viewer_user, "Never Made").unwrap());
}
