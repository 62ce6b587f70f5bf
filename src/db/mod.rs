//! Persistence module split across logical submodules.

mod connection;
mod pamphlets;
mod songs;
mod users;

use thiserror::Error;

pub use connection::{apply_schema, data_dir, ensure_schema, open_store};
pub use pamphlets::{create_pamphlet, delete_pamphlet, fetch_pamphlets, pamphlet_exists};
pub use songs::{create_song, delete_song, fetch_creators, fetch_song, fetch_songs, update_song};
pub use users::{create_user_reference, generate_user, resolve_reference};

#[derive(Debug, Error)]
/// Domain failures the store can name precisely. These travel inside `anyhow`
/// chains so callers that only show a footer message stay untyped, while tests
/// and branching code can downcast to the exact case.
pub enum StoreError {
    #[error("User not found")]
    UserNotFound,
    #[error("Pamphlet not found")]
    PamphletNotFound,
    #[error("Song not found")]
    SongNotFound,
}
