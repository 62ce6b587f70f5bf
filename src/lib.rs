//! Core library surface for the song pamphlet manager TUI application.
//!
//! The public modules exposed here provide an intentionally small API so the
//! `bin` target as well as potential external tooling can reuse the same pieces.
//! Keeping the glue logic documented makes it easy to recall why each re-export
//! exists when revisiting the project.
pub mod db;
pub mod identity;
pub mod models;
pub mod ui;

/// Convenience re-exports for the persistence layer. These functions are
/// typically used by `main.rs` to initialize the embedded SQLite store,
/// preload data, and resolve share references.
pub use db::{
    data_dir, ensure_schema, fetch_creators, fetch_pamphlets, fetch_songs, pamphlet_exists,
    resolve_reference,
};

/// Loads the anonymous identity persisted on a previous run, if any.
pub use identity::load_identity;

/// The primary domain types that other layers manipulate.
pub use models::{Identity, Pamphlet, Song};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
