//! Domain models shared between the SQLite layer and the TUI. They are plain
//! data holders; validation and rendering live with the layers that need them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
/// Represents one named song collection belonging to a user. A pamphlet is
/// identified by its name within that user's library, so there is no surrogate
/// id to carry around.
pub struct Pamphlet {
    /// User-chosen display name. It doubles as the key the persistence layer
    /// uses, which is why rename does not exist as an operation: a different
    /// name is a different pamphlet.
    pub name: String,
}

#[derive(Debug, Clone)]
/// In-memory representation of a song. The struct mirrors rows in the `songs`
/// table; all fields are plain text and none of them are required to be
/// non-empty at this level.
pub struct Song {
    /// Random identifier assigned on creation. Unlike an autoincrement key it
    /// stays meaningful when rows move between stores.
    pub id: String,
    /// Title displayed in listings and the carousel heading.
    pub title: String,
    /// Full lyric text, newlines preserved exactly as typed.
    pub text: String,
    /// Creator/author field used both for display and for the auto-complete
    /// suggestions in the song form.
    pub creator: String,
}

impl Song {
    /// Title and creator joined with a hyphen, or just the title when the
    /// creator is blank. The delete confirmation shows this so the dialog
    /// names exactly what is about to disappear.
    pub fn display_title(&self) -> String {
        if self.creator.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.creator)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// The anonymous identity persisted on disk between runs. Both fields are
/// minted once, the first time the user confirms the welcome screen, and are
/// never rotated afterwards.
pub struct Identity {
    /// Owner key for every pamphlet and song this installation writes.
    pub user_id: String,
    /// Shareable token other people can use to open this user's pamphlets
    /// read-only. Kept alongside the user id so the share dialog never needs a
    /// store round-trip.
    pub reference: String,
}
