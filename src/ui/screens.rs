use std::cmp::min;

use crate::models::Song;

/// Backing state for the pamphlet-specific song list. The pamphlet name rides
/// along explicitly so every handler knows which collection it is acting on
/// without consulting ambient state.
pub(crate) struct SongListScreen {
    pub(crate) pamphlet: String,
    pub(crate) songs: Vec<Song>,
    pub(crate) selected: usize,
}

impl SongListScreen {
    pub(crate) fn new(pamphlet: String, songs: Vec<Song>) -> Self {
        let mut screen = Self {
            pamphlet,
            songs,
            selected: 0,
        };
        screen.ensure_in_bounds();
        screen
    }

    pub(crate) fn current_song(&self) -> Option<&Song> {
        self.songs.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        if self.songs.is_empty() {
            return;
        }
        let len = self.songs.len() as isize;
        let mut new = self.selected as isize + offset;
        if new < 0 {
            new = 0;
        }
        if new >= len {
            new = len - 1;
        }
        self.selected = new as usize;
    }

    pub(crate) fn select_first(&mut self) {
        if !self.songs.is_empty() {
            self.selected = 0;
        }
    }

    pub(crate) fn select_last(&mut self) {
        if !self.songs.is_empty() {
            self.selected = self.songs.len() - 1;
        }
    }

    pub(crate) fn set_songs(&mut self, songs: Vec<Song>) {
        self.songs = songs;
        self.ensure_in_bounds();
    }

    /// Put the cursor back on a remembered position, clamping if the list
    /// shrank in the meantime.
    pub(crate) fn restore_selection(&mut self, selected: usize) {
        self.selected = selected;
        self.ensure_in_bounds();
    }

    fn ensure_in_bounds(&mut self) {
        if self.songs.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.songs.len() {
            self.selected = self.songs.len() - 1;
        }
    }
}

/// Full-screen carousel that pages through one pamphlet a song at a time.
/// Also used for read-only viewing of somebody else's pamphlet, in which case
/// `shared` is set and leaving the carousel exits the app.
pub(crate) struct CarouselScreen {
    pub(crate) pamphlet: String,
    pub(crate) songs: Vec<Song>,
    pub(crate) selected: usize,
    pub(crate) scroll: u16,
    pub(crate) shared: bool,
}

impl CarouselScreen {
    pub(crate) fn new(pamphlet: String, songs: Vec<Song>, selected: usize, shared: bool) -> Self {
        let selected = if songs.is_empty() {
            0
        } else {
            min(selected, songs.len() - 1)
        };
        Self {
            pamphlet,
            songs,
            selected,
            scroll: 0,
            shared,
        }
    }

    pub(crate) fn current_song(&self) -> Option<&Song> {
        self.songs.get(self.selected)
    }

    /// Page to the next song. The carousel does not wrap; staying put at the
    /// last page mirrors how the selection lists behave.
    pub(crate) fn next_song(&mut self) {
        if !self.songs.is_empty() && self.selected + 1 < self.songs.len() {
            self.selected += 1;
            self.scroll = 0;
        }
    }

    pub(crate) fn previous_song(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll = 0;
        }
    }

    pub(crate) fn first_song(&mut self) {
        if !self.songs.is_empty() {
            self.selected = 0;
            self.scroll = 0;
        }
    }

    pub(crate) fn last_song(&mut self) {
        if !self.songs.is_empty() {
            self.selected = self.songs.len() - 1;
            self.scroll = 0;
        }
    }

    pub(crate) fn scroll_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(1);
    }

    pub(crate) fn scroll_down(&mut self) {
        self.scroll = min(self.scroll + 1, self.max_scroll());
    }

    pub(crate) fn max_scroll(&self) -> u16 {
        self.current_song()
            .map(|song| song.text.lines().count().saturating_sub(1) as u16)
            .unwrap_or(0)
    }

    /// Label such as `3 / 7` shown in the carousel title.
    pub(crate) fn position_label(&self) -> String {
        if self.songs.is_empty() {
            String::from("0 / 0")
        } else {
            format!("{} / {}", self.selected + 1, self.songs.len())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str, text: &str) -> Song {
        Song {
            id: id.to_string(),
            title: format!("Song {id}"),
            text: text.to_string(),
            creator: String::new(),
        }
    }

    #[test]
    fn test_carousel_pages_without_wrapping() {
        let songs = vec![song("a", ""), song("b", ""), song("c", "")];
        let mut carousel = CarouselScreen::new("Hymns".to_string(), songs, 0, false);

        carousel.previous_song();
        assert_eq!(carousel.selected, 0);

        carousel.next_song();
        carousel.next_song();
        carousel.next_song();
        assert_eq!(carousel.selected, 2);
        assert_eq!(carousel.position_label(), "3 / 3");
    }

    #[test]
    fn test_carousel_scroll_resets_when_changing_song() {
        let songs = vec![song("a", "one\ntwo\nthree"), song("b", "only")];
        let mut carousel = CarouselScreen::new("Hymns".to_string(), songs, 0, false);

        carousel.scroll_down();
        carousel.scroll_down();
        assert_eq!(carousel.scroll, 2);

        carousel.scroll_down();
        assert_eq!(carousel.scroll, 2, "scroll must clamp to the lyric length");

        carousel.next_song();
        assert_eq!(carousel.scroll, 0);
        assert_eq!(carousel.max_scroll(), 0);
    }

    #[test]
    fn test_carousel_clamps_initial_selection() {
        let songs = vec![song("a", ""), song("b", "")];
        let carousel = CarouselScreen::new("Hymns".to_string(), songs, 9, false);
        assert_eq!(carousel.selected, 1);
    }

    #[test]
    fn test_song_list_selection_stays_in_bounds_after_reload() {
        let mut screen = SongListScreen::new(
            "Hymns".to_string(),
            vec![song("a", ""), song("b", ""), song("c", "")],
        );
        screen.select_last();
        assert_eq!(screen.selected, 2);

        screen.set_songs(vec![song("a", "")]);
        assert_eq!(screen.selected, 0);
        assert_eq!(screen.current_song().map(|s| s.id.as_str()), Some("a"));
    }
}
