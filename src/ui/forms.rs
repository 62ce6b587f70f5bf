use anyhow::{anyhow, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::Song;

/// Internal representation of the "new pamphlet" form. A pamphlet is nothing
/// but a name, so the form is a single text field plus an error slot.
#[derive(Default, Clone)]
pub(crate) struct PamphletForm {
    pub(crate) name: String,
    pub(crate) error: Option<String>,
}

impl PamphletForm {
    /// Append a character to the name, validating allowed input. Slashes are
    /// rejected up front because the name is later passed around as a bare
    /// path segment in the share command.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() || ch == '/' {
            return false;
        }
        self.name.push(ch);
        true
    }

    /// Remove the last character from the name.
    pub(crate) fn backspace(&mut self) {
        self.name.pop();
    }

    /// Validate the input and return the normalized name.
    pub(crate) fn parse_inputs(&self) -> Result<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(anyhow!("Pamphlet name is required."));
        }
        Ok(name.to_string())
    }

    /// Render the single input line for the form widget.
    pub(crate) fn build_line(&self) -> Line<'static> {
        let display = if self.name.is_empty() {
            "<required>".to_string()
        } else {
            self.name.clone()
        };

        let style = if self.name.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Yellow)
        };

        Line::from(vec![
            Span::raw("Name: ".to_string()),
            Span::styled(display, style),
        ])
    }

    /// Character count of the name, used for cursor placement.
    pub(crate) fn value_len(&self) -> usize {
        self.name.chars().count()
    }
}

/// Form state for song creation/editing, including autocomplete tracking for
/// the creator field.
#[derive(Default, Clone)]
pub(crate) struct SongForm {
    pub(crate) title: String,
    pub(crate) creator: String,
    pub(crate) text: String,
    pub(crate) active: SongField,
    pub(crate) error: Option<String>,
    pub(crate) suggestion: Option<String>,
    pub(crate) autocomplete_disabled: bool,
}

/// Enumerates the fields within the song form to drive focus management.
#[derive(Copy, Clone, PartialEq, Eq)]
pub(crate) enum SongField {
    Title,
    Creator,
    Lyrics,
}

impl Default for SongField {
    fn default() -> Self {
        SongField::Title
    }
}

impl SongForm {
    /// Populate the form from an existing song when entering edit mode.
    pub(crate) fn from_song(song: &Song) -> Self {
        Self {
            title: song.title.clone(),
            creator: song.creator.clone(),
            text: song.text.clone(),
            active: SongField::Title,
            error: None,
            suggestion: None,
            autocomplete_disabled: false,
        }
    }

    /// Cycle focus forward across the three song fields.
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            SongField::Title => SongField::Creator,
            SongField::Creator => SongField::Lyrics,
            SongField::Lyrics => SongField::Title,
        };
        if self.active != SongField::Creator {
            self.clear_suggestion();
        }
    }

    /// Cycle focus backward across the three song fields.
    pub(crate) fn toggle_field_back(&mut self) {
        self.active = match self.active {
            SongField::Title => SongField::Lyrics,
            SongField::Creator => SongField::Title,
            SongField::Lyrics => SongField::Creator,
        };
        if self.active != SongField::Creator {
            self.clear_suggestion();
        }
    }

    /// Insert a character into the active field.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            SongField::Title => self.title.push(ch),
            SongField::Creator => {
                self.autocomplete_disabled = false;
                self.creator.push(ch);
            }
            SongField::Lyrics => self.text.push(ch),
        }
        true
    }

    /// Insert a line break. Only the lyrics field is multi-line; in the other
    /// fields the caller treats Enter as focus movement instead.
    pub(crate) fn push_newline(&mut self) -> bool {
        if self.active == SongField::Lyrics {
            self.text.push('\n');
            true
        } else {
            false
        }
    }

    /// Remove a character from the active field.
    pub(crate) fn backspace(&mut self) {
        match self.active {
            SongField::Title => {
                self.title.pop();
            }
            SongField::Creator => {
                self.creator.pop();
                self.autocomplete_disabled = false;
            }
            SongField::Lyrics => {
                self.text.pop();
            }
        }
    }

    /// Validate and normalize form inputs before they are written to the
    /// database. Only the title is mandatory; lyrics keep their interior line
    /// breaks and lose only the surrounding whitespace.
    pub(crate) fn parse_inputs(&self) -> Result<(String, String, String)> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(anyhow!("Song title is required."));
        }
        Ok((
            title.to_string(),
            self.text.trim().to_string(),
            self.creator.trim().to_string(),
        ))
    }

    /// Update the creator autocomplete suggestion based on current input.
    pub(crate) fn update_suggestion(&mut self, creators: &[String]) {
        if self.active != SongField::Creator {
            self.clear_suggestion();
            return;
        }

        if self.autocomplete_disabled || self.creator.chars().count() < 2 {
            self.clear_suggestion();
            return;
        }

        let current_lower = self.creator.to_lowercase();
        let maybe_match = creators
            .iter()
            .find(|candidate| candidate.to_lowercase().starts_with(&current_lower));

        if let Some(candidate) = maybe_match {
            if candidate.chars().count() == self.creator.chars().count()
                && candidate.to_lowercase() == current_lower
            {
                self.suggestion = None;
            } else {
                self.suggestion = Some(candidate.clone());
            }
        } else {
            self.suggestion = None;
        }
    }

    /// Apply the suggested creator, marking autocomplete as satisfied.
    pub(crate) fn accept_suggestion(&mut self) -> bool {
        if self.suggestion_suffix().is_some() {
            if let Some(candidate) = self.suggestion.clone() {
                self.creator = candidate;
                self.autocomplete_disabled = true;
                self.suggestion = None;
                return true;
            }
        }
        false
    }

    /// Explicitly disable autocomplete for the rest of this interaction.
    pub(crate) fn cancel_autocomplete(&mut self) -> bool {
        if self.active == SongField::Creator && self.suggestion.is_some() {
            self.autocomplete_disabled = true;
            self.suggestion = None;
            return true;
        }
        false
    }

    /// Drop the current suggestion.
    fn clear_suggestion(&mut self) {
        self.suggestion = None;
    }

    /// Return the remaining characters to display as a ghosted autocomplete
    /// hint.
    pub(crate) fn suggestion_suffix(&self) -> Option<String> {
        let candidate = self.suggestion.as_ref()?;
        let current_len = self.creator.chars().count();
        let mut chars = candidate.chars();
        for _ in 0..current_len {
            chars.next()?;
        }
        let suffix: String = chars.collect();
        if suffix.is_empty() {
            None
        } else {
            Some(suffix)
        }
    }

    /// Whether we currently have a suggestion to show for the creator field.
    pub(crate) fn has_active_suggestion(&self) -> bool {
        self.active == SongField::Creator && self.suggestion.is_some()
    }

    /// Render a styled line for one of the single-line fields, optionally
    /// appending the autocomplete suffix.
    pub(crate) fn build_line(&self, field_name: &str, field: SongField) -> Line<'static> {
        let (value, is_active) = match field {
            SongField::Title => (&self.title, self.active == SongField::Title),
            SongField::Creator => (&self.creator, self.active == SongField::Creator),
            SongField::Lyrics => (&self.text, self.active == SongField::Lyrics),
        };

        let placeholder = match field {
            SongField::Title => "<required>",
            SongField::Creator => "<optional>",
            SongField::Lyrics => "<optional>",
        };

        let display = if value.is_empty() {
            placeholder.to_string()
        } else {
            value.clone()
        };

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else if value.is_empty() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default()
        };

        let mut spans = vec![Span::raw(format!("{field_name}: "))];

        if field == SongField::Creator && is_active && !value.is_empty() {
            spans.push(Span::styled(value.clone(), style));
            if let Some(suffix) = self.suggestion_suffix() {
                spans.push(Span::styled(suffix, Style::default().fg(Color::DarkGray)));
            }
        } else {
            spans.push(Span::styled(display, style));
        }

        Line::from(spans)
    }

    /// Render the multi-line lyrics block for the modal form.
    pub(crate) fn lyrics_lines(&self) -> Vec<Line<'static>> {
        let is_active = self.active == SongField::Lyrics;

        if self.text.is_empty() {
            let style = if is_active {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            return vec![Line::from(Span::styled("<optional>".to_string(), style))];
        }

        let style = if is_active {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };

        self.text
            .split('\n')
            .map(|line| Line::from(Span::styled(line.to_string(), style)))
            .collect()
    }

    /// Character length of the requested single-line field.
    pub(crate) fn value_len(&self, field: SongField) -> usize {
        match field {
            SongField::Title => self.title.chars().count(),
            SongField::Creator => self.creator.chars().count(),
            SongField::Lyrics => self.text.chars().count(),
        }
    }

    /// Cursor position inside the lyrics block as (row, column). A trailing
    /// newline counts as an empty final row so the cursor tracks where the
    /// next character will land.
    pub(crate) fn lyrics_cursor(&self) -> (usize, usize) {
        let rows: Vec<&str> = self.text.split('\n').collect();
        let row = rows.len().saturating_sub(1);
        let col = rows.last().map(|line| line.chars().count()).unwrap_or(0);
        (row, col)
    }
}

/// State for confirming pamphlet deletion. The song count is captured when the
/// dialog opens so the warning can spell out how much goes down with the
/// pamphlet.
pub(crate) struct ConfirmPamphletDelete {
    pub(crate) name: String,
    pub(crate) song_count: usize,
}

/// State for confirming permanent song deletion.
pub(crate) struct ConfirmSongDelete {
    pub(crate) song: Song,
}

/// Everything the share dialog needs to render without a store round-trip.
pub(crate) struct ShareInfo {
    pub(crate) reference: String,
    pub(crate) pamphlet: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pamphlet_form_requires_a_name() {
        let mut form = PamphletForm::default();
        assert!(form.parse_inputs().is_err());

        form.push_char('H');
        form.push_char('i');
        assert_eq!(form.parse_inputs().unwrap(), "Hi");
    }

    #[test]
    fn test_pamphlet_form_rejects_slashes() {
        let mut form = PamphletForm::default();
        assert!(!form.push_char('/'));
        assert!(form.name.is_empty());
    }

    #[test]
    fn test_song_form_requires_only_the_title() {
        let mut form = SongForm::default();
        assert!(form.parse_inputs().is_err());

        form.push_char('A');
        let (title, text, creator) = form.parse_inputs().unwrap();
        assert_eq!(title, "A");
        assert_eq!(text, "");
        assert_eq!(creator, "");
    }

    #[test]
    fn test_lyrics_keep_interior_line_breaks() {
        let mut form = SongForm::default();
        form.push_char('T');
        form.active = SongField::Lyrics;
        for ch in "line one".chars() {
            form.push_char(ch);
        }
        form.push_newline();
        for ch in "line two".chars() {
            form.push_char(ch);
        }
        form.push_newline();

        let (_, text, _) = form.parse_inputs().unwrap();
        assert_eq!(text, "line one\nline two");
    }

    #[test]
    fn test_newline_is_ignored_outside_lyrics() {
        let mut form = SongForm::default();
        assert!(!form.push_newline());
        assert!(form.title.is_empty());
    }

    #[test]
    fn test_creator_suggestion_completes_known_names() {
        let creators = vec!["John Newton".to_string(), "Sarah Flower Adams".to_string()];
        let mut form = SongForm::default();
        form.active = SongField::Creator;
        form.push_char('j');
        form.push_char('o');
        form.update_suggestion(&creators);

        assert_eq!(form.suggestion_suffix().as_deref(), Some("hn Newton"));
        assert!(form.accept_suggestion());
        assert_eq!(form.creator, "John Newton");
    }

    #[test]
    fn test_cancelled_autocomplete_stays_quiet_until_typing_resumes() {
        let creators = vec!["John Newton".to_string()];
        let mut form = SongForm::default();
        form.active = SongField::Creator;
        form.push_char('j');
        form.push_char('o');
        form.update_suggestion(&creators);
        assert!(form.cancel_autocomplete());

        form.update_suggestion(&creators);
        assert!(form.suggestion.is_none());

        form.push_char('h');
        form.update_suggestion(&creators);
        assert!(form.has_active_suggestion());
    }
}
