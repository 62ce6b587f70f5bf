use std::cmp::min;
use std::mem;

use anyhow::{anyhow, Result};
use crossterm::event::KeyCode;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use rusqlite::Connection;

use crate::db::{
    create_pamphlet, create_song, delete_pamphlet, delete_song, fetch_creators, fetch_pamphlets,
    fetch_song, fetch_songs, generate_user, update_song,
};
use crate::identity::save_identity;
use crate::models::{Identity, Pamphlet, Song};

use super::forms::{
    ConfirmPamphletDelete, ConfirmSongDelete, PamphletForm, ShareInfo, SongField, SongForm,
};
use super::helpers::{build_pamphlet_cover_lines, centered_rect, surface_error};
use super::screens::{CarouselScreen, SongListScreen};

/// Number of pamphlet cards shown in each row of the main grid. Four columns
/// are a sweet spot on most terminal sizes while keeping names legible.
const GRID_COLUMNS: usize = 4;
/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height allocation per song card in the list view.
const SONG_CARD_HEIGHT: u16 = 5;
/// ASCII textures used to decorate pamphlet covers. We rotate through the list
/// so large collections feel more playful without needing color support.
const PAMPHLET_ART: &[&[&str]] = &[
    &["/\\/\\/", "\\/\\/\\"],
    &["*+*+", "+*+*"],
    &["=--=", "--=="],
    &["..--", "--.."],
    &["oOo ", " OoO"],
    &["||--", "--||"],
    &["~~  ", "  ~~"],
    &["^v^v", "v^v^"],
    &["::''", "''::"],
    &["+-+-", "-+-+"],
    &["[]<>", "<>[]"],
    &["d|b ", " d|b"],
    &["=__=", "__=="],
    &["x  x", "  xx"],
];

/// High-level navigation states. Keeping this explicit makes it easy to reason
/// about which rendering path runs and what keyboard shortcuts should do.
enum Screen {
    /// First-run greeting shown until an identity exists.
    Welcome,
    /// Grid of the user's pamphlets.
    Pamphlets,
    /// Songs inside one pamphlet.
    Songs(SongListScreen),
    /// One-song-at-a-time presentation view, also used read-only for shared
    /// pamphlets.
    Carousel(CarouselScreen),
}

/// Fine-grained modes scoped to the current screen.
enum Mode {
    Normal,
    CreatingPamphlet(PamphletForm),
    ConfirmPamphletDelete(ConfirmPamphletDelete),
    CreatingSong(SongForm),
    EditingSong { song_id: String, form: SongForm },
    ConfirmSongDelete(ConfirmSongDelete),
    Sharing(ShareInfo),
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    conn: Connection,
    identity: Option<Identity>,
    pamphlets: Vec<Pamphlet>,
    selected: usize,
    creators: Vec<String>,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl App {
    /// Build the app for normal management use. Without an identity the app
    /// starts on the welcome screen; everything else requires one.
    pub fn new(
        conn: Connection,
        identity: Option<Identity>,
        pamphlets: Vec<Pamphlet>,
        creators: Vec<String>,
    ) -> Self {
        let screen = if identity.is_some() {
            Screen::Pamphlets
        } else {
            Screen::Welcome
        };
        Self {
            conn,
            identity,
            pamphlets,
            selected: 0,
            creators,
            screen,
            mode: Mode::Normal,
            status: None,
        }
    }

    /// Build the app in read-only shared mode: straight into the carousel for
    /// somebody else's pamphlet, no identity, no editing.
    pub fn shared(conn: Connection, pamphlet: String, songs: Vec<Song>) -> Self {
        Self {
            conn,
            identity: None,
            pamphlets: Vec::new(),
            selected: 0,
            creators: Vec::new(),
            screen: Screen::Carousel(CarouselScreen::new(pamphlet, songs, 0, true)),
            mode: Mode::Normal,
            status: None,
        }
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::CreatingPamphlet(form) => self.handle_create_pamphlet(code, form)?,
            Mode::ConfirmPamphletDelete(confirm) => {
                self.handle_confirm_pamphlet_delete(code, confirm)?
            }
            Mode::CreatingSong(form) => self.handle_create_song(code, form)?,
            Mode::EditingSong { song_id, form } => self.handle_edit_song(code, song_id, form)?,
            Mode::ConfirmSongDelete(confirm) => self.handle_confirm_song_delete(code, confirm)?,
            Mode::Sharing(info) => self.handle_sharing(code, info)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let user_id = self
            .identity
            .as_ref()
            .map(|identity| identity.user_id.clone());

        match self.screen {
            Screen::Welcome => {
                match code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        *exit = true;
                    }
                    KeyCode::Enter => {
                        if let Err(err) = self.create_identity() {
                            let message = surface_error(&err);
                            self.set_status(message, StatusKind::Error);
                        }
                    }
                    _ => {}
                }
                Ok(Mode::Normal)
            }
            Screen::Pamphlets => {
                match code {
                    KeyCode::Char('q') | KeyCode::Esc => {
                        *exit = true;
                    }
                    KeyCode::Left => self.move_horizontal(-1),
                    KeyCode::Right => self.move_horizontal(1),
                    KeyCode::Up => self.move_vertical(-1),
                    KeyCode::Down => self.move_vertical(1),
                    KeyCode::Enter => {
                        if let Some(pamphlet) = self.current_pamphlet().cloned() {
                            self.clear_status();
                            self.open_pamphlet_view(pamphlet.name)?;
                        } else {
                            self.set_status("No pamphlet selected.", StatusKind::Error);
                        }
                    }
                    KeyCode::Char('v') | KeyCode::Char('V') => {
                        if let Some(pamphlet) = self.current_pamphlet().cloned() {
                            self.clear_status();
                            self.open_carousel(pamphlet.name, 0)?;
                        } else {
                            self.set_status("No pamphlet selected to view.", StatusKind::Error);
                        }
                    }
                    KeyCode::Char('r') | KeyCode::Char('R') => {
                        let share = match (self.identity.as_ref(), self.current_pamphlet()) {
                            (Some(identity), Some(pamphlet)) => Some(ShareInfo {
                                reference: identity.reference.clone(),
                                pamphlet: pamphlet.name.clone(),
                            }),
                            _ => None,
                        };
                        if let Some(info) = share {
                            self.clear_status();
                            return Ok(Mode::Sharing(info));
                        }
                        self.set_status("No pamphlet selected to share.", StatusKind::Error);
                    }
                    KeyCode::Char('+') => {
                        self.clear_status();
                        return Ok(Mode::CreatingPamphlet(PamphletForm::default()));
                    }
                    KeyCode::Char('-') => {
                        if let Some(pamphlet) = self.current_pamphlet().cloned() {
                            self.clear_status();
                            let user = self.require_identity()?.user_id.clone();
                            let song_count =
                                fetch_songs(&self.conn, &user, &pamphlet.name)?.len();
                            return Ok(Mode::ConfirmPamphletDelete(ConfirmPamphletDelete {
                                name: pamphlet.name,
                                song_count,
                            }));
                        } else {
                            self.set_status("No pamphlet selected to remove.", StatusKind::Error);
                        }
                    }
                    _ => {}
                }
                Ok(Mode::Normal)
            }
            Screen::Songs(ref mut list) => {
                let mut status_to_set: Option<(String, StatusKind)> = None;
                let mut clear_status = false;
                let mut back_to_pamphlets = false;
                let mut open_relative: Option<isize> = None;
                let mut carousel_target: Option<(String, usize)> = None;
                let mut refresh_list = false;

                {
                    let list = &mut *list;
                    match code {
                        KeyCode::Char('q') => {
                            *exit = true;
                        }
                        KeyCode::Esc => {
                            back_to_pamphlets = true;
                            clear_status = true;
                        }
                        KeyCode::Up => list.move_selection(-1),
                        KeyCode::Down => list.move_selection(1),
                        KeyCode::PageUp => list.move_selection(-5),
                        KeyCode::PageDown => list.move_selection(5),
                        KeyCode::Home => list.select_first(),
                        KeyCode::End => list.select_last(),
                        KeyCode::Tab => {
                            clear_status = true;
                            open_relative = Some(1);
                        }
                        KeyCode::BackTab => {
                            clear_status = true;
                            open_relative = Some(-1);
                        }
                        KeyCode::Enter | KeyCode::Char('v') | KeyCode::Char('V') => {
                            carousel_target = Some((list.pamphlet.clone(), list.selected));
                        }
                        KeyCode::Char('+') => {
                            return Ok(Mode::CreatingSong(SongForm::default()));
                        }
                        KeyCode::Char('-') => {
                            if let Some(song) = list.current_song().cloned() {
                                return Ok(Mode::ConfirmSongDelete(ConfirmSongDelete { song }));
                            } else {
                                status_to_set = Some((
                                    "No song selected to delete.".to_string(),
                                    StatusKind::Error,
                                ));
                            }
                        }
                        KeyCode::Char('e') | KeyCode::Char('E') => {
                            // Re-read the row so editing a song that vanished
                            // underneath us shows a message instead of saving
                            // into nothing.
                            match (list.current_song(), user_id.as_deref()) {
                                (Some(song), Some(user)) => {
                                    let stored =
                                        fetch_song(&self.conn, user, &list.pamphlet, &song.id)?;
                                    match stored {
                                        Some(song) => {
                                            return Ok(Mode::EditingSong {
                                                song_id: song.id.clone(),
                                                form: SongForm::from_song(&song),
                                            });
                                        }
                                        None => {
                                            status_to_set = Some((
                                                "Song no longer exists.".to_string(),
                                                StatusKind::Error,
                                            ));
                                            refresh_list = true;
                                        }
                                    }
                                }
                                _ => {
                                    status_to_set = Some((
                                        "No song selected to edit.".to_string(),
                                        StatusKind::Error,
                                    ));
                                }
                            }
                        }
                        _ => {}
                    }
                }

                if back_to_pamphlets {
                    self.screen = Screen::Pamphlets;
                } else if let Some(offset) = open_relative {
                    self.open_relative_pamphlet(offset)?;
                } else if let Some((pamphlet, selected)) = carousel_target {
                    self.open_carousel(pamphlet, selected)?;
                }

                if refresh_list {
                    self.refresh_song_list()?;
                }

                if clear_status {
                    self.clear_status();
                } else if let Some((text, kind)) = status_to_set {
                    self.set_status(text, kind);
                }

                Ok(Mode::Normal)
            }
            Screen::Carousel(ref mut carousel) => {
                let mut leave: Option<(String, usize)> = None;

                match code {
                    KeyCode::Char('q') => {
                        *exit = true;
                    }
                    KeyCode::Esc => {
                        if carousel.shared {
                            *exit = true;
                        } else {
                            leave = Some((carousel.pamphlet.clone(), carousel.selected));
                        }
                    }
                    KeyCode::Left | KeyCode::PageUp => carousel.previous_song(),
                    KeyCode::Right | KeyCode::PageDown => carousel.next_song(),
                    KeyCode::Up => carousel.scroll_up(),
                    KeyCode::Down => carousel.scroll_down(),
                    KeyCode::Home => carousel.first_song(),
                    KeyCode::End => carousel.last_song(),
                    _ => {}
                }

                if let Some((pamphlet, selected)) = leave {
                    self.clear_status();
                    self.open_pamphlet_view(pamphlet)?;
                    if let Screen::Songs(ref mut list) = self.screen {
                        list.restore_selection(selected);
                    }
                }

                Ok(Mode::Normal)
            }
        }
    }

    fn handle_create_pamphlet(&mut self, code: KeyCode, mut form: PamphletForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                self.set_status("Pamphlet creation cancelled.", StatusKind::Info);
                keep_open = false;
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_new_pamphlet(&form) {
                Ok(_) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::CreatingPamphlet(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_confirm_pamphlet_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmPamphletDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_pamphlet_delete(&confirm) {
                    Ok(_) => Ok(Mode::Normal),
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmPamphletDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmPamphletDelete(confirm)),
        }
    }

    fn handle_create_song(&mut self, code: KeyCode, mut form: SongForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                if !form.cancel_autocomplete() {
                    self.set_status("Song creation cancelled.", StatusKind::Info);
                    keep_open = false;
                }
            }
            KeyCode::Tab => {
                let consumed = form.has_active_suggestion() && form.accept_suggestion();
                if !consumed {
                    form.toggle_field();
                }
                form.update_suggestion(&self.creators);
            }
            KeyCode::BackTab => {
                form.toggle_field_back();
                form.update_suggestion(&self.creators);
            }
            KeyCode::Backspace => {
                form.backspace();
                form.update_suggestion(&self.creators);
            }
            KeyCode::Enter => {
                // Enter inserts a line break in the lyrics and otherwise just
                // advances focus; saving is Ctrl+S.
                if !form.push_newline() {
                    form.toggle_field();
                    form.update_suggestion(&self.creators);
                }
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                    form.update_suggestion(&self.creators);
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::CreatingSong(form))
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_edit_song(
        &mut self,
        code: KeyCode,
        song_id: String,
        mut form: SongForm,
    ) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                if !form.cancel_autocomplete() {
                    self.set_status("Edit cancelled.", StatusKind::Info);
                    keep_open = false;
                }
            }
            KeyCode::Tab => {
                let consumed = form.has_active_suggestion() && form.accept_suggestion();
                if !consumed {
                    form.toggle_field();
                }
                form.update_suggestion(&self.creators);
            }
            KeyCode::BackTab => {
                form.toggle_field_back();
                form.update_suggestion(&self.creators);
            }
            KeyCode::Backspace => {
                form.backspace();
                form.update_suggestion(&self.creators);
            }
            KeyCode::Enter => {
                if !form.push_newline() {
                    form.toggle_field();
                    form.update_suggestion(&self.creators);
                }
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                    form.update_suggestion(&self.creators);
                }
            }
            _ => {}
        }

        if keep_open {
            Ok(Mode::EditingSong { song_id, form })
        } else {
            Ok(Mode::Normal)
        }
    }

    fn handle_confirm_song_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmSongDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_song_delete(&confirm) {
                    Ok(_) => Ok(Mode::Normal),
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmSongDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmSongDelete(confirm)),
        }
    }

    fn handle_sharing(&mut self, code: KeyCode, info: ShareInfo) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => Ok(Mode::Normal),
            _ => Ok(Mode::Sharing(info)),
        }
    }

    /// Ctrl+S saves whichever form is currently open. Routed separately from
    /// [`Self::handle_key`] because plain characters must keep flowing into
    /// the form fields.
    pub(crate) fn handle_ctrl_s(&mut self) -> Result<()> {
        let mode = mem::replace(&mut self.mode, Mode::Normal);

        self.mode = match mode {
            Mode::CreatingPamphlet(mut form) => match self.save_new_pamphlet(&form) {
                Ok(_) => Mode::Normal,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                    Mode::CreatingPamphlet(form)
                }
            },
            Mode::CreatingSong(mut form) => match self.save_new_song(&form) {
                Ok(_) => Mode::Normal,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                    Mode::CreatingSong(form)
                }
            },
            Mode::EditingSong { song_id, mut form } => {
                match self.save_existing_song(&song_id, &form) {
                    Ok(_) => Mode::Normal,
                    Err(err) => {
                        let message = surface_error(&err);
                        form.error = Some(message.clone());
                        self.set_status(message, StatusKind::Error);
                        Mode::EditingSong { song_id, form }
                    }
                }
            }
            other => other,
        };

        Ok(())
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Welcome => self.draw_welcome(frame, content_area),
            Screen::Pamphlets => self.draw_pamphlet_grid(frame, content_area),
            Screen::Songs(list) => self.draw_song_list(frame, content_area, list),
            Screen::Carousel(carousel) => self.draw_carousel(frame, content_area, carousel),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::CreatingPamphlet(form) => {
                self.draw_pamphlet_form(frame, area, "New Pamphlet", form)
            }
            Mode::ConfirmPamphletDelete(confirm) => {
                self.draw_confirm_pamphlet(frame, area, confirm)
            }
            Mode::CreatingSong(form) => self.draw_song_form(frame, area, "Create Song", form),
            Mode::EditingSong { form, .. } => self.draw_song_form(frame, area, "Edit Song", form),
            Mode::ConfirmSongDelete(confirm) => {
                self.draw_confirm_song_delete(frame, area, confirm)
            }
            Mode::Sharing(info) => self.draw_share_dialog(frame, area, info),
            Mode::Normal => {}
        }
    }

    fn draw_welcome(&self, frame: &mut Frame, area: Rect) {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);

        let lines = vec![
            Line::from(""),
            Line::from(Span::styled(
                "Song Pamphlets",
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("Collect songs into pamphlets and page through them like a booklet."),
            Line::from("Everything is stored locally under an anonymous identity; no account"),
            Line::from("is needed and nothing about you is recorded."),
            Line::from(""),
            Line::from(vec![
                Span::raw("Press "),
                Span::styled("[Enter]", key_style),
                Span::raw(" to create your identity and get started."),
            ]),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Welcome"));
        frame.render_widget(paragraph, area);
    }

    fn draw_pamphlet_grid(&self, frame: &mut Frame, area: Rect) {
        if self.pamphlets.is_empty() {
            let message = Paragraph::new("No pamphlets yet. Press '+' to add one.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::NONE));
            frame.render_widget(message, area);
            return;
        }

        let rows = self.split_rows(area);
        for (row_idx, row_chunk) in rows.into_iter().enumerate() {
            let columns = self.split_columns(row_chunk);
            for (col_idx, column_chunk) in columns.into_iter().enumerate() {
                let pamphlet_index = row_idx * GRID_COLUMNS + col_idx;
                if let Some(pamphlet) = self.pamphlets.get(pamphlet_index) {
                    let mut block = Block::default().borders(Borders::ALL);
                    if pamphlet_index == self.selected {
                        block = block.style(Style::default().fg(Color::Yellow));
                    }
                    let pattern = PAMPHLET_ART[pamphlet_index % PAMPHLET_ART.len()];
                    let inner_width = column_chunk.width.saturating_sub(2);
                    let inner_height = column_chunk.height.saturating_sub(2);
                    let lines = build_pamphlet_cover_lines(
                        &pamphlet.name,
                        pattern,
                        inner_width,
                        inner_height,
                        pamphlet_index == self.selected,
                    );
                    let card = Paragraph::new(lines)
                        .alignment(Alignment::Left)
                        .block(block);
                    frame.render_widget(card, column_chunk);
                }
            }
        }
    }

    fn draw_song_list(&self, frame: &mut Frame, area: Rect, list: &SongListScreen) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)])
            .split(area);

        let count_label = if list.songs.len() == 1 {
            "1 song".to_string()
        } else {
            format!("{} songs", list.songs.len())
        };
        let header = Paragraph::new(vec![
            Line::from(Span::styled(
                list.pamphlet.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::raw(count_label)),
        ])
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::ALL).title("Pamphlet"));
        frame.render_widget(header, chunks[0]);

        if list.songs.is_empty() {
            let message = Paragraph::new("No songs yet. Press '+' to add one.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(message, chunks[1]);
            return;
        }

        self.render_song_cards(frame, chunks[1], &list.songs, list.selected);
    }

    fn draw_carousel(&self, frame: &mut Frame, area: Rect, carousel: &CarouselScreen) {
        let title = format!("{} \u{2022} {}", carousel.pamphlet, carousel.position_label());
        let block = Block::default().title(title).borders(Borders::ALL);

        let song = match carousel.current_song() {
            Some(song) => song,
            None => {
                let message = if carousel.shared {
                    "This pamphlet has no songs yet."
                } else {
                    "No songs to show. Press Esc to go back and add one."
                };
                let paragraph = Paragraph::new(message)
                    .alignment(Alignment::Center)
                    .block(block);
                frame.render_widget(paragraph, area);
                return;
            }
        };

        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);
        if inner.height == 0 {
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)])
            .split(inner);

        let creator_line = if song.creator.trim().is_empty() {
            Line::from("")
        } else {
            Line::from(Span::styled(
                format!("By: {}", song.creator.trim()),
                Style::default()
                    .fg(Color::Gray)
                    .add_modifier(Modifier::ITALIC),
            ))
        };
        let heading = Paragraph::new(vec![
            Line::from(Span::styled(
                song.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            creator_line,
            Line::from(""),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(heading, chunks[0]);

        if song.text.is_empty() {
            let placeholder = Paragraph::new(Span::styled(
                "(no lyrics)",
                Style::default().fg(Color::DarkGray),
            ))
            .alignment(Alignment::Center);
            frame.render_widget(placeholder, chunks[1]);
        } else {
            let lyrics = Paragraph::new(song.text.clone())
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: false })
                .scroll((carousel.scroll, 0));
            frame.render_widget(lyrics, chunks[1]);
        }
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        match (&self.screen, &self.mode) {
            (_, Mode::CreatingSong(_)) | (_, Mode::EditingSong { .. }) => Line::from(vec![
                Span::styled("[Tab]", key_style),
                Span::raw(" Next Field   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Line Break (lyrics)   "),
                Span::styled("[Ctrl+S]", key_style),
                Span::raw(" Save   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Cancel"),
            ]),
            (Screen::Welcome, _) => Line::from(vec![
                Span::styled("[Enter]", key_style),
                Span::raw(" Create Identity   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            (Screen::Carousel(carousel), _) => {
                if carousel.shared {
                    Line::from(vec![
                        Span::styled("[\u{2190}\u{2192}]", key_style),
                        Span::raw(" Song   "),
                        Span::styled("[\u{2191}\u{2193}]", key_style),
                        Span::raw(" Scroll   "),
                        Span::styled("[q/Esc]", key_style),
                        Span::raw(" Quit"),
                    ])
                } else {
                    Line::from(vec![
                        Span::styled("[\u{2190}\u{2192}]", key_style),
                        Span::raw(" Song   "),
                        Span::styled("[\u{2191}\u{2193}]", key_style),
                        Span::raw(" Scroll   "),
                        Span::styled("[Esc]", key_style),
                        Span::raw(" Back   "),
                        Span::styled("[q]", key_style),
                        Span::raw(" Quit"),
                    ])
                }
            }
            (Screen::Songs(_), _) => Line::from(vec![
                Span::styled("[\u{2191}\u{2193}]", key_style),
                Span::raw(" Select   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Carousel   "),
                Span::styled("[+]", key_style),
                Span::raw(" Add   "),
                Span::styled("[e]", key_style),
                Span::raw(" Edit   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[Tab]", key_style),
                Span::raw(" Next Pamphlet   "),
                Span::styled("[Esc]", key_style),
                Span::raw(" Back   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
            _ => Line::from(vec![
                Span::styled("[\u{2190}\u{2191}\u{2193}\u{2192}]", key_style),
                Span::raw(" Move   "),
                Span::styled("[Enter]", key_style),
                Span::raw(" Open   "),
                Span::styled("[v]", key_style),
                Span::raw(" Carousel   "),
                Span::styled("[r]", key_style),
                Span::raw(" Share   "),
                Span::styled("[+]", key_style),
                Span::raw(" Add   "),
                Span::styled("[-]", key_style),
                Span::raw(" Delete   "),
                Span::styled("[q]", key_style),
                Span::raw(" Quit"),
            ]),
        }
    }

    fn draw_pamphlet_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &PamphletForm) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![form.build_line(), Line::from("")];

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to save \u{2022} Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);

        let prefix = "Name: ".len() as u16;
        frame.set_cursor_position((inner.x + prefix + form.value_len() as u16, inner.y));
    }

    fn draw_song_form(&self, frame: &mut Frame, area: Rect, title: &str, form: &SongForm) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);
        if inner.height == 0 {
            return;
        }

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(inner);

        let fields = Paragraph::new(vec![
            form.build_line("Title", SongField::Title),
            form.build_line("Creator", SongField::Creator),
        ])
        .wrap(Wrap { trim: true });
        frame.render_widget(fields, chunks[0]);

        let lyrics_block = Block::default().borders(Borders::TOP).title("Lyrics");
        frame.render_widget(lyrics_block.clone(), chunks[1]);
        let lyrics_area = lyrics_block.inner(chunks[1]);
        let lyrics = Paragraph::new(form.lyrics_lines()).wrap(Wrap { trim: false });
        frame.render_widget(lyrics, lyrics_area);

        let tail = if let Some(error) = &form.error {
            Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red)))
        } else {
            Line::from(Span::styled(
                "Ctrl+S to save \u{2022} Tab to switch \u{2022} Enter for a new line \u{2022} Esc to cancel",
                Style::default().fg(Color::Gray),
            ))
        };
        frame.render_widget(Paragraph::new(vec![tail]).wrap(Wrap { trim: true }), chunks[2]);

        let (cursor_x, cursor_y) = match form.active {
            SongField::Title => {
                let prefix = "Title: ".len() as u16;
                (
                    chunks[0].x + prefix + form.value_len(SongField::Title) as u16,
                    chunks[0].y,
                )
            }
            SongField::Creator => {
                let prefix = "Creator: ".len() as u16;
                (
                    chunks[0].x + prefix + form.value_len(SongField::Creator) as u16,
                    chunks[0].y + 1,
                )
            }
            SongField::Lyrics => {
                let (row, col) = form.lyrics_cursor();
                let max_row = lyrics_area.height.saturating_sub(1);
                let max_col = lyrics_area.width.saturating_sub(1);
                (
                    lyrics_area.x + (col as u16).min(max_col),
                    lyrics_area.y + (row as u16).min(max_row),
                )
            }
        };
        frame.set_cursor_position((cursor_x, cursor_y));
    }

    fn draw_confirm_pamphlet(
        &self,
        frame: &mut Frame,
        area: Rect,
        confirm: &ConfirmPamphletDelete,
    ) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Delete Pamphlet")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let songs_line = match confirm.song_count {
            0 => "It has no songs.".to_string(),
            1 => "The one song inside it will be deleted too.".to_string(),
            n => format!("All {n} songs inside it will be deleted too."),
        };

        let lines = vec![
            Line::from(format!("Delete pamphlet '{}'?", confirm.name)),
            Line::from(songs_line),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_confirm_song_delete(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmSongDelete) {
        let popup_area = centered_rect(60, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Delete Song").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "Delete '{}' permanently?",
                confirm.song.display_title()
            )),
            Line::from("It will disappear from this pamphlet and its carousel."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_share_dialog(&self, frame: &mut Frame, area: Rect, info: &ShareInfo) {
        let popup_area = centered_rect(70, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Share Pamphlet")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "Anyone with this reference can view '{}':",
                info.pamphlet
            )),
            Line::from(""),
            Line::from(Span::styled(
                info.reference.clone(),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            Line::from("They can open it read-only with:"),
            Line::from(Span::styled(
                format!(
                    "song-pamphlet-manager view {} \"{}\"",
                    info.reference, info.pamphlet
                ),
                Style::default().fg(Color::Gray),
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Esc to close.",
                Style::default().fg(Color::Gray),
            )),
        ];

        let paragraph = Paragraph::new(lines)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn render_song_cards(&self, frame: &mut Frame, area: Rect, songs: &[Song], selected: usize) {
        if songs.is_empty() || area.height == 0 {
            return;
        }

        let card_height = SONG_CARD_HEIGHT as usize;
        let capacity = ((area.height as usize) / card_height).max(1);
        let len = songs.len();
        let mut start = if selected >= capacity {
            selected + 1 - capacity
        } else {
            0
        };
        if start + capacity > len {
            start = len.saturating_sub(capacity);
        }
        let end = min(start + capacity, len);
        let visible_len = end.saturating_sub(start);
        if visible_len == 0 {
            return;
        }

        let constraints: Vec<Constraint> = (0..visible_len)
            .map(|_| Constraint::Length(SONG_CARD_HEIGHT))
            .collect();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(area);

        for (idx, chunk) in rows.iter().enumerate() {
            if chunk.height == 0 {
                continue;
            }

            let song_index = start + idx;
            if song_index >= len {
                break;
            }

            let song = &songs[song_index];
            let mut block = Block::default().borders(Borders::ALL);
            let mut paragraph_style = Style::default();
            if song_index == selected {
                block = block.style(Style::default().fg(Color::Yellow));
                paragraph_style = Style::default().fg(Color::Yellow);
            }

            let mut lines = Vec::new();
            let title = if song_index == selected {
                format!("\u{25b6} {}", song.title)
            } else {
                song.title.clone()
            };
            lines.push(Line::from(Span::styled(
                title,
                Style::default().add_modifier(Modifier::BOLD),
            )));

            let creator_text = if song.creator.trim().is_empty() {
                "Unknown creator".to_string()
            } else {
                song.creator.trim().to_string()
            };
            lines.push(Line::from(Span::styled(
                creator_text,
                Style::default().fg(Color::Gray),
            )));

            if let Some(first_line) = song.text.lines().find(|line| !line.trim().is_empty()) {
                lines.push(Line::from(Span::styled(
                    first_line.trim().to_string(),
                    Style::default().fg(Color::DarkGray),
                )));
            }

            let paragraph = Paragraph::new(lines)
                .block(block)
                .wrap(Wrap { trim: true })
                .alignment(Alignment::Left)
                .style(paragraph_style);

            frame.render_widget(paragraph, *chunk);
        }
    }

    fn split_rows(&self, area: Rect) -> Vec<Rect> {
        let row_count = self.row_count().max(1) as u16;
        let percent = (100 / row_count).max(1);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(vec![Constraint::Percentage(percent); row_count as usize])
            .split(area);
        chunks.iter().cloned().collect()
    }

    fn split_columns(&self, area: Rect) -> Vec<Rect> {
        let columns = GRID_COLUMNS.max(1) as u16;
        let percent = (100 / columns).max(1);
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Percentage(percent); columns as usize])
            .split(area);
        chunks.iter().cloned().collect()
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    /// Mint the anonymous identity on first run, persist it, and move on to
    /// the pamphlet grid.
    fn create_identity(&mut self) -> Result<()> {
        let identity = generate_user(&self.conn)?;
        save_identity(&identity)?;
        self.identity = Some(identity);
        self.reload_pamphlets(None)?;
        self.reload_creators()?;
        self.screen = Screen::Pamphlets;
        self.set_status("Identity created.", StatusKind::Info);
        Ok(())
    }

    fn require_identity(&self) -> Result<&Identity> {
        self.identity
            .as_ref()
            .ok_or_else(|| anyhow!("No identity loaded"))
    }

    fn save_new_pamphlet(&mut self, form: &PamphletForm) -> Result<()> {
        let name = form.parse_inputs()?;
        let user = self.require_identity()?.user_id.clone();
        let created = create_pamphlet(&self.conn, &user, &name)?;
        if !created {
            return Err(anyhow!("Pamphlet '{name}' already exists."));
        }
        self.reload_pamphlets(Some(&name))?;
        self.set_status(format!("Added pamphlet '{name}'."), StatusKind::Info);
        Ok(())
    }

    fn perform_pamphlet_delete(&mut self, confirm: &ConfirmPamphletDelete) -> Result<()> {
        let user = self.require_identity()?.user_id.clone();
        let removed = delete_pamphlet(&self.conn, &user, &confirm.name)?;
        self.reload_pamphlets(None)?;
        self.screen = Screen::Pamphlets;
        if removed {
            self.set_status(
                format!("Deleted pamphlet '{}'.", confirm.name),
                StatusKind::Info,
            );
        } else {
            self.set_status(
                format!("Pamphlet '{}' was already gone.", confirm.name),
                StatusKind::Info,
            );
        }
        Ok(())
    }

    fn save_new_song(&mut self, form: &SongForm) -> Result<()> {
        let (title, text, creator) = form.parse_inputs()?;
        let user = self.require_identity()?.user_id.clone();
        let pamphlet = self
            .current_song_pamphlet()
            .ok_or_else(|| anyhow!("No pamphlet open"))?;
        create_song(&self.conn, &user, &pamphlet, &title, &text, &creator)?;
        self.refresh_song_list()?;
        self.reload_creators()?;
        self.set_status("Song created.", StatusKind::Info);
        Ok(())
    }

    fn save_existing_song(&mut self, song_id: &str, form: &SongForm) -> Result<()> {
        let (title, text, creator) = form.parse_inputs()?;
        let user = self.require_identity()?.user_id.clone();
        let pamphlet = self
            .current_song_pamphlet()
            .ok_or_else(|| anyhow!("No pamphlet open"))?;
        update_song(
            &self.conn,
            &user,
            &pamphlet,
            song_id,
            &title,
            &text,
            &creator,
        )?;
        self.refresh_song_list()?;
        self.reload_creators()?;
        self.set_status("Song updated.", StatusKind::Info);
        Ok(())
    }

    fn perform_song_delete(&mut self, confirm: &ConfirmSongDelete) -> Result<()> {
        let user = self.require_identity()?.user_id.clone();
        let pamphlet = self
            .current_song_pamphlet()
            .ok_or_else(|| anyhow!("No pamphlet open"))?;
        delete_song(&self.conn, &user, &pamphlet, &confirm.song.id)?;
        self.refresh_song_list()?;
        self.reload_creators()?;
        self.set_status("Song deleted.", StatusKind::Info);
        Ok(())
    }

    fn reload_pamphlets(&mut self, focus_name: Option<&str>) -> Result<()> {
        let user = self.require_identity()?.user_id.clone();
        self.pamphlets = fetch_pamphlets(&self.conn, &user)?;
        if self.pamphlets.is_empty() {
            self.selected = 0;
            return Ok(());
        }

        if let Some(name) = focus_name {
            if let Some((idx, _)) = self
                .pamphlets
                .iter()
                .enumerate()
                .find(|(_, pamphlet)| pamphlet.name == name)
            {
                self.selected = idx;
                return Ok(());
            }
        }

        if self.selected >= self.pamphlets.len() {
            self.selected = self.pamphlets.len().saturating_sub(1);
        }

        Ok(())
    }

    fn open_pamphlet_view(&mut self, name: String) -> Result<()> {
        let user = self.require_identity()?.user_id.clone();
        let songs = fetch_songs(&self.conn, &user, &name)?;
        self.screen = Screen::Songs(SongListScreen::new(name, songs));
        Ok(())
    }

    fn open_carousel(&mut self, name: String, selected: usize) -> Result<()> {
        let user = self.require_identity()?.user_id.clone();
        let songs = fetch_songs(&self.conn, &user, &name)?;
        self.screen = Screen::Carousel(CarouselScreen::new(name, songs, selected, false));
        Ok(())
    }

    /// Jump to the next or previous pamphlet while staying in the song list.
    /// Wraps around at both ends; the grid order is the name order.
    fn open_relative_pamphlet(&mut self, offset: isize) -> Result<()> {
        if self.pamphlets.is_empty() {
            return Ok(());
        }

        let current = match &self.screen {
            Screen::Songs(list) => list.pamphlet.clone(),
            _ => return Ok(()),
        };

        let len = self.pamphlets.len() as isize;
        let current_pos = self
            .pamphlets
            .iter()
            .position(|pamphlet| pamphlet.name == current)
            .unwrap_or(0);
        let new_pos = ((current_pos as isize + offset).rem_euclid(len)) as usize;
        let target = self.pamphlets[new_pos].name.clone();
        self.selected = new_pos;
        self.open_pamphlet_view(target)
    }

    fn refresh_song_list(&mut self) -> Result<()> {
        let user = match self.identity.as_ref() {
            Some(identity) => identity.user_id.clone(),
            None => return Ok(()),
        };
        if let Screen::Songs(ref mut list) = self.screen {
            let updated = fetch_songs(&self.conn, &user, &list.pamphlet)?;
            list.set_songs(updated);
        }
        Ok(())
    }

    fn reload_creators(&mut self) -> Result<()> {
        let user = match self.identity.as_ref() {
            Some(identity) => identity.user_id.clone(),
            None => return Ok(()),
        };
        self.creators = fetch_creators(&self.conn, &user)?;
        Ok(())
    }

    fn current_pamphlet(&self) -> Option<&Pamphlet> {
        self.pamphlets.get(self.selected)
    }

    fn current_song_pamphlet(&self) -> Option<String> {
        if let Screen::Songs(list) = &self.screen {
            Some(list.pamphlet.clone())
        } else {
            None
        }
    }

    fn pamphlet_count(&self) -> usize {
        self.pamphlets.len()
    }

    fn row_count(&self) -> usize {
        let cols = GRID_COLUMNS.max(1);
        (self.pamphlet_count() + cols - 1) / cols
    }

    fn move_horizontal(&mut self, offset: isize) {
        if matches!(self.screen, Screen::Pamphlets) && !self.pamphlets.is_empty() {
            let new_index = self.selected as isize + offset;
            if (0..self.pamphlet_count() as isize).contains(&new_index) {
                self.selected = new_index as usize;
            }
        }
    }

    fn move_vertical(&mut self, offset: isize) {
        if matches!(self.screen, Screen::Pamphlets) && !self.pamphlets.is_empty() {
            let cols = GRID_COLUMNS as isize;
            let new_index = self.selected as isize + offset * cols;
            if (0..self.pamphlet_count() as isize).contains(&new_index) {
                self.selected = new_index as usize;
            }
        }
    }
}
