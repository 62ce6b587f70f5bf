use anyhow::Error;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

/// Tile a motif row across the full card width.
pub(crate) fn repeat_pattern_row(row: &str, width: usize) -> String {
    if row.is_empty() {
        return " ".repeat(width);
    }
    let copies = width / row.chars().count() + 2;
    row.repeat(copies).chars().take(width).collect()
}

/// Render the pamphlet name centered inside square brackets. Names are
/// measured in characters, not bytes, so non-ASCII titles line up and never
/// get cut mid-character.
pub(crate) fn pamphlet_label_line(name: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return " ".repeat(width);
    }
    let decorated: String = format!("[ {} ]", trimmed).chars().take(width).collect();
    let decorated_len = decorated.chars().count();
    let padding = width.saturating_sub(decorated_len);
    let left = padding / 2;
    let right = padding - left;
    let mut line = String::with_capacity(width);
    line.push_str(&" ".repeat(left));
    line.push_str(&decorated);
    line.push_str(&" ".repeat(right));
    line
}

/// Lay out one pamphlet cover: tiled motif rows, a spacer, and the bracketed
/// name near the bottom. Selection brightens the motif and bolds the name.
pub(crate) fn build_pamphlet_cover_lines(
    name: &str,
    pattern: &[&str],
    inner_width: u16,
    inner_height: u16,
    selected: bool,
) -> Vec<Line<'static>> {
    let width = inner_width as usize;
    let height = inner_height as usize;
    if width == 0 || height == 0 {
        return vec![Line::from("")];
    }

    let motif_style = if selected {
        Style::default().fg(Color::Gray)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let blank_row = || Line::from(Span::styled(" ".repeat(width), motif_style));

    let label_lines = if height >= 2 { 2 } else { 1 };
    let motif_height = height.saturating_sub(label_lines);

    let mut lines = Vec::with_capacity(height);
    for row_idx in 0..motif_height {
        let motif = pattern
            .get(row_idx % pattern.len().max(1))
            .copied()
            .unwrap_or("");
        lines.push(Line::from(Span::styled(
            repeat_pattern_row(motif, width),
            motif_style,
        )));
    }

    if height >= 2 {
        lines.push(blank_row());
    }

    let label = pamphlet_label_line(name, width);
    if selected {
        lines.push(Line::from(Span::styled(
            label,
            Style::default().add_modifier(Modifier::BOLD),
        )));
    } else {
        lines.push(Line::from(label));
    }

    while lines.len() < height {
        lines.push(blank_row());
    }

    lines
}

/// Rectangle spanning the given percentages of `area`, centered both ways.
/// Modal dialogs draw into this.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let [horizontal] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    let [centered] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(horizontal);
    centered
}

/// The innermost message of an error chain, which is the one worth showing
/// in the footer.
pub(crate) fn surface_error(err: &Error) -> String {
    match err.chain().last() {
        Some(root) => root.to_string(),
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn test_pattern_row_fills_exact_width() {
        assert_eq!(repeat_pattern_row("ab", 5), "ababa");
        assert_eq!(repeat_pattern_row("", 3), "   ");
        assert_eq!(repeat_pattern_row("x", 0), "");
    }

    #[test]
    fn test_label_line_centers_and_clips() {
        assert_eq!(pamphlet_label_line("Hymns", 11), " [ Hymns ] ");
        assert_eq!(pamphlet_label_line("", 4), "    ");

        let clipped = pamphlet_label_line("A very long pamphlet name", 10);
        assert_eq!(clipped.chars().count(), 10);
    }

    #[test]
    fn test_label_line_counts_characters_not_bytes() {
        let line = pamphlet_label_line("Sanger på norsk", 8);
        assert_eq!(line.chars().count(), 8);
    }

    #[test]
    fn test_cover_lines_fill_the_card() {
        let lines = build_pamphlet_cover_lines("Hymns", &["~ ", "* "], 12, 4, false);
        assert_eq!(lines.len(), 4);

        let single_row = build_pamphlet_cover_lines("Hymns", &["~ "], 12, 1, true);
        assert_eq!(single_row.len(), 1);
    }

    #[test]
    fn test_surface_error_prefers_the_root_cause() {
        let err = anyhow!("Pamphlet not found");
        let wrapped = Err::<(), _>(err)
            .context("failed to open pamphlet")
            .unwrap_err();
        assert_eq!(surface_error(&wrapped), "Pamphlet not found");
    }
}
