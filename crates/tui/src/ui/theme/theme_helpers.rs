use ratatui::{
    style::{Modifier, Style},
    text::Span,
    widgets::{Block, BorderType, Borders},
};

use super::roles::{Theme, ThemeRoles};

/// Build a standard Block with theme surfaces and borders.
pub fn block<'a, T: Theme + ?Sized>(theme: &T, title: Option<&'a str>, focused: bool) -> Block<'a> {
    let mut block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Plain)
        .border_style(theme.border_style(focused))
        .style(panel_style(theme));
    if let Some(t) = title {
        block = block.title(Span::styled(t, theme.text_secondary_style().add_modifier(Modifier::BOLD)));
    }
    block
}

/// Style for panel-like containers (set background on widget using `.style`).
pub fn panel_style<T: Theme + ?Sized>(theme: &T) -> Style {
    let ThemeRoles { surface, text, .. } = *theme.roles();
    Style::default().bg(surface).fg(text)
}

/// Style for the editor input; dimmed while a save is pending.
pub fn input_style<T: Theme + ?Sized>(theme: &T, enabled: bool) -> Style {
    let ThemeRoles {
        surface, text, text_muted, ..
    } = *theme.roles();
    let style = Style::default().bg(surface);
    if enabled { style.fg(text) } else { style.fg(text_muted) }
}

/// Key hint style: accent key followed by muted description.
pub fn key_hint<'a, T: Theme + ?Sized>(theme: &T, key: &'a str, description: &'a str) -> [Span<'a>; 2] {
    [
        Span::styled(key, theme.accent_emphasis_style()),
        Span::styled(description, theme.text_muted_style()),
    ]
}
