//! Terminal rendering and key routing for the advisory widget.
//!
//! The component owns only local editing state (the text buffer and its
//! cursor). Everything else is read from a [`WidgetView`] each frame, and
//! operator intent is reported back to the runtime as an [`Action`].

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
};

use super::text_input::TextInputState;
use super::theme::{Theme, theme_helpers};
use crate::widget::{EditSurface, WidgetView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Refresh,
    ToggleEdit,
    CancelEdit,
    /// The draft buffer changed and should be mirrored into widget state.
    DraftEdited,
    Save,
    Quit,
}

#[derive(Debug, Default)]
pub struct WidgetComponent {
    input: TextInputState,
    notice: Option<String>,
}

impl WidgetComponent {
    pub fn draft(&self) -> &str {
        self.input.input()
    }

    /// Seed the editor buffer, typically when the edit surface opens.
    pub fn load_draft(&mut self, draft: &str) {
        self.input.reset(draft);
    }

    /// Transient message for rejected actions that leave no trace in the
    /// widget state.
    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }

    pub fn handle_key(&mut self, key: KeyEvent, editing: bool) -> Option<Action> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        self.notice = None;
        let control = key.modifiers.contains(KeyModifiers::CONTROL);

        if editing {
            return match key.code {
                KeyCode::Esc => Some(Action::CancelEdit),
                KeyCode::Char('s') if control => Some(Action::Save),
                KeyCode::Char(c) if !control => {
                    self.input.insert_char(c);
                    Some(Action::DraftEdited)
                }
                KeyCode::Backspace => self.input.backspace().then_some(Action::DraftEdited),
                KeyCode::Delete => self.input.delete().then_some(Action::DraftEdited),
                KeyCode::Left => {
                    self.input.move_left();
                    None
                }
                KeyCode::Right => {
                    self.input.move_right();
                    None
                }
                KeyCode::Home => {
                    self.input.move_home();
                    None
                }
                KeyCode::End => {
                    self.input.move_end();
                    None
                }
                _ => None,
            };
        }

        match key.code {
            KeyCode::Char('r') if !control => Some(Action::Refresh),
            KeyCode::Char('e') if !control => Some(Action::ToggleEdit),
            KeyCode::Char('q') if !control => Some(Action::Quit),
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, view: &WidgetView, theme: &dyn Theme) {
        let outer = theme_helpers::block(theme, Some(view.title), false);
        let inner = outer.inner(area);
        frame.render_widget(outer, area);

        let mut constraints = vec![
            Constraint::Length(1),
            Constraint::Min(2),
            Constraint::Length(view.metadata.len() as u16),
        ];
        if view.error.is_some() {
            constraints.push(Constraint::Length(1));
        }
        if matches!(view.edit, EditSurface::Open { .. }) {
            constraints.push(Constraint::Length(3));
        }
        constraints.push(Constraint::Length(1));
        let areas = Layout::vertical(constraints).split(inner);
        let mut next = 0;
        let mut take = || {
            let rect = areas[next];
            next += 1;
            rect
        };

        let status = Line::from(vec![
            Span::styled("Status: ", theme.text_secondary_style()),
            Span::styled(view.status_text, theme.widget_status_style(view.status)),
        ]);
        frame.render_widget(Paragraph::new(status), take());

        let message = Paragraph::new(view.message.as_str())
            .style(theme.text_primary_style().add_modifier(Modifier::BOLD))
            .wrap(Wrap { trim: false });
        frame.render_widget(message, take());

        let metadata: Vec<Line> = view
            .metadata
            .iter()
            .map(|field| {
                Line::from(vec![
                    Span::styled(format!("{}: ", field.label), theme.text_secondary_style()),
                    Span::styled(field.value.as_str(), theme.text_primary_style()),
                ])
            })
            .collect();
        frame.render_widget(Paragraph::new(metadata), take());

        if let Some(error) = &view.error {
            frame.render_widget(Paragraph::new(Span::styled(error.as_str(), theme.status_error())), take());
        }

        if let EditSurface::Open { save_enabled, .. } = &view.edit {
            let title = if *save_enabled { "Edit message" } else { "Edit message (saving…)" };
            let editor_area = take();
            let editor = Paragraph::new(self.input.input())
                .style(theme_helpers::input_style(theme, *save_enabled))
                .block(theme_helpers::block(theme, Some(title), true));
            frame.render_widget(editor, editor_area);
            let column = editor_area.x.saturating_add(1).saturating_add(self.input.cursor_column());
            let max_column = editor_area.right().saturating_sub(2);
            frame.set_cursor_position(Position::new(column.min(max_column), editor_area.y + 1));
        }

        frame.render_widget(Paragraph::new(self.hint_line(view, theme)), take());
    }

    fn hint_line(&self, view: &WidgetView, theme: &dyn Theme) -> Line<'_> {
        if let Some(notice) = &self.notice {
            return Line::from(Span::styled(notice.as_str(), theme.status_warning()));
        }
        let hints: &[(&'static str, &'static str)] = match &view.edit {
            EditSurface::Open { save_enabled: true, .. } => &[("Ctrl+S", " save  "), ("Esc", " cancel")],
            EditSurface::Open { save_enabled: false, .. } => &[("Esc", " cancel")],
            EditSurface::Closed => &[("r", " refresh  "), ("e", " edit  "), ("q", " quit")],
            EditSurface::Unavailable => &[("r", " refresh  "), ("q", " quit")],
        };
        Line::from(
            hints
                .iter()
                .flat_map(|(key, description)| theme_helpers::key_hint(theme, key, description))
                .collect::<Vec<_>>(),
        )
    }
}
