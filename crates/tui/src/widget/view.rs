//! Presentation projection of the widget.
//!
//! [`WidgetView`] is a pure function of the widget state, the cached variable
//! and the resolved configuration. Renderers (terminal, JSON) only read it.

use std::fmt::Display;

use advisory_types::{Configuration, PLACEHOLDER, RemoteVariable, WidgetState, WidgetStatus};
use advisory_util::date_handling::format_epoch_millis_in;
use chrono::{Local, TimeZone};
use serde::Serialize;

use super::controller::WidgetController;

pub const TITLE: &str = "Desktop Advisory Message";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataField {
    pub label: &'static str,
    pub value: String,
}

/// Edit surface as the operator sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum EditSurface {
    /// Editing is not permitted; no edit action is offered.
    Unavailable,
    /// Edit action offered, surface closed.
    Closed,
    Open { draft: String, save_enabled: bool },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WidgetView {
    pub title: &'static str,
    pub status: WidgetStatus,
    pub status_text: &'static str,
    pub message: String,
    pub metadata: Vec<MetadataField>,
    pub error: Option<String>,
    pub edit: EditSurface,
}

impl WidgetView {
    /// Project the controller with timestamps in the host's local time zone.
    pub fn from_controller(controller: &WidgetController) -> Self {
        Self::project(
            controller.state(),
            controller.snapshot(),
            &controller.configuration(),
            controller.is_saving(),
            &Local,
        )
    }

    pub fn project<Tz>(
        state: &WidgetState,
        snapshot: Option<&RemoteVariable>,
        config: &Configuration,
        saving: bool,
        zone: &Tz,
    ) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let message = snapshot
            .map(|variable| variable.default_value.as_str())
            .filter(|value| !value.trim().is_empty())
            .unwrap_or(PLACEHOLDER)
            .to_string();

        let field = |value: Option<String>| value.unwrap_or_else(|| PLACEHOLDER.to_string());
        let metadata = vec![
            MetadataField {
                label: "Variable ID",
                value: field(snapshot.map(|variable| variable.id.clone())),
            },
            MetadataField {
                label: "Name",
                value: field(snapshot.map(|variable| variable.name.clone())),
            },
            MetadataField {
                label: "Active",
                value: field(snapshot.and_then(|variable| variable.active).map(|active| active.to_string())),
            },
            MetadataField {
                label: "Last Updated",
                value: field(snapshot.and_then(|variable| format_epoch_millis_in(variable.last_updated_time, zone))),
            },
        ];

        let edit = match (config.edit_allowed, state.edit_open) {
            (false, _) => EditSurface::Unavailable,
            (true, false) => EditSurface::Closed,
            (true, true) => EditSurface::Open {
                draft: state.draft_value.clone(),
                save_enabled: !saving,
            },
        };

        Self {
            title: TITLE,
            status: state.status,
            status_text: state.status.label(),
            message,
            metadata,
            error: state.last_error.clone(),
            edit,
        }
    }

    pub fn metadata_value(&self, label: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|field| field.label == label)
            .map(|field| field.value.as_str())
    }

    /// Plain-text rendering used by one-shot commands.
    pub fn to_text(&self) -> String {
        let mut lines = vec![
            self.title.to_string(),
            format!("Status: {}", self.status_text),
            format!("Message: {}", self.message),
        ];
        for field in &self.metadata {
            lines.push(format!("{}: {}", field.label, field.value));
        }
        if let Some(error) = &self.error {
            lines.push(error.clone());
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisory_types::ConfigSource;
    use chrono::Utc;

    fn config(edit_allowed: bool) -> Configuration {
        let mut config = ConfigSource::default().resolve();
        config.edit_allowed = edit_allowed;
        config
    }

    fn greeting() -> RemoteVariable {
        RemoteVariable {
            id: "v1".into(),
            name: "Greeting".into(),
            default_value: "Hello".into(),
            active: Some(true),
            last_updated_time: Some(1_700_000_000_000),
        }
    }

    #[test]
    fn projects_a_fetched_variable() {
        let state = WidgetState {
            status: WidgetStatus::UpToDate,
            ..WidgetState::default()
        };
        let view = WidgetView::project(&state, Some(&greeting()), &config(false), false, &Utc);

        assert_eq!(view.message, "Hello");
        assert_eq!(view.status_text, "Up to date");
        assert_eq!(view.metadata_value("Variable ID"), Some("v1"));
        assert_eq!(view.metadata_value("Name"), Some("Greeting"));
        assert_eq!(view.metadata_value("Active"), Some("true"));
        assert_eq!(view.metadata_value("Last Updated"), Some("2023-11-14 22:13:20"));
        assert_eq!(view.error, None);
        assert_eq!(view.edit, EditSurface::Unavailable);
    }

    #[test]
    fn never_fetched_shows_placeholders() {
        let view = WidgetView::project(&WidgetState::default(), None, &config(true), false, &Utc);
        assert_eq!(view.status_text, "Idle");
        assert_eq!(view.message, PLACEHOLDER);
        assert!(view.metadata.iter().all(|field| field.value == PLACEHOLDER));
        assert_eq!(view.edit, EditSurface::Closed);
    }

    #[test]
    fn blank_message_and_bad_timestamp_fall_back() {
        let variable = RemoteVariable {
            default_value: "   ".into(),
            active: None,
            last_updated_time: Some(i64::MAX),
            ..greeting()
        };
        let view = WidgetView::project(&WidgetState::default(), Some(&variable), &config(false), false, &Utc);
        assert_eq!(view.message, PLACEHOLDER);
        assert_eq!(view.metadata_value("Active"), Some(PLACEHOLDER));
        assert_eq!(view.metadata_value("Last Updated"), Some(PLACEHOLDER));
    }

    #[test]
    fn message_is_shown_verbatim() {
        let variable = RemoteVariable {
            default_value: "  Back at 5pm \n".into(),
            ..greeting()
        };
        let view = WidgetView::project(&WidgetState::default(), Some(&variable), &config(false), false, &Utc);
        assert_eq!(view.message, "  Back at 5pm \n");
    }

    #[test]
    fn open_editor_disables_save_while_saving() {
        let state = WidgetState {
            status: WidgetStatus::Saving,
            last_error: None,
            edit_open: true,
            draft_value: "Draft".into(),
        };
        let view = WidgetView::project(&state, Some(&greeting()), &config(true), true, &Utc);
        assert_eq!(
            view.edit,
            EditSurface::Open {
                draft: "Draft".into(),
                save_enabled: false
            }
        );
        assert_eq!(view.status_text, "Saving…");
    }

    #[test]
    fn error_banner_follows_last_error() {
        let state = WidgetState {
            status: WidgetStatus::Error,
            last_error: Some("Error: 404 Not Found".into()),
            ..WidgetState::default()
        };
        let view = WidgetView::project(&state, Some(&greeting()), &config(false), false, &Utc);
        assert_eq!(view.message, "Hello");
        assert_eq!(view.error.as_deref(), Some("Error: 404 Not Found"));
        assert!(view.to_text().ends_with("Error: 404 Not Found"));
    }
}
