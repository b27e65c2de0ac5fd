//! Widget state, messages, and effects.
//!
//! The controller consumes [`Msg`]s and answers with [`Effect`]s; the driver
//! performs those effects and turns their outcomes back into messages.

use std::fmt;

use serde::Serialize;

use crate::{ApiError, Configuration, RemoteVariable};

/// Observable status of the widget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum WidgetStatus {
    #[default]
    Idle,
    Loading,
    Refreshing,
    Saving,
    Saved,
    UpToDate,
    Error,
}

impl WidgetStatus {
    /// Human readable status line.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Loading => "Loading…",
            Self::Refreshing => "Refreshing…",
            Self::Saving => "Saving…",
            Self::Saved => "Saved",
            Self::UpToDate => "Up to date",
            Self::Error => "Error",
        }
    }
}

impl fmt::Display for WidgetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Transient per-instance UI state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WidgetState {
    pub status: WidgetStatus,
    pub last_error: Option<String>,
    pub edit_open: bool,
    pub draft_value: String,
}

/// What started a fetch cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FetchTrigger {
    /// First fetch after activation.
    Initial,
    /// Recurring interval tick.
    Periodic,
    /// Operator pressed refresh.
    Manual,
    /// Confirmatory read after a successful save.
    Reconcile,
}

/// Identity of an outbound request.
///
/// `generation` changes on every activation; `sequence` increases for every
/// request issued by the widget instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId {
    pub generation: u64,
    pub sequence: u64,
}

/// Inputs to the widget controller: host actions, timer ticks, and
/// completions of previously requested effects.
#[derive(Clone, Debug)]
pub enum Msg {
    Activate,
    Deactivate,
    /// Recurring poll interval fired.
    Tick,
    /// Manual refresh.
    Refresh,
    ToggleEdit,
    CancelEdit,
    /// Draft text changed in the edit surface.
    DraftChanged(String),
    /// Save the given draft.
    Save(String),
    FetchCompleted {
        request: RequestId,
        result: Result<RemoteVariable, ApiError>,
    },
    PutCompleted {
        request: RequestId,
        result: Result<(), ApiError>,
    },
}

/// Side effects requested by the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    Fetch {
        request: RequestId,
        trigger: FetchTrigger,
        config: Configuration,
    },
    Put {
        request: RequestId,
        config: Configuration,
        value: String,
    },
    /// Begin the recurring poll for the given activation generation.
    StartPolling { generation: u64 },
    /// Cancel the recurring poll.
    StopPolling,
}
