//! Widget state and lifecycle controller.
//!
//! [`WidgetController`] is the functional core of the widget. It owns the
//! transient [`WidgetState`], the cached [`RemoteVariable`] snapshot, and the
//! host's [`ConfigSource`]. Host actions and network completions go in as
//! [`Msg`]s; requests for network calls and timer changes come out as
//! [`Effect`]s. Nothing here awaits or spawns, so every transition is
//! applied atomically from the caller's point of view.
//!
//! Two guards keep asynchronous completions honest:
//! - every request carries the activation `generation` it was issued in;
//!   completions from another generation, or arriving while inactive, are
//!   dropped without touching state;
//! - fetch completions older than the newest applied fetch are dropped, so a
//!   slow stale read cannot overwrite fresher data.

use advisory_types::{
    ApiError, ConfigSource, Configuration, Effect, FetchTrigger, Msg, RemoteVariable, RequestId, WidgetState,
    WidgetStatus,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Message shown when a save is attempted with a blank draft.
pub const EMPTY_MESSAGE_ERROR: &str = "Message cannot be empty";

/// Errors returned by host actions. Each one is also reflected in the widget
/// state where it is user visible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WidgetError {
    #[error("{0}")]
    Validation(String),

    #[error("editing is not allowed for this widget")]
    EditNotAllowed,

    #[error("a save is already in progress")]
    SaveInProgress,

    #[error("widget is not active")]
    Inactive,

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Inactive,
    Active,
}

#[derive(Debug)]
pub struct WidgetController {
    source: ConfigSource,
    state: WidgetState,
    snapshot: Option<RemoteVariable>,
    lifecycle: Lifecycle,
    generation: u64,
    next_sequence: u64,
    newest_applied_fetch: Option<u64>,
    pending_save: Option<RequestId>,
}

impl WidgetController {
    pub fn new(source: ConfigSource) -> Self {
        Self {
            source,
            state: WidgetState::default(),
            snapshot: None,
            lifecycle: Lifecycle::Inactive,
            generation: 0,
            next_sequence: 0,
            newest_applied_fetch: None,
            pending_save: None,
        }
    }

    pub fn state(&self) -> &WidgetState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&RemoteVariable> {
        self.snapshot.as_ref()
    }

    /// Host access to the configuration layers. Changes are picked up by the
    /// next operation.
    pub fn source_mut(&mut self) -> &mut ConfigSource {
        &mut self.source
    }

    /// Freshly resolved configuration.
    pub fn configuration(&self) -> Configuration {
        self.source.resolve()
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle == Lifecycle::Active
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_saving(&self) -> bool {
        self.pending_save.is_some()
    }

    /// Dispatch a message to the matching action. Action errors are logged;
    /// their user-visible part is already in the state.
    pub fn handle_message(&mut self, msg: Msg) -> Vec<Effect> {
        let outcome = match msg {
            Msg::Activate => Ok(self.activate()),
            Msg::Deactivate => Ok(self.deactivate()),
            Msg::Tick => Ok(self.on_tick()),
            Msg::Refresh => self.refresh(),
            Msg::ToggleEdit => self.toggle_edit().map(|_| Vec::new()),
            Msg::CancelEdit => {
                self.cancel_edit();
                Ok(Vec::new())
            }
            Msg::DraftChanged(draft) => {
                self.set_draft(draft);
                Ok(Vec::new())
            }
            Msg::Save(draft) => self.save(&draft),
            Msg::FetchCompleted { request, result } => Ok(self.fetch_completed(request, result)),
            Msg::PutCompleted { request, result } => Ok(self.put_completed(request, result)),
        };

        outcome.unwrap_or_else(|error| {
            debug!(%error, "widget action rejected");
            Vec::new()
        })
    }

    /// Start the widget: one immediate fetch followed by the recurring poll.
    ///
    /// With incomplete configuration the widget shows the error and neither
    /// fetches nor starts the poll. Activating an active widget is a no-op.
    pub fn activate(&mut self) -> Vec<Effect> {
        if self.is_active() {
            return Vec::new();
        }
        self.lifecycle = Lifecycle::Active;
        self.generation += 1;
        self.pending_save = None;
        info!(generation = self.generation, "widget activated");

        let config = self.configuration();
        let missing = config.missing_fields();
        if !missing.is_empty() {
            self.record_configuration_error(missing);
            return Vec::new();
        }

        let mut effects = self.begin_fetch(FetchTrigger::Initial);
        effects.push(Effect::StartPolling {
            generation: self.generation,
        });
        effects
    }

    /// Stop the widget. State is frozen from here on: any completion that
    /// arrives later is discarded.
    pub fn deactivate(&mut self) -> Vec<Effect> {
        if !self.is_active() {
            return Vec::new();
        }
        self.lifecycle = Lifecycle::Inactive;
        self.pending_save = None;
        info!(generation = self.generation, "widget deactivated");
        vec![Effect::StopPolling]
    }

    /// Recurring poll fired.
    pub fn on_tick(&mut self) -> Vec<Effect> {
        if !self.is_active() {
            return Vec::new();
        }
        self.begin_fetch(FetchTrigger::Periodic)
    }

    /// Operator-triggered fetch. Runs alongside any fetch already in flight
    /// and leaves the poll period untouched.
    pub fn refresh(&mut self) -> Result<Vec<Effect>, WidgetError> {
        if !self.is_active() {
            return Err(WidgetError::Inactive);
        }
        Ok(self.begin_fetch(FetchTrigger::Manual))
    }

    /// Open or close the edit surface. Opening seeds the draft with the value
    /// currently displayed.
    pub fn toggle_edit(&mut self) -> Result<(), WidgetError> {
        self.ensure_editable()?;
        self.state.edit_open = !self.state.edit_open;
        if self.state.edit_open {
            self.state.draft_value = self
                .snapshot
                .as_ref()
                .map(|variable| variable.editable_value().to_string())
                .unwrap_or_default();
        }
        Ok(())
    }

    /// Close the edit surface without touching remote state.
    pub fn cancel_edit(&mut self) {
        self.state.edit_open = false;
    }

    pub fn set_draft(&mut self, draft: String) {
        if self.is_active() {
            self.state.draft_value = draft;
        }
    }

    /// Write `draft` to the remote variable.
    ///
    /// Blank drafts fail locally. While a write is pending further saves are
    /// rejected. On success the edit surface closes and a reconciling fetch
    /// follows; on failure it stays open with the draft intact.
    pub fn save(&mut self, draft: &str) -> Result<Vec<Effect>, WidgetError> {
        self.ensure_editable()?;
        let value = draft.trim();
        if value.is_empty() {
            self.state.draft_value = draft.to_string();
            self.state.last_error = Some(EMPTY_MESSAGE_ERROR.to_string());
            return Err(WidgetError::Validation(EMPTY_MESSAGE_ERROR.to_string()));
        }
        if self.pending_save.is_some() {
            return Err(WidgetError::SaveInProgress);
        }
        self.state.draft_value = draft.to_string();

        let config = self.configuration();
        let missing = config.missing_fields();
        if !missing.is_empty() {
            return Err(self.record_configuration_error(missing).into());
        }

        let request = self.next_request();
        self.pending_save = Some(request);
        self.state.last_error = None;
        self.state.status = WidgetStatus::Saving;
        debug!(sequence = request.sequence, "save requested");

        Ok(vec![Effect::Put {
            request,
            config,
            value: value.to_string(),
        }])
    }

    fn fetch_completed(&mut self, request: RequestId, result: Result<RemoteVariable, ApiError>) -> Vec<Effect> {
        if !self.accepts(request) {
            return Vec::new();
        }
        if self.newest_applied_fetch.is_some_and(|newest| request.sequence < newest) {
            warn!(sequence = request.sequence, "discarding stale fetch completion");
            return Vec::new();
        }
        self.newest_applied_fetch = Some(request.sequence);

        match result {
            Ok(variable) => {
                debug!(sequence = request.sequence, id = %variable.id, "fetch applied");
                self.snapshot = Some(variable);
                self.state.last_error = None;
                self.state.status = if self.is_saving() { WidgetStatus::Saving } else { WidgetStatus::UpToDate };
            }
            Err(error) => {
                warn!(sequence = request.sequence, %error, "fetch failed");
                self.state.last_error = Some(format!("Error: {error}"));
                if !self.is_saving() {
                    self.state.status = WidgetStatus::Error;
                }
            }
        }
        Vec::new()
    }

    fn put_completed(&mut self, request: RequestId, result: Result<(), ApiError>) -> Vec<Effect> {
        if !self.accepts(request) || self.pending_save != Some(request) {
            debug!(sequence = request.sequence, "discarding unexpected save completion");
            return Vec::new();
        }
        self.pending_save = None;

        match result {
            Ok(()) => {
                info!(sequence = request.sequence, "save succeeded");
                self.state.edit_open = false;
                self.state.last_error = None;
                self.state.status = WidgetStatus::Saved;
                self.begin_fetch(FetchTrigger::Reconcile)
            }
            Err(error) => {
                warn!(sequence = request.sequence, %error, "save failed");
                self.state.last_error = Some(format!("Save failed: {error}"));
                self.state.status = WidgetStatus::Error;
                Vec::new()
            }
        }
    }

    /// Shared fetch cycle for every trigger. Prior data stays visible while
    /// the request is in flight.
    fn begin_fetch(&mut self, trigger: FetchTrigger) -> Vec<Effect> {
        let config = self.configuration();
        let missing = config.missing_fields();
        if !missing.is_empty() {
            self.record_configuration_error(missing);
            return Vec::new();
        }

        let request = self.next_request();
        self.state.last_error = None;
        self.state.status = match trigger {
            _ if self.is_saving() => WidgetStatus::Saving,
            FetchTrigger::Reconcile => WidgetStatus::Saved,
            _ if self.snapshot.is_none() => WidgetStatus::Loading,
            _ => WidgetStatus::Refreshing,
        };
        debug!(sequence = request.sequence, ?trigger, "fetch requested");

        vec![Effect::Fetch { request, trigger, config }]
    }

    fn record_configuration_error(&mut self, missing: Vec<&'static str>) -> ApiError {
        let error = ApiError::configuration(missing);
        warn!(%error, "cannot reach the variable service");
        self.state.last_error = Some(error.to_string());
        self.state.status = WidgetStatus::Error;
        error
    }

    fn ensure_editable(&self) -> Result<(), WidgetError> {
        if !self.configuration().edit_allowed {
            return Err(WidgetError::EditNotAllowed);
        }
        if !self.is_active() {
            return Err(WidgetError::Inactive);
        }
        Ok(())
    }

    fn accepts(&self, request: RequestId) -> bool {
        let accepted = self.is_active() && request.generation == self.generation;
        if !accepted {
            debug!(
                generation = request.generation,
                current = self.generation,
                active = self.is_active(),
                "ignoring completion outside the current activation"
            );
        }
        accepted
    }

    fn next_request(&mut self) -> RequestId {
        self.next_sequence += 1;
        RequestId {
            generation: self.generation,
            sequence: self.next_sequence,
        }
    }
}
