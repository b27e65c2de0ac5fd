//! Effect execution for the widget controller.
//!
//! [`WidgetDriver`] is the imperative shell around [`WidgetController`]:
//! - `Effect::Fetch` / `Effect::Put` become spawned Tokio tasks whose results
//!   come back as completion messages, in completion order;
//! - `Effect::StartPolling` / `Effect::StopPolling` create and drop the single
//!   [`PollHandle`] owned by the widget.
//!
//! In-flight requests are not aborted on deactivation; their completions are
//! still delivered, and the controller discards them.

use std::sync::Arc;
use std::time::Duration;

use advisory_api::VariableApi;
use advisory_types::{ApiError, ConfigSource, Effect, Msg};
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, StreamExt, stream::FuturesUnordered};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::controller::{WidgetController, WidgetError};

/// Period of the recurring fetch.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Recurring timer owned by an active widget.
#[derive(Debug)]
pub struct PollHandle {
    generation: u64,
    interval: Interval,
}

impl PollHandle {
    /// First tick lands one full period after creation; the activation fetch
    /// already covers "now".
    fn start(generation: u64, period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { generation, interval }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

pub struct WidgetDriver<A: VariableApi + 'static> {
    api: Arc<A>,
    controller: WidgetController,
    poll: Option<PollHandle>,
    poll_period: Duration,
    pending: FuturesUnordered<BoxFuture<'static, Msg>>,
}

impl<A: VariableApi + 'static> WidgetDriver<A> {
    pub fn new(api: Arc<A>, source: ConfigSource) -> Self {
        Self::with_poll_period(api, source, POLL_INTERVAL)
    }

    pub fn with_poll_period(api: Arc<A>, source: ConfigSource, poll_period: Duration) -> Self {
        Self {
            api,
            controller: WidgetController::new(source),
            poll: None,
            poll_period,
            pending: FuturesUnordered::new(),
        }
    }

    pub fn controller(&self) -> &WidgetController {
        &self.controller
    }

    /// Host access to the configuration layers.
    pub fn source_mut(&mut self) -> &mut ConfigSource {
        self.controller.source_mut()
    }

    pub fn is_polling(&self) -> bool {
        self.poll.is_some()
    }

    pub fn in_flight(&self) -> usize {
        self.pending.len()
    }

    /// Feed a message to the controller and execute the resulting effects.
    pub fn dispatch(&mut self, msg: Msg) {
        let effects = self.controller.handle_message(msg);
        self.run_effects(effects);
    }

    pub fn activate(&mut self) {
        self.dispatch(Msg::Activate);
    }

    pub fn deactivate(&mut self) {
        self.dispatch(Msg::Deactivate);
    }

    pub fn refresh(&mut self) -> Result<(), WidgetError> {
        let effects = self.controller.refresh()?;
        self.run_effects(effects);
        Ok(())
    }

    pub fn toggle_edit(&mut self) -> Result<(), WidgetError> {
        self.controller.toggle_edit()
    }

    pub fn cancel_edit(&mut self) {
        self.controller.cancel_edit();
    }

    pub fn set_draft(&mut self, draft: String) {
        self.controller.set_draft(draft);
    }

    pub fn save(&mut self, draft: &str) -> Result<(), WidgetError> {
        let effects = self.controller.save(draft)?;
        self.run_effects(effects);
        Ok(())
    }

    /// Wait for the next poll tick or request completion.
    ///
    /// Returns `None` once nothing can happen anymore: no poll is running and
    /// no request is in flight. Cancel safe, so it can sit in `select!`.
    pub async fn next_message(&mut self) -> Option<Msg> {
        let polling = self.poll.is_some();
        tokio::select! {
            Some(msg) = self.pending.next(), if !self.pending.is_empty() => Some(msg),
            _ = next_tick(&mut self.poll), if polling => Some(Msg::Tick),
            else => None,
        }
    }

    /// Process one tick or completion. Returns `false` when idle for good.
    pub async fn step(&mut self) -> bool {
        match self.next_message().await {
            Some(msg) => {
                self.dispatch(msg);
                true
            }
            None => false,
        }
    }

    /// Apply completions until no request is in flight. Poll ticks are not
    /// awaited.
    pub async fn settle(&mut self) {
        while let Some(msg) = self.pending.next().await {
            self.dispatch(msg);
        }
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Fetch { request, trigger, config } => {
                    debug!(sequence = request.sequence, ?trigger, "spawning fetch");
                    let api = Arc::clone(&self.api);
                    let task = tokio::spawn(async move { api.fetch_variable(&config).await });
                    self.pending.push(
                        task.map(move |joined| Msg::FetchCompleted {
                            request,
                            result: joined.unwrap_or_else(|error| Err(task_failure(error))),
                        })
                        .boxed(),
                    );
                }
                Effect::Put { request, config, value } => {
                    debug!(sequence = request.sequence, "spawning save");
                    let api = Arc::clone(&self.api);
                    let task: JoinHandle<Result<(), ApiError>> =
                        tokio::spawn(async move { api.put_variable(&config, &value).await });
                    self.pending.push(
                        task.map(move |joined| Msg::PutCompleted {
                            request,
                            result: joined.unwrap_or_else(|error| Err(task_failure(error))),
                        })
                        .boxed(),
                    );
                }
                Effect::StartPolling { generation } => {
                    if let Some(previous) = self.poll.take() {
                        warn!(previous = previous.generation(), "replacing an existing poll handle");
                    }
                    debug!(generation, period_secs = self.poll_period.as_secs(), "poll started");
                    self.poll = Some(PollHandle::start(generation, self.poll_period));
                }
                Effect::StopPolling => {
                    if let Some(poll) = self.poll.take() {
                        debug!(generation = poll.generation(), "poll stopped");
                    }
                }
            }
        }
    }
}

/// A request task that panicked or was cancelled still completes its
/// request, so the controller never waits on it forever.
fn task_failure(error: JoinError) -> ApiError {
    warn!(%error, "request task failed");
    ApiError::transport(format!("request task failed: {error}"))
}

async fn next_tick(poll: &mut Option<PollHandle>) {
    match poll {
        Some(handle) => {
            handle.interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use advisory_types::{Configuration, InstanceProperties, RemoteVariable, WidgetStatus};
    use async_trait::async_trait;

    /// Scripted fetch response: value (or error) and how long the call takes.
    type Scripted = (Result<RemoteVariable, ApiError>, Duration);

    #[derive(Default)]
    struct FakeApi {
        fetches: AtomicUsize,
        puts: AtomicUsize,
        fetch_script: Mutex<VecDeque<Scripted>>,
        put_script: Mutex<VecDeque<Result<(), ApiError>>>,
        stored: Mutex<Option<String>>,
        panic_fetches: AtomicBool,
        panic_puts: AtomicBool,
    }

    impl FakeApi {
        fn script_fetch(&self, value: Result<RemoteVariable, ApiError>, delay: Duration) {
            self.fetch_script.lock().unwrap().push_back((value, delay));
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn puts(&self) -> usize {
            self.puts.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl VariableApi for FakeApi {
        async fn fetch_variable(&self, config: &Configuration) -> Result<RemoteVariable, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.panic_fetches.load(Ordering::SeqCst) {
                panic!("fetch task blew up");
            }
            let scripted = self.fetch_script.lock().unwrap().pop_front();
            match scripted {
                Some((result, delay)) => {
                    time::sleep(delay).await;
                    result
                }
                None => {
                    let stored = self.stored.lock().unwrap().clone().unwrap_or_else(|| "Hello".into());
                    Ok(variable(&config.variable_id, &stored))
                }
            }
        }

        async fn put_variable(&self, _config: &Configuration, new_value: &str) -> Result<(), ApiError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            if self.panic_puts.load(Ordering::SeqCst) {
                panic!("put task blew up");
            }
            let scripted = self.put_script.lock().unwrap().pop_front();
            let result = scripted.unwrap_or(Ok(()));
            if result.is_ok() {
                *self.stored.lock().unwrap() = Some(new_value.to_string());
            }
            result
        }
    }

    fn variable(id: &str, value: &str) -> RemoteVariable {
        RemoteVariable {
            id: id.into(),
            name: "Greeting".into(),
            default_value: value.into(),
            active: Some(true),
            last_updated_time: Some(1_700_000_000_000),
        }
    }

    fn source(can_edit: bool) -> ConfigSource {
        ConfigSource::new(
            InstanceProperties {
                bearer_token: Some("token".into()),
                organization_id: Some("org".into()),
                cad_var_id: Some("v1".into()),
                can_edit: Some(can_edit.to_string()),
                ..InstanceProperties::default()
            },
            Default::default(),
        )
    }

    fn driver(api: &Arc<FakeApi>, can_edit: bool) -> WidgetDriver<FakeApi> {
        WidgetDriver::new(Arc::clone(api), source(can_edit))
    }

    #[tokio::test(start_paused = true)]
    async fn activation_fetches_once_then_polls_every_period() {
        let api = Arc::new(FakeApi::default());
        let mut driver = driver(&api, false);

        driver.activate();
        assert!(driver.is_polling());
        driver.settle().await;
        assert_eq!(api.fetches(), 1);
        assert_eq!(driver.controller().state().status, WidgetStatus::UpToDate);

        let started = Instant::now();
        let msg = driver.next_message().await.expect("poll tick");
        assert!(matches!(msg, Msg::Tick));
        assert!(started.elapsed() >= POLL_INTERVAL && started.elapsed() < POLL_INTERVAL + Duration::from_secs(1));
        driver.dispatch(msg);
        driver.settle().await;
        assert_eq!(api.fetches(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_configuration_makes_no_calls_and_starts_no_poll() {
        let api = Arc::new(FakeApi::default());
        let mut config = source(false);
        config.properties.organization_id = None;
        let mut driver = WidgetDriver::new(Arc::clone(&api), config);

        driver.activate();
        assert!(!driver.is_polling());
        assert_eq!(driver.in_flight(), 0);
        assert!(driver.next_message().await.is_none());
        assert_eq!(api.fetches(), 0);
        assert_eq!(driver.controller().state().status, WidgetStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_fires_after_deactivation() {
        let api = Arc::new(FakeApi::default());
        let mut driver = driver(&api, false);
        driver.activate();
        driver.settle().await;
        let before = driver.controller().state().clone();

        driver.deactivate();
        assert!(!driver.is_polling());
        time::advance(POLL_INTERVAL * 3).await;
        assert!(driver.next_message().await.is_none());
        assert_eq!(api.fetches(), 1);
        assert_eq!(driver.controller().state(), &before);
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_completion_after_deactivation_is_discarded() {
        let api = Arc::new(FakeApi::default());
        api.script_fetch(Ok(variable("v1", "late")), Duration::from_secs(5));
        let mut driver = driver(&api, false);

        driver.activate();
        assert_eq!(driver.controller().state().status, WidgetStatus::Loading);
        driver.deactivate();
        driver.settle().await;

        assert_eq!(api.fetches(), 1);
        assert!(driver.controller().snapshot().is_none());
        assert_eq!(driver.controller().state().status, WidgetStatus::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_refresh_overlaps_without_resetting_the_period() {
        let api = Arc::new(FakeApi::default());
        let mut driver = driver(&api, false);
        driver.activate();
        driver.settle().await;
        let activated_at = Instant::now();

        time::advance(Duration::from_secs(10)).await;
        api.script_fetch(Ok(variable("v1", "slow")), Duration::from_secs(4));
        api.script_fetch(Ok(variable("v1", "fast")), Duration::from_secs(1));
        driver.refresh().unwrap();
        driver.refresh().unwrap();
        assert_eq!(driver.in_flight(), 2);
        driver.settle().await;
        assert_eq!(api.fetches(), 3);
        assert_eq!(driver.controller().snapshot().unwrap().default_value, "fast");

        let msg = driver.next_message().await.expect("poll tick");
        assert!(matches!(msg, Msg::Tick));
        let elapsed = activated_at.elapsed();
        assert!(elapsed >= POLL_INTERVAL && elapsed < POLL_INTERVAL + Duration::from_secs(1), "{elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_previous_value() {
        let api = Arc::new(FakeApi::default());
        let mut driver = driver(&api, false);
        driver.activate();
        driver.settle().await;

        api.script_fetch(Err(ApiError::remote(404, "Not Found", None)), Duration::ZERO);
        driver.refresh().unwrap();
        driver.settle().await;

        let state = driver.controller().state();
        assert_eq!(state.status, WidgetStatus::Error);
        assert!(state.last_error.as_deref().unwrap().contains("404"));
        assert_eq!(driver.controller().snapshot().unwrap().default_value, "Hello");
    }

    #[tokio::test(start_paused = true)]
    async fn save_is_followed_by_exactly_one_reconcile_fetch() {
        let api = Arc::new(FakeApi::default());
        let mut driver = driver(&api, true);
        driver.activate();
        driver.settle().await;
        assert_eq!(api.fetches(), 1);

        driver.toggle_edit().unwrap();
        driver.save("New message").unwrap();
        assert_eq!(driver.save("twice"), Err(WidgetError::SaveInProgress));
        driver.settle().await;

        assert_eq!(api.puts(), 1);
        assert_eq!(api.fetches(), 2);
        assert_eq!(driver.controller().snapshot().unwrap().default_value, "New message");
        assert_eq!(driver.controller().state().status, WidgetStatus::UpToDate);
        assert!(!driver.controller().state().edit_open);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_save_makes_no_network_call() {
        let api = Arc::new(FakeApi::default());
        let mut driver = driver(&api, true);
        driver.activate();
        driver.settle().await;
        driver.toggle_edit().unwrap();

        assert!(matches!(driver.save("   "), Err(WidgetError::Validation(_))));
        assert!(matches!(driver.save(""), Err(WidgetError::Validation(_))));
        assert_eq!(driver.in_flight(), 0);
        assert_eq!(api.puts(), 0);
        assert_eq!(api.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn panicked_save_task_fails_the_save_and_allows_a_retry() {
        let api = Arc::new(FakeApi::default());
        let mut driver = driver(&api, true);
        driver.activate();
        driver.settle().await;
        driver.toggle_edit().unwrap();

        api.panic_puts.store(true, Ordering::SeqCst);
        driver.save("New message").unwrap();
        driver.settle().await;

        let state = driver.controller().state();
        assert_eq!(state.status, WidgetStatus::Error);
        assert!(state.last_error.as_deref().unwrap().starts_with("Save failed:"));
        assert!(state.edit_open);
        assert!(!driver.controller().is_saving());

        api.panic_puts.store(false, Ordering::SeqCst);
        driver.save("New message").unwrap();
        driver.settle().await;
        assert_eq!(api.puts(), 2);
        assert_eq!(driver.controller().state().status, WidgetStatus::UpToDate);
        assert_eq!(driver.controller().snapshot().unwrap().default_value, "New message");
    }

    #[tokio::test(start_paused = true)]
    async fn panicked_fetch_task_surfaces_an_error() {
        let api = Arc::new(FakeApi::default());
        let mut driver = driver(&api, false);
        driver.activate();
        driver.settle().await;

        api.panic_fetches.store(true, Ordering::SeqCst);
        driver.refresh().unwrap();
        assert_eq!(driver.controller().state().status, WidgetStatus::Refreshing);
        driver.settle().await;

        let state = driver.controller().state();
        assert_eq!(state.status, WidgetStatus::Error);
        assert!(state.last_error.as_deref().unwrap().starts_with("Error:"));
        assert_eq!(driver.controller().snapshot().unwrap().default_value, "Hello");
    }
}
