//! Search Controller - The Orchestration Core
//!
//! Owns the live session and runs one search cycle at a time:
//! - picture catalog and example queries, loaded once at startup
//! - query submission and the step-definition fetch
//! - the `/agent` fallback when step definitions are unavailable
//! - the step timeline, the reveal gate and the settle timer
//!
//! # Design Philosophy
//!
//! The controller is surface-agnostic. It talks to surfaces through:
//! - `SearchMessage`: notifications sent TO the surface
//! - `SurfaceEvent`: user actions received FROM the surface
//!
//! It is also the only writer of [`SessionState`]. Network calls and timers
//! run as spawned tasks that never see the session; they report back as
//! cycle events stamped with the [`CycleToken`] they were spawned for, and
//! [`SearchController::poll`] applies an event only while its token is still
//! live. A timer that fires after a reset or a newer submit is dropped.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::catalog::PictureCatalog;
use crate::config::SearchConfig;
use crate::error::{ClassificationError, FetchError};
use crate::events::SurfaceEvent;
use crate::messages::SearchMessage;
use crate::reveal::{self, TerminalStep};
use crate::service::{AnalysisService, ExampleQueries, SearchResult, StepDefinitions};
use crate::session::{CycleToken, ProcessStep, SessionState, StepStatus};
use crate::timeline::{TaskKey, TimelinePlan, TimelineScheduler, TimelineTiming, TransitionKind};

/// Controller configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Timeline delays
    pub timing: TimelineTiming,
    /// Which step triggers the reveal
    pub terminal_step: TerminalStep,
}

impl From<&SearchConfig> for ControllerConfig {
    fn from(config: &SearchConfig) -> Self {
        Self {
            timing: config.timing,
            terminal_step: config.terminal_step,
        }
    }
}

/// Why a submit did not start a cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Query is empty after trimming
    EmptyQuery,
    /// A cycle is still loading
    Loading,
}

impl std::fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyQuery => write!(f, "query is empty"),
            Self::Loading => write!(f, "a search is already running"),
        }
    }
}

/// Result of [`SearchController::submit`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// A new cycle started
    Started(CycleToken),
    /// Nothing happened
    Ignored(IgnoreReason),
}

impl SubmitOutcome {
    /// Whether a cycle started
    #[must_use]
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Started(_))
    }
}

/// Reports from spawned tasks back to the controller
#[derive(Debug)]
enum CycleEvent {
    StepsFetched {
        token: CycleToken,
        result: Result<StepDefinitions, FetchError>,
    },
    Classified {
        token: CycleToken,
        result: Result<SearchResult, ClassificationError>,
    },
    Transition {
        token: CycleToken,
        step_id: u32,
        kind: TransitionKind,
        due: Instant,
    },
    Reveal {
        token: CycleToken,
    },
    Settle {
        token: CycleToken,
    },
}

impl CycleEvent {
    fn token(&self) -> CycleToken {
        match self {
            Self::StepsFetched { token, .. }
            | Self::Classified { token, .. }
            | Self::Transition { token, .. }
            | Self::Reveal { token }
            | Self::Settle { token } => *token,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::StepsFetched { .. } => "steps_fetched",
            Self::Classified { .. } => "classified",
            Self::Transition { .. } => "transition",
            Self::Reveal { .. } => "reveal",
            Self::Settle { .. } => "settle",
        }
    }
}

/// The controller - headless search orchestration
pub struct SearchController<S: AnalysisService> {
    /// Configuration
    config: ControllerConfig,
    /// Analysis service
    service: Arc<S>,
    /// Picture catalog (read-only after load)
    catalog: PictureCatalog,
    /// Example queries offered to the user
    examples: Vec<String>,
    /// The live session
    session: SessionState,
    /// Terminal step id resolved for the live cycle
    terminal_id: Option<u32>,
    /// Channel to send messages to the surface
    tx: mpsc::UnboundedSender<SearchMessage>,
    /// Reports from spawned tasks
    events_rx: mpsc::UnboundedReceiver<CycleEvent>,
    /// Spawned tasks of the live cycle
    scheduler: TimelineScheduler<CycleEvent>,
}

impl<S: AnalysisService + 'static> SearchController<S> {
    /// Create a new controller with the given service
    pub fn new(
        service: S,
        config: ControllerConfig,
        tx: mpsc::UnboundedSender<SearchMessage>,
    ) -> Self {
        Self::from_shared(Arc::new(service), config, tx)
    }

    /// Create a controller around a service that is shared elsewhere
    pub fn from_shared(
        service: Arc<S>,
        config: ControllerConfig,
        tx: mpsc::UnboundedSender<SearchMessage>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            service,
            catalog: PictureCatalog::new(),
            examples: ExampleQueries::builtin().photo_agent,
            session: SessionState::new(),
            terminal_id: None,
            tx,
            events_rx,
            scheduler: TimelineScheduler::new(events_tx),
        }
    }

    /// Current session snapshot
    #[must_use]
    pub fn session(&self) -> &SessionState {
        &self.session
    }

    /// Picture catalog
    #[must_use]
    pub fn catalog(&self) -> &PictureCatalog {
        &self.catalog
    }

    /// Example queries
    #[must_use]
    pub fn examples(&self) -> &[String] {
        &self.examples
    }

    /// Configuration
    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Shared handle to the service, e.g. for image fetches
    #[must_use]
    pub fn service(&self) -> Arc<S> {
        Arc::clone(&self.service)
    }

    /// Whether a cycle is loading
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.session.loading
    }

    /// Number of spawned tasks that have not finished
    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending()
    }

    /// Load the catalog and example queries
    ///
    /// Failures degrade (empty catalog, built-in examples) and are logged;
    /// nothing here is fatal. The catalog is only fetched once.
    pub async fn start(&mut self) {
        if !self.catalog.is_loaded() {
            // Errors are already logged by the catalog
            let _ = self.catalog.load(self.service.as_ref()).await;
            self.send(SearchMessage::CatalogLoaded {
                count: self.catalog.len(),
            });
        }

        match self.service.examples().await {
            Ok(examples) if !examples.photo_agent.is_empty() => {
                self.examples = examples.photo_agent;
            }
            Ok(_) => {
                tracing::debug!("Service sent no examples, keeping built-in list");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Example queries unavailable, using built-in list");
            }
        }
        self.send(SearchMessage::ExamplesLoaded {
            count: self.examples.len(),
        });

        tracing::info!(
            service = self.service.name(),
            origin = self.service.origin(),
            pictures = self.catalog.len(),
            "Search controller started"
        );
    }

    /// Replace the query text
    ///
    /// Ignored while a cycle is loading. Returns whether the text changed.
    pub fn set_query(&mut self, text: impl Into<String>) -> bool {
        if self.session.loading {
            tracing::debug!("Ignoring query edit while loading");
            return false;
        }
        self.session.query = text.into();
        true
    }

    /// Put the example at `index` into the query
    ///
    /// Same loading rule as [`Self::set_query`]; out-of-range indices are
    /// ignored.
    pub fn select_example(&mut self, index: usize) -> bool {
        match self.examples.get(index).cloned() {
            Some(example) => self.set_query(example),
            None => {
                tracing::debug!(index, "No example at index");
                false
            }
        }
    }

    /// Start a search cycle for the current query
    ///
    /// Ignored when the query is blank or a cycle is already loading, with
    /// no fetch and no timers.
    pub fn submit(&mut self) -> SubmitOutcome {
        if self.session.loading {
            tracing::debug!("Submit ignored: already loading");
            return SubmitOutcome::Ignored(IgnoreReason::Loading);
        }
        let query = self.session.query.trim().to_string();
        if query.is_empty() {
            tracing::debug!("Submit ignored: empty query");
            return SubmitOutcome::Ignored(IgnoreReason::EmptyQuery);
        }

        self.scheduler.cancel_all();
        self.session.clear_cycle_output();
        self.session.loading = true;
        self.session.cycle = self.session.cycle.next();
        self.session.cycle_started_at = Some(Utc::now());
        self.terminal_id = None;

        let token = self.session.cycle;
        let service = Arc::clone(&self.service);
        let events = self.scheduler.sender();
        let text = query.clone();
        self.scheduler.spawn(TaskKey::Fetch, async move {
            let result = service.process_steps(&text).await;
            let _ = events.send(CycleEvent::StepsFetched { token, result });
        });

        tracing::info!(cycle = %token, query = %query, "Search cycle started");
        self.send(SearchMessage::CycleStarted {
            cycle: token,
            query,
        });

        SubmitOutcome::Started(token)
    }

    /// Return to the initial state
    ///
    /// Unconditional: clears query, result, steps, pictures and both flags,
    /// and aborts every outstanding task. The catalog is kept.
    pub fn reset(&mut self) {
        let aborted = self.scheduler.cancel_all();
        while self.events_rx.try_recv().is_ok() {}

        let cycle = self.session.cycle.next();
        self.session = SessionState {
            cycle,
            ..SessionState::default()
        };
        self.terminal_id = None;

        tracing::info!(cycle = %cycle, aborted, "Session reset");
        self.send(SearchMessage::Reset { cycle });
    }

    /// Apply every cycle event that has already arrived
    ///
    /// Call this regularly from the surface loop. Returns true if the
    /// session changed.
    pub fn poll(&mut self) -> bool {
        let mut events = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            events.push(event);
        }

        let mut changed = false;
        for event in events {
            changed |= self.apply(event);
        }
        changed
    }

    /// Wait for the next cycle event and apply it
    ///
    /// Returns false without waiting when no task is outstanding, so a
    /// caller can loop on this until the cycle has fully played out.
    pub async fn wait_event(&mut self) -> bool {
        // Checked before draining so a task that finishes in between has
        // already queued its event
        let pending = self.scheduler.has_pending();
        match self.events_rx.try_recv() {
            Ok(event) => {
                self.apply(event);
                return true;
            }
            Err(_) if !pending => return false,
            Err(_) => {}
        }

        match self.events_rx.recv().await {
            Some(event) => {
                self.apply(event);
                true
            }
            None => false,
        }
    }

    /// Process events until no task is left
    pub async fn run_until_idle(&mut self) {
        while self.wait_event().await {}
    }

    /// Handle an event from the surface
    ///
    /// Returns false when the surface asked to quit.
    pub fn handle_event(&mut self, event: SurfaceEvent) -> bool {
        match event {
            SurfaceEvent::QueryChanged { text } => {
                self.set_query(text);
            }
            SurfaceEvent::ExampleSelected { index } => {
                self.select_example(index);
            }
            SurfaceEvent::Submit => {
                if let SubmitOutcome::Ignored(reason) = self.submit() {
                    tracing::debug!(%reason, "Submit from surface ignored");
                }
            }
            SurfaceEvent::Reset => self.reset(),
            SurfaceEvent::QuitRequested => {
                self.shutdown();
                return false;
            }
        }
        true
    }

    /// Abort everything outstanding
    pub fn shutdown(&mut self) {
        let aborted = self.scheduler.cancel_all();
        tracing::info!(aborted, "Search controller shut down");
    }

    fn apply(&mut self, event: CycleEvent) -> bool {
        let token = event.token();
        if token != self.session.cycle {
            tracing::debug!(
                event = event.label(),
                event_cycle = %token,
                live_cycle = %self.session.cycle,
                "Dropping stale cycle event"
            );
            return false;
        }

        match event {
            CycleEvent::StepsFetched { result, .. } => match result {
                Ok(definitions) => self.start_timeline(token, definitions),
                Err(e) => self.start_fallback(token, &e),
            },
            CycleEvent::Classified { result, .. } => match result {
                Ok(result) => self.finish_fallback(token, result),
                Err(e) => self.fail_cycle(token, &e),
            },
            CycleEvent::Transition {
                step_id, kind, due, ..
            } => {
                return self.apply_transition(token, step_id, kind, due);
            }
            CycleEvent::Reveal { .. } => self.reveal(token),
            CycleEvent::Settle { .. } => {
                self.session.loading = false;
                self.scheduler.prune_finished();
                tracing::info!(
                    cycle = %token,
                    completed = self.session.search_completed,
                    "Search cycle settled"
                );
                self.send(SearchMessage::Settled { cycle: token });
            }
        }
        true
    }

    fn start_timeline(&mut self, token: CycleToken, definitions: StepDefinitions) {
        let ids: Vec<u32> = definitions.steps.iter().map(|s| s.id).collect();
        let timing = self.config.timing;

        self.session.steps = definitions
            .steps
            .into_iter()
            .map(ProcessStep::from)
            .collect();
        self.session.result = Some(definitions.final_result);
        self.terminal_id = self.config.terminal_step.resolve(&ids);

        if let Some(id) = self.terminal_id {
            if !ids.contains(&id) {
                tracing::debug!(
                    cycle = %token,
                    terminal_step = id,
                    "Terminal step not in response, reveal will not fire"
                );
            }
        }

        let plan = TimelinePlan::for_steps(&ids, &timing);
        let start = Instant::now();
        self.scheduler.schedule_plan(&plan, start, |t| CycleEvent::Transition {
            token,
            step_id: t.step_id,
            kind: t.kind,
            due: start + t.offset,
        });
        self.scheduler.schedule_at(
            TaskKey::Settle,
            start + timing.settle_after(&plan),
            CycleEvent::Settle { token },
        );

        tracing::debug!(cycle = %token, steps = ids.len(), "Step definitions received");
        self.send(SearchMessage::StepsReceived {
            cycle: token,
            count: ids.len(),
        });
    }

    fn start_fallback(&mut self, token: CycleToken, error: &FetchError) {
        tracing::warn!(
            cycle = %token,
            error = %error,
            "Step definitions unavailable, falling back to one-shot classification"
        );

        let service = Arc::clone(&self.service);
        let events = self.scheduler.sender();
        let text = self.session.query.trim().to_string();
        self.scheduler.spawn(TaskKey::Fetch, async move {
            let result = service
                .classify(&text)
                .await
                .map_err(ClassificationError::from);
            let _ = events.send(CycleEvent::Classified { token, result });
        });
    }

    fn finish_fallback(&mut self, token: CycleToken, result: SearchResult) {
        self.session.steps.clear();
        self.session.result = Some(result);
        self.scheduler.schedule_at(
            TaskKey::Settle,
            Instant::now() + self.config.timing.settle_delay,
            CycleEvent::Settle { token },
        );

        self.send(SearchMessage::FallbackUsed { cycle: token });
        self.reveal(token);
    }

    fn fail_cycle(&mut self, token: CycleToken, error: &ClassificationError) {
        tracing::warn!(cycle = %token, error = %error, "Search cycle failed");
        self.scheduler.cancel_all();
        self.session.clear_cycle_output();
        self.session.loading = false;
        self.send(SearchMessage::CycleFailed {
            cycle: token,
            reason: error.to_string(),
        });
    }

    fn apply_transition(
        &mut self,
        token: CycleToken,
        step_id: u32,
        kind: TransitionKind,
        due: Instant,
    ) -> bool {
        let status = match kind {
            TransitionKind::Activate => StepStatus::Active,
            TransitionKind::Complete => StepStatus::Completed,
        };
        if self.session.set_step_status(step_id, status) == 0 {
            tracing::debug!(cycle = %token, step_id, "Transition for unknown step ignored");
            return false;
        }
        tracing::debug!(cycle = %token, step_id, ?kind, "Step transition");

        match kind {
            TransitionKind::Activate => {
                self.send(SearchMessage::StepActivated {
                    cycle: token,
                    step_id,
                });
            }
            TransitionKind::Complete => {
                if self.terminal_id == Some(step_id) {
                    // Measured from the scheduled completion so a slow poll
                    // does not push the reveal back
                    self.scheduler.schedule_at(
                        TaskKey::Reveal,
                        due + self.config.timing.reveal_delay,
                        CycleEvent::Reveal { token },
                    );
                }
                self.send(SearchMessage::StepCompleted {
                    cycle: token,
                    step_id,
                });
            }
        }
        true
    }

    fn reveal(&mut self, token: CycleToken) {
        let Some(ref result) = self.session.result else {
            tracing::debug!(cycle = %token, "Reveal without a result ignored");
            return;
        };
        let revealed = reveal::select(&self.catalog, result);
        let count = revealed.pictures.len();
        let is_photo_search = revealed.is_photo_search;

        self.session.pictures = revealed.pictures;
        self.session.search_completed = true;

        tracing::info!(cycle = %token, count, is_photo_search, "Results revealed");
        self.send(SearchMessage::Revealed {
            cycle: token,
            count,
            is_photo_search,
        });
    }

    /// Queue a message for the surface
    ///
    /// Never waits: the surface drains on its own schedule, often after a
    /// whole batch of events has been applied.
    fn send(&self, msg: SearchMessage) {
        if let Err(e) = self.tx.send(msg) {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}

impl<S: AnalysisService> std::fmt::Debug for SearchController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchController")
            .field("service", &self.service.name())
            .field("config", &self.config)
            .field("cycle", &self.session.cycle)
            .field("loading", &self.session.loading)
            .field("catalog", &self.catalog.len())
            .finish_non_exhaustive()
    }
}
