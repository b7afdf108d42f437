//! Step Timeline Engine
//!
//! Turns an ordered list of step ids into a schedule of status transitions
//! and runs that schedule as independent tokio tasks.
//!
//! Step at position `i` activates at `i × stagger` and completes at
//! `i × stagger + hold`, both measured from timeline start. Steps do not wait
//! for each other, so with the default timing (1800 ms stagger, 1200 ms hold)
//! a step is still finishing while the next one is already scheduled. The
//! result is a cascading wave rather than a strict one-at-a-time sequence.
//!
//! The scheduler never touches session state. Each task sleeps until its
//! deadline and sends a pre-built event down a channel; the controller
//! decides whether the event still belongs to the live cycle.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Delays that shape one search cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimelineTiming {
    /// Offset between consecutive step activations
    pub step_stagger: Duration,
    /// How long a step stays active before completing
    pub activate_hold: Duration,
    /// Pause between the terminal step completing and the reveal
    pub reveal_delay: Duration,
    /// Minimum time before `loading` clears
    pub settle_delay: Duration,
}

impl Default for TimelineTiming {
    fn default() -> Self {
        Self {
            step_stagger: Duration::from_millis(1800),
            activate_hold: Duration::from_millis(1200),
            reveal_delay: Duration::from_millis(500),
            settle_delay: Duration::from_millis(10_000),
        }
    }
}

impl TimelineTiming {
    /// How long after timeline start `loading` clears for a plan
    ///
    /// Never earlier than the settle delay, and never before the last
    /// transition plus the reveal delay has had a chance to run.
    #[must_use]
    pub fn settle_after(&self, plan: &TimelinePlan) -> Duration {
        if plan.is_empty() {
            return self.settle_delay;
        }
        self.settle_delay
            .max(plan.span().saturating_add(self.reveal_delay))
    }
}

/// Which way a step moves
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionKind {
    /// Pending to active
    Activate,
    /// Active to completed
    Complete,
}

/// One scheduled status change
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    /// Position of the step in the received order
    pub position: usize,
    /// Server-assigned id the transition targets
    pub step_id: u32,
    /// Activate or complete
    pub kind: TransitionKind,
    /// Offset from timeline start
    pub offset: Duration,
}

/// The full transition schedule for one received step list
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimelinePlan {
    transitions: Vec<Transition>,
}

impl TimelinePlan {
    /// Build the schedule for steps in received order
    #[must_use]
    pub fn for_steps(step_ids: &[u32], timing: &TimelineTiming) -> Self {
        let mut transitions = Vec::with_capacity(step_ids.len() * 2);
        for (position, &step_id) in step_ids.iter().enumerate() {
            let factor = u32::try_from(position).unwrap_or(u32::MAX);
            let activate_at = timing.step_stagger.saturating_mul(factor);
            transitions.push(Transition {
                position,
                step_id,
                kind: TransitionKind::Activate,
                offset: activate_at,
            });
            transitions.push(Transition {
                position,
                step_id,
                kind: TransitionKind::Complete,
                offset: activate_at.saturating_add(timing.activate_hold),
            });
        }
        transitions.sort_by_key(|t| t.offset);
        Self { transitions }
    }

    /// Transitions ordered by offset
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Offset of the latest transition (zero for an empty plan)
    #[must_use]
    pub fn span(&self) -> Duration {
        self.transitions
            .iter()
            .map(|t| t.offset)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Whether nothing is scheduled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Number of transitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }
}

/// Identity of a scheduled task
///
/// Transitions are keyed by position rather than id so that a response with
/// duplicate ids still gets one cancellable task per step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKey {
    /// Step-definition fetch or its fallback
    Fetch,
    /// A step transition
    Transition(usize, TransitionKind),
    /// The delayed reveal after the terminal step
    Reveal,
    /// The settle timer that clears `loading`
    Settle,
}

/// Owns the spawned tasks of the live cycle
///
/// Dropping the scheduler aborts everything it still holds.
#[derive(Debug)]
pub struct TimelineScheduler<E> {
    tx: mpsc::UnboundedSender<E>,
    tasks: HashMap<TaskKey, JoinHandle<()>>,
}

impl<E: Send + 'static> TimelineScheduler<E> {
    /// Create a scheduler delivering events on `tx`
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<E>) -> Self {
        Self {
            tx,
            tasks: HashMap::new(),
        }
    }

    /// Sender tasks use to report back
    #[must_use]
    pub fn sender(&self) -> mpsc::UnboundedSender<E> {
        self.tx.clone()
    }

    /// Spawn an arbitrary task under `key`, aborting any previous holder
    pub fn spawn<F>(&mut self, key: TaskKey, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Some(previous) = self.tasks.insert(key, tokio::spawn(task)) {
            previous.abort();
        }
    }

    /// Deliver `event` at `deadline`
    pub fn schedule_at(&mut self, key: TaskKey, deadline: Instant, event: E) {
        let tx = self.tx.clone();
        self.spawn(key, async move {
            tokio::time::sleep_until(deadline).await;
            // Receiver gone means the controller was dropped
            let _ = tx.send(event);
        });
    }

    /// Schedule every transition of `plan` relative to `start`
    pub fn schedule_plan<F>(&mut self, plan: &TimelinePlan, start: Instant, mut make_event: F)
    where
        F: FnMut(&Transition) -> E,
    {
        for transition in plan.transitions() {
            let event = make_event(transition);
            self.schedule_at(
                TaskKey::Transition(transition.position, transition.kind),
                start + transition.offset,
                event,
            );
        }
        tracing::debug!(
            transitions = plan.len(),
            span_ms = plan.span().as_millis() as u64,
            "Timeline scheduled"
        );
    }

    /// Abort every task, returning how many were still running
    pub fn cancel_all(&mut self) -> usize {
        let mut aborted = 0;
        for (_, handle) in self.tasks.drain() {
            if !handle.is_finished() {
                aborted += 1;
            }
            handle.abort();
        }
        if aborted > 0 {
            tracing::debug!(aborted, "Cancelled outstanding cycle tasks");
        }
        aborted
    }

    /// Whether any task has yet to finish
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.tasks.values().any(|h| !h.is_finished())
    }

    /// Number of tasks that have yet to finish
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.values().filter(|h| !h.is_finished()).count()
    }

    /// Drop handles of tasks that already ran to completion
    pub fn prune_finished(&mut self) {
        self.tasks.retain(|_, h| !h.is_finished());
    }
}

impl<E> Drop for TimelineScheduler<E> {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.drain() {
            handle.abort();
        }
    }
}
