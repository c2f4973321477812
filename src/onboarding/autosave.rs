//! Auto-save controller — debounced, de-duplicated, single-flight persistence
//! of in-memory form state.
//!
//! Each controller owns one background task. Snapshots are fed in through an
//! ordered channel; the task restarts the quiet-period timer on every
//! snapshot and saves only the last one. Saves are awaited inside the task,
//! so a controller never has two saves in flight. Snapshots that arrive
//! during a save queue up and are debounced once it finishes.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep, sleep_until};
use tracing::{debug, info, warn};

use crate::config::AutoSaveConfig;
use crate::error::OnboardingError;

/// Broadcast capacity for save events.
const EVENT_CAPACITY: usize = 32;

/// Shown to the user when a save could not be completed.
pub const SAVE_FAILED_MESSAGE: &str =
    "Your changes could not be saved automatically. Please save manually.";

/// Where snapshots are persisted.
#[async_trait]
pub trait SaveTarget<T: Sync>: Send + Sync {
    async fn save(&self, data: &T) -> Result<(), OnboardingError>;
}

/// Current state of a controller, for status indicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SaveStatus {
    /// Nothing edited since the initial load.
    Idle,
    /// Unsaved edits are waiting for the quiet period to elapse.
    Pending,
    Saving,
    Saved { at: DateTime<Utc> },
    /// The last save failed; the edits are still pending.
    Failed { error: String, attempts: u32 },
}

/// Non-blocking notifications emitted by a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoSaveEvent {
    Saved { attempts: u32 },
    /// One attempt failed. `will_retry` is false when this was the last one.
    Failed {
        attempt: u32,
        error: String,
        will_retry: bool,
    },
    /// Every attempt allowed by the retry policy failed.
    RetriesExhausted { attempts: u32, error: String },
}

impl AutoSaveEvent {
    /// Message to surface to the user, if any. Successful saves are silent.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Saved { .. } => None,
            Self::Failed { will_retry, .. } => (!will_retry).then_some(SAVE_FAILED_MESSAGE),
            Self::RetriesExhausted { .. } => Some(SAVE_FAILED_MESSAGE),
        }
    }
}

/// Result of a save cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Pending data matched the last saved snapshot.
    Unchanged,
    NothingPending,
    /// Auto-save is disabled and the cycle was not a manual flush.
    Disabled,
    Failed(String),
}

enum Command<T> {
    Update(T),
    Flush(oneshot::Sender<SaveOutcome>),
    SetEnabled(bool),
}

/// Handle to a running auto-save controller.
///
/// Dropping the handle cancels any pending debounce without saving.
pub struct AutoSave<T> {
    tx: mpsc::UnboundedSender<Command<T>>,
    status: watch::Receiver<SaveStatus>,
    events: broadcast::Sender<AutoSaveEvent>,
    task: JoinHandle<()>,
}

impl<T> AutoSave<T>
where
    T: Serialize + Send + Sync + 'static,
{
    /// Start a controller persisting through `target`.
    ///
    /// The first snapshot passed to [`update`](Self::update) is treated as the
    /// initial load: it becomes the comparison baseline and is never saved.
    pub fn spawn(target: Arc<dyn SaveTarget<T>>, config: AutoSaveConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SaveStatus::Idle);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let worker = Worker {
            rx,
            target,
            config,
            baseline_received: false,
            last_saved: None,
            last_saved_at: None,
            pending: None,
            deadline: None,
            status: status_tx,
            events: events.clone(),
        };
        let task = tokio::spawn(worker.run());

        Self {
            tx,
            status: status_rx,
            events,
            task,
        }
    }

    /// Feed the latest form snapshot.
    pub fn update(&self, data: T) {
        if self.tx.send(Command::Update(data)).is_err() {
            debug!("Auto-save controller stopped, dropping snapshot");
        }
    }

    /// Save pending edits now, skipping the quiet period.
    ///
    /// Works even while auto-save is disabled.
    pub async fn flush(&self) -> SaveOutcome {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(reply_tx)).is_err() {
            return SaveOutcome::NothingPending;
        }
        reply_rx.await.unwrap_or(SaveOutcome::NothingPending)
    }

    pub fn set_enabled(&self, enabled: bool) {
        let _ = self.tx.send(Command::SetEnabled(enabled));
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AutoSaveEvent> {
        self.events.subscribe()
    }

    /// Stop the controller and wait for its task to exit.
    ///
    /// A save already in flight runs to completion; a pending debounce is
    /// discarded.
    pub async fn shutdown(self) {
        let Self { tx, task, .. } = self;
        drop(tx);
        if let Err(e) = task.await {
            warn!(error = %e, "Auto-save task ended abnormally");
        }
    }
}

struct Worker<T: Sync> {
    rx: mpsc::UnboundedReceiver<Command<T>>,
    target: Arc<dyn SaveTarget<T>>,
    config: AutoSaveConfig,
    baseline_received: bool,
    /// Serialized form of the last snapshot known to be persisted.
    last_saved: Option<serde_json::Value>,
    last_saved_at: Option<DateTime<Utc>>,
    pending: Option<T>,
    deadline: Option<Instant>,
    status: watch::Sender<SaveStatus>,
    events: broadcast::Sender<AutoSaveEvent>,
}

impl<T> Worker<T>
where
    T: Serialize + Send + Sync + 'static,
{
    async fn run(mut self) {
        loop {
            let deadline = self.deadline;
            tokio::select! {
                biased;
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd).await,
                    None => {
                        if self.pending.is_some() {
                            debug!("Auto-save cancelled with unsaved edits pending");
                        }
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.deadline = None;
                    self.save_pending(false).await;
                }
            }
        }
    }

    async fn handle(&mut self, cmd: Command<T>) {
        match cmd {
            Command::Update(data) => {
                if !self.baseline_received {
                    self.baseline_received = true;
                    self.last_saved = serde_json::to_value(&data).ok();
                    debug!("Auto-save baseline recorded");
                    return;
                }
                self.pending = Some(data);
                self.status.send_replace(SaveStatus::Pending);
                if self.config.enabled {
                    self.deadline = Some(Instant::now() + self.config.quiet_period);
                }
            }
            Command::Flush(reply) => {
                self.deadline = None;
                let outcome = self.save_pending(true).await;
                let _ = reply.send(outcome);
            }
            Command::SetEnabled(enabled) => {
                self.config.enabled = enabled;
                self.deadline = match (enabled, self.pending.is_some()) {
                    (true, true) => Some(Instant::now() + self.config.quiet_period),
                    _ => None,
                };
            }
        }
    }

    async fn save_pending(&mut self, manual: bool) -> SaveOutcome {
        if !manual && !self.config.enabled {
            return SaveOutcome::Disabled;
        }
        let Some(data) = self.pending.take() else {
            return SaveOutcome::NothingPending;
        };

        let snapshot = match serde_json::to_value(&data) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Failed to serialize auto-save snapshot");
                self.pending = Some(data);
                return self.fail(1, e.to_string(), false);
            }
        };

        if self.last_saved.as_ref() == Some(&snapshot) {
            debug!("Snapshot unchanged since last save, skipping");
            let status = match self.last_saved_at {
                Some(at) => SaveStatus::Saved { at },
                None => SaveStatus::Idle,
            };
            self.status.send_replace(status);
            return SaveOutcome::Unchanged;
        }

        self.status.send_replace(SaveStatus::Saving);
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match self.target.save(&data).await {
                Ok(()) => {
                    debug!(attempts = attempt, manual, "Auto-save succeeded");
                    let at = Utc::now();
                    self.last_saved = Some(snapshot);
                    self.last_saved_at = Some(at);
                    self.status.send_replace(SaveStatus::Saved { at });
                    let _ = self.events.send(AutoSaveEvent::Saved { attempts: attempt });
                    return SaveOutcome::Saved;
                }
                Err(e) => {
                    let will_retry = e.is_transient() && attempt < max_attempts;
                    warn!(attempt, will_retry, error = %e, "Auto-save attempt failed");
                    let _ = self.events.send(AutoSaveEvent::Failed {
                        attempt,
                        error: e.to_string(),
                        will_retry,
                    });

                    if will_retry {
                        sleep(self.config.retry.backoff_after(attempt)).await;
                        continue;
                    }

                    // Keep the edits so the next cycle saves them again
                    self.pending = Some(data);
                    let exhausted = e.is_transient() && attempt >= max_attempts && max_attempts > 1;
                    return self.fail(attempt, e.to_string(), exhausted);
                }
            }
        }
    }

    fn fail(&mut self, attempts: u32, error: String, exhausted: bool) -> SaveOutcome {
        if exhausted {
            info!(attempts, "Auto-save retries exhausted");
            let _ = self.events.send(AutoSaveEvent::RetriesExhausted {
                attempts,
                error: error.clone(),
            });
        }
        self.status.send_replace(SaveStatus::Failed {
            error: error.clone(),
            attempts,
        });
        SaveOutcome::Failed(error)
    }
}
