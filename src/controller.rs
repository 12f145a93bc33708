//! Reconciling list controller.
//!
//! Owns the application list of the selected environment together with the
//! set of names whose deletion was requested but that the list still shows.
//! While that set is non-empty a poll timer re-reads the list; each read drops
//! the names that disappeared, and the timer stops once nothing is left.
//!
//! All state lives in the task running [`Controller::run`]. Fetches and
//! deletes run in spawned tasks and report back through a private channel;
//! presentation layers only see [`ControllerEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{FetchError, PreconditionError};
use crate::network::{ApplicationSummary, Environment};
use crate::pending::PendingRemovals;
use crate::source::{self, AppSource, DeleteResponse};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// What the presentation layer renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub env_name: Option<String>,
    /// `None` until the first list for the environment has arrived.
    pub applications: Option<Vec<ApplicationSummary>>,
    pub pending: Vec<String>,
    pub is_fetching: bool,
    pub polling: bool,
}

impl Snapshot {
    pub fn is_pending(&self, name: &str) -> bool {
        self.pending.iter().any(|p| p == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    State(Snapshot),
    Notice(Notice),
}

#[derive(Debug)]
pub enum ControllerCommand {
    Delete(String),
    Refresh,
    Shutdown,
}

enum Completion {
    Fetched {
        epoch: u64,
        result: Result<Vec<ApplicationSummary>, FetchError>,
    },
    Deleted {
        name: String,
        response: DeleteResponse,
    },
    Tick {
        timer: u64,
    },
}

/// Aborts the task when dropped.
struct TaskHandle(JoinHandle<()>);

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Repeating poll trigger. Ticks carry the timer id so ticks queued by a timer
/// that has since been dropped can be told apart.
struct PollTimer {
    id: u64,
    _task: TaskHandle,
}

impl PollTimer {
    fn start(id: u64, period: Duration, inbox: mpsc::UnboundedSender<Completion>) -> PollTimer {
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                if inbox.send(Completion::Tick { timer: id }).is_err() {
                    break;
                }
            }
        });
        PollTimer {
            id,
            _task: TaskHandle(task),
        }
    }
}

pub struct Controller {
    source: Arc<dyn AppSource>,
    events: mpsc::UnboundedSender<ControllerEvent>,
    inbox_tx: mpsc::UnboundedSender<Completion>,
    inbox_rx: mpsc::UnboundedReceiver<Completion>,
    poll_interval: Duration,

    env_name: Option<String>,
    /// Bumped on every significant environment change; fetch results from an
    /// older epoch are dropped.
    epoch: u64,
    collection: Option<Vec<ApplicationSummary>>,
    fetch: Option<TaskHandle>,
    pending: PendingRemovals,
    timer: Option<PollTimer>,
    timers_started: u64,
    dirty: bool,
}

impl Controller {
    pub fn new(
        source: Arc<dyn AppSource>,
        poll_interval: Duration,
        events: mpsc::UnboundedSender<ControllerEvent>,
    ) -> Controller {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Controller {
            source,
            events,
            inbox_tx,
            inbox_rx,
            poll_interval,
            env_name: None,
            epoch: 0,
            collection: None,
            fetch: None,
            pending: PendingRemovals::new(),
            timer: None,
            timers_started: 0,
            dirty: false,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            env_name: self.env_name.clone(),
            applications: self.collection.clone(),
            pending: self.pending.to_vec(),
            is_fetching: self.fetch.is_some(),
            polling: self.timer.is_some(),
        }
    }

    /// Runs until a `Shutdown` command arrives or the command channel closes.
    pub async fn run(
        mut self,
        mut environment: watch::Receiver<Option<Environment>>,
        mut commands: mpsc::Receiver<ControllerCommand>,
    ) {
        let initial = environment.borrow_and_update().clone();
        self.set_environment(initial.as_ref());

        let mut watching = true;
        loop {
            tokio::select! {
                changed = environment.changed(), if watching => {
                    if changed.is_err() {
                        // Provider gone; keep serving the last environment.
                        watching = false;
                        continue;
                    }
                    let env = environment.borrow_and_update().clone();
                    self.set_environment(env.as_ref());
                }
                cmd = commands.recv() => match cmd {
                    Some(ControllerCommand::Delete(name)) => {
                        if let Err(e) = self.request_delete(&name) {
                            warn!(app = %name, "delete refused: {}", e);
                            self.notify(Notice::error(e.to_string()));
                        }
                    }
                    Some(ControllerCommand::Refresh) => self.refresh(),
                    Some(ControllerCommand::Shutdown) | None => break,
                },
                Some(completion) = self.inbox_rx.recv() => self.handle(completion),
            }
        }

        self.shutdown();
    }

    /// Switches to `env`. Only the environment name is significant: the same
    /// name again is ignored once mounted.
    pub fn set_environment(&mut self, env: Option<&Environment>) {
        let name = env.map(|e| e.env_name.clone());
        if self.epoch > 0 && name == self.env_name {
            return;
        }

        self.epoch += 1;
        self.fetch = None;
        self.pending.clear();
        self.disarm_timer();
        self.env_name = name;
        self.collection = None;
        self.dirty = true;

        match self.env_name.clone() {
            Some(env) => {
                info!(env = %env, "environment selected");
                self.start_fetch(env);
            }
            None => {
                info!("no environment selected");
                self.collection = Some(Vec::new());
            }
        }
        self.publish();
    }

    /// Marks `name` as pending removal and fires the delete call. The name
    /// stays pending until a list without it arrives, whatever the delete
    /// call answers.
    pub fn request_delete(&mut self, name: &str) -> Result<(), PreconditionError> {
        let env = self.env_name.clone().ok_or(PreconditionError)?;

        if self.pending.insert(name) {
            self.dirty = true;
        }
        self.reconcile();

        info!(env = %env, app = %name, pending = self.pending.len(), "deleting application");
        let source = Arc::clone(&self.source);
        let inbox = self.inbox_tx.clone();
        let name = name.to_string();
        tokio::spawn(async move {
            let response = source.delete_application(&env, &name).await;
            let _ = inbox.send(Completion::Deleted { name, response });
        });

        self.publish();
        Ok(())
    }

    /// Re-reads the list now, unless a read is already running.
    pub fn refresh(&mut self) {
        let Some(env) = self.env_name.clone() else {
            return;
        };
        if self.fetch.is_some() {
            return;
        }
        self.start_fetch(env);
        self.publish();
    }

    fn handle(&mut self, completion: Completion) {
        match completion {
            Completion::Fetched { epoch, result } => self.on_fetched(epoch, result),
            Completion::Deleted { name, response } => self.on_deleted(&name, response),
            Completion::Tick { timer } => self.on_tick(timer),
        }
        self.publish();
    }

    fn on_fetched(&mut self, epoch: u64, result: Result<Vec<ApplicationSummary>, FetchError>) {
        if epoch != self.epoch {
            debug!(epoch, current = self.epoch, "discarding list for a previous environment");
            return;
        }
        self.fetch = None;
        self.dirty = true;

        match result {
            Ok(apps) => {
                debug!(count = apps.len(), "application list received");
                self.collection = Some(apps);
                self.reconcile();
            }
            Err(e) => warn!(error = %e, "application list fetch failed"),
        }
    }

    fn on_deleted(&self, name: &str, response: DeleteResponse) {
        let notice = match response.into_result(name) {
            Ok(message) => {
                info!(app = %name, "delete accepted");
                Notice::success(message)
            }
            Err(e) => {
                warn!(error = %e, "delete rejected");
                Notice::error(e.message)
            }
        };
        self.notify(notice);
    }

    fn on_tick(&mut self, timer: u64) {
        if self.timer.as_ref().map(|t| t.id) != Some(timer) {
            return;
        }
        let Some(env) = self.env_name.clone() else {
            self.disarm_timer();
            return;
        };
        if self.fetch.is_some() {
            debug!("poll tick skipped, list fetch still running");
            return;
        }
        self.start_fetch(env);
    }

    /// Drops pending names the latest list no longer has, then brings the
    /// timer in line with the pending set.
    fn reconcile(&mut self) {
        if !self.pending.is_empty() {
            // Not loaded yet counts as empty.
            let listed = self.collection.as_deref().unwrap_or_default();
            let changed = if listed.is_empty() {
                self.pending.clear()
            } else {
                self.pending
                    .retain_listed(listed.iter().map(|a| a.name.as_str()))
            };
            if changed {
                self.dirty = true;
            }
        }
        self.sync_timer();
    }

    fn sync_timer(&mut self) {
        match (self.pending.is_empty(), self.timer.is_some()) {
            (false, false) => self.arm_timer(),
            (true, true) => self.disarm_timer(),
            _ => {}
        }
    }

    fn arm_timer(&mut self) {
        self.timers_started += 1;
        let id = self.timers_started;
        debug!(timer = id, interval_ms = self.poll_interval.as_millis() as u64, "poll timer armed");
        self.timer = Some(PollTimer::start(
            id,
            self.poll_interval,
            self.inbox_tx.clone(),
        ));
        self.dirty = true;
    }

    fn disarm_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            debug!(timer = timer.id, "poll timer stopped");
            self.dirty = true;
        }
    }

    fn start_fetch(&mut self, env: String) {
        let epoch = self.epoch;
        let source = Arc::clone(&self.source);
        let inbox = self.inbox_tx.clone();
        debug!(env = %env, epoch, "fetching applications");
        let task = tokio::spawn(async move {
            let result = source::fetch(source.as_ref(), Some(&env)).await;
            let _ = inbox.send(Completion::Fetched { epoch, result });
        });
        self.fetch = Some(TaskHandle(task));
        self.dirty = true;
    }

    fn publish(&mut self) {
        if !std::mem::take(&mut self.dirty) {
            return;
        }
        let _ = self.events.send(ControllerEvent::State(self.snapshot()));
    }

    fn notify(&self, notice: Notice) {
        let _ = self.events.send(ControllerEvent::Notice(notice));
    }

    fn shutdown(&mut self) {
        self.disarm_timer();
        self.fetch = None;
        debug!("controller stopped");
    }
}
