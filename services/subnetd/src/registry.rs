//! Process-wide map from task identifier to allocation progress.
//!
//! One background runner writes each task's state; any number of
//! pollers read it. A single `RwLock` write replaces progress and
//! results together, so a reader always sees one consistent snapshot
//! and never a progress value paired with stale results.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use rand_core::{OsRng, RngCore};
use serde::Serialize;
use tokio::sync::RwLock;

use netcalc::SubnetResult;

/// Opaque, unguessable task handle: 16 random bytes as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        let mut bytes = [0u8; 16];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }
}

impl From<String> for TaskId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a poller sees: progress so far, results so far, terminal error
/// if any. A fresh (or unknown) task is all-empty at progress 0.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskState {
    pub progress: u8,
    pub results: Vec<SubnetResult>,
    pub error: Option<String>,
}

impl TaskState {
    pub fn is_terminal(&self) -> bool {
        self.progress == 100 || self.error.is_some()
    }
}

struct TaskEntry {
    state: TaskState,
    terminal_at: Option<Instant>,
}

#[derive(Default)]
pub struct TaskRegistry {
    tasks: RwLock<HashMap<TaskId, TaskEntry>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fresh task and hand back its identifier.
    pub async fn create(&self) -> TaskId {
        let id = TaskId::generate();
        self.tasks.write().await.insert(
            id.clone(),
            TaskEntry {
                state: TaskState::default(),
                terminal_at: None,
            },
        );
        id
    }

    /// Current state of a task. Unknown identifiers come back as a
    /// not-yet-started task, indistinguishable from one that never
    /// existed.
    pub async fn snapshot(&self, id: &TaskId) -> TaskState {
        self.tasks
            .read()
            .await
            .get(id)
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    /// Append one result and raise progress, in a single write so both
    /// become visible together. Ignored once the task is terminal.
    pub async fn record_step(&self, id: &TaskId, result: SubnetResult, progress: u8) {
        let mut tasks = self.tasks.write().await;
        if let Some(entry) = tasks.get_mut(id) {
            if entry.state.is_terminal() {
                return;
            }
            entry.state.results.push(result);
            // progress never regresses, whatever the producer sends
            entry.state.progress = entry.state.progress.max(progress.min(100));
            // a final step carrying 100 closes the task; without the
            // stamp the sweep would retain it forever
            if entry.state.progress == 100 {
                entry.terminal_at = Some(Instant::now());
            }
        }
    }

    /// Close a task out at exactly 100. No-op on failed tasks; on an
    /// already-completed one it only backfills a missing retention
    /// stamp.
    pub async fn complete(&self, id: &TaskId) {
        let mut tasks = self.tasks.write().await;
        if let Some(entry) = tasks.get_mut(id) {
            if entry.state.error.is_some() {
                return;
            }
            entry.state.progress = 100;
            if entry.terminal_at.is_none() {
                entry.terminal_at = Some(Instant::now());
            }
        }
    }

    /// Record a terminal error, keeping whatever partial results were
    /// already committed. No-op if already terminal.
    pub async fn fail(&self, id: &TaskId, message: impl Into<String>) {
        let mut tasks = self.tasks.write().await;
        if let Some(entry) = tasks.get_mut(id) {
            if entry.state.is_terminal() {
                return;
            }
            entry.state.error = Some(message.into());
            entry.terminal_at = Some(Instant::now());
        }
    }

    /// Drop terminal tasks older than `ttl`. In-flight tasks are never
    /// evicted. Returns how many entries were removed.
    pub async fn sweep(&self, ttl: Duration) -> usize {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|_, entry| match entry.terminal_at {
            Some(at) => at.elapsed() < ttl,
            None => true,
        });
        before - tasks.len()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netcalc::NetworkSpec;
    use std::net::Ipv4Addr;

    fn result(last_octet: u8) -> SubnetResult {
        let spec = NetworkSpec::new(Ipv4Addr::new(10, 0, 0, last_octet), 26).unwrap();
        SubnetResult::describe(&spec)
    }

    #[tokio::test]
    async fn unknown_task_looks_not_yet_started() {
        let registry = TaskRegistry::new();
        let state = registry.snapshot(&TaskId::from("no-such-task".to_string())).await;
        assert_eq!(state.progress, 0);
        assert!(state.results.is_empty());
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn ids_are_unique_and_opaque() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 32);
        assert!(a.to_string().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn steps_accumulate_in_order() {
        let registry = TaskRegistry::new();
        let id = registry.create().await;

        registry.record_step(&id, result(0), 50).await;
        let mid = registry.snapshot(&id).await;
        assert_eq!(mid.progress, 50);
        assert_eq!(mid.results.len(), 1);

        registry.record_step(&id, result(64), 100).await;
        registry.complete(&id).await;
        let done = registry.snapshot(&id).await;
        assert_eq!(done.progress, 100);
        assert_eq!(done.results.len(), 2);
        assert!(done.error.is_none());
    }

    #[tokio::test]
    async fn progress_never_regresses() {
        let registry = TaskRegistry::new();
        let id = registry.create().await;
        registry.record_step(&id, result(0), 60).await;
        registry.record_step(&id, result(64), 40).await;
        assert_eq!(registry.snapshot(&id).await.progress, 60);
    }

    #[tokio::test]
    async fn terminal_tasks_are_frozen() {
        let registry = TaskRegistry::new();
        let id = registry.create().await;
        registry.record_step(&id, result(0), 50).await;
        registry.fail(&id, "Too many segments requested for the given network").await;

        registry.record_step(&id, result(64), 100).await;
        registry.complete(&id).await;

        let state = registry.snapshot(&id).await;
        assert_eq!(state.results.len(), 1, "partial results survive the failure");
        assert_eq!(state.progress, 50);
        assert_eq!(
            state.error.as_deref(),
            Some("Too many segments requested for the given network")
        );
    }

    #[tokio::test]
    async fn complete_blocks_later_fail() {
        let registry = TaskRegistry::new();
        let id = registry.create().await;
        registry.complete(&id).await;
        registry.fail(&id, "late").await;
        let state = registry.snapshot(&id).await;
        assert_eq!(state.progress, 100);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn sweep_drops_only_expired_terminal_tasks() {
        let registry = TaskRegistry::new();
        let running = registry.create().await;
        let finished = registry.create().await;
        registry.complete(&finished).await;

        // nothing is older than an hour
        assert_eq!(registry.sweep(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.len().await, 2);

        // a zero ttl expires every terminal task but spares the running
        // one
        assert_eq!(registry.sweep(Duration::ZERO).await, 1);
        assert_eq!(registry.len().await, 1);
        assert!(registry.snapshot(&running).await.error.is_none());

        // evicted ids read as not-yet-started again
        let gone = registry.snapshot(&finished).await;
        assert_eq!(gone.progress, 0);
        assert!(gone.results.is_empty());
    }

    #[tokio::test]
    async fn task_finished_by_its_last_step_is_sweepable() {
        // the final allocation step itself carries progress 100, so the
        // retention stamp must come from record_step, not only from
        // complete()
        let registry = TaskRegistry::new();
        let id = registry.create().await;
        registry.record_step(&id, result(0), 100).await;
        registry.complete(&id).await;

        assert_eq!(
            registry.sweep(Duration::ZERO).await,
            1,
            "terminal task past ttl must be evicted"
        );
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn complete_backfills_missing_retention_stamp() {
        // completion without any prior step (host mode after an empty
        // run would be a bug, but complete alone must still stamp)
        let registry = TaskRegistry::new();
        let id = registry.create().await;
        registry.complete(&id).await;
        registry.complete(&id).await;
        assert_eq!(registry.sweep(Duration::ZERO).await, 1);
    }
}
