//! Mutual exclusion shared between scenario instances
//!
//! Two kinds of lock exist:
//! - [`Recorder`] serializes every write to run records (create, status,
//!   logs, finalize). It is held only for the duration of one store call.
//! - [`GroupLocks`] hands out named coarse locks that a scenario author can
//!   hold across a whole scenario body when scenarios share mutable remote
//!   state. The engine never assigns these; scenarios opt in by name.

use parking_lot::Mutex;
use scenario_common::{
    Database, LogEntry, LogLevel, ScenarioRun, ScenarioRunId, ScenarioStatus, SessionId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Lock-guarded writer for run records
#[derive(Clone)]
pub struct Recorder {
    db: Database,
    lock: Arc<Mutex<()>>,
}

impl Recorder {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn open_run(&self, session_id: SessionId, scenario_name: &str) -> scenario_common::Result<ScenarioRun> {
        let _guard = self.lock.lock();
        self.db.create_scenario_run(session_id, scenario_name)
    }

    pub fn set_status(&self, run_id: ScenarioRunId, status: ScenarioStatus) -> scenario_common::Result<()> {
        let _guard = self.lock.lock();
        self.db.set_scenario_status(run_id, status)
    }

    pub fn log(&self, run_id: ScenarioRunId, level: LogLevel, text: &str) -> scenario_common::Result<LogEntry> {
        let _guard = self.lock.lock();
        self.db.add_log(run_id, level, text)
    }

    pub fn finalize(&self, run_id: ScenarioRunId) -> scenario_common::Result<ScenarioRun> {
        let _guard = self.lock.lock();
        self.db.finalize_scenario_run(run_id)
    }

    /// Mark the unfinished run of a scenario as `error`
    pub fn fail_unfinished(&self, session_id: SessionId, scenario_name: &str) -> scenario_common::Result<bool> {
        let _guard = self.lock.lock();
        self.db.fail_unfinished_run(session_id, scenario_name)
    }
}

/// Named coarse locks, created on first use
#[derive(Clone, Default)]
pub struct GroupLocks {
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl GroupLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, group: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks.entry(group.to_string()).or_default().clone()
    }

    /// Wait for exclusive access to `group`; released when the guard drops
    pub async fn acquire(&self, group: &str) -> OwnedMutexGuard<()> {
        self.handle(group).lock_owned().await
    }

    /// Groups that have been requested so far
    pub fn groups(&self) -> Vec<String> {
        let mut names: Vec<String> = self.locks.lock().keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_group_lock_serializes_same_group() {
        let locks = GroupLocks::new();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = locks.clone();
            let active = active.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("to_do_list").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.groups(), vec!["to_do_list"]);
    }

    #[tokio::test]
    async fn test_distinct_groups_do_not_block() {
        let locks = GroupLocks::new();
        let _a = locks.acquire("to_do_list").await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire("events")).await;
        assert!(b.is_ok());
    }

    #[test]
    fn test_recorder_writes_through() {
        let db = Database::open_memory().unwrap();
        let recorder = Recorder::new(db.clone());
        let session = db.create_session("Local").unwrap();

        let run = recorder.open_run(session.id, "A").unwrap();
        recorder.log(run.id, LogLevel::Info, "hello").unwrap();
        recorder.set_status(run.id, ScenarioStatus::Passed).unwrap();
        let run = recorder.finalize(run.id).unwrap();

        assert_eq!(run.status, ScenarioStatus::Passed);
        assert_eq!(recorder.database().list_logs(run.id).unwrap().len(), 1);
    }
}
