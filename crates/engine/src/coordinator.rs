//! Execution coordinator
//!
//! Resolves a request through the registry, opens a session, runs every
//! resolved scenario either serially or on a fixed pool of worker tasks
//! draining a shared queue, then finalizes the session.

use futures::FutureExt;
use parking_lot::Mutex;
use scenario_common::{join_executed_apps, Database, ScenarioRun, Session, SessionId, Settings};
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::error::{EngineResult, ScenarioError};
use crate::gateway::Gateway;
use crate::locks::{GroupLocks, Recorder};
use crate::registry::{ScenarioDef, ScenarioRegistry};
use crate::scenario::{panic_message, Harness, ScenarioContext};

/// How a batch is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Serial,
    Parallel { workers: usize },
}

/// Runs batches of scenarios and records them as sessions
pub struct Coordinator {
    registry: Arc<ScenarioRegistry>,
    harness: Harness,
    worker_pool_size: usize,
}

impl Coordinator {
    pub fn new(registry: Arc<ScenarioRegistry>, db: Database, settings: Arc<Settings>) -> EngineResult<Self> {
        Ok(Self::with_gateway(registry, db, settings, Gateway::new()?))
    }

    pub fn with_gateway(
        registry: Arc<ScenarioRegistry>,
        db: Database,
        settings: Arc<Settings>,
        gateway: Gateway,
    ) -> Self {
        let worker_pool_size = settings.worker_pool_size.max(1);
        Self {
            registry,
            harness: Harness {
                gateway,
                recorder: Recorder::new(db),
                settings,
                group_locks: GroupLocks::new(),
            },
            worker_pool_size,
        }
    }

    pub fn registry(&self) -> &ScenarioRegistry {
        &self.registry
    }

    pub fn database(&self) -> &Database {
        self.harness.recorder.database()
    }

    pub fn settings(&self) -> &Settings {
        &self.harness.settings
    }

    pub fn worker_pool_size(&self) -> usize {
        self.worker_pool_size
    }

    /// Serial below the pool size, parallel otherwise
    pub fn strategy_for(&self, count: usize) -> Strategy {
        if count < self.worker_pool_size {
            Strategy::Serial
        } else {
            Strategy::Parallel {
                workers: self.worker_pool_size,
            }
        }
    }

    /// Run the scenarios selected by `module`/`name` against `base_url`.
    ///
    /// Discovery errors are returned before any session exists. Once the
    /// session is open, per-scenario failures are recorded and never abort
    /// the batch. Returns the finalized session after every worker exits.
    pub async fn execute_scenarios(
        &self,
        base_url: &str,
        environment: &str,
        module: Option<&str>,
        name: Option<&str>,
    ) -> EngineResult<Session> {
        let defs = self.registry.find_scenarios(module, name)?;
        let executed_apps = join_executed_apps(defs.iter().map(|d| d.module.as_str()));

        let session = self.harness.recorder.database().create_session(environment)?;
        let strategy = self.strategy_for(defs.len());
        info!(
            "Session {} started on {} with {} scenarios ({:?})",
            session.id,
            environment,
            defs.len(),
            strategy
        );

        let runs = match strategy {
            Strategy::Serial => self.run_serial(defs, base_url, environment, session.id).await,
            Strategy::Parallel { workers } => {
                self.run_parallel(defs, workers, base_url, environment, session.id).await
            }
        };

        let session = self
            .harness
            .recorder
            .database()
            .finalize_session(session.id, &executed_apps)?;
        info!(
            "Session {} finished: {} scenarios recorded, apps: {}",
            session.id,
            runs.len(),
            if executed_apps.is_empty() { "-" } else { executed_apps.as_str() }
        );
        Ok(session)
    }

    async fn run_serial(
        &self,
        defs: Vec<ScenarioDef>,
        base_url: &str,
        environment: &str,
        session_id: SessionId,
    ) -> Vec<ScenarioRun> {
        let mut runs = Vec::with_capacity(defs.len());
        for def in defs {
            if let Some(run) = run_one(&self.harness, base_url, environment, session_id, &def).await {
                runs.push(run);
            }
        }
        runs
    }

    async fn run_parallel(
        &self,
        defs: Vec<ScenarioDef>,
        workers: usize,
        base_url: &str,
        environment: &str,
        session_id: SessionId,
    ) -> Vec<ScenarioRun> {
        let queue = Arc::new(Mutex::new(VecDeque::from(defs)));

        let handles = (0..workers).map(|worker| {
            let queue = queue.clone();
            let harness = self.harness.clone();
            let base_url = base_url.to_string();
            let environment = environment.to_string();
            tokio::spawn(async move {
                let mut runs = Vec::new();
                loop {
                    let next = queue.lock().pop_front();
                    let Some(def) = next else {
                        break;
                    };
                    debug!("Worker {} picked {}::{}", worker, def.module, def.name);
                    if let Some(run) = run_one(&harness, &base_url, &environment, session_id, &def).await {
                        runs.push(run);
                    }
                }
                debug!("Worker {} drained", worker);
                runs
            })
        });

        let mut runs = Vec::new();
        for joined in futures::future::join_all(handles).await {
            match joined {
                Ok(worker_runs) => runs.extend(worker_runs),
                Err(e) => error!("Worker task failed: {}", e),
            }
        }

        // A worker that died mid-queue leaves items behind
        let leftover: Vec<ScenarioDef> = queue.lock().drain(..).collect();
        if !leftover.is_empty() {
            warn!("{} scenarios left in queue, running them serially", leftover.len());
            runs.extend(self.run_serial(leftover, base_url, environment, session_id).await);
        }
        runs
    }
}

/// Execute one definition, containing every failure it can raise
async fn run_one(
    harness: &Harness,
    base_url: &str,
    environment: &str,
    session_id: SessionId,
    def: &ScenarioDef,
) -> Option<ScenarioRun> {
    let attempt = AssertUnwindSafe(async {
        let mut scenario = def.instantiate()?;
        let mut cx = ScenarioContext::new(base_url, environment, harness.clone());
        cx.execute(scenario.as_mut(), session_id, &def.name).await
    })
    .catch_unwind()
    .await;

    let reason = match attempt {
        Ok(Ok(run)) => {
            debug!("{}::{} finished as {}", def.module, def.name, run.status);
            return Some(run);
        }
        Ok(Err(e)) => e,
        Err(payload) => ScenarioError::Panicked(panic_message(payload)),
    };

    error!("Scenario {}::{} could not complete: {}", def.module, def.name, reason);
    match harness.recorder.fail_unfinished(session_id, &def.name) {
        Ok(true) => {}
        Ok(false) => warn!("No unfinished run of {} to mark as error", def.name),
        Err(e) => error!("Could not mark {} as error: {}", def.name, e),
    }
    None
}
