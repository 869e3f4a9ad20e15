use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use osint_protocol::{OsintError, WorkerMetrics};
use parking_lot::Mutex;

/// A worker's outstanding work for one task: the sources it owns and the
/// task's end time (used by `purge_expired`).
#[derive(Debug, Clone)]
pub struct CollectorAssignment {
    pub sources: Vec<String>,
    pub end_time: DateTime<Utc>,
}

struct CollectorRecord {
    name: String,
    shared_secret: String,
    current_token: Option<String>,
    last_heartbeat: Option<DateTime<Utc>>,
    assigned_tasks: HashMap<String, CollectorAssignment>,
    tasks_assigned_count: u64,
    tasks_completed_count: u64,
    heartbeat_count: u64,
    last_result_time: Option<DateTime<Utc>>,
}

impl CollectorRecord {
    fn new(name: &str, shared_secret: &str) -> Self {
        Self {
            name: name.to_string(),
            shared_secret: shared_secret.to_string(),
            current_token: None,
            last_heartbeat: None,
            assigned_tasks: HashMap::new(),
            tasks_assigned_count: 0,
            tasks_completed_count: 0,
            heartbeat_count: 0,
            last_result_time: None,
        }
    }

    fn is_live(&self, max_idle: ChronoDuration, now: DateTime<Utc>) -> bool {
        match self.last_heartbeat {
            Some(hb) => now - hb <= max_idle,
            None => false,
        }
    }

    fn metrics(&self) -> WorkerMetrics {
        WorkerMetrics {
            name: self.name.clone(),
            assigned_task_count: self.assigned_tasks.len(),
            tasks_assigned_count: self.tasks_assigned_count,
            tasks_completed_count: self.tasks_completed_count,
            heartbeat_count: self.heartbeat_count,
            last_heartbeat: self.last_heartbeat,
            last_result_time: self.last_result_time,
        }
    }
}

impl crate::assignment::LoadSnapshot for CollectorRecord {
    fn is_live(&self, max_idle: ChronoDuration, now: DateTime<Utc>) -> bool {
        CollectorRecord::is_live(self, max_idle, now)
    }
    fn load(&self) -> usize {
        self.assigned_tasks.len()
    }
    fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
        self.last_heartbeat
    }
}

#[derive(Default)]
struct Inner {
    workers: HashMap<String, CollectorRecord>,
    token_index: HashMap<String, String>,
}

impl Inner {
    fn by_token(&self, token: &str) -> Result<&CollectorRecord, OsintError> {
        let name = self
            .token_index
            .get(token)
            .ok_or_else(|| OsintError::AuthError("invalid token".to_string()))?;
        Ok(self.workers.get(name).expect("token index out of sync"))
    }

    fn by_token_mut(&mut self, token: &str) -> Result<&mut CollectorRecord, OsintError> {
        let name = self
            .token_index
            .get(token)
            .ok_or_else(|| OsintError::AuthError("invalid token".to_string()))?
            .clone();
        Ok(self.workers.get_mut(&name).expect("token index out of sync"))
    }
}

/// Registry of live and recently-seen workers. All mutation goes through a
/// single mutex: every read-modify-write is performed inside the lock,
/// which is never held across an `.await`.
pub struct FleetRegistry {
    inner: Mutex<Inner>,
}

impl Default for FleetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn register(&self, name: &str, shared_secret: &str) -> Result<(), OsintError> {
        let mut inner = self.inner.lock();
        if inner.workers.contains_key(name) {
            return Err(OsintError::Conflict(format!("worker '{name}' already registered")));
        }
        inner.workers.insert(name.to_string(), CollectorRecord::new(name, shared_secret));
        Ok(())
    }

    /// Validates the shared secret, issues a fresh token, and replaces any
    /// prior token for this worker (the prior token is dropped from the
    /// index, invalidating it immediately).
    pub fn login(&self, name: &str, shared_secret: &str) -> Result<String, OsintError> {
        let mut inner = self.inner.lock();
        let worker = inner
            .workers
            .get(name)
            .ok_or_else(|| OsintError::AuthError("invalid credentials".to_string()))?;
        if worker.shared_secret != shared_secret {
            return Err(OsintError::AuthError("invalid credentials".to_string()));
        }

        let token = uuid::Uuid::new_v4().simple().to_string();
        let now = Utc::now();

        if let Some(old_token) = inner.workers.get(name).and_then(|w| w.current_token.clone()) {
            inner.token_index.remove(&old_token);
        }
        inner.token_index.insert(token.clone(), name.to_string());
        let worker = inner.workers.get_mut(name).expect("checked above");
        worker.current_token = Some(token.clone());
        worker.last_heartbeat = Some(now);

        Ok(token)
    }

    pub fn heartbeat(&self, token: &str, at: Option<DateTime<Utc>>) -> Result<(), OsintError> {
        let mut inner = self.inner.lock();
        let worker = inner.by_token_mut(token)?;
        worker.last_heartbeat = Some(at.unwrap_or_else(Utc::now));
        worker.heartbeat_count += 1;
        Ok(())
    }

    /// Appends `sources` to the worker's assignment for `task_id`, by worker
    /// name (the identity the Assignment Engine already resolved while
    /// holding the registry lock). Merges without duplicates; bumps the
    /// assigned counter only the first time `task_id` appears.
    pub fn assign_to(
        &self,
        name: &str,
        task_id: &str,
        sources: &[String],
        end_time: DateTime<Utc>,
    ) -> Result<(), OsintError> {
        let mut inner = self.inner.lock();
        let worker = inner
            .workers
            .get_mut(name)
            .ok_or_else(|| OsintError::NotFound(format!("worker '{name}'")))?;

        let entry = worker.assigned_tasks.entry(task_id.to_string());
        let is_new = matches!(entry, std::collections::hash_map::Entry::Vacant(_));
        let assignment = entry.or_insert_with(|| CollectorAssignment {
            sources: Vec::new(),
            end_time,
        });
        assignment.end_time = end_time;
        for source in sources {
            if !assignment.sources.contains(source) {
                assignment.sources.push(source.clone());
            }
        }
        if is_new {
            worker.tasks_assigned_count += 1;
        }
        Ok(())
    }

    /// Selects the least-loaded live worker and assigns `task_id` to it in
    /// one locked operation, so no other caller can observe (or act on) a
    /// load snapshot that's already stale by the time the assignment lands.
    /// Returns the chosen worker's name.
    pub fn assign_balanced(
        &self,
        task_id: &str,
        sources: &[String],
        end_time: DateTime<Utc>,
        max_idle: std::time::Duration,
    ) -> Result<String, OsintError> {
        let max_idle = ChronoDuration::from_std(max_idle).unwrap_or_else(|_| ChronoDuration::zero());
        let now = Utc::now();
        let mut inner = self.inner.lock();

        let name = crate::assignment::choose_least_loaded(&inner.workers, max_idle, now)
            .ok_or_else(|| OsintError::Unavailable("no workers available".to_string()))?;

        let worker = inner.workers.get_mut(&name).expect("chosen worker exists");
        let entry = worker
            .assigned_tasks
            .entry(task_id.to_string())
            .or_insert_with(|| CollectorAssignment { sources: Vec::new(), end_time });
        entry.end_time = end_time;
        for source in sources {
            if !entry.sources.contains(source) {
                entry.sources.push(source.clone());
            }
        }
        worker.tasks_assigned_count += 1;

        Ok(name)
    }

    pub fn record_result(&self, token: &str, at: Option<DateTime<Utc>>) -> Result<(), OsintError> {
        let mut inner = self.inner.lock();
        let worker = inner.by_token_mut(token)?;
        worker.tasks_completed_count += 1;
        worker.last_result_time = Some(at.unwrap_or_else(Utc::now));
        Ok(())
    }

    /// Snapshot of one worker's assignments, copied out under the lock so
    /// callers can iterate it across an RPC stream without holding the
    /// mutex while sending.
    pub fn assignments_for_token(
        &self,
        token: &str,
    ) -> Result<Vec<(String, CollectorAssignment)>, OsintError> {
        let inner = self.inner.lock();
        let worker = inner.by_token(token)?;
        Ok(worker
            .assigned_tasks
            .iter()
            .map(|(task_id, a)| (task_id.clone(), a.clone()))
            .collect())
    }

    pub fn is_token_live(&self, token: &str) -> bool {
        self.inner.lock().token_index.contains_key(token)
    }

    pub fn metrics(&self, name: &str) -> Option<WorkerMetrics> {
        self.inner.lock().workers.get(name).map(CollectorRecord::metrics)
    }

    pub fn all_metrics(&self) -> Vec<WorkerMetrics> {
        self.inner.lock().workers.values().map(CollectorRecord::metrics).collect()
    }

    /// Removes assignments whose end time has passed for every worker.
    /// Returns the `(worker, task_id)` pairs removed.
    pub fn purge_expired(&self) -> Vec<(String, String)> {
        let now = Utc::now();
        let mut removed = Vec::new();
        let mut inner = self.inner.lock();
        for worker in inner.workers.values_mut() {
            let expired: Vec<String> = worker
                .assigned_tasks
                .iter()
                .filter(|(_, a)| a.end_time <= now)
                .map(|(task_id, _)| task_id.clone())
                .collect();
            for task_id in expired {
                worker.assigned_tasks.remove(&task_id);
                removed.push((worker.name.clone(), task_id));
            }
        }
        removed
    }

    /// Identifies workers whose `last_heartbeat` is older than
    /// `2 * heartbeat_timeout`, removes them from the registry and token
    /// index, and reassigns their outstanding assignments via the
    /// Assignment Engine. Tasks with no live worker available are logged
    /// and left unassigned rather than failing the whole call, so one
    /// stranded assignment cannot block failover of the rest of the fleet.
    pub fn failover_dead(
        &self,
        heartbeat_timeout: std::time::Duration,
    ) -> Vec<(String, String, String)> {
        let now = Utc::now();
        let threshold = ChronoDuration::from_std(heartbeat_timeout * 2)
            .unwrap_or_else(|_| ChronoDuration::zero());

        let mut inner = self.inner.lock();
        let dead_names: Vec<String> = inner
            .workers
            .values()
            .filter(|w| match w.last_heartbeat {
                Some(hb) => now - hb > threshold,
                None => false,
            })
            .map(|w| w.name.clone())
            .collect();

        let mut reassignments = Vec::new();
        for dead_name in dead_names {
            let Some(dead) = inner.workers.remove(&dead_name) else { continue };
            if let Some(token) = &dead.current_token {
                inner.token_index.remove(token);
            }
            tracing::warn!(worker = %dead_name, outstanding = dead.assigned_tasks.len(), "worker failed over");

            for (task_id, assignment) in dead.assigned_tasks {
                let max_idle = ChronoDuration::from_std(heartbeat_timeout).unwrap_or_else(|_| ChronoDuration::zero());
                let candidate = crate::assignment::choose_least_loaded(&inner.workers, max_idle, now);
                match candidate {
                    Some(new_name) => {
                        if let Some(new_worker) = inner.workers.get_mut(&new_name) {
                            let entry = new_worker
                                .assigned_tasks
                                .entry(task_id.clone())
                                .or_insert_with(|| CollectorAssignment {
                                    sources: Vec::new(),
                                    end_time: assignment.end_time,
                                });
                            for source in &assignment.sources {
                                if !entry.sources.contains(source) {
                                    entry.sources.push(source.clone());
                                }
                            }
                            new_worker.tasks_assigned_count += 1;
                            reassignments.push((dead_name.clone(), task_id, new_name));
                        }
                    }
                    None => {
                        tracing::warn!(task_id = %task_id, worker = %dead_name, "no live worker to fail over to");
                    }
                }
            }
        }
        reassignments
    }
}
