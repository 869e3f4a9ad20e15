use chrono::Utc;
use osint_protocol::TaskStatus;

use crate::state::SharedAppState;

/// Background retirement loop. Every `sweeper_interval`:
/// lists tasks in {PENDING, DISPATCHED}, retires the ones past their
/// `end_time` to COMPLETED, wakes their Result Bus subscribers, then runs
/// `purge_expired`/`failover_dead` over the Fleet Registry so dead workers
/// are detected on the same cadence rather than only on the worker's own
/// `StreamTasks` poll.
pub async fn run(state: SharedAppState) {
    let mut interval = tokio::time::interval(state.config.sweeper_interval());
    loop {
        interval.tick().await;
        sweep_once(&state).await;
    }
}

async fn sweep_once(state: &SharedAppState) {
    let now = Utc::now();

    match state.tasks.list_pending_or_dispatched().await {
        Ok(tasks) => {
            for task in tasks {
                if task.end_time <= now {
                    if let Err(e) = state.tasks.update_status(&task.task_id, TaskStatus::Completed).await {
                        tracing::warn!(task_id = %task.task_id, error = %e, "sweeper failed to retire task");
                        continue;
                    }
                    state.results.close(&task.task_id);
                    tracing::debug!(task_id = %task.task_id, "sweeper retired task to COMPLETED");
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "sweeper could not list pending/dispatched tasks");
        }
    }

    let purged = state.fleet.purge_expired();
    for (worker, task_id) in purged {
        tracing::debug!(worker = %worker, task_id = %task_id, "sweeper purged expired assignment");
    }

    let reassigned = state.fleet.failover_dead(state.config.heartbeat_timeout());
    for (dead, task_id, new_worker) in reassigned {
        tracing::warn!(dead_worker = %dead, task_id = %task_id, new_worker = %new_worker, "sweeper failed over assignment");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DispatcherConfig;
    use crate::state::AppState;
    use chrono::Duration;
    use osint_source_catalog::SourceCatalog;
    use osint_task_store::InMemoryTaskStore;
    use osint_user_store::InMemoryUserStore;
    use std::sync::Arc;

    fn test_state() -> SharedAppState {
        Arc::new(AppState::new(
            DispatcherConfig::default(),
            Arc::new(InMemoryTaskStore::new()),
            Arc::new(InMemoryUserStore::new()),
            SourceCatalog::load("/nonexistent/sources.json"),
        ))
    }

    #[tokio::test]
    async fn sweep_retires_tasks_past_end_time() {
        let state = test_state();
        let past_end = Utc::now() - Duration::seconds(1);
        let task = state
            .tasks
            .create("t1", "tok", "flood", &["general".to_string()], &["intl".to_string()], past_end - Duration::minutes(5), past_end)
            .await
            .unwrap();
        state.tasks.update_status(&task.task_id, TaskStatus::Dispatched).await.unwrap();

        sweep_once(&state).await;

        let updated = state.tasks.get(&task.task_id).await.unwrap().unwrap();
        assert_eq!(updated.status, TaskStatus::Completed);
    }

    #[tokio::test]
    async fn sweep_leaves_future_tasks_alone() {
        let state = test_state();
        let future_end = Utc::now() + Duration::minutes(5);
        let task = state
            .tasks
            .create("t1", "tok", "flood", &["general".to_string()], &["intl".to_string()], Utc::now(), future_end)
            .await
            .unwrap();

        sweep_once(&state).await;

        let updated = state.tasks.get(&task.task_id).await.unwrap().unwrap();
        assert_eq!(updated.status, TaskStatus::Pending);
    }
}
