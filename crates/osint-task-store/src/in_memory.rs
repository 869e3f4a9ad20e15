use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use osint_protocol::{OsintError, Task, TaskFilter, TaskStatus};
use tokio::sync::RwLock;

use crate::traits::TaskStore;

/// In-memory `TaskStore`, the default backend.
///
/// Status transitions are not re-validated here against the lifecycle DAG —
/// callers (the RPC surface and the sweeper) are the only callers of
/// `update_status` and only ever request valid transitions. This store is
/// a thin persistence layer, not a state-machine enforcer.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn create(
        &self,
        task_id: &str,
        owner_token: &str,
        keywords: &str,
        categories: &[String],
        locations: &[String],
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Task, OsintError> {
        let now = Utc::now();
        let task = Task {
            task_id: task_id.to_string(),
            owner_token: owner_token.to_string(),
            keywords: keywords.to_string(),
            categories: categories.to_vec(),
            locations: locations.to_vec(),
            start_time,
            end_time,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.tasks.write().await.insert(task_id.to_string(), task.clone());
        Ok(task)
    }

    async fn update_status(&self, task_id: &str, new_status: TaskStatus) -> Result<(), OsintError> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| OsintError::NotFound(format!("task '{task_id}'")))?;
        task.status = new_status;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<Task>, OsintError> {
        Ok(self.tasks.read().await.get(task_id).cloned())
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, OsintError> {
        let tasks = self.tasks.read().await;
        let mut matching: Vec<Task> = tasks
            .values()
            .filter(|t| {
                if let Some(token) = &filter.owner_token {
                    if &t.owner_token != token {
                        return false;
                    }
                }
                if let Some(statuses) = &filter.statuses {
                    if !statuses.contains(&t.status) {
                        return false;
                    }
                }
                if let Some(after) = filter.start_after {
                    if t.start_time < after {
                        return false;
                    }
                }
                if let Some(before) = filter.start_before {
                    if t.start_time > before {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let matching = if offset < matching.len() {
            matching.split_off(offset)
        } else {
            Vec::new()
        };
        let matching = if let Some(limit) = filter.limit {
            matching.into_iter().take(limit.max(0) as usize).collect()
        } else {
            matching
        };
        Ok(matching)
    }

    async fn count(&self, statuses: Option<&[TaskStatus]>) -> Result<i64, OsintError> {
        let tasks = self.tasks.read().await;
        let count = match statuses {
            Some(statuses) => tasks.values().filter(|t| statuses.contains(&t.status)).count(),
            None => tasks.len(),
        };
        Ok(count as i64)
    }

    async fn list_pending_or_dispatched(&self) -> Result<Vec<Task>, OsintError> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .values()
            .filter(|t| matches!(t.status, TaskStatus::Pending | TaskStatus::Dispatched))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now, now + Duration::minutes(2))
    }

    #[tokio::test]
    async fn create_then_get() {
        let store = InMemoryTaskStore::new();
        let (start, end) = window();
        let task = store
            .create("t1", "tok", "flood", &["general".into()], &["international".into()], start, end)
            .await
            .unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.created_at, task.updated_at);

        let fetched = store.get("t1").await.unwrap().unwrap();
        assert_eq!(fetched.task_id, "t1");
    }

    #[tokio::test]
    async fn update_status_bumps_updated_at() {
        let store = InMemoryTaskStore::new();
        let (start, end) = window();
        let task = store.create("t1", "tok", "k", &[], &[], start, end).await.unwrap();
        store.update_status("t1", TaskStatus::Dispatched).await.unwrap();
        let fetched = store.get("t1").await.unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::Dispatched);
        assert!(fetched.updated_at >= task.updated_at);
    }

    #[tokio::test]
    async fn update_status_unknown_task_not_found() {
        let store = InMemoryTaskStore::new();
        let err = store.update_status("missing", TaskStatus::Failed).await.unwrap_err();
        assert!(matches!(err, OsintError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_filters_by_token_and_status_with_pagination() {
        let store = InMemoryTaskStore::new();
        let (start, end) = window();
        for i in 0..5 {
            store
                .create(&format!("t{i}"), "tok", "k", &[], &[], start, end)
                .await
                .unwrap();
        }
        store
            .create("other", "tok2", "k", &[], &[], start, end)
            .await
            .unwrap();
        store.update_status("t0", TaskStatus::Completed).await.unwrap();

        let all_for_tok = store
            .list(&TaskFilter {
                owner_token: Some("tok".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(all_for_tok.len(), 5);

        let completed = store
            .list(&TaskFilter {
                statuses: Some(vec![TaskStatus::Completed]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(completed.len(), 1);

        let page = store
            .list(&TaskFilter {
                owner_token: Some("tok".into()),
                limit: Some(2),
                offset: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
    }

    #[tokio::test]
    async fn list_pending_or_dispatched_excludes_terminal() {
        let store = InMemoryTaskStore::new();
        let (start, end) = window();
        store.create("t1", "tok", "k", &[], &[], start, end).await.unwrap();
        store.create("t2", "tok", "k", &[], &[], start, end).await.unwrap();
        store.update_status("t2", TaskStatus::Completed).await.unwrap();

        let pending = store.list_pending_or_dispatched().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].task_id, "t1");
    }
}
