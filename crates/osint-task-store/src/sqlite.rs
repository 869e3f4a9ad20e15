use async_trait::async_trait;
use chrono::{DateTime, Utc};
use osint_protocol::{OsintError, Task, TaskFilter, TaskStatus};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use crate::traits::TaskStore;

/// Sqlite-backed `TaskStore`.
///
/// Categories/locations are stored as a JSON array string; timestamps are
/// stored as RFC 3339 strings in `*_iso` columns.
pub struct SqliteTaskStore {
    pool: SqlitePool,
}

impl SqliteTaskStore {
    pub async fn new(db_path: &str) -> Result<Self, OsintError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| OsintError::Internal(format!("failed to open task db: {e}")))?;
        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), OsintError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                task_id TEXT PRIMARY KEY,
                token TEXT NOT NULL,
                keywords TEXT NOT NULL,
                categories_json TEXT NOT NULL,
                locations_json TEXT NOT NULL,
                start_time_iso TEXT NOT NULL,
                end_time_iso TEXT NOT NULL,
                status TEXT NOT NULL,
                created_at_iso TEXT NOT NULL,
                updated_at_iso TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| OsintError::Internal(format!("failed to migrate task db: {e}")))?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_token ON tasks(token)")
            .execute(&self.pool)
            .await
            .ok();
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_tasks_status ON tasks(status)")
            .execute(&self.pool)
            .await
            .ok();
        Ok(())
    }

    fn row_to_task(row: &sqlx::sqlite::SqliteRow) -> Result<Task, OsintError> {
        let categories_json: String = row.get("categories_json");
        let locations_json: String = row.get("locations_json");
        let status: String = row.get("status");
        let start_time_iso: String = row.get("start_time_iso");
        let end_time_iso: String = row.get("end_time_iso");
        let created_at_iso: String = row.get("created_at_iso");
        let updated_at_iso: String = row.get("updated_at_iso");

        Ok(Task {
            task_id: row.get("task_id"),
            owner_token: row.get("token"),
            keywords: row.get("keywords"),
            categories: serde_json::from_str(&categories_json)?,
            locations: serde_json::from_str(&locations_json)?,
            start_time: parse_iso(&start_time_iso)?,
            end_time: parse_iso(&end_time_iso)?,
            status: TaskStatus::parse(&status)
                .ok_or_else(|| OsintError::Internal(format!("unknown status '{status}' in db")))?,
            created_at: parse_iso(&created_at_iso)?,
            updated_at: parse_iso(&updated_at_iso)?,
        })
    }
}

fn parse_iso(s: &str) -> Result<DateTime<Utc>, OsintError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| OsintError::Internal(format!("bad timestamp '{s}': {e}")))
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
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
        let categories_json = serde_json::to_string(categories)?;
        let locations_json = serde_json::to_string(locations)?;

        sqlx::query(
            r#"
            INSERT INTO tasks
                (task_id, token, keywords, categories_json, locations_json,
                 start_time_iso, end_time_iso, status, created_at_iso, updated_at_iso)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(task_id)
        .bind(owner_token)
        .bind(keywords)
        .bind(&categories_json)
        .bind(&locations_json)
        .bind(start_time.to_rfc3339())
        .bind(end_time.to_rfc3339())
        .bind(TaskStatus::Pending.as_str())
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| OsintError::Internal(format!("failed to insert task: {e}")))?;

        Ok(Task {
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
        })
    }

    async fn update_status(&self, task_id: &str, new_status: TaskStatus) -> Result<(), OsintError> {
        let now = Utc::now();
        let result = sqlx::query("UPDATE tasks SET status = ?, updated_at_iso = ? WHERE task_id = ?")
            .bind(new_status.as_str())
            .bind(now.to_rfc3339())
            .bind(task_id)
            .execute(&self.pool)
            .await
            .map_err(|e| OsintError::Internal(format!("failed to update task status: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(OsintError::NotFound(format!("task '{task_id}'")));
        }
        Ok(())
    }

    async fn get(&self, task_id: &str) -> Result<Option<Task>, OsintError> {
        let row = sqlx::query("SELECT * FROM tasks WHERE task_id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| OsintError::Internal(format!("task lookup failed: {e}")))?;
        row.as_ref().map(Self::row_to_task).transpose()
    }

    async fn list(&self, filter: &TaskFilter) -> Result<Vec<Task>, OsintError> {
        let mut sql = String::from("SELECT * FROM tasks WHERE 1=1");
        if filter.owner_token.is_some() {
            sql.push_str(" AND token = ?");
        }
        if let Some(statuses) = &filter.statuses {
            let placeholders = vec!["?"; statuses.len()].join(", ");
            sql.push_str(&format!(" AND status IN ({placeholders})"));
        }
        if filter.start_after.is_some() {
            sql.push_str(" AND start_time_iso >= ?");
        }
        if filter.start_before.is_some() {
            sql.push_str(" AND start_time_iso <= ?");
        }
        sql.push_str(" ORDER BY created_at_iso DESC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }
        if filter.offset.is_some() {
            sql.push_str(" OFFSET ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(token) = &filter.owner_token {
            query = query.bind(token);
        }
        if let Some(statuses) = &filter.statuses {
            for status in statuses {
                query = query.bind(status.as_str());
            }
        }
        if let Some(after) = filter.start_after {
            query = query.bind(after.to_rfc3339());
        }
        if let Some(before) = filter.start_before {
            query = query.bind(before.to_rfc3339());
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit);
        }
        if let Some(offset) = filter.offset {
            query = query.bind(offset);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| OsintError::Internal(format!("task listing failed: {e}")))?;
        rows.iter().map(Self::row_to_task).collect()
    }

    async fn count(&self, statuses: Option<&[TaskStatus]>) -> Result<i64, OsintError> {
        let count: i64 = match statuses {
            Some(statuses) if !statuses.is_empty() => {
                let placeholders = vec!["?"; statuses.len()].join(", ");
                let sql = format!("SELECT COUNT(*) FROM tasks WHERE status IN ({placeholders})");
                let mut query = sqlx::query_scalar(&sql);
                for status in statuses {
                    query = query.bind(status.as_str());
                }
                query
                    .fetch_one(&self.pool)
                    .await
                    .map_err(|e| OsintError::Internal(format!("task count failed: {e}")))?
            }
            _ => sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| OsintError::Internal(format!("task count failed: {e}")))?,
        };
        Ok(count)
    }

    async fn list_pending_or_dispatched(&self) -> Result<Vec<Task>, OsintError> {
        let rows = sqlx::query("SELECT * FROM tasks WHERE status IN (?, ?)")
            .bind(TaskStatus::Pending.as_str())
            .bind(TaskStatus::Dispatched.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| OsintError::Internal(format!("task listing failed: {e}")))?;
        rows.iter().map(Self::row_to_task).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store() -> SqliteTaskStore {
        SqliteTaskStore::new(":memory:").await.unwrap()
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now, now + Duration::minutes(2))
    }

    #[tokio::test]
    async fn create_get_update() {
        let store = store().await;
        let (start, end) = window();
        store
            .create("t1", "tok", "flood", &["general".into()], &["international".into()], start, end)
            .await
            .unwrap();

        let fetched = store.get("t1").await.unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::Pending);

        store.update_status("t1", TaskStatus::Dispatched).await.unwrap();
        let fetched = store.get("t1").await.unwrap().unwrap();
        assert_eq!(fetched.status, TaskStatus::Dispatched);
    }

    #[tokio::test]
    async fn list_pending_or_dispatched_and_count() {
        let store = store().await;
        let (start, end) = window();
        store.create("t1", "tok", "k", &[], &[], start, end).await.unwrap();
        store.create("t2", "tok", "k", &[], &[], start, end).await.unwrap();
        store.update_status("t2", TaskStatus::Failed).await.unwrap();

        let pending = store.list_pending_or_dispatched().await.unwrap();
        assert_eq!(pending.len(), 1);

        let count = store.count(Some(&[TaskStatus::Failed])).await.unwrap();
        assert_eq!(count, 1);
    }
}
