/// Watch lists
///
/// Each account keeps a private set of watched tasks with an optional note.
/// Adding an entry is an upsert keyed on (account, task); adding the same
/// task twice just overwrites the note. Entries vanish with their task or
/// their owner through store cascades.

use serde::Serialize;
use sqlx::PgConnection;

use crate::error::{DomainError, DomainResult};
use crate::models::task::Task;

/// One row of an account's watch list
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WatchEntry {
    pub account_id: String,
    pub task_id: i64,
    pub note: Option<String>,
}

/// A watched task as listed back to its owner: the task itself with the
/// owner's note attached.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WatchedTask {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub task: Task,

    pub note: Option<String>,
}

impl WatchEntry {
    /// Adds a task to the account's watch list, or overwrites the note when
    /// the entry already exists.
    ///
    /// Referencing a task that does not exist fails with `NotFound`.
    pub async fn upsert(
        conn: &mut PgConnection,
        account_id: &str,
        task_id: i64,
        note: Option<String>,
    ) -> DomainResult<Self> {
        let entry = sqlx::query_as::<_, WatchEntry>(
            r#"
            INSERT INTO watch_tasks (account_id, task_id, note)
            VALUES ($1, $2, $3)
            ON CONFLICT (account_id, task_id) DO UPDATE SET note = EXCLUDED.note
            RETURNING account_id, task_id, note
            "#,
        )
        .bind(account_id)
        .bind(task_id)
        .bind(note)
        .fetch_one(&mut *conn)
        .await?;

        Ok(entry)
    }

    /// Removes a task from the account's watch list.
    pub async fn delete(
        conn: &mut PgConnection,
        account_id: &str,
        task_id: i64,
    ) -> DomainResult<()> {
        let result = sqlx::query(
            "DELETE FROM watch_tasks WHERE account_id = $1 AND task_id = $2",
        )
        .bind(account_id)
        .bind(task_id)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound("watch entry".to_string()));
        }
        Ok(())
    }

    /// Lists the account's watched tasks in ascending task id order.
    pub async fn list_for_account(
        conn: &mut PgConnection,
        account_id: &str,
    ) -> DomainResult<Vec<WatchedTask>> {
        let tasks = sqlx::query_as::<_, WatchedTask>(
            r#"
            SELECT t.id, t.title, t.description, t.registrant_id, t.asaignee_id,
                   t.status, t.is_significant, t.deadline, t.created_at, t.updated_at,
                   w.note
            FROM watch_tasks w
            JOIN tasks t ON t.id = w.task_id
            WHERE w.account_id = $1
            ORDER BY t.id ASC
            "#,
        )
        .bind(account_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::task::TaskStatus;
    use chrono::Utc;

    #[test]
    fn test_watched_task_flattens_into_task_shape() {
        let watched = WatchedTask {
            task: Task {
                id: 7,
                title: "watched".to_string(),
                description: None,
                registrant_id: None,
                asaignee_id: None,
                status: TaskStatus::Doing,
                is_significant: true,
                deadline: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            note: Some("check on Friday".to_string()),
        };

        let json = serde_json::to_value(&watched).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["status"], "DOING");
        assert_eq!(json["note"], "check on Friday");
        // No nested "task" object on the wire
        assert!(json.get("task").is_none());
    }
}
