/// Task repository
///
/// Tasks are not owned by any account; registrant and assignee are weak
/// references with set-null semantics. Title and significance are write-once
/// at creation; status moves freely between TODO, DOING and DONE with no
/// enforced workflow.
///
/// Update paths (`patch`, `delete`) acquire an exclusive row lock
/// (`SELECT ... FOR UPDATE`) before mutating, so concurrent writers to the
/// same task serialize with last-writer-wins semantics. `search` takes no
/// locks and pairs its row query with a `count(*)` over the same filter in
/// the same transaction.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{
    postgres::{PgHasArrayType, PgRow, PgTypeInfo},
    PgConnection, Row,
};

use crate::error::{DomainError, DomainResult};
use crate::models::account::Account;
use crate::query::{SearchPlan, SortKey, TaskFilter};

/// Workflow status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum TaskStatus {
    Todo,
    Doing,
    Done,
}

// Needed to bind Vec<TaskStatus> for `status = ANY($n)`; the Type derive
// does not provide the array half for custom Postgres enums.
impl PgHasArrayType for TaskStatus {
    fn array_type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("_task_status")
    }
}

/// A tracked task
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Monotonic integer, assigned by the store at insert
    pub id: i64,

    /// 1..30 characters; immutable after creation
    pub title: String,

    /// Optional free text
    pub description: Option<String>,

    /// Creator's account id; null when that account was deleted
    pub registrant_id: Option<String>,

    /// Optional assignee; cleared when the referenced account is deleted
    pub asaignee_id: Option<String>,

    pub status: TaskStatus,

    /// Write-once at creation
    pub is_significant: bool,

    /// Optional date; validated against the business date on write
    pub deadline: Option<NaiveDate>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task with registrant and assignee profiles joined in.
///
/// Missing references yield null slots, not errors.
#[derive(Debug, Clone, Serialize)]
pub struct TaskWithAccount {
    #[serde(flatten)]
    pub task: Task,

    pub registrant: Option<Account>,
    pub asaignee: Option<Account>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: Option<String>,
    pub asaignee_id: Option<String>,
    pub status: TaskStatus,
    pub is_significant: bool,
    pub deadline: Option<NaiveDate>,
}

/// Patch for an existing task.
///
/// Only {description, asaignee_id, status, deadline} are mutable; the DTO
/// layer rejects anything else. The nested options distinguish an explicit
/// null (clear the slot) from an absent key.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub description: Option<Option<String>>,
    pub asaignee_id: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub deadline: Option<Option<NaiveDate>>,
}

impl UpdateTask {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.asaignee_id.is_none()
            && self.status.is_none()
            && self.deadline.is_none()
    }
}

const COLUMNS: &str = "id, title, description, registrant_id, asaignee_id, status, \
                       is_significant, deadline, created_at, updated_at";

const T_COLUMNS: &str = "t.id, t.title, t.description, t.registrant_id, t.asaignee_id, \
                         t.status, t.is_significant, t.deadline, t.created_at, t.updated_at";

/// Binds filter values in the exact order `filter_conditions` numbered them.
/// Works for any sqlx query type whose `bind` returns `Self`.
macro_rules! bind_filter {
    ($query:expr, $filter:expr) => {{
        let mut q = $query;
        if let Some(v) = &$filter.title_cn {
            q = q.bind(v.clone());
        }
        if let Some(v) = &$filter.description_cn {
            q = q.bind(v.clone());
        }
        if let Some(v) = &$filter.asaignee_id_in {
            q = q.bind(v.clone());
        }
        if let Some(v) = &$filter.status_in {
            q = q.bind(v.clone());
        }
        if let Some(v) = $filter.is_significant_eq {
            q = q.bind(v);
        }
        if let Some(v) = $filter.deadline_from {
            q = q.bind(v);
        }
        if let Some(v) = $filter.deadline_to {
            q = q.bind(v);
        }
        q
    }};
}

impl Task {
    /// Creates a task. The registrant is stamped from the caller; the id is
    /// assigned by the store's sequence.
    pub async fn create(
        conn: &mut PgConnection,
        registrant_id: &str,
        data: CreateTask,
    ) -> DomainResult<Self> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, registrant_id, asaignee_id,
                               status, is_significant, deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(registrant_id)
        .bind(data.asaignee_id)
        .bind(data.status)
        .bind(data.is_significant)
        .bind(data.deadline)
        .fetch_one(&mut *conn)
        .await?;

        Ok(task)
    }

    /// Lookup by id.
    pub async fn find_by_id(conn: &mut PgConnection, id: i64) -> DomainResult<Option<Self>> {
        let task =
            sqlx::query_as::<_, Task>(&format!("SELECT {COLUMNS} FROM tasks WHERE id = $1"))
                .bind(id)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(task)
    }

    /// Lookup with registrant and assignee profiles left-outer-joined in.
    pub async fn find_by_id_with_accounts(
        conn: &mut PgConnection,
        id: i64,
    ) -> DomainResult<Option<TaskWithAccount>> {
        let row = sqlx::query(&joined_select("WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        row.map(|r| task_with_account_from_row(&r))
            .transpose()
            .map_err(Into::into)
    }

    /// Patches only the keys present in `patch` from the mutable set
    /// {description, asaignee_id, status, deadline}.
    ///
    /// Locks the row first; the returned task reflects the state this
    /// transaction will commit.
    pub async fn patch(
        conn: &mut PgConnection,
        id: i64,
        patch: UpdateTask,
    ) -> DomainResult<Self> {
        let current = Self::lock_by_id(&mut *conn, id)
            .await?
            .ok_or_else(|| DomainError::NotFound("task".to_string()))?;

        if patch.is_empty() {
            return Ok(current);
        }

        let mut sql = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if patch.description.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", description = ${}", bind_count));
        }
        if patch.asaignee_id.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", asaignee_id = ${}", bind_count));
        }
        if patch.status.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", status = ${}", bind_count));
        }
        if patch.deadline.is_some() {
            bind_count += 1;
            sql.push_str(&format!(", deadline = ${}", bind_count));
        }

        sql.push_str(&format!(" WHERE id = $1 RETURNING {COLUMNS}"));

        let mut query = sqlx::query_as::<_, Task>(&sql).bind(id);

        if let Some(description) = patch.description {
            query = query.bind(description);
        }
        if let Some(asaignee_id) = patch.asaignee_id {
            query = query.bind(asaignee_id);
        }
        if let Some(status) = patch.status {
            query = query.bind(status);
        }
        if let Some(deadline) = patch.deadline {
            query = query.bind(deadline);
        }

        let task = query.fetch_one(&mut *conn).await?;
        Ok(task)
    }

    /// Deletes a task, returning the pre-delete snapshot. Watch entries
    /// referencing the task are cascaded away by the store.
    pub async fn delete(conn: &mut PgConnection, id: i64) -> DomainResult<Self> {
        let snapshot = Self::lock_by_id(&mut *conn, id)
            .await?
            .ok_or_else(|| DomainError::NotFound("task".to_string()))?;

        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(snapshot)
    }

    /// Executes a compiled search plan: filtered, sorted, paginated rows
    /// plus a count over the same filter.
    ///
    /// The count reflects the filter only, independent of pagination, and is
    /// consistent with the rows because both queries run in the caller's
    /// transaction.
    pub async fn search(
        conn: &mut PgConnection,
        plan: &SearchPlan,
    ) -> DomainResult<(Vec<Self>, i64)> {
        let (where_sql, next_idx) = filter_conditions(&plan.filter, 1);

        let rows_sql = format!(
            "SELECT {T_COLUMNS} FROM tasks t {where_sql} {} LIMIT ${} OFFSET ${}",
            order_by_sql(&plan.sort),
            next_idx,
            next_idx + 1,
        );

        let query = sqlx::query_as::<_, Task>(&rows_sql);
        let rows = bind_filter!(query, plan.filter)
            .bind(plan.limit)
            .bind(plan.offset)
            .fetch_all(&mut *conn)
            .await?;

        let count = Self::count(&mut *conn, &plan.filter).await?;

        Ok((rows, count))
    }

    /// Like [`Task::search`] but with registrant and assignee profiles
    /// joined into each row.
    pub async fn search_with_accounts(
        conn: &mut PgConnection,
        plan: &SearchPlan,
    ) -> DomainResult<(Vec<TaskWithAccount>, i64)> {
        let (where_sql, next_idx) = filter_conditions(&plan.filter, 1);

        let rows_sql = format!(
            "{} {} LIMIT ${} OFFSET ${}",
            joined_select(&where_sql),
            order_by_sql(&plan.sort),
            next_idx,
            next_idx + 1,
        );

        let query = sqlx::query(&rows_sql);
        let rows = bind_filter!(query, plan.filter)
            .bind(plan.limit)
            .bind(plan.offset)
            .fetch_all(&mut *conn)
            .await?;

        let tasks = rows
            .iter()
            .map(task_with_account_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let count = Self::count(&mut *conn, &plan.filter).await?;

        Ok((tasks, count))
    }

    async fn count(conn: &mut PgConnection, filter: &TaskFilter) -> DomainResult<i64> {
        let (where_sql, _) = filter_conditions(filter, 1);
        let count_sql = format!("SELECT COUNT(*) FROM tasks t {where_sql}");

        let query = sqlx::query_scalar::<_, i64>(&count_sql);
        let count = bind_filter!(query, filter).fetch_one(&mut *conn).await?;

        Ok(count)
    }

    async fn lock_by_id(conn: &mut PgConnection, id: i64) -> DomainResult<Option<Self>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(task)
    }
}

/// Renders the WHERE clause for a filter, numbering placeholders from
/// `first_idx`. Returns the clause (possibly empty) and the next free
/// placeholder index. Bind order must match [`bind_filter!`].
fn filter_conditions(filter: &TaskFilter, first_idx: usize) -> (String, usize) {
    let mut conditions = Vec::new();
    let mut idx = first_idx;

    if filter.title_cn.is_some() {
        conditions.push(format!("t.title LIKE '%' || ${} || '%'", idx));
        idx += 1;
    }
    if filter.description_cn.is_some() {
        conditions.push(format!("t.description LIKE '%' || ${} || '%'", idx));
        idx += 1;
    }
    if filter.asaignee_id_in.is_some() {
        conditions.push(format!("t.asaignee_id = ANY(${})", idx));
        idx += 1;
    }
    if let Some(exists) = filter.asaignee_id_ex {
        if exists {
            conditions.push("t.asaignee_id IS NOT NULL".to_string());
        } else {
            conditions.push("t.asaignee_id IS NULL".to_string());
        }
    }
    if filter.status_in.is_some() {
        conditions.push(format!("t.status = ANY(${})", idx));
        idx += 1;
    }
    if filter.is_significant_eq.is_some() {
        conditions.push(format!("t.is_significant = ${}", idx));
        idx += 1;
    }
    if filter.deadline_from.is_some() {
        conditions.push(format!("t.deadline >= ${}", idx));
        idx += 1;
    }
    if filter.deadline_to.is_some() {
        conditions.push(format!("t.deadline <= ${}", idx));
        idx += 1;
    }

    if conditions.is_empty() {
        (String::new(), idx)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), idx)
    }
}

/// Renders `ORDER BY` from compiled sort keys, left to right as declared.
fn order_by_sql(sort: &[SortKey]) -> String {
    let keys: Vec<String> = sort
        .iter()
        .map(|k| format!("t.{} {}", k.column.as_sql(), k.direction.as_sql()))
        .collect();
    format!("ORDER BY {}", keys.join(", "))
}

/// SELECT with registrant (r_*) and assignee (a_*) profiles joined.
fn joined_select(where_sql: &str) -> String {
    format!(
        r#"SELECT {T_COLUMNS},
            r.account_id AS r_account_id, r.username AS r_username,
            r.nickname AS r_nickname, r.email AS r_email, r.role AS r_role,
            r.is_active AS r_is_active, r.email_verified AS r_email_verified,
            r.created_at AS r_created_at, r.updated_at AS r_updated_at,
            a.account_id AS a_account_id, a.username AS a_username,
            a.nickname AS a_nickname, a.email AS a_email, a.role AS a_role,
            a.is_active AS a_is_active, a.email_verified AS a_email_verified,
            a.created_at AS a_created_at, a.updated_at AS a_updated_at
        FROM tasks t
        LEFT OUTER JOIN profiles r ON r.account_id = t.registrant_id
        LEFT OUTER JOIN profiles a ON a.account_id = t.asaignee_id
        {where_sql}"#
    )
}

fn task_with_account_from_row(row: &PgRow) -> Result<TaskWithAccount, sqlx::Error> {
    use sqlx::FromRow;

    let task = Task::from_row(row)?;
    let registrant = joined_account(row, "r_")?;
    let asaignee = joined_account(row, "a_")?;

    Ok(TaskWithAccount {
        task,
        registrant,
        asaignee,
    })
}

/// Reassembles an optional joined profile from prefixed columns; a null
/// account_id means the outer join found no row.
fn joined_account(row: &PgRow, prefix: &str) -> Result<Option<Account>, sqlx::Error> {
    let account_id: Option<String> = row.try_get(format!("{prefix}account_id").as_str())?;

    let Some(account_id) = account_id else {
        return Ok(None);
    };

    Ok(Some(Account {
        account_id,
        username: row.try_get(format!("{prefix}username").as_str())?,
        nickname: row.try_get(format!("{prefix}nickname").as_str())?,
        email: row.try_get(format!("{prefix}email").as_str())?,
        role: row.try_get(format!("{prefix}role").as_str())?,
        is_active: row.try_get(format!("{prefix}is_active").as_str())?,
        email_verified: row.try_get(format!("{prefix}email_verified").as_str())?,
        created_at: row.try_get(format!("{prefix}created_at").as_str())?,
        updated_at: row.try_get(format!("{prefix}updated_at").as_str())?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{compile, SortColumn, SortDirection};

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&TaskStatus::Todo).unwrap(), "\"TODO\"");
        assert_eq!(
            serde_json::to_string(&TaskStatus::Doing).unwrap(),
            "\"DOING\""
        );
        assert_eq!(serde_json::to_string(&TaskStatus::Done).unwrap(), "\"DONE\"");

        let status: TaskStatus = serde_json::from_str("\"DOING\"").unwrap();
        assert_eq!(status, TaskStatus::Doing);
    }

    #[test]
    fn test_status_array_maps_to_enum_array_type() {
        use sqlx::TypeInfo;
        assert_eq!(TaskStatus::array_type_info().name(), "_task_status");
    }

    #[test]
    fn test_filter_conditions_empty_filter() {
        let (sql, next) = filter_conditions(&TaskFilter::default(), 1);
        assert_eq!(sql, "");
        assert_eq!(next, 1);
    }

    #[test]
    fn test_filter_conditions_numbering() {
        let filter = TaskFilter {
            title_cn: Some("x".into()),
            asaignee_id_ex: Some(false),
            status_in: Some(vec![TaskStatus::Todo]),
            deadline_to: chrono::NaiveDate::from_ymd_opt(2024, 12, 31),
            ..Default::default()
        };
        let (sql, next) = filter_conditions(&filter, 1);

        assert!(sql.starts_with("WHERE "));
        assert!(sql.contains("t.title LIKE '%' || $1 || '%'"));
        assert!(sql.contains("t.asaignee_id IS NULL"));
        assert!(sql.contains("t.status = ANY($2)"));
        assert!(sql.contains("t.deadline <= $3"));
        // IS NULL consumes no placeholder
        assert_eq!(next, 4);
    }

    #[test]
    fn test_order_by_renders_left_to_right() {
        let sort = vec![
            SortKey {
                column: SortColumn::Deadline,
                direction: SortDirection::Asc,
            },
            SortKey {
                column: SortColumn::Id,
                direction: SortDirection::Desc,
            },
        ];
        assert_eq!(order_by_sql(&sort), "ORDER BY t.deadline ASC, t.id DESC");
    }

    #[test]
    fn test_compiled_plan_always_orders_by_id() {
        // Property: the executed ordering equals the caller's sort with +id
        // appended, so paging with a fixed filter partitions the rows.
        let plan = compile(TaskFilter::default(), Some("+deadline"), None, None).unwrap();
        let sql = order_by_sql(&plan.sort);
        assert_eq!(sql, "ORDER BY t.deadline ASC, t.id ASC");
    }

    #[test]
    fn test_update_task_is_empty() {
        assert!(UpdateTask::default().is_empty());

        let clear_deadline = UpdateTask {
            deadline: Some(None),
            ..Default::default()
        };
        assert!(!clear_deadline.is_empty());
    }

    #[test]
    fn test_task_with_account_serialization_shape() {
        let task = Task {
            id: 1,
            title: "task1".to_string(),
            description: None,
            registrant_id: Some("T-901".to_string()),
            asaignee_id: None,
            status: TaskStatus::Todo,
            is_significant: false,
            deadline: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let with_account = TaskWithAccount {
            task,
            registrant: None,
            asaignee: None,
        };

        let json = serde_json::to_value(&with_account).unwrap();
        // Task fields are flattened; joined slots are explicit nulls
        assert_eq!(json["id"], 1);
        assert_eq!(json["status"], "TODO");
        assert!(json["registrant"].is_null());
        assert!(json["asaignee"].is_null());
    }
}
