/// Task endpoints
///
/// All task routes sit behind the `Activated` gate; the mutating handlers
/// (create, patch, delete) additionally require a non-provisional role,
/// checked here because reads and writes share the `/tasks/{id}/` path.
///
/// # Endpoints
///
/// - `POST /api/tasks/` - create, 201 with `Location` header
/// - `POST /api/tasks/search` - filter / sort / paginate
/// - `GET /api/tasks/{id}/` - fetch, `?sub-resources=account` joins profiles
/// - `PATCH /api/tasks/{id}/` - patch description / asaignee_id / status / deadline
/// - `DELETE /api/tasks/{id}/` - delete, returns the removed task
///
/// Search takes its paging and sort in the query string and the filter in
/// the JSON body:
///
/// ```text
/// POST /api/tasks/search?offset=0&limit=10&sort=%2Bdeadline
/// Content-Type: application/json
///
/// { "status_in": ["TODO", "DOING"], "is_significant_eq": true }
/// ```
///
/// Response:
/// ```json
/// { "tasks": [ ... ], "count": 42 }
/// ```

use crate::{
    app::AppState,
    error::ApiResult,
    routes::double_option,
};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use taskdeck_shared::{
    auth::gate::{Capability, CurrentAccount},
    error::DomainError,
    models::task::{CreateTask, Task, TaskStatus, UpdateTask},
    query::{compile, TaskFilter},
};

/// Task creation body
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskCreate {
    pub title: String,
    pub description: Option<String>,
    pub asaignee_id: Option<String>,

    /// Defaults to TODO
    pub status: Option<TaskStatus>,

    /// Defaults to false; immutable afterwards
    pub is_significant: Option<bool>,

    pub deadline: Option<NaiveDate>,
}

impl TaskCreate {
    fn validate(&self) -> Result<(), DomainError> {
        let len = self.title.chars().count();
        if !(1..=30).contains(&len) {
            return Err(DomainError::validation(
                "title",
                "must be between 1 and 30 characters",
            ));
        }

        if let Some(asaignee_id) = &self.asaignee_id {
            validate_asaignee_id(asaignee_id)?;
        }

        if let Some(deadline) = self.deadline {
            validate_deadline(deadline)?;
        }

        Ok(())
    }
}

/// Task patch body.
///
/// Only {description, asaignee_id, status, deadline} are recognized; any
/// other key, including `title` and `is_significant`, is rejected as
/// unknown. Explicit `null` clears the nullable fields and is rejected for
/// `status`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskPatch {
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub asaignee_id: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub status: Option<Option<TaskStatus>>,

    #[serde(default, deserialize_with = "double_option")]
    pub deadline: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    fn validate(&self) -> Result<(), DomainError> {
        if let Some(Some(asaignee_id)) = &self.asaignee_id {
            validate_asaignee_id(asaignee_id)?;
        }

        if self.status == Some(None) {
            return Err(DomainError::validation("status", "must not be null"));
        }

        if let Some(Some(deadline)) = self.deadline {
            validate_deadline(deadline)?;
        }

        Ok(())
    }

    fn into_update(self) -> UpdateTask {
        UpdateTask {
            description: self.description,
            asaignee_id: self.asaignee_id,
            status: self.status.flatten(),
            deadline: self.deadline,
        }
    }
}

/// Query-string parameters shared by search and get-by-id.
///
/// Paging values are taken as raw strings so a non-numeric `offset` or
/// `limit` surfaces as a 422 validation error rather than an extractor
/// rejection.
#[derive(Debug, Default, Deserialize)]
pub struct TaskQuery {
    pub offset: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,

    /// `account` joins registrant and assignee profiles into each row
    #[serde(rename = "sub-resources")]
    pub sub_resources: Option<String>,
}

impl TaskQuery {
    /// Parses offset and limit; range checks happen in the compiler.
    fn paging(&self) -> Result<(Option<i64>, Option<i64>), DomainError> {
        let offset = parse_paging("offset", self.offset.as_deref())?;
        let limit = parse_paging("limit", self.limit.as_deref())?;
        Ok((offset, limit))
    }

    /// Whether profiles should be joined; any value other than `account`
    /// (or absent) is rejected.
    fn include_account(&self) -> Result<bool, DomainError> {
        match self.sub_resources.as_deref() {
            None => Ok(false),
            Some("account") => Ok(true),
            Some(other) => Err(DomainError::validation(
                "sub-resources",
                format!("unknown selector: {}", other),
            )),
        }
    }
}

/// Creates a task registered to the caller.
///
/// # Errors
///
/// - `400 Bad Request`: assignee does not exist
/// - `403 Forbidden`: provisional caller
/// - `422 Unprocessable Entity`: title out of range, past deadline,
///   unknown key
pub async fn create(
    State(state): State<AppState>,
    Extension(CurrentAccount(caller)): Extension<CurrentAccount>,
    Json(body): Json<TaskCreate>,
) -> ApiResult<impl IntoResponse> {
    Capability::ActivatedNotProvisional.admit(&caller)?;
    body.validate()?;

    let mut tx = state.db.begin().await?;
    let task = Task::create(
        &mut tx,
        &caller.account_id,
        CreateTask {
            title: body.title,
            description: body.description,
            asaignee_id: body.asaignee_id,
            status: body.status.unwrap_or(TaskStatus::Todo),
            is_significant: body.is_significant.unwrap_or(false),
            deadline: body.deadline,
        },
    )
    .await?;
    tx.commit().await?;

    let location = format!("/api/tasks/{}/", task.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(task),
    ))
}

/// Searches tasks with the compiled filter, sort and paging.
///
/// The count in the response reflects the filter alone, so a client can
/// page with a fixed filter and a stable total.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<TaskQuery>,
    Json(filter): Json<TaskFilter>,
) -> ApiResult<Json<serde_json::Value>> {
    let include_account = params.include_account()?;
    let (offset, limit) = params.paging()?;
    let plan = compile(filter, params.sort.as_deref(), offset, limit)?;

    let mut tx = state.db.begin().await?;

    let body = if include_account {
        let (tasks, count) = Task::search_with_accounts(&mut tx, &plan).await?;
        serde_json::json!({ "tasks": tasks, "count": count })
    } else {
        let (tasks, count) = Task::search(&mut tx, &plan).await?;
        serde_json::json!({ "tasks": tasks, "count": count })
    };

    tx.commit().await?;

    Ok(Json(body))
}

/// Fetches one task, optionally with joined profiles.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Query(params): Query<TaskQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let include_account = params.include_account()?;

    let mut tx = state.db.begin().await?;

    let body = if include_account {
        let task = Task::find_by_id_with_accounts(&mut tx, task_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("task".to_string()))?;
        serde_json::to_value(task)
    } else {
        let task = Task::find_by_id(&mut tx, task_id)
            .await?
            .ok_or_else(|| DomainError::NotFound("task".to_string()))?;
        serde_json::to_value(task)
    }
    .map_err(|e| DomainError::Internal(anyhow::anyhow!(e)))?;

    tx.commit().await?;

    Ok(Json(body))
}

/// Patches a task's mutable fields and returns the updated row.
///
/// # Errors
///
/// - `400 Bad Request`: assignee does not exist
/// - `403 Forbidden`: provisional caller
/// - `404 Not Found`: no such task
/// - `422 Unprocessable Entity`: unknown key (title is immutable), null
///   status, past deadline
pub async fn patch(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Extension(CurrentAccount(caller)): Extension<CurrentAccount>,
    Json(body): Json<TaskPatch>,
) -> ApiResult<Json<Task>> {
    Capability::ActivatedNotProvisional.admit(&caller)?;
    body.validate()?;

    let mut tx = state.db.begin().await?;
    let task = Task::patch(&mut tx, task_id, body.into_update()).await?;
    tx.commit().await?;

    Ok(Json(task))
}

/// Deletes a task and returns the removed row.
pub async fn remove(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Extension(CurrentAccount(caller)): Extension<CurrentAccount>,
) -> ApiResult<Json<Task>> {
    Capability::ActivatedNotProvisional.admit(&caller)?;

    let mut tx = state.db.begin().await?;
    let task = Task::delete(&mut tx, task_id).await?;
    tx.commit().await?;

    Ok(Json(task))
}

fn parse_paging(field: &str, value: Option<&str>) -> Result<Option<i64>, DomainError> {
    value
        .map(|v| {
            v.parse::<i64>()
                .map_err(|_| DomainError::validation(field, "must be an integer"))
        })
        .transpose()
}

fn validate_asaignee_id(asaignee_id: &str) -> Result<(), DomainError> {
    if asaignee_id.chars().count() != 5 {
        return Err(DomainError::validation(
            "asaignee_id",
            "must be exactly 5 characters",
        ));
    }
    Ok(())
}

/// Deadlines must not be earlier than the current business date (UTC).
fn validate_deadline(deadline: NaiveDate) -> Result<(), DomainError> {
    if deadline < Utc::now().date_naive() {
        return Err(DomainError::validation(
            "deadline",
            "must not be earlier than today",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_title_bounds() {
        let body: TaskCreate = serde_json::from_str(r#"{"title": "fix the roof"}"#).unwrap();
        assert!(body.validate().is_ok());

        let body: TaskCreate = serde_json::from_str(r#"{"title": ""}"#).unwrap();
        assert!(body.validate().is_err());

        let long = "x".repeat(31);
        let body: TaskCreate =
            serde_json::from_str(&format!(r#"{{"title": "{long}"}}"#)).unwrap();
        assert!(body.validate().is_err());
    }

    #[test]
    fn test_create_rejects_past_deadline() {
        let body = TaskCreate {
            title: "t".to_string(),
            description: None,
            asaignee_id: None,
            status: None,
            is_significant: None,
            deadline: NaiveDate::from_ymd_opt(2000, 1, 1),
        };
        assert!(body.validate().is_err());

        let today = TaskCreate {
            deadline: Some(Utc::now().date_naive()),
            ..body
        };
        assert!(today.validate().is_ok());
    }

    #[test]
    fn test_patch_rejects_title() {
        // Title is write-once; a patch naming it is an unknown key
        let result = serde_json::from_str::<TaskPatch>(r#"{"title": "renamed"}"#);
        assert!(result.is_err());

        let result = serde_json::from_str::<TaskPatch>(r#"{"is_significant": true}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_patch_null_semantics() {
        let patch: TaskPatch =
            serde_json::from_str(r#"{"asaignee_id": null, "deadline": null}"#).unwrap();
        assert!(patch.validate().is_ok());

        let update = patch.into_update();
        assert_eq!(update.asaignee_id, Some(None));
        assert_eq!(update.deadline, Some(None));
        assert!(update.status.is_none());
    }

    #[test]
    fn test_patch_rejects_null_status() {
        let patch: TaskPatch = serde_json::from_str(r#"{"status": null}"#).unwrap();
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_paging_values_parse_or_fail_validation() {
        let query = TaskQuery {
            offset: Some("20".to_string()),
            limit: Some("5".to_string()),
            ..Default::default()
        };
        assert_eq!(query.paging().unwrap(), (Some(20), Some(5)));

        let absent = TaskQuery::default();
        assert_eq!(absent.paging().unwrap(), (None, None));

        // Non-numeric values are a validation failure, not a routing error
        let garbled = TaskQuery {
            offset: Some("abc".to_string()),
            ..Default::default()
        };
        let err = garbled.paging().unwrap_err();
        assert!(err.to_string().contains("offset"));

        let fractional = TaskQuery {
            limit: Some("2.5".to_string()),
            ..Default::default()
        };
        assert!(fractional.paging().is_err());
    }

    #[test]
    fn test_sub_resources_selector() {
        let none = TaskQuery::default();
        assert_eq!(none.include_account().unwrap(), false);

        let account = TaskQuery {
            sub_resources: Some("account".to_string()),
            ..Default::default()
        };
        assert_eq!(account.include_account().unwrap(), true);

        let bogus = TaskQuery {
            sub_resources: Some("everything".to_string()),
            ..Default::default()
        };
        assert!(bogus.include_account().is_err());
    }
}
