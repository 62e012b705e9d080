/// Watch-list endpoints
///
/// The caller's private watch list. Putting the same task twice is not an
/// error; it overwrites the note.
///
/// # Endpoints
///
/// - `GET /api/mine/watch-tasks/` - the caller's watched tasks
/// - `PUT /api/mine/watch-tasks/{id}/` - watch a task, optional note
/// - `DELETE /api/mine/watch-tasks/{id}/` - stop watching

use crate::{
    app::AppState,
    error::ApiResult,
    routes::Detail,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Deserialize;
use taskdeck_shared::{
    auth::gate::CurrentAccount,
    models::watch::{WatchEntry, WatchedTask},
};

/// Watch body; the note is optional and may be null
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatchBody {
    pub note: Option<String>,
}

/// Lists the caller's watched tasks in ascending task id order.
pub async fn list(
    State(state): State<AppState>,
    Extension(CurrentAccount(caller)): Extension<CurrentAccount>,
) -> ApiResult<Json<Vec<WatchedTask>>> {
    let mut tx = state.db.begin().await?;
    let tasks = WatchEntry::list_for_account(&mut tx, &caller.account_id).await?;
    tx.commit().await?;

    Ok(Json(tasks))
}

/// Adds a task to the caller's watch list or updates the note.
///
/// # Errors
///
/// - `404 Not Found`: no such task
/// - `422 Unprocessable Entity`: unknown key in the body
pub async fn upsert(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Extension(CurrentAccount(caller)): Extension<CurrentAccount>,
    Json(body): Json<WatchBody>,
) -> ApiResult<Json<Detail>> {
    let mut tx = state.db.begin().await?;
    WatchEntry::upsert(&mut tx, &caller.account_id, task_id, body.note).await?;
    tx.commit().await?;

    Ok(Json(Detail::new("Watching the task.")))
}

/// Removes a task from the caller's watch list.
///
/// # Errors
///
/// - `404 Not Found`: the task was not being watched
pub async fn remove(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    Extension(CurrentAccount(caller)): Extension<CurrentAccount>,
) -> ApiResult<Json<Detail>> {
    let mut tx = state.db.begin().await?;
    WatchEntry::delete(&mut tx, &caller.account_id, task_id).await?;
    tx.commit().await?;

    Ok(Json(Detail::new("Stopped watching the task.")))
}
