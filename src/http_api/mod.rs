use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::baseline::BaselineSnapshot;
use crate::delay::{DelayEvent, DelayReason};
use crate::engine::{EngineOptions, ScheduleOutcome, compute_schedule_from_records};
use crate::error::ScheduleError;
use crate::persistence::{PersistenceError, ScheduleStore};
use crate::records::{RawTaskRecord, today};
use crate::task::TaskId;
use crate::{ProjectMetadata, Schedule, Task};

type SharedStore = Arc<dyn ScheduleStore + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    schedule: Arc<RwLock<Schedule>>,
    store: Option<SharedStore>,
}

impl AppState {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule: Arc::new(RwLock::new(schedule)),
            store: None,
        }
    }

    pub fn with_shared(schedule: Arc<RwLock<Schedule>>) -> Self {
        Self {
            schedule,
            store: None,
        }
    }

    /// Write the schedule back to `store` after every mutation.
    pub fn with_store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    fn schedule(&self) -> Arc<RwLock<Schedule>> {
        self.schedule.clone()
    }

    fn persist(&self, schedule: &Schedule) -> Result<(), ApiError> {
        if let Some(store) = &self.store {
            store.save_schedule(schedule)?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    Conflict(String),
    Invalid(String),
    Internal(String),
}

impl ApiError {
    fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    fn invalid(message: impl Into<String>) -> Self {
        ApiError::Invalid(message.into())
    }
}

impl From<ScheduleError> for ApiError {
    fn from(value: ScheduleError) -> Self {
        match value {
            ScheduleError::TaskNotFound(_) | ScheduleError::DelayNotFound(_) => {
                ApiError::NotFound(value.to_string())
            }
            ScheduleError::DuplicateDelay(_) | ScheduleError::CycleDetected { .. } => {
                ApiError::Conflict(value.to_string())
            }
            ScheduleError::InvalidTask(_)
            | ScheduleError::InvalidDelay(_)
            | ScheduleError::InvalidDate(_) => ApiError::Invalid(value.to_string()),
        }
    }
}

impl From<PersistenceError> for ApiError {
    fn from(value: PersistenceError) -> Self {
        match value {
            PersistenceError::InvalidData(message) => ApiError::Invalid(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, "not_found", message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, "conflict", message),
            ApiError::Invalid(message) => (StatusCode::BAD_REQUEST, "invalid_request", message),
            ApiError::Internal(message) => {
                tracing::error!(%message, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
            }
        };
        (status, Json(ErrorBody { error, message })).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/project", get(get_project).put(update_project))
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/:id",
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/schedule", get(current_schedule).post(refresh_schedule))
        .route("/schedule/compute", post(compute_records))
        .route("/schedule/active", get(active_tasks))
        .route("/baseline", post(capture_baseline).delete(clear_baseline))
        .route("/delays", get(list_delays).post(record_delay))
        .route("/delays/:id", delete(remove_delay))
        .with_state(state)
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP API listening");
    axum::serve(listener, app).await
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn get_project(State(state): State<AppState>) -> Json<ProjectMetadata> {
    let schedule = state.schedule();
    let metadata = schedule.read().metadata().clone();
    Json(metadata)
}

async fn update_project(
    State(state): State<AppState>,
    Json(metadata): Json<ProjectMetadata>,
) -> Result<Json<ProjectMetadata>, ApiError> {
    let schedule = state.schedule();
    let mut guard = schedule.write();
    if metadata.project_id != guard.project_id() {
        return Err(ApiError::invalid("project id cannot be changed"));
    }
    guard.set_metadata(metadata);
    state.persist(&guard)?;
    Ok(Json(guard.metadata().clone()))
}

async fn list_tasks(State(state): State<AppState>) -> Json<Vec<Task>> {
    let schedule = state.schedule();
    let tasks = schedule.read().tasks().to_vec();
    Json(tasks)
}

async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<Json<Task>, ApiError> {
    let schedule = state.schedule();
    let guard = schedule.read();
    guard
        .find_task(task_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("task {task_id} not found")))
}

async fn create_task(
    State(state): State<AppState>,
    Json(task): Json<Task>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let schedule = state.schedule();
    let mut guard = schedule.write();
    if guard.find_task(task.id).is_some() {
        return Err(ApiError::Conflict(format!(
            "task {} already exists",
            task.id
        )));
    }
    guard.upsert_task_record(task.clone())?;
    state.persist(&guard)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
    Json(task): Json<Task>,
) -> Result<Json<Task>, ApiError> {
    if task.id != task_id {
        return Err(ApiError::invalid(
            "task id in payload does not match path parameter",
        ));
    }
    let schedule = state.schedule();
    let mut guard = schedule.write();
    if guard.find_task(task_id).is_none() {
        return Err(ApiError::not_found(format!("task {task_id} not found")));
    }
    guard.upsert_task_record(task.clone())?;
    state.persist(&guard)?;
    Ok(Json(task))
}

async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<TaskId>,
) -> Result<StatusCode, ApiError> {
    let schedule = state.schedule();
    let mut guard = schedule.write();
    if !guard.delete_task(task_id) {
        return Err(ApiError::not_found(format!("task {task_id} not found")));
    }
    state.persist(&guard)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn current_schedule(State(state): State<AppState>) -> Json<ScheduleOutcome> {
    let schedule = state.schedule();
    let outcome = schedule.write().current_outcome().clone();
    Json(outcome)
}

async fn refresh_schedule(State(state): State<AppState>) -> Json<ScheduleOutcome> {
    let schedule = state.schedule();
    let mut guard = schedule.write();
    guard.refresh();
    Json(guard.current_outcome().clone())
}

#[derive(Debug, Deserialize)]
struct ComputePayload {
    tasks: Vec<RawTaskRecord>,
    #[serde(default)]
    project_start: Option<String>,
    #[serde(default)]
    non_working_days: Vec<String>,
    #[serde(default)]
    options: Option<EngineOptions>,
}

/// Stateless scheduling of caller-supplied rows; nothing is stored. The engine
/// runs on the blocking pool.
async fn compute_records(
    Json(payload): Json<ComputePayload>,
) -> Result<Json<ScheduleOutcome>, ApiError> {
    let options = payload.options.unwrap_or_default();
    let outcome = tokio::task::spawn_blocking(move || {
        compute_schedule_from_records(
            payload.tasks,
            payload.project_start.as_deref(),
            &payload.non_working_days,
            &options,
        )
    })
    .await
    .map_err(|err| ApiError::Internal(format!("schedule computation failed: {err}")))?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
struct ActiveQuery {
    date: Option<String>,
}

async fn active_tasks(
    State(state): State<AppState>,
    Query(query): Query<ActiveQuery>,
) -> Result<Json<Vec<TaskId>>, ApiError> {
    let date = match query.date.as_deref() {
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| ScheduleError::InvalidDate(raw.to_string()))?,
        None => today(),
    };
    let schedule = state.schedule();
    let active = schedule.write().active_tasks_on(date);
    Ok(Json(active))
}

async fn capture_baseline(
    State(state): State<AppState>,
) -> Result<Json<BaselineSnapshot>, ApiError> {
    let schedule = state.schedule();
    let mut guard = schedule.write();
    let snapshot = guard.capture_baseline();
    state.persist(&guard)?;
    Ok(Json(snapshot))
}

async fn clear_baseline(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    let schedule = state.schedule();
    let mut guard = schedule.write();
    guard.clear_baseline();
    state.persist(&guard)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_delays(State(state): State<AppState>) -> Json<Vec<DelayEvent>> {
    let schedule = state.schedule();
    let delays = schedule.read().delay_events().to_vec();
    Json(delays)
}

#[derive(Debug, Deserialize)]
struct DelayPayload {
    #[serde(default)]
    id: Option<i32>,
    #[serde(default)]
    reason: Option<String>,
    days_lost: i64,
    affected_task_ids: Vec<TaskId>,
    #[serde(default)]
    event_date: Option<NaiveDate>,
}

async fn record_delay(
    State(state): State<AppState>,
    Json(payload): Json<DelayPayload>,
) -> Result<(StatusCode, Json<DelayEvent>), ApiError> {
    let schedule = state.schedule();
    let mut guard = schedule.write();
    let event = DelayEvent::new(
        payload.id.unwrap_or_else(|| guard.next_delay_id()),
        guard.project_id(),
        payload
            .reason
            .as_deref()
            .map(DelayReason::parse_lenient)
            .unwrap_or_default(),
        payload.days_lost,
        payload.affected_task_ids,
        payload.event_date.unwrap_or_else(today),
    );
    guard.record_delay(event.clone())?;
    state.persist(&guard)?;
    Ok((StatusCode::CREATED, Json(event)))
}

async fn remove_delay(
    State(state): State<AppState>,
    Path(delay_id): Path<i32>,
) -> Result<Json<DelayEvent>, ApiError> {
    let schedule = state.schedule();
    let mut guard = schedule.write();
    let event = guard.remove_delay(delay_id)?;
    state.persist(&guard)?;
    Ok(Json(event))
}
