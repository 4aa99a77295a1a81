//! Local HTTP API
//!
//! The interface a front-end uses to drive the hub. Every route goes through
//! the shared `HubHandle`, so HTTP reads see the same reconciled timer as the
//! ticker and the sync worker.

mod server;

pub use server::{start, ServerHandle};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::data::DashboardStats;
use crate::error::ValidationError;
use crate::hub::HubHandle;
use crate::model::{date_key, DailyGoal, FocusSession, Priority, SessionInput, Task, TaskInput, TaskUpdate};
use crate::offline::{ReplayReport, SyncScope};
use crate::store::Warning;
use crate::timer::{TimerEvent, TimerView};

/// Error body returned by every failing route
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    NotFound(String),
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Validation(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, what),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Timer state after a transition, plus the session it recorded if any
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionResponse {
    pub timer: TimerView,
    pub recorded: Option<SessionInput>,
}

#[derive(Debug, Deserialize)]
pub struct DurationRequest {
    pub minutes: u64,
}

#[derive(Debug, Deserialize)]
pub struct TaskFilter {
    pub priority: Option<Priority>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalRequest {
    pub date: String,
    pub target_minutes: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodayGoalResponse {
    pub date: String,
    pub target_minutes: u32,
    /// No goal was set for today; the configured default applies
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
pub struct ConnectivityRequest {
    pub online: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityResponse {
    pub online: bool,
    pub changed: bool,
    pub pending_offline_actions: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub tag: String,
    /// `None` while offline: the replay waits for connectivity
    pub report: Option<ReplayReport>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub online: bool,
    pub pending_offline_actions: usize,
    pub warnings: Vec<Warning>,
}

/// Build the API router over a hub handle
pub fn router(handle: HubHandle) -> Router {
    Router::new()
        .route("/timer", get(get_timer))
        .route("/timer/start", post(start_timer))
        .route("/timer/pause-resume", post(pause_resume_timer))
        .route("/timer/reset", post(reset_timer))
        .route("/timer/duration", put(set_duration))
        .route("/tasks", get(list_tasks).post(add_task))
        .route("/tasks/:id", patch(update_task).delete(delete_task))
        .route("/tasks/:id/toggle", post(toggle_task))
        .route("/sessions/today", get(todays_sessions))
        .route("/goals/today", get(today_goal))
        .route("/goals", put(set_goal))
        .route("/dashboard", get(dashboard))
        .route("/connectivity", post(set_connectivity))
        .route("/sync/:tag", post(fire_sync))
        .route("/health", get(health))
        .with_state(handle)
}

fn transition(event: TimerEvent, timer: TimerView) -> Json<TransitionResponse> {
    debug!("Timer transition: {:?}", event);
    let recorded = match event {
        TimerEvent::Completed(run) | TimerEvent::Abandoned(run) => Some(run),
        _ => None,
    };
    Json(TransitionResponse { timer, recorded })
}

async fn get_timer(State(handle): State<HubHandle>) -> Json<TimerView> {
    Json(handle.with_hub(|hub| hub.timer_view()))
}

async fn start_timer(State(handle): State<HubHandle>) -> Json<TransitionResponse> {
    let (event, view) = handle.with_hub(|hub| (hub.start_timer(), hub.timer_view()));
    transition(event, view)
}

async fn pause_resume_timer(State(handle): State<HubHandle>) -> Json<TransitionResponse> {
    let (event, view) = handle.with_hub(|hub| (hub.pause_resume_timer(), hub.timer_view()));
    transition(event, view)
}

async fn reset_timer(State(handle): State<HubHandle>) -> Json<TransitionResponse> {
    let (event, view) = handle.with_hub(|hub| (hub.reset_timer(), hub.timer_view()));
    transition(event, view)
}

async fn set_duration(
    State(handle): State<HubHandle>,
    Json(request): Json<DurationRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
    let (event, view) = handle.with_hub(|hub| {
        hub.set_duration(request.minutes)
            .map(|event| (event, hub.timer_view()))
    })?;
    Ok(transition(event, view))
}

async fn list_tasks(
    State(handle): State<HubHandle>,
    Query(filter): Query<TaskFilter>,
) -> Json<Vec<Task>> {
    Json(handle.read(|hub| hub.tasks(filter.priority)))
}

async fn add_task(
    State(handle): State<HubHandle>,
    Json(input): Json<TaskInput>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = handle.with_hub(|hub| hub.add_task(input))?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(handle): State<HubHandle>,
    Path(id): Path<String>,
    Json(update): Json<TaskUpdate>,
) -> Result<Response, ApiError> {
    let updated = handle.with_hub(|hub| hub.update_task(&id, &update))?;
    Ok(match updated {
        Some(task) => Json(task).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn delete_task(State(handle): State<HubHandle>, Path(id): Path<String>) -> StatusCode {
    handle.with_hub(|hub| hub.delete_task(&id));
    StatusCode::NO_CONTENT
}

async fn toggle_task(State(handle): State<HubHandle>, Path(id): Path<String>) -> Response {
    match handle.with_hub(|hub| hub.toggle_task(&id)) {
        Some(task) => Json(task).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn todays_sessions(State(handle): State<HubHandle>) -> Json<Vec<FocusSession>> {
    Json(handle.with_hub(|hub| hub.todays_sessions()))
}

async fn today_goal(State(handle): State<HubHandle>) -> Json<TodayGoalResponse> {
    let response = handle.read(|hub| match hub.today_goal() {
        Some(goal) => TodayGoalResponse {
            date: goal.date,
            target_minutes: goal.target_minutes,
            is_default: false,
        },
        None => TodayGoalResponse {
            date: date_key(hub.now()),
            target_minutes: hub.today_goal_minutes(),
            is_default: true,
        },
    });
    Json(response)
}

async fn set_goal(
    State(handle): State<HubHandle>,
    Json(request): Json<GoalRequest>,
) -> Result<Json<DailyGoal>, ApiError> {
    let goal = handle.with_hub(|hub| hub.set_goal(&request.date, request.target_minutes))?;
    Ok(Json(goal))
}

async fn dashboard(State(handle): State<HubHandle>) -> Json<DashboardStats> {
    Json(handle.with_hub(|hub| hub.dashboard()))
}

async fn set_connectivity(
    State(handle): State<HubHandle>,
    Json(request): Json<ConnectivityRequest>,
) -> Json<ConnectivityResponse> {
    let response = handle.with_hub(|hub| ConnectivityResponse {
        changed: hub.set_online(request.online),
        online: hub.is_online(),
        pending_offline_actions: hub.queue().len(),
    });
    Json(response)
}

async fn fire_sync(
    State(handle): State<HubHandle>,
    Path(tag): Path<String>,
) -> Result<Json<SyncResponse>, ApiError> {
    let scope = SyncScope::from_tag(&tag)
        .ok_or_else(|| ApiError::NotFound(format!("Unknown sync tag '{}'", tag)))?;
    let report = handle.with_hub(|hub| hub.replay(scope));
    Ok(Json(SyncResponse { tag, report }))
}

async fn health(State(handle): State<HubHandle>) -> Json<HealthResponse> {
    let response = handle.read(|hub| HealthResponse {
        status: "ok",
        online: hub.is_online(),
        pending_offline_actions: hub.queue().len(),
        warnings: hub.warnings(),
    });
    Json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::hub::{FocusHub, HubSettings};
    use crate::offline::NoopSyncRegistrar;
    use crate::store::PersistentStore;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_handle(clock: &ManualClock) -> HubHandle {
        let hub = FocusHub::open(
            PersistentStore::in_memory(),
            Arc::new(clock.clone()),
            Arc::new(NoopSyncRegistrar),
            HubSettings::default(),
        );
        HubHandle::new(hub, Duration::from_millis(50))
    }

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap())
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(handle: &HubHandle, request: Request<Body>) -> (StatusCode, Value) {
        let response = router(handle.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_timer_routes() {
        let clock = clock();
        let handle = test_handle(&clock);

        let (status, body) = send(&handle, empty_request("GET", "/timer")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["phase"], "idle");
        assert_eq!(body["display"], "25:00");
        assert!(body["badge"].is_null());

        let (_, body) = send(&handle, empty_request("POST", "/timer/start")).await;
        assert_eq!(body["timer"]["phase"], "running");
        assert!(body["recorded"].is_null());

        clock.advance_secs(90);
        let (_, body) = send(&handle, empty_request("GET", "/timer")).await;
        assert_eq!(body["timeLeftSeconds"], 1410);
        assert_eq!(body["badge"], "23:30");

        let (_, body) = send(&handle, empty_request("POST", "/timer/reset")).await;
        assert_eq!(body["timer"]["phase"], "idle");
        assert_eq!(body["recorded"]["duration"], 90);
        assert_eq!(body["recorded"]["completed"], false);
        handle.stop();
    }

    #[tokio::test]
    async fn test_duration_validation_is_422() {
        let handle = test_handle(&clock());

        let (status, body) = send(
            &handle,
            json_request("PUT", "/timer/duration", serde_json::json!({ "minutes": 90 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].as_str().unwrap().contains("between 1 and 60"));

        let (status, body) = send(
            &handle,
            json_request("PUT", "/timer/duration", serde_json::json!({ "minutes": 50 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["timer"]["timeLeftSeconds"], 3000);
    }

    #[tokio::test]
    async fn test_task_routes() {
        let handle = test_handle(&clock());

        let (status, body) = send(
            &handle,
            json_request("POST", "/tasks", serde_json::json!({ "title": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Task title is required");

        let (status, created) = send(
            &handle,
            json_request(
                "POST",
                "/tasks",
                serde_json::json!({ "title": "Buy milk", "priority": "high" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (_, listed) = send(&handle, empty_request("GET", "/tasks?priority=high")).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        let (_, listed) = send(&handle, empty_request("GET", "/tasks?priority=low")).await;
        assert!(listed.as_array().unwrap().is_empty());

        let (status, toggled) =
            send(&handle, empty_request("POST", &format!("/tasks/{}/toggle", id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["completed"], true);

        let (status, patched) = send(
            &handle,
            json_request(
                "PATCH",
                &format!("/tasks/{}", id),
                serde_json::json!({ "title": "Buy oat milk" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["title"], "Buy oat milk");

        let (status, _) = send(&handle, empty_request("DELETE", &format!("/tasks/{}", id))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        // Unknown ids are no-ops
        let (status, _) = send(&handle, empty_request("POST", "/tasks/nope/toggle")).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_goal_routes() {
        let handle = test_handle(&clock());

        let (_, body) = send(&handle, empty_request("GET", "/goals/today")).await;
        assert_eq!(body["targetMinutes"], 60);
        assert_eq!(body["isDefault"], true);

        let (status, _) = send(
            &handle,
            json_request(
                "PUT",
                "/goals",
                serde_json::json!({ "date": "2026-03-01", "targetMinutes": 0 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        for minutes in [30, 45] {
            let (status, _) = send(
                &handle,
                json_request(
                    "PUT",
                    "/goals",
                    serde_json::json!({ "date": "2026-03-01", "targetMinutes": minutes }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, body) = send(&handle, empty_request("GET", "/goals/today")).await;
        assert_eq!(body["targetMinutes"], 45);
        assert_eq!(body["isDefault"], false);
        assert_eq!(handle.read(|hub| hub.data().goals().len()), 1);
    }

    #[tokio::test]
    async fn test_dashboard_and_sessions() {
        let clock = clock();
        let handle = test_handle(&clock);

        send(&handle, empty_request("POST", "/timer/start")).await;
        clock.advance_secs(25 * 60);

        let (_, sessions) = send(&handle, empty_request("GET", "/sessions/today")).await;
        assert_eq!(sessions.as_array().unwrap().len(), 1);
        assert_eq!(sessions[0]["duration"], 1500);

        let (_, stats) = send(&handle, empty_request("GET", "/dashboard")).await;
        assert_eq!(stats["completedSessionsToday"], 1);
        assert_eq!(stats["focusedMinutes"], 25);
        assert_eq!(stats["remainingMinutes"], 35);
        let percent = stats["goalPercent"].as_f64().unwrap();
        assert!((percent - 25.0 / 60.0 * 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_duration_change_reports_missed_completion() {
        let clock = clock();
        // The ticker must not complete the run before the request does
        let hub = FocusHub::open(
            PersistentStore::in_memory(),
            Arc::new(clock.clone()),
            Arc::new(NoopSyncRegistrar),
            HubSettings::default(),
        );
        let handle = HubHandle::new(hub, Duration::from_secs(3600));

        send(&handle, json_request("PUT", "/timer/duration", serde_json::json!({ "minutes": 1 }))).await;
        send(&handle, empty_request("POST", "/timer/start")).await;
        clock.advance_secs(120);

        let (status, body) = send(
            &handle,
            json_request("PUT", "/timer/duration", serde_json::json!({ "minutes": 30 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recorded"]["duration"], 60);
        assert_eq!(body["recorded"]["completed"], true);
        assert_eq!(body["timer"]["timeLeftSeconds"], 1800);
        handle.stop();
    }

    #[tokio::test]
    async fn test_connectivity_and_sync_routes() {
        let handle = test_handle(&clock());

        let (_, body) = send(
            &handle,
            json_request("POST", "/connectivity", serde_json::json!({ "online": false })),
        )
        .await;
        assert_eq!(body["changed"], true);
        assert_eq!(body["online"], false);

        send(
            &handle,
            json_request("POST", "/tasks", serde_json::json!({ "title": "Offline task" })),
        )
        .await;

        let (_, body) = send(&handle, empty_request("POST", "/sync/sync-tasks")).await;
        assert!(body["report"].is_null());

        let (_, body) = send(
            &handle,
            json_request("POST", "/connectivity", serde_json::json!({ "online": true })),
        )
        .await;
        assert_eq!(body["pendingOfflineActions"], 1);

        let (status, body) = send(&handle, empty_request("POST", "/sync/sync-tasks")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["report"]["confirmed"], 1);

        let (status, _) = send(&handle, empty_request("POST", "/sync/sync-widgets")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_reports_warnings() {
        let handle = test_handle(&clock());
        let (status, body) = send(&handle, empty_request("GET", "/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert!(body["warnings"].as_array().unwrap().is_empty());
    }
}
