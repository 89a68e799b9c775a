//! Tracking API Routes
//!
//! Thin layer over the engine handle: reads come from the latest published
//! snapshot, writes become engine commands.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracking_core::grouping::GroupCount;
use tracking_core::status::StatusBoard;
use tracking_core::warnings::WarningPanel;
use tracking_core::{
    ClearSignal, EngineHandle, GroupId, SelectionOrigin, TrackedObject, TrackingError,
    ViewSnapshot,
};

#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
    /// Handed to the clear route explicitly
    pub clear: ClearSignal,
}

impl AppState {
    pub fn new(engine: EngineHandle) -> Self {
        let clear = engine.clear_signal();
        Self { engine, clear }
    }
}

type ApiResult<T> = Result<Json<T>, (StatusCode, String)>;

fn api_error(err: TrackingError) -> (StatusCode, String) {
    let status = match &err {
        TrackingError::ObjectNotFound(_) => StatusCode::NOT_FOUND,
        TrackingError::EngineClosed => StatusCode::SERVICE_UNAVAILABLE,
        TrackingError::MissingCredential => StatusCode::UNAUTHORIZED,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, err.to_string())
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct SelectRequest {
    /// Object id or name
    pub object: String,
    #[serde(default)]
    pub from_warning: bool,
    pub origin: Option<SelectionOrigin>,
}

#[derive(Serialize)]
pub struct SelectResponse {
    pub selected: TrackedObject,
    pub origin: SelectionOrigin,
}

#[derive(Deserialize)]
pub struct IsolationRequest {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

/// Partial filter update; absent fields are left alone
#[derive(Deserialize, Default)]
pub struct FiltersUpdate {
    pub show_debris: Option<bool>,
    pub show_all: Option<bool>,
    pub visible_groups: Option<Vec<String>>,
    pub toggle_group: Option<String>,
}

#[derive(Serialize)]
pub struct GroupsResponse {
    pub groups: Vec<GroupCount>,
    pub visible: BTreeSet<GroupId>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: StatusBoard,
    pub notices: Vec<String>,
}

#[derive(Serialize)]
pub struct Accepted {
    pub accepted: bool,
    pub message: String,
}

impl Accepted {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            accepted: true,
            message: message.into(),
        })
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /view - Full render snapshot
pub async fn get_view(State(state): State<AppState>) -> Json<ViewSnapshot> {
    Json(state.engine.snapshot().as_ref().clone())
}

/// GET /groups - Group counts and the active group filter
pub async fn get_groups(State(state): State<AppState>) -> Json<GroupsResponse> {
    let view = state.engine.snapshot();
    Json(GroupsResponse {
        groups: view.groups.clone(),
        visible: view.filters.visible_groups.clone(),
    })
}

/// GET /warnings - Conjunction panel
pub async fn get_warnings(State(state): State<AppState>) -> Json<WarningPanel> {
    Json(state.engine.snapshot().warnings.clone())
}

/// GET /status - Feed and sync indicators with their inline messages
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let view = state.engine.snapshot();
    Json(StatusResponse {
        status: view.status.clone(),
        notices: view.notices.clone(),
    })
}

/// POST /selection - Inspect an object
pub async fn select_object(
    State(state): State<AppState>,
    Json(req): Json<SelectRequest>,
) -> ApiResult<SelectResponse> {
    let origin = match (req.from_warning, req.origin) {
        (true, _) => SelectionOrigin::Warning,
        (false, Some(origin)) => origin,
        (false, None) => SelectionOrigin::List,
    };

    let selected = state
        .engine
        .select_by_name(&req.object, origin)
        .await
        .map_err(api_error)?;

    Ok(Json(SelectResponse { selected, origin }))
}

/// DELETE /selection - Clear selection and recentre
pub async fn clear_selection(State(state): State<AppState>) -> ApiResult<Accepted> {
    state.clear.raise().await.map_err(api_error)?;
    Ok(Accepted::new("Selection cleared"))
}

/// PUT /selection/isolation - Show the full set while keeping the highlight
pub async fn set_isolation(
    State(state): State<AppState>,
    Json(req): Json<IsolationRequest>,
) -> ApiResult<Accepted> {
    state
        .engine
        .set_isolation(req.enabled)
        .await
        .map_err(api_error)?;
    Ok(Accepted::new(if req.enabled {
        "Isolation enabled"
    } else {
        "Isolation disabled"
    }))
}

/// PUT /filters - Debris, focus mode and group visibility
pub async fn update_filters(
    State(state): State<AppState>,
    Json(req): Json<FiltersUpdate>,
) -> ApiResult<Accepted> {
    let groups = req
        .visible_groups
        .map(|names| {
            names
                .iter()
                .map(|name| name.parse::<GroupId>())
                .collect::<Result<BTreeSet<_>, _>>()
        })
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;
    let toggle = req
        .toggle_group
        .map(|name| name.parse::<GroupId>())
        .transpose()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let engine = &state.engine;
    if let Some(show) = req.show_debris {
        engine.set_show_debris(show).await.map_err(api_error)?;
    }
    if let Some(show) = req.show_all {
        engine.set_show_all(show).await.map_err(api_error)?;
    }
    if let Some(groups) = groups {
        engine.set_visible_groups(groups).await.map_err(api_error)?;
    }
    if let Some(group) = toggle {
        engine.toggle_group(group).await.map_err(api_error)?;
    }

    Ok(Accepted::new("Filters updated"))
}

/// PUT /search - Raw search text; applied after the debounce delay
pub async fn set_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> ApiResult<Accepted> {
    state.engine.set_search(req.query).await.map_err(api_error)?;
    Ok(Accepted::new("Search queued"))
}

/// POST /sync - Ask the producer to re-download its data
pub async fn sync(State(state): State<AppState>) -> ApiResult<Accepted> {
    state.engine.sync().await.map_err(api_error)?;
    Ok(Accepted::new(
        "Sync requested, data changes on the next refresh",
    ))
}

/// POST /refresh - Refresh both feeds now
pub async fn refresh(State(state): State<AppState>) -> ApiResult<Accepted> {
    state.engine.refresh_catalog().await.map_err(api_error)?;
    state.engine.refresh_warnings().await.map_err(api_error)?;
    Ok(Accepted::new("Refresh issued"))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let view = state.engine.snapshot();
    Json(serde_json::json!({
        "status": if view.status.has_error() { "degraded" } else { "healthy" },
        "service": "orbital-gateway",
        "tracking": view.catalog_size,
        "time": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

pub fn tracking_routes(state: AppState) -> Router {
    Router::new()
        .route("/view", get(get_view))
        .route("/groups", get(get_groups))
        .route("/warnings", get(get_warnings))
        .route("/status", get(get_status))
        .route("/selection", post(select_object).delete(clear_selection))
        .route("/selection/isolation", put(set_isolation))
        .route("/filters", put(update_filters))
        .route("/search", put(set_search))
        .route("/sync", post(sync))
        .route("/refresh", post(refresh))
        .with_state(state)
}

/// Full application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .with_state(state.clone())
        .nest("/api/v1", tracking_routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use tracking_core::selection::RawPathPoint;
    use tracking_core::warnings::WarningFeed;
    use tracking_core::{TrackingConfig, TrackingEngine, TrackingFeeds};

    struct FixedFeeds;

    #[async_trait]
    impl TrackingFeeds for FixedFeeds {
        async fn fetch_objects(&self) -> tracking_core::Result<Vec<Value>> {
            Ok(vec![
                json!({"id": 25544, "name": "ISS (ZARYA)", "latitude": 51.6, "longitude": -0.1, "altitude": 420.0}),
                json!({"id": 44713, "name": "STARLINK-1007", "latitude": 10.0, "longitude": 20.0, "altitude": 550000.0}),
                json!({"id": 34427, "name": "COSMOS 2251 DEB", "type": "DEBRIS", "latitude": -5.0, "longitude": 40.0, "altitude": 790.0}),
            ])
        }

        async fn fetch_warnings(&self) -> tracking_core::Result<WarningFeed> {
            Ok(WarningFeed {
                warning_count: Some(1),
                conjunctions: vec![json!({
                    "object": "COSMOS 2251 DEB", "type": "DEBRIS", "distance": 3.2,
                    "timeOfApproach": "2026-03-01T12:00:00Z", "hoursFromNow": 1.5
                })],
            })
        }

        async fn fetch_path(&self, _id: &str, _hours: u32) -> tracking_core::Result<Vec<RawPathPoint>> {
            Ok(vec![RawPathPoint {
                latitude: 1.0,
                longitude: 2.0,
                altitude: 420.0,
            }])
        }

        async fn trigger_sync(&self) -> tracking_core::Result<()> {
            Ok(())
        }
    }

    async fn test_app() -> (Router, EngineHandle) {
        let config = TrackingConfig::new().search_debounce_ms(0);
        let (engine, _task) = TrackingEngine::spawn(config, FixedFeeds);
        engine
            .wait_for(|v| v.catalog_loaded && v.warnings.total == 1)
            .await
            .unwrap();
        (app(AppState::new(engine.clone())), engine)
    }

    async fn call(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(match body {
                Some(body) => Body::from(body.to_string()),
                None => Body::empty(),
            })
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _) = test_app().await;
        let (status, body) = call(&app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tracking"], 3);
    }

    #[tokio::test]
    async fn test_view_in_focus_mode() {
        let (app, _) = test_app().await;
        let (status, body) = call(&app, Method::GET, "/api/v1/view", None).await;
        assert_eq!(status, StatusCode::OK);

        let names: Vec<&str> = body["points"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["ISS (ZARYA)", "COSMOS 2251 DEB"]);
        assert_eq!(body["points"][1]["color"], "#ff0055");
    }

    #[tokio::test]
    async fn test_warnings_panel() {
        let (app, _) = test_app().await;
        let (_, body) = call(&app, Method::GET, "/api/v1/warnings", None).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["has_critical"], true);
        assert_eq!(body["entries"][0]["object"], "COSMOS 2251 DEB");
    }

    #[tokio::test]
    async fn test_select_and_clear() {
        let (app, engine) = test_app().await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/v1/selection",
            Some(json!({"object": "STARLINK-1007"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["selected"]["id"], "44713");

        let view = engine.wait_for(|v| v.selection.path.is_some()).await.unwrap();
        assert_eq!(view.tracked, 1);
        assert_eq!(view.selection.color, Some("#00ffff"));

        let (status, _) = call(&app, Method::DELETE, "/api/v1/selection", None).await;
        assert_eq!(status, StatusCode::OK);
        let view = engine.wait_for(|v| v.selection.object.is_none()).await.unwrap();
        assert_eq!(view.camera.altitude, 2.5);
    }

    #[tokio::test]
    async fn test_select_from_warning_uses_danger_color() {
        let (app, engine) = test_app().await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/selection",
            Some(json!({"object": "34427", "from_warning": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let view = engine.wait_for(|v| v.selection.path.is_some()).await.unwrap();
        assert!(view.selection.is_warning_path);
        assert_eq!(view.selection.path.as_ref().unwrap().color, "#ff0055");
    }

    #[tokio::test]
    async fn test_select_unknown_object() {
        let (app, _) = test_app().await;
        let (status, _) = call(
            &app,
            Method::POST,
            "/api/v1/selection",
            Some(json!({"object": "NOPE"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_filters_update() {
        let (app, engine) = test_app().await;
        let (status, _) = call(
            &app,
            Method::PUT,
            "/api/v1/filters",
            Some(json!({"show_all": true, "show_debris": false})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let view = engine
            .wait_for(|v| v.filters.show_all && !v.filters.show_debris)
            .await
            .unwrap();
        assert_eq!(view.tracked, 2);
    }

    #[tokio::test]
    async fn test_bad_group_rejected() {
        let (app, _) = test_app().await;
        let (status, _) = call(
            &app,
            Method::PUT,
            "/api/v1/filters",
            Some(json!({"visible_groups": ["spacex", "klingon"]})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_groups_and_search() {
        let (app, engine) = test_app().await;
        let (_, body) = call(&app, Method::GET, "/api/v1/groups", None).await;
        assert_eq!(body["groups"].as_array().unwrap().len(), 3);

        call(&app, Method::PUT, "/api/v1/filters", Some(json!({"show_all": true}))).await;
        let (status, _) = call(
            &app,
            Method::PUT,
            "/api/v1/search",
            Some(json!({"query": "starlink"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let view = engine
            .wait_for(|v| v.filters.debounced_query == "starlink")
            .await
            .unwrap();
        assert_eq!(view.tracked, 1);
    }

    #[tokio::test]
    async fn test_sync() {
        let (app, engine) = test_app().await;
        let (status, body) = call(&app, Method::POST, "/api/v1/sync", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["accepted"], true);

        engine
            .wait_for(|v| {
                matches!(
                    v.status.sync,
                    tracking_core::status::SyncStatus::Requested { .. }
                )
            })
            .await
            .unwrap();

        let (status, body) = call(&app, Method::GET, "/api/v1/status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["sync"]["state"], "requested");
        assert_eq!(body["objects"]["state"], "ready");
        assert_eq!(body["notices"].as_array().unwrap().len(), 1);
        assert!(body["notices"][0].as_str().unwrap().contains("next refresh"));
    }
}
