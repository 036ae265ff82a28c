use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

use tracing::{error, info};

use tower_http::services::ServeDir;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{caller::Caller, log_requests, metrics, state::*, ServerConfig};
use crate::config::DiscoverySettings;
use crate::pipeline::{normalized_key, PipelineError, QualityPolicy, Seed};
use crate::swipe_session::{SessionError, SwipeAction};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: &'static str,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = match &self {
            SessionError::NotFound(_) => StatusCode::NOT_FOUND,
            SessionError::Forbidden => StatusCode::FORBIDDEN,
            SessionError::Conflict(_) => StatusCode::CONFLICT,
            SessionError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SessionError::Store(err) => {
                error!("Session store failure: {:#}", err);
                return (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                    .into_response();
            }
        };
        (status, self.to_string()).into_response()
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, self.to_string()).into_response()
    }
}

#[derive(Deserialize, Debug, Default)]
struct CreateSessionBody {
    #[serde(default)]
    pub seed_ids: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct SwipeBody {
    pub action: SwipeAction,
    pub track_key: Option<String>,
    pub artist: Option<String>,
    pub title: Option<String>,
}

impl SwipeBody {
    /// Either an explicit key or one derived from artist and title.
    fn track_key(&self) -> Option<String> {
        match (&self.track_key, &self.artist, &self.title) {
            (Some(key), _, _) => Some(key.clone()),
            (None, Some(artist), Some(title)) => Some(normalized_key(artist, title)),
            _ => None,
        }
    }
}

#[derive(Deserialize, Debug, Default)]
struct ActiveSessionQuery {
    pub seeds: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct DiscoveryQuery {
    pub seeds: Option<String>,
    pub limit: Option<usize>,
    pub min_popularity: Option<u8>,
    pub require_preview: Option<bool>,
}

impl DiscoveryQuery {
    fn policy(&self) -> QualityPolicy {
        let default = QualityPolicy::default();
        QualityPolicy {
            require_preview: self.require_preview.unwrap_or(default.require_preview),
            min_popularity: self.min_popularity.unwrap_or(default.min_popularity),
        }
    }

    fn limit(&self, settings: &DiscoverySettings) -> usize {
        self.limit
            .unwrap_or(settings.default_limit)
            .min(settings.max_limit)
    }

    fn seeds(&self) -> Result<Vec<Seed>, PipelineError> {
        split_list(self.seeds.as_deref())
            .map(Seed::from_str)
            .collect()
    }
}

fn split_list(list: Option<&str>) -> impl Iterator<Item = &str> {
    list.unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
    };
    Json(stats)
}

async fn create_session(
    caller: Caller,
    State(sessions): State<GuardedSessionService>,
    Json(body): Json<CreateSessionBody>,
) -> Response {
    match sessions.create(&caller.user_id, body.seed_ids) {
        Ok(session) => (StatusCode::CREATED, Json(session)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_active_session(
    caller: Caller,
    State(sessions): State<GuardedSessionService>,
    Query(query): Query<ActiveSessionQuery>,
) -> Response {
    let seed_ids = split_list(query.seeds.as_deref())
        .map(String::from)
        .collect();
    match sessions.active_session(&caller.user_id, seed_ids) {
        Ok(session) => Json(session).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn list_sessions(
    caller: Caller,
    State(sessions): State<GuardedSessionService>,
) -> Response {
    match sessions.list_sessions(&caller.user_id) {
        Ok(list) => Json(list).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_session(
    caller: Caller,
    State(sessions): State<GuardedSessionService>,
    Path(id): Path<String>,
) -> Response {
    match sessions.get(&id, &caller.user_id) {
        Ok(session) => Json(session).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn record_swipe(
    caller: Caller,
    State(sessions): State<GuardedSessionService>,
    Path(id): Path<String>,
    Json(body): Json<SwipeBody>,
) -> Response {
    let Some(track_key) = body.track_key() else {
        return (
            StatusCode::BAD_REQUEST,
            "Either track_key or both artist and title are required",
        )
            .into_response();
    };
    match sessions.record_swipe(&id, &caller.user_id, body.action, &track_key) {
        Ok(session) => Json(session).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn complete_session(
    caller: Caller,
    State(sessions): State<GuardedSessionService>,
    Path(id): Path<String>,
) -> Response {
    match sessions.complete(&id, &caller.user_id) {
        Ok(session) => Json(session).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_discovery(
    caller: Caller,
    State(state): State<ServerState>,
    Query(query): Query<DiscoveryQuery>,
) -> Response {
    let seeds = match query.seeds() {
        Ok(seeds) => seeds,
        Err(err) => return err.into_response(),
    };
    let exclusion = match state.sessions.exclusion_set_for(&caller.user_id) {
        Ok(exclusion) => exclusion,
        Err(err) => return err.into_response(),
    };
    let limit = query.limit(&state.config.discovery);

    match state
        .pipeline
        .generate(
            seeds,
            Some(caller.user_id.as_str()),
            &exclusion,
            limit,
            query.policy(),
        )
        .await
    {
        Ok(candidates) => Json(candidates).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_discovery_feed(
    caller: Caller,
    State(state): State<ServerState>,
    Query(query): Query<DiscoveryQuery>,
) -> Response {
    let exclusion = match state.sessions.exclusion_set_for(&caller.user_id) {
        Ok(exclusion) => exclusion,
        Err(err) => return err.into_response(),
    };
    let limit = query.limit(&state.config.discovery);

    let candidates = state
        .pipeline
        .discover(&caller.user_id, &exclusion, limit, query.policy())
        .await;
    Json(candidates).into_response()
}

pub fn make_app(
    config: ServerConfig,
    pipeline: GuardedPipeline,
    sessions: GuardedSessionService,
) -> Router {
    let state = ServerState::new(config.clone(), pipeline, sessions);

    let session_routes: Router = Router::new()
        .route("/session", post(create_session))
        .route("/session/active", get(get_active_session))
        .route("/session/{id}", get(get_session).patch(record_swipe))
        .route("/session/{id}/complete", post(complete_session))
        .route("/sessions", get(list_sessions))
        .with_state(state.clone());

    let discovery_routes: Router = Router::new()
        .route("/discovery", get(get_discovery))
        .route("/discovery/feed", get(get_discovery_feed))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new().route("/", get(home)).with_state(state.clone()),
    };

    home_router
        .nest("/v1", session_routes.merge(discovery_routes))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            log_requests,
        ))
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics::metrics_handler))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

pub async fn run_server(
    config: ServerConfig,
    pipeline: GuardedPipeline,
    sessions: GuardedSessionService,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, pipeline, sessions);

    let metrics_listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, make_metrics_app()).await {
            error!("Metrics server failed: {}", err);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
