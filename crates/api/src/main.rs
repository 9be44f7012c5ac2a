use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wealthdesk_core::config::Settings;
use wealthdesk_core::domain::{
    Action, Advance, Blueprint, BlueprintStatus, Client, ExecutionStatus, ExecutionTicket,
    Recommendation, RecommendationStatus, StructuringCase, StructuringStatus,
};
use wealthdesk_core::fixtures::Seed;
use wealthdesk_core::remote::{ErrorBody, RoleBody, StatusBody};
use wealthdesk_core::store::{
    DashboardStore, EntityKind, RecommendationAdvance, RecommendationUpdate, StoreError,
    StoreEvent, StoreSnapshot,
};
use wealthdesk_core::time::clock::SystemClock;
use wealthdesk_core::views::{self, Dashboard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let state = AppState::load(&settings).inspect_err(|e| {
        sentry_anyhow::capture_anyhow(e);
        tracing::error!(error = %e, "seed load failed");
    })?;
    tokio::spawn(log_store_events(state.store.lock().await.subscribe()));

    let app = app(state).layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/state", get(get_state))
        .route("/role", get(get_role).put(put_role))
        .route("/dashboard", get(get_dashboard))
        .route("/reset", post(reset))
        .route("/clients", get(list_clients))
        .route("/blueprints", get(list_blueprints))
        .route("/blueprints/:id/status", put(put_blueprint_status))
        .route("/blueprints/:id/advance", post(advance_blueprint))
        .route("/recommendations", get(list_recommendations))
        .route("/recommendations/:id/status", put(put_recommendation_status))
        .route("/recommendations/:id/advance", post(advance_recommendation))
        .route(
            "/recommendations/:id/tickets",
            get(list_recommendation_tickets).post(create_execution_ticket),
        )
        .route("/structuring", get(list_structuring))
        .route("/structuring/:id/status", put(put_structuring_status))
        .route("/structuring/:id/advance", post(advance_structuring))
        .route("/executions", get(list_executions))
        .route("/executions/:id/status", put(put_execution_status))
        .route("/executions/:id/advance", post(advance_execution))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Clone)]
struct AppState {
    store: Arc<Mutex<DashboardStore>>,
    seed: Arc<Seed>,
}

impl AppState {
    /// Builds the store from the configured seed. A configured seed that fails to
    /// load is an error; `/reset` reseeds from the same records.
    fn load(settings: &Settings) -> anyhow::Result<Self> {
        let seed = settings.load_seed()?;
        let store = DashboardStore::new(seed.clone(), Arc::new(SystemClock))?;
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            seed: Arc::new(seed),
        })
    }
}

type ApiError = (StatusCode, Json<ErrorBody>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn store_error(err: StoreError) -> ApiError {
    let status = match &err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::DuplicateTicket { .. } | StoreError::NotExecuting { .. } => {
            StatusCode::CONFLICT
        }
        StoreError::Forbidden { .. } => StatusCode::FORBIDDEN,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

fn internal_error(err: anyhow::Error) -> ApiError {
    sentry_anyhow::capture_anyhow(&err);
    tracing::error!(error = %err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: format!("{err:#}"),
        }),
    )
}

async fn get_state(State(state): State<AppState>) -> Json<StoreSnapshot> {
    Json(state.store.lock().await.snapshot())
}

async fn get_role(State(state): State<AppState>) -> Json<RoleBody> {
    Json(RoleBody {
        role: state.store.lock().await.current_role(),
    })
}

async fn put_role(State(state): State<AppState>, Json(body): Json<RoleBody>) -> Json<RoleBody> {
    state.store.lock().await.set_current_role(body.role);
    Json(body)
}

#[derive(Debug, Deserialize)]
struct DashboardQuery {
    client_id: Option<String>,
}

async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> ApiResult<Dashboard> {
    let store = state.store.lock().await;
    let snapshot = store.snapshot();
    views::dashboard(&snapshot, store.current_role(), query.client_id.as_deref())
        .map(Json)
        .map_err(store_error)
}

async fn reset(State(state): State<AppState>) -> ApiResult<StoreSnapshot> {
    let mut store = state.store.lock().await;
    store.authorize(Action::ResetDemo).map_err(store_error)?;
    store
        .reset(state.seed.as_ref().clone())
        .map_err(internal_error)?;
    Ok(Json(store.snapshot()))
}

async fn list_clients(State(state): State<AppState>) -> Json<Vec<Client>> {
    Json(state.store.lock().await.clients().to_vec())
}

async fn list_blueprints(State(state): State<AppState>) -> Json<Vec<Blueprint>> {
    Json(state.store.lock().await.blueprints().to_vec())
}

async fn list_recommendations(State(state): State<AppState>) -> Json<Vec<Recommendation>> {
    Json(state.store.lock().await.recommendations().to_vec())
}

async fn list_structuring(State(state): State<AppState>) -> Json<Vec<StructuringCase>> {
    Json(state.store.lock().await.structuring_cases().to_vec())
}

async fn list_executions(State(state): State<AppState>) -> Json<Vec<ExecutionTicket>> {
    Json(state.store.lock().await.execution_tickets().to_vec())
}

async fn list_recommendation_tickets(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<ExecutionTicket>> {
    let store = state.store.lock().await;
    if store.recommendation(&id).is_none() {
        return Err(store_error(StoreError::NotFound {
            kind: EntityKind::Recommendation,
            id,
        }));
    }
    Ok(Json(
        store
            .tickets_for_recommendation(&id)
            .into_iter()
            .cloned()
            .collect(),
    ))
}

async fn put_blueprint_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody<BlueprintStatus>>,
) -> ApiResult<Blueprint> {
    let mut store = state.store.lock().await;
    store.authorize(Action::OverrideStatus).map_err(store_error)?;
    store
        .update_blueprint_status(&id, body.status)
        .map(Json)
        .map_err(store_error)
}

async fn put_recommendation_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody<RecommendationStatus>>,
) -> ApiResult<RecommendationUpdate> {
    let mut store = state.store.lock().await;
    store.authorize(Action::OverrideStatus).map_err(store_error)?;
    store
        .update_recommendation_status(&id, body.status)
        .map(Json)
        .map_err(store_error)
}

async fn put_structuring_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody<StructuringStatus>>,
) -> ApiResult<StructuringCase> {
    let mut store = state.store.lock().await;
    store.authorize(Action::OverrideStatus).map_err(store_error)?;
    store
        .update_structuring_status(&id, body.status)
        .map(Json)
        .map_err(store_error)
}

async fn put_execution_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody<ExecutionStatus>>,
) -> ApiResult<ExecutionTicket> {
    let mut store = state.store.lock().await;
    store.authorize(Action::OverrideStatus).map_err(store_error)?;
    store
        .update_execution_status(&id, body.status)
        .map(Json)
        .map_err(store_error)
}

async fn advance_blueprint(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Advance<BlueprintStatus>> {
    let mut store = state.store.lock().await;
    store
        .authorize_advance(EntityKind::Blueprint, &id)
        .map_err(store_error)?;
    store.advance_blueprint(&id).map(Json).map_err(store_error)
}

async fn advance_recommendation(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<RecommendationAdvance> {
    let mut store = state.store.lock().await;
    store
        .authorize_advance(EntityKind::Recommendation, &id)
        .map_err(store_error)?;
    store
        .advance_recommendation(&id)
        .map(Json)
        .map_err(store_error)
}

async fn advance_structuring(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Advance<StructuringStatus>> {
    let mut store = state.store.lock().await;
    store
        .authorize_advance(EntityKind::StructuringCase, &id)
        .map_err(store_error)?;
    store.advance_structuring(&id).map(Json).map_err(store_error)
}

async fn advance_execution(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Advance<ExecutionStatus>> {
    let mut store = state.store.lock().await;
    store
        .authorize_advance(EntityKind::ExecutionTicket, &id)
        .map_err(store_error)?;
    store.advance_execution(&id).map(Json).map_err(store_error)
}

async fn create_execution_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ExecutionTicket>), ApiError> {
    let mut store = state.store.lock().await;
    store
        .authorize(Action::CreateExecutionTicket)
        .map_err(store_error)?;
    let ticket = store.create_execution_ticket(&id).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

async fn log_store_events(mut rx: broadcast::Receiver<StoreEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => tracing::debug!(revision = event.revision(), ?event, "store event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "store event log lagged")
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use wealthdesk_core::domain::Role;
    use wealthdesk_core::remote::{DashboardClient, HttpDashboardClient};

    fn settings() -> Settings {
        Settings {
            sentry_dsn: None,
            seed_path: None,
            default_role: None,
            api_url: None,
        }
    }

    fn state() -> AppState {
        AppState::load(&settings()).unwrap()
    }

    #[test]
    fn unloadable_seed_fails_startup() {
        let settings = Settings {
            seed_path: Some("/nonexistent/wealthdesk-seed.json".to_string()),
            ..settings()
        };
        assert!(AppState::load(&settings).is_err());
    }

    #[tokio::test]
    async fn configured_seed_is_served_and_reset_to() {
        let mut seed = Seed::demo();
        seed.clients.truncate(1);
        let path = std::env::temp_dir().join(format!(
            "wealthdesk-api-seed-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, serde_json::to_string(&seed).unwrap()).unwrap();

        let settings = Settings {
            seed_path: Some(path.to_string_lossy().into_owned()),
            default_role: Some("admin".to_string()),
            ..settings()
        };
        let state = AppState::load(&settings).unwrap();
        std::fs::remove_file(&path).ok();

        let (_, body) = call(&state, Method::POST, "/reset", None).await;
        assert_eq!(body["clients"].as_array().unwrap().len(), 1);
        assert_eq!(body["current_role"], "administrator");
    }

    async fn call(
        state: &AppState,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let body = match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        };
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();

        let res = app(state.clone()).oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn set_role(state: &AppState, role: &str) {
        let (status, _) = call(state, Method::PUT, "/role", Some(json!({ "role": role }))).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn healthz_ok() {
        let state = state();
        let req = Request::builder().uri("/healthz").body(Body::empty()).unwrap();
        let res = app(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn state_lists_all_collections() {
        let state = state();
        let (status, body) = call(&state, Method::GET, "/state", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["current_role"], "relationship_manager");
        assert_eq!(body["clients"].as_array().unwrap().len(), 4);
        assert_eq!(body["execution_tickets"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn role_round_trips_with_short_form() {
        let state = state();
        set_role(&state, "fa").await;
        let (_, body) = call(&state, Method::GET, "/role", None).await;
        assert_eq!(body["role"], "financial_advisor");
    }

    #[tokio::test]
    async fn recommendation_execution_returns_ticket() {
        let state = state();
        set_role(&state, "fa").await;
        let (status, body) =
            call(&state, Method::POST, "/recommendations/rec-001/advance", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["advance"]["outcome"], "moved");
        assert_eq!(body["recommendation"]["status"], "executing");
        assert_eq!(body["ticket"]["recommendation_id"], "rec-001");
        assert_eq!(body["ticket"]["status"], "created");

        let (status, body) =
            call(&state, Method::GET, "/recommendations/rec-001/tickets", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) =
            call(&state, Method::POST, "/recommendations/rec-001/tickets", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn draft_recommendation_ticket_is_409() {
        let state = state();
        set_role(&state, "fa").await;
        let (status, body) =
            call(&state, Method::POST, "/recommendations/rec-003/tickets", None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["error"].as_str().unwrap().contains("is draft"));

        let (_, body) = call(&state, Method::GET, "/recommendations/rec-003/tickets", None).await;
        assert!(body.as_array().unwrap().is_empty());

        // Approve as RM, execute as FA; the ticket arrives with the transition.
        set_role(&state, "rm").await;
        call(&state, Method::POST, "/recommendations/rec-003/advance", None).await;
        set_role(&state, "fa").await;
        let (status, body) =
            call(&state, Method::POST, "/recommendations/rec-003/advance", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticket"]["recommendation_id"], "rec-003");
    }

    #[tokio::test]
    async fn forbidden_action_is_403() {
        let state = state();
        let (status, body) = call(&state, Method::POST, "/executions/EXE-001/advance", None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert!(body["error"].as_str().unwrap().contains("not permitted"));
    }

    #[tokio::test]
    async fn unknown_id_is_404() {
        let state = state();
        let (status, _) = call(&state, Method::POST, "/blueprints/bp-404/advance", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        set_role(&state, "admin").await;
        let (status, _) = call(
            &state,
            Method::PUT,
            "/executions/EXE-404/status",
            Some(json!({ "status": "confirmed" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_override_confirms_ticket() {
        let state = state();
        set_role(&state, "admin").await;
        let (status, body) = call(
            &state,
            Method::PUT,
            "/executions/EXE-001/status",
            Some(json!({ "status": "confirmed" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "confirmed");
        assert!(body["confirmed_at"].is_string());
    }

    #[tokio::test]
    async fn structuring_override_accepts_hyphenated_status() {
        let state = state();
        set_role(&state, "admin").await;
        let (status, body) = call(
            &state,
            Method::PUT,
            "/structuring/sc-002/status",
            Some(json!({ "status": "in-progress" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "in_progress");
    }

    #[tokio::test]
    async fn unknown_status_is_rejected() {
        let state = state();
        set_role(&state, "admin").await;
        let (status, _) = call(
            &state,
            Method::PUT,
            "/blueprints/bp-002/status",
            Some(json!({ "status": "archived" })),
        )
        .await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn terminal_advance_is_a_no_op() {
        let state = state();
        let (status, body) = call(&state, Method::POST, "/blueprints/bp-001/advance", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "terminal");
        assert_eq!(body["status"], "active");
    }

    #[tokio::test]
    async fn dashboard_follows_active_role() {
        let state = state();
        set_role(&state, "client").await;
        let (status, body) = call(&state, Method::GET, "/dashboard?client_id=c-003", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["client_id"], "c-003");
        assert_eq!(body["total_aum"], 65_200_000);
        assert!(body["work_items"].as_array().unwrap().is_empty());

        let (status, _) = call(&state, Method::GET, "/dashboard?client_id=nobody", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn reset_restores_seed() {
        let state = state();
        call(&state, Method::POST, "/blueprints/bp-002/advance", None).await;
        set_role(&state, "admin").await;

        let (status, body) = call(&state, Method::POST, "/reset", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["blueprints"][1]["status"], "draft");
        assert_eq!(body["current_role"], "relationship_manager");
    }

    async fn serve(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn http_client_drives_recommendation_over_the_wire() {
        let url = serve(state()).await;
        let client = HttpDashboardClient::new(&url).unwrap();

        let snapshot = client.snapshot().await.unwrap();
        assert_eq!(snapshot.current_role, Role::RelationshipManager);
        assert_eq!(snapshot.execution_tickets.len(), 2);

        let step = client.advance_recommendation("rec-003").await.unwrap();
        assert_eq!(step.recommendation.status, RecommendationStatus::Approved);
        assert!(step.ticket.is_none());

        client.set_role(Role::FinancialAdvisor).await.unwrap();
        let step = client.advance_recommendation("rec-003").await.unwrap();
        assert_eq!(step.recommendation.status, RecommendationStatus::Executing);
        let ticket = step.ticket.unwrap();
        assert_eq!(ticket.recommendation_id, "rec-003");

        client.set_role(Role::Administrator).await.unwrap();
        for _ in 0..3 {
            client.advance_execution(&ticket.id).await.unwrap();
        }
        let done = client.advance_execution(&ticket.id).await.unwrap();
        assert_eq!(
            done,
            Advance::Terminal {
                status: ExecutionStatus::Confirmed
            }
        );

        client.reset().await.unwrap();
        let snapshot = client.snapshot().await.unwrap();
        assert_eq!(snapshot.execution_tickets.len(), 2);
    }

    #[tokio::test]
    async fn http_client_surfaces_error_bodies() {
        let url = serve(state()).await;
        let client = HttpDashboardClient::new(&url).unwrap();

        let err = client.advance_execution("EXE-001").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("403"), "{msg}");
        assert!(msg.contains("not permitted"), "{msg}");

        let err = client.advance_blueprint("bp-404").await.unwrap_err();
        assert!(err.to_string().contains("blueprint not found"));

        // Non-admin reset is refused without touching state.
        assert!(client.reset().await.is_err());
    }

    #[tokio::test]
    async fn http_client_gives_up_on_unreachable_api() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap();
        let client = HttpDashboardClient::new(&format!("http://{addr}")).unwrap();

        let err = client.snapshot().await.unwrap_err();
        assert!(err.to_string().contains("GET /state failed"));
    }
}
