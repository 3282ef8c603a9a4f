//! Axum sync-trigger endpoints for Octagon.
//!
//! Every trigger answers HTTP 200 with the run report, whatever its outcome.
//! The error list is cut to [`ERROR_LIMIT`] entries; `totalErrors` keeps the
//! real count.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use octagon_storage::{PgStore, Store};
use octagon_sync::{
    maybe_build_scheduler, spawn_startup_sync, RosterSyncResult, SyncConfig, SyncResult, SyncServices,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;
use tracing::info;

pub const CRATE_NAME: &str = "octagon-web";
pub const ERROR_LIMIT: usize = 20;

#[derive(Clone)]
pub struct AppState {
    pub services: SyncServices,
    pub past_events_limit: usize,
}

impl AppState {
    pub fn new(services: SyncServices) -> Self {
        Self {
            services,
            past_events_limit: octagon_sync::DEFAULT_PAST_EVENTS_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct PastQuery {
    limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
struct SlugsBody {
    slugs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ProviderHealth {
    provider: &'static str,
    healthy: bool,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/sync", post(sync_all_handler))
        .route("/api/sync/organizations", post(sync_organizations_handler))
        .route("/api/sync/events", post(sync_events_handler))
        .route("/api/sync/past", post(sync_past_handler))
        .route("/api/sync/roster", post(roster_full_handler))
        .route("/api/sync/roster/top", post(roster_top_handler))
        .route("/api/sync/roster/records", post(roster_records_handler))
        .route("/api/sync/roster/slugs", post(roster_slugs_handler))
        .route("/api/sync/health", get(health_handler))
        .with_state(Arc::new(state))
}

/// Serves the API on `OCTAGON_WEB_PORT`, with the startup sync and the
/// scheduler when configured.
pub async fn serve(config: &SyncConfig, store: Arc<dyn Store>) -> anyhow::Result<()> {
    let services = SyncServices::from_config(config, store).await?;
    let _startup = spawn_startup_sync(config, Arc::clone(&services.mma));
    let scheduler = maybe_build_scheduler(config, Arc::clone(&services.mma)).await?;
    if let Some(sched) = &scheduler {
        sched.start().await?;
        info!(cron = %config.sync_cron, "sync scheduler started");
    }

    let state = AppState {
        services,
        past_events_limit: config.past_events_limit,
    };
    let listener = TcpListener::bind(("0.0.0.0", config.web_port)).await?;
    info!(port = config.web_port, "listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}

pub async fn serve_from_env() -> anyhow::Result<()> {
    let config = SyncConfig::from_env();
    let store = PgStore::connect(&config.database_url).await?;
    serve(&config, Arc::new(store)).await
}

async fn sync_all_handler(State(state): State<Arc<AppState>>) -> Response {
    info!("manual sync triggered");
    let result = state.services.mma.sync_all().await;
    let message = if result.success {
        format!(
            "Sync completed: {} events, {} organizations, {} fighters, {} fights",
            result.events_processed,
            result.organizations_processed,
            result.fighters_processed,
            result.fights_processed
        )
    } else {
        "Sync completed with errors".to_string()
    };
    sync_response(&result, message)
}

async fn sync_organizations_handler(State(state): State<Arc<AppState>>) -> Response {
    let result = state.services.mma.sync_organizations().await;
    let message = format!("{} organizations synced", result.organizations_processed);
    sync_response(&result, message)
}

async fn sync_events_handler(State(state): State<Arc<AppState>>) -> Response {
    let result = state.services.mma.sync_upcoming_events().await;
    let message = format!("{} upcoming events synced", result.events_processed);
    sync_response(&result, message)
}

async fn sync_past_handler(State(state): State<Arc<AppState>>, Query(query): Query<PastQuery>) -> Response {
    let limit = query.limit.unwrap_or(state.past_events_limit);
    let result = state.services.mma.sync_past_events(limit).await;
    let message = format!("{} past events synced", result.events_processed);
    sync_response(&result, message)
}

async fn roster_full_handler(State(state): State<Arc<AppState>>) -> Response {
    let result = state.services.roster.sync_full_roster().await;
    roster_response(&result)
}

async fn roster_top_handler(State(state): State<Arc<AppState>>) -> Response {
    let result = state.services.roster.sync_top_fighters().await;
    roster_response(&result)
}

async fn roster_records_handler(State(state): State<Arc<AppState>>) -> Response {
    let result = state.services.roster.update_all_records().await;
    roster_response(&result)
}

async fn roster_slugs_handler(State(state): State<Arc<AppState>>, Json(body): Json<SlugsBody>) -> Response {
    let result = state.services.roster.sync_fighters_by_slug(&body.slugs).await;
    roster_response(&result)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let providers: Vec<ProviderHealth> = state
        .services
        .mma
        .health()
        .await
        .into_iter()
        .map(|(provider, healthy)| ProviderHealth { provider, healthy })
        .collect();
    let healthy = providers.iter().filter(|p| p.healthy).count();
    Json(json!({
        "success": true,
        "data": { "providers": providers },
        "message": format!("{healthy}/{} providers reachable", providers.len()),
    }))
    .into_response()
}

fn sync_response(result: &SyncResult, message: String) -> Response {
    Json(report_envelope(result, result.success, &result.errors, message)).into_response()
}

fn roster_response(result: &RosterSyncResult) -> Response {
    let message = if result.success {
        format!(
            "Roster sync completed: {} added, {} updated",
            result.fighters_added, result.fighters_updated
        )
    } else {
        "Roster sync completed with errors".to_string()
    };
    Json(report_envelope(result, result.success, &result.errors, message)).into_response()
}

/// `{success, data: {counters.., errors, totalErrors}, message}`.
fn report_envelope<R: Serialize>(report: &R, success: bool, errors: &[String], message: String) -> Value {
    let mut data = match serde_json::to_value(report) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    };
    data.remove("success");
    data.insert(
        "errors".to_string(),
        json!(errors.iter().take(ERROR_LIMIT).collect::<Vec<_>>()),
    );
    data.insert("totalErrors".to_string(), json!(errors.len()));
    json!({
        "success": success,
        "data": data,
        "message": message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use octagon_adapters::{MmaProvider, UfcRosterScraper, UfcScraperProvider};
    use octagon_storage::{HttpClientConfig, HttpFetcher, MemoryStore, ScriptedTransport};
    use octagon_sync::{MmaSyncService, RosterSyncService};
    use tower::ServiceExt;

    fn offline_app() -> Router {
        let http = Arc::new(HttpFetcher::with_transport(
            Arc::new(ScriptedTransport::new()),
            &HttpClientConfig::default(),
        ));
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let ufc: Arc<dyn MmaProvider> = Arc::new(UfcScraperProvider::new(Arc::clone(&http)));
        let mma = MmaSyncService::new(Arc::clone(&store), vec![ufc]);
        let roster = RosterSyncService::new(store, Arc::new(UfcRosterScraper::new(http)));
        app(AppState::new(SyncServices::new(mma, roster)))
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
        let resp = app
            .oneshot(Request::builder().method(method).uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn full_sync_uses_fallback_events_offline() {
        let (status, body) = call(offline_app(), "POST", "/api/sync").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["organizationsProcessed"], 4);
        assert_eq!(body["data"]["eventsProcessed"], 7);
        assert_eq!(body["data"]["totalErrors"], 0);
        assert!(body["message"].as_str().unwrap().starts_with("Sync completed: 7 events"));
    }

    #[tokio::test(start_paused = true)]
    async fn past_sync_honors_limit_query() {
        let (status, body) = call(offline_app(), "POST", "/api/sync/past?limit=1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["eventsProcessed"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn roster_sync_reports_counts() {
        let (status, body) = call(offline_app(), "POST", "/api/sync/roster").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["fightersAdded"], 0);
        assert_eq!(body["data"]["errors"], json!([]));
    }

    #[tokio::test]
    async fn health_lists_providers() {
        let (status, body) = call(offline_app(), "GET", "/api/sync/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["providers"][0]["provider"], "UFC");
        assert_eq!(body["data"]["providers"][0]["healthy"], false);
    }

    #[test]
    fn errors_are_truncated_but_counted() {
        let result = SyncResult {
            success: false,
            errors: (0..25).map(|n| format!("Failed to process event {n}: boom")).collect(),
            ..SyncResult::default()
        };
        let body = report_envelope(&result, result.success, &result.errors, "Sync completed with errors".into());
        assert_eq!(body["success"], false);
        assert_eq!(body["data"]["errors"].as_array().unwrap().len(), ERROR_LIMIT);
        assert_eq!(body["data"]["totalErrors"], 25);
        assert!(body["data"].get("success").is_none());
        assert_eq!(body["data"]["fightsProcessed"], 0);
    }
}
