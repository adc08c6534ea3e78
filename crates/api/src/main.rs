use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vantage_core::client::{AlphaVantageClient, MarketDataClient};
use vantage_core::dashboard::{Dashboard, DashboardError, View};
use vantage_core::endpoint::{menu, Endpoint, MenuCategory, ParamError, Selection};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = vantage_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let api_key = match settings.resolve_api_key() {
        Ok(key) => key,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "API key missing; refusing to start");
            return Err(e);
        }
    };
    tracing::info!(source = %api_key.source(), "resolved Alpha Vantage API key");

    let client = AlphaVantageClient::from_settings(&settings, api_key)?;
    let app = router(Dashboard::new(client)).layer(TraceLayer::new_for_http());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

struct AppState<C> {
    dashboard: Arc<Dashboard<C>>,
}

impl<C> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            dashboard: Arc::clone(&self.dashboard),
        }
    }
}

fn router<C: MarketDataClient + 'static>(dashboard: Dashboard<C>) -> Router {
    let state = AppState {
        dashboard: Arc::new(dashboard),
    };

    Router::new()
        .route("/healthz", get(healthz))
        .route("/endpoints", get(list_endpoints))
        .route("/query/:function", get(query_endpoint::<C>))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_endpoints() -> Json<Vec<MenuCategory>> {
    Json(menu())
}

async fn query_endpoint<C: MarketDataClient + 'static>(
    State(state): State<AppState<C>>,
    Path(function): Path<String>,
    Query(params): Query<BTreeMap<String, String>>,
) -> Result<Json<View>, ApiError> {
    let selection = selection_from_query(&function, &params)?;
    let view = state.dashboard.run(&selection).await?;
    Ok(Json(view))
}

fn selection_from_query(
    function: &str,
    params: &BTreeMap<String, String>,
) -> Result<Selection, ParamError> {
    let endpoint: Endpoint = function.parse()?;
    let mut selection = Selection::new(endpoint);
    for (name, value) in params {
        selection.set_named(name, value)?;
    }
    Ok(selection)
}

#[derive(Debug)]
enum ApiError {
    BadRequest(ParamError),
    Upstream(DashboardError),
}

impl From<ParamError> for ApiError {
    fn from(err: ParamError) -> Self {
        ApiError::BadRequest(err)
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        ApiError::Upstream(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    notice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<Value>,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::BadRequest(err) => ErrorBody {
                error: err.to_string(),
                hint: None,
                notice: None,
                raw: None,
            },
            ApiError::Upstream(err) => ErrorBody {
                error: err.to_string(),
                hint: err.hint(),
                notice: err.notice().map(str::to_string),
                raw: err.raw().cloned(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Upstream(err) = &self {
            if let DashboardError::Transport(inner) = err {
                sentry_anyhow::capture_anyhow(&anyhow::anyhow!("{inner}"));
            }
            tracing::warn!(error = %err, "query failed");
        }
        (self.status(), Json(self.body())).into_response()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &vantage_core::config::Settings) -> Option<sentry::ClientInitGuard> {
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
    use serde_json::json;
    use vantage_core::client::TransportError;
    use vantage_core::endpoint::QueryParams;

    struct CannedClient {
        body: Value,
    }

    #[async_trait::async_trait]
    impl MarketDataClient for CannedClient {
        fn provider_name(&self) -> &'static str {
            "canned"
        }

        async fn fetch(
            &self,
            _endpoint: Endpoint,
            _params: &QueryParams,
        ) -> Result<Value, TransportError> {
            Ok(self.body.clone())
        }
    }

    fn state(body: Value) -> AppState<CannedClient> {
        AppState {
            dashboard: Arc::new(Dashboard::new(CannedClient { body })),
        }
    }

    fn query(pairs: &[(&str, &str)]) -> Query<BTreeMap<String, String>> {
        Query(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn returns_view_for_known_function() {
        let body = json!({"Technical Analysis: SMA": {"2024-01-02": {"SMA": "240.1"}}});
        let res = query_endpoint(
            State(state(body)),
            Path("sma".to_string()),
            query(&[("symbol", "nvda"), ("time_period", "10")]),
        )
        .await
        .unwrap();

        assert_eq!(res.0.endpoint, Endpoint::Sma);
        assert_eq!(res.0.table.len(), 1);
        assert_eq!(
            res.0.caption.as_deref(),
            Some("The chart shows the 10-day Simple Moving Average.")
        );
    }

    #[tokio::test]
    async fn unknown_function_is_bad_request() {
        let err = query_endpoint(
            State(state(json!({}))),
            Path("NOPE".to_string()),
            query(&[]),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn zero_time_period_is_bad_request() {
        let err = query_endpoint(
            State(state(json!({}))),
            Path("RSI".to_string()),
            query(&[("time_period", "0")]),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn api_error_payload_is_bad_gateway_with_raw_body() {
        let body = json!({"Error Message": "Invalid API call."});
        let err = query_endpoint(
            State(state(body.clone())),
            Path("TIME_SERIES_DAILY".to_string()),
            query(&[]),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        let shown = err.body();
        assert_eq!(shown.notice.as_deref(), Some("Invalid API call."));
        assert_eq!(shown.raw, Some(body));
    }

    #[tokio::test]
    async fn endpoints_lists_the_menu() {
        let Json(menu) = list_endpoints().await;
        assert_eq!(menu.len(), 4);
        assert_eq!(healthz().await, "ok");
    }
}
