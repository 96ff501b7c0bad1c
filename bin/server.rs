// Vahan Growth - Web Server
// REST API + HTML chart page over the metrics files

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use vahan_growth::view::series;
use vahan_growth::{
    list_subjects, metrics_path, report_error, ChartSeries, Config, GrowthKind, MetricFilter,
    MetricsCache, YearMonth,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    cache: Arc<Mutex<MetricsCache>>,
    config: Arc<Config>,
}

impl AppState {
    fn new(config: Config) -> Self {
        let mut cache = MetricsCache::new(&config.period_field);
        if let Some(secs) = config.cache_ttl_secs {
            cache = cache.with_ttl(Duration::from_secs(secs));
        }
        Self {
            cache: Arc::new(Mutex::new(cache)),
            config: Arc::new(config),
        }
    }

    fn cache(&self) -> MutexGuard<'_, MetricsCache> {
        // A panic while holding the lock leaves the cache usable
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

/// Query string shared by the metrics and series endpoints
#[derive(Debug, Default, Deserialize)]
struct MetricsQuery {
    from: Option<String>,
    to: Option<String>,
    /// Comma-separated group labels
    groups: Option<String>,
    /// `yoy` (default) or `qoq`
    metric: Option<String>,
}

impl MetricsQuery {
    fn filter(&self) -> Result<MetricFilter, String> {
        let parse = |value: &Option<String>| -> Result<Option<YearMonth>, String> {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(|v| v.parse::<YearMonth>().map_err(|e| e.to_string()))
                .transpose()
        };

        let groups = self.groups.as_deref().filter(|g| !g.is_empty()).map(|g| {
            g.split(',')
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
                .collect()
        });

        Ok(MetricFilter {
            from: parse(&self.from)?,
            to: parse(&self.to)?,
            groups,
        })
    }

    fn kind(&self) -> Result<GrowthKind, String> {
        match self.metric.as_deref() {
            None | Some("") => Ok(GrowthKind::YearOverYear),
            Some(metric) => metric.parse(),
        }
    }
}

/// One metrics row (simplified for API)
#[derive(Serialize)]
struct RowResponse {
    group: String,
    period: String,
    yoy: Option<f64>,
    qoq: Option<f64>,
}

#[derive(Serialize)]
struct MetricsResponse {
    subject: String,
    headers: Vec<String>,
    groups: Vec<String>,
    rows: Vec<RowResponse>,
}

#[derive(Serialize)]
struct SeriesResponse {
    subject: String,
    metric: &'static str,
    series: Vec<ChartSeries>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/subjects - Subjects with a metrics file
async fn get_subjects(State(state): State<AppState>) -> Response {
    match list_subjects(&state.config.metrics_dir) {
        Ok(subjects) => (StatusCode::OK, Json(ApiResponse::ok(subjects))).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "listing subjects failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

/// Load a subject's table through the cache, or an error response
fn load_subject(
    state: &AppState,
    subject: &str,
) -> Result<Arc<vahan_growth::MergedMetrics>, Response> {
    // `Path` has already percent-decoded the segment
    if subject.is_empty() || subject.contains(['/', '\\']) || subject.contains("..") {
        return Err(failure(StatusCode::BAD_REQUEST, format!("invalid subject '{}'", subject)));
    }

    let path = metrics_path(&state.config.metrics_dir, &subject);
    if !path.exists() {
        return Err(failure(StatusCode::NOT_FOUND, format!("no metrics for '{}'", subject)));
    }

    state.cache().get_or_load(&path).map_err(|e| {
        let message = format!("Error loading {} metrics", subject);
        if let Err(log_err) = report_error(&e, &message, &state.config.logs_dir) {
            tracing::warn!(error = %log_err, "could not write error log");
        }
        failure(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
    })
}

/// GET /api/metrics/:subject - Filtered metrics rows
async fn get_metrics(
    State(state): State<AppState>,
    Path(subject): Path<String>,
    Query(query): Query<MetricsQuery>,
) -> Response {
    let filter = match query.filter() {
        Ok(filter) => filter,
        Err(e) => return failure(StatusCode::BAD_REQUEST, e),
    };

    let metrics = match load_subject(&state, &subject) {
        Ok(metrics) => metrics,
        Err(response) => return response,
    };

    // `metric` only narrows to rows where that growth value is defined
    let kind = match query.metric.as_deref() {
        None | Some("") => None,
        Some(_) => match query.kind() {
            Ok(kind) => Some(kind),
            Err(e) => return failure(StatusCode::BAD_REQUEST, e),
        },
    };

    let rows: Vec<RowResponse> = filter
        .apply(&metrics)
        .into_iter()
        .filter(|row| kind.map_or(true, |k| row.metric(k).is_some()))
        .map(|row| RowResponse {
            group: row.group.label(),
            period: row.period.to_string(),
            yoy: row.yoy,
            qoq: row.qoq,
        })
        .collect();

    let response = MetricsResponse {
        subject,
        headers: metrics.headers(),
        groups: vahan_growth::view::group_labels(&metrics),
        rows,
    };

    (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
}

/// GET /api/series/:subject - Chart lines for one metric
async fn get_series(
    State(state): State<AppState>,
    Path(subject): Path<String>,
    Query(query): Query<MetricsQuery>,
) -> Response {
    let (filter, kind) = match (query.filter(), query.kind()) {
        (Ok(filter), Ok(kind)) => (filter, kind),
        (Err(e), _) | (_, Err(e)) => return failure(StatusCode::BAD_REQUEST, e),
    };

    let metrics = match load_subject(&state, &subject) {
        Ok(metrics) => metrics,
        Err(response) => return response,
    };

    let response = SeriesResponse {
        subject,
        metric: kind.column(),
        series: series(&filter.apply(&metrics), kind),
    };

    (StatusCode::OK, Json(ApiResponse::ok(response))).into_response()
}

/// GET / - Serve index.html
async fn serve_index() -> impl IntoResponse {
    Html(include_str!("../web/index.html"))
}

fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/subjects", get(get_subjects))
        .route("/metrics/:subject", get(get_metrics))
        .route("/series/:subject", get(get_series))
        .with_state(state);

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest_service("/static", ServeDir::new("web"))
        .layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    println!("🌐 Vahan Growth - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = Config::load(None)?;
    if !config.metrics_dir.exists() {
        eprintln!("⚠️  Metrics directory not found at {:?}", config.metrics_dir);
        eprintln!("   Run: vahan-growth pipeline");
        eprintln!("   to generate metrics first.");
    }

    let addr = config.server_addr.clone();
    let state = AppState::new(config);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "server listening");

    println!("\n🚀 Server running on http://{}", addr);
    println!("   API: http://{}/api/subjects", addr);
    println!("   UI:  http://{}", addr);
    println!("\n   Press Ctrl+C to stop\n");

    axum::serve(listener, app(state)).await?;
    Ok(())
}
