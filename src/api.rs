// 🌐 REST API with Axum
// Enrollment + screening endpoints; services run on the blocking pool

use crate::enrollment::EnrollmentService;
use crate::error::EntitySenseError;
use crate::schema::{CreateWatchListEntityRequest, ValidatePaymentRequest, ValidationError};
use crate::screening::ScreeningService;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub enrollment: Arc<EnrollmentService>,
    pub screening: Arc<ScreeningService>,
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    details: Vec<ValidationError>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn done() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

impl ApiResponse<()> {
    fn failure(kind: &'static str, message: String, details: Vec<ValidationError>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                kind,
                message,
                details,
            }),
        }
    }
}

// ============================================================================
// Error mapping
// ============================================================================

pub enum ApiError {
    Service(EntitySenseError),
    MalformedBody(String),
    Internal(String),
}

impl From<EntitySenseError> for ApiError {
    fn from(err: EntitySenseError) -> Self {
        ApiError::Service(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

fn status_for(err: &EntitySenseError) -> StatusCode {
    match err {
        EntitySenseError::Validation(_) => StatusCode::BAD_REQUEST,
        EntitySenseError::EmbeddingUnavailable(_) => StatusCode::BAD_GATEWAY,
        EntitySenseError::InvalidVector(_) => StatusCode::INTERNAL_SERVER_ERROR,
        EntitySenseError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Service(err) => {
                let status = status_for(&err);
                let kind = err.kind();
                if !err.is_client_error() {
                    error!(kind = kind, error = %err, "Request failed");
                }
                let message = err.to_string();
                let details = match err {
                    EntitySenseError::Validation(errors) => errors,
                    _ => Vec::new(),
                };
                (status, ApiResponse::failure(kind, message, details))
            }
            ApiError::MalformedBody(message) => (
                StatusCode::BAD_REQUEST,
                ApiResponse::failure("VALIDATION_ERROR", message, Vec::new()),
            ),
            ApiError::Internal(message) => {
                error!(error = %message, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::failure("INTERNAL_ERROR", message, Vec::new()),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Run a blocking service call (HTTP provider, SQLite) off the async workers
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> crate::error::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("worker failed: {}", e)))?
        .map_err(ApiError::from)
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// POST /api/create-watch-list-entity - Add a sanctioned or high-risk entity
async fn create_watch_list_entity(
    State(state): State<AppState>,
    payload: Result<Json<CreateWatchListEntityRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let Json(request) = payload?;
    let service = state.enrollment.clone();

    run_blocking(move || service.enroll(&request)).await?;

    Ok(Json(ApiResponse::done()))
}

/// POST /api/validate-payment - Screen a payee against the watchlist
async fn validate_payment(
    State(state): State<AppState>,
    payload: Result<Json<ValidatePaymentRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let service = state.screening.clone();

    let decision = run_blocking(move || service.screen(&request)).await?;

    Ok((StatusCode::OK, Json(decision)).into_response())
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/create-watch-list-entity", post(create_watch_list_entity))
        .route("/validate-payment", post(validate_payment))
        .with_state(state);

    Router::new()
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntitySenseConfig;
    use crate::embedding::{EmbeddingProvider, HashingEmbeddingProvider};
    use crate::store::{MemoryWatchlistStore, WatchlistStore};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct NullProvider;

    impl EmbeddingProvider for NullProvider {
        fn embed(&self, _prompt: &str) -> crate::error::Result<Vec<f32>> {
            Err(EntitySenseError::EmbeddingUnavailable("provider returned no embedding".into()))
        }
    }

    fn test_state(provider: Arc<dyn EmbeddingProvider>) -> (AppState, Arc<MemoryWatchlistStore>) {
        let config = EntitySenseConfig {
            embedding_dimension: 64,
            ..Default::default()
        };
        let store = Arc::new(MemoryWatchlistStore::new());
        let state = AppState {
            enrollment: Arc::new(EnrollmentService::new(provider.clone(), store.clone(), &config)),
            screening: Arc::new(ScreeningService::new(provider, store.clone(), &config)),
        };
        (state, store)
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let (state, _) = test_state(Arc::new(HashingEmbeddingProvider::new(64)));
        let response = router(state)
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_enroll_then_validate_payment_blocks() {
        let (state, store) = test_state(Arc::new(HashingEmbeddingProvider::new(64)));
        let app = router(state);

        let (status, body) = post_json(
            app.clone(),
            "/api/create-watch-list-entity",
            json!({
                "name": "Test Corp",
                "address": "10 Street",
                "country": "SG",
                "knownAccounts": ["AC999"],
                "riskCategory": "SANCTION"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true}));
        assert_eq!(store.count().unwrap(), 1);

        let (status, body) = post_json(
            app,
            "/api/validate-payment",
            json!({
                "payeeName": "Test Corp",
                "payeeAddress": "10 Street",
                "payeeCountry": "SG",
                "accountNumber": "AC999"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "BLOCK");
        let first = &body["possibleWatchListEntityMatches"][0];
        assert_eq!(first["name"], "Test Corp");
        assert_eq!(first["riskCategory"], "SANCTION");
        assert_eq!(first["matchedAccount"], true);
    }

    #[tokio::test]
    async fn test_validate_payment_empty_watchlist_allows() {
        let (state, _) = test_state(Arc::new(HashingEmbeddingProvider::new(64)));

        let (status, body) = post_json(
            router(state),
            "/api/validate-payment",
            json!({"payeeName": "Unknown Corp", "payeeCountry": "US", "payeeAddress": "123 Lane"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "ALLOW", "possibleWatchListEntityMatches": []}));
    }

    #[tokio::test]
    async fn test_blank_name_is_validation_error() {
        let (state, store) = test_state(Arc::new(HashingEmbeddingProvider::new(64)));

        let (status, body) = post_json(
            router(state),
            "/api/create-watch-list-entity",
            json!({"name": "", "riskCategory": "MULE"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["kind"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["field"], "name");
        assert_eq!(store.count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_risk_category_is_validation_error() {
        let (state, _) = test_state(Arc::new(HashingEmbeddingProvider::new(64)));

        let (status, body) = post_json(
            router(state),
            "/api/create-watch-list-entity",
            json!({"name": "Test Corp", "riskCategory": "SMUGGLER"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_provider_failure_is_distinguished() {
        let (state, store) = test_state(Arc::new(NullProvider));
        let app = router(state);

        let (status, body) = post_json(
            app.clone(),
            "/api/create-watch-list-entity",
            json!({"name": "Test Corp", "riskCategory": "PEP"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["kind"], "EMBEDDING_UNAVAILABLE");
        assert_eq!(store.count().unwrap(), 0);

        let (status, body) = post_json(app, "/api/validate-payment", json!({"payeeName": "Test Corp"})).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["kind"], "EMBEDDING_UNAVAILABLE");
    }
}
