use axum::{
    Router,
    routing::get,
    extract::{State, Json},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::error;
use crate::error::Error;
use crate::listings::ComparisonAggregator;
use crate::observability::metrics::gather_text;
use crate::price_infra::aggregator::SpotAggregator;
use crate::types::listing::ProductComparison;
use crate::types::snapshot::{FxSnapshot, MetalPriceSnapshot};

const SERVICE_NAME: &str = "bullion-aggregator";

pub struct ApiState {
    pub spot: Arc<SpotAggregator>,
    pub comparisons: Arc<ComparisonAggregator>,
}

pub fn create_router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/api/health", get(health_check).fallback(not_found))
        .route("/api/prices", get(get_prices).fallback(not_found))
        .route("/api/fx", get(get_fx).fallback(not_found))
        .route("/api/comparisons", get(get_comparisons).fallback(not_found))
        .route("/metrics", get(metrics).fallback(not_found))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Upstream failure surfaced as `500 {"error", "details"}`.
#[derive(Debug)]
pub struct ApiError {
    message: &'static str,
    source: Error,
}

impl ApiError {
    fn spot(source: Error) -> Self {
        ApiError { message: "Failed to fetch spot rates", source }
    }

    fn comparisons(source: Error) -> Self {
        ApiError { message: "Failed to fetch seller comparisons", source }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.source, "{}", self.message);
        let body = ErrorBody {
            error: self.message.to_string(),
            details: Some(self.source.to_string()),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

async fn get_prices(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<MetalPriceSnapshot>>, ApiError> {
    let prices = state.spot.get_metal_prices().await.map_err(ApiError::spot)?;
    Ok(Json(prices))
}

async fn get_fx(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<FxSnapshot>, ApiError> {
    let fx = state.spot.get_fx_snapshot().await.map_err(ApiError::spot)?;
    Ok(Json(fx))
}

async fn get_comparisons(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<Vec<ProductComparison>>, ApiError> {
    let comparisons = state
        .comparisons
        .get_comparisons()
        .await
        .map_err(ApiError::comparisons)?;
    Ok(Json(comparisons))
}

async fn metrics() -> Response {
    match gather_text() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        ).into_response(),
        Err(e) => {
            error!(error = %e, "Metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn not_found() -> (StatusCode, Json<ErrorBody>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorBody { error: "Not Found".to_string(), details: None }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use crate::cache::ManualClock;
    use crate::config::{CachePolicy, SellerConfig};
    use crate::listings::fetcher::MockPageFetcher;
    use crate::price_infra::connectors::MockQuoteSource;
    use crate::price_infra::quote_client::QuoteClient;
    use crate::price_infra::{default_metal_tickers, FxTickers, QuoteResponse};
    use crate::types::timestamp::Timestamp;

    fn quote(value: f64) -> QuoteResponse {
        QuoteResponse { current_price: Some(value), closes: vec![] }
    }

    fn router(quotes_up: bool) -> Router {
        let clock = Arc::new(ManualClock::new(Timestamp::from_millis(1_700_000_000_000)));

        let mut source = MockQuoteSource::new();
        source.expect_fetch_quote().returning(move |instrument| {
            if !quotes_up {
                return Err(Error::InstrumentFetchFailed {
                    instrument: instrument.to_string(),
                    reason: "HTTP 502".into(),
                });
            }
            Ok(match instrument {
                "INR=X" => quote(83.0),
                "AUD=X" => quote(1.5),
                _ => quote(2000.0),
            })
        });

        let policy = CachePolicy::default();
        let quotes = Arc::new(QuoteClient::new(Arc::new(source), policy.ticker_ttl(), clock.clone()));
        let spot = SpotAggregator::new(
            quotes,
            default_metal_tickers(),
            FxTickers::default(),
            "Yahoo Finance",
            &policy,
            clock.clone(),
        );

        let mut fetcher = MockPageFetcher::new();
        fetcher.expect_fetch_page().returning(|_| {
            Ok("<h3><a href=\"/roo\">1oz Gold Kangaroo Coin</a></h3><span>$3,500</span>".to_string())
        });
        let comparisons = ComparisonAggregator::new(
            vec![SellerConfig::new("Jaggards", "https://jaggards.com.au", &["/collections/all"])],
            Arc::new(fetcher),
            policy.comparisons_ttl(),
            clock,
        );

        create_router(Arc::new(ApiState {
            spot: Arc::new(spot),
            comparisons: Arc::new(comparisons),
        }))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn health_reports_service() {
        let (status, body) = get_json(router(true), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok", "service": "bullion-aggregator" }));
    }

    #[tokio::test]
    async fn prices_use_wire_field_names() {
        let (status, body) = get_json(router(true), "/api/prices").await;
        assert_eq!(status, StatusCode::OK);

        let prices = body.as_array().unwrap();
        assert_eq!(prices.len(), 4);
        assert_eq!(prices[0]["metal"], "Gold");
        assert_eq!(prices[0]["rates"]["USD"], 2000.0);
        assert_eq!(prices[0]["rates"]["AUD"], 3000.0);
        assert_eq!(prices[0]["rates"]["INR"], 166000.0);
        assert_eq!(prices[0]["timestamp"], 1_700_000_000_000u64);
    }

    #[tokio::test]
    async fn fx_snapshot_carries_source_and_tickers() {
        let (status, body) = get_json(router(true), "/api/fx").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["INR"], 83.0);
        assert_eq!(body["AUD"], 1.5);
        assert_eq!(body["source"], "Yahoo Finance");
        assert_eq!(body["tickers"]["INR"], "INR=X");
    }

    #[tokio::test]
    async fn upstream_failure_is_a_500_with_details() {
        let (status, body) = get_json(router(false), "/api/prices").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to fetch spot rates");
        assert!(body["details"].as_str().unwrap().contains("HTTP 502"));
    }

    #[tokio::test]
    async fn comparisons_are_served() {
        let (status, body) = get_json(router(true), "/api/comparisons").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["productName"], "1 oz Gold Kangaroo");
        assert_eq!(body[0]["weightOz"], 1.0);
        assert_eq!(body[0]["offers"][0]["sellerName"], "Jaggards");
        assert_eq!(body[0]["offers"][0]["url"], "https://jaggards.com.au/roo");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (status, body) = get_json(router(true), "/api/orders").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "Not Found" }));
    }

    #[tokio::test]
    async fn wrong_method_on_known_path_is_json_404() {
        let response = router(true)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/api/prices")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Not Found" }));
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin() {
        let response = router(true)
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/prices")
                    .header(header::ORIGIN, "http://localhost:5173")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
