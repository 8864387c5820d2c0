/**
 * Health Routes
 * Liveness and readiness endpoints
 */
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::SharedState;

/// Single service check result
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub store: ServiceCheck,
    #[serde(rename = "imageHost")]
    pub image_host: String,
}

/// GET /health
pub async fn health_ping(State(state): State<SharedState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs(),
    })
}

/// GET /health/ready - 503 until the store answers
pub async fn health_ready(State(state): State<SharedState>) -> impl IntoResponse {
    let backend = state.store.backend().to_string();
    let (ready, store) = match state.store.ping().await {
        Ok(latency) => (
            true,
            ServiceCheck {
                status: "healthy".to_string(),
                backend,
                response_time: Some(latency.as_millis() as u64),
                error: None,
            },
        ),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                false,
                ServiceCheck {
                    status: "unhealthy".to_string(),
                    backend,
                    response_time: None,
                    error: Some("store unreachable".to_string()),
                },
            )
        }
    };

    let response = ReadyResponse {
        status: if ready { "ready" } else { "not ready" }.to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs(),
        store,
        image_host: if state.images.is_some() {
            "configured"
        } else {
            "not configured"
        }
        .to_string(),
    };

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::testing;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn test_router(state: SharedState) -> Router {
        Router::new()
            .route("/health", get(health_ping))
            .route("/health/ready", get(health_ready))
            .with_state(state)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, T) {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: T = serde_json::from_slice(&body).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn test_health_ping_returns_ok() {
        let h = testing::harness();
        let (status, body) = get_json::<HealthResponse>(test_router(h.state), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn test_health_ready_reports_store() {
        let h = testing::harness();
        let (status, body) = get_json::<ReadyResponse>(test_router(h.state), "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ready");
        assert_eq!(body.store.backend, "memory");
        assert_eq!(body.image_host, "configured");
    }

    #[tokio::test]
    async fn test_health_ready_unavailable_when_store_down() {
        let h = testing::harness();
        h.store.set_offline(true);
        let (status, body) = get_json::<ReadyResponse>(test_router(h.state), "/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status, "not ready");
        assert_eq!(body.store.status, "unhealthy");
    }
}
