/**
 * Analytics Routes
 * Inquiry and gallery summaries for the admin dashboard
 */
use axum::{extract::State, Json};
use chrono::Utc;

use super::auth::AdminClaims;
use crate::error::AppResult;
use crate::services::analytics::{self, AnalyticsReport};
use crate::state::SharedState;

/// GET /api/admin/analytics
pub async fn get_analytics(
    State(state): State<SharedState>,
    _admin: AdminClaims,
) -> AppResult<Json<AnalyticsReport>> {
    Ok(Json(analytics::report(state.store.as_ref(), Utc::now()).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::auth::tests::bearer;
    use crate::services::contacts::{self, ContactSubmission};
    use crate::state::testing;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn analytics_router(state: SharedState) -> Router {
        Router::new()
            .route("/api/admin/analytics", get(get_analytics))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_report_counts_fresh_inquiry() {
        let h = testing::harness();
        contacts::submit(
            h.store.as_ref(),
            ContactSubmission {
                name: Some("Jane".into()),
                email: Some("jane@x.com".into()),
                message: Some("Hi".into()),
                event_type: Some("wedding".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let req = Request::get("/api/admin/analytics")
            .header("authorization", bearer(&h.state))
            .body(Body::empty())
            .unwrap();
        let res = analytics_router(h.state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["totalContacts"], 1);
        assert_eq!(json["recentContacts"], 1);
        assert_eq!(json["contactsChange"], 0.0);
        assert_eq!(json["contactsOverTime"].as_array().unwrap().len(), 7);
        assert_eq!(json["contactsOverTime"][6]["count"], 1);
        assert_eq!(json["contactsByEventType"][0]["_id"], "wedding");
    }

    #[tokio::test]
    async fn test_report_requires_token() {
        let h = testing::harness();
        let req = Request::get("/api/admin/analytics")
            .body(Body::empty())
            .unwrap();
        let res = analytics_router(h.state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
