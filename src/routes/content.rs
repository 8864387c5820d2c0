/**
 * Content Routes
 * Public page sections and admin content editing
 */
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::auth::AdminClaims;
use crate::db::models::ContentBlock;
use crate::error::AppResult;
use crate::services::content::{self, ContentUpdate};
use crate::state::SharedState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ContentResponse {
    pub message: String,
    pub content: ContentBlock,
}

/// GET /api/content
pub async fn list_content(State(state): State<SharedState>) -> AppResult<Json<Vec<ContentBlock>>> {
    Ok(Json(content::list_active(state.store.as_ref()).await?))
}

/// GET /api/content/{section}
pub async fn get_content(
    State(state): State<SharedState>,
    Path(section): Path<String>,
) -> AppResult<Json<ContentBlock>> {
    Ok(Json(content::get_active(state.store.as_ref(), &section).await?))
}

/// GET /api/admin/content
pub async fn admin_list_content(
    State(state): State<SharedState>,
    _admin: AdminClaims,
) -> AppResult<Json<Vec<ContentBlock>>> {
    Ok(Json(content::list_all(state.store.as_ref()).await?))
}

/// PUT /api/admin/content/{section}
pub async fn upsert_content(
    State(state): State<SharedState>,
    _admin: AdminClaims,
    Path(section): Path<String>,
    Json(payload): Json<ContentUpdate>,
) -> AppResult<Json<ContentResponse>> {
    let block = content::upsert(state.store.as_ref(), &section, payload).await?;
    Ok(Json(ContentResponse {
        message: "Content updated successfully".to_string(),
        content: block,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ContentStore;
    use crate::routes::auth::tests::bearer;
    use crate::state::testing;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::{get, put};
    use axum::Router;
    use tower::ServiceExt;

    fn content_router(state: SharedState) -> Router {
        Router::new()
            .route("/api/content", get(list_content))
            .route("/api/content/{section}", get(get_content))
            .route("/api/admin/content", get(admin_list_content))
            .route("/api/admin/content/{section}", put(upsert_content))
            .with_state(state)
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    fn put_section(section: &str, auth: &str, body: serde_json::Value) -> Request<Body> {
        Request::put(format!("/api/admin/content/{section}"))
            .header("content-type", "application/json")
            .header("authorization", auth)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_section_appears_after_upsert() {
        let h = testing::harness();
        let auth = bearer(&h.state);

        let req = Request::get("/api/content/about").body(Body::empty()).unwrap();
        let (status, _) = send(content_router(h.state.clone()), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let req = put_section("about", &auth, serde_json::json!({"title": "T"}));
        let (status, json) = send(content_router(h.state.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Content updated successfully");
        assert_eq!(json["content"]["title"], "T");

        let req = Request::get("/api/content/about").body(Body::empty()).unwrap();
        let (status, json) = send(content_router(h.state), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["title"], "T");
    }

    #[tokio::test]
    async fn test_unknown_section_rejected_for_admin() {
        let h = testing::harness();
        let auth = bearer(&h.state);
        let req = put_section("footer", &auth, serde_json::json!({"title": "T"}));
        let (status, json) = send(content_router(h.state), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["field"], "section");
    }

    #[tokio::test]
    async fn test_admin_list_includes_inactive() {
        let h = testing::harness();
        let auth = bearer(&h.state);
        let req = put_section("hero", &auth, serde_json::json!({"title": "Hi"}));
        send(content_router(h.state.clone()), req).await;
        let req = put_section("services", &auth, serde_json::json!({"isActive": false}));
        send(content_router(h.state.clone()), req).await;

        let req = Request::get("/api/content").body(Body::empty()).unwrap();
        let (_, public) = send(content_router(h.state.clone()), req).await;
        assert_eq!(public.as_array().unwrap().len(), 1);

        let req = Request::get("/api/admin/content")
            .header("authorization", &auth)
            .body(Body::empty())
            .unwrap();
        let (status, admin) = send(content_router(h.state), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(admin.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_requires_token() {
        let h = testing::harness();
        let req = Request::put("/api/admin/content/about")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"title":"T"}"#))
            .unwrap();
        let (status, _) = send(content_router(h.state.clone()), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(h.store.list_content(false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_wins_over_malformed_body() {
        let h = testing::harness();
        let req = Request::put("/api/admin/content/about")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, json) = send(content_router(h.state), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "Authorization required");
    }
}
