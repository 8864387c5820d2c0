/**
 * Gallery Routes
 * Public listing plus admin CRUD and multipart upload
 */
use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::auth::AdminClaims;
use super::input::{split_tags, FlexBool, FlexInt, TagsInput};
use super::MessageResponse;
use crate::db::models::{CategoryCount, ExifData, GalleryImage, PublicGalleryImage};
use crate::db::{PageRequest, Pagination};
use crate::error::{AppError, AppResult};
use crate::services::gallery::{self, GalleryUpdate, UploadRequest, UploadedFile};
use crate::services::parse_id;
use crate::state::SharedState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GalleryParams {
    pub category: Option<String>,
    pub featured: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl GalleryParams {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(self.page, self.limit)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageListResponse<T> {
    pub images: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryStatsResponse {
    pub categories: Vec<CategoryCount>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageResponse {
    pub message: String,
    pub image: GalleryImage,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateImageRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub featured: Option<FlexBool>,
    pub tags: Option<TagsInput>,
    pub order: Option<FlexInt>,
}

impl UpdateImageRequest {
    fn normalize(self) -> AppResult<GalleryUpdate> {
        Ok(GalleryUpdate {
            title: self.title,
            description: self.description,
            category: self.category,
            featured: self.featured.map(|f| f.value()),
            tags: self.tags.map(TagsInput::normalize),
            order: self.order.map(|o| o.value("order")).transpose()?,
        })
    }
}

// ============================================================================
// Public
// ============================================================================

/// GET /api/gallery
pub async fn list_images(
    State(state): State<SharedState>,
    Query(params): Query<GalleryParams>,
) -> AppResult<Json<ImageListResponse<PublicGalleryImage>>> {
    let category = gallery::parse_category_filter(params.category.as_deref())?;
    let featured_only = params
        .featured
        .as_deref()
        .is_some_and(|f| f.trim().eq_ignore_ascii_case("true"));

    let page = gallery::list_public(
        state.store.as_ref(),
        category,
        featured_only,
        params.page_request(),
    )
    .await?;

    Ok(Json(ImageListResponse {
        images: page.items,
        pagination: page.pagination,
    }))
}

/// GET /api/gallery/{id}
pub async fn get_image(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> AppResult<Json<PublicGalleryImage>> {
    let id = parse_id(&id, "Image")?;
    let image = gallery::get(state.store.as_ref(), id).await?;
    Ok(Json(image.into()))
}

/// GET /api/gallery/stats/categories
pub async fn category_stats(
    State(state): State<SharedState>,
) -> AppResult<Json<CategoryStatsResponse>> {
    let categories = gallery::category_stats(state.store.as_ref()).await?;
    Ok(Json(CategoryStatsResponse { categories }))
}

// ============================================================================
// Admin
// ============================================================================

/// GET /api/admin/gallery
pub async fn admin_list_images(
    State(state): State<SharedState>,
    _admin: AdminClaims,
    Query(params): Query<GalleryParams>,
) -> AppResult<Json<ImageListResponse<GalleryImage>>> {
    let category = gallery::parse_category_filter(params.category.as_deref())?;
    let page = gallery::list_admin(state.store.as_ref(), category, params.page_request()).await?;

    Ok(Json(ImageListResponse {
        images: page.items,
        pagination: page.pagination,
    }))
}

/// GET /api/admin/gallery/{id}
pub async fn admin_get_image(
    State(state): State<SharedState>,
    _admin: AdminClaims,
    Path(id): Path<String>,
) -> AppResult<Json<GalleryImage>> {
    let id = parse_id(&id, "Image")?;
    Ok(Json(gallery::get(state.store.as_ref(), id).await?))
}

/// POST /api/admin/gallery (multipart)
pub async fn upload_image(
    State(state): State<SharedState>,
    _admin: AdminClaims,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let host = state.image_host()?;

    let request = read_upload_form(multipart).await?;
    let image = gallery::upload(state.store.as_ref(), host, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ImageResponse {
            message: "Image uploaded successfully".to_string(),
            image,
        }),
    ))
}

/// PUT /api/admin/gallery/{id}
pub async fn update_image(
    State(state): State<SharedState>,
    _admin: AdminClaims,
    Path(id): Path<String>,
    Json(payload): Json<UpdateImageRequest>,
) -> AppResult<Json<ImageResponse>> {
    let id = parse_id(&id, "Image")?;

    let image = gallery::update(state.store.as_ref(), id, payload.normalize()?).await?;
    Ok(Json(ImageResponse {
        message: "Image updated successfully".to_string(),
        image,
    }))
}

/// DELETE /api/admin/gallery/{id}
pub async fn delete_image(
    State(state): State<SharedState>,
    _admin: AdminClaims,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    let host = state.image_host()?;
    let id = parse_id(&id, "Image")?;

    gallery::delete(state.store.as_ref(), host, id).await?;
    Ok(Json(MessageResponse::new("Image deleted successfully")))
}

// ============================================================================
// Multipart
// ============================================================================

fn malformed(e: axum::extract::multipart::MultipartError) -> AppError {
    tracing::debug!("Multipart error: {}", e);
    AppError::invalid("image", "Invalid multipart data")
}

/// Sniffs the common image signatures.
fn sniff_image_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        _ => None,
    }
}

async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadRequest> {
    let mut request = UploadRequest {
        file: None,
        title: None,
        description: None,
        category: None,
        featured: false,
        tags: Vec::new(),
        exif_data: ExifData::default(),
        order: 0,
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "image" {
            let filename = field.file_name().unwrap_or("upload").to_string();
            let declared = field.content_type().map(str::to_string);
            let bytes = field.bytes().await.map_err(malformed)?.to_vec();
            // Clients without a precise type still get image detection.
            let content_type = match declared {
                Some(ct) if ct != "application/octet-stream" => Some(ct),
                _ => sniff_image_type(&bytes).map(str::to_string),
            };
            request.file = Some(UploadedFile {
                filename,
                content_type,
                bytes,
            });
            continue;
        }

        let value = field.text().await.map_err(malformed)?;
        match name.as_str() {
            "title" => request.title = Some(value),
            "description" => request.description = Some(value),
            "category" => request.category = Some(value),
            "featured" => request.featured = FlexBool::Text(value).value(),
            "tags" => request.tags = split_tags(&value),
            "order" => request.order = FlexInt::Text(value).value("order")?,
            "exifData" if !value.trim().is_empty() => {
                request.exif_data = serde_json::from_str(&value)
                    .map_err(|_| AppError::invalid("exifData", "exifData must be a JSON object"))?;
            }
            _ => {}
        }
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::auth::tests::bearer;
    use crate::state::testing;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    const BOUNDARY: &str = "studio-boundary";

    fn gallery_router(state: SharedState) -> Router {
        Router::new()
            .route("/api/gallery", get(list_images))
            .route("/api/gallery/stats/categories", get(category_stats))
            .route("/api/gallery/{id}", get(get_image))
            .route(
                "/api/admin/gallery",
                get(admin_list_images).post(upload_image),
            )
            .route(
                "/api/admin/gallery/{id}",
                get(admin_get_image).put(update_image).delete(delete_image),
            )
            .with_state(state)
    }

    fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, content_type, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"image\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, value)
    }

    fn upload_request(auth: &str, body: Vec<u8>) -> Request<Body> {
        Request::post("/api/admin/gallery")
            .header("authorization", auth)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    #[tokio::test]
    async fn test_upload_then_public_fetch_hides_storage_id() {
        let h = testing::harness();
        let auth = bearer(&h.state);
        let body = multipart_body(
            &[("category", "weddings"), ("tags", "bride, ,sunset"), ("title", "First look")],
            Some(("look.jpg", "image/jpeg", JPEG)),
        );

        let (status, json) = send(gallery_router(h.state.clone()), upload_request(&auth, body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["image"]["category"], "weddings");
        assert_eq!(json["image"]["featured"], false);
        assert_eq!(json["image"]["tags"], serde_json::json!(["bride", "sunset"]));
        let id = json["image"]["id"].as_str().unwrap().to_string();

        let req = Request::get(format!("/api/gallery/{id}"))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(gallery_router(h.state.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["title"], "First look");
        assert!(json.get("externalStorageId").is_none());

        let req = Request::get("/api/gallery/stats/categories")
            .body(Body::empty())
            .unwrap();
        let (_, json) = send(gallery_router(h.state), req).await;
        assert_eq!(
            json["categories"],
            serde_json::json!([{"name": "all", "count": 1}, {"name": "weddings", "count": 1}])
        );
    }

    #[tokio::test]
    async fn test_upload_sniffs_octet_stream() {
        let h = testing::harness();
        let auth = bearer(&h.state);
        let body = multipart_body(
            &[("category", "events")],
            Some(("raw.bin", "application/octet-stream", JPEG)),
        );
        let (status, json) = send(gallery_router(h.state), upload_request(&auth, body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["image"]["title"], "raw.bin");
    }

    #[tokio::test]
    async fn test_upload_rejects_non_image_without_remote_call() {
        let h = testing::harness();
        let auth = bearer(&h.state);
        let body = multipart_body(
            &[("category", "events")],
            Some(("notes.txt", "text/plain", b"hello")),
        );
        let (status, json) = send(gallery_router(h.state), upload_request(&auth, body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["field"], "image");
        assert!(h.images.is_empty().await);
    }

    #[tokio::test]
    async fn test_upload_without_image_host_is_configuration_error() {
        let store = std::sync::Arc::new(crate::db::MemoryStore::new());
        let state = crate::state::AppState::new(testing::config(), store, None);
        let auth = bearer(&state);
        let body = multipart_body(&[("category", "events")], Some(("a.jpg", "image/jpeg", JPEG)));

        let (status, json) = send(gallery_router(state), upload_request(&auth, body)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("CLOUDINARY_API_KEY"));
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let h = testing::harness();
        let req = Request::get("/api/admin/gallery").body(Body::empty()).unwrap();
        let (status, _) = send(gallery_router(h.state.clone()), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::delete(format!("/api/admin/gallery/{}", uuid::Uuid::new_v4()))
            .header("authorization", "Bearer not-a-token")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(gallery_router(h.state), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_bad_token_checked_before_body() {
        let h = testing::harness();
        let req = Request::post("/api/admin/gallery")
            .header("authorization", "Bearer not-a-jwt")
            .header("content-type", "text/plain")
            .body(Body::from("hello"))
            .unwrap();
        let (status, _) = send(gallery_router(h.state.clone()), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let req = Request::put(format!("/api/admin/gallery/{}", uuid::Uuid::new_v4()))
            .header("content-type", "application/json")
            .body(Body::from("[1, 2"))
            .unwrap();
        let (status, _) = send(gallery_router(h.state), req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_update_accepts_string_shapes() {
        let h = testing::harness();
        let auth = bearer(&h.state);
        let body = multipart_body(&[("category", "portraits")], Some(("p.jpg", "image/jpeg", JPEG)));
        let (_, json) = send(gallery_router(h.state.clone()), upload_request(&auth, body)).await;
        let id = json["image"]["id"].as_str().unwrap().to_string();

        let req = Request::put(format!("/api/admin/gallery/{id}"))
            .header("authorization", &auth)
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({"featured": "true", "tags": "a, b ,,c", "order": "4"}).to_string(),
            ))
            .unwrap();
        let (status, json) = send(gallery_router(h.state), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["image"]["featured"], true);
        assert_eq!(json["image"]["tags"], serde_json::json!(["a", "b", "c"]));
        assert_eq!(json["image"]["order"], 4);
        assert_eq!(json["image"]["category"], "portraits");
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_ids_are_not_found() {
        let h = testing::harness();
        for id in ["not-a-uuid".to_string(), uuid::Uuid::new_v4().to_string()] {
            let req = Request::get(format!("/api/gallery/{id}"))
                .body(Body::empty())
                .unwrap();
            let (status, _) = send(gallery_router(h.state.clone()), req).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
        }
    }

    #[tokio::test]
    async fn test_public_list_filters_featured_and_category() {
        let h = testing::harness();
        let auth = bearer(&h.state);
        for (category, featured) in [("weddings", "true"), ("weddings", "false"), ("events", "true")] {
            let body = multipart_body(
                &[("category", category), ("featured", featured)],
                Some(("x.jpg", "image/jpeg", JPEG)),
            );
            let (status, _) = send(gallery_router(h.state.clone()), upload_request(&auth, body)).await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let req = Request::get("/api/gallery?category=weddings&featured=true")
            .body(Body::empty())
            .unwrap();
        let (_, json) = send(gallery_router(h.state.clone()), req).await;
        assert_eq!(json["pagination"]["total"], 1);

        let req = Request::get("/api/gallery?category=all&limit=2")
            .body(Body::empty())
            .unwrap();
        let (_, json) = send(gallery_router(h.state.clone()), req).await;
        assert_eq!(json["images"].as_array().unwrap().len(), 2);
        assert_eq!(json["pagination"]["pages"], 2);
        assert_eq!(json["images"][0]["featured"], true);

        let req = Request::get("/api/gallery?category=cats")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(gallery_router(h.state), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_hosted_objects() {
        let h = testing::harness();
        let auth = bearer(&h.state);
        let body = multipart_body(&[("category", "events")], Some(("e.jpg", "image/jpeg", JPEG)));
        let (_, json) = send(gallery_router(h.state.clone()), upload_request(&auth, body)).await;
        let id = json["image"]["id"].as_str().unwrap().to_string();
        assert_eq!(h.images.len().await, 2);

        let req = Request::delete(format!("/api/admin/gallery/{id}"))
            .header("authorization", &auth)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(gallery_router(h.state.clone()), req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(h.images.is_empty().await);

        let req = Request::get(format!("/api/admin/gallery/{id}"))
            .header("authorization", &auth)
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(gallery_router(h.state), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
