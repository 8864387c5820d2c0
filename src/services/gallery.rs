/**
 * Gallery Operations
 * Listing, upload pipeline, edits, deletion and category statistics
 */
use uuid::Uuid;

use super::clean;
use crate::db::models::{
    CategoryCount, ExifData, GalleryCategory, GalleryChanges, GalleryImage, NewGalleryImage,
    PublicGalleryImage,
};
use crate::db::{GalleryOrder, GalleryQuery, Page, PageRequest, StudioStore};
use crate::error::{AppError, AppResult};
use crate::images::{Derivative, ImageHost, MAX_UPLOAD_BYTES};

/// `None`, empty and `"all"` mean no category filter.
pub fn parse_category_filter(raw: Option<&str>) -> AppResult<Option<GalleryCategory>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => parse_category(s).map(Some),
    }
}

fn parse_category(raw: &str) -> AppResult<GalleryCategory> {
    raw.parse().map_err(|_| {
        AppError::invalid(
            "category",
            format!(
                "Invalid category. Must be one of: {}",
                GalleryCategory::ALL
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
    })
}

// ============================================================================
// Reads
// ============================================================================

pub async fn list_public(
    store: &dyn StudioStore,
    category: Option<GalleryCategory>,
    featured_only: bool,
    page: PageRequest,
) -> AppResult<Page<PublicGalleryImage>> {
    let query = GalleryQuery {
        category,
        featured_only,
        order: GalleryOrder::Showcase,
        page,
    };
    Ok(store.list_images(&query).await?.map(PublicGalleryImage::from))
}

pub async fn list_admin(
    store: &dyn StudioStore,
    category: Option<GalleryCategory>,
    page: PageRequest,
) -> AppResult<Page<GalleryImage>> {
    let query = GalleryQuery {
        category,
        featured_only: false,
        order: GalleryOrder::Newest,
        page,
    };
    Ok(store.list_images(&query).await?)
}

pub async fn get(store: &dyn StudioStore, id: Uuid) -> AppResult<GalleryImage> {
    store
        .find_image(id)
        .await?
        .ok_or(AppError::NotFound("Image"))
}

/// Per-category counts, led by an `all` bucket holding the total.
pub async fn category_stats(store: &dyn StudioStore) -> AppResult<Vec<CategoryCount>> {
    let total = store.count_images().await?;
    let per_category = store.count_images_by_category().await?;

    let mut stats = Vec::with_capacity(per_category.len() + 1);
    stats.push(CategoryCount {
        name: "all".to_string(),
        count: total,
    });
    stats.extend(per_category.into_iter().map(|(category, count)| CategoryCount {
        name: category.as_str().to_string(),
        count,
    }));
    Ok(stats)
}

// ============================================================================
// Upload
// ============================================================================

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Normalised upload form. Title falls back to the file name.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub file: Option<UploadedFile>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub featured: bool,
    pub tags: Vec<String>,
    pub exif_data: ExifData,
    pub order: i32,
}

struct ValidUpload {
    file: UploadedFile,
    title: String,
    description: Option<String>,
    category: GalleryCategory,
    featured: bool,
    tags: Vec<String>,
    exif_data: ExifData,
    order: i32,
}

impl UploadRequest {
    fn validate(self) -> AppResult<ValidUpload> {
        let file = self
            .file
            .ok_or_else(|| AppError::invalid("image", "No image file provided"))?;

        let is_image = file
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"));
        if !is_image {
            return Err(AppError::invalid("image", "Only image files are allowed"));
        }
        if file.bytes.is_empty() {
            return Err(AppError::invalid("image", "Image file is empty"));
        }
        if file.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::invalid("image", "Image exceeds the 10 MB limit"));
        }

        let title = clean(self.title)
            .or_else(|| clean(Some(file.filename.clone())))
            .ok_or_else(|| AppError::invalid("title", "Title is required"))?;

        let category = match clean(self.category) {
            Some(raw) => parse_category(&raw)?,
            None => return Err(AppError::invalid("category", "Category is required")),
        };

        Ok(ValidUpload {
            file,
            title,
            description: clean(self.description),
            category,
            featured: self.featured,
            tags: self.tags,
            exif_data: self.exif_data,
            order: self.order,
        })
    }
}

/// Validates, uploads the display image, derives the thumbnail, then saves
/// the record. Remote objects created before a failure are destroyed again.
pub async fn upload(
    store: &dyn StudioStore,
    host: &dyn ImageHost,
    request: UploadRequest,
) -> AppResult<GalleryImage> {
    let upload = request.validate()?;

    let main = host
        .upload(upload.file.bytes, &upload.file.filename, Derivative::Display)
        .await
        .map_err(AppError::UploadRejected)?;

    let thumbnail = match host.upload_from_url(&main.url, Derivative::Thumbnail).await {
        Ok(thumbnail) => thumbnail,
        Err(e) => {
            release(host, &[main.public_id.as_str()]).await;
            return Err(AppError::UploadRejected(e));
        }
    };

    let record = NewGalleryImage {
        title: upload.title,
        description: upload.description,
        category: upload.category,
        image_url: main.url,
        external_storage_id: main.public_id.clone(),
        thumbnail_url: Some(thumbnail.url),
        featured: upload.featured,
        exif_data: upload.exif_data,
        tags: upload.tags,
        order: upload.order,
    };

    match store.insert_image(record).await {
        Ok(image) => {
            tracing::info!(id = %image.id, category = %image.category, "gallery image uploaded");
            Ok(image)
        }
        Err(e) => {
            release(host, &[main.public_id.as_str(), thumbnail.public_id.as_str()]).await;
            Err(e.into())
        }
    }
}

/// Best-effort removal of remote objects; failures are only logged.
async fn release(host: &dyn ImageHost, public_ids: &[&str]) {
    for public_id in public_ids {
        if let Err(e) = host.destroy(public_id).await {
            tracing::warn!(public_id = %public_id, error = %e, "failed to release hosted image");
        }
    }
}

// ============================================================================
// Edit & delete
// ============================================================================

/// Normalised partial edit; category arrives unparsed.
#[derive(Debug, Clone, Default)]
pub struct GalleryUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub featured: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub order: Option<i32>,
}

impl GalleryUpdate {
    fn into_changes(self) -> AppResult<GalleryChanges> {
        let title = match self.title {
            Some(raw) => Some(
                clean(Some(raw)).ok_or_else(|| AppError::invalid("title", "Title cannot be empty"))?,
            ),
            None => None,
        };
        let category = match self.category {
            Some(raw) => Some(parse_category(&raw)?),
            None => None,
        };

        Ok(GalleryChanges {
            title,
            description: self.description.map(|d| d.trim().to_string()),
            category,
            featured: self.featured,
            tags: self.tags,
            order: self.order,
        })
    }
}

pub async fn update(
    store: &dyn StudioStore,
    id: Uuid,
    update: GalleryUpdate,
) -> AppResult<GalleryImage> {
    let changes = update.into_changes()?;
    store
        .update_image(id, changes)
        .await?
        .ok_or(AppError::NotFound("Image"))
}

/// Releases the hosted object, then removes the record. A failed remote
/// delete is logged and does not stop the local delete.
pub async fn delete(store: &dyn StudioStore, host: &dyn ImageHost, id: Uuid) -> AppResult<()> {
    let image = get(store, id).await?;

    // Thumbnail handles are not stored; the host recovers them from the URL.
    let thumbnail_id = image
        .thumbnail_url
        .as_deref()
        .and_then(|url| host.public_id_from_url(url));

    let mut handles = vec![image.external_storage_id.as_str()];
    handles.extend(thumbnail_id.as_deref());
    release(host, &handles).await;

    if !store.delete_image(id).await? {
        return Err(AppError::NotFound("Image"));
    }
    tracing::info!(id = %id, "gallery image deleted");
    Ok(())
}
