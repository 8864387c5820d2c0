pub mod memory;
pub mod models;
pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use crate::error::StoreError;
use models::{
    Contact, ContactChanges, ContactStatus, ContentBlock, ContentSection, ContentUpsert,
    EventType, GalleryCategory, GalleryChanges, GalleryImage, MonthCount, NewContact,
    NewGalleryImage,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

// ============================================================================
// Connection
// ============================================================================

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl DbConfig {
    /// Reads pool settings from the environment; `None` without `DATABASE_URL`.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty())?;
        Some(Self {
            url,
            max_connections: std::env::var("DB_POOL_MAX")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            min_connections: std::env::var("DB_POOL_MIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            connect_timeout_secs: std::env::var("DB_CONNECT_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            idle_timeout_secs: std::env::var("DB_IDLE_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(300),
        })
    }

    /// Connection string with credentials masked, for logs.
    pub fn redacted_url(&self) -> String {
        match (self.url.find("://"), self.url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                format!("{}://***{}", &self.url[..scheme_end], &self.url[at..])
            }
            _ => self.url.clone(),
        }
    }
}

pub async fn init_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    tracing::info!(url = %config.redacted_url(), "initializing database connection pool");

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").fetch_one(&pool).await?;

    tracing::info!("database connection pool initialized");
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    tracing::info!("running database migrations");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS gallery_images (
            id UUID PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            category TEXT NOT NULL
                CHECK (category IN ('weddings', 'pre-weddings', 'events', 'portraits')),
            image_url TEXT NOT NULL,
            external_storage_id TEXT NOT NULL,
            thumbnail_url TEXT,
            featured BOOLEAN NOT NULL DEFAULT false,
            exif_data JSONB NOT NULL DEFAULT '{}'::jsonb,
            tags TEXT[] NOT NULL DEFAULT '{}',
            sort_order INTEGER NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One statement per query: prepared statements reject batches.
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_gallery_images_showcase
            ON gallery_images(category, featured DESC, sort_order ASC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_gallery_images_tags
            ON gallery_images USING GIN(tags)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            phone TEXT,
            subject TEXT,
            message TEXT NOT NULL,
            event_date TIMESTAMPTZ,
            event_type TEXT
                CHECK (event_type IN ('wedding', 'pre-wedding', 'event', 'portrait', 'other')),
            budget TEXT
                CHECK (budget IN ('under-50k', '50k-100k', '100k-200k', '200k-above', 'discuss')),
            status TEXT NOT NULL DEFAULT 'new'
                CHECK (status IN ('new', 'contacted', 'quoted', 'booked', 'completed', 'cancelled')),
            notes TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_contacts_status_created
            ON contacts(status, created_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_contacts_event_date
            ON contacts(event_date)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS content_blocks (
            id UUID PRIMARY KEY,
            section TEXT NOT NULL
                CHECK (section IN ('hero', 'about', 'services', 'testimonials', 'contact')),
            title TEXT,
            subtitle TEXT,
            content TEXT,
            images JSONB NOT NULL DEFAULT '[]'::jsonb,
            metadata JSONB NOT NULL DEFAULT '{}'::jsonb,
            is_active BOOLEAN NOT NULL DEFAULT true,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_content_blocks_section
            ON content_blocks(section)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("database migrations completed");
    Ok(())
}

// ============================================================================
// Queries & pagination
// ============================================================================

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;
/// Highest page whose offset still fits in an `i64`.
const MAX_PAGE: i64 = i64::MAX / MAX_PAGE_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        Self {
            page: page.unwrap_or(1).clamp(1, MAX_PAGE),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current: i64,
    pub pages: i64,
    pub total: i64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: i64) -> Self {
        Self {
            current: request.page,
            pages: (total + request.limit - 1) / request.limit,
            total,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GalleryOrder {
    /// Featured first, then manual order, then newest.
    #[default]
    Showcase,
    Newest,
}

#[derive(Debug, Clone, Default)]
pub struct GalleryQuery {
    pub category: Option<GalleryCategory>,
    pub featured_only: bool,
    pub order: GalleryOrder,
    pub page: PageRequest,
}

#[derive(Debug, Clone, Default)]
pub struct ContactQuery {
    pub status: Option<ContactStatus>,
    pub page: PageRequest,
}

// ============================================================================
// Store traits
// ============================================================================

#[async_trait]
pub trait GalleryStore: Send + Sync {
    async fn list_images(&self, query: &GalleryQuery) -> Result<Page<GalleryImage>, StoreError>;
    async fn find_image(&self, id: Uuid) -> Result<Option<GalleryImage>, StoreError>;
    async fn insert_image(&self, image: NewGalleryImage) -> Result<GalleryImage, StoreError>;
    async fn update_image(
        &self,
        id: Uuid,
        changes: GalleryChanges,
    ) -> Result<Option<GalleryImage>, StoreError>;
    /// Returns whether a record was removed.
    async fn delete_image(&self, id: Uuid) -> Result<bool, StoreError>;
    async fn count_images(&self) -> Result<i64, StoreError>;
    /// Non-empty categories only, ascending by name.
    async fn count_images_by_category(&self) -> Result<Vec<(GalleryCategory, i64)>, StoreError>;
}

#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn insert_contact(&self, contact: NewContact) -> Result<Contact, StoreError>;
    async fn list_contacts(&self, query: &ContactQuery) -> Result<Page<Contact>, StoreError>;
    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>, StoreError>;
    async fn update_contact(
        &self,
        id: Uuid,
        changes: ContactChanges,
    ) -> Result<Option<Contact>, StoreError>;
    async fn count_contacts(&self, status: Option<ContactStatus>) -> Result<i64, StoreError>;
    async fn count_contacts_by_status(&self) -> Result<Vec<(ContactStatus, i64)>, StoreError>;
    /// Contacts without an event type are left out.
    async fn count_contacts_by_event_type(&self) -> Result<Vec<(EventType, i64)>, StoreError>;
    /// Contacts created in `[from, until)`; open-ended when `until` is `None`.
    async fn count_contacts_created(
        &self,
        from: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<i64, StoreError>;
    /// Non-empty (year, month) buckets in UTC for contacts created since `since`.
    async fn count_contacts_by_month(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<MonthCount>, StoreError>;
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn find_content(
        &self,
        section: ContentSection,
    ) -> Result<Option<ContentBlock>, StoreError>;
    /// Ascending by section name.
    async fn list_content(&self, active_only: bool) -> Result<Vec<ContentBlock>, StoreError>;
    async fn upsert_content(
        &self,
        section: ContentSection,
        upsert: ContentUpsert,
    ) -> Result<ContentBlock, StoreError>;
}

#[async_trait]
pub trait StudioStore: GalleryStore + ContactStore + ContentStore {
    fn backend(&self) -> &'static str;

    /// Round-trips the store and reports the latency.
    async fn ping(&self) -> Result<Duration, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults_and_clamps() {
        assert_eq!(PageRequest::new(None, None), PageRequest { page: 1, limit: 20 });
        assert_eq!(PageRequest::new(Some(0), Some(500)).limit, MAX_PAGE_SIZE);
        assert_eq!(PageRequest::new(Some(-3), Some(0)), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn test_page_request_huge_page_does_not_overflow() {
        let req = PageRequest::new(Some(i64::MAX), Some(MAX_PAGE_SIZE));
        assert!(req.offset() > 0);
        assert_eq!(Pagination::new(req, 5).current, req.page);
    }

    #[test]
    fn test_pagination_page_count_rounds_up() {
        let req = PageRequest::new(Some(1), Some(20));
        assert_eq!(Pagination::new(req, 0).pages, 0);
        assert_eq!(Pagination::new(req, 20).pages, 1);
        assert_eq!(Pagination::new(req, 21).pages, 2);
    }

    #[test]
    fn test_redacted_url_hides_credentials() {
        let cfg = DbConfig {
            url: "postgres://studio:hunter2@db:5432/studio".into(),
            max_connections: 1,
            min_connections: 1,
            connect_timeout_secs: 1,
            idle_timeout_secs: 1,
        };
        let shown = cfg.redacted_url();
        assert!(!shown.contains("hunter2"));
        assert!(shown.ends_with("@db:5432/studio"));
    }
}
