//! Postgres-backed document store. Nested documents live in JSONB columns.

use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, types::Json, FromRow, PgPool, Postgres, QueryBuilder, Row};
use uuid::Uuid;

use super::models::{
    Contact, ContactChanges, ContactStatus, ContentBlock, ContentImage, ContentSection,
    ContentUpsert, EventType, ExifData, GalleryCategory, GalleryChanges, GalleryImage,
    MonthCount, NewContact, NewGalleryImage, UnknownVariant,
};
use super::{
    ContactQuery, ContactStore, ContentStore, GalleryOrder, GalleryQuery, GalleryStore, Page,
    Pagination, StudioStore,
};
use crate::error::StoreError;

const GALLERY_COLUMNS: &str = "id, title, description, category, image_url, external_storage_id, \
     thumbnail_url, featured, exif_data, tags, sort_order, created_at, updated_at";

const CONTACT_COLUMNS: &str = "id, name, email, phone, subject, message, event_date, event_type, \
     budget, status, notes, created_at, updated_at";

const CONTENT_COLUMNS: &str =
    "id, section, title, subtitle, content, images, metadata, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn decode_text<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: UnknownVariant| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn decode_optional_text<T>(row: &PgRow, column: &str) -> Result<Option<T>, sqlx::Error>
where
    T: FromStr<Err = UnknownVariant>,
{
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|value| {
        value.parse().map_err(|e: UnknownVariant| sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(e),
        })
    })
    .transpose()
}

impl<'r> FromRow<'r, PgRow> for GalleryImage {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            category: decode_text(row, "category")?,
            image_url: row.try_get("image_url")?,
            external_storage_id: row.try_get("external_storage_id")?,
            thumbnail_url: row.try_get("thumbnail_url")?,
            featured: row.try_get("featured")?,
            exif_data: row.try_get::<Json<ExifData>, _>("exif_data")?.0,
            tags: row.try_get("tags")?,
            order: row.try_get("sort_order")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for Contact {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            subject: row.try_get("subject")?,
            message: row.try_get("message")?,
            event_date: row.try_get("event_date")?,
            event_type: decode_optional_text(row, "event_type")?,
            budget: decode_optional_text(row, "budget")?,
            status: decode_text(row, "status")?,
            notes: row.try_get("notes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, PgRow> for ContentBlock {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            section: decode_text(row, "section")?,
            title: row.try_get("title")?,
            subtitle: row.try_get("subtitle")?,
            content: row.try_get("content")?,
            images: row.try_get::<Json<Vec<ContentImage>>, _>("images")?.0,
            metadata: row.try_get("metadata")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn push_gallery_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &GalleryQuery) {
    qb.push(" WHERE TRUE");
    if let Some(category) = query.category {
        qb.push(" AND category = ").push_bind(category.as_str());
    }
    if query.featured_only {
        qb.push(" AND featured");
    }
}

fn parse_counts<T>(rows: Vec<(String, i64)>) -> Result<Vec<(T, i64)>, StoreError>
where
    T: FromStr<Err = UnknownVariant>,
{
    rows.into_iter()
        .map(|(key, count)| {
            key.parse()
                .map(|k| (k, count))
                .map_err(|e: UnknownVariant| StoreError::Corrupt(e.to_string()))
        })
        .collect()
}

#[async_trait]
impl GalleryStore for PgStore {
    async fn list_images(&self, query: &GalleryQuery) -> Result<Page<GalleryImage>, StoreError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM gallery_images");
        push_gallery_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {GALLERY_COLUMNS} FROM gallery_images"
        ));
        push_gallery_filters(&mut select, query);
        select.push(match query.order {
            GalleryOrder::Showcase => {
                " ORDER BY featured DESC, sort_order ASC, created_at DESC, id ASC"
            }
            GalleryOrder::Newest => " ORDER BY created_at DESC, id ASC",
        });
        select
            .push(" LIMIT ")
            .push_bind(query.page.limit)
            .push(" OFFSET ")
            .push_bind(query.page.offset());

        let items = select
            .build_query_as::<GalleryImage>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            pagination: Pagination::new(query.page, total),
        })
    }

    async fn find_image(&self, id: Uuid) -> Result<Option<GalleryImage>, StoreError> {
        let sql = format!("SELECT {GALLERY_COLUMNS} FROM gallery_images WHERE id = $1");
        Ok(sqlx::query_as::<_, GalleryImage>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn insert_image(&self, image: NewGalleryImage) -> Result<GalleryImage, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO gallery_images
                (id, title, description, category, image_url, external_storage_id,
                 thumbnail_url, featured, exif_data, tags, sort_order, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, now(), now())
            RETURNING {GALLERY_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, GalleryImage>(&sql)
            .bind(Uuid::new_v4())
            .bind(&image.title)
            .bind(&image.description)
            .bind(image.category.as_str())
            .bind(&image.image_url)
            .bind(&image.external_storage_id)
            .bind(&image.thumbnail_url)
            .bind(image.featured)
            .bind(Json(&image.exif_data))
            .bind(&image.tags)
            .bind(image.order)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update_image(
        &self,
        id: Uuid,
        changes: GalleryChanges,
    ) -> Result<Option<GalleryImage>, StoreError> {
        let sql = format!(
            r#"
            UPDATE gallery_images SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                featured = COALESCE($5, featured),
                tags = COALESCE($6, tags),
                sort_order = COALESCE($7, sort_order),
                updated_at = now()
            WHERE id = $1
            RETURNING {GALLERY_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, GalleryImage>(&sql)
            .bind(id)
            .bind(changes.title)
            .bind(changes.description)
            .bind(changes.category.map(GalleryCategory::as_str))
            .bind(changes.featured)
            .bind(changes.tags)
            .bind(changes.order)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_image(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM gallery_images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_images(&self) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar("SELECT COUNT(*) FROM gallery_images")
            .fetch_one(&self.pool)
            .await?)
    }

    async fn count_images_by_category(&self) -> Result<Vec<(GalleryCategory, i64)>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT category, COUNT(*) FROM gallery_images GROUP BY category ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;
        parse_counts(rows)
    }
}

#[async_trait]
impl ContactStore for PgStore {
    async fn insert_contact(&self, contact: NewContact) -> Result<Contact, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO contacts
                (id, name, email, phone, subject, message, event_date, event_type, budget,
                 status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, now(), now())
            RETURNING {CONTACT_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Contact>(&sql)
            .bind(Uuid::new_v4())
            .bind(&contact.name)
            .bind(&contact.email)
            .bind(&contact.phone)
            .bind(&contact.subject)
            .bind(&contact.message)
            .bind(contact.event_date)
            .bind(contact.event_type.map(EventType::as_str))
            .bind(contact.budget.map(|b| b.as_str()))
            .bind(ContactStatus::New.as_str())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_contacts(&self, query: &ContactQuery) -> Result<Page<Contact>, StoreError> {
        let status = query.status.map(ContactStatus::as_str);

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE ($1::TEXT IS NULL OR status = $1)")
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

        let sql = format!(
            r#"
            SELECT {CONTACT_COLUMNS} FROM contacts
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC, id ASC
            LIMIT $2 OFFSET $3
            "#
        );
        let items = sqlx::query_as::<_, Contact>(&sql)
            .bind(status)
            .bind(query.page.limit)
            .bind(query.page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok(Page {
            items,
            pagination: Pagination::new(query.page, total),
        })
    }

    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>, StoreError> {
        let sql = format!("SELECT {CONTACT_COLUMNS} FROM contacts WHERE id = $1");
        Ok(sqlx::query_as::<_, Contact>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn update_contact(
        &self,
        id: Uuid,
        changes: ContactChanges,
    ) -> Result<Option<Contact>, StoreError> {
        let sql = format!(
            r#"
            UPDATE contacts SET
                status = COALESCE($2, status),
                notes = COALESCE($3, notes),
                updated_at = now()
            WHERE id = $1
            RETURNING {CONTACT_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Contact>(&sql)
            .bind(id)
            .bind(changes.status.map(ContactStatus::as_str))
            .bind(changes.notes)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn count_contacts(&self, status: Option<ContactStatus>) -> Result<i64, StoreError> {
        Ok(
            sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE ($1::TEXT IS NULL OR status = $1)")
                .bind(status.map(ContactStatus::as_str))
                .fetch_one(&self.pool)
                .await?,
        )
    }

    async fn count_contacts_by_status(&self) -> Result<Vec<(ContactStatus, i64)>, StoreError> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM contacts GROUP BY status ORDER BY status")
                .fetch_all(&self.pool)
                .await?;
        parse_counts(rows)
    }

    async fn count_contacts_by_event_type(&self) -> Result<Vec<(EventType, i64)>, StoreError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT event_type, COUNT(*) FROM contacts
            WHERE event_type IS NOT NULL
            GROUP BY event_type
            ORDER BY event_type
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        parse_counts(rows)
    }

    async fn count_contacts_created(
        &self,
        from: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<i64, StoreError> {
        Ok(sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM contacts
            WHERE created_at >= $1 AND ($2::TIMESTAMPTZ IS NULL OR created_at < $2)
            "#,
        )
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn count_contacts_by_month(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<MonthCount>, StoreError> {
        let rows: Vec<(i32, i32, i64)> = sqlx::query_as(
            r#"
            SELECT EXTRACT(YEAR FROM created_at AT TIME ZONE 'UTC')::INT,
                   EXTRACT(MONTH FROM created_at AT TIME ZONE 'UTC')::INT,
                   COUNT(*)
            FROM contacts
            WHERE created_at >= $1
            GROUP BY 1, 2
            ORDER BY 1, 2
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(year, month, count)| MonthCount {
                year,
                month: month as u32,
                count,
            })
            .collect())
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn find_content(
        &self,
        section: ContentSection,
    ) -> Result<Option<ContentBlock>, StoreError> {
        let sql = format!("SELECT {CONTENT_COLUMNS} FROM content_blocks WHERE section = $1");
        Ok(sqlx::query_as::<_, ContentBlock>(&sql)
            .bind(section.as_str())
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_content(&self, active_only: bool) -> Result<Vec<ContentBlock>, StoreError> {
        let sql = format!(
            "SELECT {CONTENT_COLUMNS} FROM content_blocks \
             WHERE ($1 = false OR is_active) ORDER BY section ASC"
        );
        Ok(sqlx::query_as::<_, ContentBlock>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn upsert_content(
        &self,
        section: ContentSection,
        upsert: ContentUpsert,
    ) -> Result<ContentBlock, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO content_blocks
                (id, section, title, subtitle, content, images, metadata, is_active,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5,
                    COALESCE($6, '[]'::jsonb), COALESCE($7, '{{}}'::jsonb), COALESCE($8, true),
                    now(), now())
            ON CONFLICT (section) DO UPDATE SET
                title = COALESCE($3, content_blocks.title),
                subtitle = COALESCE($4, content_blocks.subtitle),
                content = COALESCE($5, content_blocks.content),
                images = COALESCE($6, content_blocks.images),
                metadata = COALESCE($7, content_blocks.metadata),
                is_active = COALESCE($8, content_blocks.is_active),
                updated_at = now()
            RETURNING {CONTENT_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, ContentBlock>(&sql)
            .bind(Uuid::new_v4())
            .bind(section.as_str())
            .bind(upsert.title)
            .bind(upsert.subtitle)
            .bind(upsert.content)
            .bind(upsert.images.map(Json))
            .bind(upsert.metadata)
            .bind(upsert.is_active)
            .fetch_one(&self.pool)
            .await?)
    }
}

#[async_trait]
impl StudioStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<Duration, StoreError> {
        let start = Instant::now();
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(start.elapsed())
    }
}

/// Runs against a live database when `TEST_DATABASE_URL` is set; skipped otherwise.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_pool, run_migrations, DbConfig};

    async fn test_store() -> Option<PgStore> {
        let url = std::env::var("TEST_DATABASE_URL").ok()?;
        let config = DbConfig {
            url,
            max_connections: 2,
            min_connections: 1,
            connect_timeout_secs: 5,
            idle_timeout_secs: 60,
        };
        let pool = init_pool(&config).await.unwrap();
        run_migrations(&pool).await.unwrap();
        // Second pass must be a no-op.
        run_migrations(&pool).await.unwrap();
        Some(PgStore::new(pool))
    }

    #[tokio::test]
    async fn test_migrations_and_round_trips() {
        let Some(store) = test_store().await else {
            return;
        };
        assert_eq!(store.backend(), "postgres");
        store.ping().await.unwrap();

        let before = store.count_images().await.unwrap();
        let image = store
            .insert_image(NewGalleryImage {
                title: "Ceremony".into(),
                description: None,
                category: GalleryCategory::Weddings,
                image_url: "https://img.example/ceremony.jpg".into(),
                external_storage_id: format!("portfolio/{}", Uuid::new_v4()),
                thumbnail_url: None,
                featured: false,
                exif_data: ExifData::default(),
                tags: vec!["bride".into()],
                order: 0,
            })
            .await
            .unwrap();
        assert_eq!(store.count_images().await.unwrap(), before + 1);

        let updated = store
            .update_image(
                image.id,
                GalleryChanges {
                    featured: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert!(updated.featured);
        assert_eq!(updated.tags, vec!["bride"]);
        assert!(store.delete_image(image.id).await.unwrap());

        let contact = store
            .insert_contact(NewContact {
                name: "Jane".into(),
                email: "jane@x.com".into(),
                phone: None,
                subject: None,
                message: "Hi".into(),
                event_date: None,
                event_type: None,
                budget: None,
            })
            .await
            .unwrap();
        assert_eq!(contact.status, ContactStatus::New);
        let booked = store
            .update_contact(
                contact.id,
                ContactChanges {
                    status: Some(ContactStatus::Booked),
                    notes: Some("confirmed".into()),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(booked.notes.as_deref(), Some("confirmed"));
        let recent = store
            .count_contacts_created(Utc::now() - chrono::Duration::days(1), None)
            .await
            .unwrap();
        assert!(recent >= 1);

        let first = store
            .upsert_content(ContentSection::About, ContentUpsert::default())
            .await
            .unwrap();
        let second = store
            .upsert_content(ContentSection::About, ContentUpsert::default())
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.metadata.is_object());
    }
}
