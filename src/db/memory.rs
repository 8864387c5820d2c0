//! In-process document store used when no database is configured, and by tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{
    Contact, ContactChanges, ContactStatus, ContentBlock, ContentSection, ContentUpsert,
    EventType, GalleryCategory, GalleryChanges, GalleryImage, MonthCount, NewContact,
    NewGalleryImage,
};
use super::{
    ContactQuery, ContactStore, ContentStore, GalleryOrder, GalleryQuery, GalleryStore, Page,
    PageRequest, Pagination, StudioStore,
};
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryStore {
    gallery: RwLock<HashMap<Uuid, GalleryImage>>,
    contacts: RwLock<HashMap<Uuid, Contact>>,
    content: RwLock<BTreeMap<ContentSection, ContentBlock>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every operation fails as if the database were down.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    /// Rewrites a contact's creation time, for seeding time-window fixtures.
    #[cfg(test)]
    pub async fn set_contact_created_at(&self, id: Uuid, created_at: DateTime<Utc>) -> bool {
        match self.contacts.write().await.get_mut(&id) {
            Some(contact) => {
                contact.created_at = created_at;
                true
            }
            None => false,
        }
    }
}

fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len() as i64;
    let items = items
        .into_iter()
        .skip(request.offset() as usize)
        .take(request.limit as usize)
        .collect();
    Page {
        items,
        pagination: Pagination::new(request, total),
    }
}

fn count_by<K: Ord, T>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> Option<K>) -> Vec<(K, i64)> {
    let mut counts: BTreeMap<K, i64> = BTreeMap::new();
    for item in items {
        if let Some(k) = key(&item) {
            *counts.entry(k).or_default() += 1;
        }
    }
    counts.into_iter().collect()
}

#[async_trait]
impl GalleryStore for MemoryStore {
    async fn list_images(&self, query: &GalleryQuery) -> Result<Page<GalleryImage>, StoreError> {
        self.ensure_online()?;
        let gallery = self.gallery.read().await;
        let mut images: Vec<GalleryImage> = gallery
            .values()
            .filter(|img| query.category.map_or(true, |c| img.category == c))
            .filter(|img| !query.featured_only || img.featured)
            .cloned()
            .collect();

        match query.order {
            GalleryOrder::Showcase => images.sort_by(|a, b| {
                b.featured
                    .cmp(&a.featured)
                    .then(a.order.cmp(&b.order))
                    .then(b.created_at.cmp(&a.created_at))
                    .then(a.id.cmp(&b.id))
            }),
            GalleryOrder::Newest => {
                images.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)))
            }
        }

        Ok(paginate(images, query.page))
    }

    async fn find_image(&self, id: Uuid) -> Result<Option<GalleryImage>, StoreError> {
        self.ensure_online()?;
        Ok(self.gallery.read().await.get(&id).cloned())
    }

    async fn insert_image(&self, image: NewGalleryImage) -> Result<GalleryImage, StoreError> {
        self.ensure_online()?;
        let now = Utc::now();
        let stored = GalleryImage {
            id: Uuid::new_v4(),
            title: image.title,
            description: image.description,
            category: image.category,
            image_url: image.image_url,
            external_storage_id: image.external_storage_id,
            thumbnail_url: image.thumbnail_url,
            featured: image.featured,
            exif_data: image.exif_data,
            tags: image.tags,
            order: image.order,
            created_at: now,
            updated_at: now,
        };
        self.gallery.write().await.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn update_image(
        &self,
        id: Uuid,
        changes: GalleryChanges,
    ) -> Result<Option<GalleryImage>, StoreError> {
        self.ensure_online()?;
        let mut gallery = self.gallery.write().await;
        Ok(gallery.get_mut(&id).map(|image| {
            changes.apply(image);
            image.updated_at = Utc::now();
            image.clone()
        }))
    }

    async fn delete_image(&self, id: Uuid) -> Result<bool, StoreError> {
        self.ensure_online()?;
        Ok(self.gallery.write().await.remove(&id).is_some())
    }

    async fn count_images(&self) -> Result<i64, StoreError> {
        self.ensure_online()?;
        Ok(self.gallery.read().await.len() as i64)
    }

    async fn count_images_by_category(&self) -> Result<Vec<(GalleryCategory, i64)>, StoreError> {
        self.ensure_online()?;
        let gallery = self.gallery.read().await;
        Ok(count_by(gallery.values(), |img| Some(img.category)))
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn insert_contact(&self, contact: NewContact) -> Result<Contact, StoreError> {
        self.ensure_online()?;
        let now = Utc::now();
        let stored = Contact {
            id: Uuid::new_v4(),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            subject: contact.subject,
            message: contact.message,
            event_date: contact.event_date,
            event_type: contact.event_type,
            budget: contact.budget,
            status: ContactStatus::New,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.contacts.write().await.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list_contacts(&self, query: &ContactQuery) -> Result<Page<Contact>, StoreError> {
        self.ensure_online()?;
        let contacts = self.contacts.read().await;
        let mut matching: Vec<Contact> = contacts
            .values()
            .filter(|c| query.status.map_or(true, |s| c.status == s))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(paginate(matching, query.page))
    }

    async fn find_contact(&self, id: Uuid) -> Result<Option<Contact>, StoreError> {
        self.ensure_online()?;
        Ok(self.contacts.read().await.get(&id).cloned())
    }

    async fn update_contact(
        &self,
        id: Uuid,
        changes: ContactChanges,
    ) -> Result<Option<Contact>, StoreError> {
        self.ensure_online()?;
        let mut contacts = self.contacts.write().await;
        Ok(contacts.get_mut(&id).map(|contact| {
            changes.apply(contact);
            contact.updated_at = Utc::now();
            contact.clone()
        }))
    }

    async fn count_contacts(&self, status: Option<ContactStatus>) -> Result<i64, StoreError> {
        self.ensure_online()?;
        let contacts = self.contacts.read().await;
        Ok(contacts
            .values()
            .filter(|c| status.map_or(true, |s| c.status == s))
            .count() as i64)
    }

    async fn count_contacts_by_status(&self) -> Result<Vec<(ContactStatus, i64)>, StoreError> {
        self.ensure_online()?;
        let contacts = self.contacts.read().await;
        Ok(count_by(contacts.values(), |c| Some(c.status)))
    }

    async fn count_contacts_by_event_type(&self) -> Result<Vec<(EventType, i64)>, StoreError> {
        self.ensure_online()?;
        let contacts = self.contacts.read().await;
        Ok(count_by(contacts.values(), |c| c.event_type))
    }

    async fn count_contacts_created(
        &self,
        from: DateTime<Utc>,
        until: Option<DateTime<Utc>>,
    ) -> Result<i64, StoreError> {
        self.ensure_online()?;
        let contacts = self.contacts.read().await;
        Ok(contacts
            .values()
            .filter(|c| c.created_at >= from && until.map_or(true, |u| c.created_at < u))
            .count() as i64)
    }

    async fn count_contacts_by_month(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<MonthCount>, StoreError> {
        self.ensure_online()?;
        let contacts = self.contacts.read().await;
        let buckets = count_by(
            contacts.values().filter(|c| c.created_at >= since),
            |c| Some((c.created_at.year(), c.created_at.month())),
        );
        Ok(buckets
            .into_iter()
            .map(|((year, month), count)| MonthCount { year, month, count })
            .collect())
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn find_content(
        &self,
        section: ContentSection,
    ) -> Result<Option<ContentBlock>, StoreError> {
        self.ensure_online()?;
        Ok(self.content.read().await.get(&section).cloned())
    }

    async fn list_content(&self, active_only: bool) -> Result<Vec<ContentBlock>, StoreError> {
        self.ensure_online()?;
        // BTreeMap iteration is already ascending by section name.
        let content = self.content.read().await;
        Ok(content
            .values()
            .filter(|block| !active_only || block.is_active)
            .cloned()
            .collect())
    }

    async fn upsert_content(
        &self,
        section: ContentSection,
        upsert: ContentUpsert,
    ) -> Result<ContentBlock, StoreError> {
        self.ensure_online()?;
        let now = Utc::now();
        let mut content = self.content.write().await;
        let block = content.entry(section).or_insert_with(|| ContentBlock {
            id: Uuid::new_v4(),
            section,
            title: None,
            subtitle: None,
            content: None,
            images: Vec::new(),
            metadata: serde_json::json!({}),
            is_active: true,
            created_at: now,
            updated_at: now,
        });
        upsert.apply(block);
        block.updated_at = now;
        Ok(block.clone())
    }
}

#[async_trait]
impl StudioStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<Duration, StoreError> {
        self.ensure_online()?;
        let start = Instant::now();
        let _ = self.gallery.read().await.len();
        Ok(start.elapsed())
    }
}
