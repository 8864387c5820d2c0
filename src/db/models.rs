//! Document models for gallery images, contact inquiries and content blocks.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a string is not one of an enumeration's wire values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Declares a closed set of string-valued variants with serde, `Display`
/// and `FromStr` all agreeing on the same wire spelling.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let lowered = s.trim().to_lowercase();
                $name::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str() == lowered)
                    .ok_or(UnknownVariant { kind: $kind, value: s.to_string() })
            }
        }
    };
}

text_enum!(
    /// Gallery category. Ordering follows the wire name, which is the
    /// order category statistics are reported in.
    GalleryCategory, "category" {
        Events => "events",
        Portraits => "portraits",
        PreWeddings => "pre-weddings",
        Weddings => "weddings",
    }
);

text_enum!(EventType, "event type" {
    Wedding => "wedding",
    PreWedding => "pre-wedding",
    Event => "event",
    Portrait => "portrait",
    Other => "other",
});

text_enum!(Budget, "budget" {
    Under50k => "under-50k",
    From50kTo100k => "50k-100k",
    From100kTo200k => "100k-200k",
    Above200k => "200k-above",
    Discuss => "discuss",
});

text_enum!(
    /// Inquiry workflow status. Any status may be set from any other.
    ContactStatus, "status" {
        New => "new",
        Contacted => "contacted",
        Quoted => "quoted",
        Booked => "booked",
        Completed => "completed",
        Cancelled => "cancelled",
    }
);

text_enum!(ContentSection, "section" {
    About => "about",
    Contact => "contact",
    Hero => "hero",
    Services => "services",
    Testimonials => "testimonials",
});

// ============================================================================
// Gallery
// ============================================================================

/// Camera metadata captured alongside an uploaded image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExifData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lens: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focal_length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aperture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shutter_speed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iso: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_taken: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImage {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: GalleryCategory,
    pub image_url: String,
    pub external_storage_id: String,
    pub thumbnail_url: Option<String>,
    pub featured: bool,
    pub exif_data: ExifData,
    pub tags: Vec<String>,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Gallery image as exposed on public routes: no storage handle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicGalleryImage {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: GalleryCategory,
    pub image_url: String,
    pub thumbnail_url: Option<String>,
    pub featured: bool,
    pub exif_data: ExifData,
    pub tags: Vec<String>,
    pub order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<GalleryImage> for PublicGalleryImage {
    fn from(image: GalleryImage) -> Self {
        Self {
            id: image.id,
            title: image.title,
            description: image.description,
            category: image.category,
            image_url: image.image_url,
            thumbnail_url: image.thumbnail_url,
            featured: image.featured,
            exif_data: image.exif_data,
            tags: image.tags,
            order: image.order,
            created_at: image.created_at,
            updated_at: image.updated_at,
        }
    }
}

/// Gallery image for insertion. `image_url` and `external_storage_id`
/// come from the same host upload.
#[derive(Debug, Clone)]
pub struct NewGalleryImage {
    pub title: String,
    pub description: Option<String>,
    pub category: GalleryCategory,
    pub image_url: String,
    pub external_storage_id: String,
    pub thumbnail_url: Option<String>,
    pub featured: bool,
    pub exif_data: ExifData,
    pub tags: Vec<String>,
    pub order: i32,
}

/// Partial gallery update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct GalleryChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<GalleryCategory>,
    pub featured: Option<bool>,
    pub tags: Option<Vec<String>>,
    pub order: Option<i32>,
}

impl GalleryChanges {
    pub fn apply(self, image: &mut GalleryImage) {
        if let Some(title) = self.title {
            image.title = title;
        }
        if let Some(description) = self.description {
            image.description = Some(description);
        }
        if let Some(category) = self.category {
            image.category = category;
        }
        if let Some(featured) = self.featured {
            image.featured = featured;
        }
        if let Some(tags) = self.tags {
            image.tags = tags;
        }
        if let Some(order) = self.order {
            image.order = order;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: i64,
}

// ============================================================================
// Contacts
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub event_date: Option<DateTime<Utc>>,
    pub event_type: Option<EventType>,
    pub budget: Option<Budget>,
    pub status: ContactStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewContact {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub event_date: Option<DateTime<Utc>>,
    pub event_type: Option<EventType>,
    pub budget: Option<Budget>,
}

#[derive(Debug, Clone, Default)]
pub struct ContactChanges {
    pub status: Option<ContactStatus>,
    pub notes: Option<String>,
}

impl ContactChanges {
    pub fn apply(self, contact: &mut Contact) {
        if let Some(status) = self.status {
            contact.status = status;
        }
        if let Some(notes) = self.notes {
            contact.notes = Some(notes);
        }
    }
}

/// Count of contacts sharing one grouping key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupCount {
    #[serde(rename = "_id")]
    pub id: String,
    pub count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthCount {
    pub year: i32,
    pub month: u32,
    pub count: i64,
}

// ============================================================================
// Content blocks
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentImage {
    pub url: String,
    #[serde(default)]
    pub external_storage_id: Option<String>,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    pub id: Uuid,
    pub section: ContentSection,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub content: Option<String>,
    pub images: Vec<ContentImage>,
    pub metadata: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Upsert payload keyed by section; `None` keeps the stored value, or the
/// default when the block is being created.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentUpsert {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub content: Option<String>,
    pub images: Option<Vec<ContentImage>>,
    pub metadata: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

impl ContentUpsert {
    pub fn apply(self, block: &mut ContentBlock) {
        if let Some(title) = self.title {
            block.title = Some(title);
        }
        if let Some(subtitle) = self.subtitle {
            block.subtitle = Some(subtitle);
        }
        if let Some(content) = self.content {
            block.content = Some(content);
        }
        if let Some(images) = self.images {
            block.images = images;
        }
        if let Some(metadata) = self.metadata {
            block.metadata = metadata;
        }
        if let Some(is_active) = self.is_active {
            block.is_active = is_active;
        }
    }
}
