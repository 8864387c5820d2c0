//! Editable content blocks, one per page section.

use serde::Deserialize;

use crate::db::models::{ContentBlock, ContentImage, ContentSection, ContentUpsert};
use crate::db::StudioStore;
use crate::error::{AppError, AppResult};

pub fn parse_section(raw: &str) -> AppResult<ContentSection> {
    raw.parse().map_err(|_| {
        AppError::invalid(
            "section",
            format!(
                "Invalid section. Must be one of: {}",
                ContentSection::ALL
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        )
    })
}

/// Public lookup; inactive blocks and unknown sections are both not found.
pub async fn get_active(store: &dyn StudioStore, section: &str) -> AppResult<ContentBlock> {
    let section = section
        .parse::<ContentSection>()
        .map_err(|_| AppError::NotFound("Content"))?;
    store
        .find_content(section)
        .await?
        .filter(|block| block.is_active)
        .ok_or(AppError::NotFound("Content"))
}

pub async fn list_active(store: &dyn StudioStore) -> AppResult<Vec<ContentBlock>> {
    Ok(store.list_content(true).await?)
}

pub async fn list_all(store: &dyn StudioStore) -> AppResult<Vec<ContentBlock>> {
    Ok(store.list_content(false).await?)
}

/// Admin upsert body; omitted fields keep their stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentUpdate {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub content: Option<String>,
    pub images: Option<Vec<ContentImage>>,
    pub metadata: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

impl ContentUpdate {
    fn into_upsert(self) -> AppResult<ContentUpsert> {
        if let Some(metadata) = &self.metadata {
            if !metadata.is_object() {
                return Err(AppError::invalid("metadata", "Metadata must be an object"));
            }
        }
        if let Some(images) = &self.images {
            if images.iter().any(|img| img.url.trim().is_empty()) {
                return Err(AppError::invalid("images", "Every image needs a url"));
            }
        }

        Ok(ContentUpsert {
            title: self.title.map(|t| t.trim().to_string()),
            subtitle: self.subtitle.map(|s| s.trim().to_string()),
            content: self.content,
            images: self.images,
            metadata: self.metadata,
            is_active: self.is_active,
        })
    }
}

pub async fn upsert(
    store: &dyn StudioStore,
    section: &str,
    update: ContentUpdate,
) -> AppResult<ContentBlock> {
    let section = parse_section(section)?;
    let block = store.upsert_content(section, update.into_upsert()?).await?;
    tracing::info!(section = %section, active = block.is_active, "content block saved");
    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn titled(title: &str) -> ContentUpdate {
        ContentUpdate {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_missing_section_then_upsert() {
        let store = MemoryStore::new();
        assert!(matches!(
            get_active(&store, "about").await,
            Err(AppError::NotFound("Content"))
        ));

        upsert(&store, "about", titled("T")).await.unwrap();

        let block = get_active(&store, "about").await.unwrap();
        assert_eq!(block.title.as_deref(), Some("T"));
        assert!(block.is_active);
    }

    #[tokio::test]
    async fn test_upsert_twice_is_idempotent() {
        let store = MemoryStore::new();
        let first = upsert(&store, "hero", titled("Welcome")).await.unwrap();
        let second = upsert(&store, "hero", titled("Welcome")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.title, second.title);
        assert_eq!(first.metadata, second.metadata);
        assert_eq!(list_all(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_inactive_block_hidden_from_public() {
        let store = MemoryStore::new();
        upsert(&store, "services", titled("Packages")).await.unwrap();
        upsert(
            &store,
            "services",
            ContentUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        upsert(&store, "about", titled("Me")).await.unwrap();

        assert!(get_active(&store, "services").await.is_err());
        let active = list_active(&store).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].section, ContentSection::About);

        let all = list_all(&store).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].title.as_deref(), Some("Packages"));
    }

    #[tokio::test]
    async fn test_upsert_validates_input() {
        let store = MemoryStore::new();
        assert!(matches!(
            upsert(&store, "footer", titled("x")).await,
            Err(AppError::ValidationFailed {
                field: Some("section"),
                ..
            })
        ));

        let bad_metadata = ContentUpdate {
            metadata: Some(serde_json::json!(["not", "an", "object"])),
            ..Default::default()
        };
        assert!(upsert(&store, "hero", bad_metadata).await.is_err());
        assert!(list_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_public_section_is_not_found() {
        let store = MemoryStore::new();
        assert!(matches!(
            get_active(&store, "footer").await,
            Err(AppError::NotFound(_))
        ));
    }
}
