//! Data-access operations per record type. Handlers parse the wire format
//! and call in here; validation of record fields happens at this boundary.

pub mod analytics;
pub mod contacts;
pub mod content;
pub mod gallery;

use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Ids that do not parse cannot name a stored record.
pub fn parse_id(raw: &str, kind: &'static str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::NotFound(kind))
}

/// Trims and drops empty strings.
pub fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_rejects_garbage_as_not_found() {
        assert!(matches!(
            parse_id("not-a-uuid", "Image"),
            Err(AppError::NotFound("Image"))
        ));
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&format!(" {id} "), "Image").unwrap(), id);
    }

    #[test]
    fn test_clean() {
        assert_eq!(clean(Some("  x ".into())), Some("x".to_string()));
        assert_eq!(clean(Some("   ".into())), None);
        assert_eq!(clean(None), None);
    }
}
