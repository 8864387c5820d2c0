/**
 * Contact Inquiries
 * Public submission and the admin status workflow
 */
use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

use super::clean;
use crate::db::models::{Contact, ContactChanges, ContactStatus, EventType, NewContact};
use crate::db::{ContactQuery, Page, PageRequest, StudioStore};
use crate::error::{AppError, AppResult};

lazy_static::lazy_static! {
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

const MAX_NAME_LEN: usize = 200;
const MAX_MESSAGE_LEN: usize = 5000;

/// Contact form body as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub event_date: Option<String>,
    pub event_type: Option<String>,
    pub budget: Option<String>,
}

impl ContactSubmission {
    fn validate(self) -> AppResult<NewContact> {
        let (Some(name), Some(email), Some(message)) =
            (clean(self.name), clean(self.email), clean(self.message))
        else {
            return Err(AppError::ValidationFailed {
                field: None,
                message: "Name, email, and message are required.".to_string(),
            });
        };

        if name.chars().count() > MAX_NAME_LEN {
            return Err(AppError::invalid("name", "Name is too long"));
        }
        if message.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::invalid("message", "Message is too long"));
        }

        let email = email.to_lowercase();
        if !EMAIL_REGEX.is_match(&email) {
            return Err(AppError::invalid("email", "Invalid email address"));
        }

        Ok(NewContact {
            name,
            email,
            phone: clean(self.phone),
            subject: clean(self.subject),
            message,
            event_date: clean(self.event_date)
                .map(|raw| parse_event_date(&raw))
                .transpose()?,
            event_type: parse_optional(self.event_type, "eventType")?,
            budget: parse_optional(self.budget, "budget")?,
        })
    }
}

/// Empty strings count as absent; anything else must be a known value.
fn parse_optional<T>(raw: Option<String>, field: &'static str) -> AppResult<Option<T>>
where
    T: std::str::FromStr<Err = crate::db::models::UnknownVariant>,
{
    clean(raw)
        .map(|value| {
            value
                .parse::<T>()
                .map_err(|e| AppError::invalid(field, format!("Invalid {field}: {}", e.value)))
        })
        .transpose()
}

/// Accepts a calendar date (`2025-06-14`) or a full RFC 3339 timestamp.
fn parse_event_date(raw: &str) -> AppResult<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| AppError::invalid("eventDate", "Invalid event date"))
}

pub async fn submit(store: &dyn StudioStore, submission: ContactSubmission) -> AppResult<Contact> {
    let contact = store.insert_contact(submission.validate()?).await?;
    tracing::info!(
        id = %contact.id,
        event_type = contact.event_type.map(|e| e.as_str()).unwrap_or("-"),
        "contact inquiry received"
    );
    Ok(contact)
}

/// `None`, empty and `"all"` mean no status filter.
pub fn parse_status_filter(raw: Option<&str>) -> AppResult<Option<ContactStatus>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|_| AppError::invalid("status", format!("Invalid status: {s}"))),
    }
}

pub async fn list(
    store: &dyn StudioStore,
    status: Option<ContactStatus>,
    page: PageRequest,
) -> AppResult<Page<Contact>> {
    Ok(store.list_contacts(&ContactQuery { status, page }).await?)
}

pub async fn get(store: &dyn StudioStore, id: Uuid) -> AppResult<Contact> {
    store
        .find_contact(id)
        .await?
        .ok_or(AppError::NotFound("Contact"))
}

/// Admin edit body. Any status may follow any other.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactUpdate {
    pub status: Option<String>,
    pub notes: Option<String>,
}

pub async fn update_status(
    store: &dyn StudioStore,
    id: Uuid,
    update: ContactUpdate,
) -> AppResult<Contact> {
    let changes = ContactChanges {
        status: parse_optional(update.status, "status")?,
        notes: update.notes.map(|n| n.trim().to_string()),
    };
    let contact = store
        .update_contact(id, changes)
        .await?
        .ok_or(AppError::NotFound("Contact"))?;
    tracing::info!(id = %id, status = %contact.status, "contact updated");
    Ok(contact)
}
