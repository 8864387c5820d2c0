/**
 * Contact Routes
 * Public inquiry form and admin inquiry management
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};

use super::auth::AdminClaims;
use super::MessageResponse;
use crate::db::models::Contact;
use crate::db::{PageRequest, Pagination};
use crate::error::AppResult;
use crate::services::contacts::{self, ContactSubmission, ContactUpdate};
use crate::services::parse_id;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct ContactParams {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactListResponse {
    pub contacts: Vec<Contact>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContactResponse {
    pub message: String,
    pub contact: Contact,
}

/// POST /api/contact
pub async fn submit_contact(
    State(state): State<SharedState>,
    Json(payload): Json<ContactSubmission>,
) -> AppResult<impl IntoResponse> {
    contacts::submit(state.store.as_ref(), payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new("Contact details received successfully.")),
    ))
}

/// GET /api/admin/contacts
pub async fn list_contacts(
    State(state): State<SharedState>,
    _admin: AdminClaims,
    Query(params): Query<ContactParams>,
) -> AppResult<Json<ContactListResponse>> {
    let status = contacts::parse_status_filter(params.status.as_deref())?;
    let page = contacts::list(
        state.store.as_ref(),
        status,
        PageRequest::new(params.page, params.limit),
    )
    .await?;

    Ok(Json(ContactListResponse {
        contacts: page.items,
        pagination: page.pagination,
    }))
}

/// GET /api/admin/contacts/{id}
pub async fn get_contact(
    State(state): State<SharedState>,
    _admin: AdminClaims,
    Path(id): Path<String>,
) -> AppResult<Json<Contact>> {
    let id = parse_id(&id, "Contact")?;
    Ok(Json(contacts::get(state.store.as_ref(), id).await?))
}

/// PUT /api/admin/contacts/{id}
pub async fn update_contact(
    State(state): State<SharedState>,
    _admin: AdminClaims,
    Path(id): Path<String>,
    Json(payload): Json<ContactUpdate>,
) -> AppResult<Json<ContactResponse>> {
    let id = parse_id(&id, "Contact")?;

    let contact = contacts::update_status(state.store.as_ref(), id, payload).await?;
    Ok(Json(ContactResponse {
        message: "Contact updated successfully".to_string(),
        contact,
    }))
}
