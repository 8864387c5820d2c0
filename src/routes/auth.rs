/**
 * Authentication Routes
 * Single-admin login issuing a 24h JWT, and bearer-token verification
 */
use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, HeaderMap},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::state::{AppState, SharedState};

const TOKEN_TTL_HOURS: i64 = 24;
const ADMIN_ROLE: &str = "admin";

// ============================================================================
// Types
// ============================================================================

/// JWT Claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub message: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub email: String,
    pub role: String,
    pub expires_at: i64,
}

// ============================================================================
// Tokens
// ============================================================================

fn create_access_token(secret: &str, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: email.to_string(),
        email: email.to_string(),
        role: ADMIN_ROLE.to_string(),
        exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_access_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Gate for every admin handler; runs before any data access.
pub fn require_admin(state: &AppState, headers: &HeaderMap) -> AppResult<Claims> {
    let token = extract_bearer_token(headers)
        .ok_or(AppError::Unauthorized("Authorization required"))?;

    let claims = verify_access_token(&state.config.jwt_secret, token).map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        AppError::Unauthorized("Invalid or expired token")
    })?;

    if claims.role != ADMIN_ROLE {
        return Err(AppError::Unauthorized("Invalid or expired token"));
    }
    Ok(claims)
}

/// Extractor form of [`require_admin`]. Parts extractors run before the
/// body is read, so a bad token is a 401 whatever the body holds.
pub struct AdminClaims(pub Claims);

impl FromRequestParts<SharedState> for AdminClaims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        require_admin(state, &parts.headers).map(AdminClaims)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/admin/login
pub async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let email = payload.email.trim().to_string();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::ValidationFailed {
            field: None,
            message: "Email and password are required".to_string(),
        });
    }

    let admin = state.config.admin.clone().ok_or_else(|| {
        AppError::ConfigurationMissing(
            "Admin login is not configured. Set ADMIN_EMAIL and ADMIN_HASH_PASSWORD.".to_string(),
        )
    })?;

    // Hash check runs even for a wrong email so timing does not reveal it.
    let password = payload.password;
    let hash = admin.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await;

    let password_ok = match verified {
        Ok(Ok(ok)) => ok,
        Ok(Err(e)) => {
            tracing::error!("Stored admin password hash is unusable: {}", e);
            return Err(AppError::ConfigurationMissing(
                "Admin password hash is invalid".to_string(),
            ));
        }
        Err(e) => {
            tracing::error!("Password verification task failed: {}", e);
            false
        }
    };

    if !password_ok || !email.eq_ignore_ascii_case(&admin.email) {
        tracing::warn!("Failed admin login attempt for {}", email);
        return Err(AppError::Unauthorized("Invalid credentials"));
    }

    let token = create_access_token(&state.config.jwt_secret, &admin.email).map_err(|e| {
        tracing::error!("Failed to sign access token: {}", e);
        AppError::ConfigurationMissing("Token signing is misconfigured".to_string())
    })?;

    tracing::info!("Admin logged in: {}", admin.email);
    Ok(Json(LoginResponse {
        token,
        message: "Login successful".to_string(),
        expires_in: Duration::hours(TOKEN_TTL_HOURS).num_seconds(),
    }))
}

/// GET /api/admin/verify
pub async fn verify_token(
    AdminClaims(claims): AdminClaims,
) -> AppResult<impl IntoResponse> {
    Ok(Json(VerifyResponse {
        valid: true,
        email: claims.email,
        role: claims.role,
        expires_at: claims.exp,
    }))
}
