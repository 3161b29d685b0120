use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Form, Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use gram_db::{Database, models::CreateUserOutcome, queries::now_timestamp};
use gram_types::api::{Claims, DeleteResponse, LoginForm, LoginResponse, RegisterRequest, UserResponse};

use crate::error::ApiError;
use crate::relay::CdnRelay;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub relay: CdnRelay,
}

const MIN_PASSWORD_LEN: usize = 8;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();

    // Validate input
    if !email_looks_valid(&email) {
        return Err(ApiError::Validation("invalid email address".into()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();

    let user_id = Uuid::new_v4();

    // The UNIQUE constraint decides duplicates, so two concurrent
    // registrations for the same email cannot both succeed.
    let outcome = state
        .db
        .create_user(&user_id.to_string(), &email, &password_hash, &now_timestamp())?;
    if outcome == CreateUserOutcome::EmailTaken {
        return Err(ApiError::Conflict("email already registered".into()));
    }

    info!("Registered {}", email);

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user_id,
            email,
            is_active: true,
            is_verified: false,
        }),
    ))
}

/// OAuth2-style password login: the form's `username` field carries the email.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, ApiError> {
    let email = form.username.trim().to_lowercase();

    let user = state
        .db
        .get_user_by_email(&email)?
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("stored hash unreadable: {}", e))?;

    Argon2::default()
        .verify_password(form.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("stored user id unreadable: {}", e))?;

    let token = create_token(&state.jwt_secret, user_id, &user.email)?;

    Ok(Json(LoginResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        // valid token for an account that no longer exists
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(UserResponse {
        id: claims.sub,
        email: user.email,
        is_active: user.is_active,
        is_verified: user.is_verified,
    }))
}

/// Remove the authenticated account and, in the same transaction,
/// every post it owns.
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let removed = state.db.delete_user(&claims.sub.to_string())?;

    info!("Deleted account {} ({} posts)", claims.email, removed);

    Ok(Json(DeleteResponse {
        success: true,
        message: format!("account deleted along with {} posts", removed),
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, email: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("token encoding failed: {}", e))?;

    Ok(token)
}

fn email_looks_valid(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && domain.len() > 2,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_format_rules() {
        assert!(email_looks_valid("alice@x.com"));
        assert!(email_looks_valid("a.b+c@sub.example.org"));
        assert!(!email_looks_valid("alice"));
        assert!(!email_looks_valid("@x.com"));
        assert!(!email_looks_valid("alice@nodot"));
        assert!(!email_looks_valid(""));
    }
}
