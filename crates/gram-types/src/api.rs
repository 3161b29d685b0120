use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::media::MediaKind;

// -- JWT Claims --

/// JWT claims shared between the API middleware and the terminal client.
/// Canonical definition lives here in gram-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

/// Login is an OAuth2-style password form: `username` carries the email.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub is_active: bool,
    pub is_verified: bool,
}

// -- Posts --

#[derive(Debug, Serialize, Deserialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub caption: Option<String>,
    pub url: String,
    pub file_type: MediaKind,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedPost {
    pub id: Uuid,
    pub caption: Option<String>,
    pub url: String,
    pub file_type: MediaKind,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
    /// Email of the post's owner, for display.
    pub email: String,
    /// Whether the requesting user owns this post (and may delete it).
    pub is_owner: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FeedResponse {
    pub posts: Vec<FeedPost>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

// -- Errors --

/// Wire shape of every error body the API produces.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
