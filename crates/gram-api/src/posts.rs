use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use gram_db::models::{DeleteOutcome, PostRow};
use gram_db::queries::now_timestamp;
use gram_types::api::{Claims, DeleteResponse, FeedPost, FeedResponse, PostResponse};
use gram_types::media::MediaKind;

use crate::auth::AppState;
use crate::error::ApiError;

/// POST /upload — multipart `{file, caption}`. The file is relayed to the
/// CDN first; only a successful relay produces a post row, so a failed
/// upload leaves the feed untouched.
pub async fn upload(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut caption: Option<String> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(format!("unreadable file field: {}", e)))?;
                file = Some((file_name, content_type, bytes.to_vec()));
            }
            Some("caption") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("unreadable caption: {}", e)))?;
                let text = text.trim().to_string();
                caption = (!text.is_empty()).then_some(text);
            }
            _ => {}
        }
    }

    let (file_name, content_type, bytes) =
        file.ok_or_else(|| ApiError::Validation("missing file field".into()))?;
    if bytes.is_empty() {
        return Err(ApiError::Validation("empty file".into()));
    }

    // Media kind and URL come from server-side data only: the declared
    // content type and the relay's reply, never the request body.
    let kind = MediaKind::from_content_type(&content_type);
    let relayed = state.relay.relay(&bytes, &file_name).await?;

    let post_id = Uuid::new_v4();
    let created_at = now_timestamp();

    let row = PostRow {
        id: post_id.to_string(),
        user_id: claims.sub.to_string(),
        caption: caption.clone(),
        url: relayed.url.clone(),
        file_type: kind.as_str().to_string(),
        file_name: file_name.clone(),
        created_at: created_at.clone(),
    };

    let db = state.clone();
    tokio::task::spawn_blocking(move || db.db.insert_post(&row))
        .await
        .map_err(|e| anyhow::anyhow!("join error: {}", e))??;

    info!("{} posted {} ({})", claims.email, file_name, kind);

    Ok(Json(PostResponse {
        id: post_id,
        caption,
        url: relayed.url,
        file_type: kind,
        file_name,
        created_at: parse_ts(&created_at)?,
    }))
}

/// GET /feed — every post, newest first, annotated with the owner email
/// and whether the requester may delete it.
pub async fn feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<FeedResponse>, ApiError> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_feed())
        .await
        .map_err(|e| anyhow::anyhow!("join error: {}", e))??;

    let requester = claims.sub.to_string();
    let posts = rows
        .into_iter()
        .map(|row| {
            Ok(FeedPost {
                id: row
                    .post
                    .id
                    .parse()
                    .map_err(|e| anyhow::anyhow!("stored post id unreadable: {}", e))?,
                caption: row.post.caption,
                url: row.post.url,
                // rows written by older backend versions may carry a raw
                // content type here; degrade them rather than failing the feed
                file_type: MediaKind::parse(&row.post.file_type).unwrap_or_else(|| {
                    warn!(
                        "post {} has unknown media kind {:?}, serving as image",
                        row.post.id, row.post.file_type
                    );
                    MediaKind::Image
                }),
                file_name: row.post.file_name,
                created_at: parse_ts(&row.post.created_at)?,
                email: row.owner_email,
                is_owner: row.post.user_id == requester,
            })
        })
        .collect::<Result<Vec<_>, ApiError>>()?;

    Ok(Json(FeedResponse { posts }))
}

/// DELETE /posts/{id} — owner only.
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(post_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let requester = claims.sub.to_string();

    let db = state.clone();
    let id = post_id.clone();
    let outcome = tokio::task::spawn_blocking(move || db.db.delete_post(&id, &requester))
        .await
        .map_err(|e| anyhow::anyhow!("join error: {}", e))??;

    match outcome {
        DeleteOutcome::Deleted => {
            info!("{} deleted post {}", claims.email, post_id);
            Ok(Json(DeleteResponse {
                success: true,
                message: "post deleted".to_string(),
            }))
        }
        DeleteOutcome::NotFound => Err(ApiError::NotFound("post")),
        DeleteOutcome::NotOwner => Err(ApiError::Forbidden),
    }
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, ApiError> {
    let ts = DateTime::parse_from_rfc3339(s)
        .map_err(|e| anyhow::anyhow!("stored timestamp unreadable: {}", e))?;
    Ok(ts.with_timezone(&Utc))
}
