use std::path::Path;

use thiserror::Error;

use gram_types::api::{
    DeleteResponse, ErrorResponse, FeedResponse, LoginForm, LoginResponse, PostResponse,
    RegisterRequest, UserResponse,
};

#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport or decode failure; the request never produced a usable reply.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-2xx status.
    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    #[error("unsupported file: {0}")]
    Media(String),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// HTTP client for the gram backend. Holds no session state — the caller
/// passes the bearer token explicitly on protected calls.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<UserResponse, ClientError> {
        let resp = self
            .http
            .post(format!("{}/auth/register", self.base_url))
            .json(&RegisterRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        json_or_error(resp).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let resp = self
            .http
            .post(format!("{}/auth/jwt/login", self.base_url))
            .form(&LoginForm {
                username: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;
        json_or_error(resp).await
    }

    pub async fn me(&self, token: &str) -> Result<UserResponse, ClientError> {
        let resp = self
            .http
            .get(format!("{}/users/me", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;
        json_or_error(resp).await
    }

    pub async fn upload(
        &self,
        token: &str,
        path: &Path,
        caption: &str,
    ) -> Result<PostResponse, ClientError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.clone())
            .mime_str(guess_content_type(&file_name))
            .map_err(|e| ClientError::Media(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("caption", caption.to_string());

        let resp = self
            .http
            .post(format!("{}/upload", self.base_url))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        json_or_error(resp).await
    }

    pub async fn feed(&self, token: &str) -> Result<FeedResponse, ClientError> {
        let resp = self
            .http
            .get(format!("{}/feed", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;
        json_or_error(resp).await
    }

    pub async fn delete_post(&self, token: &str, post_id: &str) -> Result<DeleteResponse, ClientError> {
        let resp = self
            .http
            .delete(format!("{}/posts/{}", self.base_url, post_id))
            .bearer_auth(token)
            .send()
            .await?;
        json_or_error(resp).await
    }
}

/// Decode a success body, or surface the backend's `{error}` message.
async fn json_or_error<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let message = resp
        .json::<ErrorResponse>()
        .await
        .map(|e| e.error)
        .unwrap_or_else(|_| "request failed".to_string());

    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_guesses() {
        assert_eq!(guess_content_type("cat.PNG"), "image/png");
        assert_eq!(guess_content_type("clip.mp4"), "video/mp4");
        assert_eq!(guess_content_type("noext"), "application/octet-stream");
    }
}
