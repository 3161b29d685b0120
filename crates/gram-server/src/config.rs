use std::path::PathBuf;

use gram_api::relay::IMAGEKIT_UPLOAD_API;

/// Runtime configuration, read from the environment (a .env file is
/// loaded first if present).
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub staging_dir: PathBuf,
    pub cdn: CdnConfig,
}

/// The ImageKit credential triple plus the upload endpoint (overridable
/// for tests and self-hosted mocks).
pub struct CdnConfig {
    pub private_key: String,
    pub public_key: String,
    pub url_endpoint: String,
    pub upload_api: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let host = var_or("GRAM_HOST", "0.0.0.0");
        let port: u16 = var_or("GRAM_PORT", "8001").parse()?;
        let db_path = PathBuf::from(var_or("GRAM_DB_PATH", "gram.db"));
        let jwt_secret = std::env::var("GRAM_JWT_SECRET").unwrap_or_default();
        let staging_dir = PathBuf::from(var_or("GRAM_STAGING_DIR", "./staging"));

        let cdn = CdnConfig {
            private_key: std::env::var("IMAGEKIT_PRIVATE_KEY").unwrap_or_default(),
            public_key: std::env::var("IMAGEKIT_PUBLIC_KEY").unwrap_or_default(),
            url_endpoint: std::env::var("IMAGEKIT_URL").unwrap_or_default(),
            upload_api: var_or("IMAGEKIT_UPLOAD_API", IMAGEKIT_UPLOAD_API),
        };

        Ok(Self {
            host,
            port,
            db_path,
            jwt_secret,
            staging_dir,
            cdn,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
