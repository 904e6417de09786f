use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use buildwatch_core::upload::MAX_UPLOAD_BYTES;

use crate::auth::jwt::JwtConfig;

/// Server configuration, read once from the environment at startup.
///
/// | Env var                | Default                 |
/// |------------------------|-------------------------|
/// | `HOST`                 | `0.0.0.0`               |
/// | `PORT`                 | `3000`                  |
/// | `CORS_ORIGINS`         | `http://localhost:4321` |
/// | `REQUEST_TIMEOUT_SECS` | `30`                    |
/// | `UPLOAD_DIR`           | `./uploads`             |
/// | `MAX_UPLOAD_BYTES`     | `10485760` (per file)   |
///
/// JWT settings come from [`JwtConfig::from_env`]; SMTP settings are read by
/// [`crate::services::email::mailer_from_env`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Comma-separated in `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Root for `project-updates/` evidence and `templates/` files.
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// # Panics
    ///
    /// When a numeric variable does not parse or the JWT secret is missing.
    pub fn from_env() -> Self {
        Self {
            host: env_or("HOST", "0.0.0.0".to_string()),
            port: env_or("PORT", 3000),
            cors_origins: split_origins(
                &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:4321".into()),
            ),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            upload_dir: env_or("UPLOAD_DIR", PathBuf::from("./uploads")),
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", MAX_UPLOAD_BYTES),
            jwt: JwtConfig::from_env(),
        }
    }
}

fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{name} has an invalid value '{raw}': {e}")),
        Err(_) => default,
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
