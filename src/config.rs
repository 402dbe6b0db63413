//! Server configuration from the environment.
//!
//! `HOST` / `PORT` pick the listen address (defaults `0.0.0.0:8080`).
//! `ADMIN_PASSWORD` gates the admin pages; without it nobody can log in.
//! `PREDETERMINED_WINNER_ID` optionally fixes the draw winner.
//! `SESSION_SECRET` signs the admin cookie (at least 64 bytes); a random key is
//! generated per process when unset, so logins do not survive restarts.
//! `COOKIE_SECURE=true` marks the admin cookie HTTPS-only.

use crate::logic::DrawTiming;
use thiserror::Error;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
/// Minimum key length accepted by the cookie signer.
pub const SESSION_SECRET_MIN_LEN: usize = 64;

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("SESSION_SECRET must be at least {min} bytes (got {got})", min = SESSION_SECRET_MIN_LEN)]
    SessionSecretTooShort { got: usize },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub admin_password: Option<String>,
    pub predetermined_winner_id: Option<String>,
    pub session_secret: Option<Vec<u8>>,
    pub cookie_secure: bool,
    pub draw: DrawTiming,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production, a map in tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_blank = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = non_blank("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match non_blank("PORT") {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                log::warn!("Ignoring invalid PORT {raw:?}, using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        let predetermined_winner_id = non_blank("PREDETERMINED_WINNER_ID");
        if lookup("PREDETERMINED_WINNER_ID").is_some() && predetermined_winner_id.is_none() {
            log::warn!("PREDETERMINED_WINNER_ID is set but blank, drawing at random");
        }

        let session_secret = match lookup("SESSION_SECRET") {
            Some(secret) if secret.len() < SESSION_SECRET_MIN_LEN => {
                return Err(ConfigError::SessionSecretTooShort { got: secret.len() })
            }
            Some(secret) => Some(secret.into_bytes()),
            None => None,
        };

        Ok(Self {
            host,
            port,
            admin_password: lookup("ADMIN_PASSWORD").filter(|p| !p.is_empty()),
            predetermined_winner_id,
            session_secret,
            cookie_secure: non_blank("COOKIE_SECURE")
                .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
            draw: DrawTiming::default(),
        })
    }
}
