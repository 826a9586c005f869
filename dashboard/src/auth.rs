use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::config::AppConfig;
use crate::error::AppError;

/// Opaque bearer credential. Never parsed, never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    /// `None` for an empty or whitespace-only value.
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn from_file(path: &Path) -> Result<Option<Self>, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|source| AppError::AuthToken {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(raw))
    }

    /// The inline token wins; otherwise the token file is read if configured.
    pub fn resolve(cfg: &AppConfig) -> Result<Option<Self>, AppError> {
        if let Some(token) = &cfg.auth_token {
            debug!("using inline auth token");
            return Ok(Some(token.clone()));
        }
        match &cfg.auth_token_file {
            Some(path) => {
                debug!(path = %path.display(), "reading auth token file");
                Self::from_file(path)
            }
            None => Ok(None),
        }
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}
