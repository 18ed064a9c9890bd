//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::error::{CrudError, CrudResult};

/// Default upper bound for one encoded request, 64 MiB.
pub const DEFAULT_MAX_ALLOWED_PACKET: usize = 64 * 1024 * 1024;

/// Settings shared by every builder created from a session.
///
/// # Example
///
/// ```ignore
/// use xcrud_core::config::SessionConfig;
///
/// let config = SessionConfig::from_json_str(r#"{ "default_schema": "shop" }"#)?;
/// assert_eq!(config.default_schema.as_deref(), Some("shop"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Schema returned by `Session::default_schema`.
    pub default_schema: Option<String>,
    /// Largest encoded request, in bytes, the session will submit.
    pub max_allowed_packet: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            default_schema: None,
            max_allowed_packet: DEFAULT_MAX_ALLOWED_PACKET,
        }
    }
}

impl SessionConfig {
    /// Reads a configuration from JSON text. Missing keys take their default value.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::InvalidArgument`] if the text is not a valid configuration.
    pub fn from_json_str(text: &str) -> CrudResult<Self> {
        let config: SessionConfig = serde_json::from_str(text)
            .map_err(|err| CrudError::InvalidArgument(format!("invalid session config: {err}")))?;
        config.validate()?;

        Ok(config)
    }

    /// Checks the values for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`CrudError::InvalidArgument`] if `max_allowed_packet` is zero or
    /// the default schema name is blank.
    pub fn validate(&self) -> CrudResult<()> {
        if self.max_allowed_packet == 0 {
            return Err(CrudError::InvalidArgument("max_allowed_packet must be positive".into()));
        }
        if let Some(schema) = &self.default_schema {
            if schema.trim().is_empty() {
                return Err(CrudError::InvalidArgument("default_schema is blank".into()));
            }
        }

        Ok(())
    }
}
