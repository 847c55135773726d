//! Engine configuration.
//!
//! The engine itself has no tunables that change results: every automata
//! executes the same way under every configuration. What can be configured
//! are the hardening limits that decide how far the engine is willing to
//! go with a suspicious image before giving up.
//!
//! Configuration can be built in code or loaded from JSON or YAML:
//!
//! ```yaml
//! max_nonadvancing_steps: 4096
//! max_image_size: 67108864
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{EudoxusError, Result};

/// Hardening limits for an [`Engine`](crate::Engine).
///
/// # Example
/// ```rust
/// use eudoxus_engine::EngineConfig;
///
/// let config = EngineConfig::new()
///     .with_max_image_size(64 * 1024 * 1024)
///     .with_max_nonadvancing_steps(1024);
///
/// assert_eq!(config.max_image_size, Some(64 * 1024 * 1024));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum number of consecutive transitions that do not consume input.
    ///
    /// A well-formed automata can only chain non-advancing transitions
    /// through distinct nodes, so a longer chain means the image loops. The
    /// node count is bounded by the image size, which makes the image's
    /// `data_length` a safe ceiling.
    ///
    /// Exceeding the limit fails execution with `EINSANE`.
    ///
    /// **Default**: `None` (use `data_length`)
    pub max_nonadvancing_steps: Option<u64>,

    /// Largest image, in bytes, the engine will load.
    ///
    /// Checked before reading a file into memory, so an oversized file is
    /// rejected with `EALLOC` without attempting the allocation.
    ///
    /// **Default**: `None` (no limit)
    pub max_image_size: Option<u64>,
}

impl EngineConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| EudoxusError::Invalid(format!("engine config: {e}")))
    }

    /// Parse a configuration from YAML.
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| EudoxusError::Invalid(format!("engine config: {e}")))
    }

    /// Set the non-advancing transition limit.
    pub fn with_max_nonadvancing_steps(mut self, steps: u64) -> Self {
        self.max_nonadvancing_steps = Some(steps);
        self
    }

    /// Set the maximum image size in bytes.
    pub fn with_max_image_size(mut self, bytes: u64) -> Self {
        self.max_image_size = Some(bytes);
        self
    }

    /// Remove the image size limit.
    pub fn without_max_image_size(mut self) -> Self {
        self.max_image_size = None;
        self
    }

    /// Effective non-advancing limit for an image of `data_length` bytes.
    pub fn nonadvancing_limit(&self, data_length: u64) -> u64 {
        self.max_nonadvancing_steps.unwrap_or(data_length)
    }

    /// Check a buffer or file size against `max_image_size`.
    pub fn check_image_size(&self, size: u64) -> Result<()> {
        match self.max_image_size {
            Some(max) if size > max => Err(EudoxusError::Alloc(format!(
                "automata of {size} bytes exceeds limit of {max} bytes"
            ))),
            _ => Ok(()),
        }
    }
}
