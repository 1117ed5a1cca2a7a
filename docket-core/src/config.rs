//! Store-wide settings shared by every collection handle.

use std::time::Duration;

/// Timeout applied to every store call unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Settings a [`DocumentStore`](crate::store::DocumentStore) passes to its collections.
///
/// The call timeout is driven by `tokio::time`, so with a timeout set every collection call
/// must run inside a Tokio runtime. A config built with
/// [`without_timeout`](StoreConfigBuilder::without_timeout) adds no runtime requirement of
/// its own; the backend's requirements still apply.
///
/// # Example
///
/// ```ignore
/// use docket::config::StoreConfig;
/// use std::time::Duration;
///
/// let config = StoreConfig::builder()
///     .with_timeout(Duration::from_secs(2))
///     .build();
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Deadline for a single store call. `None` lets calls run unbounded.
    pub timeout: Option<Duration>,
}

impl StoreConfig {
    pub fn builder() -> StoreConfigBuilder {
        StoreConfigBuilder::new()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { timeout: Some(DEFAULT_TIMEOUT) }
    }
}

/// Builder for [`StoreConfig`]. Unset values fall back to the defaults.
#[derive(Debug, Clone, Default)]
pub struct StoreConfigBuilder {
    timeout: Option<Option<Duration>>,
}

impl StoreConfigBuilder {
    pub fn new() -> Self {
        Self { timeout: None }
    }

    /// Sets the deadline for each store call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(Some(timeout));
        self
    }

    /// Disables the per-call deadline.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = Some(None);
        self
    }

    pub fn build(self) -> StoreConfig {
        StoreConfig {
            timeout: self
                .timeout
                .unwrap_or(Some(DEFAULT_TIMEOUT)),
        }
    }
}
