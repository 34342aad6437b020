use std::{path::Path, str::FromStr, time::Duration};

use getset::{Getters, Setters};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::{
    config::{DEFAULT_HTTP_MAX_RETRIES, DEFAULT_SLOW_LOAD_THRESHOLD_MS},
    ExtmodError, ExtmodResult,
};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// Tunables shared by the loader, its HTTP backend and the load-state projector.
///
/// Durations are expressed in milliseconds so the TOML form stays flat:
///
/// ```toml
/// slow_load_threshold_ms = 1500
/// http_max_retries = 5
/// request_timeout_ms = 10000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder, PartialEq, Eq, Getters, Setters)]
#[getset(get = "pub with_prefix", set = "pub")]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// How long a load stays pending before the spinner is raised.
    #[serde(default = "default_slow_load_threshold_ms")]
    #[builder(default = DEFAULT_SLOW_LOAD_THRESHOLD_MS)]
    slow_load_threshold_ms: u64,

    /// Retries applied to transient HTTP failures.
    #[serde(default = "default_http_max_retries")]
    #[builder(default = DEFAULT_HTTP_MAX_RETRIES)]
    http_max_retries: u32,

    /// Optional per-request timeout for bundle fetches.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    #[builder(default, setter(strip_option))]
    request_timeout_ms: Option<u64>,
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl LoaderConfig {
    /// Reads a configuration from a TOML file.
    pub async fn from_path(path: impl AsRef<Path>) -> ExtmodResult<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await?;
        tracing::debug!("loaded config from {}", path.display());
        contents.parse()
    }

    /// The slow-load threshold as a [`Duration`].
    pub fn slow_load_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_load_threshold_ms)
    }

    /// The request timeout as a [`Duration`], if one is configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FromStr for LoaderConfig {
    type Err = ExtmodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(s)?)
    }
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

fn default_slow_load_threshold_ms() -> u64 {
    DEFAULT_SLOW_LOAD_THRESHOLD_MS
}

fn default_http_max_retries() -> u32 {
    DEFAULT_HTTP_MAX_RETRIES
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_loader_config_defaults() {
        let config = LoaderConfig::default();
        assert_eq!(config.slow_load_threshold(), Duration::from_millis(1000));
        assert_eq!(*config.get_http_max_retries(), 3);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_loader_config_parse_partial() -> anyhow::Result<()> {
        let config: LoaderConfig = "slow_load_threshold_ms = 250".parse()?;
        assert_eq!(*config.get_slow_load_threshold_ms(), 250);
        assert_eq!(*config.get_http_max_retries(), DEFAULT_HTTP_MAX_RETRIES);

        let empty: LoaderConfig = "".parse()?;
        assert_eq!(empty, LoaderConfig::default());
        Ok(())
    }

    #[test]
    fn test_loader_config_rejects_unknown_fields() {
        let result = "spinner_delay = 10".parse::<LoaderConfig>();
        assert!(matches!(result, Err(ExtmodError::ConfigParse(_))));
    }

    #[tokio::test]
    async fn test_loader_config_from_path() -> anyhow::Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "http_max_retries = 0")?;
        writeln!(file, "request_timeout_ms = 5000")?;

        let config = LoaderConfig::from_path(file.path()).await?;
        assert_eq!(*config.get_http_max_retries(), 0);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
        Ok(())
    }
}
