//! Runtime configuration
//!
//! Resolves where the catalog and the metadata cache live and how the
//! metadata client is set up. Values come from command-line arguments (and
//! their environment fallbacks); directories default to the platform's
//! standard locations.

use std::path::PathBuf;
use std::time::Duration;

/// Default lifetime of cached metadata responses (24 hours)
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "streamiz", "streamiz")
}

/// Platform data directory for the catalog
pub fn default_data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Platform cache directory for metadata responses
pub fn default_cache_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.cache_dir().to_path_buf())
}

/// Settings shared by all commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the catalog blob
    pub data_dir: Option<PathBuf>,
    /// Root directory of the metadata cache
    pub cache_dir: Option<PathBuf>,
    /// TMDB API key
    pub api_key: Option<String>,
    /// How long cached responses stay valid
    pub cache_ttl: Duration,
    /// Whether metadata responses are cached at all
    pub use_cache: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            cache_dir: default_cache_dir(),
            api_key: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            use_cache: true,
        }
    }
}

impl Config {
    /// Overrides the data directory when one is given
    pub fn with_data_dir(mut self, dir: Option<PathBuf>) -> Self {
        if dir.is_some() {
            self.data_dir = dir;
        }
        self
    }

    /// Sets the API key, ignoring blank values
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.trim().is_empty());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let config = Config::default()
            .with_data_dir(Some(PathBuf::from("/tmp/streamiz")))
            .with_api_key(Some("  ".to_string()));
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/streamiz")));
        assert_eq!(config.api_key, None);
        assert_eq!(config.cache_ttl, DEFAULT_CACHE_TTL);

        let config = Config::default().with_data_dir(None).with_api_key(Some("k".to_string()));
        assert_eq!(config.data_dir, default_data_dir());
        assert_eq!(config.api_key.as_deref(), Some("k"));
    }
}
