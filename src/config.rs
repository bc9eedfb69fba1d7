//! Configuration types for poddown
//!
//! Settings are read from `settings.json` inside the per-user configuration
//! directory (`~/.config/poddown` on Linux). The document is grouped the same
//! way the settings are used:
//!
//! ```json
//! {
//!   "location": { "cast_dir": "/media/podcasts", "cast_list": "/home/me/casts.json" },
//!   "download": { "recent": 2, "keep_partial": true, "allow_explicit": "no" },
//!   "tuning":   { "feed_threads": 2, "download_threads": 8 }
//! }
//! ```
//!
//! Boolean settings accept either JSON booleans or truthy strings
//! (see [`is_truthy`](crate::utils::is_truthy)).

use crate::error::{Error, Result};
use crate::utils::deserialize_opt_flag;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// Name of the application directory inside the platform config directory
pub const APP_DIR_NAME: &str = "poddown";

/// Name of the settings file inside the configuration directory
pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Name of the prior-run marker file inside the configuration directory
pub const LAST_DOWNLOAD_FILE_NAME: &str = "lastdl";

/// Where things live on disk
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Root directory that episodes are downloaded into (required)
    #[serde(default)]
    pub cast_dir: PathBuf,

    /// Path of the JSON source list (required)
    #[serde(default)]
    pub cast_list: PathBuf,
}

/// Download behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// How many of the most recent entries to consider per feed (0 = unlimited)
    ///
    /// Negative values are treated as 0.
    #[serde(default)]
    pub recent: i64,

    /// Always fetch, even if the server reports the resource unchanged (default: false)
    #[serde(default, deserialize_with = "flag_default_false")]
    pub ignore_last_modified: bool,

    /// Keep `.part` files after a failed transfer so the next run can resume (default: true)
    #[serde(default = "default_true", deserialize_with = "flag_default_true")]
    pub keep_partial: bool,

    /// Default explicit-content policy for sources without an override (default: true)
    #[serde(default = "default_true", deserialize_with = "flag_default_true")]
    pub allow_explicit: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            recent: 0,
            ignore_last_modified: false,
            keep_partial: true,
            allow_explicit: true,
        }
    }
}

impl DownloadConfig {
    /// Number of recent entries to consider, 0 meaning unlimited
    #[must_use]
    pub fn recent_num(&self) -> usize {
        usize::try_from(self.recent.max(0)).unwrap_or(usize::MAX)
    }
}

/// Worker pool sizing and run bookkeeping
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TuningConfig {
    /// Feed pool workers (<= 0 picks half the available cores plus one)
    #[serde(default)]
    pub feed_threads: i64,

    /// Episode pool workers (<= 0 picks the available cores plus one)
    #[serde(default)]
    pub download_threads: i64,

    /// Advance the prior-run marker even when the run had errors (default: true)
    #[serde(default = "default_true", deserialize_with = "flag_default_true")]
    pub update_lastdl_on_error: bool,
}

impl Default for TuningConfig {
    fn default() -> Self {
        Self {
            feed_threads: 0,
            download_threads: 0,
            update_lastdl_on_error: true,
        }
    }
}

impl TuningConfig {
    /// Resolved feed pool size
    #[must_use]
    pub fn feed_pool_size(&self) -> usize {
        positive_or(self.feed_threads, available_cores() / 2 + 1)
    }

    /// Resolved episode pool size
    #[must_use]
    pub fn episode_pool_size(&self) -> usize {
        positive_or(self.download_threads, available_cores() + 1)
    }
}

/// Main configuration for poddown
///
/// Fields are organized into the three groups of the settings document:
/// - [`location`](LocationConfig): download root and source list path
/// - [`download`](DownloadConfig): freshness, resume and explicit-content policy
/// - [`tuning`](TuningConfig): pool sizes and marker update policy
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Download root and source list path
    #[serde(default)]
    pub location: LocationConfig,

    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// Pool sizing and run bookkeeping
    #[serde(default)]
    pub tuning: TuningConfig,
}

impl Settings {
    /// Read, parse and validate a settings file
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read, is not valid JSON,
    /// or a required setting is missing.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("Could not read settings file '{}': {}", path.display(), e),
            key: None,
        })?;
        Self::from_json(&raw)
    }

    /// Parse and validate settings from a JSON document
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] on malformed JSON or missing required settings.
    pub fn from_json(raw: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(raw).map_err(|e| Error::Config {
            message: format!("Failed to parse settings: {}", e),
            key: None,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check that required settings are present
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first missing key.
    pub fn validate(&self) -> Result<()> {
        if self.location.cast_dir.as_os_str().is_empty() {
            return Err(Error::config(
                "Cast download dir not specified",
                "location.cast_dir",
            ));
        }
        if self.location.cast_list.as_os_str().is_empty() {
            return Err(Error::config(
                "Cast list not specified",
                "location.cast_list",
            ));
        }
        Ok(())
    }

    /// Download root directory
    pub fn cast_dir(&self) -> &Path {
        &self.location.cast_dir
    }

    /// Source list path
    pub fn cast_list(&self) -> &Path {
        &self.location.cast_list
    }
}

/// Files poddown keeps in its configuration directory
#[derive(Clone, Debug)]
pub struct ConfigPaths {
    dir: PathBuf,
}

impl ConfigPaths {
    /// Use an explicit configuration directory
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve the configuration directory
    ///
    /// An explicit override wins; otherwise the platform config directory
    /// (`$XDG_CONFIG_HOME` or `$HOME/.config` on Linux) joined with `poddown`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no platform config directory can be determined.
    pub fn resolve(override_dir: Option<PathBuf>) -> Result<Self> {
        if let Some(dir) = override_dir {
            return Ok(Self::new(dir));
        }
        let base = dirs::config_dir().ok_or_else(|| Error::Config {
            message: "Could not determine configuration directory".to_string(),
            key: None,
        })?;
        Ok(Self::new(base.join(APP_DIR_NAME)))
    }

    /// The configuration directory itself
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of `settings.json`
    pub fn settings_file(&self) -> PathBuf {
        self.dir.join(SETTINGS_FILE_NAME)
    }

    /// Path of the prior-run marker file
    pub fn last_download_file(&self) -> PathBuf {
        self.dir.join(LAST_DOWNLOAD_FILE_NAME)
    }
}

fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn positive_or(value: i64, fallback: usize) -> usize {
    if value > 0 {
        usize::try_from(value).unwrap_or(fallback)
    } else {
        fallback
    }
}

fn default_true() -> bool {
    true
}

fn flag_default_true<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_opt_flag(deserializer)?.unwrap_or(true))
}

fn flag_default_false<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_opt_flag(deserializer)?.unwrap_or(false))
}
