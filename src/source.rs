//! Feed sources and the episodes derived from them

use crate::error::Result;
use crate::utils::deserialize_opt_flag;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Per-source override of the global explicit-content setting
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExplicitPolicy {
    /// Use `download.allow_explicit`
    #[default]
    Inherit,
    /// Accept explicit entries for this source
    Allow,
    /// Only accept entries marked clean
    Deny,
}

impl ExplicitPolicy {
    /// Policy from an optional flag; `None` inherits
    #[must_use]
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => ExplicitPolicy::Inherit,
            Some(true) => ExplicitPolicy::Allow,
            Some(false) => ExplicitPolicy::Deny,
        }
    }

    /// Whether explicit entries are allowed, given the global default
    #[must_use]
    pub fn allows(self, default: bool) -> bool {
        match self {
            ExplicitPolicy::Inherit => default,
            ExplicitPolicy::Allow => true,
            ExplicitPolicy::Deny => false,
        }
    }
}

/// One record of the source list, as written on disk
///
/// ```json
/// [
///   {"url": "https://example.com/feed.xml", "name": "Show", "category": "Tech", "explicit": "no"}
/// ]
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Feed URL (required for the record to be usable)
    #[serde(default)]
    pub url: Option<String>,

    /// Display name, also the leaf directory for downloads
    #[serde(default)]
    pub name: Option<String>,

    /// Category, the parent directory for downloads
    #[serde(default)]
    pub category: Option<String>,

    /// Explicit-content override (bool or truthy string; absent inherits)
    #[serde(default, deserialize_with = "deserialize_opt_flag")]
    pub explicit: Option<bool>,
}

/// Read the JSON source list
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the file cannot be read and
/// [`Error::Serialization`](crate::Error::Serialization) if it is not a JSON
/// array of source records.
pub fn load_source_records(path: &Path) -> Result<Vec<SourceRecord>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// A feed to poll
///
/// The download subdirectory (`prefix_path`) is derived from category and
/// name and recomputed whenever either changes.
#[derive(Clone, Debug)]
pub struct Source {
    url: String,
    name: Option<String>,
    category: Option<String>,
    explicit: ExplicitPolicy,
    prefix_path: PathBuf,
}

impl Source {
    /// Create a source for `url`; an empty URL yields `None`
    #[must_use]
    pub fn new(url: &str) -> Option<Self> {
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        Some(Self {
            url: url.to_string(),
            name: None,
            category: None,
            explicit: ExplicitPolicy::Inherit,
            prefix_path: PathBuf::new(),
        })
    }

    /// Build a source from a source-list record
    ///
    /// Returns `None` if the record has no usable URL.
    #[must_use]
    pub fn from_record(record: &SourceRecord) -> Option<Self> {
        let mut source = Self::new(record.url.as_deref()?)?;
        source.set_name(record.name.as_deref());
        source.set_category(record.category.as_deref());
        source.set_explicit_policy(ExplicitPolicy::from_flag(record.explicit));
        Some(source)
    }

    /// Set or clear the display name
    pub fn set_name(&mut self, name: Option<&str>) {
        self.name = non_empty(name);
        self.update_prefix_path();
    }

    /// Set or clear the category
    pub fn set_category(&mut self, category: Option<&str>) {
        self.category = non_empty(category);
        self.update_prefix_path();
    }

    /// Set the explicit-content override
    pub fn set_explicit_policy(&mut self, policy: ExplicitPolicy) {
        self.explicit = policy;
    }

    /// Feed URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Display name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Category, if any
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Explicit-content override
    pub fn explicit_policy(&self) -> ExplicitPolicy {
        self.explicit
    }

    /// Whether explicit entries are accepted, given the global default
    pub fn allows_explicit(&self, default: bool) -> bool {
        self.explicit.allows(default)
    }

    /// Download subdirectory: `category/name`, either one alone, or empty
    pub fn prefix_path(&self) -> &Path {
        &self.prefix_path
    }

    /// Name for log lines (falls back to the URL)
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }

    fn update_prefix_path(&mut self) {
        self.prefix_path = match (&self.category, &self.name) {
            (Some(category), Some(name)) => Path::new(category).join(name),
            (Some(category), None) => PathBuf::from(category),
            (None, Some(name)) => PathBuf::from(name),
            (None, None) => PathBuf::new(),
        };
    }
}

/// One media file to download
#[derive(Clone, Debug)]
pub struct Episode {
    /// Enclosure URL
    pub url: String,
    /// Name of the owning source, for log lines
    pub cast_name: String,
    /// Download subdirectory inherited from the source
    pub prefix_path: PathBuf,
    /// Expected size in bytes, if the feed advertised one
    pub size_hint: Option<u64>,
}

impl Episode {
    /// Create an episode of `source` located at `url`
    #[must_use]
    pub fn new(url: impl Into<String>, source: &Source) -> Self {
        Self {
            url: url.into(),
            cast_name: source.label().to_string(),
            prefix_path: source.prefix_path().to_path_buf(),
            size_hint: None,
        }
    }

    /// Attach an expected size; zero is ignored
    #[must_use]
    pub fn with_size_hint(mut self, size: Option<u64>) -> Self {
        self.size_hint = size.filter(|s| *s > 0);
        self
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
