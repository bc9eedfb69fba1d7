//! Test fixtures: temporary workspaces and feed documents

use poddown::{ConfigPaths, Settings};
use serde_json::{Value, json};
use std::path::PathBuf;
use tempfile::TempDir;

/// A config directory and download root inside one temporary directory
pub struct Workspace {
    pub dir: TempDir,
    pub paths: ConfigPaths,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let paths = ConfigPaths::new(dir.path().join("config"));
        std::fs::create_dir_all(paths.dir()).expect("Failed to create config dir");
        Self { dir, paths }
    }

    pub fn cast_dir(&self) -> PathBuf {
        self.dir.path().join("casts")
    }

    pub fn cast_list(&self) -> PathBuf {
        self.paths.dir().join("casts.json")
    }

    /// Settings pointing at this workspace, otherwise defaults
    pub fn settings(&self) -> Settings {
        self.settings_from(json!({}))
    }

    /// Settings from a JSON document with the location group filled in
    pub fn settings_from(&self, mut doc: Value) -> Settings {
        doc["location"] = json!({
            "cast_dir": self.cast_dir(),
            "cast_list": self.cast_list(),
        });
        Settings::from_json(&doc.to_string()).expect("Failed to build settings")
    }

    /// Write `settings.json` with the location group filled in
    pub fn write_settings_file(&self, mut doc: Value) {
        doc["location"] = json!({
            "cast_dir": self.cast_dir(),
            "cast_list": self.cast_list(),
        });
        std::fs::write(self.paths.settings_file(), doc.to_string())
            .expect("Failed to write settings");
    }

    pub fn write_sources(&self, sources: Value) {
        std::fs::write(self.cast_list(), sources.to_string()).expect("Failed to write cast list");
    }

    /// Current prior-run marker, if any
    pub fn marker(&self) -> Option<i64> {
        std::fs::read_to_string(self.paths.last_download_file())
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
    }

    pub fn set_marker(&self, ts: i64) {
        std::fs::write(self.paths.last_download_file(), ts.to_string())
            .expect("Failed to write marker");
    }

    /// Path of a finished episode under the download root
    pub fn episode_path(&self, prefix: &str, file: &str) -> PathBuf {
        self.cast_dir().join(prefix).join(file)
    }
}

/// One feed item
#[derive(Clone, Debug)]
pub struct Item {
    pub url: Option<String>,
    pub published: i64,
    pub length: Option<u64>,
    pub explicit: Option<&'static str>,
}

impl Item {
    pub fn new(url: impl Into<String>, published: i64) -> Self {
        Self {
            url: Some(url.into()),
            published,
            length: None,
            explicit: None,
        }
    }

    pub fn without_url(published: i64) -> Self {
        Self {
            url: None,
            published,
            length: None,
            explicit: None,
        }
    }

    pub fn length(mut self, length: u64) -> Self {
        self.length = Some(length);
        self
    }

    pub fn explicit(mut self, marker: &'static str) -> Self {
        self.explicit = Some(marker);
        self
    }
}

/// An RSS 2.0 podcast feed with `items` in the given (newest first) order
pub fn rss_feed(items: &[Item]) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
  <channel>
    <title>Fixture Cast</title>
    <link>https://example.com</link>
    <description>Fixture</description>
"#,
    );
    for item in items {
        xml.push_str("    <item>\n");
        if let Some(url) = &item.url {
            let length = item.length.unwrap_or(0);
            xml.push_str(&format!(
                "      <enclosure url=\"{url}\" length=\"{length}\" type=\"audio/mpeg\"/>\n"
            ));
        }
        let date = chrono::DateTime::from_timestamp(item.published, 0)
            .expect("valid timestamp")
            .to_rfc2822();
        xml.push_str(&format!("      <pubDate>{date}</pubDate>\n"));
        if let Some(marker) = item.explicit {
            xml.push_str(&format!("      <itunes:explicit>{marker}</itunes:explicit>\n"));
        }
        xml.push_str("    </item>\n");
    }
    xml.push_str("  </channel>\n</rss>\n");
    xml
}
