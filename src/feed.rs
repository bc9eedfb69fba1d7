//! Feed document parsing
//!
//! A podcast feed is reduced to an ordered list of [`FeedEntry`] values,
//! newest first as published. RSS 2.0 is tried first and Atom second.

use crate::error::{Error, Result};
use crate::utils::parse_size_hint;
use std::collections::BTreeMap;
use tracing::debug;

/// Explicit-content marker value that counts as "not explicit"
pub const CLEAN_MARKER: &str = "clean";

/// One feed item, reduced to what the downloader needs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FeedEntry {
    /// Media enclosure URL
    pub enclosure_url: Option<String>,
    /// Enclosure `length` attribute, if positive
    pub length: Option<u64>,
    /// `media:content` `fileSize` attribute, if positive
    pub media_file_size: Option<u64>,
    /// Publish date as seconds since the epoch; `None` if missing or unparsable
    pub pub_date: Option<i64>,
    /// Raw explicit-content marker (`itunes:explicit` and friends)
    pub explicit: Option<String>,
}

impl FeedEntry {
    /// Expected download size: `length`, then `media:content@fileSize`
    #[must_use]
    pub fn size_hint(&self) -> Option<u64> {
        self.length.or(self.media_file_size)
    }

    /// Whether the entry is explicitly marked clean
    #[must_use]
    pub fn is_marked_clean(&self) -> bool {
        self.explicit
            .as_deref()
            .is_some_and(|marker| marker.trim().eq_ignore_ascii_case(CLEAN_MARKER))
    }

    /// Whether the entry passes the explicit-content filter
    #[must_use]
    pub fn passes_explicit_filter(&self, allow_explicit: bool) -> bool {
        allow_explicit || self.is_marked_clean()
    }

    /// Whether the entry was published after `last_download`
    ///
    /// With no prior run every entry is fresh. Otherwise an entry without a
    /// usable date counts as published at the epoch and is therefore stale.
    #[must_use]
    pub fn is_fresh(&self, last_download: i64) -> bool {
        last_download <= 0 || self.pub_date.unwrap_or(0) > last_download
    }
}

/// Parse a feed document
///
/// # Errors
///
/// Returns [`Error::Feed`] if the document is neither RSS nor Atom.
pub fn parse_feed(content: &[u8]) -> Result<Vec<FeedEntry>> {
    match parse_as_rss(content) {
        Ok(entries) => {
            debug!(entries = entries.len(), "parsed RSS feed");
            Ok(entries)
        }
        Err(rss_err) => match parse_as_atom(content) {
            Ok(entries) => {
                debug!(entries = entries.len(), "parsed Atom feed");
                Ok(entries)
            }
            Err(atom_err) => Err(Error::Feed(format!(
                "not an RSS or Atom document. RSS error: {rss_err}. Atom error: {atom_err}"
            ))),
        },
    }
}

/// Parse a publish date into seconds since the epoch
///
/// Accepts the RSS form (`Tue, 10 Jun 2003 04:00:00 +0000`) and RFC 3339.
#[must_use]
pub fn parse_pub_date(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    chrono::DateTime::parse_from_rfc2822(raw)
        .or_else(|_| chrono::DateTime::parse_from_rfc3339(raw))
        .ok()
        .map(|dt| dt.timestamp())
}

fn parse_as_rss(content: &[u8]) -> std::result::Result<Vec<FeedEntry>, rss::Error> {
    let channel = rss::Channel::read_from(content)?;

    let entries = channel
        .items()
        .iter()
        .map(|item| {
            let enclosure = item.enclosure();
            let explicit = item
                .itunes_ext()
                .and_then(|itunes| itunes.explicit())
                .map(str::to_string)
                .or_else(|| find_extension_value(item.extensions(), "explicit"));

            FeedEntry {
                enclosure_url: enclosure
                    .map(|enc| enc.url().trim().to_string())
                    .filter(|url| !url.is_empty()),
                length: enclosure.and_then(|enc| parse_size_hint(enc.length())),
                media_file_size: find_extension_attr(item.extensions(), "content", "fileSize")
                    .and_then(|size| parse_size_hint(&size)),
                pub_date: item.pub_date().and_then(parse_pub_date),
                explicit,
            }
        })
        .collect();

    Ok(entries)
}

fn parse_as_atom(content: &[u8]) -> std::result::Result<Vec<FeedEntry>, atom_syndication::Error> {
    let feed = atom_syndication::Feed::read_from(content)?;

    let entries = feed
        .entries()
        .iter()
        .map(|entry| {
            let enclosure = entry.links().iter().find(|link| link.rel() == "enclosure");
            let published = entry.published().unwrap_or_else(|| entry.updated());

            FeedEntry {
                enclosure_url: enclosure
                    .map(|link| link.href().trim().to_string())
                    .filter(|url| !url.is_empty()),
                length: enclosure.and_then(|link| link.length().and_then(parse_size_hint)),
                media_file_size: find_extension_attr(entry.extensions(), "content", "fileSize")
                    .and_then(|size| parse_size_hint(&size)),
                pub_date: Some(published.timestamp()),
                explicit: find_extension_value(entry.extensions(), "explicit"),
            }
        })
        .collect();

    Ok(entries)
}

/// Extension maps of both feed crates share this shape: prefix -> name -> elements
type Extensions<E> = BTreeMap<String, BTreeMap<String, Vec<E>>>;

/// Common view over the `rss` and `atom_syndication` extension elements
trait ExtensionElement {
    fn text(&self) -> Option<&str>;
    fn attr(&self, name: &str) -> Option<&str>;
}

impl ExtensionElement for rss::extension::Extension {
    fn text(&self) -> Option<&str> {
        self.value()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs().get(name).map(String::as_str)
    }
}

impl ExtensionElement for atom_syndication::extension::Extension {
    fn text(&self) -> Option<&str> {
        self.value()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs().get(name).map(String::as_str)
    }
}

fn elements_named<'a, E>(extensions: &'a Extensions<E>, name: &'a str) -> impl Iterator<Item = &'a E> {
    extensions
        .values()
        .filter_map(move |by_name| by_name.get(name))
        .flatten()
}

fn find_extension_value<E: ExtensionElement>(extensions: &Extensions<E>, name: &str) -> Option<String> {
    elements_named(extensions, name)
        .find_map(|ext| ext.text())
        .map(|v| v.trim().to_string())
}

fn find_extension_attr<E: ExtensionElement>(
    extensions: &Extensions<E>,
    name: &str,
    attr: &str,
) -> Option<String> {
    elements_named(extensions, name)
        .find_map(|ext| ext.attr(attr))
        .map(str::to_string)
}
