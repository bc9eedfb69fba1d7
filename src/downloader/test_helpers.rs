//! Shared test helpers: an in-memory transport and run fixtures.

use crate::config::Settings;
use crate::error::TransportError;
use crate::source::{Episode, Source};
use crate::transport::Transport;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use tempfile::TempDir;

/// One URL served by [`FakeTransport`]
#[derive(Clone, Debug, Default)]
pub(crate) struct FakeResource {
    pub body: Vec<u8>,
    pub last_modified: Option<i64>,
    pub content_length: Option<u64>,
    /// Honor `offset > 0` with partial content
    pub ranges: bool,
    /// Reject every transfer as a refused resume, even from byte zero
    pub reject_always: bool,
    /// Fail every request with this HTTP status
    pub status: Option<u16>,
    /// On the first transfer only, write this many bytes and then fail
    pub fail_once_after: Option<usize>,
}

impl FakeResource {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            ranges: true,
            ..Default::default()
        }
    }

    pub fn last_modified(mut self, ts: i64) -> Self {
        self.last_modified = Some(ts);
        self
    }

    pub fn advertise_length(mut self) -> Self {
        self.content_length = Some(self.body.len() as u64);
        self
    }

    pub fn without_ranges(mut self) -> Self {
        self.ranges = false;
        self
    }

    pub fn rejecting_all(mut self) -> Self {
        self.reject_always = true;
        self
    }

    pub fn failing_with(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn interrupted_after(mut self, bytes: usize) -> Self {
        self.fail_once_after = Some(bytes);
        self
    }
}

/// In-memory [`Transport`] that records every transfer
#[derive(Default)]
pub(crate) struct FakeTransport {
    resources: Mutex<HashMap<String, FakeResource>>,
    downloads: Mutex<Vec<(String, u64)>>,
    fetches: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, resource: FakeResource) {
        self.resources
            .lock()
            .unwrap()
            .insert(url.to_string(), resource);
    }

    /// `(url, offset)` of every transfer attempt, in order
    pub fn downloads(&self) -> Vec<(String, u64)> {
        self.downloads.lock().unwrap().clone()
    }

    /// Offsets requested for `url`, in order
    pub fn offsets_for(&self, url: &str) -> Vec<u64> {
        self.downloads()
            .into_iter()
            .filter(|(u, _)| u == url)
            .map(|(_, offset)| offset)
            .collect()
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    fn resource(&self, url: &str) -> Result<FakeResource, TransportError> {
        let resources = self.resources.lock().unwrap();
        let resource = resources.get(url).ok_or(TransportError::Status(404))?;
        match resource.status {
            Some(code) => Err(TransportError::Status(code)),
            None => Ok(resource.clone()),
        }
    }
}

impl Transport for FakeTransport {
    fn last_modified(&self, url: &str) -> Result<Option<i64>, TransportError> {
        Ok(self.resource(url)?.last_modified)
    }

    fn content_length(&self, url: &str) -> Result<Option<u64>, TransportError> {
        Ok(self.resource(url)?.content_length)
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        self.fetches.lock().unwrap().push(url.to_string());
        Ok(self.resource(url)?.body)
    }

    fn download(
        &self,
        url: &str,
        offset: u64,
        sink: &mut dyn Write,
    ) -> Result<u64, TransportError> {
        self.downloads
            .lock()
            .unwrap()
            .push((url.to_string(), offset));
        let resource = self.resource(url)?;

        if resource.reject_always || (offset > 0 && !resource.ranges) {
            return Err(TransportError::ResumeRejected { offset });
        }

        let start = (offset as usize).min(resource.body.len());
        let rest = &resource.body[start..];

        let interrupted = self
            .resources
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|r| r.fail_once_after.take());
        if let Some(limit) = interrupted {
            sink.write_all(&rest[..limit.min(rest.len())])?;
            return Err(TransportError::Request("connection reset".to_string()));
        }

        sink.write_all(rest)?;
        Ok(rest.len() as u64)
    }
}

/// Settings rooted in a fresh temporary directory
pub(crate) fn temp_settings() -> (Settings, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.location.cast_dir = dir.path().join("casts");
    settings.location.cast_list = dir.path().join("casts.json");
    std::fs::create_dir_all(&settings.location.cast_dir).unwrap();
    (settings, dir)
}

/// A named source whose download directory already exists
pub(crate) fn test_source(settings: &Settings, url: &str, name: &str) -> Source {
    let mut source = Source::new(url).unwrap();
    source.set_name(Some(name));
    std::fs::create_dir_all(settings.cast_dir().join(source.prefix_path())).unwrap();
    source
}

pub(crate) fn test_episode(source: &Source, url: &str, size: Option<u64>) -> Episode {
    Episode::new(url, source).with_size_hint(size)
}
