//! In-memory transport for pipeline tests

use poddown::{Transport, TransportError};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

#[derive(Clone, Debug, Default)]
struct Entry {
    body: Vec<u8>,
    last_modified: Option<i64>,
}

/// Serves registered URLs from memory and records every transfer
#[derive(Default)]
pub struct MemoryTransport {
    entries: Mutex<HashMap<String, Entry>>,
    downloads: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, body: impl Into<Vec<u8>>) {
        self.serve_modified(url, body, None);
    }

    pub fn serve_modified(&self, url: &str, body: impl Into<Vec<u8>>, last_modified: Option<i64>) {
        self.entries.lock().unwrap().insert(
            url.to_string(),
            Entry {
                body: body.into(),
                last_modified,
            },
        );
    }

    /// URLs of every transfer so far, in order
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }

    fn entry(&self, url: &str) -> Result<Entry, TransportError> {
        self.entries
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(TransportError::Status(404))
    }
}

impl Transport for MemoryTransport {
    fn last_modified(&self, url: &str) -> Result<Option<i64>, TransportError> {
        Ok(self.entry(url)?.last_modified)
    }

    fn content_length(&self, url: &str) -> Result<Option<u64>, TransportError> {
        Ok(Some(self.entry(url)?.body.len() as u64))
    }

    fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        Ok(self.entry(url)?.body)
    }

    fn download(
        &self,
        url: &str,
        offset: u64,
        sink: &mut dyn Write,
    ) -> Result<u64, TransportError> {
        self.downloads.lock().unwrap().push(url.to_string());
        let entry = self.entry(url)?;
        let start = (offset as usize).min(entry.body.len());
        sink.write_all(&entry.body[start..])?;
        Ok((entry.body.len() - start) as u64)
    }
}
