//! Remote access used by feed and episode jobs
//!
//! The [`Transport`] trait is the only way jobs talk to the network, which
//! keeps the pipeline testable without a server. [`HttpTransport`] is the
//! production implementation on top of a blocking `reqwest` client. Jobs run
//! on plain worker threads, so no async runtime is involved.

use crate::error::{Result, TransportError};
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT_ENCODING, CONTENT_LENGTH, HeaderMap, LAST_MODIFIED, RANGE};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, trace};

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("PodDown/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects followed per request
pub const MAX_REDIRECTS: usize = 25;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Network operations needed by the pipeline
///
/// Implementations must be shareable across worker threads.
pub trait Transport: Send + Sync {
    /// Remote `Last-Modified` time of `url` in seconds since the epoch
    ///
    /// `Ok(None)` means the server did not say.
    fn last_modified(&self, url: &str) -> std::result::Result<Option<i64>, TransportError>;

    /// Uncompressed size of `url` in bytes, if the server reports one
    fn content_length(&self, url: &str) -> std::result::Result<Option<u64>, TransportError>;

    /// Fetch the whole body of `url` into memory
    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, TransportError>;

    /// Stream the body of `url` into `sink`, starting at byte `offset`
    ///
    /// Returns the number of bytes written. When `offset > 0` and the server
    /// does not honor the range, [`TransportError::ResumeRejected`] is
    /// returned and nothing is written. Any other failure keeps its own
    /// variant so the caller does not mistake it for a refused resume.
    fn download(
        &self,
        url: &str,
        offset: u64,
        sink: &mut dyn Write,
    ) -> std::result::Result<u64, TransportError>;
}

/// [`Transport`] over HTTP(S)
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build the client with the poddown user agent and redirect limit
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`](crate::Error::Network) if the TLS backend
    /// cannot be initialized.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .connect_timeout(CONNECT_TIMEOUT)
            // Episode transfers can take far longer than any fixed limit
            .timeout(None)
            .build()?;
        Ok(Self { client })
    }

    fn head(&self, url: &str) -> std::result::Result<HeaderMap, TransportError> {
        let response = self
            .client
            .head(url)
            .header(ACCEPT_ENCODING, "identity")
            .send()?;
        let response = check_status(response)?;
        Ok(response.headers().clone())
    }
}

impl Transport for HttpTransport {
    fn last_modified(&self, url: &str) -> std::result::Result<Option<i64>, TransportError> {
        let headers = self.head(url)?;
        let modified = headers
            .get(LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| chrono::DateTime::parse_from_rfc2822(v.trim()).ok())
            .map(|dt| dt.timestamp());
        trace!(url, ?modified, "last-modified probe");
        Ok(modified)
    }

    fn content_length(&self, url: &str) -> std::result::Result<Option<u64>, TransportError> {
        let headers = self.head(url)?;
        let length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        trace!(url, ?length, "content-length probe");
        Ok(length)
    }

    fn fetch(&self, url: &str) -> std::result::Result<Vec<u8>, TransportError> {
        let response = check_status(self.client.get(url).send()?)?;
        let body = response.bytes()?;
        debug!(url, bytes = body.len(), "fetched");
        Ok(body.to_vec())
    }

    fn download(
        &self,
        url: &str,
        offset: u64,
        sink: &mut dyn Write,
    ) -> std::result::Result<u64, TransportError> {
        // Media is stored byte-for-byte, so never ask for a compressed body
        let mut request = self.client.get(url).header(ACCEPT_ENCODING, "identity");
        if offset > 0 {
            request = request.header(RANGE, format!("bytes={offset}-"));
        }

        let response = request.send()?;
        let status = response.status();
        if offset > 0
            && status != StatusCode::PARTIAL_CONTENT
            && (status.is_success() || status == StatusCode::RANGE_NOT_SATISFIABLE)
        {
            debug!(url, offset, status = status.as_u16(), "range request not honored");
            return Err(TransportError::ResumeRejected { offset });
        }
        let mut response = check_status(response)?;

        let written = copy_body(&mut response, sink)?;
        debug!(url, offset, written, "transfer complete");
        Ok(written)
    }
}

/// Stream `body` into `sink`
///
/// Read failures are network trouble and map to [`TransportError::Request`];
/// only sink failures become [`TransportError::Io`].
fn copy_body(body: &mut dyn Read, sink: &mut dyn Write) -> std::result::Result<u64, TransportError> {
    let mut buf = vec![0u8; 64 * 1024];
    let mut written = 0u64;
    loop {
        let n = match body.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransportError::Request(e.to_string())),
        };
        sink.write_all(&buf[..n])?;
        written += n as u64;
    }
    sink.flush()?;
    Ok(written)
}

fn check_status(response: Response) -> std::result::Result<Response, TransportError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(TransportError::Status(status.as_u16()))
    }
}
