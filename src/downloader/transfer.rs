//! Transfer stage: resume decision, streaming, size verification

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::source::Episode;
use crate::transport::Transport;
use crate::utils::file_size;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// A finished, verified transfer sitting in the `.part` file
#[derive(Debug, Clone, Copy)]
pub(super) struct Transfer {
    /// Size of the `.part` file after the transfer
    pub bytes: u64,
    /// Whether earlier bytes were kept and appended to
    pub resumed: bool,
}

/// Transfer `episode` into `part_path`
///
/// A resume that the server rejects is retried once from byte zero. Any other
/// failure, and a size that differs from the expected one, is returned.
pub(super) fn run(
    settings: &Settings,
    transport: &dyn Transport,
    episode: &Episode,
    part_path: &Path,
) -> Result<Transfer> {
    let expected = expected_size(transport, episode);
    let mut offset = if settings.download.keep_partial {
        resume_offset(file_size(part_path).unwrap_or(0), expected)
    } else {
        0
    };
    if offset > 0 {
        tracing::debug!(path = %part_path.display(), offset, "resuming partial download");
    }

    let mut retried = false;
    loop {
        let mut file = open_part(part_path, offset)?;
        let result = transport.download(&episode.url, offset, &mut file);
        file.flush()?;
        drop(file);

        match result {
            Ok(_) => break,
            Err(e) if e.is_resume_rejected() && !retried => {
                tracing::warn!(url = %episode.url, offset, "Server rejected resume, restarting from the beginning");
                offset = 0;
                retried = true;
            }
            Err(e) => return Err(e.into()),
        }
    }

    let actual = file_size(part_path).unwrap_or(0);
    if let Some(expected) = expected
        && actual != expected
    {
        return Err(Error::SizeMismatch {
            path: part_path.to_path_buf(),
            expected,
            actual,
        });
    }

    Ok(Transfer {
        bytes: actual,
        resumed: offset > 0,
    })
}

/// Size hint from the feed, else the server's `Content-Length`
pub(super) fn expected_size(transport: &dyn Transport, episode: &Episode) -> Option<u64> {
    if let Some(hint) = episode.size_hint.filter(|s| *s > 0) {
        return Some(hint);
    }
    match transport.content_length(&episode.url) {
        Ok(length) => length.filter(|s| *s > 0),
        Err(e) => {
            tracing::debug!(url = %episode.url, error = %e, "size probe failed");
            None
        }
    }
}

/// Byte offset to continue from, given what is already on disk
///
/// A partial at least as large as the expected size (or of unknown expected
/// size) cannot be trusted and is restarted.
pub(super) fn resume_offset(existing: u64, expected: Option<u64>) -> u64 {
    match expected {
        Some(expected) if existing > 0 && existing < expected => existing,
        _ => 0,
    }
}

fn open_part(path: &Path, offset: u64) -> Result<File> {
    let file = if offset > 0 {
        OpenOptions::new().append(true).create(true).open(path)?
    } else {
        File::create(path)?
    };
    Ok(file)
}
