//! Download finalization: move a verified `.part` into place or clean it up

use crate::error::Result;
use crate::utils::file_size;
use std::path::Path;

/// Rename the verified `.part` file to its final name, replacing any file there
pub(super) fn promote(part_path: &Path, final_path: &Path) -> Result<()> {
    std::fs::rename(part_path, final_path)?;
    Ok(())
}

/// Remove a failed `.part` file unless it holds bytes worth resuming
///
/// With `keep_partial` a non-empty `.part` file stays for the next run.
pub(super) fn discard_or_keep(part_path: &Path, keep_partial: bool) {
    let size = file_size(part_path).unwrap_or(0);
    if keep_partial && size > 0 {
        tracing::debug!(path = %part_path.display(), bytes = size, "keeping partial download for resume");
        return;
    }
    match std::fs::remove_file(part_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %part_path.display(), error = %e, "Failed to remove partial download");
        }
    }
}
