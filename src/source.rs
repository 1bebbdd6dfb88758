//! Media source identity, used to skip redundant transport loads.

use std::path::Path;

use url::Url;

use crate::{SyncError, SyncResult};

/// Resolves `raw` to an absolute URL.
///
/// Absolute URLs are normalized (scheme and host case, default port, dot
/// segments). Anything else is taken as a path relative to `base_dir`, so
/// `track.mp3`, `./track.mp3` and `file:///base/track.mp3` all resolve to the
/// same key.
pub fn resolve_source(raw: &str, base_dir: &Path) -> SyncResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SyncError::InvalidSource(raw.to_string()));
    }

    if let Ok(url) = Url::parse(trimmed) {
        return Ok(url);
    }

    let base = Url::from_directory_path(base_dir)
        .map_err(|_| SyncError::InvalidSource(base_dir.display().to_string()))?;

    base.join(trimmed)
        .map_err(|_| SyncError::InvalidSource(raw.to_string()))
}
