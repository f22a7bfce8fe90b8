//! Sibling files written next to an asset

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::Result;

/// File name of `base` without its extension
pub(crate) fn file_stem(base: &Path) -> String {
    base.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `{dir}/{stem}{suffix}` for an asset at `base`
pub(crate) fn sibling_path(base: &Path, suffix: &str) -> PathBuf {
    let name = format!("{}{}", file_stem(base), suffix);
    match base.parent() {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Write `bytes` to `path` so that readers never see a partial file.
///
/// The data goes to a temporary file in the same directory first, which is
/// then renamed over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;

    debug!(path = %path.display(), size = bytes.len(), "wrote artifact");
    Ok(())
}
