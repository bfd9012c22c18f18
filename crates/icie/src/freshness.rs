//! Whether the executable is stale relative to the source.
//!
//! This is an mtime comparison, not a content hash. Equal timestamps count as
//! up to date, so an edit landing within the filesystem's mtime granularity
//! of the last build is not detected.

use std::path::Path;
use std::time::SystemTime;

use crate::dir::Directory;
use crate::error::{Error, Result};

async fn modified(path: &Path) -> std::io::Result<SystemTime> {
    tokio::fs::metadata(path).await?.modified()
}

/// True when the executable is missing or strictly older than the source.
pub async fn requires_compilation(dir: &Directory) -> Result<bool> {
    let source = dir.source();
    let executable = dir.executable();

    let source_mtime = modified(&source)
        .await
        .map_err(|e| Error::io(format!("failed to stat {}", source.display()), e))?;
    let executable_mtime = match modified(&executable).await {
        Ok(mtime) => mtime,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %executable.display(), "No executable, compilation required");
            return Ok(true);
        }
        Err(e) => {
            return Err(Error::io(
                format!("failed to stat {}", executable.display()),
                e,
            ));
        }
    };

    let stale = source_mtime > executable_mtime;
    tracing::debug!(stale, "Compared source and executable mtimes");
    Ok(stale)
}
