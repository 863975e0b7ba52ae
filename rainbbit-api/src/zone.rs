//! Persistence of the station's location name.
//!
//! The name reported by the first successful ingestion is written once to a
//! small text file and read back at startup, so `/api/meta` has a zone
//! before the next ingestion runs.

use std::io;
use std::path::Path;

/// Read the persisted zone. A missing file yields an empty name.
pub async fn load_zone(path: &Path) -> io::Result<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(zone) => Ok(zone.trim().to_string()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e),
    }
}

/// Write `zone` to `path` unless the file already exists.
///
/// Returns whether the file was written.
pub async fn persist_zone_if_absent(path: &Path, zone: &str) -> io::Result<bool> {
    if tokio::fs::try_exists(path).await? {
        return Ok(false);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, zone).await?;
    tracing::info!(path = %path.display(), zone = %zone, "Persisted zone");
    Ok(true)
}
