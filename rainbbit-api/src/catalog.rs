//! Loading of the weather condition catalog.

use crate::error::{ApiError, ApiResult};
use rainbbit_core::ConditionCatalog;
use std::io;
use std::path::Path;

/// Read the catalog at `path`.
///
/// A missing file gives an empty catalog so the service still starts;
/// records are then served without conditions. A file that exists but does
/// not parse is an error.
pub async fn load_condition_catalog(path: &Path) -> ApiResult<ConditionCatalog> {
    let json = match tokio::fs::read_to_string(path).await {
        Ok(json) => json,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "Condition catalog not found, serving records without conditions");
            return Ok(ConditionCatalog::default());
        }
        Err(e) => {
            return Err(ApiError::internal_error(format!(
                "Failed to read condition catalog {}: {}",
                path.display(),
                e
            )))
        }
    };

    let catalog = ConditionCatalog::from_json(&json).map_err(|e| {
        ApiError::internal_error(format!(
            "Invalid condition catalog {}: {}",
            path.display(),
            e
        ))
    })?;
    tracing::info!(path = %path.display(), conditions = catalog.len(), "Loaded condition catalog");
    Ok(catalog)
}
