//! Data directory resolution.

use std::path::PathBuf;

/// Resolve the Nova data directory.
///
/// `NOVA_DATA_DIR` wins when set; otherwise `~/.nova` (falling back to
/// `./.nova` when no home directory can be determined).
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("NOVA_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".nova")
}
