use std::path::PathBuf;

use tempfile::TempDir;

/// Writes `content` to `name` inside a fresh temporary directory.
pub(crate) fn write_config(name: &str, content: &str) -> Result<(TempDir, PathBuf), String> {
    let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join(name);
    std::fs::write(&path, content).map_err(|err| format!("write failed: {}", err))?;
    Ok((dir, path))
}
