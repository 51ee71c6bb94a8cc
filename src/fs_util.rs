use std::fs;
use std::io::Write;

use camino::Utf8Path;

use crate::error::SolarError;

/// Writes `content` to `path` through a temporary sibling file that is renamed into
/// place, so `path` either holds the complete content or is left untouched.
pub fn persist(path: &Utf8Path, content: &[u8]) -> Result<(), SolarError> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_str().is_empty())
        .unwrap_or_else(|| Utf8Path::new("."));
    fs::create_dir_all(parent.as_std_path())
        .map_err(|err| SolarError::Filesystem(format!("create {parent}: {err}")))?;

    let mut temp = tempfile::Builder::new()
        .prefix(".solarsync-")
        .suffix(".part")
        .tempfile_in(parent.as_std_path())
        .map_err(|err| SolarError::Filesystem(format!("temp file in {parent}: {err}")))?;
    temp.write_all(content)
        .map_err(|err| SolarError::Filesystem(format!("write {path}: {err}")))?;
    temp.as_file()
        .sync_all()
        .map_err(|err| SolarError::Filesystem(format!("sync {path}: {err}")))?;
    temp.persist(path.as_std_path())
        .map_err(|err| SolarError::Filesystem(format!("rename into {path}: {}", err.error)))?;
    Ok(())
}
