use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::CalendarDate;
use crate::error::SolarError;
use crate::fs_util;
use crate::source::SourceDescriptor;

/// Filesystem ledger of persisted artifacts, laid out as
/// `<root>/<source.dir>/<YYYYMMDD>.<ext>`.
#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_current_dir(relative: &Utf8Path) -> Result<Self, SolarError> {
        let cwd = std::env::current_dir().map_err(|err| SolarError::Filesystem(err.to_string()))?;
        let root = Utf8PathBuf::from_path_buf(cwd)
            .map_err(|_| SolarError::Filesystem("invalid output path".to_string()))?
            .join(relative);
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn source_dir(&self, source: &SourceDescriptor) -> Utf8PathBuf {
        self.root.join(&source.dir)
    }

    pub fn artifact_path(&self, source: &SourceDescriptor, date: CalendarDate) -> Utf8PathBuf {
        self.source_dir(source)
            .join(format!("{date}.{}", source.extension))
    }

    pub fn manifest_path(&self, file_name: &str) -> Utf8PathBuf {
        self.root.join(file_name)
    }

    pub fn ensure_root(&self) -> Result<(), SolarError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| SolarError::Filesystem(err.to_string()))
    }

    /// True unless an artifact already sits at the ledger path. Contents are not inspected.
    pub fn needs_fetch(&self, source: &SourceDescriptor, date: CalendarDate) -> bool {
        !self.artifact_path(source, date).as_std_path().is_file()
    }

    pub fn record(
        &self,
        source: &SourceDescriptor,
        date: CalendarDate,
        content: &[u8],
    ) -> Result<Utf8PathBuf, SolarError> {
        let path = self.artifact_path(source, date);
        fs_util::persist(&path, content)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new("docs");
        let date: CalendarDate = "20251222".parse().unwrap();
        let path = store.artifact_path(&SourceDescriptor::helioviewer(), date);
        assert_eq!(path, Utf8PathBuf::from("docs/imgs/20251222.png"));
        let path = store.artifact_path(&SourceDescriptor::boulder(), date);
        assert_eq!(path, Utf8PathBuf::from("docs/boulder/20251222.png"));
    }
}
