use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::domain::{CalendarDate, FrameKind};
use crate::error::SolarError;
use crate::fs_util;
use crate::window::DateWindow;

/// Published slider index. Field order is the serialized key order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(alias = "latest")]
    pub anchor: CalendarDate,
    pub frames: Vec<ManifestFrame>,
}

/// `date` is the image to show: the frame's own day when observed, its proxy day when forecast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestFrame {
    pub date: CalendarDate,
    pub offset: i64,
    #[serde(rename = "type")]
    pub kind: FrameKind,
}

impl Manifest {
    pub fn build(window: &DateWindow) -> Self {
        let mut frames = window
            .entries()
            .iter()
            .map(|entry| ManifestFrame {
                date: window.display_date(entry),
                offset: entry.offset,
                kind: entry.kind,
            })
            .collect::<Vec<_>>();
        frames.sort_by_key(|frame| frame.offset);
        Self {
            anchor: window.anchor(),
            frames,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SolarError> {
        let mut bytes = serde_json::to_vec_pretty(self)
            .map_err(|err| SolarError::ManifestEncode(err.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn write(&self, path: &Utf8Path) -> Result<(), SolarError> {
        fs_util::persist(path, &self.to_bytes()?)
    }

    pub fn load(path: &Path) -> Result<Self, SolarError> {
        let content =
            fs::read_to_string(path).map_err(|_| SolarError::ManifestRead(path.to_path_buf()))?;
        serde_json::from_str(&content).map_err(|err| SolarError::ManifestParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Distinct image dates referenced by any frame, oldest first.
    pub fn image_dates(&self) -> Vec<CalendarDate> {
        self.frames
            .iter()
            .map(|frame| frame.date)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
