use std::fmt;
use std::path::PathBuf;

use chrono::NaiveTime;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::domain::CalendarDate;
use crate::error::SolarError;

pub const BOULDER_LISTING_URL: &str = "https://www.ngdc.noaa.gov/stp/space-weather/solar-data/solar-imagery/composites/full-sun-drawings/boulder/{yyyy}/{mm}/";
pub const BOULDER_FILE_PATTERN: &str = r"(?:^|[^0-9]){date}(?:[_-]?(?P<key>\d{4}))?[^/]*\.(?:png|jpe?g|gif)$";
pub const HELIOVIEWER_ENDPOINT: &str = "https://api.helioviewer.org/v2/takeScreenshot/";

/// How a source turns a calendar date into a fetchable URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SourceMode {
    /// Scan a per-month directory listing for dated file names.
    Listing {
        listing_url: String,
        pattern: String,
        #[serde(default)]
        backfill_manifest: Option<PathBuf>,
    },
    /// Render one deterministic request per date.
    Api {
        endpoint: String,
        params: Vec<(String, String)>,
        #[serde(default = "default_time_of_day")]
        time_of_day: NaiveTime,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    pub dir: String,
    pub extension: String,
    #[serde(flatten)]
    pub mode: SourceMode,
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl SourceDescriptor {
    pub fn builtin(name: &str) -> Result<Self, SolarError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "helioviewer" | "aia193" => Ok(Self::helioviewer()),
            "boulder" => Ok(Self::boulder()),
            _ => Err(SolarError::InvalidSource(format!("unknown source: {name}"))),
        }
    }

    /// SDO/AIA 193 full disk rendered by the Helioviewer screenshot API.
    pub fn helioviewer() -> Self {
        let params = [
            ("date", "{iso}"),
            ("imageScale", "2.4"),
            ("layers", "[SDO,AIA,AIA,193,1,100]"),
            ("x1", "-1200"),
            ("x2", "1200"),
            ("y1", "-1200"),
            ("y2", "1200"),
            ("display", "true"),
            ("watermark", "false"),
            ("scale", "false"),
        ];
        Self {
            name: "helioviewer".to_string(),
            dir: "imgs".to_string(),
            extension: "png".to_string(),
            mode: SourceMode::Api {
                endpoint: HELIOVIEWER_ENDPOINT.to_string(),
                params: params
                    .iter()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
                time_of_day: default_time_of_day(),
            },
        }
    }

    /// NOAA/NGDC Boulder hand-drawn synoptic maps.
    pub fn boulder() -> Self {
        Self {
            name: "boulder".to_string(),
            dir: "boulder".to_string(),
            extension: "png".to_string(),
            mode: SourceMode::Listing {
                listing_url: BOULDER_LISTING_URL.to_string(),
                pattern: BOULDER_FILE_PATTERN.to_string(),
                backfill_manifest: None,
            },
        }
    }

    /// Checks that every template renders and compiles for a sample date.
    pub fn validate(&self) -> Result<(), SolarError> {
        if self.name.trim().is_empty() {
            return Err(SolarError::InvalidSource("source name is empty".to_string()));
        }
        let ext_ok = !self.extension.is_empty()
            && self.extension.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !ext_ok {
            return Err(SolarError::InvalidSource(format!(
                "{}: invalid extension {:?}",
                self.name, self.extension
            )));
        }
        let sample = CalendarDate::from_ymd(2000, 1, 1)?;
        match &self.mode {
            SourceMode::Listing { listing_url, .. } => {
                reqwest::Url::parse(&render_template(listing_url, sample)).map_err(|err| {
                    SolarError::InvalidTemplate {
                        source_name: self.name.clone(),
                        message: format!("listing_url: {err}"),
                    }
                })?;
                self.file_pattern(sample)?;
            }
            SourceMode::Api { endpoint, .. } => {
                reqwest::Url::parse(endpoint).map_err(|err| SolarError::InvalidTemplate {
                    source_name: self.name.clone(),
                    message: format!("endpoint: {err}"),
                })?;
            }
        }
        Ok(())
    }

    /// Listing page searched for `date`, if this is a listing source.
    pub fn listing_locator(&self, date: CalendarDate) -> Option<String> {
        match &self.mode {
            SourceMode::Listing { listing_url, .. } => Some(render_template(listing_url, date)),
            SourceMode::Api { .. } => None,
        }
    }

    /// Case-insensitive file-name matcher for one date. Listing sources only.
    pub fn file_pattern(&self, date: CalendarDate) -> Result<Regex, SolarError> {
        let SourceMode::Listing { pattern, .. } = &self.mode else {
            return Err(SolarError::InvalidSource(format!(
                "{} is not a listing source",
                self.name
            )));
        };
        RegexBuilder::new(&render_template(pattern, date))
            .case_insensitive(true)
            .build()
            .map_err(|err| SolarError::InvalidTemplate {
                source_name: self.name.clone(),
                message: err.to_string(),
            })
    }
}

/// Expands `{yyyy}`, `{mm}`, `{dd}` and `{date}` for `date`.
pub fn render_template(template: &str, date: CalendarDate) -> String {
    template
        .replace("{yyyy}", &format!("{:04}", date.year()))
        .replace("{mm}", &format!("{:02}", date.month()))
        .replace("{dd}", &format!("{:02}", date.day()))
        .replace("{date}", &date.to_string())
}

pub fn default_time_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(12, 0, 0).unwrap_or(NaiveTime::MIN)
}
