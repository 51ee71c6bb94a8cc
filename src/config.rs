use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::error::SolarError;
use crate::source::{SourceDescriptor, SourceMode, default_time_of_day};
use crate::window::WindowSpec;

pub const DEFAULT_CONFIG_FILE: &str = "solarsync.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub out_dir: Option<String>,
    #[serde(default)]
    pub manifest: Option<String>,
    #[serde(default)]
    pub window: Option<WindowSpec>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub deadline_secs: Option<u64>,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum SourceEntry {
    Shorthand(String),
    Detailed(SourceEntryObject),
}

/// Overrides for a built-in source, or a full description of a new one.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SourceEntryObject {
    pub name: String,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub listing_url: Option<String>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub backfill_manifest: Option<PathBuf>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub params: Option<Vec<(String, String)>>,
    #[serde(default)]
    pub time_of_day: Option<NaiveTime>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub out_dir: Utf8PathBuf,
    pub manifest: String,
    pub window: WindowSpec,
    pub timeout: Duration,
    pub deadline: Option<Duration>,
    pub sources: Vec<SourceDescriptor>,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `path`, or `solarsync.json` when present, or falls back to built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, SolarError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| SolarError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| SolarError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, SolarError> {
        let schema_version = config.schema_version.unwrap_or(1);
        if schema_version != 1 {
            return Err(SolarError::ConfigParse(format!(
                "unsupported schema_version {schema_version}"
            )));
        }

        let entries = if config.sources.is_empty() {
            default_sources()
        } else {
            config.sources
        };
        let sources = entries
            .into_iter()
            .map(resolve_source)
            .collect::<Result<Vec<_>, SolarError>>()?;

        let mut seen = std::collections::HashSet::new();
        for source in &sources {
            if !seen.insert(source.name.as_str()) {
                return Err(SolarError::InvalidSource(format!(
                    "duplicate source name: {}",
                    source.name
                )));
            }
        }

        Ok(ResolvedConfig {
            schema_version,
            out_dir: Utf8PathBuf::from(config.out_dir.unwrap_or_else(|| "docs".to_string())),
            manifest: config
                .manifest
                .unwrap_or_else(|| "manifest.json".to_string()),
            window: config.window.unwrap_or_default(),
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(60)),
            deadline: config.deadline_secs.map(Duration::from_secs),
            sources,
        })
    }
}

impl ResolvedConfig {
    pub fn source(&self, name: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|source| source.name == name)
    }
}

pub fn default_sources() -> Vec<SourceEntry> {
    vec![
        SourceEntry::Shorthand("helioviewer".to_string()),
        SourceEntry::Shorthand("boulder".to_string()),
    ]
}

fn resolve_source(entry: SourceEntry) -> Result<SourceDescriptor, SolarError> {
    let source = match entry {
        SourceEntry::Shorthand(name) => SourceDescriptor::builtin(&name)?,
        SourceEntry::Detailed(obj) => resolve_detailed(obj)?,
    };
    source.validate()?;
    Ok(source)
}

fn resolve_detailed(obj: SourceEntryObject) -> Result<SourceDescriptor, SolarError> {
    let base = SourceDescriptor::builtin(&obj.name).ok();
    let mode_name = match (&obj.mode, &base) {
        (Some(mode), _) => mode.to_ascii_lowercase(),
        (None, Some(base)) => match base.mode {
            SourceMode::Listing { .. } => "listing".to_string(),
            SourceMode::Api { .. } => "api".to_string(),
        },
        (None, None) => {
            return Err(SolarError::InvalidSource(format!(
                "{}: mode is required for custom sources",
                obj.name
            )));
        }
    };
    let base_mode = base.as_ref().map(|base| base.mode.clone());

    let mode = match mode_name.as_str() {
        "listing" => {
            let (base_url, base_pattern, base_backfill) = match base_mode {
                Some(SourceMode::Listing {
                    listing_url,
                    pattern,
                    backfill_manifest,
                }) => (Some(listing_url), Some(pattern), backfill_manifest),
                _ => (None, None, None),
            };
            SourceMode::Listing {
                listing_url: require(&obj.name, "listing_url", obj.listing_url.or(base_url))?,
                pattern: require(&obj.name, "pattern", obj.pattern.or(base_pattern))?,
                backfill_manifest: obj.backfill_manifest.or(base_backfill),
            }
        }
        "api" => {
            let (base_endpoint, base_params, base_time) = match base_mode {
                Some(SourceMode::Api {
                    endpoint,
                    params,
                    time_of_day,
                }) => (Some(endpoint), Some(params), Some(time_of_day)),
                _ => (None, None, None),
            };
            SourceMode::Api {
                endpoint: require(&obj.name, "endpoint", obj.endpoint.or(base_endpoint))?,
                params: obj.params.or(base_params).unwrap_or_default(),
                time_of_day: obj
                    .time_of_day
                    .or(base_time)
                    .unwrap_or_else(default_time_of_day),
            }
        }
        other => {
            return Err(SolarError::InvalidSource(format!(
                "{}: unknown mode {other}",
                obj.name
            )));
        }
    };

    Ok(SourceDescriptor {
        dir: obj
            .dir
            .or_else(|| base.as_ref().map(|base| base.dir.clone()))
            .unwrap_or_else(|| obj.name.clone()),
        extension: obj
            .extension
            .or_else(|| base.as_ref().map(|base| base.extension.clone()))
            .unwrap_or_else(|| "png".to_string()),
        name: obj.name,
        mode,
    })
}

fn require(source: &str, field: &str, value: Option<String>) -> Result<String, SolarError> {
    value.ok_or_else(|| SolarError::InvalidSource(format!("{source}: missing {field}")))
}
