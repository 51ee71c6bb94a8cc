#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use camino::Utf8PathBuf;

use solarsync::app::{ProgressEvent, ProgressSink};
use solarsync::error::SolarError;
use solarsync::fetch::Fetcher;
use solarsync::store::Store;

pub const LISTING_TEMPLATE: &str = "https://archive.example.org/boulder/{yyyy}/{mm}/";

/// Serves canned listing pages and image bytes, recording every request.
#[derive(Default)]
pub struct MockFetcher {
    pub listings: HashMap<String, String>,
    pub failing_listings: Vec<String>,
    pub failing_binaries: Vec<String>,
    pub text_calls: Mutex<Vec<String>>,
    pub binary_calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, url: &str, html: &str) -> Self {
        self.listings.insert(url.to_string(), html.to_string());
        self
    }

    pub fn with_failing_listing(mut self, url: &str) -> Self {
        self.failing_listings.push(url.to_string());
        self
    }

    /// Binary fetches whose URL contains `needle` answer with 503.
    pub fn with_failing_binary(mut self, needle: &str) -> Self {
        self.failing_binaries.push(needle.to_string());
        self
    }

    pub fn text_calls(&self) -> Vec<String> {
        self.text_calls.lock().unwrap().clone()
    }

    pub fn binary_calls(&self) -> Vec<String> {
        self.binary_calls.lock().unwrap().clone()
    }
}

impl Fetcher for MockFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, SolarError> {
        self.text_calls.lock().unwrap().push(url.to_string());
        if self.failing_listings.iter().any(|failing| failing == url) {
            return Err(SolarError::Transport {
                url: url.to_string(),
                message: "connection reset".to_string(),
            });
        }
        self.listings
            .get(url)
            .cloned()
            .ok_or_else(|| SolarError::TransportStatus {
                status: 404,
                url: url.to_string(),
                message: "Not Found".to_string(),
            })
    }

    fn fetch_binary(&self, url: &str) -> Result<Vec<u8>, SolarError> {
        self.binary_calls.lock().unwrap().push(url.to_string());
        if self
            .failing_binaries
            .iter()
            .any(|needle| url.contains(needle.as_str()))
        {
            return Err(SolarError::TransportStatus {
                status: 503,
                url: url.to_string(),
                message: "Service Unavailable".to_string(),
            });
        }
        Ok(format!("image:{url}").into_bytes())
    }
}

pub struct NoopSink;

impl ProgressSink for NoopSink {
    fn event(&self, _event: ProgressEvent) {}
}

pub fn temp_store() -> (tempfile::TempDir, Store) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().join("docs")).unwrap();
    (temp, Store::new(root))
}

/// Directory listing in the loose style of the NGDC archive pages.
pub fn listing_html(links: &[&str]) -> String {
    let rows = links
        .iter()
        .map(|href| format!("<tr><td><a href=\"{href}\">{href}</a></td><td>-</td></tr>"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "<html><head><title>Index of /boulder</title></head><body><table>\n\
         <tr><td><a href=\"../\">Parent Directory</a></td></tr>\n{rows}\n</table></body></html>"
    )
}
