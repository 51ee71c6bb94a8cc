use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;
use reqwest::Url;
use tracing::{debug, info};

use crate::domain::{CalendarDate, Candidate};
use crate::error::SolarError;
use crate::fetch::Fetcher;
use crate::source::{SourceDescriptor, SourceMode, render_template};

static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r##"(?i)href\s*=\s*["']([^"'#]+)[^"']*["']"##).expect("valid href regex")
});

#[derive(Debug, Clone)]
enum Listing {
    Loaded(String),
    Failed(SolarError),
}

/// Maps dates to candidates. Listing pages are fetched at most once per run
/// for each listing URL, failures included.
#[derive(Debug, Default)]
pub struct ResourceResolver {
    listings: HashMap<String, Listing>,
}

impl ResourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(
        &mut self,
        fetcher: &dyn Fetcher,
        date: CalendarDate,
        source: &SourceDescriptor,
    ) -> Result<Option<Candidate>, SolarError> {
        match &source.mode {
            SourceMode::Listing { listing_url, .. } => {
                let listing_url = render_template(listing_url, date);
                let html = self.listing(fetcher, &listing_url)?;
                let candidate = best_candidate(&html, &listing_url, date, source)?;
                if candidate.is_none() {
                    debug!(source = %source, %date, url = %listing_url, "no listing match");
                }
                Ok(candidate)
            }
            SourceMode::Api {
                endpoint,
                params,
                time_of_day,
            } => api_candidate(endpoint, params, *time_of_day, date, source).map(Some),
        }
    }

    /// Number of distinct listing pages requested so far.
    pub fn listings_requested(&self) -> usize {
        self.listings.len()
    }

    fn listing(&mut self, fetcher: &dyn Fetcher, url: &str) -> Result<String, SolarError> {
        let entry = self.listings.entry(url.to_string()).or_insert_with(|| {
            info!(url, "fetching listing");
            match fetcher.fetch_text(url) {
                Ok(html) => Listing::Loaded(html),
                Err(err) => Listing::Failed(err),
            }
        });
        match entry {
            Listing::Loaded(html) => Ok(html.clone()),
            Listing::Failed(err) => Err(err.clone()),
        }
    }
}

/// Scans `html` for links to `date` and keeps the one with the greatest key.
pub fn best_candidate(
    html: &str,
    listing_url: &str,
    date: CalendarDate,
    source: &SourceDescriptor,
) -> Result<Option<Candidate>, SolarError> {
    let base = Url::parse(listing_url).map_err(|err| SolarError::InvalidTemplate {
        source_name: source.name.clone(),
        message: format!("listing url {listing_url}: {err}"),
    })?;
    let pattern = source.file_pattern(date)?;

    let best = HREF_RE
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().trim()))
        .filter_map(|href| {
            let path = href.split('?').next().unwrap_or(href);
            let caps = pattern.captures(path)?;
            let key = caps
                .name("key")
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();
            let url = base.join(href).ok()?;
            Some(Candidate {
                url: url.to_string(),
                key,
            })
        })
        .max_by(|a, b| compare_keys(&a.key, &b.key).then_with(|| a.url.cmp(&b.url)));
    Ok(best)
}

fn compare_keys(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

pub fn api_candidate(
    endpoint: &str,
    params: &[(String, String)],
    time_of_day: NaiveTime,
    date: CalendarDate,
    source: &SourceDescriptor,
) -> Result<Candidate, SolarError> {
    let iso = date.iso_at(time_of_day);
    let ymd = date.to_string();
    let rendered = params
        .iter()
        .map(|(key, value)| {
            let value = value.replace("{iso}", &iso).replace("{date}", &ymd);
            (key.as_str(), value)
        })
        .collect::<Vec<_>>();
    let url = Url::parse_with_params(endpoint, &rendered).map_err(|err| {
        SolarError::InvalidTemplate {
            source_name: source.name.clone(),
            message: format!("endpoint {endpoint}: {err}"),
        }
    })?;
    Ok(Candidate {
        url: url.to_string(),
        key: iso,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "https://www.example.org/drawings/boulder/2025/12/";

    fn date() -> CalendarDate {
        "20251222".parse().unwrap()
    }

    #[test]
    fn picks_latest_time_of_day() {
        let html = r#"
            <a href="bou_20251222_0130.jpg">a</a>
            <a HREF="bou_20251222_1800.jpg">b</a>
            <a href='bou_20251222_0915.jpg'>c</a>
            <a href="bou_20251223_2359.jpg">other day</a>
        "#;
        let candidate = best_candidate(html, LISTING, date(), &SourceDescriptor::boulder())
            .unwrap()
            .unwrap();
        assert_eq!(candidate.key, "1800");
        assert_eq!(candidate.url, format!("{LISTING}bou_20251222_1800.jpg"));
    }

    #[test]
    fn normalizes_link_forms() {
        let source = SourceDescriptor::boulder();
        let absolute = r#"<a href="https://cdn.example.org/x/20251222.png">"#;
        let rooted = r#"<a href="/stp/20251222.png">"#;
        let relative = r#"<a href="sub/20251222.png">"#;

        let get = |html: &str| {
            best_candidate(html, LISTING, date(), &source)
                .unwrap()
                .unwrap()
                .url
        };
        assert_eq!(get(absolute), "https://cdn.example.org/x/20251222.png");
        assert_eq!(get(rooted), "https://www.example.org/stp/20251222.png");
        assert_eq!(get(relative), format!("{LISTING}sub/20251222.png"));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let html = r#"<a href="BOU_20251222.GIF">x</a><a href="20251222.txt">y</a>"#;
        let candidate =
            best_candidate(html, LISTING, date(), &SourceDescriptor::boulder()).unwrap();
        assert!(candidate.unwrap().url.ends_with("BOU_20251222.GIF"));
    }

    #[test]
    fn fragments_and_queries_are_tolerated() {
        let html = r#"
            <a href="bou_20251222_1800.jpg#preview">a</a>
            <a href="bou_20251222_0600.jpg?download=1">b</a>
            <a href="?C=N;O=D">sort</a>
        "#;
        let source = SourceDescriptor::boulder();
        let candidate = best_candidate(html, LISTING, date(), &source)
            .unwrap()
            .unwrap();
        assert_eq!(candidate.url, format!("{LISTING}bou_20251222_1800.jpg"));

        let query_only = r#"<a href="bou_20251222_0600.jpg?download=1">b</a>"#;
        let candidate = best_candidate(query_only, LISTING, date(), &source)
            .unwrap()
            .unwrap();
        assert_eq!(candidate.key, "0600");
        assert_eq!(
            candidate.url,
            format!("{LISTING}bou_20251222_0600.jpg?download=1")
        );
    }

    #[test]
    fn longer_digit_runs_are_not_the_date() {
        let html = r#"<a href="120251222_1800.jpg">x</a>"#;
        let candidate =
            best_candidate(html, LISTING, date(), &SourceDescriptor::boulder()).unwrap();
        assert_eq!(candidate, None);
    }

    #[test]
    fn no_match_is_none() {
        let html = r#"<a href="bou_20251221_1200.jpg">x</a>"#;
        let candidate =
            best_candidate(html, LISTING, date(), &SourceDescriptor::boulder()).unwrap();
        assert_eq!(candidate, None);
    }

    #[test]
    fn api_url_is_deterministic() {
        let source = SourceDescriptor::helioviewer();
        let SourceMode::Api {
            endpoint,
            params,
            time_of_day,
        } = &source.mode
        else {
            panic!("helioviewer is an api source");
        };
        let first = api_candidate(endpoint, params, *time_of_day, date(), &source).unwrap();
        let second = api_candidate(endpoint, params, *time_of_day, date(), &source).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.key, "2025-12-22T12:00:00Z");
        assert!(first.url.starts_with(
            "https://api.helioviewer.org/v2/takeScreenshot/?date=2025-12-22T12%3A00%3A00Z&imageScale=2.4"
        ));
    }

    #[test]
    fn key_ordering_is_numeric() {
        assert_eq!(compare_keys("930", "0915"), Ordering::Greater);
        assert_eq!(compare_keys("", "0001"), Ordering::Less);
    }
}
