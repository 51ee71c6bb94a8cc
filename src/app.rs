use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ResolvedConfig;
use crate::domain::CalendarDate;
use crate::error::SolarError;
use crate::fetch::Fetcher;
use crate::manifest::Manifest;
use crate::resolver::ResourceResolver;
use crate::source::{SourceDescriptor, SourceMode};
use crate::store::Store;
use crate::window::DateWindow;

#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub dry_run: bool,
    pub deadline: Option<Instant>,
}

impl FetchOptions {
    pub fn with_budget(dry_run: bool, budget: Option<Duration>) -> Self {
        Self {
            dry_run,
            deadline: budget.map(|budget| Instant::now() + budget),
        }
    }

    fn expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateAction {
    Skipped,
    Fetched,
    NotFound,
    Failed,
    Planned,
}

#[derive(Debug, Clone, Serialize)]
pub struct DateOutcome {
    pub date: CalendarDate,
    pub action: DateAction,
    pub path: Option<String>,
    pub url: Option<String>,
    pub status: Option<u16>,
    pub error: Option<String>,
}

impl DateOutcome {
    fn new(date: CalendarDate, action: DateAction) -> Self {
        Self {
            date,
            action,
            path: None,
            url: None,
            status: None,
            error: None,
        }
    }

    fn failed(date: CalendarDate, err: &SolarError) -> Self {
        Self {
            url: err.url().map(str::to_string),
            status: err.status(),
            error: Some(err.to_string()),
            ..Self::new(date, DateAction::Failed)
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub source: String,
    pub fetched: usize,
    pub skipped: usize,
    pub not_found: usize,
    pub failed: usize,
    pub planned: usize,
    pub items: Vec<DateOutcome>,
}

impl SourceSummary {
    fn new(source: &SourceDescriptor) -> Self {
        Self {
            source: source.name.clone(),
            fetched: 0,
            skipped: 0,
            not_found: 0,
            failed: 0,
            planned: 0,
            items: Vec::new(),
        }
    }

    fn push(&mut self, outcome: DateOutcome) {
        match outcome.action {
            DateAction::Skipped => self.skipped += 1,
            DateAction::Fetched => self.fetched += 1,
            DateAction::NotFound => self.not_found += 1,
            DateAction::Failed => self.failed += 1,
            DateAction::Planned => self.planned += 1,
        }
        self.items.push(outcome);
    }

    /// Dates for which an artifact exists after the run.
    pub fn usable(&self) -> usize {
        self.fetched + self.skipped
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub anchor: CalendarDate,
    pub dry_run: bool,
    pub sources: Vec<SourceSummary>,
    pub manifest_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct App<F: Fetcher> {
    store: Store,
    fetcher: F,
    config: ResolvedConfig,
}

impl<F: Fetcher> App<F> {
    pub fn new(store: Store, fetcher: F, config: ResolvedConfig) -> Self {
        Self {
            store,
            fetcher,
            config,
        }
    }

    pub fn window(&self, anchor: CalendarDate) -> DateWindow {
        DateWindow::new(anchor, self.config.window)
    }

    /// Runs every selected source over the window around `anchor`, then publishes the
    /// manifest. An empty `only` selects all configured sources.
    pub fn run(
        &self,
        anchor: CalendarDate,
        only: &[String],
        options: FetchOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, SolarError> {
        let window = self.window(anchor);
        let sources = self.select_sources(only)?;
        sink.event(ProgressEvent {
            message: format!(
                "phase=Window; anchor={anchor} past={} future={}",
                window.spec().past_days,
                window.spec().future_days
            ),
            elapsed: None,
        });

        if !options.dry_run {
            self.store.ensure_root()?;
            info!(root = %self.store.root(), %anchor, "output directory ready");
        }

        let mut resolver = ResourceResolver::new();
        let mut summaries = Vec::with_capacity(sources.len());
        for source in sources {
            let dates = self.dates_for(&window, source)?;
            let start = Instant::now();
            let summary = self.run_source(&mut resolver, source, &dates, &options, sink);
            info!(
                source = %source,
                fetched = summary.fetched,
                skipped = summary.skipped,
                not_found = summary.not_found,
                failed = summary.failed,
                "source done"
            );
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Summarize; {source} ok={} skip={} missing={} fail={}",
                    summary.fetched, summary.skipped, summary.not_found, summary.failed
                ),
                elapsed: Some(start.elapsed()),
            });
            summaries.push(summary);
        }

        if options.dry_run {
            return Ok(RunReport {
                anchor,
                dry_run: true,
                sources: summaries,
                manifest_path: None,
            });
        }

        for empty in summaries.iter().filter(|summary| summary.usable() == 0) {
            warn!(
                source = %empty.source,
                attempted = empty.items.len(),
                not_found = empty.not_found,
                failed = empty.failed,
                "no usable images for source"
            );
        }
        if summaries.iter().map(SourceSummary::usable).sum::<usize>() == 0 {
            return Err(SolarError::NothingUsable {
                source_name: summaries
                    .iter()
                    .map(|summary| summary.source.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                attempted: summaries.iter().map(|summary| summary.items.len()).sum(),
            });
        }

        let manifest_path = self.write_manifest(&window, sink)?;
        Ok(RunReport {
            anchor,
            dry_run: false,
            sources: summaries,
            manifest_path: Some(manifest_path.to_string()),
        })
    }

    pub fn write_manifest(
        &self,
        window: &DateWindow,
        sink: &dyn ProgressSink,
    ) -> Result<Utf8PathBuf, SolarError> {
        let path = self.store.manifest_path(&self.config.manifest);
        Manifest::build(window).write(&path)?;
        sink.event(ProgressEvent {
            message: format!("phase=Store; manifest written to {path}"),
            elapsed: None,
        });
        Ok(path)
    }

    fn select_sources(&self, only: &[String]) -> Result<Vec<&SourceDescriptor>, SolarError> {
        if only.is_empty() {
            return Ok(self.config.sources.iter().collect());
        }
        only.iter()
            .map(|name| {
                self.config
                    .source(name)
                    .ok_or_else(|| SolarError::InvalidSource(format!("unknown source: {name}")))
            })
            .collect()
    }

    /// Window dates, or the dates of the backfill manifest for listing sources that name one.
    fn dates_for(
        &self,
        window: &DateWindow,
        source: &SourceDescriptor,
    ) -> Result<Vec<CalendarDate>, SolarError> {
        match &source.mode {
            SourceMode::Listing {
                backfill_manifest: Some(path),
                ..
            } => {
                let dates = Manifest::load(path)?.image_dates();
                info!(
                    source = %source,
                    count = dates.len(),
                    path = %path.display(),
                    "backfilling from manifest"
                );
                Ok(dates)
            }
            _ => Ok(window.required_dates()),
        }
    }

    fn run_source(
        &self,
        resolver: &mut ResourceResolver,
        source: &SourceDescriptor,
        dates: &[CalendarDate],
        options: &FetchOptions,
        sink: &dyn ProgressSink,
    ) -> SourceSummary {
        let mut summary = SourceSummary::new(source);
        for &date in dates {
            let outcome = self.process_date(resolver, source, date, options, sink);
            summary.push(outcome);
        }
        summary
    }

    fn process_date(
        &self,
        resolver: &mut ResourceResolver,
        source: &SourceDescriptor,
        date: CalendarDate,
        options: &FetchOptions,
        sink: &dyn ProgressSink,
    ) -> DateOutcome {
        let path = self.store.artifact_path(source, date);
        if !self.store.needs_fetch(source, date) {
            sink.event(ProgressEvent {
                message: format!("phase=Store; {source} {date} already present"),
                elapsed: None,
            });
            return DateOutcome {
                path: Some(path.to_string()),
                ..DateOutcome::new(date, DateAction::Skipped)
            };
        }

        if options.dry_run {
            return DateOutcome {
                path: Some(path.to_string()),
                ..DateOutcome::new(date, DateAction::Planned)
            };
        }

        if options.expired() {
            let err = SolarError::DeadlineExceeded {
                date: date.to_string(),
            };
            warn!(source = %source, %date, "{err}");
            return DateOutcome::failed(date, &err);
        }

        sink.event(ProgressEvent {
            message: format!("phase=Resolve; {source} {date}"),
            elapsed: None,
        });
        let candidate = match resolver.resolve(&self.fetcher, date, source) {
            Ok(Some(candidate)) => candidate,
            Ok(None) => {
                let searched = source.listing_locator(date);
                warn!(source = %source, %date, url = searched.as_deref(), "no image published for date");
                return DateOutcome {
                    url: searched,
                    ..DateOutcome::new(date, DateAction::NotFound)
                };
            }
            Err(err) => {
                warn!(source = %source, %date, url = err.url(), status = err.status(), "{err}");
                return DateOutcome::failed(date, &err);
            }
        };

        let start = Instant::now();
        let result = self.fetcher.fetch_binary(&candidate.url).and_then(|bytes| {
            let path = self.store.record(source, date, &bytes)?;
            Ok((path, bytes.len()))
        });
        match result {
            Ok((path, size)) => {
                info!(source = %source, %date, url = %candidate.url, bytes = size, "saved");
                sink.event(ProgressEvent {
                    message: format!("phase=Fetch; {source} {date} saved {size} bytes"),
                    elapsed: Some(start.elapsed()),
                });
                DateOutcome {
                    path: Some(path.to_string()),
                    url: Some(candidate.url),
                    ..DateOutcome::new(date, DateAction::Fetched)
                }
            }
            Err(err) => {
                warn!(source = %source, %date, url = %candidate.url, status = err.status(), "{err}");
                DateOutcome {
                    url: Some(candidate.url),
                    ..DateOutcome::failed(date, &err)
                }
            }
        }
    }
}
