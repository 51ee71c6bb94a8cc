use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{CalendarDate, FrameEntry, FrameKind};

/// Rolling slider window around an anchor day: `past_days` observed days before the
/// anchor, the anchor itself, and `future_days` forecast slots after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpec {
    pub past_days: u32,
    pub future_days: u32,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            past_days: 27,
            future_days: 27,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DateWindow {
    anchor: CalendarDate,
    spec: WindowSpec,
    entries: Vec<FrameEntry>,
}

impl DateWindow {
    pub fn new(anchor: CalendarDate, spec: WindowSpec) -> Self {
        let entries = compute_window(anchor, spec.past_days, spec.future_days);
        Self {
            anchor,
            spec,
            entries,
        }
    }

    pub fn anchor(&self) -> CalendarDate {
        self.anchor
    }

    pub fn spec(&self) -> WindowSpec {
        self.spec
    }

    pub fn entries(&self) -> &[FrameEntry] {
        &self.entries
    }

    pub fn proxy_date_for(&self, entry: &FrameEntry) -> Option<CalendarDate> {
        proxy_date_for(entry, self.spec.future_days)
    }

    /// Date whose imagery is shown for `entry`.
    pub fn display_date(&self, entry: &FrameEntry) -> CalendarDate {
        self.proxy_date_for(entry).unwrap_or(entry.date)
    }

    /// Distinct image dates the window shows, oldest first.
    pub fn required_dates(&self) -> Vec<CalendarDate> {
        self.entries
            .iter()
            .map(|entry| self.display_date(entry))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

pub fn compute_window(anchor: CalendarDate, past_days: u32, future_days: u32) -> Vec<FrameEntry> {
    let first = -i64::from(past_days);
    let last = i64::from(future_days);
    (first..=last)
        .map(|offset| FrameEntry {
            date: anchor.offset(offset),
            offset,
            kind: if offset <= 0 {
                FrameKind::Observed
            } else {
                FrameKind::Forecast
            },
        })
        .collect()
}

/// Forecast slot `o` replays the observed day at `o - future_days`.
pub fn proxy_date_for(entry: &FrameEntry, future_days: u32) -> Option<CalendarDate> {
    match entry.kind {
        FrameKind::Observed => None,
        FrameKind::Forecast => Some(entry.date.offset(-i64::from(future_days))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor() -> CalendarDate {
        "20251222".parse().unwrap()
    }

    #[test]
    fn window_covers_contiguous_offsets() {
        for (past, future) in [(27, 27), (0, 5), (5, 0), (0, 0), (3, 10)] {
            let frames = compute_window(anchor(), past, future);
            assert_eq!(frames.len(), (past + future + 1) as usize);
            let offsets = frames.iter().map(|f| f.offset).collect::<Vec<_>>();
            let expected = (-i64::from(past)..=i64::from(future)).collect::<Vec<_>>();
            assert_eq!(offsets, expected);
            for frame in &frames {
                let kind = if frame.offset <= 0 {
                    FrameKind::Observed
                } else {
                    FrameKind::Forecast
                };
                assert_eq!(frame.kind, kind);
                assert_eq!(frame.date, anchor().offset(frame.offset));
            }
        }
    }

    #[test]
    fn proxy_replays_trailing_observed_days() {
        let window = DateWindow::new(anchor(), WindowSpec::default());
        let by_offset = |o: i64| {
            window
                .entries()
                .iter()
                .find(|entry| entry.offset == o)
                .copied()
                .unwrap()
        };
        assert_eq!(
            window.proxy_date_for(&by_offset(1)),
            Some(by_offset(-26).date)
        );
        assert_eq!(
            window.proxy_date_for(&by_offset(27)),
            Some(by_offset(0).date)
        );
        assert_eq!(window.proxy_date_for(&by_offset(-3)), None);
    }

    #[test]
    fn required_dates_stay_inside_observed_range() {
        let window = DateWindow::new(anchor(), WindowSpec::default());
        let dates = window.required_dates();
        assert_eq!(dates.len(), 28);
        assert_eq!(dates.first().copied(), Some(anchor().offset(-27)));
        assert_eq!(dates.last().copied(), Some(anchor()));
    }

    #[test]
    fn required_dates_extend_past_short_history() {
        let window = DateWindow::new(
            anchor(),
            WindowSpec {
                past_days: 0,
                future_days: 3,
            },
        );
        let dates = window.required_dates();
        assert_eq!(
            dates,
            vec![anchor().offset(-2), anchor().offset(-1), anchor()]
        );
    }
}
