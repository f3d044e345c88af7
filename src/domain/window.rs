// Display window over a telemetry series
use super::telemetry::{MonthKey, Sample, TelemetrySeries};

/// Result of inspecting a month by key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectOutcome {
    Selected { index: usize },
    NotFound,
}

/// Two cursors over a series of fixed length: `end_index` bounds the display
/// window `[0, end_index]` and `inspect_index` picks one sample for detail.
///
/// Inspecting a month past the window end pulls the window forward; nothing
/// moves it backward except an explicit `set_end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSelector {
    len: usize,
    end_index: usize,
    inspect_index: usize,
}

impl WindowSelector {
    /// Starts showing the full series with the latest month inspected
    pub fn for_series(series: &TelemetrySeries) -> Self {
        let last = series.len() - 1;
        Self {
            len: series.len(),
            end_index: last,
            inspect_index: last,
        }
    }

    pub fn end_index(&self) -> usize {
        self.end_index
    }

    pub fn inspect_index(&self) -> usize {
        self.inspect_index
    }

    pub fn set_end(&mut self, index: usize) -> usize {
        self.end_index = index.min(self.len - 1);
        self.end_index
    }

    pub fn set_inspect_by_month(&mut self, series: &TelemetrySeries, month: MonthKey) -> InspectOutcome {
        let Some(index) = series.position(month).filter(|idx| *idx < self.len) else {
            return InspectOutcome::NotFound;
        };

        self.inspect_index = index;
        if index > self.end_index {
            self.end_index = index;
        }
        InspectOutcome::Selected { index }
    }

    /// Like `set_inspect_by_month`, but for a raw key from a request. A key
    /// that does not parse as a month is a miss like any other.
    pub fn set_inspect_by_key(&mut self, series: &TelemetrySeries, key: &str) -> InspectOutcome {
        match MonthKey::parse(key) {
            Ok(month) => self.set_inspect_by_month(series, month),
            Err(_) => InspectOutcome::NotFound,
        }
    }

    pub fn window<'a>(&self, series: &'a TelemetrySeries) -> &'a [Sample] {
        series.prefix(self.end_index + 1)
    }

    pub fn inspected<'a>(&self, series: &'a TelemetrySeries) -> Option<&'a Sample> {
        series.get(self.inspect_index)
    }
}
