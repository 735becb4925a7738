// Side-by-side statistics for two caller-chosen date ranges.
use crate::error::{IqcError, Result};
use crate::keywords::{matches, StatusCategory};
use crate::layout;
use crate::normalizer;
use crate::types::{CanonicalRecord, PeriodComparison, PeriodStats, PeriodSummary, RawRow};
use crate::util::{parse_boundary_date, percentage, round2};
use chrono::NaiveDate;
use tracing::debug;

/// Data to compare: either a raw sheet (classified and normalized first) or
/// records that were normalized earlier.
#[derive(Debug, Clone, Copy)]
pub enum PeriodInput<'a> {
    Sheet(&'a [RawRow]),
    Records(&'a [CanonicalRecord]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Parse `YYYY-MM-DD` boundaries. `label` names the period in the error.
    pub fn parse(start: &str, end: &str, label: &str) -> Result<DateRange> {
        match (parse_boundary_date(start), parse_boundary_date(end)) {
            (Some(start), Some(end)) => Ok(DateRange { start, end }),
            _ => Err(IqcError::InvalidPeriod(label.to_string())),
        }
    }

    /// Inclusive on both ends; time of day is ignored.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

pub fn period_stats<'a, I>(records: I) -> PeriodStats
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let mut stats = PeriodStats::default();
    for r in records {
        stats.total += 1;
        if matches(&r.result, StatusCategory::Ok) {
            stats.ok += 1;
        }
        if matches(&r.action, StatusCategory::Return) {
            stats.returned += 1;
        }
        if matches(&r.action, StatusCategory::Special) {
            stats.special += 1;
        }
    }
    stats
}

fn summarize(records: &[CanonicalRecord], range: DateRange) -> PeriodSummary {
    let stats = period_stats(records.iter().filter(|r| range.contains(r.date())));
    PeriodSummary {
        start_date: range.start,
        end_date: range.end,
        stats,
        pass_rate: round2(percentage(stats.ok, stats.total)),
    }
}

pub fn compare_ranges(
    input: PeriodInput<'_>,
    current: DateRange,
    previous: DateRange,
) -> PeriodComparison {
    let normalized;
    let records: &[CanonicalRecord] = match input {
        PeriodInput::Sheet(sheet) => {
            let layout = layout::classify(sheet);
            normalized = normalizer::normalize(sheet, &layout, None, None);
            &normalized
        }
        PeriodInput::Records(records) => records,
    };

    let current_period = summarize(records, current);
    let previous_period = summarize(records, previous);
    debug!(
        current_rows = current_period.stats.total,
        previous_rows = previous_period.stats.total,
        "custom period comparison"
    );
    PeriodComparison {
        current_period,
        previous_period,
    }
}

/// Compare two periods given as `YYYY-MM-DD` strings.
pub fn compare_periods(
    input: PeriodInput<'_>,
    current_start: &str,
    current_end: &str,
    previous_start: &str,
    previous_end: &str,
) -> Result<PeriodComparison> {
    let current = DateRange::parse(current_start, current_end, "current")?;
    let previous = DateRange::parse(previous_start, previous_end, "previous")?;
    Ok(compare_ranges(input, current, previous))
}
