use crate::error::{IqcError, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabled::Tabled;

/// One spreadsheet cell as handed over by the sheet reader.
///
/// Untagged so a sheet can be read straight from a JSON array of arrays:
/// numbers, booleans, strings and `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Bool(bool),
    Text(String),
    #[default]
    Empty,
}

impl Cell {
    /// Spreadsheet truthiness: empty cells, empty strings, `false`, `0` and
    /// `NaN` count as "no value".
    pub fn is_present(&self) -> bool {
        match self {
            Cell::Number(n) => *n != 0.0 && !n.is_nan(),
            Cell::Bool(b) => *b,
            Cell::Text(s) => !s.is_empty(),
            Cell::Empty => false,
        }
    }

    /// Textual form of the cell, or an empty string when the cell holds no
    /// value.
    pub fn text(&self) -> String {
        if !self.is_present() {
            return String::new();
        }
        match self {
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::Empty => String::new(),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// A positional spreadsheet row; meaning is assigned by column index only.
pub type RawRow = Vec<Cell>;

/// One worksheet: rows 0-2 are title/metadata/header, data starts at row 3.
pub type Sheet = Vec<RawRow>;

/// A normalized inspection record. Only rows with a valid inspection date
/// become records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub time: NaiveDateTime,
    pub result: String,
    pub action: String,
    pub supplier: String,
    #[serde(default)]
    pub appearance_rate: String,
    #[serde(default)]
    pub defect_detail: String,
    #[serde(default)]
    pub appearance_defect: String,
    #[serde(default)]
    pub dimension_defect: String,
    #[serde(default)]
    pub performance_defect: String,
}

impl CanonicalRecord {
    pub fn date(&self) -> NaiveDate {
        self.time.date()
    }
}

/// The wire shape of a time filter: `{"type": "month", "value": "2025-01"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeFilterWire {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

/// A calendar filter applied to inspection dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "TimeFilterWire")]
pub enum TimeFilter {
    Month { year: i32, month: u32 },
    Year(i32),
}

impl TimeFilter {
    /// Parse the `{type, value}` pair. An empty value means "no filter".
    pub fn parse(kind: &str, value: &str) -> Result<Option<TimeFilter>> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(None);
        }
        match kind {
            "month" => {
                // `YYYY-MM`; anything after the month (a day) is ignored.
                let mut parts = value.split('-');
                let (Some(y), Some(m)) = (parts.next(), parts.next()) else {
                    return Err(IqcError::InvalidFilter(format!(
                        "month must be YYYY-MM, got {value}"
                    )));
                };
                let year = y
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| IqcError::InvalidFilter(format!("bad year in {value}")))?;
                let month = m
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|m| (1..=12).contains(m))
                    .ok_or_else(|| IqcError::InvalidFilter(format!("bad month in {value}")))?;
                Ok(Some(TimeFilter::Month { year, month }))
            }
            "year" => value
                .parse::<i32>()
                .map(|y| Some(TimeFilter::Year(y)))
                .map_err(|_| IqcError::InvalidFilter(format!("bad year {value}"))),
            other => Err(IqcError::InvalidFilter(format!("unknown filter type {other}"))),
        }
    }

    pub fn from_wire(wire: &TimeFilterWire) -> Result<Option<TimeFilter>> {
        Self::parse(&wire.kind, &wire.value)
    }

    pub fn matches<D: Datelike>(&self, date: &D) -> bool {
        match *self {
            TimeFilter::Month { year, month } => date.year() == year && date.month() == month,
            TimeFilter::Year(year) => date.year() == year,
        }
    }
}

impl From<TimeFilter> for TimeFilterWire {
    fn from(f: TimeFilter) -> Self {
        match f {
            TimeFilter::Month { year, month } => TimeFilterWire {
                kind: "month".into(),
                value: format!("{year:04}-{month:02}"),
            },
            TimeFilter::Year(year) => TimeFilterWire {
                kind: "year".into(),
                value: year.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_batches: usize,
    pub ok_batches: usize,
    pub ng_batches: usize,
    pub pass_batches: usize,
    pub return_batches: usize,
    pub special_batches: usize,
    pub overall_pass_rate: f64,
}

/// Judgement and disposition counts over a set of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatusCounts {
    pub total: usize,
    pub ok: usize,
    pub ng: usize,
    pub pass: usize,
    #[serde(rename = "return")]
    pub returned: usize,
    pub special: usize,
}

/// Per-month counts, keyed by `YYYY-MM`.
pub type MonthBucket = StatusCounts;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekComparison {
    pub current_week: StatusCounts,
    pub previous_week: StatusCounts,
    pub current_week_start: String,
    pub current_week_end: String,
    pub previous_week_start: String,
    pub previous_week_end: String,
}

fn display_rate(rate: &f64) -> String {
    format!("{:.2}", rate)
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrendRow {
    #[tabled(rename = "Month")]
    pub month: String,
    #[tabled(rename = "Total")]
    pub total: usize,
    #[tabled(rename = "PassRate", display_with = "display_rate")]
    pub pass_rate: f64,
    #[tabled(rename = "Returns")]
    pub return_count: usize,
    #[tabled(rename = "Specials")]
    pub special_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct SupplierRankingRow {
    #[tabled(rename = "Rank")]
    pub rank: usize,
    #[tabled(rename = "Supplier")]
    pub supplier: String,
    #[tabled(rename = "Total")]
    pub total: usize,
    #[tabled(rename = "OK")]
    pub ok_count: usize,
    #[tabled(rename = "YieldRate", display_with = "display_rate")]
    pub yield_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct DefectCountRow {
    #[tabled(rename = "DefectType")]
    pub defect_type: String,
    #[tabled(rename = "Count")]
    pub count: usize,
}

/// Every derived view over one record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub summary: Summary,
    pub monthly_data: BTreeMap<String, MonthBucket>,
    pub recent_two_weeks: WeekComparison,
    pub monthly_trend: Vec<MonthlyTrendRow>,
    pub supplier_ranking: Vec<SupplierRankingRow>,
    pub defect_distribution: Vec<DefectCountRow>,
    pub supplier_filter: Option<String>,
    pub time_filter: Option<TimeFilter>,
    pub file_name: Option<String>,
}

/// Statistics plus the normalized records they were computed from, kept by
/// the caller so later filter changes can skip re-reading the sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedReport {
    #[serde(flatten)]
    pub statistics: Statistics,
    pub raw_data: Vec<CanonicalRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PeriodStats {
    pub total: usize,
    pub ok: usize,
    #[serde(rename = "return")]
    pub returned: usize,
    pub special: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub stats: PeriodStats,
    pub pass_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub current_period: PeriodSummary,
    pub previous_period: PeriodSummary,
}
