// Entry points: full classify -> normalize -> aggregate runs over a sheet,
// and cheap re-aggregation of records a caller cached from an earlier run.
use crate::error::{IqcError, Result};
use crate::layout::{self, TIME_COLUMN};
use crate::normalizer::{self, supplier_matches};
use crate::reports;
use crate::types::{CanonicalRecord, ProcessedReport, RawRow, Statistics, TimeFilter};
use crate::util::is_valid_date;
use chrono::NaiveDateTime;
use tracing::{error, info};

/// Rows inspected when checking that a sheet has an inspection-date column.
const VALIDATION_SAMPLE_ROWS: usize = 5;

/// Reject sheets that are empty or have no recognisable inspection date in
/// column G within the first few rows.
pub fn validate_sheet(sheet: &[RawRow]) -> Result<()> {
    if sheet.is_empty() {
        return Err(IqcError::EmptySheet);
    }
    let has_date_column = sheet
        .iter()
        .take(VALIDATION_SAMPLE_ROWS)
        .any(|row| row.len() > TIME_COLUMN && is_valid_date(&row[TIME_COLUMN]));
    if !has_date_column {
        return Err(IqcError::MissingRequiredColumns);
    }
    Ok(())
}

fn run(
    sheet: &[RawRow],
    supplier_filter: Option<&str>,
    time_filter: Option<TimeFilter>,
    file_name: Option<&str>,
    now: NaiveDateTime,
) -> Result<ProcessedReport> {
    validate_sheet(sheet)?;

    let layout = layout::classify(sheet);
    info!(file_type = ?layout.file_type, "detected file type");

    let records = normalizer::normalize(sheet, &layout, supplier_filter, time_filter.as_ref());

    let mut statistics = reports::aggregate(&records, now);
    statistics.supplier_filter = supplier_filter.map(str::to_string);
    statistics.time_filter = time_filter;
    statistics.file_name = file_name.map(str::to_string);

    info!(valid_rows = records.len(), "processing finished");
    Ok(ProcessedReport {
        statistics,
        raw_data: records,
    })
}

/// Process one inspection sheet end to end.
///
/// Any failure is reported once, wrapped in [`IqcError::Processing`]; there
/// are no partial results.
pub fn process_iqc_data(
    sheet: &[RawRow],
    supplier_filter: Option<&str>,
    time_filter: Option<TimeFilter>,
    file_name: Option<&str>,
    now: NaiveDateTime,
) -> Result<ProcessedReport> {
    info!(
        file = file_name.unwrap_or("unknown"),
        supplier = supplier_filter.unwrap_or("-"),
        time_filter = ?time_filter,
        "processing inspection data"
    );
    run(sheet, supplier_filter, time_filter, file_name, now).map_err(|e| {
        error!(error = %e, "data processing failed");
        IqcError::Processing(Box::new(e))
    })
}

/// Re-filter records cached from an earlier [`process_iqc_data`] run and
/// recompute the statistics without touching the source sheet.
pub fn recalculate(
    records: &[CanonicalRecord],
    supplier_filter: Option<&str>,
    time_filter: Option<TimeFilter>,
    now: NaiveDateTime,
) -> Statistics {
    let filtered: Vec<CanonicalRecord> = records
        .iter()
        .filter(|r| supplier_matches(&r.supplier, supplier_filter))
        .filter(|r| time_filter.map_or(true, |f| f.matches(&r.time)))
        .cloned()
        .collect();

    let mut statistics = reports::aggregate(&filtered, now);
    statistics.supplier_filter = supplier_filter.map(str::to_string);
    statistics.time_filter = time_filter;
    statistics
}
