use crate::keywords::classify_result;
use crate::layout::{ColumnLayout, DATA_START_ROW};
use crate::types::{CanonicalRecord, Cell, RawRow, TimeFilter};
use crate::util::{cell_to_datetime, parse_float_prefix, text_len, to_fixed};
use chrono::NaiveDateTime;
use tracing::{info, warn};

/// Judgement tokens at least this long are treated as remarks, not as a
/// status word worth warning about.
const UNKNOWN_RESULT_MAX_LEN: usize = 10;
const DATE_FAILURE_SAMPLE: usize = 5;

/// Row counts gathered while normalizing one sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub total_rows: usize,
    pub valid_date_rows: usize,
    pub valid_result_rows: usize,
    pub filtered_rows: usize,
    /// `(sheet row index, raw cell text)` for rows whose date did not parse.
    pub date_failures: Vec<(usize, String)>,
}

/// True when no supplier filter is active, or `supplier` contains the filter
/// text (case-sensitive).
pub fn supplier_matches(supplier: &str, filter: Option<&str>) -> bool {
    match filter {
        Some(f) if !f.trim().is_empty() => !supplier.is_empty() && supplier.contains(f),
        _ => true,
    }
}

/// Appearance yield as a two-decimal percentage string. Fractions below 1
/// are scaled by 100; non-numeric text is passed through trimmed.
pub fn normalize_appearance_rate(cell: &Cell) -> String {
    if !cell.is_present() {
        return String::new();
    }
    let parsed = match cell {
        Cell::Number(n) => Some(*n),
        other => parse_float_prefix(&other.text()),
    };
    match parsed {
        Some(n) if n < 1.0 => to_fixed(n * 100.0, 2),
        Some(n) => to_fixed(n, 2),
        None => cell.text().trim().to_string(),
    }
}

fn trimmed(row: &RawRow, index: usize) -> String {
    row.get(index).map(Cell::text).unwrap_or_default().trim().to_string()
}

fn upper_trimmed(row: &RawRow, index: usize) -> String {
    row.get(index)
        .map(Cell::text)
        .unwrap_or_default()
        .to_uppercase()
        .trim()
        .to_string()
}

fn to_record(row: &RawRow, layout: &ColumnLayout, time: NaiveDateTime) -> CanonicalRecord {
    CanonicalRecord {
        time,
        result: upper_trimmed(row, layout.result),
        action: upper_trimmed(row, layout.action),
        supplier: trimmed(row, layout.supplier),
        appearance_rate: row
            .get(layout.appearance_rate)
            .map(normalize_appearance_rate)
            .unwrap_or_default(),
        defect_detail: trimmed(row, layout.defect_detail),
        appearance_defect: trimmed(row, layout.appearance_defect),
        dimension_defect: trimmed(row, layout.dimension_defect),
        performance_defect: trimmed(row, layout.performance_defect),
    }
}

/// Project the data rows of `sheet` through `layout`, dropping short rows and
/// rows without a valid inspection date, then applying the optional supplier
/// and calendar filters.
pub fn normalize(
    sheet: &[RawRow],
    layout: &ColumnLayout,
    supplier_filter: Option<&str>,
    time_filter: Option<&TimeFilter>,
) -> Vec<CanonicalRecord> {
    normalize_with_report(sheet, layout, supplier_filter, time_filter).0
}

pub fn normalize_with_report(
    sheet: &[RawRow],
    layout: &ColumnLayout,
    supplier_filter: Option<&str>,
    time_filter: Option<&TimeFilter>,
) -> (Vec<CanonicalRecord>, NormalizeReport) {
    let max_index = layout.max_index();
    let mut report = NormalizeReport::default();
    let mut records = Vec::new();

    for (offset, row) in sheet.iter().skip(DATA_START_ROW).enumerate() {
        let row_no = offset + DATA_START_ROW;
        report.total_rows += 1;

        if row.len() <= max_index {
            continue;
        }

        let time_cell = &row[layout.time];
        if !time_cell.is_present() {
            continue;
        }
        let Some(time) = cell_to_datetime(time_cell) else {
            report.date_failures.push((row_no, time_cell.text()));
            continue;
        };
        report.valid_date_rows += 1;

        let result = upper_trimmed(row, layout.result);
        if !result.is_empty()
            && classify_result(&result).is_none()
            && text_len(&result) < UNKNOWN_RESULT_MAX_LEN
        {
            warn!(row = row_no, result = %result, "unrecognized judgement");
        }
        report.valid_result_rows += 1;

        let supplier = row[layout.supplier].text();
        if !supplier_matches(&supplier, supplier_filter) {
            continue;
        }
        if let Some(filter) = time_filter {
            if !filter.matches(&time) {
                continue;
            }
        }
        report.filtered_rows += 1;

        records.push(to_record(row, layout, time));
    }

    info!(
        total = report.total_rows,
        valid_dates = report.valid_date_rows,
        valid_results = report.valid_result_rows,
        kept = report.filtered_rows,
        "rows normalized"
    );
    if !report.date_failures.is_empty() {
        let sample: Vec<_> = report
            .date_failures
            .iter()
            .take(DATE_FAILURE_SAMPLE)
            .collect();
        warn!(
            failures = report.date_failures.len(),
            sample = ?sample,
            "rows dropped because the inspection date did not parse"
        );
    }

    (records, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{EXTERNAL_LAYOUT, PURCHASE_LAYOUT};
    use chrono::{Datelike, NaiveDate};

    fn purchase_row(date: Cell, supplier: &str, result: &str, action: &str) -> RawRow {
        let mut row = vec![Cell::Empty; 20];
        row[2] = Cell::from(supplier);
        row[6] = date;
        row[18] = Cell::from(result);
        row[19] = Cell::from(action);
        row
    }

    fn sheet(rows: Vec<RawRow>) -> Vec<RawRow> {
        let mut s = vec![vec![], vec![], vec![]];
        s.extend(rows);
        s
    }

    #[test]
    fn header_rows_are_skipped_and_fields_mapped() {
        let mut row = purchase_row(Cell::from("2025/01/05"), " 供应商A ", " ok ", "正常入库");
        row[11] = Cell::Number(0.953);
        row[13] = Cell::from(" 划伤 ");
        let records = normalize(&sheet(vec![row]), &PURCHASE_LAYOUT, None, None);
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.date(), NaiveDate::from_ymd_opt(2025, 1, 5).unwrap());
        assert_eq!(r.supplier, "供应商A");
        assert_eq!(r.result, "OK");
        assert_eq!(r.action, "正常入库");
        assert_eq!(r.appearance_rate, "95.30");
        assert_eq!(r.appearance_defect, "划伤");
        assert_eq!(r.dimension_defect, "");
    }

    #[test]
    fn short_rows_and_bad_dates_are_dropped() {
        crate::logging::init_test();
        let short = vec![Cell::from("x"); 19];
        let bad = purchase_row(Cell::from("not-a-date"), "A", "OK", "");
        let empty = purchase_row(Cell::Empty, "A", "OK", "");
        let good = purchase_row(Cell::Number(20250105.0), "A", "OK", "");
        let (records, report) =
            normalize_with_report(&sheet(vec![short, bad, empty, good]), &PURCHASE_LAYOUT, None, None);
        assert_eq!(records.len(), 1);
        assert_eq!(report.total_rows, 4);
        assert_eq!(report.valid_date_rows, 1);
        assert_eq!(report.date_failures, vec![(4, "not-a-date".to_string())]);
    }

    #[test]
    fn external_layout_is_one_column_left() {
        let mut row = vec![Cell::Empty; 19];
        row[2] = Cell::from("B");
        row[6] = Cell::from("2025-02-01");
        row[10] = Cell::Number(98.0);
        row[17] = Cell::from("NG");
        row[18] = Cell::from("退货");
        let records = normalize(&sheet(vec![row]), &EXTERNAL_LAYOUT, None, None);
        assert_eq!(records[0].result, "NG");
        assert_eq!(records[0].action, "退货");
        assert_eq!(records[0].appearance_rate, "98.00");
    }

    #[test]
    fn supplier_and_time_filters() {
        let rows = vec![
            purchase_row(Cell::from("2025-01-05"), "Acme Ltd", "OK", ""),
            purchase_row(Cell::from("2025-02-05"), "Acme Ltd", "OK", ""),
            purchase_row(Cell::from("2025-01-09"), "Other", "OK", ""),
        ];
        let s = sheet(rows);
        let jan = TimeFilter::Month { year: 2025, month: 1 };
        let acme_jan = normalize(&s, &PURCHASE_LAYOUT, Some("Acme"), Some(&jan));
        assert_eq!(acme_jan.len(), 1);
        assert_eq!(acme_jan[0].time.month(), 1);

        // Case-sensitive, and a blank filter means no filter.
        assert!(normalize(&s, &PURCHASE_LAYOUT, Some("acme"), None).is_empty());
        assert_eq!(normalize(&s, &PURCHASE_LAYOUT, Some("  "), None).len(), 3);
        assert_eq!(
            normalize(&s, &PURCHASE_LAYOUT, None, Some(&TimeFilter::Year(2025))).len(),
            3
        );
    }

    #[test]
    fn unrecognized_judgement_is_kept() {
        crate::logging::init_test();
        let row = purchase_row(Cell::from("2025-01-05"), "A", "待定", "");
        let records = normalize(&sheet(vec![row]), &PURCHASE_LAYOUT, None, None);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].result, "待定");
    }

    #[test]
    fn unrecognized_judgement_logs_a_warning() {
        let rows = vec![
            purchase_row(Cell::from("2025-01-05"), "A", "待定", ""),
            purchase_row(Cell::from("2025-01-06"), "A", "OK", ""),
            purchase_row(Cell::from("2025-01-07"), "A", "见附件说明，由工程部复核后再决定处理方式", ""),
        ];
        let (records, logs) =
            crate::logging::capture_warnings(|| normalize(&sheet(rows), &PURCHASE_LAYOUT, None, None));
        assert_eq!(records.len(), 3);
        assert_eq!(logs.matches("unrecognized judgement").count(), 1);
        assert!(logs.contains("待定"));
    }

    #[test]
    fn absurd_appearance_rate_is_not_reported_as_zero() {
        assert_eq!(normalize_appearance_rate(&Cell::Number(1e40)), "1e+40");
    }

    #[test]
    fn appearance_rate_branches_converge() {
        assert_eq!(normalize_appearance_rate(&Cell::Number(0.953)), "95.30");
        assert_eq!(normalize_appearance_rate(&Cell::Number(95.3)), "95.30");
        assert_eq!(normalize_appearance_rate(&Cell::from("0.953")), "95.30");
        assert_eq!(normalize_appearance_rate(&Cell::from("95.3%")), "95.30");
        assert_eq!(normalize_appearance_rate(&Cell::from(" 见附件 ")), "见附件");
        assert_eq!(normalize_appearance_rate(&Cell::Number(0.0)), "");
        assert_eq!(normalize_appearance_rate(&Cell::Empty), "");
    }
}
