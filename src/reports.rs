use crate::keywords::{classify_action, classify_result, matches, StatusCategory};
use crate::types::{
    CanonicalRecord, DefectCountRow, MonthBucket, MonthlyTrendRow, Statistics, StatusCounts,
    Summary, SupplierRankingRow, WeekComparison,
};
use crate::util::{percentage, round2, text_len};
use crate::week::WeekWindow;
use chrono::{Datelike, NaiveDateTime};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

pub const APPEARANCE_DEFECT: &str = "外观不良";
pub const DIMENSION_DEFECT: &str = "尺寸不良";
pub const PERFORMANCE_DEFECT: &str = "性能不良";
pub const RETURN_BUCKET: &str = "退货";
pub const SPECIAL_OR_SELECTION_BUCKET: &str = "特采/选别";

const RETURN_HINTS: &[&str] = &["退", "退货"];
const SPECIAL_HINTS: &[&str] = &["特", "让步", "选"];
/// Free-text dispositions at least this long are remarks, not a category.
const FREE_TEXT_BUCKET_MAX_LEN: usize = 20;
const TOP_DEFECTS: usize = 10;

fn is_ok(record: &CanonicalRecord) -> bool {
    classify_result(&record.result) == Some(StatusCategory::Ok)
}

fn is_ng(record: &CanonicalRecord) -> bool {
    classify_result(&record.result) == Some(StatusCategory::Ng)
}

/// Counts over a record set. Judgement is exclusive (OK tried before NG);
/// each disposition category is a separate membership test, so one record
/// may count as both PASS and RETURN.
fn status_counts<'a, I>(records: I) -> StatusCounts
where
    I: IntoIterator<Item = &'a CanonicalRecord>,
{
    let mut c = StatusCounts::default();
    for r in records {
        c.total += 1;
        if is_ok(r) {
            c.ok += 1;
        } else if is_ng(r) {
            c.ng += 1;
        }
        if matches(&r.action, StatusCategory::Pass) {
            c.pass += 1;
        }
        if matches(&r.action, StatusCategory::Return) {
            c.returned += 1;
        }
        if matches(&r.action, StatusCategory::Special) {
            c.special += 1;
        }
    }
    c
}

pub fn summary(records: &[CanonicalRecord]) -> Summary {
    let c = status_counts(records);
    Summary {
        total_batches: c.total,
        ok_batches: c.ok,
        ng_batches: c.ng,
        pass_batches: c.pass,
        return_batches: c.returned,
        special_batches: c.special,
        overall_pass_rate: round2(percentage(c.ok, c.total)),
    }
}

pub fn month_key<D: Datelike>(date: &D) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Per-month buckets. Only the first matching disposition (PASS, then
/// RETURN, then SPECIAL) is counted for each record.
pub fn monthly_data(records: &[CanonicalRecord]) -> BTreeMap<String, MonthBucket> {
    let mut months: BTreeMap<String, MonthBucket> = BTreeMap::new();
    for r in records {
        let bucket = months.entry(month_key(&r.time)).or_default();
        bucket.total += 1;
        match classify_result(&r.result) {
            Some(StatusCategory::Ok) => bucket.ok += 1,
            Some(StatusCategory::Ng) => bucket.ng += 1,
            _ => {}
        }
        match classify_action(&r.action) {
            Some(StatusCategory::Pass) => bucket.pass += 1,
            Some(StatusCategory::Return) => bucket.returned += 1,
            Some(StatusCategory::Special) => bucket.special += 1,
            _ => {}
        }
    }
    months
}

/// Months in ascending order with an unrounded pass rate.
pub fn monthly_trend(months: &BTreeMap<String, MonthBucket>) -> Vec<MonthlyTrendRow> {
    months
        .iter()
        .map(|(month, b)| MonthlyTrendRow {
            month: month.clone(),
            total: b.total,
            pass_rate: percentage(b.ok, b.total),
            return_count: b.returned,
            special_count: b.special,
        })
        .collect()
}

/// Current vs previous reporting week as of `now`; only the calendar date of
/// each record is compared.
pub fn week_comparison(records: &[CanonicalRecord], now: NaiveDateTime) -> WeekComparison {
    let window = WeekWindow::containing(now.date());
    let current: Vec<&CanonicalRecord> = records
        .iter()
        .filter(|r| window.in_current(r.date()))
        .collect();
    let previous: Vec<&CanonicalRecord> = records
        .iter()
        .filter(|r| window.in_previous(r.date()))
        .collect();

    let (current_week_start, current_week_end, previous_week_start, previous_week_end) =
        window.formatted();
    info!(
        current = %format!("{}~{}", current_week_start, current_week_end),
        current_rows = current.len(),
        previous = %format!("{}~{}", previous_week_start, previous_week_end),
        previous_rows = previous.len(),
        "week comparison"
    );

    WeekComparison {
        current_week: status_counts(current),
        previous_week: status_counts(previous),
        current_week_start,
        current_week_end,
        previous_week_start,
        previous_week_end,
    }
}

/// Suppliers ordered by yield rate, highest first. Ties keep the order in
/// which suppliers first appear in the data.
pub fn supplier_ranking(records: &[CanonicalRecord]) -> Vec<SupplierRankingRow> {
    #[derive(Default)]
    struct Acc {
        supplier: String,
        total: usize,
        ok: usize,
    }
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut accs: Vec<Acc> = Vec::new();
    for r in records {
        let i = *index.entry(r.supplier.as_str()).or_insert_with(|| {
            accs.push(Acc {
                supplier: r.supplier.clone(),
                ..Default::default()
            });
            accs.len() - 1
        });
        accs[i].total += 1;
        if is_ok(r) {
            accs[i].ok += 1;
        }
    }

    let mut scored: Vec<(f64, Acc)> = accs
        .into_iter()
        .map(|a| (round2(percentage(a.ok, a.total)), a))
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

    scored
        .into_iter()
        .enumerate()
        .map(|(idx, (yield_rate, a))| SupplierRankingRow {
            rank: idx + 1,
            supplier: a.supplier,
            total: a.total,
            ok_count: a.ok,
            yield_rate,
        })
        .collect()
}

fn is_structured_defect(text: &str) -> bool {
    !text.trim().is_empty() && !matches(text, StatusCategory::Ok)
}

/// Bucket for an NG record that carries no structured defect columns,
/// derived from its disposition text.
fn disposition_bucket(action: &str) -> Option<String> {
    if RETURN_HINTS.iter().any(|h| action.contains(h)) {
        Some(RETURN_BUCKET.to_string())
    } else if SPECIAL_HINTS.iter().any(|h| action.contains(h)) {
        Some(SPECIAL_OR_SELECTION_BUCKET.to_string())
    } else if !action.trim().is_empty() && text_len(action) < FREE_TEXT_BUCKET_MAX_LEN {
        Some(action.to_string())
    } else {
        None
    }
}

/// Top defect categories among NG records, most frequent first.
pub fn defect_distribution(records: &[CanonicalRecord]) -> Vec<DefectCountRow> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<DefectCountRow> = Vec::new();
    let mut bump = |label: String| {
        let i = *index.entry(label.clone()).or_insert_with(|| {
            counts.push(DefectCountRow {
                defect_type: label,
                count: 0,
            });
            counts.len() - 1
        });
        counts[i].count += 1;
    };

    for r in records.iter().filter(|r| matches(&r.result, StatusCategory::Ng)) {
        if is_structured_defect(&r.appearance_defect) {
            bump(APPEARANCE_DEFECT.to_string());
        }
        if is_structured_defect(&r.dimension_defect) {
            bump(DIMENSION_DEFECT.to_string());
        }
        if is_structured_defect(&r.performance_defect) {
            bump(PERFORMANCE_DEFECT.to_string());
        }

        let no_structured = r.appearance_defect.is_empty()
            && r.dimension_defect.is_empty()
            && r.performance_defect.is_empty();
        if no_structured && !r.action.is_empty() {
            if let Some(label) = disposition_bucket(&r.action) {
                bump(label);
            }
        }
    }

    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(TOP_DEFECTS);
    counts
}

/// Every derived view over `records`, with the week window taken as of
/// `now`. Pure: the same records and `now` always give the same output.
pub fn aggregate(records: &[CanonicalRecord], now: NaiveDateTime) -> Statistics {
    let monthly = monthly_data(records);
    let trend = monthly_trend(&monthly);
    Statistics {
        summary: summary(records),
        recent_two_weeks: week_comparison(records, now),
        monthly_trend: trend,
        monthly_data: monthly,
        supplier_ranking: supplier_ranking(records),
        defect_distribution: defect_distribution(records),
        supplier_filter: None,
        time_filter: None,
        file_name: None,
    }
}
