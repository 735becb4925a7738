use crate::error::Result;
use crate::types::Statistics;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

pub const SUMMARY_FILE: &str = "summary.json";
pub const TREND_FILE: &str = "monthly_trend.csv";
pub const RANKING_FILE: &str = "supplier_ranking.csv";
pub const DEFECT_FILE: &str = "defect_distribution.csv";

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write the JSON summary and the three report tables into `dir`, returning
/// the paths written.
pub fn write_reports(dir: &Path, stats: &Statistics) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let summary = dir.join(SUMMARY_FILE);
    let trend = dir.join(TREND_FILE);
    let ranking = dir.join(RANKING_FILE);
    let defects = dir.join(DEFECT_FILE);

    write_json(&summary, stats)?;
    write_csv(&trend, &stats.monthly_trend)?;
    write_csv(&ranking, &stats.supplier_ranking)?;
    write_csv(&defects, &stats.defect_distribution)?;

    info!(dir = %dir.display(), "reports written");
    Ok(vec![summary, trend, ranking, defects])
}

/// Markdown rendering of the first `max_rows` rows, or `None` when there is
/// nothing to show.
pub fn render_table<T>(rows: &[T], max_rows: usize) -> Option<String>
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return None;
    }
    Some(Table::new(slice).with(Style::markdown()).to_string())
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    match render_table(rows, max_rows) {
        Some(table) => println!("{}\n", table),
        None => println!("(no rows)\n"),
    }
}
