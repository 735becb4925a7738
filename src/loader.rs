// Reading inspection exports into positional rows.
//
// Workbooks go through calamine, plain exports through csv or serde_json.
// Rows come back the way the export reader in front of the engine has always
// produced them: anchored at cell A1, with trailing empty cells trimmed.
use crate::error::{IqcError, Result};
use crate::types::{Cell, RawRow, Sheet};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct LoadedSheet {
    pub sheet_name: String,
    pub all_sheets: Vec<String>,
    pub rows: Sheet,
}

fn trim_trailing_empty(mut row: RawRow) -> RawRow {
    while matches!(row.last(), Some(Cell::Empty)) {
        row.pop();
    }
    row
}

fn cell_from_excel(data: &Data) -> Cell {
    match data {
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        // Date cells keep their serial so the normalizer's serial branch
        // converts them like any other numeric date.
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) | Data::Empty => Cell::Empty,
    }
}

/// Zero-padded codes such as supplier `007` stay text.
fn is_zero_padded(t: &str) -> bool {
    let mut chars = t.chars();
    chars.next() == Some('0') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

fn cell_from_text(field: &str) -> Cell {
    let t = field.trim();
    if t.is_empty() {
        return Cell::Empty;
    }
    if is_zero_padded(t) {
        return Cell::Text(field.to_string());
    }
    match t.parse::<f64>() {
        Ok(n) if n.is_finite() => Cell::Number(n),
        _ => Cell::Text(field.to_string()),
    }
}

fn cell_from_json(v: &Value) -> Cell {
    match v {
        Value::Null => Cell::Empty,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => n.as_f64().map(Cell::Number).unwrap_or_default(),
        Value::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

/// Choose a worksheet: the requested one if given, else the first sheet
/// whose name contains the highest-priority year token, else the first
/// sheet.
pub fn select_sheet(names: &[String], requested: Option<&str>, year_priority: &[String]) -> Result<String> {
    if let Some(name) = requested {
        return names
            .iter()
            .find(|n| n.as_str() == name)
            .cloned()
            .ok_or_else(|| IqcError::SheetNotFound(name.to_string()));
    }
    for year in year_priority {
        if let Some(name) = names.iter().find(|n| n.contains(year.as_str())) {
            return Ok(name.clone());
        }
    }
    names
        .first()
        .cloned()
        .ok_or_else(|| IqcError::Excel("workbook has no sheets".into()))
}

fn load_workbook(path: &Path, requested: Option<&str>, year_priority: &[String]) -> Result<LoadedSheet> {
    let mut workbook = open_workbook_auto(path).map_err(|e| IqcError::Excel(e.to_string()))?;
    let all_sheets = workbook.sheet_names().to_vec();
    let sheet_name = select_sheet(&all_sheets, requested, year_priority)?;
    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| IqcError::Excel(e.to_string()))?;

    // calamine ranges start at the first used cell; pad back to A1 so column
    // indices line up with the sheet's letters.
    let (row_offset, col_offset) = range
        .start()
        .map(|(r, c)| (r as usize, c as usize))
        .unwrap_or((0, 0));

    let mut rows: Sheet = vec![Vec::new(); row_offset];
    for data_row in range.rows() {
        let mut row: RawRow = vec![Cell::Empty; col_offset];
        row.extend(data_row.iter().map(cell_from_excel));
        rows.push(trim_trailing_empty(row));
    }

    info!(sheet = %sheet_name, rows = rows.len(), "worksheet loaded");
    Ok(LoadedSheet {
        sheet_name,
        all_sheets,
        rows,
    })
}

fn load_csv(path: &Path) -> Result<Sheet> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let row: RawRow = record.iter().map(cell_from_text).collect();
        rows.push(trim_trailing_empty(row));
    }
    Ok(rows)
}

fn load_json(path: &Path) -> Result<Sheet> {
    let reader = BufReader::new(File::open(path)?);
    let values: Vec<Value> = serde_json::from_reader(reader)?;
    Ok(values
        .iter()
        .map(|v| match v {
            Value::Array(cells) => cells.iter().map(cell_from_json).collect(),
            // Non-row entries are kept as empty rows so row numbers stay
            // aligned; the normalizer drops them as too short.
            _ => Vec::new(),
        })
        .collect())
}

/// Load one sheet from an `.xlsx/.xlsm/.xls/.ods`, `.csv` or `.json` file.
pub fn load_sheet(path: &Path, requested: Option<&str>, year_priority: &[String]) -> Result<LoadedSheet> {
    if !path.exists() {
        return Err(IqcError::FileNotFound(path.display().to_string()));
    }
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("sheet")
        .to_string();
    debug!(path = %path.display(), ext = %ext, "loading sheet");

    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path, requested, year_priority),
        "csv" => Ok(LoadedSheet {
            rows: load_csv(path)?,
            all_sheets: vec![stem.clone()],
            sheet_name: stem,
        }),
        "json" => Ok(LoadedSheet {
            rows: load_json(path)?,
            all_sheets: vec![stem.clone()],
            sheet_name: stem,
        }),
        other => Err(IqcError::UnsupportedFormat(other.to_string())),
    }
}
