// Column layouts and the header classifier.
//
// Two export layouts exist: "purchase" (外购, bought-in parts) and "external"
// (外协, outsourced processing). They share the date and supplier columns and
// differ only in where the judgement, disposition and defect columns sit.
use crate::types::{Cell, RawRow};
use serde::Serialize;
use tracing::debug;

/// Row holding the column headers; rows above it are title/metadata.
pub const HEADER_ROW: usize = 2;
/// First data row.
pub const DATA_START_ROW: usize = 3;

const JUDGEMENT_MARKERS: &[&str] = &["最终", "判定"];
const DISPOSITION_MARKERS: &[&str] = &["处理", "方式"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Purchase,
    External,
}

/// Semantic field name to column index, fixed for a whole sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLayout {
    pub file_type: FileType,
    pub time: usize,
    pub supplier: usize,
    pub result: usize,
    pub action: usize,
    pub appearance_rate: usize,
    pub defect_detail: usize,
    pub appearance_defect: usize,
    pub dimension_defect: usize,
    pub performance_defect: usize,
}

/// Columns G (date) and C (supplier) are common to both layouts.
pub const TIME_COLUMN: usize = 6;
pub const SUPPLIER_COLUMN: usize = 2;

pub const PURCHASE_LAYOUT: ColumnLayout = ColumnLayout {
    file_type: FileType::Purchase,
    time: TIME_COLUMN,
    supplier: SUPPLIER_COLUMN,
    result: 18,             // S
    action: 19,             // T
    appearance_rate: 11,    // L
    defect_detail: 12,      // M
    appearance_defect: 13,  // N
    dimension_defect: 15,   // P
    performance_defect: 17, // R
};

pub const EXTERNAL_LAYOUT: ColumnLayout = ColumnLayout {
    file_type: FileType::External,
    time: TIME_COLUMN,
    supplier: SUPPLIER_COLUMN,
    result: 17,             // R
    action: 18,             // S
    appearance_rate: 10,    // K
    defect_detail: 11,      // L
    appearance_defect: 12,  // M
    dimension_defect: 14,   // O
    performance_defect: 16, // Q
};

impl ColumnLayout {
    pub fn for_file_type(file_type: FileType) -> ColumnLayout {
        match file_type {
            FileType::Purchase => PURCHASE_LAYOUT,
            FileType::External => EXTERNAL_LAYOUT,
        }
    }

    /// Largest column index the layout reads; rows must be longer than this.
    pub fn max_index(&self) -> usize {
        [
            self.time,
            self.supplier,
            self.result,
            self.action,
            self.appearance_rate,
            self.defect_detail,
            self.appearance_defect,
            self.dimension_defect,
            self.performance_defect,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

fn header_text(header: &RawRow, index: usize) -> String {
    header.get(index).map(Cell::text).unwrap_or_default().to_lowercase()
}

fn has_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}

/// Do the result/action header cells of `layout` read like
/// "final judgement" / "handling method"?
fn headers_match(header: &RawRow, layout: &ColumnLayout) -> bool {
    has_any(&header_text(header, layout.result), JUDGEMENT_MARKERS)
        && has_any(&header_text(header, layout.action), DISPOSITION_MARKERS)
}

/// Pick the layout from the header row. Never fails: a missing or
/// unrecognised header falls back to the purchase layout.
pub fn detect_file_type(sheet: &[RawRow]) -> FileType {
    let Some(header) = sheet.get(HEADER_ROW) else {
        debug!("no header row, defaulting to purchase layout");
        return FileType::Purchase;
    };
    if headers_match(header, &EXTERNAL_LAYOUT) {
        return FileType::External;
    }
    if headers_match(header, &PURCHASE_LAYOUT) {
        return FileType::Purchase;
    }
    debug!("header row carries no layout markers, defaulting to purchase layout");
    FileType::Purchase
}

pub fn classify(sheet: &[RawRow]) -> ColumnLayout {
    ColumnLayout::for_file_type(detect_file_type(sheet))
}
