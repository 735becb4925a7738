use thiserror::Error;

/// Everything that can go wrong between reading an inspection export and
/// handing back statistics.
///
/// Per-row problems (short rows, bad dates) are never errors: those rows are
/// dropped by the normalizer. Only sheet-level or caller-level problems end up
/// here.
#[derive(Error, Debug)]
pub enum IqcError {
    #[error("sheet contains no data")]
    EmptySheet,

    #[error("sheet layout is not recognised: no inspection date found in column G of the first rows")]
    MissingRequiredColumns,

    #[error("invalid time filter: {0}")]
    InvalidFilter(String),

    #[error("invalid {0} period date")]
    InvalidPeriod(String),

    #[error("data processing failed: {0}")]
    Processing(#[source] Box<IqcError>),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported file format: {0} (expected .xlsx/.xls/.csv/.json)")]
    UnsupportedFormat(String),

    #[error("worksheet \"{0}\" does not exist")]
    SheetNotFound(String),

    #[error("excel parse error: {0}")]
    Excel(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, IqcError>;
