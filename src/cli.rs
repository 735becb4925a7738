use crate::config::AppConfig;
use crate::error::Result;
use crate::types::TimeFilter;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "iqc-report")]
#[command(about = "Incoming inspection (IQC) quality statistics", long_about = None)]
pub struct Cli {
    /// Config file (JSON); defaults apply when it does not exist
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Inspection export (.xlsx/.xls/.csv/.json)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Worksheet name (default: sheet named after the latest year)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Directory for report files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Only suppliers whose name contains this text
    #[arg(short, long)]
    pub supplier: Option<String>,

    /// Only inspections in this month (YYYY-MM)
    #[arg(long, conflicts_with = "year")]
    pub month: Option<String>,

    /// Only inspections in this year (YYYY)
    #[arg(long)]
    pub year: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Write the effective config (file values plus these flags) back to the
    /// config file
    #[arg(long)]
    pub save_config: bool,
}

impl Cli {
    /// Fold command-line overrides into the loaded config.
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if self.verbose {
            config.log_level = "debug".into();
        }
        config
    }

    /// `--month`/`--year` when given, else the config's default filter.
    pub fn time_filter(&self, config: &AppConfig) -> Result<Option<TimeFilter>> {
        match (&self.month, &self.year) {
            (Some(m), _) => TimeFilter::parse("month", m),
            (None, Some(y)) => TimeFilter::parse("year", y),
            (None, None) => match &config.time_filter {
                Some(wire) => TimeFilter::from_wire(wire),
                None => Ok(None),
            },
        }
    }
}
