// Entry point and interactive menu.
//
// - Option [1] loads the inspection export once and keeps the normalized
//   records in memory.
// - Option [2] writes the report files and prints previews.
// - Option [3] re-filters the cached records by supplier and/or month/year
//   without re-reading the file.
// - Option [4] compares two custom date ranges over the cached records.
use chrono::Local;
use clap::Parser;
use iqc_report::cli::Cli;
use iqc_report::comparison::{compare_periods, PeriodInput};
use iqc_report::config::{AppConfig, DEFAULT_CONFIG_FILE};
use iqc_report::types::{ProcessedReport, Statistics, TimeFilter, TimeFilterWire};
use iqc_report::{loader, logging, output, pipeline, util};
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::error;

// Loaded once per run; re-filtering replaces `current` but keeps `loaded`.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| {
    Mutex::new(AppState {
        loaded: None,
        current: None,
    })
});

struct AppState {
    loaded: Option<ProcessedReport>,
    current: Option<Statistics>,
}

fn state() -> MutexGuard<'static, AppState> {
    APP_STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    prompt("Enter choice: ")
}

/// Returns `true` if the user chose `Y`, `false` if they chose `N`.
fn prompt_back_to_menu() -> bool {
    loop {
        match prompt("Back to menu (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn handle_load(cli: &Cli, config: &AppConfig) {
    let time_filter = match cli.time_filter(config) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}\n", e);
            return;
        }
    };
    let sheet = match loader::load_sheet(&config.input, cli.sheet.as_deref(), &config.sheet_years) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to load file: {}\n", e);
            return;
        }
    };
    let file_name = config
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned());

    match pipeline::process_iqc_data(
        &sheet.rows,
        cli.supplier.as_deref(),
        time_filter,
        file_name.as_deref(),
        Local::now().naive_local(),
    ) {
        Ok(report) => {
            println!(
                "Processing worksheet \"{}\"... ({} rows read, {} valid inspection records)",
                sheet.sheet_name,
                util::format_int(sheet.rows.len()),
                util::format_int(report.raw_data.len())
            );
            if sheet.all_sheets.len() > 1 {
                println!("Other worksheets: {}", sheet.all_sheets.join(", "));
            }
            println!();
            let mut st = state();
            st.current = Some(report.statistics.clone());
            st.loaded = Some(report);
        }
        Err(e) => {
            error!(error = %e, "load failed");
            eprintln!("{}\n", e);
        }
    }
}

fn handle_generate_reports(config: &AppConfig) {
    let Some(stats) = state().current.clone() else {
        println!("Error: No data loaded. Please load a file first (option 1).\n");
        return;
    };

    match output::write_reports(&config.output_dir, &stats) {
        Ok(paths) => {
            let names: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
            println!("Reports written: {}\n", names.join(", "));
        }
        Err(e) => eprintln!("Write error: {}", e),
    }

    let s = &stats.summary;
    println!(
        "Batches: {} | OK: {} | NG: {} | Pass: {} | Return: {} | Special: {} | Pass rate: {:.2}%\n",
        util::format_int(s.total_batches),
        util::format_int(s.ok_batches),
        util::format_int(s.ng_batches),
        util::format_int(s.pass_batches),
        util::format_int(s.return_batches),
        util::format_int(s.special_batches),
        s.overall_pass_rate
    );

    let w = &stats.recent_two_weeks;
    println!(
        "This week ({} ~ {}): {} batches, {} OK | Last week ({} ~ {}): {} batches, {} OK\n",
        w.current_week_start,
        w.current_week_end,
        w.current_week.total,
        w.current_week.ok,
        w.previous_week_start,
        w.previous_week_end,
        w.previous_week.total,
        w.previous_week.ok
    );

    output::preview_table("Monthly Pass Rate Trend", None, &stats.monthly_trend, config.preview_rows);
    output::preview_table(
        "Supplier Yield Ranking",
        Some("sorted by yield rate"),
        &stats.supplier_ranking,
        config.preview_rows,
    );
    output::preview_table(
        "Defect Distribution",
        Some("NG batches, top 10"),
        &stats.defect_distribution,
        config.preview_rows,
    );
}

fn handle_refilter() {
    let records = match &state().loaded {
        Some(report) => report.raw_data.clone(),
        None => {
            println!("Error: No data loaded. Please load a file first (option 1).\n");
            return;
        }
    };

    let supplier = prompt("Supplier contains (blank for all): ");
    let period = prompt("Month YYYY-MM or year YYYY (blank for all): ");
    let wire = TimeFilterWire {
        kind: if period.contains('-') { "month" } else { "year" }.to_string(),
        value: period,
    };
    let time_filter = match TimeFilter::from_wire(&wire) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("{}\n", e);
            return;
        }
    };
    let supplier = (!supplier.is_empty()).then_some(supplier);

    let stats = pipeline::recalculate(
        &records,
        supplier.as_deref(),
        time_filter,
        Local::now().naive_local(),
    );
    println!(
        "Filtered: {} batches, pass rate {:.2}%\n",
        util::format_int(stats.summary.total_batches),
        stats.summary.overall_pass_rate
    );
    state().current = Some(stats);
}

fn handle_compare() {
    let records = match &state().loaded {
        Some(report) => report.raw_data.clone(),
        None => {
            println!("Error: No data loaded. Please load a file first (option 1).\n");
            return;
        }
    };
    let current_start = prompt("Current period start (YYYY-MM-DD): ");
    let current_end = prompt("Current period end (YYYY-MM-DD): ");
    let previous_start = prompt("Previous period start (YYYY-MM-DD): ");
    let previous_end = prompt("Previous period end (YYYY-MM-DD): ");

    match compare_periods(
        PeriodInput::Records(&records),
        &current_start,
        &current_end,
        &previous_start,
        &previous_end,
    ) {
        Ok(cmp) => match serde_json::to_string_pretty(&cmp) {
            Ok(json) => println!("{}\n", json),
            Err(e) => eprintln!("{}\n", e),
        },
        Err(e) => eprintln!("{}\n", e),
    }
}

fn main() {
    let cli = Cli::parse();
    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(c) => cli.apply(c),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(2);
        }
    };
    logging::init(&config.log_level);

    if cli.save_config {
        let path = cli
            .config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        match config.save(&path) {
            Ok(()) => println!("Config saved to {}\n", path.display()),
            Err(e) => eprintln!("Could not save config: {}\n", e),
        }
    }

    loop {
        println!("IQC Quality Statistics ({})", config.input.display());
        println!("[1] Load the file");
        println!("[2] Generate Reports");
        println!("[3] Filter loaded data");
        println!("[4] Compare two periods\n");
        match read_choice().as_str() {
            "1" => handle_load(&cli, &config),
            "2" => {
                println!();
                handle_generate_reports(&config);
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_refilter(),
            "4" => handle_compare(),
            _ => println!("Invalid choice. Please enter 1-4.\n"),
        }
    }
}
