// Entry point and high-level CLI flow.
//
// - Option [1] (re)loads both sheets through the TTL cache.
// - Option [2] computes the dashboard for the current filters, prints the
//   previews and writes the exports.
// - Option [3] edits the filter selection.
// With `--batch` the program loads, generates once and exits.
use anyhow::{Context, Result};
use clap::Parser;
use once_cell::sync::Lazy;
use pipeline_report::cache::CachedSource;
use pipeline_report::cli::Cli;
use pipeline_report::config::{self, ReportConfig};
use pipeline_report::dashboard::{self, ComputeOptions, DashboardView};
use pipeline_report::error::FetchError;
use pipeline_report::filter::{filter_options, FilterSelection, TypeSelector};
use pipeline_report::loader;
use pipeline_report::output;
use pipeline_report::source::CsvDirSource;
use pipeline_report::types::{DealRecord, RevenueSummaryRecord, Stage};
use pipeline_report::util::{self, fmt_cr};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

// Loaded sheets live here so the menu can regenerate with new filters
// without going back to disk.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::default()));

#[derive(Default)]
struct AppState {
    config: ReportConfig,
    source: Option<CachedSource<CsvDirSource>>,
    deals: Option<Vec<DealRecord>>,
    revenue: Vec<RevenueSummaryRecord>,
    selection: FilterSelection,
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
        match prompt("Back to Dashboard Menu (Y/N): ").to_uppercase().as_str() {
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn load_data() -> Result<()> {
    let mut state = state();
    let config = state.config.clone();
    let source: &CachedSource<CsvDirSource> = state
        .source
        .get_or_insert_with(|| CachedSource::new(CsvDirSource::new(&config.data_dir), Duration::from_secs(config.cache_ttl_secs)));
    source.refresh();

    let (deals, report) = loader::load_deals(source, &config.deal_sheet, config.min_month_date())
        .with_context(|| format!("loading deals from {}", config.data_dir.display()))?;
    println!(
        "Processing dataset... ({} rows read, {} deals loaded)",
        util::format_int(report.total_rows),
        util::format_int(report.loaded_rows)
    );
    if report.skipped_rows > 0 {
        println!("Note: {} empty rows skipped.", util::format_int(report.skipped_rows));
    }
    if report.filtered_rows > 0 {
        println!("Note: {} rows dated before the configured start month dropped.", util::format_int(report.filtered_rows));
    }
    if report.undated_rows > 0 {
        println!("Info: {} deals have no month and are left out of monthly views.", util::format_int(report.undated_rows));
    }
    for col in report.missing_columns() {
        println!("Warning: column '{}' is missing; related views will be empty.", col);
    }

    let revenue = match loader::load_revenue_summary(source, &config.revenue_sheet) {
        Ok((rows, _)) => rows,
        Err(e @ (FetchError::NotFound { .. } | FetchError::Empty(_))) => {
            log::warn!("Revenue summary unavailable: {}", e);
            Vec::new()
        }
        Err(e) => return Err(e).context("loading revenue summary"),
    };
    if !revenue.is_empty() {
        println!("Revenue summary: {} SBUs loaded.", util::format_int(revenue.len()));
    }
    println!();

    state.deals = Some(deals);
    state.revenue = revenue;
    Ok(())
}

/// Handle option [1]: load (or reload) both sheets.
fn handle_load() {
    if let Err(e) = load_data() {
        eprintln!("Failed to load data: {:#}\n", e);
    }
}

fn print_dashboard(view: &DashboardView) {
    if view.is_empty() {
        println!("No deals match the current filters.\n");
    }

    println!("Pipeline by Month\n");
    output::preview_table_rows(&view.pipeline_rows, 24);

    if view.trends.len() > 1 {
        println!("Month-over-month change (C0 / C1 / C2 / C3)");
        for t in &view.trends {
            let markers: Vec<String> = t.cells.iter().map(|c| c.marker()).collect();
            println!("  {:<9} {}", t.label, markers.join("  "));
        }
        println!();
    }

    println!("Funnel ({:?})\n", view.compute_options.funnel_scheme);
    output::preview_table_rows(&view.funnel.rows(), Stage::ALL.len());

    let kpis = &view.metrics.kpis;
    println!(
        "Deals in ideation: {} | Won: {} | Conversion: {}% | Realized: ₹{} Cr | Open pipeline: ₹{} Cr\n",
        util::format_int(kpis.ideation_deals),
        util::format_int(kpis.won_deals),
        util::format_number(kpis.overall_conversion_pct, 1),
        util::format_number(kpis.realized_cr, 2),
        util::format_number(kpis.open_pipeline_cr, 2)
    );

    println!("Insights");
    for message in &view.insight_messages {
        println!("  - {}", message);
    }
    println!();

    println!("AVP Leaderboard (top 5)\n");
    output::preview_table_rows(&view.avp_leaderboard.rows(), 5);

    println!("AVP Performance Matrix\n");
    output::preview_table_rows(&view.performance, 10);

    println!("Closed Revenue by Brand\n");
    output::preview_table_rows(&view.brand_treemap, 6);

    let series = &view.trend_series;
    if series.insufficient_data {
        println!("Forecast: not enough monthly history for a trend line.\n");
    } else {
        println!("Forecast (linear trend)");
        for (p, c) in series.pipeline_forecast_cr.iter().zip(&series.closed_forecast_cr) {
            println!(
                "  {:<9} pipeline ₹{} Cr, closed ₹{} Cr",
                p.label,
                util::format_number(p.value, 2),
                util::format_number(c.value, 2)
            );
        }
        println!();
    }

    if let Some(revenue) = &view.revenue {
        println!("Revenue Summary by SBU\n");
        output::preview_table_rows(&revenue.display_rows(), revenue.rows.len() + 1);
    }
}

fn generate() -> Result<()> {
    let (view, output_dir) = {
        let state = state();
        let Some(deals) = state.deals.as_deref() else {
            anyhow::bail!("no data loaded; load the sheets first (option 1)");
        };
        let options = ComputeOptions::from(&state.config);
        (dashboard::compute(deals, &state.revenue, &state.selection, options), state.config.output_dir.clone())
    };

    println!("Generating dashboard...\n");
    print_dashboard(&view);

    let written = output::write_dashboard(&output_dir, &view)
        .with_context(|| format!("writing exports to {}", output_dir.display()))?;
    for path in &written {
        println!("(Exported {})", path.display());
    }
    println!(
        "\nTotal pipeline: {} across {} deals.\n",
        fmt_cr(view.grand_total.pipeline()),
        util::format_int(view.matched_records)
    );
    Ok(())
}

/// Handle option [2]: compute, print and export.
fn handle_generate() {
    if let Err(e) = generate() {
        println!("Error: {:#}\n", e);
    }
}

fn parse_list(input: &str) -> BTreeSet<String> {
    input.split(',').map(str::trim).filter(|s| !s.is_empty()).map(str::to_string).collect()
}

/// Handle option [3]: edit the filter selection. Blank input clears a filter.
fn handle_filters() {
    let mut state = state();
    let Some(deals) = state.deals.as_deref() else {
        println!("Error: No data loaded. Please load the data first (option 1).\n");
        return;
    };
    let options = filter_options(deals);

    println!("Types: {}", options.types.join(", "));
    let deal_type = prompt("Deal type (blank for all): ");
    println!("Months: {}", options.months.join(", "));
    let months = parse_list(&prompt("Months, comma separated (blank for all): "));
    println!("AVPs: {}", options.avps.join(", "));
    let avps = parse_list(&prompt("AVPs, comma separated (blank for all): "));
    println!("Brands: {}", options.brands.len());
    let brands = parse_list(&prompt("Brands, comma separated (blank for all): "));
    println!("SBUs: {}", options.sbus.join(", "));
    let sbus = parse_list(&prompt("SBUs, comma separated (blank for all): "));

    state.selection = FilterSelection {
        months,
        avps,
        brands,
        sbus,
        deal_type: if deal_type.is_empty() { TypeSelector::default() } else { TypeSelector::Radio(deal_type) },
    };
    println!("Filters updated.\n");
}

fn init_state(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => config::load_config_from(path).with_context(|| format!("reading config {}", path.display()))?,
        None => config::load_config(Path::new(".")),
    };
    cli.apply_to(&mut config);
    log::debug!("Effective config: {:?}", config);

    let mut state = state();
    state.config = config;
    state.selection = cli.selection();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_filter())).init();
    init_state(&cli)?;

    if cli.batch {
        load_data()?;
        return generate();
    }

    loop {
        println!("Sales Pipeline Dashboard");
        println!("[1] Load the data");
        println!("[2] Generate Dashboard");
        println!("[3] Edit Filters\n");
        match read_choice().as_str() {
            "1" => handle_load(),
            "2" => {
                println!();
                handle_generate();
                if !prompt_back_to_menu() {
                    println!("Exiting the program.");
                    break;
                }
            }
            "3" => handle_filters(),
            _ => println!("Invalid choice. Please enter 1, 2 or 3.\n"),
        }
    }
    Ok(())
}
