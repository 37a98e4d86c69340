use crate::dashboard::DashboardView;
use crate::error::ReportError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

pub const PIPELINE_FILE: &str = "pipeline_by_month.csv";
pub const LEADERBOARD_FILE: &str = "leaderboard_avp.csv";
pub const REVENUE_FILE: &str = "revenue_summary.csv";
pub const DASHBOARD_FILE: &str = "dashboard.json";

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), ReportError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ReportError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write every export of one computation into `dir`, returning the paths.
pub fn write_dashboard(dir: &Path, view: &DashboardView) -> Result<Vec<PathBuf>, ReportError> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let path = dir.join(PIPELINE_FILE);
    write_csv(&path, &view.pipeline_rows)?;
    written.push(path);

    let path = dir.join(LEADERBOARD_FILE);
    write_csv(&path, &view.avp_leaderboard.rows())?;
    written.push(path);

    if let Some(revenue) = &view.revenue {
        let path = dir.join(REVENUE_FILE);
        write_csv(&path, &revenue.display_rows())?;
        written.push(path);
    }

    let path = dir.join(DASHBOARD_FILE);
    write_json(&path, view)?;
    written.push(path);
    log::info!("Wrote {} files to {}", written.len(), dir.display());
    Ok(written)
}

pub fn render_table<T>(rows: &[T], max_rows: usize) -> Option<String>
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        return None;
    }
    Some(Table::new(slice).with(Style::markdown()).to_string())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    match render_table(rows, max_rows) {
        Some(table_str) => println!("{}\n", table_str),
        None => println!("(no rows)\n"),
    }
}
