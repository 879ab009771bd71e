//! Rendering of reports for the terminal.

use owo_colors::OwoColorize;
use runway_report::{DaysOfStock, InventoryReport, InventoryReportRow, PublishOutcome, UploadStatus};
use tabled::{Table, Tabled};

/// Days of stock below which a product is flagged as urgent.
const URGENT_DAYS: i64 = 14;
/// Days of stock below which a product is flagged for reorder.
const REORDER_DAYS: i64 = 30;

#[derive(Tabled)]
struct ReportRow {
    #[tabled(rename = "SKU")]
    sku: String,
    #[tabled(rename = "Product")]
    sku_name: String,
    #[tabled(rename = "Lower")]
    lower_bound: String,
    #[tabled(rename = "Upper")]
    upper_bound: String,
    #[tabled(rename = "On hand")]
    inventory_on_hand: String,
    #[tabled(rename = "Days")]
    days: String,
}

#[derive(Tabled)]
struct WindowRow {
    #[tabled(rename = "Product")]
    sku_name: String,
    #[tabled(rename = "Window")]
    window: usize,
    #[tabled(rename = "Samples")]
    sample_size: usize,
    #[tabled(rename = "P25")]
    p25: String,
    #[tabled(rename = "Median")]
    median: String,
    #[tabled(rename = "P75")]
    p75: String,
}

/// Plain label for a days-of-stock value.
#[must_use]
pub fn days_label(days: DaysOfStock) -> String {
    match days {
        DaysOfStock::Days(d) => d.to_string(),
        DaysOfStock::ZeroRunRate => "no demand".to_string(),
        DaysOfStock::NoInventory => "no inventory".to_string(),
    }
}

fn days_colored(days: DaysOfStock) -> String {
    let label = days_label(days);
    match days {
        DaysOfStock::Days(d) if d < URGENT_DAYS => label.red().to_string(),
        DaysOfStock::Days(d) if d < REORDER_DAYS => label.yellow().to_string(),
        DaysOfStock::Days(_) => label.green().to_string(),
        DaysOfStock::ZeroRunRate | DaysOfStock::NoInventory => label.dimmed().to_string(),
    }
}

fn on_hand(row: &InventoryReportRow) -> String {
    row.inventory_on_hand
        .map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Prints report rows as indented text.
pub fn print_text(report: &InventoryReport) {
    println!("Inventory runway for {}", report.report_date);
    if let Some((min, max)) = report.sales_date_range {
        println!("Sales history: {min} to {max}");
    }
    println!();
    for row in &report.rows {
        println!(
            "  {} ({}) run rate {:.2}-{:.2}/day, on hand {}, days {}",
            row.sku_name,
            row.sku,
            row.lower_bound,
            row.upper_bound,
            on_hand(row),
            days_colored(row.days_of_stock_onhand)
        );
    }
}

/// Prints report rows as a table.
pub fn print_table(report: &InventoryReport) {
    let rows: Vec<ReportRow> = report
        .rows
        .iter()
        .map(|r| ReportRow {
            sku: r.sku.clone(),
            sku_name: r.sku_name.clone(),
            lower_bound: format!("{:.2}", r.lower_bound),
            upper_bound: format!("{:.2}", r.upper_bound),
            inventory_on_hand: on_hand(r),
            days: days_label(r.days_of_stock_onhand),
        })
        .collect();
    println!("{}", Table::new(rows));
}

/// Prints the per-window statistics behind each forecast as a table.
pub fn print_window_table(report: &InventoryReport) {
    let rows: Vec<WindowRow> = report
        .forecasts
        .iter()
        .flat_map(|f| {
            f.windows.iter().map(|w| WindowRow {
                sku_name: f.sku_name.clone(),
                window: w.window,
                sample_size: w.sample_size,
                p25: format!("{:.2}", w.p25),
                median: format!("{:.2}", w.median),
                p75: format!("{:.2}", w.p75),
            })
        })
        .collect();
    println!("{}", Table::new(rows));
}

/// Prints the publish outcome.
pub fn print_publish(bucket: &str, outcome: &PublishOutcome) {
    println!();
    if outcome.stale_deleted > 0 {
        println!(
            "Replaced {} existing object(s) in {} round(s)",
            outcome.stale_deleted, outcome.delete_rounds
        );
    }
    match &outcome.upload {
        UploadStatus::Uploaded { .. } => println!(
            "{} s3://{bucket}/{} ({} bytes)",
            "Published".green(),
            outcome.key,
            outcome.bytes
        ),
        UploadStatus::Failed { message } => println!(
            "{} s3://{bucket}/{}: {}",
            "Upload failed".red(),
            outcome.key,
            message
        ),
    }
}
