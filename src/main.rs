//! RfmForge: customer segmentation CLI using RFM scoring
//!
//! This is the main entrypoint that orchestrates transaction loading,
//! segmentation, reporting and export.

use anyhow::Result;
use clap::Parser;
use rfmforge::{
    export_segments, generate_segment_report, load_transactions, run_segmentation, viz, Args,
    SegmentationConfig,
};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::prelude::*;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();
    init_tracing(args.verbose)?;

    let start_time = Instant::now();

    // Step 1: Load and clean transactions
    info!(input = %args.input, "loading transactions");
    let data_start = Instant::now();
    let transactions = load_transactions(&args.input)?;
    println!("✓ Transactions loaded: {}", transactions.len());
    info!(elapsed_ms = data_start.elapsed().as_millis() as u64, "data loaded");

    // Step 2: Score and segment customers
    let mut config = SegmentationConfig::default();
    if let Some(snapshot_date) = args.parse_snapshot_date()? {
        config = config.with_snapshot_date(snapshot_date);
    }

    let report = run_segmentation(&transactions, &config)?;
    println!(
        "✓ Customers segmented: {} (snapshot date {})",
        report.customer_count(),
        report.snapshot_date
    );

    if args.verbose {
        viz::print_record_sample(&report.records, args.sample);
    }

    // Step 3: Report
    generate_segment_report(&report, &args.output)?;

    if let Some(customer_id) = args.customer {
        match report.find(customer_id) {
            Some(record) => viz::print_customer_detail(record),
            None => println!("\nCustomer {} not found after cleaning", customer_id),
        }
    }

    // Step 4: Optional export
    if let Some(ref export_path) = args.export {
        export_segments(&report.records, export_path)?;
        println!("Segmented customers saved to: {}", export_path);
    }

    println!("\n=== Pipeline Complete ===");
    println!("Total processing time: {:.2}s", start_time.elapsed().as_secs_f64());

    Ok(())
}

/// Initialize tracing subscriber, honoring RUST_LOG when set
fn init_tracing(verbose: bool) -> Result<()> {
    let default_filter = if verbose { "rfmforge=debug" } else { "rfmforge=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}
