//! Command-line interface definitions and argument parsing

use chrono::NaiveDateTime;
use clap::Parser;

use crate::data::parse_timestamp;

/// Customer segmentation CLI using RFM quintile scores
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input transactions CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: String,

    /// Output path for the segment distribution chart (SVG)
    #[arg(short, long, default_value = "segments.svg")]
    pub output: String,

    /// Snapshot date for recency, e.g. "2011-12-10" or "2011-12-10T00:00:00".
    /// Defaults to the day after the latest transaction
    #[arg(short, long)]
    pub snapshot_date: Option<String>,

    /// Write the segmented customer table to this CSV file
    #[arg(short, long)]
    pub export: Option<String>,

    /// Show the full record of one customer
    #[arg(short, long)]
    pub customer: Option<i64>,

    /// Number of segmented rows printed in verbose mode
    #[arg(long, default_value = "5")]
    pub sample: usize,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the snapshot date override, if any
    pub fn parse_snapshot_date(&self) -> crate::Result<Option<NaiveDateTime>> {
        match self.snapshot_date {
            Some(ref value) => parse_timestamp(value)
                .map(Some)
                .ok_or_else(|| anyhow::anyhow!("Invalid snapshot date: {}", value)),
            None => Ok(None),
        }
    }
}
