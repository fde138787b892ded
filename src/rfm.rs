//! Recency, Frequency and Monetary aggregation over cleaned transactions

use chrono::{DateTime, Duration, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

use crate::data::Transaction;
use crate::error::{RfmError, RfmResult};

/// Customer identifier as it appears in the CustomerID column
pub type CustomerId = i64;

/// One customer's behavioral metrics
#[derive(Debug, Clone, PartialEq)]
pub struct RfmRecord {
    pub customer_id: CustomerId,
    /// Whole days between the last purchase and the snapshot date
    pub recency: i64,
    /// Number of distinct invoices
    pub frequency: usize,
    /// Sum of quantity * unit price
    pub monetary: f64,
}

/// The day after the latest transaction, or `None` for an empty set
pub fn default_snapshot_date(transactions: &[Transaction]) -> Option<NaiveDateTime> {
    transactions
        .iter()
        .map(|t| t.invoice_date)
        .max()
        .map(|latest| latest + Duration::days(1))
}

/// Build the transaction frame the aggregation runs on
fn transaction_frame(transactions: &[Transaction]) -> PolarsResult<DataFrame> {
    df!(
        "CustomerID" => transactions.iter().map(|t| t.customer_id).collect::<Vec<i64>>(),
        "InvoiceNo" => transactions.iter().map(|t| t.invoice_id.as_str()).collect::<Vec<&str>>(),
        "InvoiceDate" => transactions
            .iter()
            .map(|t| t.invoice_date.and_utc().timestamp_millis())
            .collect::<Vec<i64>>(),
        "TotalAmount" => transactions
            .iter()
            .map(|t| t.quantity as f64 * t.unit_price)
            .collect::<Vec<f64>>()
    )
}

/// Per-customer last purchase (epoch millis), distinct invoices and spend,
/// sorted by customer id
fn aggregate_customers(frame: DataFrame) -> PolarsResult<DataFrame> {
    frame
        .lazy()
        .group_by([col("CustomerID")])
        .agg([
            col("InvoiceDate").max().alias("LastPurchase"),
            col("InvoiceNo").n_unique().cast(DataType::Int64).alias("Frequency"),
            col("TotalAmount").sum().alias("Monetary"),
        ])
        .sort(["CustomerID"], Default::default())
        .collect()
}

/// Reduce transactions to one `RfmRecord` per customer, ordered by customer id
///
/// # Arguments
/// * `transactions` - Cleaned transaction rows
/// * `snapshot_date` - Reference date for recency; must be strictly after the
///   latest transaction
///
/// # Returns
/// * One record per distinct customer id
pub fn compute_rfm(
    transactions: &[Transaction],
    snapshot_date: NaiveDateTime,
) -> RfmResult<Vec<RfmRecord>> {
    let latest = transactions
        .iter()
        .map(|t| t.invoice_date)
        .max()
        .ok_or_else(|| RfmError::Data("no transactions to aggregate".to_string()))?;

    if snapshot_date <= latest {
        return Err(RfmError::Data(format!(
            "snapshot date {} must be after the latest transaction {}",
            snapshot_date, latest
        )));
    }

    let rfm_df = aggregate_customers(transaction_frame(transactions)?)?;

    let customer_ids = rfm_df.column("CustomerID")?.i64()?;
    let last_purchases = rfm_df.column("LastPurchase")?.i64()?;
    let frequencies = rfm_df.column("Frequency")?.i64()?;
    let monetary = rfm_df.column("Monetary")?.f64()?;

    let records = customer_ids
        .into_no_null_iter()
        .zip(last_purchases.into_no_null_iter())
        .zip(frequencies.into_no_null_iter())
        .zip(monetary.into_no_null_iter())
        .map(|(((customer_id, last_millis), frequency), monetary)| {
            let last_purchase = DateTime::from_timestamp_millis(last_millis)
                .ok_or_else(|| {
                    RfmError::Data(format!("invalid last purchase timestamp {}", last_millis))
                })?
                .naive_utc();
            Ok(RfmRecord {
                customer_id,
                recency: (snapshot_date - last_purchase).num_days(),
                frequency: frequency as usize,
                monetary,
            })
        })
        .collect::<RfmResult<Vec<RfmRecord>>>()?;

    debug!(
        transactions = transactions.len(),
        customers = records.len(),
        "aggregated RFM metrics"
    );

    Ok(records)
}
