//! Transaction loading, cleaning and export using Polars

use std::fs::File;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::{info, warn};

use crate::rfm::CustomerId;
use crate::segment::SegmentedRecord;

/// A cleaned transaction line
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub customer_id: CustomerId,
    pub invoice_id: String,
    pub invoice_date: NaiveDateTime,
    pub quantity: i64,
    pub unit_price: f64,
}

/// Rows removed by each cleaning rule
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleaningStats {
    pub rows_read: usize,
    /// Missing customer, non-positive quantity, bad price or duplicate
    pub rows_filtered: usize,
    pub cancellations: usize,
    pub bad_dates: usize,
}

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M",
];

/// Parse an invoice timestamp in any of the accepted layouts
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Cancelled invoices carry a "C" prefix
fn cancellation() -> Expr {
    col("InvoiceNo").str().starts_with(lit("C"))
}

/// Load an Online-Retail style CSV and return cleaned transactions
///
/// # Arguments
/// * `file_path` - Path to the CSV file
///
/// # Returns
/// * Transactions with a customer id, positive quantity, non-negative price,
///   no duplicates and no cancelled invoices
pub fn load_transactions(file_path: &str) -> crate::Result<Vec<Transaction>> {
    let (transactions, stats) = load_transactions_with_stats(file_path)?;
    info!(
        rows_read = stats.rows_read,
        rows_filtered = stats.rows_filtered,
        cancellations = stats.cancellations,
        bad_dates = stats.bad_dates,
        kept = transactions.len(),
        "cleaned transactions"
    );
    Ok(transactions)
}

/// Same as `load_transactions`, also reporting what cleaning removed
pub fn load_transactions_with_stats(
    file_path: &str,
) -> crate::Result<(Vec<Transaction>, CleaningStats)> {
    // Every column is read as text so mixed invoice numbers survive inference
    let raw = LazyCsvReader::new(file_path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?;

    let rows_read = raw.height();
    if rows_read == 0 {
        anyhow::bail!("No transactions found in {}", file_path);
    }

    let valid = raw
        .lazy()
        .with_columns([
            col("Quantity").cast(DataType::Int64),
            col("UnitPrice").cast(DataType::Float64),
            // Float ids such as "17850.0" come from spreadsheet exports
            col("CustomerID")
                .cast(DataType::Float64)
                .cast(DataType::Int64),
        ])
        .filter(
            col("CustomerID")
                .is_not_null()
                .and(col("Quantity").gt(lit(0)))
                .and(col("UnitPrice").gt_eq(lit(0.0)))
                .and(col("InvoiceNo").is_not_null())
                .and(col("InvoiceDate").is_not_null()),
        )
        .unique_stable(None, UniqueKeepStrategy::First)
        .collect()?;

    let cancellations = valid.clone().lazy().filter(cancellation()).collect()?.height();
    let df = valid.lazy().filter(cancellation().not()).collect()?;

    let mut stats = CleaningStats {
        rows_read,
        rows_filtered: rows_read - df.height() - cancellations,
        cancellations,
        ..Default::default()
    };

    let invoices = df.column("InvoiceNo")?.str()?;
    let dates = df.column("InvoiceDate")?.str()?;
    let quantities = df.column("Quantity")?.i64()?;
    let prices = df.column("UnitPrice")?.f64()?;
    let customers = df.column("CustomerID")?.i64()?;

    let mut transactions = Vec::with_capacity(df.height());
    let rows = customers
        .into_no_null_iter()
        .zip(invoices.into_no_null_iter())
        .zip(dates.into_no_null_iter())
        .zip(quantities.into_no_null_iter())
        .zip(prices.into_no_null_iter());
    for ((((customer_id, invoice_id), date), quantity), unit_price) in rows {
        let Some(invoice_date) = parse_timestamp(date) else {
            stats.bad_dates += 1;
            continue;
        };

        transactions.push(Transaction {
            customer_id,
            invoice_id: invoice_id.to_string(),
            invoice_date,
            quantity,
            unit_price,
        });
    }

    if stats.bad_dates > 0 {
        warn!(bad_dates = stats.bad_dates, "dropped rows with unparseable InvoiceDate");
    }
    if transactions.is_empty() {
        anyhow::bail!("No valid transactions left after cleaning {}", file_path);
    }

    Ok((transactions, stats))
}

/// Write the segmented customer table as CSV
pub fn export_segments(records: &[SegmentedRecord], output_path: &str) -> crate::Result<()> {
    let mut df = df!(
        "CustomerID" => records.iter().map(|r| r.scored.rfm.customer_id).collect::<Vec<i64>>(),
        "Recency" => records.iter().map(|r| r.scored.rfm.recency).collect::<Vec<i64>>(),
        "Frequency" => records.iter().map(|r| r.scored.rfm.frequency as i64).collect::<Vec<i64>>(),
        "Monetary" => records.iter().map(|r| r.scored.rfm.monetary).collect::<Vec<f64>>(),
        "R_Score" => records.iter().map(|r| r.scored.scores.recency as i32).collect::<Vec<i32>>(),
        "F_Score" => records.iter().map(|r| r.scored.scores.frequency as i32).collect::<Vec<i32>>(),
        "M_Score" => records.iter().map(|r| r.scored.scores.monetary as i32).collect::<Vec<i32>>(),
        "Segment" => records.iter().map(|r| r.segment.label()).collect::<Vec<&str>>()
    )?;

    let mut file = File::create(output_path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut df)?;
    info!(rows = df.height(), path = output_path, "exported segmented customers");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country").unwrap();
        writeln!(file, "536365,85123A,WHITE HANGING HEART T-LIGHT HOLDER,6,2010-12-01T08:26:00Z,2.55,17850,United Kingdom").unwrap();
        writeln!(file, "536365,71053,WHITE METAL LANTERN,6,2010-12-01T08:26:00Z,3.39,17850,United Kingdom").unwrap();
        // exact duplicate of the line above
        writeln!(file, "536365,71053,WHITE METAL LANTERN,6,2010-12-01T08:26:00Z,3.39,17850,United Kingdom").unwrap();
        writeln!(file, "536366,22633,HAND WARMER UNION JACK,6,2010-12-01 08:28:00,1.85,17850.0,United Kingdom").unwrap();
        writeln!(file, "536367,84406B,CREAM CUPID HEARTS COAT HANGER,8,12/1/2010 8:34,2.75,13047,United Kingdom").unwrap();
        writeln!(file, "C536379,D,Discount,-1,2010-12-01T09:41:00Z,27.50,14527,United Kingdom").unwrap();
        writeln!(file, "C536383,35004C,SET OF 3 COLOURED FLYING DUCKS,1,2010-12-01T09:49:00Z,4.65,15311,United Kingdom").unwrap();
        writeln!(file, "536414,22139,,56,2010-12-01T11:52:00Z,0,,United Kingdom").unwrap();
        writeln!(file, "536415,22139,RETROSPOT TEA SET,0,2010-12-01T11:57:00Z,4.95,13047,United Kingdom").unwrap();
        file
    }

    #[test]
    fn test_load_transactions_applies_cleaning() {
        let test_file = create_test_csv();
        let file_path = test_file.path().to_str().unwrap();

        let (transactions, stats) = load_transactions_with_stats(file_path).unwrap();
        assert_eq!(stats.rows_read, 9);
        assert_eq!(stats.cancellations, 1);
        assert_eq!(stats.bad_dates, 0);
        assert_eq!(transactions.len(), 4);

        assert!(transactions.iter().all(|t| !t.invoice_id.starts_with('C')));
        assert!(transactions.iter().all(|t| t.quantity > 0));
        assert_eq!(
            transactions
                .iter()
                .filter(|t| t.customer_id == 17850)
                .count(),
            3
        );
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_transactions("/nonexistent/transactions.csv").is_err());
    }

    #[test]
    fn test_all_rows_filtered_is_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "InvoiceNo,StockCode,Description,Quantity,InvoiceDate,UnitPrice,CustomerID,Country").unwrap();
        writeln!(file, "C1,X,Returned,2,2011-01-01T10:00:00Z,1.0,100,France").unwrap();
        let result = load_transactions(file.path().to_str().unwrap());
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2010, 12, 1)
            .unwrap()
            .and_hms_opt(8, 26, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2010-12-01T08:26:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2010-12-01T08:26:00"), Some(expected));
        assert_eq!(parse_timestamp("2010-12-01 08:26:00"), Some(expected));
        assert_eq!(parse_timestamp("2010-12-01 08:26"), Some(expected));
        assert_eq!(parse_timestamp("12/1/2010 8:26"), Some(expected));
        assert_eq!(
            parse_timestamp("2010-12-01"),
            NaiveDate::from_ymd_opt(2010, 12, 1).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_cancellation_filter() {
        let mut df = df!(
            "InvoiceNo" => ["C536379", "536379", "A563185", "C1"]
        )
        .unwrap();
        df = df.lazy().filter(cancellation()).collect().unwrap();
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_cleaning_stats_add_up() {
        let test_file = create_test_csv();
        let (transactions, stats) =
            load_transactions_with_stats(test_file.path().to_str().unwrap()).unwrap();
        assert_eq!(
            stats.rows_filtered + stats.cancellations + stats.bad_dates + transactions.len(),
            stats.rows_read
        );
        assert_eq!(stats.rows_filtered, 4);
    }
}
