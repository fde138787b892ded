//! Console tables and segment distribution chart using Plotters

use plotters::prelude::*;

use crate::pipeline::SegmentationReport;
use crate::segment::SegmentedRecord;
use crate::summary::SegmentSummaryRow;

/// Viridis-like palette, one color per bar
const SEGMENT_COLORS: [RGBColor; 10] = [
    RGBColor(68, 1, 84),
    RGBColor(72, 40, 120),
    RGBColor(62, 74, 137),
    RGBColor(49, 104, 142),
    RGBColor(38, 130, 142),
    RGBColor(31, 158, 137),
    RGBColor(53, 183, 121),
    RGBColor(109, 205, 89),
    RGBColor(180, 222, 44),
    RGBColor(253, 231, 37),
];

/// Horizontal bar chart of customers per segment, largest segment on top
///
/// # Arguments
/// * `summary` - Summary rows, already sorted by customer count
/// * `output_path` - Path of the SVG file to write
/// * `plot_title` - Title for the chart
pub fn create_segment_chart(
    summary: &[SegmentSummaryRow],
    output_path: &str,
    plot_title: Option<&str>,
) -> crate::Result<()> {
    if summary.is_empty() {
        anyhow::bail!("No segments to plot");
    }
    let title = plot_title.unwrap_or("Distribution of Customer Segments");

    let n = summary.len() as u32;
    let max_count = summary.iter().map(|row| row.customer_count).max().unwrap_or(1) as u32;
    // Row 0 is drawn at the bottom, so the largest segment takes the top row
    let labels: Vec<&str> = summary.iter().rev().map(|row| row.segment.label()).collect();

    let root = SVGBackend::new(output_path, (1200, 800)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 32))
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(180)
        .build_cartesian_2d(0u32..(max_count + max_count / 10 + 1), (0u32..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(summary.len())
        .y_label_formatter(&|value: &SegmentValue<u32>| match value {
            SegmentValue::CenterOf(idx) => labels
                .get(*idx as usize)
                .map(|label| label.to_string())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc("Number of Customers")
        .y_desc("Segment")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(summary.iter().rev().enumerate().map(|(idx, row)| {
        let idx = idx as u32;
        let color = SEGMENT_COLORS[idx as usize % SEGMENT_COLORS.len()];
        Rectangle::new(
            [
                (0, SegmentValue::Exact(idx)),
                (row.customer_count as u32, SegmentValue::Exact(idx + 1)),
            ],
            color.filled(),
        )
    }))?;

    root.present()?;
    println!("Segment chart saved to: {}", output_path);

    Ok(())
}

/// Print the segment summary table to console
pub fn print_segment_summary(summary: &[SegmentSummaryRow]) {
    let total: usize = summary.iter().map(|row| row.customer_count).sum();

    println!("\n=== Segment Summary ===");
    println!("  {:<20} | {:>9} | {:>6} | {:>12}", "Segment", "Customers", "Share", "Avg Monetary");
    println!("  {:-<20}-|-{:->9}-|-{:->6}-|-{:->12}", "", "", "", "");
    for row in summary {
        let share = if total == 0 {
            0.0
        } else {
            row.customer_count as f64 / total as f64 * 100.0
        };
        println!(
            "  {:<20} | {:>9} | {:>5.1}% | {:>12.1}",
            row.segment.label(),
            row.customer_count,
            share,
            row.avg_monetary
        );
    }
    println!("  Total customers: {}", total);
}

/// Print the first `limit` segmented rows
pub fn print_record_sample(records: &[SegmentedRecord], limit: usize) {
    println!("\nFirst {} customers:", limit.min(records.len()));
    println!(
        "  {:>10} | {:>7} | {:>9} | {:>10} | R | F | M | Segment",
        "CustomerID", "Recency", "Frequency", "Monetary"
    );
    for record in records.iter().take(limit) {
        let rfm = &record.scored.rfm;
        let scores = &record.scored.scores;
        println!(
            "  {:>10} | {:>7} | {:>9} | {:>10.2} | {} | {} | {} | {}",
            rfm.customer_id,
            rfm.recency,
            rfm.frequency,
            rfm.monetary,
            scores.recency,
            scores.frequency,
            scores.monetary,
            record.segment
        );
    }
}

/// Print everything known about one customer
pub fn print_customer_detail(record: &SegmentedRecord) {
    let rfm = &record.scored.rfm;
    let scores = &record.scored.scores;
    println!("\nCustomer {} details:", rfm.customer_id);
    println!("  Recency:   {} days (R score {})", rfm.recency, scores.recency);
    println!("  Frequency: {} invoices (F score {})", rfm.frequency, scores.frequency);
    println!("  Monetary:  {:.2} (M score {})", rfm.monetary, scores.monetary);
    println!("  Segment:   {}", record.segment);
}

/// Generate the chart and print the summary for a finished run
pub fn generate_segment_report(report: &SegmentationReport, output_path: &str) -> crate::Result<()> {
    create_segment_chart(&report.summary, output_path, None)?;
    print_segment_summary(&report.summary);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Segment;
    use std::path::Path;
    use tempfile::tempdir;

    fn create_test_summary() -> Vec<SegmentSummaryRow> {
        vec![
            SegmentSummaryRow {
                segment: Segment::Hibernating,
                customer_count: 12,
                avg_monetary: 310.4,
            },
            SegmentSummaryRow {
                segment: Segment::Champions,
                customer_count: 7,
                avg_monetary: 4210.9,
            },
            SegmentSummaryRow {
                segment: Segment::AtRisk,
                customer_count: 3,
                avg_monetary: 980.0,
            },
        ]
    }

    #[test]
    fn test_create_segment_chart() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("segments.svg");
        let output_str = output_path.to_str().unwrap();

        let result = create_segment_chart(&create_test_summary(), output_str, None);
        assert!(result.is_ok());
        assert!(Path::new(output_str).exists());
    }

    #[test]
    fn test_empty_summary_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let output_path = temp_dir.path().join("empty.svg");
        assert!(create_segment_chart(&[], output_path.to_str().unwrap(), None).is_err());
    }
}
