//! rfmforge: customer segmentation CLI
//!
//! Loads transactions, runs the RFM + K-Means pipeline and prints the
//! segmented customers and the cluster summary.

use anyhow::{Context, Result};
use clap::Parser;
use rfmforge::{load_transactions, logging, report, run_segmentation, viz, Args, Segmentation};
use std::time::Instant;

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init_logging(&args.log_filter())?;

    let rfm_values = args.parse_rfm_values()?;
    let params = args.to_params();

    let start_time = Instant::now();
    let rows = load_transactions(&args.input)
        .with_context(|| format!("failed to load transactions from {}", args.input.display()))?;
    let segmentation = run_segmentation(&rows, &params)?;
    tracing::debug!(elapsed_ms = start_time.elapsed().as_millis() as u64, "pipeline finished");

    if let Some(values) = rfm_values {
        return run_prediction_mode(&segmentation, values);
    }

    if args.json {
        let report = report::Report::new(&segmentation, &params)?;
        println!("{}", report.to_json()?);
    } else {
        print_tables(&args, &segmentation)?;
    }

    if let Some(ref output) = args.output {
        viz::generate_visualization_report(&segmentation, output)
            .with_context(|| format!("failed to write plots to {}", output.display()))?;
    }

    Ok(())
}

/// Report the cluster of a single customer given as raw R,F,M
fn run_prediction_mode(segmentation: &Segmentation, values: [f64; 3]) -> Result<()> {
    println!(
        "Input RFM values: R={}, F={}, M={}",
        values[0], values[1], values[2]
    );

    let (Some(cluster), Some(model)) = (segmentation.predict(&values)?, &segmentation.model) else {
        println!("No customers in input; nothing to predict against.");
        return Ok(());
    };

    let sizes = model.cluster_sizes();
    let share = sizes[cluster] as f64 / segmentation.rfm.len() as f64 * 100.0;
    println!("Predicted Cluster: {}", cluster);
    println!("  Size: {} customers ({:.1}% of total)", sizes[cluster], share);
    if let Some(summary) = segmentation.summaries.iter().find(|s| s.cluster == cluster) {
        println!(
            "  Averages: R={:.2}, F={:.2}, M={:.2}",
            summary.mean_recency, summary.mean_frequency, summary.mean_monetary
        );
    }
    Ok(())
}

fn print_tables(args: &Args, segmentation: &Segmentation) -> Result<()> {
    if segmentation.is_empty() {
        println!("No customers found in input; segmentation is empty.");
        return Ok(());
    }

    if let Some(snapshot) = segmentation.rfm.snapshot {
        println!("Snapshot date: {}", snapshot);
    }
    println!("Customers: {}\n", segmentation.rfm.len());

    println!("=== Segmented Customers ===");
    print!("{}", report::format_segments(&segmentation.customers()?, args.head));

    println!("\n=== Cluster Summary ===");
    print!("{}", report::format_summary(&segmentation.summaries));

    if let Some(model) = &segmentation.model {
        println!(
            "\nIterations: {}{}  Inertia: {:.4}",
            model.n_iter,
            if model.converged { "" } else { " (cap reached)" },
            model.inertia
        );
        if args.verbose {
            println!("\nCluster centroids (standardized):");
            print!("{}", report::format_centroids(segmentation));
        }
    }
    Ok(())
}
