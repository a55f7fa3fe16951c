//! Command-line interface definitions and argument parsing

use crate::model::{InitMethod, KMeansParams, DEFAULT_MAX_ITERS, DEFAULT_SEED, DEFAULT_TOLERANCE};
use clap::Parser;
use std::path::PathBuf;

/// Customer segmentation CLI: RFM features clustered with seeded K-Means
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file
    #[arg(short, long, default_value = "data.csv")]
    pub input: PathBuf,

    /// Number of clusters for K-Means
    #[arg(short = 'k', long, default_value_t = 4)]
    pub clusters: usize,

    /// Random seed for centroid initialization
    #[arg(long, env = "RFMFORGE_SEED", default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Maximum iterations for K-Means algorithm
    #[arg(long, default_value_t = DEFAULT_MAX_ITERS)]
    pub max_iters: usize,

    /// Centroid-movement tolerance for K-Means convergence
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Centroid initialization: kmeans++ or random
    #[arg(long, default_value_t = InitMethod::KMeansPlusPlus)]
    pub init: InitMethod,

    /// Write a cluster scatter plot (PNG) to this path
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Prediction mode: provide R,F,M values as comma-separated string
    /// Example: --predict "30,10,500.0" for Recency=30, Frequency=10, Monetary=500.0
    #[arg(short, long)]
    pub predict: Option<String>,

    /// Print the result as JSON instead of tables
    #[arg(long)]
    pub json: bool,

    /// Rows of the segmented customer table to print
    #[arg(long, default_value_t = 5)]
    pub head: usize,

    /// Log filter (e.g. info, debug, rfmforge=trace)
    #[arg(long, env = "RFMFORGE_LOG")]
    pub log_level: Option<String>,

    /// Enable verbose output (debug logging)
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// K-Means parameters from the command line
    pub fn to_params(&self) -> KMeansParams {
        KMeansParams::new(self.clusters, self.seed)
            .max_iters(self.max_iters)
            .tolerance(self.tolerance)
            .init(self.init)
    }

    /// Effective log filter: explicit level, else debug when verbose, else info
    pub fn log_filter(&self) -> String {
        match (&self.log_level, self.verbose) {
            (Some(level), _) => level.clone(),
            (None, true) => "debug".to_string(),
            (None, false) => "info".to_string(),
        }
    }

    /// Parse RFM values from the predict string
    /// Expected format: "recency,frequency,monetary"
    pub fn parse_rfm_values(&self) -> crate::Result<Option<[f64; 3]>> {
        let Some(ref predict_str) = self.predict else {
            return Ok(None);
        };

        let parts: Vec<&str> = predict_str.split(',').collect();
        if parts.len() != 3 {
            anyhow::bail!("Predict values must be in format 'recency,frequency,monetary'");
        }

        let mut values = [0.0; 3];
        for (slot, (name, raw)) in values
            .iter_mut()
            .zip(["recency", "frequency", "monetary"].iter().zip(&parts))
        {
            *slot = raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid {} value: {}", name, raw))?;
        }

        if values[0] < 0.0 {
            anyhow::bail!("Recency must be non-negative");
        }
        if values[1] < 1.0 {
            anyhow::bail!("Frequency must be at least 1");
        }

        Ok(Some(values))
    }
}
