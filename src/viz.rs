//! Cluster plots using Plotters

use crate::model::KMeansModel;
use crate::pipeline::Segmentation;
use plotters::prelude::*;
use std::path::{Path, PathBuf};

/// Color palette for clusters; labels past the end wrap around
const CLUSTER_COLORS: [RGBColor; 8] = [
    RED,
    BLUE,
    GREEN,
    MAGENTA,
    CYAN,
    RGBColor(255, 140, 0),
    RGBColor(128, 0, 128),
    RGBColor(110, 110, 110),
];

pub fn cluster_color(cluster: usize) -> RGBColor {
    CLUSTER_COLORS[cluster % CLUSTER_COLORS.len()]
}

/// Axis range covering `values` with `pad` on both sides
fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min.is_finite() && max.is_finite() {
        (min - pad, max + pad)
    } else {
        (-pad, pad)
    }
}

/// Path of the companion cluster-size chart: `plot.png` -> `plot_sizes.png`
pub fn sizes_chart_path(plot_path: &Path) -> PathBuf {
    let stem = plot_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "cluster_plot".to_string());
    plot_path.with_file_name(format!("{stem}_sizes.png"))
}

/// Scatter of standardized Frequency vs Monetary, colored by cluster
pub fn create_cluster_visualization(
    segmentation: &Segmentation,
    model: &KMeansModel,
    output_path: &Path,
) -> crate::Result<()> {
    let features = &segmentation.standardized;
    let frequency = features.column(1);
    let monetary = features.column(2);

    let (freq_min, freq_max) = padded_range(frequency.iter().copied(), 0.5);
    let (mon_min, mon_max) = padded_range(monetary.iter().copied(), 0.5);

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Customer Segments: Frequency vs Monetary", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(freq_min..freq_max, mon_min..mon_max)?;

    chart
        .configure_mesh()
        .x_desc("Frequency (standardized)")
        .y_desc("Monetary (standardized)")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(
        frequency
            .iter()
            .zip(monetary.iter())
            .zip(&model.labels)
            .map(|((&f, &m), &label)| Circle::new((f, m), 4, cluster_color(label).filled())),
    )?;

    for (cluster_id, centroid) in model.centroids.outer_iter().enumerate() {
        let (f, m) = (centroid[1], centroid[2]);
        let color = cluster_color(cluster_id);
        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(f - 0.1, m - 0.1), (f + 0.1, m + 0.1)],
                color.filled(),
            )))?
            .label(format!("Cluster {cluster_id}"))
            .legend(move |(x, y)| Rectangle::new([(x, y), (x + 10, y + 10)], color.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    tracing::info!(path = %output_path.display(), "cluster plot written");
    Ok(())
}

/// Bar chart of customers per cluster
pub fn create_cluster_size_chart(model: &KMeansModel, output_path: &Path) -> crate::Result<()> {
    let sizes = model.cluster_sizes();
    let max_size = sizes.iter().copied().max().unwrap_or(1) as f64;

    let root = BitMapBackend::new(output_path, (600, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Cluster Sizes", ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..(model.n_clusters as f64 - 0.5), 0f64..(max_size * 1.1))?;

    chart
        .configure_mesh()
        .x_desc("Cluster")
        .y_desc("Customers")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(sizes.iter().enumerate().map(|(cluster_id, &size)| {
        let x = cluster_id as f64;
        Rectangle::new(
            [(x - 0.4, 0.0), (x + 0.4, size as f64)],
            cluster_color(cluster_id).filled(),
        )
    }))?;

    root.present()?;
    tracing::info!(path = %output_path.display(), "cluster size chart written");
    Ok(())
}

/// Write the scatter plot and its companion size chart
pub fn generate_visualization_report(segmentation: &Segmentation, output_path: &Path) -> crate::Result<()> {
    let Some(model) = &segmentation.model else {
        tracing::warn!("nothing to plot for an empty segmentation");
        return Ok(());
    };
    create_cluster_visualization(segmentation, model, output_path)?;
    create_cluster_size_chart(model, &sizes_chart_path(output_path))?;
    Ok(())
}
