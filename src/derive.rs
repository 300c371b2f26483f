use std::collections::HashSet;

use tracing::debug;

use crate::chart::{BoxSummary, ChartSpec, Derived, Distribution, Geometry, Series};
use crate::error::DeriveError;
use crate::selection::{ChartKind, Selection};
use crate::table::Table;

/// Resolution of the violin density curve.
const KDE_GRID_POINTS: usize = 128;

/// Derive a chart specification from the current selection.
///
/// Pure and deterministic: identical (table, selection) inputs always
/// produce a structurally identical result. An empty entity selection is
/// the no-render sentinel, checked before anything else; a metric name
/// outside the table's column set is a wiring error.
pub fn derive_chart(table: &Table, selection: &Selection) -> Result<Derived, DeriveError> {
    if selection.entities.is_empty() {
        return Ok(Derived::NoRender);
    }

    // The metric selection is a set: a name repeated in the submitted
    // query contributes one series, first-seen order kept.
    let mut metrics: Vec<String> = Vec::new();
    for metric in &selection.metrics {
        if !table.has_column(metric) {
            return Err(DeriveError::UnknownColumn(metric.clone()));
        }
        if !metrics.iter().any(|m| m == metric) {
            metrics.push(metric.clone());
        }
    }

    // Filter to the selected entities, preserving source row order.
    // Duplicate identifiers keep duplicate positions; an identifier absent
    // from the table simply matches nothing.
    let wanted: HashSet<&str> = selection.entities.iter().map(|e| e.as_str()).collect();
    let rows: Vec<&Vec<String>> = table
        .rows()
        .iter()
        .filter(|row| table.entity_of(row).is_some_and(|e| wanted.contains(e)))
        .collect();

    let geometry = match selection.kind {
        ChartKind::Line => Geometry::Line {
            categories: categories_of(table, &rows),
            series: build_series(table, &rows, &metrics),
        },
        ChartKind::Bar => Geometry::Bar {
            categories: categories_of(table, &rows),
            series: build_series(table, &rows, &metrics),
        },
        ChartKind::Violin => Geometry::Violin {
            distributions: build_distributions(table, &rows, &metrics),
        },
    };

    Ok(Derived::Chart(ChartSpec {
        title: title_for(&metrics, selection.kind),
        x_label: x_label_for(table, selection.kind),
        y_label: "Index value".to_string(),
        geometry,
    }))
}

fn title_for(metrics: &[String], kind: ChartKind) -> String {
    match metrics.len() {
        0 => format!("{} chart", kind.label()),
        1 => metrics[0].clone(),
        n => format!("{} metrics ({})", n, kind.label().to_lowercase()),
    }
}

fn x_label_for(table: &Table, kind: ChartKind) -> String {
    match kind {
        // Violins sit one per metric, not one per country.
        ChartKind::Violin => "Metric".to_string(),
        _ => table
            .headers()
            .get(crate::table::ENTITY_COLUMN)
            .cloned()
            .unwrap_or_else(|| "Entity".to_string()),
    }
}

/// Entity identifier of each filtered row, in row order.
fn categories_of(table: &Table, rows: &[&Vec<String>]) -> Vec<String> {
    rows.iter()
        .map(|row| table.entity_of(row).unwrap_or("").to_string())
        .collect()
}

/// One series per metric, values aligned with the filtered rows.
fn build_series(table: &Table, rows: &[&Vec<String>], metrics: &[String]) -> Vec<Series> {
    metrics
        .iter()
        .map(|metric| {
            // Validated against the header set by the caller.
            let idx = table
                .column_index(metric)
                .unwrap_or_else(|| unreachable!("metric '{metric}' validated before build"));
            let values = rows.iter().map(|row| parse_cell(row, idx, metric)).collect();
            Series {
                metric: metric.clone(),
                values,
            }
        })
        .collect()
}

/// One pooled distribution per metric: entities only restrict which rows
/// feed the distribution, they never split it.
fn build_distributions(
    table: &Table,
    rows: &[&Vec<String>],
    metrics: &[String],
) -> Vec<Distribution> {
    metrics
        .iter()
        .map(|metric| {
            let idx = table
                .column_index(metric)
                .unwrap_or_else(|| unreachable!("metric '{metric}' validated before build"));
            let values: Vec<f64> = rows
                .iter()
                .filter_map(|row| parse_cell(row, idx, metric))
                .collect();

            let mut sorted = values.clone();
            sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let summary = box_summary(&sorted);
            let density = if sorted.is_empty() {
                Vec::new()
            } else {
                compute_kde(&sorted, silverman_bandwidth(&sorted))
            };

            Distribution {
                metric: metric.clone(),
                values,
                density,
                summary,
            }
        })
        .collect()
}

fn parse_cell(row: &[String], idx: usize, metric: &str) -> Option<f64> {
    let cell = row.get(idx)?;
    match cell.parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            debug!(metric, cell = %cell, "skipping non-numeric cell");
            None
        }
    }
}

/// Quartiles, median, and 1.5*IQR whiskers over sorted values.
fn box_summary(sorted: &[f64]) -> Option<BoxSummary> {
    if sorted.is_empty() {
        return None;
    }

    let q1 = percentile(sorted, 0.25);
    let median = percentile(sorted, 0.50);
    let q3 = percentile(sorted, 0.75);
    let iqr = q3 - q1;

    let lower_fence = q1 - 1.5 * iqr;
    let upper_fence = q3 + 1.5 * iqr;

    // Whiskers reach the outermost data points inside the fences.
    let whisker_low = sorted
        .iter()
        .copied()
        .find(|&v| v >= lower_fence)
        .unwrap_or(q1);
    let whisker_high = sorted
        .iter()
        .rev()
        .copied()
        .find(|&v| v <= upper_fence)
        .unwrap_or(q3);

    Some(BoxSummary {
        whisker_low,
        q1,
        median,
        q3,
        whisker_high,
    })
}

/// Linear-interpolated percentile over sorted data.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }

    let rank = p * (n - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let weight = rank - lower as f64;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}

/// Silverman's rule of thumb for KDE bandwidth selection.
fn silverman_bandwidth(sorted: &[f64]) -> f64 {
    let n = sorted.len() as f64;
    if n < 2.0 {
        return 1.0;
    }

    let mean = sorted.iter().sum::<f64>() / n;
    let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();

    let iqr = percentile(sorted, 0.75) - percentile(sorted, 0.25);
    let scale = if iqr > 0.0 {
        std_dev.min(iqr / 1.34)
    } else {
        std_dev
    };
    if scale <= 0.0 {
        return 1.0;
    }
    0.9 * scale * n.powf(-0.2)
}

fn gaussian_kernel(u: f64) -> f64 {
    const SQRT_2PI: f64 = 2.5066282746310002;
    (-0.5 * u * u).exp() / SQRT_2PI
}

/// Gaussian KDE sampled on a fixed grid, density normalized to 0..=1.
fn compute_kde(sorted: &[f64], bandwidth: f64) -> Vec<(f64, f64)> {
    let n = sorted.len() as f64;
    if sorted.is_empty() {
        return Vec::new();
    }

    let min_y = sorted[0];
    let max_y = sorted[sorted.len() - 1];

    // Extend the grid past the data range so the curve tapers off.
    let extend = 3.0 * bandwidth;
    let y_start = min_y - extend;
    let y_end = max_y + extend;

    let range = y_end - y_start;
    if range <= 0.0 {
        return vec![(min_y, 1.0)];
    }

    let step = range / (KDE_GRID_POINTS - 1) as f64;
    let mut samples = Vec::with_capacity(KDE_GRID_POINTS);
    for i in 0..KDE_GRID_POINTS {
        let y = y_start + i as f64 * step;
        let mut d = 0.0;
        for &v in sorted {
            d += gaussian_kernel((y - v) / bandwidth);
        }
        samples.push((y, d / (n * bandwidth)));
    }

    let max_density = samples.iter().fold(0.0f64, |a, &(_, d)| a.max(d));
    if max_density > 0.0 {
        for (_, d) in &mut samples {
            *d /= max_density;
        }
    }

    samples
}
