use anyhow::{Context, Result};
use image::ImageEncoder;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::chart::{ChartSpec, Distribution, Geometry, Series};

/// Canvas dimensions for a rendered chart.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 900,
            height: 520,
        }
    }
}

// d3's category10, the palette the original dashboard's charts default to.
const CATEGORY10: [RGBColor; 10] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
];

fn series_color(index: usize) -> RGBColor {
    CATEGORY10[index % CATEGORY10.len()]
}

/// Render a chart specification to an SVG document.
pub fn render_svg(spec: &ChartSpec, options: &RenderOptions) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        draw(&root, spec)?;
        root.present().context("Failed to present drawing")?;
    }
    Ok(svg)
}

/// Render a chart specification to PNG bytes.
pub fn render_png(spec: &ChartSpec, options: &RenderOptions) -> Result<Vec<u8>> {
    let mut buffer = vec![0u8; (options.width * options.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (options.width, options.height))
            .into_drawing_area();
        draw(&root, spec)?;
        root.present().context("Failed to present drawing")?;
    }

    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder
        .write_image(
            &buffer,
            options.width,
            options.height,
            image::ColorType::Rgb8,
        )
        .context("Failed to encode PNG")?;

    Ok(png_bytes)
}

fn draw<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, spec: &ChartSpec) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).context("Failed to fill background")?;

    match &spec.geometry {
        Geometry::Line { categories, series } => {
            draw_line(root, spec, categories, series)?;
        }
        Geometry::Bar { categories, series } => {
            draw_bar(root, spec, categories, series)?;
        }
        Geometry::Violin { distributions } => {
            draw_violin(root, spec, distributions)?;
        }
    }

    Ok(())
}

type CategoricalChart<'a, DB> = ChartContext<'a, DB, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Build the shared categorical-x chart: labels sit under integer slots and
/// data is drawn at slot centers (index + 0.5), the same scheme for all
/// three kinds.
fn build_chart<'a, DB: DrawingBackend>(
    root: &'a DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    categories: &[String],
    y_values: impl Iterator<Item = f64>,
    include_zero: bool,
) -> Result<CategoricalChart<'a, DB>>
where
    DB::ErrorType: 'static,
{
    let num_slots = categories.len().max(1);
    let x_range = 0.0..(num_slots as f64);
    let y_range = padded_range(y_values, include_zero);

    let mut chart = ChartBuilder::on(root)
        .margin(12)
        .caption(&spec.title, ("sans-serif", 22))
        .x_label_area_size(70)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .context("Failed to build chart")?;

    // Enough tick positions for every half-slot, so the formatter sees
    // each slot center and can label it exactly once.
    let categories = categories.to_vec();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(2 * num_slots + 1)
        .x_label_formatter(&move |x| slot_label(&categories, *x))
        .x_desc(spec.x_label.clone())
        .y_desc(spec.y_label.clone())
        .draw()
        .context("Failed to draw mesh")?;

    Ok(chart)
}

/// Label for an x tick: the category whose slot center the tick lands on,
/// empty for slot edges and out-of-range positions.
fn slot_label(categories: &[String], x: f64) -> String {
    let slot = (x - 0.5).round();
    if slot < 0.0 || (x - 0.5 - slot).abs() > 0.25 {
        return String::new();
    }
    categories.get(slot as usize).cloned().unwrap_or_default()
}

/// Y range over the data with 5% padding; a degenerate or empty range
/// falls back to unit padding.
fn padded_range(values: impl Iterator<Item = f64>, include_zero: bool) -> std::ops::Range<f64> {
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for v in values {
        y_min = y_min.min(v);
        y_max = y_max.max(v);
    }
    if include_zero {
        y_min = y_min.min(0.0);
        y_max = y_max.max(0.0);
    }

    if !y_min.is_finite() || !y_max.is_finite() {
        return 0.0..1.0;
    }
    if y_min == y_max {
        return (y_min - 1.0)..(y_max + 1.0);
    }
    let padding = (y_max - y_min) * 0.05;
    (y_min - padding)..(y_max + padding)
}

fn draw_line<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    categories: &[String],
    series: &[Series],
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let all_values = series.iter().flat_map(|s| s.values.iter().flatten().copied());
    let mut chart = build_chart(root, spec, categories, all_values, false)?;

    for (idx, s) in series.iter().enumerate() {
        let color = series_color(idx);
        let points: Vec<(f64, f64)> = s
            .values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i as f64 + 0.5, v)))
            .collect();

        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))
            .context("Failed to draw line series")?
            .label(s.metric.clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2))
            });
    }

    if !series.is_empty() {
        draw_legend(&mut chart)?;
    }

    Ok(())
}

fn draw_bar<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    categories: &[String],
    series: &[Series],
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let all_values = series.iter().flat_map(|s| s.values.iter().flatten().copied());
    let mut chart = build_chart(root, spec, categories, all_values, true)?;

    // Dodged bars: each metric gets an equal share of the 0.8-wide slot.
    let num_series = series.len().max(1);
    let bar_width = 0.8 / num_series as f64;

    for (series_idx, s) in series.iter().enumerate() {
        let color = series_color(series_idx);
        let x_offset = (series_idx as f64 - (num_series as f64 - 1.0) / 2.0) * bar_width;

        let bars: Vec<Rectangle<(f64, f64)>> = s
            .values
            .iter()
            .enumerate()
            .filter_map(|(cat_idx, v)| {
                v.map(|y_val| {
                    let x_center = cat_idx as f64 + 0.5 + x_offset;
                    Rectangle::new(
                        [
                            (x_center - bar_width / 2.0, 0.0),
                            (x_center + bar_width / 2.0, y_val),
                        ],
                        color.filled(),
                    )
                })
            })
            .collect();

        chart
            .draw_series(bars)
            .context("Failed to draw bar series")?
            .label(s.metric.clone())
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
            });
    }

    if !series.is_empty() {
        draw_legend(&mut chart)?;
    }

    Ok(())
}

fn draw_violin<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    spec: &ChartSpec,
    distributions: &[Distribution],
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    // One slot per metric; the y range must cover the density grid, which
    // extends past the raw data.
    let metric_names: Vec<String> = distributions.iter().map(|d| d.metric.clone()).collect();
    let all_values = distributions
        .iter()
        .flat_map(|d| d.density.iter().map(|&(y, _)| y).chain(d.values.iter().copied()));
    let mut chart = build_chart(root, spec, &metric_names, all_values, false)?;

    const MAX_HALF_WIDTH: f64 = 0.4;

    for (idx, dist) in distributions.iter().enumerate() {
        if dist.density.is_empty() {
            continue;
        }
        let color = series_color(idx);
        let center = idx as f64 + 0.5;

        // Mirror the density curve around the slot center.
        let mut outline: Vec<(f64, f64)> = dist
            .density
            .iter()
            .map(|&(y, d)| (center - d * MAX_HALF_WIDTH, y))
            .collect();
        outline.extend(
            dist.density
                .iter()
                .rev()
                .map(|&(y, d)| (center + d * MAX_HALF_WIDTH, y)),
        );

        chart
            .draw_series(std::iter::once(Polygon::new(outline, color.mix(0.55).filled())))
            .context("Failed to draw violin body")?;

        if let Some(summary) = &dist.summary {
            draw_box_overlay(&mut chart, center, summary)?;
        }
    }

    Ok(())
}

/// The quartile box, median tick, and whisker stems drawn over a violin.
fn draw_box_overlay<DB: DrawingBackend>(
    chart: &mut CategoricalChart<'_, DB>,
    center: f64,
    summary: &crate::chart::BoxSummary,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    const BOX_HALF_WIDTH: f64 = 0.06;

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![(center, summary.whisker_low), (center, summary.whisker_high)],
            BLACK.stroke_width(1),
        )))
        .context("Failed to draw whiskers")?;

    chart
        .draw_series(std::iter::once(Rectangle::new(
            [
                (center - BOX_HALF_WIDTH, summary.q1),
                (center + BOX_HALF_WIDTH, summary.q3),
            ],
            BLACK.mix(0.75).filled(),
        )))
        .context("Failed to draw quartile box")?;

    chart
        .draw_series(std::iter::once(PathElement::new(
            vec![
                (center - BOX_HALF_WIDTH, summary.median),
                (center + BOX_HALF_WIDTH, summary.median),
            ],
            WHITE.stroke_width(2),
        )))
        .context("Failed to draw median")?;

    Ok(())
}

fn draw_legend<'a, DB: DrawingBackend + 'a>(chart: &mut CategoricalChart<'a, DB>) -> Result<()>
where
    DB::ErrorType: 'static,
{
    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85).filled())
        .border_style(BLACK.mix(0.4).stroke_width(1))
        .position(SeriesLabelPosition::UpperRight)
        .draw()
        .context("Failed to draw legend")?;
    Ok(())
}
