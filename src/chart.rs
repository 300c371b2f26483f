use serde::Serialize;

use crate::selection::ChartKind;

/// Outcome of a derivation: either a chart to draw, or the explicit
/// "nothing selected" state. `NoRender` is a normal result (the user
/// cleared the country selector), distinct from every error kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Derived {
    Chart(ChartSpec),
    NoRender,
}

/// Backend-agnostic chart description: axes, title, and a kind-tagged
/// geometry. Rebuilt from scratch on every selection change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Geometry {
    /// One line per metric over a shared categorical x axis.
    Line {
        categories: Vec<String>,
        series: Vec<Series>,
    },
    /// One bar series per metric, dodged within each category slot.
    Bar {
        categories: Vec<String>,
        series: Vec<Series>,
    },
    /// One pooled distribution per metric.
    Violin { distributions: Vec<Distribution> },
}

impl Geometry {
    pub fn kind(&self) -> ChartKind {
        match self {
            Geometry::Line { .. } => ChartKind::Line,
            Geometry::Bar { .. } => ChartKind::Bar,
            Geometry::Violin { .. } => ChartKind::Violin,
        }
    }
}

/// One named series. `values` aligns index-for-index with the geometry's
/// `categories`; a `None` marks a cell that did not parse as a number.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub metric: String,
    pub values: Vec<Option<f64>>,
}

impl Series {
    /// (category, value) pairs for the points that have a numeric value.
    pub fn points<'a>(&'a self, categories: &'a [String]) -> impl Iterator<Item = (&'a str, f64)> {
        categories
            .iter()
            .zip(&self.values)
            .filter_map(|(c, v)| v.map(|v| (c.as_str(), v)))
    }
}

/// Distribution of one metric over the pooled filtered rows, with the
/// density curve and box overlay pre-computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub metric: String,
    /// Pooled numeric values, filtered-row order.
    pub values: Vec<f64>,
    /// (y, density) samples with density normalized to 0..=1.
    pub density: Vec<(f64, f64)>,
    /// Box overlay; absent when the distribution is empty.
    pub summary: Option<BoxSummary>,
}

/// Quartiles, median, and 1.5*IQR whiskers for the box overlay.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoxSummary {
    pub whisker_low: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_high: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_points_skip_missing() {
        let categories = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let series = Series {
            metric: "X".to_string(),
            values: vec![Some(1.0), None, Some(3.0)],
        };
        let points: Vec<_> = series.points(&categories).collect();
        assert_eq!(points, vec![("A", 1.0), ("C", 3.0)]);
    }

    #[test]
    fn test_no_render_serializes_distinctly() {
        let json = serde_json::to_value(&Derived::NoRender).unwrap();
        assert_eq!(json["result"], "no_render");

        let chart = Derived::Chart(ChartSpec {
            title: "t".to_string(),
            x_label: "x".to_string(),
            y_label: "y".to_string(),
            geometry: Geometry::Line {
                categories: vec![],
                series: vec![],
            },
        });
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["result"], "chart");
        assert_eq!(json["geometry"]["kind"], "line");
    }
}
