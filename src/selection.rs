use serde::Serialize;

use crate::error::DeriveError;
use crate::table::Table;

/// The three chart kinds the dashboard can render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Line,
    Violin,
    Bar,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [ChartKind::Line, ChartKind::Violin, ChartKind::Bar];

    /// Parse a kind as submitted by the chart-kind control.
    pub fn parse(s: &str) -> Result<Self, DeriveError> {
        match s {
            "line" => Ok(ChartKind::Line),
            "violin" => Ok(ChartKind::Violin),
            "bar" => Ok(ChartKind::Bar),
            other => Err(DeriveError::UnknownChartKind(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Violin => "violin",
            ChartKind::Bar => "bar",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Line => "Line",
            ChartKind::Violin => "Violin",
            ChartKind::Bar => "Bar",
        }
    }
}

/// One complete user selection.
///
/// Each control gesture commits a full new value for exactly one field;
/// the derivation function never sees partial state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub metrics: Vec<String>,
    pub entities: Vec<String>,
    pub kind: ChartKind,
}

impl Selection {
    pub fn new(metrics: Vec<String>, entities: Vec<String>, kind: ChartKind) -> Self {
        Self {
            metrics,
            entities,
            kind,
        }
    }

    /// Initial selection shown on first page load: the first metric
    /// against every country, as a line chart.
    pub fn default_for(table: &Table) -> Self {
        Self {
            metrics: table.metric_columns().iter().take(1).cloned().collect(),
            entities: table.distinct_entities(),
            kind: ChartKind::Line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_all_kinds() {
        for kind in ChartKind::ALL {
            assert_eq!(ChartKind::parse(kind.as_str()).unwrap(), kind);
        }
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = ChartKind::parse("scatter").unwrap_err();
        assert_eq!(err, DeriveError::UnknownChartKind("scatter".to_string()));
    }

    #[test]
    fn test_default_selection() {
        let table = Table::new(
            vec!["Rank".into(), "Country".into(), "X".into(), "Y".into()],
            vec![
                vec!["1".into(), "A".into(), "10".into(), "5".into()],
                vec!["2".into(), "B".into(), "20".into(), "8".into()],
            ],
        );
        let sel = Selection::default_for(&table);
        assert_eq!(sel.metrics, vec!["X".to_string()]);
        assert_eq!(sel.entities, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(sel.kind, ChartKind::Line);
    }

    #[test]
    fn test_default_selection_no_metrics() {
        let table = Table::new(vec!["Rank".into(), "Country".into()], vec![]);
        let sel = Selection::default_for(&table);
        assert!(sel.metrics.is_empty());
        assert!(sel.entities.is_empty());
    }
}
