use std::path::Path;

use coldash::chart::{Derived, Geometry};
use coldash::derive::derive_chart;
use coldash::render::{render_png, render_svg, RenderOptions};
use coldash::selection::{ChartKind, Selection};
use coldash::table::Table;

/// Load the dataset shipped at the repository root.
fn load_dataset() -> Table {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("Cost_of_Living_Index_by_Country_2024.csv");
    Table::load(&path).expect("Failed to load dataset")
}

/// Check if bytes are a valid PNG
fn is_valid_png(bytes: &[u8]) -> bool {
    bytes.len() > 8 && &bytes[0..8] == &[137, 80, 78, 71, 13, 10, 26, 10]
}

#[test]
fn test_dataset_shape() {
    let table = load_dataset();
    assert_eq!(table.headers()[0], "Rank");
    assert_eq!(table.headers()[1], "Country");
    assert_eq!(table.metric_columns().len(), table.headers().len() - 2);
    assert_eq!(table.distinct_entities().len(), table.rows().len());
}

#[test]
fn test_end_to_end_line_chart() {
    let table = load_dataset();
    let selection = Selection::new(
        vec!["Cost of Living Index".to_string(), "Rent Index".to_string()],
        vec!["Norway".to_string(), "Portugal".to_string(), "India".to_string()],
        ChartKind::Line,
    );

    let derived = derive_chart(&table, &selection).expect("derivation failed");
    let Derived::Chart(spec) = derived else {
        panic!("expected a chart");
    };
    let Geometry::Line { categories, series } = &spec.geometry else {
        panic!("expected line geometry");
    };

    // Filtered-row order follows the table, not the selection.
    assert_eq!(categories, &["Norway", "Portugal", "India"]);
    assert_eq!(series.len(), 2);
    for s in series {
        assert_eq!(s.values.len(), 3);
        assert!(s.values.iter().all(|v| v.is_some()));
    }

    let svg = render_svg(&spec, &RenderOptions::default()).expect("svg render failed");
    assert!(svg.contains("<svg"));
}

#[test]
fn test_end_to_end_bar_chart_png() {
    let table = load_dataset();
    let selection = Selection::new(
        vec!["Groceries Index".to_string(), "Restaurant Price Index".to_string()],
        vec!["Japan".to_string(), "Mexico".to_string()],
        ChartKind::Bar,
    );

    let derived = derive_chart(&table, &selection).expect("derivation failed");
    let Derived::Chart(spec) = derived else {
        panic!("expected a chart");
    };
    let png = render_png(&spec, &RenderOptions::default()).expect("png render failed");
    assert!(is_valid_png(&png), "Output is not a valid PNG");
}

#[test]
fn test_end_to_end_violin_chart() {
    let table = load_dataset();
    let selection = Selection::new(
        vec!["Cost of Living Index".to_string()],
        table.distinct_entities(),
        ChartKind::Violin,
    );

    let derived = derive_chart(&table, &selection).expect("derivation failed");
    let Derived::Chart(spec) = derived else {
        panic!("expected a chart");
    };
    let Geometry::Violin { distributions } = &spec.geometry else {
        panic!("expected violin geometry");
    };
    assert_eq!(distributions.len(), 1);
    assert_eq!(distributions[0].values.len(), table.rows().len());
    let summary = distributions[0].summary.as_ref().expect("expected a box overlay");
    assert!(summary.whisker_low <= summary.q1);
    assert!(summary.q1 <= summary.median);
    assert!(summary.median <= summary.q3);
    assert!(summary.q3 <= summary.whisker_high);

    let svg = render_svg(&spec, &RenderOptions::default()).expect("svg render failed");
    assert!(svg.contains("<svg"));
}

#[test]
fn test_end_to_end_empty_entities_sentinel() {
    let table = load_dataset();
    for kind in ChartKind::ALL {
        let selection = Selection::new(vec!["Rent Index".to_string()], vec![], kind);
        let derived = derive_chart(&table, &selection).expect("derivation failed");
        assert_eq!(derived, Derived::NoRender);
    }
}

#[test]
fn test_end_to_end_determinism() {
    let table = load_dataset();
    let selection = Selection::new(
        vec!["Rent Index".to_string(), "Groceries Index".to_string()],
        vec!["Iceland".to_string(), "Spain".to_string(), "Brazil".to_string()],
        ChartKind::Bar,
    );

    let first = derive_chart(&table, &selection).expect("derivation failed");
    let second = derive_chart(&table, &selection).expect("derivation failed");
    assert_eq!(first, second);

    let (Derived::Chart(a), Derived::Chart(b)) = (&first, &second) else {
        panic!("expected charts");
    };
    assert_eq!(
        serde_json::to_string(a).unwrap(),
        serde_json::to_string(b).unwrap()
    );
}

#[test]
fn test_end_to_end_unknown_entity_filters_to_nothing() {
    let table = load_dataset();
    let selection = Selection::new(
        vec!["Rent Index".to_string()],
        vec!["Atlantis".to_string()],
        ChartKind::Line,
    );
    let derived = derive_chart(&table, &selection).expect("derivation failed");
    let Derived::Chart(spec) = derived else {
        panic!("unknown entity must not be an error");
    };
    let Geometry::Line { categories, series } = spec.geometry else {
        panic!("expected line geometry");
    };
    assert!(categories.is_empty());
    assert!(series[0].values.is_empty());
}

#[test]
fn test_end_to_end_unknown_column_error() {
    let table = load_dataset();
    let selection = Selection::new(
        vec!["Happiness Index".to_string()],
        vec!["Norway".to_string()],
        ChartKind::Bar,
    );
    let err = derive_chart(&table, &selection).unwrap_err();
    assert_eq!(err.to_string(), "unknown metric column 'Happiness Index'");
}

#[test]
fn test_end_to_end_empty_metrics_axes_only() {
    let table = load_dataset();
    let selection = Selection::new(vec![], vec!["Norway".to_string()], ChartKind::Bar);
    let derived = derive_chart(&table, &selection).expect("derivation failed");
    let Derived::Chart(spec) = derived else {
        panic!("expected an axes-only chart");
    };
    let Geometry::Bar { series, .. } = &spec.geometry else {
        panic!("expected bar geometry");
    };
    assert!(series.is_empty());

    // Axes-only charts still render.
    let svg = render_svg(&spec, &RenderOptions::default()).expect("svg render failed");
    assert!(svg.contains("<svg"));
}
