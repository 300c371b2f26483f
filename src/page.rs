use std::fmt::Write;

use crate::selection::{ChartKind, Selection};
use crate::table::Table;

const PAGE_TITLE: &str = "Cost of Living Index by Country 2024";

const DESCRIPTION: &str = "Pick one or more index columns and countries, choose a chart kind, \
and apply. The table below shows the full dataset; indices are relative to New York City (100).";

const STYLE: &str = r#"
body { font-family: sans-serif; margin: 2rem auto; max-width: 72rem; color: #222; }
h1 { text-align: center; }
p.description { color: #555; }
form.controls { display: flex; gap: 2rem; align-items: flex-start; margin: 1.5rem 0; }
form.controls fieldset { border: 1px solid #ccc; border-radius: 4px; }
form.controls select { min-width: 16rem; }
.chart { text-align: center; margin: 1.5rem 0; }
.placeholder { color: #888; font-style: italic; padding: 3rem 0; }
table.data { border-collapse: collapse; width: 100%; }
table.data th, table.data td { border: 1px solid #ddd; padding: 0.3rem 0.6rem; text-align: right; }
table.data th { background: #f4f4f4; }
table.data td:nth-child(2), table.data th { text-align: left; }
table.data th { cursor: pointer; }
input.filter { margin: 0.5rem 0; padding: 0.3rem; width: 20rem; }
"#;

// Client-side niceties for the data table; no server round trip involved.
const SCRIPT: &str = r#"
function filterTable(value) {
  const needle = value.toLowerCase();
  for (const row of document.querySelectorAll('table.data tbody tr')) {
    row.style.display = row.textContent.toLowerCase().includes(needle) ? '' : 'none';
  }
}
const sortState = { column: -1, ascending: true };
function sortTable(column) {
  const body = document.querySelector('table.data tbody');
  const rows = Array.from(body.rows);
  sortState.ascending = sortState.column === column ? !sortState.ascending : true;
  sortState.column = column;
  rows.sort((a, b) => {
    const x = a.cells[column].textContent, y = b.cells[column].textContent;
    const nx = parseFloat(x), ny = parseFloat(y);
    const cmp = (isNaN(nx) || isNaN(ny)) ? x.localeCompare(y) : nx - ny;
    return sortState.ascending ? cmp : -cmp;
  });
  rows.forEach(r => body.appendChild(r));
}
"#;

/// Render the full dashboard page for the current selection.
///
/// `chart_svg` is the rendered chart for that selection, or `None` for the
/// no-render state (nothing selected).
pub fn dashboard_page(table: &Table, selection: &Selection, chart_svg: Option<&str>) -> String {
    let mut html = String::with_capacity(16 * 1024);

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = write!(html, "<title>{}</title>\n", escape(PAGE_TITLE));
    let _ = write!(html, "<style>{STYLE}</style>\n");
    let _ = write!(html, "<script>{SCRIPT}</script>\n");
    html.push_str("</head>\n<body>\n");

    let _ = write!(html, "<h1>{}</h1>\n", escape(PAGE_TITLE));
    let _ = write!(html, "<p class=\"description\">{}</p>\n", escape(DESCRIPTION));

    push_controls(&mut html, table, selection);
    push_chart(&mut html, chart_svg);
    push_data_table(&mut html, table);

    html.push_str("</body>\n</html>\n");
    html
}

fn push_controls(html: &mut String, table: &Table, selection: &Selection) {
    html.push_str("<form class=\"controls\" method=\"get\" action=\"/\">\n");

    html.push_str("<fieldset><legend>Metrics</legend>\n");
    let _ = write!(
        html,
        "<select name=\"metric\" multiple size=\"{}\">\n",
        table.metric_columns().len().clamp(3, 8)
    );
    for metric in table.metric_columns() {
        push_option(html, metric, selection.metrics.iter().any(|m| m == metric));
    }
    html.push_str("</select>\n</fieldset>\n");

    html.push_str("<fieldset><legend>Countries</legend>\n");
    html.push_str("<select name=\"country\" multiple size=\"8\">\n");
    for entity in table.distinct_entities() {
        push_option(html, &entity, selection.entities.iter().any(|e| *e == entity));
    }
    html.push_str("</select>\n</fieldset>\n");

    html.push_str("<fieldset><legend>Chart kind</legend>\n");
    for kind in ChartKind::ALL {
        let checked = if kind == selection.kind { " checked" } else { "" };
        let _ = write!(
            html,
            "<label><input type=\"radio\" name=\"kind\" value=\"{}\"{}> {}</label><br>\n",
            kind.as_str(),
            checked,
            kind.label()
        );
    }
    html.push_str("</fieldset>\n");

    html.push_str("<button type=\"submit\">Apply</button>\n</form>\n");
}

fn push_option(html: &mut String, value: &str, selected: bool) {
    let _ = write!(
        html,
        "<option value=\"{}\"{}>{}</option>\n",
        escape(value),
        if selected { " selected" } else { "" },
        escape(value)
    );
}

fn push_chart(html: &mut String, chart_svg: Option<&str>) {
    html.push_str("<div class=\"chart\">\n");
    match chart_svg {
        // The SVG comes from our own renderer, not user input.
        Some(svg) => html.push_str(svg),
        None => html.push_str(
            "<p class=\"placeholder\">Select at least one country to draw a chart.</p>\n",
        ),
    }
    html.push_str("</div>\n");
}

fn push_data_table(html: &mut String, table: &Table) {
    html.push_str(
        "<input class=\"filter\" type=\"search\" placeholder=\"Filter rows\" \
         oninput=\"filterTable(this.value)\">\n",
    );
    html.push_str("<table class=\"data\">\n<thead><tr>");
    for (idx, header) in table.headers().iter().enumerate() {
        let _ = write!(
            html,
            "<th onclick=\"sortTable({})\">{}</th>",
            idx,
            escape(header)
        );
    }
    html.push_str("</tr></thead>\n<tbody>\n");
    for row in table.rows() {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", escape(cell));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("</tbody>\n</table>\n");
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
