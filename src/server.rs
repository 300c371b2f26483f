use anyhow::{anyhow, Context, Result};
use tiny_http::{Header, Method, Response, ResponseBox, Server};
use tracing::{debug, info, warn};

use crate::chart::Derived;
use crate::derive::derive_chart;
use crate::page::dashboard_page;
use crate::render::{render_png, render_svg, RenderOptions};
use crate::selection::{ChartKind, Selection};
use crate::table::Table;

/// The interactive session server.
///
/// Owns the read-only table handle and serves one request at a time:
/// every selection change is a single GET, derived and rendered to
/// completion before the next request is accepted, so recomputations for
/// a session never overlap.
pub struct Dashboard {
    table: Table,
}

impl Dashboard {
    pub fn new(table: Table) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Bind the address and run the request loop. Blocks forever.
    pub fn serve(&self, addr: &str) -> Result<()> {
        let server = Server::http(addr).map_err(|e| anyhow!("failed to bind {addr}: {e}"))?;
        info!(addr, "dashboard listening");

        for request in server.incoming_requests() {
            debug!(method = %request.method(), url = request.url(), "request");
            let response = match self.route(request.method(), request.url()) {
                Ok(response) => response,
                Err(e) => {
                    warn!(error = %e, "request failed");
                    Response::from_string("internal error")
                        .with_status_code(500)
                        .boxed()
                }
            };
            if let Err(e) = request.respond(response) {
                warn!(error = %e, "failed to send response");
            }
        }

        Ok(())
    }

    /// Dispatch one request. Split out from the listen loop so it can be
    /// exercised without a socket.
    pub fn route(&self, method: &Method, url: &str) -> Result<ResponseBox> {
        if *method != Method::Get {
            return Ok(Response::from_string("method not allowed")
                .with_status_code(405)
                .boxed());
        }

        let (path, query) = match url.split_once('?') {
            Some((path, query)) => (path, query),
            None => (url, ""),
        };

        match path {
            "/" => self.page_response(query),
            "/chart.svg" => self.chart_svg_response(query),
            "/chart.png" => self.chart_png_response(query),
            "/chart.json" => self.chart_json_response(query),
            _ => Ok(Response::from_string("not found")
                .with_status_code(404)
                .boxed()),
        }
    }

    fn page_response(&self, query: &str) -> Result<ResponseBox> {
        let selection = self.selection_from(query);
        let chart_svg = match self.derive_logged(&selection) {
            Some(Derived::Chart(spec)) => Some(render_svg(&spec, &render_options(query))?),
            _ => None,
        };
        let html = dashboard_page(&self.table, &selection, chart_svg.as_deref());
        Ok(Response::from_string(html)
            .with_header(header("Content-Type", "text/html; charset=utf-8")?)
            .boxed())
    }

    fn chart_svg_response(&self, query: &str) -> Result<ResponseBox> {
        let selection = self.selection_from(query);
        match self.derive_logged(&selection) {
            Some(Derived::Chart(spec)) => {
                let svg = render_svg(&spec, &render_options(query))?;
                Ok(Response::from_string(svg)
                    .with_header(header("Content-Type", "image/svg+xml")?)
                    .boxed())
            }
            _ => Ok(Response::empty(204).boxed()),
        }
    }

    fn chart_png_response(&self, query: &str) -> Result<ResponseBox> {
        let selection = self.selection_from(query);
        match self.derive_logged(&selection) {
            Some(Derived::Chart(spec)) => {
                let png = render_png(&spec, &render_options(query))?;
                Ok(Response::from_data(png)
                    .with_header(header("Content-Type", "image/png")?)
                    .boxed())
            }
            _ => Ok(Response::empty(204).boxed()),
        }
    }

    fn chart_json_response(&self, query: &str) -> Result<ResponseBox> {
        let selection = self.selection_from(query);
        let derived = self.derive_logged(&selection).unwrap_or(Derived::NoRender);
        let json = serde_json::to_string(&derived).context("Failed to serialize chart")?;
        Ok(Response::from_string(json)
            .with_header(header("Content-Type", "application/json")?)
            .boxed())
    }

    /// Selection for a request: the configured default on a bare URL,
    /// otherwise exactly what the controls submitted. An unknown chart
    /// kind falls back to the default kind after a logged diagnostic.
    fn selection_from(&self, query: &str) -> Selection {
        if query.is_empty() {
            return Selection::default_for(&self.table);
        }

        let mut metrics = Vec::new();
        let mut entities = Vec::new();
        let mut kind = ChartKind::Line;

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "metric" => metrics.push(value.into_owned()),
                "country" => entities.push(value.into_owned()),
                "kind" => match ChartKind::parse(&value) {
                    Ok(parsed) => kind = parsed,
                    Err(e) => warn!(error = %e, "ignoring unknown chart kind"),
                },
                _ => {}
            }
        }

        Selection::new(metrics, entities, kind)
    }

    /// Run the derivation, degrading wiring errors to "no render" with a
    /// logged diagnostic. The empty-selection sentinel comes through as a
    /// normal `Derived::NoRender` value, not through this error path.
    fn derive_logged(&self, selection: &Selection) -> Option<Derived> {
        match derive_chart(&self.table, selection) {
            Ok(derived) => Some(derived),
            Err(e) => {
                warn!(error = %e, "derivation rejected selection");
                None
            }
        }
    }
}

fn render_options(query: &str) -> RenderOptions {
    let mut options = RenderOptions::default();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            "width" => {
                if let Ok(w) = value.parse::<u32>() {
                    options.width = w.clamp(200, 4000);
                }
            }
            "height" => {
                if let Ok(h) = value.parse::<u32>() {
                    options.height = h.clamp(150, 4000);
                }
            }
            _ => {}
        }
    }
    options
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes())
        .map_err(|_| anyhow!("invalid header {name}: {value}"))
}
