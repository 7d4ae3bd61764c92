//! The single HTML page: input form, status message, map and results table.

use quick_xml::escape::escape;
use std::fmt::Write;

use crate::config::MapSettings;
use crate::error::NewsMapError;
use crate::filter::CONFIDENCE_THRESHOLD;
use crate::models::MapReport;
use crate::outputs::map::render_map;

const LEAFLET_CSS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
const LEAFLET_JS: &str = "https://unpkg.com/leaflet@1.9.4/dist/leaflet.js";

const STYLE: &str = r#"
  body { font-family: system-ui, sans-serif; margin: 0 auto; max-width: 1200px; padding: 1rem 2rem; color: #1f2933; }
  label { display: block; font-weight: 600; margin-top: 1rem; }
  input[type=url], textarea { width: 100%; box-sizing: border-box; padding: .5rem; font: inherit; }
  textarea { min-height: 10rem; }
  button { margin-top: 1rem; padding: .6rem 1.4rem; font: inherit; cursor: pointer; }
  .notice { padding: .75rem 1rem; border-radius: 6px; margin: 1rem 0; }
  .error { background: #fde8e8; color: #9b1c1c; }
  .warning { background: #fdf6b2; color: #723b13; }
  .summary { color: #52606d; }
  .newsmap-map { width: 100%; border-radius: 6px; margin: 1rem 0; }
  table { border-collapse: collapse; width: 100%; margin-bottom: 2rem; }
  th, td { text-align: left; padding: .4rem .6rem; border-bottom: 1px solid #e4e7eb; vertical-align: top; }
"#;

/// What the results area should show.
#[derive(Debug)]
pub enum Outcome<'a> {
    /// Nothing submitted yet.
    Blank,
    Report(&'a MapReport),
    Error(&'a NewsMapError),
}

/// Form values echoed back into the inputs.
#[derive(Debug, Default)]
pub struct FormValues<'a> {
    pub url: &'a str,
    pub text: &'a str,
}

/// Render the full page.
pub fn render_page(form: &FormValues, outcome: &Outcome, settings: &MapSettings) -> String {
    let mut html = String::new();

    writeln!(
        html,
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>NewsMap - News Article Location Mapper</title>
<link rel="stylesheet" href="{LEAFLET_CSS}">
<script src="{LEAFLET_JS}"></script>
<style>{STYLE}</style>
</head>
<body>
<h1>NewsMap - News Article Location Mapper</h1>
<form method="post" action="/">
  <label for="url">Paste a news article URL:</label>
  <input type="url" id="url" name="url" value="{url}">
  <label for="text">Or paste article text here:</label>
  <textarea id="text" name="text">{text}</textarea>
  <button type="submit">Extract &amp; Map Locations</button>
</form>"#,
        url = escape(form.url),
        text = escape(form.text),
    )
    .unwrap();

    match outcome {
        Outcome::Blank => {}
        Outcome::Error(error) => {
            writeln!(html, r#"<div class="notice error">{}</div>"#, escape(error.to_string().as_str())).unwrap();
        }
        Outcome::Report(report) => render_report(&mut html, report, settings),
    }

    html.push_str("</body>\n</html>\n");
    html
}

fn render_report(html: &mut String, report: &MapReport, settings: &MapSettings) {
    let placed = report.map.locations.len();
    writeln!(
        html,
        r#"<p class="summary">{} locations extracted, {} with confidence &ge; {:.2}, {} placed on the map.</p>"#,
        report.extracted, report.retained, CONFIDENCE_THRESHOLD, placed
    )
    .unwrap();

    if report.retained == 0 {
        writeln!(
            html,
            r#"<div class="notice warning">No high-confidence locations found (&ge; {CONFIDENCE_THRESHOLD:.2}).</div>"#
        )
        .unwrap();
    } else if report.map.is_empty() {
        html.push_str("<div class=\"notice warning\">No locations found.</div>\n");
    }

    html.push_str(&render_map(&report.map, settings, "newsmap"));
    html.push('\n');

    if report.map.is_empty() {
        return;
    }

    html.push_str(
        "<table>\n<thead><tr><th>Location</th><th>Type</th><th>Confidence</th><th>Summary</th><th>Latitude</th><th>Longitude</th><th>Resolved as</th></tr></thead>\n<tbody>\n",
    );
    for location in &report.map.locations {
        let record = &location.record;
        writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{:.2}</td><td>{}</td><td>{:.4}</td><td>{:.4}</td><td>{}</td></tr>",
            escape(record.name.as_str()),
            escape(record.kind.as_deref().unwrap_or("")),
            record.confidence,
            escape(record.summary.as_str()),
            location.latitude,
            location.longitude,
            escape(location.display_name.as_str()),
        )
        .unwrap();
    }
    html.push_str("</tbody>\n</table>\n");
}
