//! Map view construction and the Leaflet fragment that draws it.
//!
//! Viewport rules:
//!
//! | Locations | Center | Zoom | Fitted bounds |
//! |-----------|--------|------|---------------|
//! | 0 | configured default | default zoom | none |
//! | 1 | the location | single zoom (7) | none |
//! | 2+ | mean coordinate | default zoom | bounding box + 3% margin |

use quick_xml::escape::escape;
use serde::Serialize;

use crate::config::MapSettings;
use crate::models::{Bounds, Coordinate, GeocodedLocation, MapView};

/// Fraction of the bounding box added on each side when fitting the view.
pub const FIT_MARGIN: f64 = 0.03;

/// Popups never grow wider than this, in pixels.
pub const POPUP_MAX_WIDTH: u32 = 300;

/// Compute the viewport for a set of locations.
pub fn build_map_view(locations: Vec<GeocodedLocation>, settings: &MapSettings) -> MapView {
    let (center, zoom, bounds) = match locations.as_slice() {
        [] => (settings.default_center, settings.default_zoom, None),
        [only] => (only.coordinate(), settings.single_zoom, None),
        many => {
            let n = many.len() as f64;
            let center = Coordinate {
                latitude: many.iter().map(|l| l.latitude).sum::<f64>() / n,
                longitude: many.iter().map(|l| l.longitude).sum::<f64>() / n,
            };
            (center, settings.default_zoom, fitted_bounds(many))
        }
    };

    MapView {
        locations,
        center,
        zoom,
        bounds,
    }
}

fn fitted_bounds(locations: &[GeocodedLocation]) -> Option<Bounds> {
    let first = locations.first()?;
    let (mut south, mut north) = (first.latitude, first.latitude);
    let (mut west, mut east) = (first.longitude, first.longitude);
    for location in &locations[1..] {
        south = south.min(location.latitude);
        north = north.max(location.latitude);
        west = west.min(location.longitude);
        east = east.max(location.longitude);
    }

    let lat_margin = (north - south) * FIT_MARGIN;
    let lon_margin = (east - west) * FIT_MARGIN;
    Some(Bounds {
        south_west: Coordinate {
            latitude: south - lat_margin,
            longitude: west - lon_margin,
        },
        north_east: Coordinate {
            latitude: north + lat_margin,
            longitude: east + lon_margin,
        },
    })
}

/// Popup body for a marker; every model-supplied string is escaped.
pub fn popup_html(location: &GeocodedLocation) -> String {
    format!(
        "<b>{}</b><br>Confidence: {}<br>{}",
        escape(location.record.name.as_str()),
        location.record.confidence,
        escape(location.record.summary.as_str())
    )
}

#[derive(Serialize)]
struct LeafletMarker {
    lat: f64,
    lon: f64,
    popup: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LeafletConfig<'a> {
    center: [f64; 2],
    zoom: u8,
    bounds: Option<[[f64; 2]; 2]>,
    tile_url: &'a str,
    attribution: &'a str,
    subdomains: &'a str,
    max_zoom: u8,
    popup_max_width: u32,
    markers: Vec<LeafletMarker>,
}

/// Render the map as an embeddable HTML fragment.
///
/// The page must already load Leaflet's stylesheet and script.
pub fn render_map(view: &MapView, settings: &MapSettings, element_id: &str) -> String {
    let config = LeafletConfig {
        center: [view.center.latitude, view.center.longitude],
        zoom: view.zoom,
        bounds: view.bounds.map(|b| {
            [
                [b.south_west.latitude, b.south_west.longitude],
                [b.north_east.latitude, b.north_east.longitude],
            ]
        }),
        tile_url: &settings.tile_url,
        attribution: &settings.tile_attribution,
        subdomains: &settings.tile_subdomains,
        max_zoom: settings.max_zoom,
        popup_max_width: POPUP_MAX_WIDTH,
        markers: view
            .locations
            .iter()
            .map(|l| LeafletMarker {
                lat: l.latitude,
                lon: l.longitude,
                popup: popup_html(l),
            })
            .collect(),
    };

    format!(
        r#"<div id="{id}" class="newsmap-map" style="height: {height}px"></div>
<script>
(function () {{
  const cfg = {config};
  const map = L.map("{id}", {{ crs: L.CRS.EPSG3857 }}).setView(cfg.center, cfg.zoom);
  L.tileLayer(cfg.tileUrl, {{
    attribution: cfg.attribution,
    subdomains: cfg.subdomains,
    maxZoom: cfg.maxZoom
  }}).addTo(map);
  for (const m of cfg.markers) {{
    L.marker([m.lat, m.lon]).bindPopup(m.popup, {{ maxWidth: cfg.popupMaxWidth }}).addTo(map);
  }}
  if (cfg.bounds) {{
    map.fitBounds(cfg.bounds);
  }}
}})();
</script>"#,
        id = escape(element_id),
        height = settings.height_px,
        config = script_safe_json(&config),
    )
}

// Inline JSON must not be able to close the surrounding <script>.
fn script_safe_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocationRecord;

    fn located(name: &str, latitude: f64, longitude: f64) -> GeocodedLocation {
        GeocodedLocation {
            record: LocationRecord {
                name: name.to_string(),
                kind: None,
                confidence: 0.95,
                summary: format!("Events in {name}."),
            },
            latitude,
            longitude,
            display_name: name.to_string(),
        }
    }

    #[test]
    fn test_empty_map_uses_default_center() {
        let settings = MapSettings::default();
        let view = build_map_view(vec![], &settings);
        assert!(view.is_empty());
        assert_eq!(view.center, settings.default_center);
        assert_eq!(view.zoom, settings.default_zoom);
        assert_eq!(view.bounds, None);

        let html = render_map(&view, &settings, "map");
        assert!(html.contains("\"markers\":[]"));
    }

    #[test]
    fn test_single_location_centers_on_it() {
        let view = build_map_view(vec![located("Paris", 48.8566, 2.3522)], &MapSettings::default());
        assert_eq!(view.center.latitude, 48.8566);
        assert_eq!(view.zoom, 7);
        assert_eq!(view.bounds, None);
    }

    #[test]
    fn test_many_locations_fit_bounds_with_margin() {
        let view = build_map_view(
            vec![located("A", 10.0, 20.0), located("B", 30.0, -20.0)],
            &MapSettings::default(),
        );
        assert_eq!(view.center, Coordinate { latitude: 20.0, longitude: 0.0 });
        assert_eq!(view.zoom, 2);

        let bounds = view.bounds.unwrap();
        assert!((bounds.south_west.latitude - 9.4).abs() < 1e-9);
        assert!((bounds.north_east.latitude - 30.6).abs() < 1e-9);
        assert!((bounds.south_west.longitude + 21.2).abs() < 1e-9);
        assert!((bounds.north_east.longitude - 21.2).abs() < 1e-9);
    }

    #[test]
    fn test_popup_escapes_model_text() {
        let mut location = located("Gaza <script>", 31.5, 34.47);
        location.record.summary = "Aid & \"relief\" arrived".to_string();
        let popup = popup_html(&location);
        assert_eq!(
            popup,
            "<b>Gaza &lt;script&gt;</b><br>Confidence: 0.95<br>Aid &amp; &quot;relief&quot; arrived"
        );
    }

    #[test]
    fn test_rendered_script_cannot_break_out() {
        let mut location = located("X", 0.0, 0.0);
        location.record.summary = "</script><script>alert(1)</script>".to_string();
        let view = build_map_view(vec![location], &MapSettings::default());
        let html = render_map(&view, &MapSettings::default(), "map");
        assert_eq!(html.matches("</script>").count(), 1);
        assert!(html.contains("cartocdn.com/light_all"));
    }
}
