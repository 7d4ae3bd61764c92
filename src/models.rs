//! Data models flowing through the pipeline.
//!
//! - [`ArticleInput`]: what the user submitted (a URL or pasted text)
//! - [`LocationRecord`]: one place the LLM found in the article
//! - [`GeocodedLocation`]: a record that the geocoder could place on the map
//! - [`MapView`] / [`MapReport`]: the rendered outcome of one submission
//!
//! Records coming back from the LLM are deserialized leniently through
//! [`RawLocation`] and normalized into [`LocationRecord`], so a sloppy model
//! answer (missing summary, confidence of `1.2`) never breaks the invariants
//! the rest of the pipeline relies on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NewsMapError, Result};

/// Summary used when the model does not describe events at a location.
pub const NO_EVENTS_SUMMARY: &str = "No specific events described.";

/// The article a user submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleInput {
    /// An article URL to fetch and extract.
    Url(String),
    /// Raw article text pasted by the user.
    Text(String),
}

impl ArticleInput {
    /// Build an input from the two form fields.
    ///
    /// Pasted text wins; the URL is only used when the text field is blank.
    /// Both blank is an [`NewsMapError::EmptyArticle`].
    pub fn from_fields(url: Option<&str>, text: Option<&str>) -> Result<Self> {
        let text = text.map(str::trim).unwrap_or_default();
        let url = url.map(str::trim).unwrap_or_default();

        if !text.is_empty() {
            Ok(ArticleInput::Text(text.to_string()))
        } else if !url.is_empty() {
            Ok(ArticleInput::Url(url.to_string()))
        } else {
            Err(NewsMapError::EmptyArticle)
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ArticleInput::Url(_) => "url",
            ArticleInput::Text(_) => "text",
        }
    }
}

/// A location as the LLM wrote it, before normalization.
///
/// Every field is optional because the model is only asked, not forced, to
/// follow the schema.
#[derive(Debug, Default, Deserialize)]
pub struct RawLocation {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub confidence: Option<f64>,
    pub summary: Option<String>,
}

/// A place extracted from the article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub name: String,
    /// City, state, country, landmark... as reported by the model.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub summary: String,
}

impl LocationRecord {
    /// Normalize a raw model record.
    ///
    /// Returns `None` for records without a usable name. Confidence is
    /// clamped into `[0, 1]` (missing or non-finite becomes `0.0`) and a
    /// missing summary becomes [`NO_EVENTS_SUMMARY`].
    pub fn from_raw(raw: RawLocation) -> Option<Self> {
        let name = raw.name?.trim().to_string();
        if name.is_empty() {
            return None;
        }

        let confidence = match raw.confidence {
            Some(c) if c.is_finite() => c.clamp(0.0, 1.0),
            _ => 0.0,
        };

        let summary = raw
            .summary
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NO_EVENTS_SUMMARY.to_string());

        let kind = raw
            .kind
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        Some(Self {
            name,
            kind,
            confidence,
            summary,
        })
    }
}

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range values.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// A location record placed on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedLocation {
    #[serde(flatten)]
    pub record: LocationRecord,
    pub latitude: f64,
    pub longitude: f64,
    /// Full place name returned by the geocoder.
    pub display_name: String,
}

impl GeocodedLocation {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// South-west and north-east corners the map view is fitted to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south_west: Coordinate,
    pub north_east: Coordinate,
}

/// The map for one submission: markers plus the initial viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub locations: Vec<GeocodedLocation>,
    pub center: Coordinate,
    pub zoom: u8,
    /// Present only when the view is fitted to several markers.
    pub bounds: Option<Bounds>,
}

impl MapView {
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Outcome of one pipeline run, returned by the JSON API and rendered by
/// the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapReport {
    /// Records the model returned, after normalization.
    pub extracted: usize,
    /// Records that passed the confidence filter.
    pub retained: usize,
    pub map: MapView,
    pub generated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_wins_over_url() {
        let input =
            ArticleInput::from_fields(Some("https://example.com/a"), Some("  Pasted text ")).unwrap();
        assert_eq!(input, ArticleInput::Text("Pasted text".to_string()));
    }

    #[test]
    fn test_url_used_when_text_blank() {
        let input = ArticleInput::from_fields(Some(" https://example.com/a "), Some("   ")).unwrap();
        assert_eq!(input, ArticleInput::Url("https://example.com/a".to_string()));
        assert_eq!(input.kind(), "url");
    }

    #[test]
    fn test_both_blank_is_empty_article() {
        let err = ArticleInput::from_fields(None, Some("")).unwrap_err();
        assert!(matches!(err, NewsMapError::EmptyArticle));
    }

    #[test]
    fn test_record_defaults() {
        let raw: RawLocation = serde_json::from_str(r#"{"name": " Paris "}"#).unwrap();
        let record = LocationRecord::from_raw(raw).unwrap();
        assert_eq!(record.name, "Paris");
        assert_eq!(record.confidence, 0.0);
        assert_eq!(record.summary, NO_EVENTS_SUMMARY);
        assert_eq!(record.kind, None);
    }

    #[test]
    fn test_record_confidence_clamped() {
        let raw: RawLocation =
            serde_json::from_str(r#"{"name": "Lima", "type": "city", "confidence": 1.4, "summary": "Protests."}"#)
                .unwrap();
        let record = LocationRecord::from_raw(raw).unwrap();
        assert_eq!(record.confidence, 1.0);
        assert_eq!(record.kind.as_deref(), Some("city"));

        let negative = LocationRecord::from_raw(RawLocation {
            name: Some("Quito".into()),
            confidence: Some(-0.3),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(negative.confidence, 0.0);
    }

    #[test]
    fn test_record_without_name_dropped() {
        assert!(LocationRecord::from_raw(RawLocation::default()).is_none());
        let blank = RawLocation {
            name: Some("   ".into()),
            confidence: Some(0.99),
            ..Default::default()
        };
        assert!(LocationRecord::from_raw(blank).is_none());
    }

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(48.85, 2.35).is_some());
        assert!(Coordinate::new(90.0, -180.0).is_some());
        assert!(Coordinate::new(91.0, 0.0).is_none());
        assert!(Coordinate::new(0.0, 180.5).is_none());
        assert!(Coordinate::new(f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_geocoded_location_serializes_flat() {
        let location = GeocodedLocation {
            record: LocationRecord {
                name: "Paris".into(),
                kind: Some("city".into()),
                confidence: 0.95,
                summary: "Summit held.".into(),
            },
            latitude: 48.85,
            longitude: 2.35,
            display_name: "Paris, Île-de-France, France".into(),
        };

        let json = serde_json::to_value(&location).unwrap();
        assert_eq!(json["name"], "Paris");
        assert_eq!(json["type"], "city");
        assert_eq!(json["latitude"], 48.85);
    }
}
