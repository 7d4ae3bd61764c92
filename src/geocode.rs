//! Place name geocoding against a Nominatim-compatible service.
//!
//! One lookup per distinct name, one at a time, first hit wins. A name the
//! service cannot place (or a lookup that fails outright) is dropped with a
//! warning; it never fails the request.

use futures::stream::{self, StreamExt};
use itertools::Itertools;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use tracing::{debug, info, instrument, warn};

use crate::config::GeocoderSettings;
use crate::error::Result;
use crate::models::{Coordinate, GeocodedLocation, LocationRecord};

/// A resolved place: where it is and what the service calls it.
#[derive(Debug, Clone, PartialEq)]
pub struct Place {
    pub coordinate: Coordinate,
    pub display_name: String,
}

/// Resolves a place name to coordinates.
pub trait Geocode {
    /// `Ok(None)` means the service had no usable result for `name`.
    fn geocode(&self, name: &str) -> impl Future<Output = Result<Option<Place>>> + Send;
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: String,
}

#[derive(Debug)]
pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
    user_agent: String,
}

impl NominatimGeocoder {
    pub fn new(client: Client, settings: &GeocoderSettings) -> Self {
        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            user_agent: settings.user_agent.clone(),
        }
    }

    fn search_url(&self, name: &str) -> String {
        format!(
            "{}/search?format=json&q={}&limit=1",
            self.base_url,
            urlencoding::encode(name)
        )
    }
}

impl Geocode for NominatimGeocoder {
    #[instrument(level = "info", skip(self))]
    async fn geocode(&self, name: &str) -> Result<Option<Place>> {
        let response = self
            .client
            .get(self.search_url(name))
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        // A failed lookup is a miss like any other.
        let places: Vec<NominatimPlace> = match response {
            Ok(r) => match r.json().await {
                Ok(places) => places,
                Err(e) => {
                    warn!(error = %e, "Unreadable geocoder response");
                    return Ok(None);
                }
            },
            Err(e) => {
                warn!(error = %e, "Geocoder request failed");
                return Ok(None);
            }
        };

        let Some(first) = places.into_iter().next() else {
            return Ok(None);
        };

        let coordinate = match (first.lat.trim().parse::<f64>(), first.lon.trim().parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Coordinate::new(lat, lon),
            _ => None,
        };
        Ok(coordinate.map(|coordinate| Place {
            coordinate,
            display_name: first.display_name,
        }))
    }
}

/// Geocode every record, sequentially, dropping the ones that miss.
///
/// Records sharing a name are looked up once; the first record with that
/// name is kept.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub async fn geocode_all<G>(geocoder: &G, records: Vec<LocationRecord>) -> Result<Vec<GeocodedLocation>>
where
    G: Geocode + Sync,
{
    let unique: Vec<LocationRecord> = records.into_iter().unique_by(|r| r.name.clone()).collect();
    let requested = unique.len();

    let results: Vec<Result<Option<GeocodedLocation>>> = stream::iter(unique)
        .then(|record| async move {
            let looked_up = geocoder.geocode(&record.name).await;
            match looked_up {
                Ok(Some(place)) => {
                    debug!(name = %record.name, display_name = %place.display_name, "Geocoded location");
                    Ok(Some(GeocodedLocation {
                        latitude: place.coordinate.latitude,
                        longitude: place.coordinate.longitude,
                        display_name: place.display_name,
                        record,
                    }))
                }
                Ok(None) => {
                    warn!(name = %record.name, "No coordinates found; dropping location");
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        })
        .collect()
        .await;

    let located: Vec<GeocodedLocation> = results
        .into_iter()
        .flatten_ok()
        .collect::<Result<_>>()?;

    info!(requested, located = located.len(), "Geocoding complete");
    Ok(located)
}
