// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Places "find place from text" geocoder.
//!
//! The first candidate's formatted address is split on commas. Four parts
//! (`venue, city, ST zip, country`) and three parts (`city, ST zip, country`)
//! are understood; anything else leaves city and region unset.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use witness_config::model::BridgeConfig;
use witness_core::types::{GeocodeResult, GeocodeStatus};
use witness_core::{AdapterType, GeocoderAdapter, HealthStatus, PluginAdapter, WitnessError};

use crate::http::{build_client, check_status, transport};

#[derive(Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    status: String,
}

#[derive(Deserialize)]
struct Candidate {
    formatted_address: Option<String>,
    geometry: Option<Geometry>,
}

#[derive(Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

/// Geocoder backed by the Places API.
#[derive(Debug, Clone)]
pub struct PlacesGeocoder {
    client: reqwest::Client,
    url: String,
    key: Option<String>,
}

impl PlacesGeocoder {
    pub fn new(
        url: impl Into<String>,
        key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, WitnessError> {
        Ok(Self {
            client: build_client(None, timeout)?,
            url: url.into(),
            key,
        })
    }

    pub fn from_config(config: &BridgeConfig) -> Result<Self, WitnessError> {
        Self::new(
            config.geocoder_url.clone(),
            config.geocoder_key.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

/// City and region (first word of the state part) of a formatted address.
pub fn split_address(address: &str) -> (Option<String>, Option<String>) {
    let parts: Vec<&str> = address.split(',').map(str::trim).collect();
    let (city, state) = match parts.as_slice() {
        [_, city, state, _] => (*city, *state),
        [city, state, _] => (*city, *state),
        _ => return (None, None),
    };
    let region = state.split_whitespace().next().map(str::to_string);
    let city = (!city.is_empty()).then(|| city.to_string());
    (city, region)
}

#[async_trait]
impl PluginAdapter for PlacesGeocoder {
    fn name(&self) -> &str {
        "places-geocoder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Geocoder
    }

    async fn health_check(&self) -> Result<HealthStatus, WitnessError> {
        if self.key.is_none() {
            return Ok(HealthStatus::Degraded("no geocoder key configured".into()));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WitnessError> {
        Ok(())
    }
}

#[async_trait]
impl GeocoderAdapter for PlacesGeocoder {
    async fn resolve(&self, location: &str) -> Result<GeocodeResult, WitnessError> {
        let mut params = vec![
            ("input", location),
            ("inputtype", "textquery"),
            ("fields", "formatted_address,geometry"),
        ];
        if let Some(key) = &self.key {
            params.push(("key", key.as_str()));
        }
        let url = reqwest::Url::parse_with_params(&self.url, &params)
            .map_err(|e| WitnessError::Config(format!("invalid geocoder url: {e}")))?;
        let response = self.client.get(url).send().await.map_err(transport)?;
        let body: PlacesResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| WitnessError::upstream(format!("malformed geocoder response: {e}")))?;

        let status = GeocodeStatus::from_str(&body.status).unwrap_or(GeocodeStatus::UnknownError);
        if status != GeocodeStatus::Ok {
            debug!(location, status = %status, "location not resolved");
            return Ok(GeocodeResult::unresolved(status));
        }
        let Some(candidate) = body.candidates.into_iter().next() else {
            return Ok(GeocodeResult::unresolved(GeocodeStatus::ZeroResults));
        };

        let (city, region) = candidate
            .formatted_address
            .as_deref()
            .map(split_address)
            .unwrap_or((None, None));
        let (lat, long) = candidate
            .geometry
            .map(|g| (Some(g.location.lat), Some(g.location.lng)))
            .unwrap_or((None, None));
        Ok(GeocodeResult {
            status,
            city,
            region,
            lat,
            long,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn splits_three_and_four_part_addresses() {
        assert_eq!(
            split_address("Portland, OR 97204, USA"),
            (Some("Portland".into()), Some("OR".into()))
        );
        assert_eq!(
            split_address("City Hall, Minneapolis, MN 55415, USA"),
            (Some("Minneapolis".into()), Some("MN".into()))
        );
        assert_eq!(split_address("USA"), (None, None));
    }

    #[tokio::test]
    async fn resolves_first_candidate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("input", "Portland,OR"))
            .and(query_param("key", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "candidates": [{
                    "formatted_address": "Portland, OR 97204, USA",
                    "geometry": {"location": {"lat": 45.52, "lng": -122.68}}
                }]
            })))
            .mount(&server)
            .await;

        let geocoder =
            PlacesGeocoder::new(server.uri(), Some("k".into()), Duration::from_secs(5)).unwrap();
        let result = geocoder.resolve("Portland,OR").await.unwrap();
        assert!(result.is_resolved());
        assert_eq!(result.city.as_deref(), Some("Portland"));
        assert_eq!(result.region.as_deref(), Some("OR"));
        assert_eq!(result.long, Some(-122.68));
    }

    #[tokio::test]
    async fn non_ok_status_is_unresolved() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "ZERO_RESULTS", "candidates": []})),
            )
            .mount(&server)
            .await;

        let geocoder = PlacesGeocoder::new(server.uri(), None, Duration::from_secs(5)).unwrap();
        let result = geocoder.resolve("Nowhere,ZZ").await.unwrap();
        assert_eq!(result.status, GeocodeStatus::ZeroResults);
        assert!(!result.is_resolved());
    }
}
