// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Geocoder adapter trait for resolving free-text locations.

use async_trait::async_trait;

use crate::error::WitnessError;
use crate::traits::adapter::PluginAdapter;
use crate::types::GeocodeResult;

/// Adapter for resolving location text to coordinates.
///
/// A non-OK status is returned as data, not as an error. Errors are reserved
/// for transport failures.
#[async_trait]
pub trait GeocoderAdapter: PluginAdapter {
    /// Resolves `location` to city, region and coordinates.
    async fn resolve(&self, location: &str) -> Result<GeocodeResult, WitnessError>;
}
