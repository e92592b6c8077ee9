// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP adapters for the external collaborators.
//!
//! - [`RelayMessaging`] messaging and post search through a JSON relay
//! - [`HttpClassifier`] use-of-force ranking service
//! - [`PlacesGeocoder`] location resolution

mod http;

pub mod classifier;
pub mod geocoder;
pub mod relay;

pub use classifier::HttpClassifier;
pub use geocoder::{PlacesGeocoder, split_address};
pub use relay::RelayMessaging;
