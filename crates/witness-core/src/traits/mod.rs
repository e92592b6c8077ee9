// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the Witness collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod classifier;
pub mod geocoder;
pub mod lock;
pub mod messaging;
pub mod source;
pub mod storage;

// Re-export all traits at the traits module level for convenience.
pub use adapter::PluginAdapter;
pub use classifier::ClassifierAdapter;
pub use geocoder::GeocoderAdapter;
pub use lock::LockClient;
pub use messaging::MessagingAdapter;
pub use source::PostSource;
pub use storage::StorageAdapter;
