// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator wiring shared by `serve` and the operator commands.

use std::sync::Arc;

use tracing::{info, warn};
use witness_bridge::{HttpClassifier, PlacesGeocoder, RelayMessaging};
use witness_config::WitnessConfig;
use witness_conversation::ConversationEngine;
use witness_core::{
    ClassifierAdapter, GeocoderAdapter, HealthStatus, LockClient, MessagingAdapter, PluginAdapter,
    PostSource, StorageAdapter, WitnessError,
};
use witness_ingest::IngestionPipeline;
use witness_scripts::{ScriptCatalog, ScriptSelector};
use witness_storage::{SqliteLockClient, SqliteStorage};

/// Every external collaborator the engine needs, behind its trait.
#[derive(Clone)]
pub struct Components {
    pub storage: Arc<dyn StorageAdapter>,
    pub messaging: Arc<dyn MessagingAdapter>,
    pub source: Arc<dyn PostSource>,
    pub classifier: Arc<dyn ClassifierAdapter>,
    pub geocoder: Arc<dyn GeocoderAdapter>,
    pub lock: Arc<dyn LockClient>,
}

impl Components {
    /// Opens storage and builds the HTTP adapters from `[bridge]`.
    ///
    /// The lock client shares the storage connection, so every process
    /// pointed at the same database file coordinates through it.
    pub async fn connect(config: &WitnessConfig) -> Result<Self, WitnessError> {
        let storage = Arc::new(open_storage(config).await?);
        let lock = Arc::new(SqliteLockClient::for_instance(
            storage.database()?,
            config.bot.instance_id.as_deref(),
        ));

        let relay = Arc::new(RelayMessaging::from_config(&config.bridge)?);
        let classifier = Arc::new(HttpClassifier::from_config(&config.bridge)?);
        let geocoder = Arc::new(PlacesGeocoder::from_config(&config.bridge)?);

        report_health(relay.as_ref()).await;

        Ok(Self {
            storage,
            messaging: relay.clone(),
            source: relay,
            classifier,
            geocoder,
            lock,
        })
    }

    pub fn catalog(&self) -> ScriptCatalog {
        ScriptCatalog::new(self.storage.clone())
    }

    pub fn engine(&self, config: &WitnessConfig) -> ConversationEngine {
        let selector = Arc::new(ScriptSelector::new(self.catalog(), &config.selector));
        ConversationEngine::new(
            self.storage.clone(),
            self.messaging.clone(),
            self.geocoder.clone(),
            selector,
            config.conversation.clone(),
        )
    }

    pub fn pipeline(&self, config: &WitnessConfig) -> IngestionPipeline {
        IngestionPipeline::new(
            self.storage.clone(),
            self.source.clone(),
            self.classifier.clone(),
            &config.ingest,
        )
    }
}

#[cfg(test)]
impl Components {
    /// The harness's mocks and temp SQLite in place of the HTTP adapters.
    pub fn from_harness(harness: &witness_test_utils::TestHarness) -> Self {
        Self {
            storage: harness.storage.clone(),
            messaging: harness.messaging.clone(),
            source: harness.source.clone(),
            classifier: harness.classifier.clone(),
            geocoder: harness.geocoder.clone(),
            lock: harness.lock.clone(),
        }
    }
}

/// Opens and migrates the configured database.
///
/// Commands that only touch stored records use this directly and need no
/// `[bridge]` settings.
pub async fn open_storage(config: &WitnessConfig) -> Result<SqliteStorage, WitnessError> {
    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    info!(database = %config.storage.database_path, "storage ready");
    Ok(storage)
}

async fn report_health(adapter: &dyn PluginAdapter) {
    match adapter.health_check().await {
        Ok(HealthStatus::Healthy) => info!(adapter = adapter.name(), "adapter healthy"),
        Ok(HealthStatus::Degraded(reason)) => {
            warn!(adapter = adapter.name(), reason = %reason, "adapter degraded");
        }
        Ok(HealthStatus::Unhealthy(reason)) => {
            warn!(adapter = adapter.name(), reason = %reason, "adapter unhealthy");
        }
        Err(e) => warn!(adapter = adapter.name(), error = %e, "adapter health check failed"),
    }
}
