// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `witness serve` command implementation.
//!
//! Wires storage, the lock client and the HTTP adapters into the ingestion
//! pipeline and the conversation engine, then drives both jobs until a
//! shutdown signal arrives.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use witness_config::WitnessConfig;
use witness_core::WitnessError;
use witness_scheduler::{AdvanceJob, IngestJob, Scheduler, install_signal_handler};

use crate::app::Components;

/// Runs the `witness serve` command.
pub async fn run_serve(config: WitnessConfig) -> Result<(), WitnessError> {
    info!(name = %config.bot.name, "starting witness serve");
    let components = Components::connect(&config).await?;

    if !config.scheduler.enabled {
        warn!("scheduler disabled by configuration, nothing to serve");
        return components.storage.close().await;
    }

    let mut scheduler = build_scheduler(&components, &config, install_signal_handler());
    info!(
        jobs = ?scheduler.job_names(),
        holder = components.lock.holder_id(),
        "scheduler starting"
    );
    scheduler.run_until_cancelled().await;

    components.storage.close().await?;
    info!("witness serve shutdown complete");
    Ok(())
}

/// The production scheduler: ingestion plus advancement, both lock-guarded.
pub fn build_scheduler(
    components: &Components,
    config: &WitnessConfig,
    cancel: CancellationToken,
) -> Scheduler {
    let pipeline = Arc::new(components.pipeline(config));
    let engine = Arc::new(components.engine(config));

    let mut scheduler = Scheduler::with_cancel(components.lock.clone(), cancel);
    scheduler.add(Arc::new(IngestJob::new(pipeline, &config.scheduler)));
    scheduler.add(Arc::new(AdvanceJob::new(engine, &config.scheduler)));
    scheduler
}
