// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recurring jobs serialized across a fleet by named locks.
//!
//! A tick acquires the job's lock, runs the body and always releases. A tick
//! that cannot take the lock does nothing and waits for the next one.

pub mod job;
pub mod jobs;
pub mod scheduler;
pub mod shutdown;

pub use job::{ScheduledJob, TickOutcome, run_locked};
pub use jobs::{ADVANCE_JOB, AdvanceJob, INGEST_JOB, IngestJob};
pub use scheduler::Scheduler;
pub use shutdown::install_signal_handler;
