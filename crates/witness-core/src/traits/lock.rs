// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Named, TTL-bounded mutual exclusion shared by every running instance.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::WitnessError;
use crate::traits::adapter::PluginAdapter;

/// Cluster-wide lock keyed by name.
///
/// At most one holder owns a name at any instant. A holder that never
/// releases loses the lock once its TTL elapses.
#[async_trait]
pub trait LockClient: PluginAdapter {
    /// Identity of this client as a lock holder.
    fn holder_id(&self) -> &str;

    /// Takes `name` for `ttl` unless another holder has it.
    ///
    /// Returns `false` on contention. Re-acquiring a lock this holder already
    /// owns refreshes its expiry.
    async fn acquire(&self, name: &str, ttl: Duration) -> Result<bool, WitnessError>;

    /// Releases `name` if this holder owns it. Releasing a lock that is not
    /// held, or has expired, is a no-op.
    async fn release(&self, name: &str) -> Result<(), WitnessError>;

    /// Current unexpired holder of `name`, if any.
    async fn holder(&self, name: &str) -> Result<Option<String>, WitnessError>;
}
