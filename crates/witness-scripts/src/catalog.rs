// SPDX-FileCopyrightText: 2026 Witness Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Administrator-facing store of scripted messages.
//!
//! Counter updates are delegated to storage, where each is one atomic
//! increment, so concurrent selections never lose a use.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use witness_core::types::{FORM_LINK_PLACEHOLDER, NewScript};
use witness_core::{ConversationNode, InsertOutcome, Script, StorageAdapter, WitnessError};

/// Script catalog over a storage adapter.
#[derive(Clone)]
pub struct ScriptCatalog {
    storage: Arc<dyn StorageAdapter>,
}

impl ScriptCatalog {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    /// Validates and stores a new script with fresh counters.
    pub async fn add(&self, new: NewScript) -> Result<Script, WitnessError> {
        validate(&new)?;
        let script = Script {
            id: uuid::Uuid::new_v4().to_string(),
            node: new.node,
            text: new.text.trim().to_string(),
            active: new.active,
            use_count: 0,
            positive_count: 0,
            external_ref: new.external_ref,
            created_at: Utc::now(),
        };
        match self.storage.insert_script(&script).await? {
            InsertOutcome::Inserted => {
                info!(script_id = %script.id, node = %script.node, "script added");
                Ok(script)
            }
            InsertOutcome::Duplicate => Err(WitnessError::Internal(format!(
                "script id collision on {}",
                script.id
            ))),
        }
    }

    pub async fn activate(&self, id: &str) -> Result<(), WitnessError> {
        self.set_active(id, true).await
    }

    pub async fn deactivate(&self, id: &str) -> Result<(), WitnessError> {
        self.set_active(id, false).await
    }

    async fn set_active(&self, id: &str, active: bool) -> Result<(), WitnessError> {
        if !self.storage.set_script_active(id, active).await? {
            return Err(not_found(id));
        }
        info!(script_id = id, active, "script activity changed");
        Ok(())
    }

    pub async fn get(&self, id: &str) -> Result<Script, WitnessError> {
        self.storage
            .get_script(id)
            .await?
            .ok_or_else(|| not_found(id))
    }

    /// Active scripts for `node`, in a stable order.
    pub async fn list_active(&self, node: ConversationNode) -> Result<Vec<Script>, WitnessError> {
        self.storage.list_scripts(Some(node), true).await
    }

    /// Every script, active or not.
    pub async fn list_all(&self) -> Result<Vec<Script>, WitnessError> {
        self.storage.list_scripts(None, false).await
    }

    /// Counts one delivery of the script.
    pub async fn record_use(&self, id: &str) -> Result<(), WitnessError> {
        if !self.storage.increment_script_use(id).await? {
            return Err(not_found(id));
        }
        debug!(script_id = id, "script use recorded");
        Ok(())
    }

    /// Counts one positive outcome. Returns `false` when the script has no
    /// use left to credit, which leaves the counters unchanged.
    pub async fn record_positive(&self, id: &str) -> Result<bool, WitnessError> {
        let credited = self.storage.increment_script_positive(id).await?;
        if credited {
            debug!(script_id = id, "script positive recorded");
        } else {
            warn!(script_id = id, "positive outcome without an unmatched use ignored");
        }
        Ok(credited)
    }
}

fn not_found(id: &str) -> WitnessError {
    WitnessError::NotFound {
        kind: "script",
        id: id.to_string(),
    }
}

fn validate(new: &NewScript) -> Result<(), WitnessError> {
    if new.text.trim().is_empty() {
        return Err(WitnessError::Validation("script text must not be empty".into()));
    }
    if new.node.requires_form_link() && !new.text.contains(FORM_LINK_PLACEHOLDER) {
        return Err(WitnessError::Validation(format!(
            "{} scripts must contain {FORM_LINK_PLACEHOLDER}",
            new.node
        )));
    }
    Ok(())
}
