//! Boot-order reconciliation
//!
//! A planned boot order is a list of structured boot strings and must be a
//! permutation of the order the controller reports right now. The write
//! needs the device name for every entry, so the plan is re-paired with the
//! current entries before it is sent.

use std::collections::HashSet;

use serde_json::{json, Map, Value};
use tracing::info;

use crate::error::{BootOrderError, Result};
use crate::session::ManagementSession;
use crate::types::{BootOption, BootOrder, SettingsResource};

/// Check that `planned` is a permutation of `current`
///
/// Rules are checked in order: unknown entries, length, missing entries.
pub fn validate_plan(current: &BootOrder, planned: &[String]) -> std::result::Result<(), BootOrderError> {
    let known: HashSet<&str> = current.options.iter().map(|o| o.id.as_str()).collect();
    if let Some(unknown) = planned.iter().find(|id| !known.contains(id.as_str())) {
        return Err(BootOrderError::UnknownEntry(unknown.clone()));
    }

    if planned.len() != current.options.len() {
        return Err(BootOrderError::LengthMismatch {
            planned: planned.len(),
            current: current.options.len(),
        });
    }

    let wanted: HashSet<&str> = planned.iter().map(String::as_str).collect();
    let missing: Vec<String> = current
        .options
        .iter()
        .filter(|o| !wanted.contains(o.id.as_str()))
        .map(|o| o.id.clone())
        .collect();
    if !missing.is_empty() {
        return Err(BootOrderError::MissingEntries(missing));
    }

    Ok(())
}

/// Pair every planned id with its current entry, in planned order
pub fn reorder(current: &BootOrder, planned: &[String]) -> std::result::Result<Vec<BootOption>, BootOrderError> {
    planned
        .iter()
        .map(|id| {
            current
                .find(id)
                .cloned()
                .ok_or_else(|| BootOrderError::UnmatchedEntry(id.clone()))
        })
        .collect()
}

fn sequence_value(options: &[BootOption]) -> Value {
    let entries: Vec<Value> = options
        .iter()
        .enumerate()
        .map(|(index, o)| {
            json!({
                "Enabled": o.enabled,
                "Id": o.id,
                "Index": index,
                "Name": o.device_name,
            })
        })
        .collect();
    Value::Array(entries)
}

/// Validates and writes boot orders on one host
pub struct BootOrderReconciler<'a> {
    session: &'a dyn ManagementSession,
}

impl<'a> BootOrderReconciler<'a> {
    pub fn new(session: &'a dyn ManagementSession) -> Self {
        Self { session }
    }

    /// Read the current order and check `planned` against it
    pub async fn validate(&self, planned: &[String]) -> Result<BootOrder> {
        let current = self
            .session
            .get_boot_order()
            .await?
            .ok_or(BootOrderError::NoBootOrderAttribute)?;
        validate_plan(&current, planned)?;
        Ok(current)
    }

    /// Write `planned` as the pending boot order
    ///
    /// `current` must come from [`BootOrderReconciler::validate`].
    pub async fn apply(&self, current: &BootOrder, planned: &[String]) -> Result<()> {
        let options = reorder(current, planned)?;

        let mut attributes = Map::new();
        attributes.insert(current.attribute.clone(), sequence_value(&options));

        info!(
            endpoint = %self.session.endpoint(),
            attribute = %current.attribute,
            entries = options.len(),
            "Writing boot order"
        );
        self.session
            .patch_pending_settings(SettingsResource::BootSources, attributes, current.etag.as_deref())
            .await
    }

    /// Validate and, if it differs from the current order, write `planned`
    ///
    /// Returns whether a write was issued.
    pub async fn validate_and_apply(&self, planned: &[String]) -> Result<bool> {
        let current = self.validate(planned).await?;
        if current.ids() == planned {
            info!(endpoint = %self.session.endpoint(), "Boot order already as planned");
            return Ok(false);
        }
        self.apply(&current, planned).await?;
        Ok(true)
    }
}
