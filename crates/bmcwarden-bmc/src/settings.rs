//! Settings-apply watching
//!
//! Pending BIOS (and boot source) settings only take effect after the host
//! goes through POST. Controllers do not say when that commit has finished,
//! so completion is inferred from the size of the pending-settings attribute
//! collection: while a commit is in progress it exposes only the attributes
//! still pending; once done it exposes the full writable set again.

use std::time::Duration;

use serde_json::{Map, Value};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::PollTiming;
use crate::deadline::Deadline;
use crate::error::{BmcError, Result};
use crate::power::PowerController;
use crate::session::ManagementSession;
use crate::types::{ResetType, SettingsResource};

/// Whether a pending-settings read indicates the commit has finished
///
/// This is a heuristic, not a completion signal: more than `threshold`
/// attributes means the full writable set is visible again.
pub fn commit_finished(attributes: &Map<String, Value>, threshold: usize) -> bool {
    attributes.len() > threshold
}

/// Applies and watches pending settings on one host
pub struct SettingsWatcher<'a> {
    session: &'a dyn ManagementSession,
    timing: &'a PollTiming,
}

impl<'a> SettingsWatcher<'a> {
    pub fn new(session: &'a dyn ManagementSession, timing: &'a PollTiming) -> Self {
        Self { session, timing }
    }

    /// Make pending settings take effect and wait for the commit to finish
    ///
    /// Powers the host on if it is off, otherwise issues `reset_type`. A host
    /// that exits POST powered off is accepted here. The whole sequence,
    /// power step included, is bounded by `timeout`.
    pub async fn wait_till_settings_applied(
        &self,
        timeout: Duration,
        reset_type: ResetType,
    ) -> Result<()> {
        let deadline = Deadline::after(timeout);
        let power = PowerController::new(self.session, self.timing);

        match power.reset_or_power_on_by(reset_type, &deadline).await {
            Ok(()) => {}
            Err(e) if e.is_exited_post_powered_off() => {
                warn!(
                    endpoint = %self.session.endpoint(),
                    "Host exited POST powered off while applying settings; continuing"
                );
            }
            Err(e) => return Err(e),
        }

        self.wait_for_commit(&deadline).await
    }

    pub(crate) async fn wait_for_commit(&self, deadline: &Deadline) -> Result<()> {
        loop {
            let pending = self
                .session
                .get_pending_settings(SettingsResource::Bios)
                .await?;
            let count = pending.attributes.len();
            if commit_finished(&pending.attributes, self.timing.commit_threshold) {
                info!(endpoint = %self.session.endpoint(), attributes = count, "Settings applied");
                return Ok(());
            }
            debug!(endpoint = %self.session.endpoint(), attributes = count, "Settings commit still in progress");
            if deadline.expired() {
                return Err(deadline.error("waiting for settings to be applied"));
            }
            sleep(self.timing.settings_poll()).await;
        }
    }

    /// Write BIOS attributes and wait until they are in effect
    ///
    /// Every key must already exist on the controller. Attributes that
    /// already hold the requested value are left out of the write; if
    /// nothing is left, the host is not touched.
    pub async fn apply_bios_attributes(
        &self,
        attributes: Map<String, Value>,
        reset_type: ResetType,
        timeout: Duration,
    ) -> Result<()> {
        let current = self.session.get_bios_attributes().await?;
        if let Some(key) = attributes.keys().find(|k| !current.contains_key(*k)) {
            return Err(BmcError::UnsupportedAttribute(key.clone()));
        }

        let changed: Map<String, Value> = attributes
            .into_iter()
            .filter(|(k, v)| current.get(k) != Some(v))
            .collect();
        if changed.is_empty() {
            info!(endpoint = %self.session.endpoint(), "BIOS attributes already up to date");
            return Ok(());
        }

        let pending = self
            .session
            .get_pending_settings(SettingsResource::Bios)
            .await?;
        info!(
            endpoint = %self.session.endpoint(),
            attributes = changed.len(),
            "Writing pending BIOS attributes"
        );
        self.session
            .patch_pending_settings(SettingsResource::Bios, changed, pending.etag.as_deref())
            .await?;

        self.wait_till_settings_applied(timeout, reset_type).await
    }
}
