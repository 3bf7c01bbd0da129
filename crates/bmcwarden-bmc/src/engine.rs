//! Host reconciliation engine
//!
//! [`HostEngine`] bundles one controller session with the shared lock
//! registry and polling configuration, and exposes the operations callers
//! drive. Callers hold the endpoint lock (see [`HostEngine::lock`]) around
//! every mutating operation; read-only queries need no lock.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bmcwarden_bmc::{EndpointLocks, HostEngine, RedfishConfig, RedfishSession, ResetType};
//!
//! # async fn example() -> bmcwarden_bmc::Result<()> {
//! let locks = EndpointLocks::new();
//! let session = RedfishSession::connect(RedfishConfig::new("10.0.0.5", "root", "calvin")).await?;
//! let engine = HostEngine::new(Arc::new(session), locks.clone());
//!
//! let guard = engine.lock().await;
//! engine.reset_host(ResetType::ForceRestart, Duration::from_secs(600)).await?;
//! engine.unlock(guard);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};

use crate::boot_order::BootOrderReconciler;
use crate::config::PollTiming;
use crate::error::Result;
use crate::locks::{EndpointGuard, EndpointLocks};
use crate::power::PowerController;
use crate::post::PostDetector;
use crate::session::ManagementSession;
use crate::settings::SettingsWatcher;
use crate::task::TaskPoller;
use crate::types::{PowerState, ResetType, VolumeRequest};
use crate::volume::VolumeProvisioner;

/// Snapshot of what the host is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostStatus {
    pub power: PowerState,
    pub in_post: bool,
}

/// How to make a pending settings write take effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyPolicy {
    pub reset_type: ResetType,
    pub timeout: Duration,
}

/// Operations against one controller
pub struct HostEngine {
    session: Arc<dyn ManagementSession>,
    locks: EndpointLocks,
    timing: PollTiming,
}

impl HostEngine {
    pub fn new(session: Arc<dyn ManagementSession>, locks: EndpointLocks) -> Self {
        Self {
            session,
            locks,
            timing: PollTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: PollTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn endpoint(&self) -> &str {
        self.session.endpoint()
    }

    /// Acquire this controller's lock
    pub async fn lock(&self) -> EndpointGuard {
        self.locks.lock(self.session.endpoint()).await
    }

    /// Release this controller's lock
    pub fn unlock(&self, guard: EndpointGuard) {
        self.locks.unlock(guard);
    }

    fn power(&self) -> PowerController<'_> {
        PowerController::new(self.session.as_ref(), &self.timing)
    }

    pub async fn host_status(&self) -> Result<HostStatus> {
        let power = self.power().power_state().await?;
        let in_post = PostDetector::new(self.session.as_ref(), &self.timing)
            .in_post()
            .await?;
        Ok(HostStatus { power, in_post })
    }

    pub async fn change_power_state(&self, on: bool, timeout: Duration) -> Result<()> {
        self.power().change_power_state(on, timeout).await
    }

    pub async fn reset_host(&self, reset_type: ResetType, timeout: Duration) -> Result<()> {
        self.power().reset_host(reset_type, timeout).await
    }

    pub async fn wait_till_settings_applied(
        &self,
        timeout: Duration,
        reset_type: ResetType,
    ) -> Result<()> {
        SettingsWatcher::new(self.session.as_ref(), &self.timing)
            .wait_till_settings_applied(timeout, reset_type)
            .await
    }

    /// Validate and write a boot order, then optionally wait for it to apply
    ///
    /// Nothing is reset when the planned order equals the current one.
    pub async fn validate_and_apply_boot_order(
        &self,
        planned: &[String],
        apply: Option<ApplyPolicy>,
    ) -> Result<()> {
        let written = BootOrderReconciler::new(self.session.as_ref())
            .validate_and_apply(planned)
            .await?;
        match apply {
            Some(policy) if written => {
                self.wait_till_settings_applied(policy.timeout, policy.reset_type)
                    .await
            }
            _ => Ok(()),
        }
    }

    pub async fn apply_bios_attributes(
        &self,
        attributes: Map<String, Value>,
        policy: ApplyPolicy,
    ) -> Result<()> {
        SettingsWatcher::new(self.session.as_ref(), &self.timing)
            .apply_bios_attributes(attributes, policy.reset_type, policy.timeout)
            .await
    }

    pub async fn wait_for_task_end(&self, location: &str, timeout: Duration) -> Result<()> {
        TaskPoller::new(self.session.as_ref(), &self.timing)
            .wait_for_task_end(location, timeout)
            .await
    }

    pub async fn create_volume(
        &self,
        controller: &str,
        request: &VolumeRequest,
        timeout: Duration,
    ) -> Result<()> {
        VolumeProvisioner::new(self.session.as_ref(), &self.timing)
            .create(controller, request, timeout)
            .await
    }

    pub async fn delete_volume(&self, volume: &str, timeout: Duration) -> Result<()> {
        VolumeProvisioner::new(self.session.as_ref(), &self.timing)
            .delete(volume, timeout)
            .await
    }
}
