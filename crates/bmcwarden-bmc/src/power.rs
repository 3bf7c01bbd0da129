//! Host power transitions
//!
//! Issues `ComputerSystem.Reset` actions and blocks until the host has
//! really reached the requested state. Power-off completion is read from
//! the power indicator; power-on completion goes through POST detection,
//! see [`PowerController::wait_until_host_state_changed`].

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::PollTiming;
use crate::deadline::Deadline;
use crate::error::{BmcError, Result};
use crate::post::PostDetector;
use crate::session::ManagementSession;
use crate::types::{PowerState, ResetType};

/// Drives power state of one host
pub struct PowerController<'a> {
    session: &'a dyn ManagementSession,
    timing: &'a PollTiming,
}

impl<'a> PowerController<'a> {
    pub fn new(session: &'a dyn ManagementSession, timing: &'a PollTiming) -> Self {
        Self { session, timing }
    }

    pub async fn power_state(&self) -> Result<PowerState> {
        self.session.get_power_state().await
    }

    pub async fn is_powered_on(&self) -> Result<bool> {
        Ok(self.power_state().await?.is_on())
    }

    /// Power the host on or off and wait for it to get there
    ///
    /// Does nothing if the host is already in the target state. Power-off
    /// uses `ForceOff`, power-on uses `On`.
    pub async fn change_power_state(&self, on: bool, timeout: Duration) -> Result<()> {
        let deadline = Deadline::after(timeout);
        self.change_power_state_by(on, &deadline).await
    }

    pub(crate) async fn change_power_state_by(&self, on: bool, deadline: &Deadline) -> Result<()> {
        let current = self.power_state().await?;
        let target = if on { PowerState::On } else { PowerState::Off };
        if current == target {
            info!(endpoint = %self.session.endpoint(), state = %current, "Host already in requested power state");
            return Ok(());
        }

        let reset_type = if on { ResetType::On } else { ResetType::ForceOff };
        info!(
            endpoint = %self.session.endpoint(),
            from = %current,
            to = %target,
            reset_type = %reset_type,
            "Changing host power state"
        );
        self.session.reset(reset_type).await?;
        self.wait_until_host_state_changed(on, deadline).await
    }

    /// Issue `reset_type` unconditionally and wait for its expected outcome
    ///
    /// `GracefulShutdown`, `PushPowerButton` and `ForceOff` are expected to
    /// leave the host off; every other reset type to leave it on.
    pub async fn reset_host(&self, reset_type: ResetType, timeout: Duration) -> Result<()> {
        let deadline = Deadline::after(timeout);
        self.reset_host_by(reset_type, &deadline).await
    }

    pub(crate) async fn reset_host_by(&self, reset_type: ResetType, deadline: &Deadline) -> Result<()> {
        info!(
            endpoint = %self.session.endpoint(),
            reset_type = %reset_type,
            timeout_secs = deadline.timeout().as_secs(),
            "Resetting host"
        );
        self.session.reset(reset_type).await?;
        self.wait_until_host_state_changed(reset_type.expects_power_on(), deadline)
            .await
    }

    /// Make pending changes take effect without an unnecessary power cycle
    ///
    /// A host that is off is simply powered on (which runs POST and applies
    /// pending settings); a host that is on gets `reset_type`.
    pub async fn reset_or_power_on(&self, reset_type: ResetType, timeout: Duration) -> Result<()> {
        let deadline = Deadline::after(timeout);
        self.reset_or_power_on_by(reset_type, &deadline).await
    }

    pub(crate) async fn reset_or_power_on_by(
        &self,
        reset_type: ResetType,
        deadline: &Deadline,
    ) -> Result<()> {
        if self.is_powered_on().await? {
            self.reset_host_by(reset_type, deadline).await
        } else {
            self.change_power_state_by(true, deadline).await
        }
    }

    /// Block until the host reaches the target power state
    ///
    /// Off: poll the power indicator until it reads `Off`.
    ///
    /// On: wait for the host to enter POST, then for POST to end, then
    /// re-check the power indicator. A host that left POST but is off yields
    /// [`BmcError::ExitedPostPoweredOff`].
    pub(crate) async fn wait_until_host_state_changed(
        &self,
        on: bool,
        deadline: &Deadline,
    ) -> Result<()> {
        if !on {
            return self.wait_for_power_off(deadline).await;
        }

        let post = PostDetector::new(self.session, self.timing);
        post.wait_for_entry(deadline).await?;
        post.wait_for_exit(deadline).await?;

        if self.is_powered_on().await? {
            info!(endpoint = %self.session.endpoint(), "Host powered on and finished POST");
            Ok(())
        } else {
            Err(BmcError::ExitedPostPoweredOff)
        }
    }

    async fn wait_for_power_off(&self, deadline: &Deadline) -> Result<()> {
        loop {
            let state = self.power_state().await?;
            debug!(endpoint = %self.session.endpoint(), state = %state, "Waiting for power off");
            if state == PowerState::Off {
                info!(endpoint = %self.session.endpoint(), "Host powered off");
                return Ok(());
            }
            if deadline.expired() {
                return Err(deadline.error("waiting for host to power off"));
            }
            sleep(self.timing.power_poll()).await;
        }
    }
}
