//! Storage volume provisioning
//!
//! Both create and delete are answered with a task; the flow is request,
//! then [`TaskPoller::wait_for_task_end`].

use std::time::Duration;

use tracing::info;

use crate::config::PollTiming;
use crate::error::{BmcError, Result};
use crate::session::ManagementSession;
use crate::task::TaskPoller;
use crate::types::VolumeRequest;

pub struct VolumeProvisioner<'a> {
    session: &'a dyn ManagementSession,
    timing: &'a PollTiming,
}

impl<'a> VolumeProvisioner<'a> {
    pub fn new(session: &'a dyn ManagementSession, timing: &'a PollTiming) -> Self {
        Self { session, timing }
    }

    /// Create a volume on `controller` and wait for the task to finish
    pub async fn create(
        &self,
        controller: &str,
        request: &VolumeRequest,
        timeout: Duration,
    ) -> Result<()> {
        info!(
            endpoint = %self.session.endpoint(),
            controller = %controller,
            volume = %request.name,
            raid = %request.raid_type,
            "Creating volume"
        );
        let task = self
            .session
            .create_volume(controller, request)
            .await?
            .ok_or_else(|| BmcError::MissingTaskLocation(format!("create volume {}", request.name)))?;
        TaskPoller::new(self.session, self.timing)
            .wait_for_task_end(&task, timeout)
            .await
    }

    /// Delete the volume at `volume` and wait for the task to finish
    pub async fn delete(&self, volume: &str, timeout: Duration) -> Result<()> {
        info!(endpoint = %self.session.endpoint(), volume = %volume, "Deleting volume");
        let task = self
            .session
            .delete_volume(volume)
            .await?
            .ok_or_else(|| BmcError::MissingTaskLocation(format!("delete volume {}", volume)))?;
        TaskPoller::new(self.session, self.timing)
            .wait_for_task_end(&task, timeout)
            .await
    }
}
