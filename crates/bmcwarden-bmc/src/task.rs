//! Asynchronous task polling
//!
//! Volume create/delete requests return a task reference instead of a
//! result. [`TaskPoller::wait_for_task_end`] re-reads the task until it is
//! terminal; a failed task has its log fetched once for diagnostics.

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::PollTiming;
use crate::deadline::Deadline;
use crate::error::{BmcError, Result};
use crate::session::ManagementSession;
use crate::types::TaskState;

/// Polls task resources on one controller
pub struct TaskPoller<'a> {
    session: &'a dyn ManagementSession,
    timing: &'a PollTiming,
}

impl<'a> TaskPoller<'a> {
    pub fn new(session: &'a dyn ManagementSession, timing: &'a PollTiming) -> Self {
        Self { session, timing }
    }

    /// Wait for the task at `location` to finish
    ///
    /// `Ok(())` means the task succeeded. A failed task yields
    /// [`BmcError::TaskFailed`] carrying its log, or
    /// [`BmcError::TaskLogUnavailable`] if the log could not be fetched.
    pub async fn wait_for_task_end(&self, location: &str, timeout: Duration) -> Result<()> {
        let deadline = Deadline::after(timeout);
        loop {
            let snapshot = self.session.get_task(location).await?;
            match snapshot.state {
                TaskState::Succeeded => {
                    info!(endpoint = %self.session.endpoint(), task = %location, "Task completed");
                    return Ok(());
                }
                TaskState::Failed(state) => {
                    warn!(endpoint = %self.session.endpoint(), task = %location, state = %state, "Task failed");
                    return Err(self
                        .failure(location, state, snapshot.log_location.as_deref())
                        .await);
                }
                TaskState::Running => {
                    debug!(endpoint = %self.session.endpoint(), task = %location, "Task still running");
                }
            }
            if deadline.expired() {
                return Err(deadline.error(&format!("waiting for task {}", location)));
            }
            sleep(self.timing.task_poll()).await;
        }
    }

    async fn failure(&self, location: &str, state: String, log_location: Option<&str>) -> BmcError {
        match self.fetch_log(location, log_location).await {
            Ok(log) => BmcError::TaskFailed {
                location: location.to_string(),
                state,
                log: Some(log),
            },
            Err(source) => BmcError::TaskLogUnavailable {
                location: location.to_string(),
                state,
                source: Box::new(source),
            },
        }
    }

    /// Fetch a task log as text
    pub async fn fetch_log(&self, location: &str, log_location: Option<&str>) -> Result<String> {
        let log_location = log_location.ok_or_else(|| BmcError::UnexpectedResponse {
            resource: location.to_string(),
            reason: "task does not link a log".to_string(),
        })?;
        let bytes = self.session.get_task_log(log_location).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
