//! BIOS POST detection
//!
//! The generic power indicator flips to `On` as soon as the host is
//! energized, long before firmware is done. The vendor POST indicator is the
//! only way to tell when a power-on has really finished: wait for POST to
//! start, then wait for it to end.

use tokio::time::sleep;
use tracing::debug;

use crate::config::PollTiming;
use crate::deadline::Deadline;
use crate::error::Result;
use crate::session::ManagementSession;

/// Observes the POST indicator of one host
pub struct PostDetector<'a> {
    session: &'a dyn ManagementSession,
    timing: &'a PollTiming,
}

impl<'a> PostDetector<'a> {
    pub fn new(session: &'a dyn ManagementSession, timing: &'a PollTiming) -> Self {
        Self { session, timing }
    }

    /// Single read of the POST indicator
    pub async fn in_post(&self) -> Result<bool> {
        self.session.get_post_state().await
    }

    /// Poll until the host reports it is in POST
    pub(crate) async fn wait_for_entry(&self, deadline: &Deadline) -> Result<()> {
        loop {
            if self.in_post().await? {
                debug!(endpoint = %self.session.endpoint(), "Host entered POST");
                return Ok(());
            }
            if deadline.expired() {
                return Err(deadline.error("waiting for host to enter POST"));
            }
            sleep(self.timing.post_entry_poll()).await;
        }
    }

    /// Poll until the POST indicator clears
    pub(crate) async fn wait_for_exit(&self, deadline: &Deadline) -> Result<()> {
        loop {
            if !self.in_post().await? {
                debug!(endpoint = %self.session.endpoint(), "Host exited POST");
                return Ok(());
            }
            if deadline.expired() {
                return Err(deadline.error("waiting for host to exit POST"));
            }
            sleep(self.timing.post_exit_poll()).await;
        }
    }
}
