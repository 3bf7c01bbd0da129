//! bmcwarden BMC reconciliation engine
//!
//! This crate drives a physical server, through its Redfish management
//! controller, into a desired state and blocks until the hardware actually
//! reports that state.
//!
//! # Components
//!
//! - **Endpoint locks**: one async mutex per controller endpoint, see [`EndpointLocks`]
//! - **Power**: reset actions plus waits for the real outcome, see [`PowerController`]
//! - **POST detection**: entry/exit of power-on self test, see [`PostDetector`]
//! - **Settings**: pending BIOS settings and commit detection, see [`SettingsWatcher`]
//! - **Boot order**: validation and write of a planned order, see [`BootOrderReconciler`]
//! - **Tasks**: polling of asynchronous controller jobs, see [`TaskPoller`]
//!
//! All of them talk to the controller through the [`ManagementSession`]
//! trait; [`RedfishSession`] is the HTTP implementation.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use bmcwarden_bmc::{ApplyPolicy, EndpointLocks, HostEngine, RedfishConfig, RedfishSession, ResetType};
//!
//! # async fn example() -> bmcwarden_bmc::Result<()> {
//! let config = RedfishConfig::new("10.0.0.5", "root", "calvin").with_insecure(true);
//! let session = RedfishSession::connect(config).await?;
//! let engine = HostEngine::new(Arc::new(session), EndpointLocks::new());
//!
//! let planned = vec![
//!     "BIOS.Setup.1-1#UefiBootSeq#NIC.PxeDevice.1-1#0f6e".to_string(),
//!     "BIOS.Setup.1-1#UefiBootSeq#HardDisk.List.1-1#c9a2".to_string(),
//! ];
//!
//! let guard = engine.lock().await;
//! engine
//!     .validate_and_apply_boot_order(
//!         &planned,
//!         Some(ApplyPolicy {
//!             reset_type: ResetType::ForceRestart,
//!             timeout: Duration::from_secs(1800),
//!         }),
//!     )
//!     .await?;
//! engine.unlock(guard);
//! # Ok(())
//! # }
//! ```

pub mod boot_order;
pub mod config;
mod deadline;
pub mod engine;
pub mod error;
pub mod locks;
#[cfg(test)]
mod mock;
pub mod post;
pub mod power;
pub mod redfish;
pub mod session;
pub mod settings;
pub mod task;
pub mod types;
pub mod volume;

pub use boot_order::{reorder, validate_plan, BootOrderReconciler};
pub use config::{PollTiming, RedfishConfig};
pub use engine::{ApplyPolicy, HostEngine, HostStatus};
pub use error::{BmcError, BootOrderError, Result};
pub use locks::{EndpointGuard, EndpointLocks};
pub use post::PostDetector;
pub use power::PowerController;
pub use redfish::RedfishSession;
pub use session::{ManagementSession, OemNamespace};
pub use settings::{commit_finished, SettingsWatcher};
pub use task::TaskPoller;
pub use types::{
    BootOption, BootOrder, PowerState, ResetType, SettingsResource, SettingsSnapshot,
    TaskSnapshot, TaskState, VolumeRequest,
};
pub use volume::VolumeProvisioner;
