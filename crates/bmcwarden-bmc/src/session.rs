//! Management session trait
//!
//! The engine never talks HTTP directly. Everything it needs from the
//! controller goes through [`ManagementSession`], so the polling algorithms
//! can be driven by [`crate::RedfishSession`] in production and by a scripted
//! host model in tests.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::types::{
    BootOrder, PowerState, ResetType, SettingsResource, SettingsSnapshot, TaskSnapshot,
    VolumeRequest,
};

/// Primitives the engine consumes from a connected controller session
///
/// Reads are never cached: every call is a fresh fetch.
#[async_trait]
pub trait ManagementSession: Send + Sync {
    /// Controller identity used as the lock key
    fn endpoint(&self) -> &str;

    /// Read the system power indicator
    async fn get_power_state(&self) -> Result<PowerState>;

    /// Read the vendor POST indicator; `true` while BIOS is in POST
    async fn get_post_state(&self) -> Result<bool>;

    /// Issue a `ComputerSystem.Reset` action
    async fn reset(&self, reset_type: ResetType) -> Result<()>;

    /// Read the attribute collection of a pending-settings resource
    async fn get_pending_settings(&self, resource: SettingsResource) -> Result<SettingsSnapshot>;

    /// Patch a pending-settings resource, guarded by its entity tag
    async fn patch_pending_settings(
        &self,
        resource: SettingsResource,
        attributes: Map<String, Value>,
        etag: Option<&str>,
    ) -> Result<()>;

    /// Read the currently effective BIOS attributes
    async fn get_bios_attributes(&self) -> Result<Map<String, Value>>;

    /// Read the boot sequence; `None` when no boot-order attribute exists
    async fn get_boot_order(&self) -> Result<Option<BootOrder>>;

    /// Read a task resource
    async fn get_task(&self, location: &str) -> Result<TaskSnapshot>;

    /// Fetch a task log blob
    async fn get_task_log(&self, location: &str) -> Result<Vec<u8>>;

    /// Request a volume on a storage controller; returns the task location
    async fn create_volume(&self, controller: &str, request: &VolumeRequest)
        -> Result<Option<String>>;

    /// Request deletion of a volume; returns the task location
    async fn delete_volume(&self, volume: &str) -> Result<Option<String>>;
}

/// Where a controller exposes its Dell OEM services
///
/// Older firmware nests them under the manager's `Oem/Dell` node, newer
/// firmware under a `/redfish/v1/Dell` root. Resolved once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OemNamespace {
    /// `/redfish/v1/Managers/{id}/Oem/Dell/...`
    Managers,
    /// `/redfish/v1/Dell/Managers/{id}/...`
    DellRoot,
}

impl OemNamespace {
    /// Path of the Lifecycle Controller service for `manager_id`
    pub fn lc_service_path(self, manager_id: &str) -> String {
        match self {
            OemNamespace::Managers => {
                format!("/redfish/v1/Managers/{}/Oem/Dell/DellLCService", manager_id)
            }
            OemNamespace::DellRoot => {
                format!("/redfish/v1/Dell/Managers/{}/DellLCService", manager_id)
            }
        }
    }

    /// Action that reports whether the host is in POST
    pub fn remote_services_status_path(self, manager_id: &str) -> String {
        format!(
            "{}/Actions/DellLCService.GetRemoteServicesAPIStatus",
            self.lc_service_path(manager_id)
        )
    }
}

impl std::fmt::Display for OemNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OemNamespace::Managers => write!(f, "managers"),
            OemNamespace::DellRoot => write!(f, "dell-root"),
        }
    }
}
