//! Common types for BMC operations

use serde_json::{Map, Value};

/// Power state of a host as reported by the system resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Host is powered on
    On,
    /// Host is powered off
    Off,
    /// Power-on requested, not yet reached
    PoweringOn,
    /// Power-off requested, not yet reached
    PoweringOff,
}

impl PowerState {
    /// Parse the Redfish `PowerState` property
    pub fn from_redfish(value: &str) -> Option<Self> {
        match value {
            "On" => Some(PowerState::On),
            "Off" => Some(PowerState::Off),
            "PoweringOn" => Some(PowerState::PoweringOn),
            "PoweringOff" => Some(PowerState::PoweringOff),
            _ => None,
        }
    }

    pub fn is_on(self) -> bool {
        self == PowerState::On
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PowerState::On => write!(f, "on"),
            PowerState::Off => write!(f, "off"),
            PowerState::PoweringOn => write!(f, "powering on"),
            PowerState::PoweringOff => write!(f, "powering off"),
        }
    }
}

/// `ComputerSystem.Reset` reset types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetType {
    On,
    ForceOn,
    ForceOff,
    GracefulShutdown,
    GracefulRestart,
    ForceRestart,
    PowerCycle,
    PushPowerButton,
    Nmi,
}

impl ResetType {
    /// Wire name of the reset type
    pub fn as_str(self) -> &'static str {
        match self {
            ResetType::On => "On",
            ResetType::ForceOn => "ForceOn",
            ResetType::ForceOff => "ForceOff",
            ResetType::GracefulShutdown => "GracefulShutdown",
            ResetType::GracefulRestart => "GracefulRestart",
            ResetType::ForceRestart => "ForceRestart",
            ResetType::PowerCycle => "PowerCycle",
            ResetType::PushPowerButton => "PushPowerButton",
            ResetType::Nmi => "Nmi",
        }
    }

    /// Whether the host is expected to be on once this reset completes
    pub fn expects_power_on(self) -> bool {
        !matches!(
            self,
            ResetType::GracefulShutdown | ResetType::PushPowerButton | ResetType::ForceOff
        )
    }
}

impl std::fmt::Display for ResetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResetType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let reset = match s {
            "On" => ResetType::On,
            "ForceOn" => ResetType::ForceOn,
            "ForceOff" => ResetType::ForceOff,
            "GracefulShutdown" => ResetType::GracefulShutdown,
            "GracefulRestart" => ResetType::GracefulRestart,
            "ForceRestart" => ResetType::ForceRestart,
            "PowerCycle" => ResetType::PowerCycle,
            "PushPowerButton" => ResetType::PushPowerButton,
            "Nmi" => ResetType::Nmi,
            other => return Err(format!("unknown reset type: {}", other)),
        };
        Ok(reset)
    }
}

/// Pending-settings resources that accept attribute patches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsResource {
    /// `Bios/Settings`
    Bios,
    /// `BootSources/Settings`
    BootSources,
}

/// Attribute collection read from a settings resource, with its entity tag
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsSnapshot {
    pub attributes: Map<String, Value>,
    pub etag: Option<String>,
}

/// One entry of a boot sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootOption {
    /// Human-readable device name (e.g. `NIC.PxeDevice.1-1`)
    pub device_name: String,
    /// Structured boot string identifying the entry
    pub id: String,
    pub enabled: bool,
}

impl BootOption {
    pub fn new(device_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            device_name: device_name.into(),
            id: id.into(),
            enabled: true,
        }
    }
}

/// Current boot sequence as read from the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootOrder {
    /// Attribute carrying the sequence (`UefiBootSeq` or `BootSeq`)
    pub attribute: String,
    pub options: Vec<BootOption>,
    pub etag: Option<String>,
}

impl BootOrder {
    /// Structured boot strings in current order
    pub fn ids(&self) -> Vec<String> {
        self.options.iter().map(|o| o.id.clone()).collect()
    }

    pub fn find(&self, id: &str) -> Option<&BootOption> {
        self.options.iter().find(|o| o.id == id)
    }
}

/// Task state collapsed to what the poller acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskState {
    Running,
    Succeeded,
    /// Failure terminal state, carrying the name the controller reported
    Failed(String),
}

impl TaskState {
    /// Collapse a Redfish `TaskState` value
    pub fn from_redfish(value: &str) -> Self {
        match value {
            "Completed" => TaskState::Succeeded,
            "Exception" | "Killed" | "Cancelled" | "Interrupted" | "Failed" => {
                TaskState::Failed(value.to_string())
            }
            _ => TaskState::Running,
        }
    }
}

/// A single read of a task resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub state: TaskState,
    /// Log sub-resource, if the controller advertises one
    pub log_location: Option<String>,
}

/// Parameters of a volume create request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeRequest {
    pub name: String,
    pub raid_type: String,
    /// Drive resource URIs
    pub drives: Vec<String>,
}

impl VolumeRequest {
    pub fn new(name: impl Into<String>, raid_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raid_type: raid_type.into(),
            drives: Vec::new(),
        }
    }

    pub fn with_drive(mut self, drive: impl Into<String>) -> Self {
        self.drives.push(drive.into());
        self
    }

    /// Request body in the `Volume` schema shape
    pub fn to_body(&self) -> Value {
        let links: Vec<Value> = self
            .drives
            .iter()
            .map(|d| serde_json::json!({ "@odata.id": d }))
            .collect();
        serde_json::json!({
            "Name": self.name,
            "RAIDType": self.raid_type,
            "Links": { "Drives": links },
        })
    }
}
