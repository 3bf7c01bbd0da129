//! Scripted controller for engine tests
//!
//! Models a host whose power and POST indicators change as a function of
//! time since the last reset. Tests run on tokio's paused clock, so a reset
//! that "takes" ninety seconds completes instantly.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::time::Instant;

use crate::error::{BmcError, Result};
use crate::session::ManagementSession;
use crate::types::{
    BootOption, BootOrder, PowerState, ResetType, SettingsResource, SettingsSnapshot, TaskSnapshot,
    TaskState, VolumeRequest,
};

/// How the simulated host reacts to a reset
#[derive(Debug, Clone, Copy)]
pub(crate) struct HostProfile {
    /// Reset to POST entry
    pub post_delay: Duration,
    /// Time spent in POST
    pub post_duration: Duration,
    /// Reset to power off, for power-off resets
    pub off_delay: Duration,
    /// Host drops to off once POST completes
    pub off_after_post: bool,
}

impl Default for HostProfile {
    fn default() -> Self {
        Self {
            post_delay: Duration::from_secs(10),
            post_duration: Duration::from_secs(30),
            off_delay: Duration::from_secs(6),
            off_after_post: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Transition {
    Up(Instant),
    Down(Instant),
}

#[derive(Debug)]
struct Host {
    initial: PowerState,
    transition: Option<Transition>,
    profile: HostProfile,
}

impl Host {
    fn power(&self, now: Instant) -> PowerState {
        match self.transition {
            None => self.initial,
            Some(Transition::Up(at)) => {
                let post_start = at + self.profile.post_delay;
                let post_end = post_start + self.profile.post_duration;
                if now < post_start {
                    PowerState::PoweringOn
                } else if now >= post_end && self.profile.off_after_post {
                    PowerState::Off
                } else {
                    PowerState::On
                }
            }
            Some(Transition::Down(at)) => {
                if now < at + self.profile.off_delay {
                    PowerState::PoweringOff
                } else {
                    PowerState::Off
                }
            }
        }
    }

    fn in_post(&self, now: Instant) -> bool {
        match self.transition {
            Some(Transition::Up(at)) => {
                let post_start = at + self.profile.post_delay;
                now >= post_start && now < post_start + self.profile.post_duration
            }
            _ => false,
        }
    }
}

pub(crate) struct MockSession {
    host: Mutex<Host>,
    power_read_error: Mutex<Option<String>>,
    pending_sizes: Mutex<VecDeque<usize>>,
    bios: Map<String, Value>,
    boot: Mutex<Option<BootOrder>>,
    tasks: Mutex<HashMap<String, VecDeque<TaskState>>>,
    task_log: Mutex<Option<Vec<u8>>>,
    volume_task: Option<String>,
    resets: Mutex<Vec<ResetType>>,
    patches: Mutex<Vec<(SettingsResource, Map<String, Value>, Option<String>)>>,
    settings_reads: AtomicUsize,
    log_fetches: AtomicUsize,
    task_reads: AtomicUsize,
}

impl MockSession {
    pub fn new(initial: PowerState) -> Self {
        let mut bios = Map::new();
        for i in 0..20 {
            bios.insert(format!("Attr{}", i), Value::from("Enabled"));
        }
        bios.insert("BootMode".into(), Value::from("Uefi"));
        bios.insert("LogicalProc".into(), Value::from("Enabled"));
        Self {
            host: Mutex::new(Host {
                initial,
                transition: None,
                profile: HostProfile::default(),
            }),
            power_read_error: Mutex::new(None),
            pending_sizes: Mutex::new(VecDeque::new()),
            bios,
            boot: Mutex::new(None),
            tasks: Mutex::new(HashMap::new()),
            task_log: Mutex::new(Some(b"RAID init failed on Disk.0".to_vec())),
            volume_task: Some("/redfish/v1/TaskService/Tasks/JID_100".to_string()),
            resets: Mutex::new(Vec::new()),
            patches: Mutex::new(Vec::new()),
            settings_reads: AtomicUsize::new(0),
            log_fetches: AtomicUsize::new(0),
            task_reads: AtomicUsize::new(0),
        }
    }

    pub fn with_profile(self, profile: HostProfile) -> Self {
        self.host.lock().unwrap().profile = profile;
        self
    }

    pub fn with_power_read_error(self, message: &str) -> Self {
        *self.power_read_error.lock().unwrap() = Some(message.to_string());
        self
    }

    /// Attribute counts returned by successive pending-settings reads; the last one sticks
    pub fn with_pending_sizes(self, sizes: Vec<usize>) -> Self {
        *self.pending_sizes.lock().unwrap() = sizes.into();
        self
    }

    pub fn with_boot_order(self, options: Vec<BootOption>) -> Self {
        *self.boot.lock().unwrap() = Some(BootOrder {
            attribute: "UefiBootSeq".into(),
            options,
            etag: Some("W/\"gen-1\"".into()),
        });
        self
    }

    /// Successive states returned by reads of `location`; the last one sticks
    pub fn with_task(self, location: &str, states: Vec<TaskState>) -> Self {
        self.tasks
            .lock()
            .unwrap()
            .insert(location.to_string(), states.into());
        self
    }

    pub fn without_task_log(self) -> Self {
        *self.task_log.lock().unwrap() = None;
        self
    }

    pub fn without_volume_task(mut self) -> Self {
        self.volume_task = None;
        self
    }

    pub fn resets(&self) -> Vec<ResetType> {
        self.resets.lock().unwrap().clone()
    }

    pub fn patches(&self) -> Vec<(SettingsResource, Map<String, Value>, Option<String>)> {
        self.patches.lock().unwrap().clone()
    }

    pub fn settings_reads(&self) -> usize {
        self.settings_reads.load(Ordering::SeqCst)
    }

    pub fn log_fetches(&self) -> usize {
        self.log_fetches.load(Ordering::SeqCst)
    }

    pub fn task_reads(&self) -> usize {
        self.task_reads.load(Ordering::SeqCst)
    }

    pub fn boot_order(&self) -> Option<BootOrder> {
        self.boot.lock().unwrap().clone()
    }

    fn sized_attributes(size: usize) -> Map<String, Value> {
        (0..size)
            .map(|i| (format!("Attr{}", i), Value::from("Enabled")))
            .collect()
    }
}

fn pop_sticky<T: Clone>(queue: &mut VecDeque<T>) -> Option<T> {
    if queue.len() > 1 {
        queue.pop_front()
    } else {
        queue.front().cloned()
    }
}

#[async_trait]
impl ManagementSession for MockSession {
    fn endpoint(&self) -> &str {
        "mock-bmc"
    }

    async fn get_power_state(&self) -> Result<PowerState> {
        if let Some(message) = self.power_read_error.lock().unwrap().clone() {
            return Err(BmcError::Transport(message));
        }
        Ok(self.host.lock().unwrap().power(Instant::now()))
    }

    async fn get_post_state(&self) -> Result<bool> {
        Ok(self.host.lock().unwrap().in_post(Instant::now()))
    }

    async fn reset(&self, reset_type: ResetType) -> Result<()> {
        let now = Instant::now();
        let mut host = self.host.lock().unwrap();
        host.transition = Some(if reset_type.expects_power_on() {
            Transition::Up(now)
        } else {
            Transition::Down(now)
        });
        self.resets.lock().unwrap().push(reset_type);
        Ok(())
    }

    async fn get_pending_settings(&self, _resource: SettingsResource) -> Result<SettingsSnapshot> {
        self.settings_reads.fetch_add(1, Ordering::SeqCst);
        let attributes = match pop_sticky(&mut self.pending_sizes.lock().unwrap()) {
            Some(size) => Self::sized_attributes(size),
            None => self.bios.clone(),
        };
        Ok(SettingsSnapshot {
            attributes,
            etag: Some("W/\"bios-7\"".into()),
        })
    }

    async fn patch_pending_settings(
        &self,
        resource: SettingsResource,
        attributes: Map<String, Value>,
        etag: Option<&str>,
    ) -> Result<()> {
        if resource == SettingsResource::BootSources {
            let mut boot = self.boot.lock().unwrap();
            if let Some(order) = boot.as_mut() {
                if let Some(Value::Array(entries)) = attributes.get(&order.attribute) {
                    order.options = entries
                        .iter()
                        .map(|e| BootOption {
                            device_name: e["Name"].as_str().unwrap_or_default().to_string(),
                            id: e["Id"].as_str().unwrap_or_default().to_string(),
                            enabled: e["Enabled"].as_bool().unwrap_or(false),
                        })
                        .collect();
                }
            }
        }
        self.patches
            .lock()
            .unwrap()
            .push((resource, attributes, etag.map(str::to_string)));
        Ok(())
    }

    async fn get_bios_attributes(&self) -> Result<Map<String, Value>> {
        Ok(self.bios.clone())
    }

    async fn get_boot_order(&self) -> Result<Option<BootOrder>> {
        Ok(self.boot.lock().unwrap().clone())
    }

    async fn get_task(&self, location: &str) -> Result<TaskSnapshot> {
        self.task_reads.fetch_add(1, Ordering::SeqCst);
        let mut tasks = self.tasks.lock().unwrap();
        let queue = tasks.get_mut(location).ok_or_else(|| BmcError::Http {
            method: "GET".into(),
            url: location.to_string(),
            status: 404,
            body: String::new(),
        })?;
        let state = pop_sticky(queue).unwrap_or(TaskState::Running);
        Ok(TaskSnapshot {
            state,
            log_location: Some(format!("{}/Log", location)),
        })
    }

    async fn get_task_log(&self, location: &str) -> Result<Vec<u8>> {
        self.log_fetches.fetch_add(1, Ordering::SeqCst);
        self.task_log.lock().unwrap().clone().ok_or_else(|| BmcError::Http {
            method: "GET".into(),
            url: location.to_string(),
            status: 404,
            body: String::new(),
        })
    }

    async fn create_volume(
        &self,
        _controller: &str,
        _request: &VolumeRequest,
    ) -> Result<Option<String>> {
        Ok(self.volume_task.clone())
    }

    async fn delete_volume(&self, _volume: &str) -> Result<Option<String>> {
        Ok(self.volume_task.clone())
    }
}

/// Three boot options as iDRAC reports them
pub(crate) fn sample_boot_options() -> Vec<BootOption> {
    vec![
        BootOption::new("NIC.PxeDevice.1-1", "BIOS.Setup.1-1#UefiBootSeq#NIC.PxeDevice.1-1#0f6e"),
        BootOption::new("HardDisk.List.1-1", "BIOS.Setup.1-1#UefiBootSeq#HardDisk.List.1-1#c9a2"),
        BootOption::new("Optical.iDRACVirtual.1-1", "BIOS.Setup.1-1#UefiBootSeq#Optical.iDRACVirtual.1-1#77d1"),
    ]
}
