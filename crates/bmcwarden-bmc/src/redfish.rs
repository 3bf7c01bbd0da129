//! Redfish session over HTTPS
//!
//! Implements [`ManagementSession`] against an iDRAC-style Redfish service.
//! Every read goes to the controller; nothing is cached except the OEM
//! namespace, which is probed once in [`RedfishSession::connect`].

use async_trait::async_trait;
use reqwest::header::{ETAG, IF_MATCH, LOCATION};
use reqwest::{Method, Response, StatusCode};
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::config::RedfishConfig;
use crate::error::{BmcError, Result};
use crate::session::{ManagementSession, OemNamespace};
use crate::types::{
    BootOption, BootOrder, PowerState, ResetType, SettingsResource, SettingsSnapshot, TaskSnapshot,
    TaskState, VolumeRequest,
};

/// Boot sequence attributes, in order of preference
const BOOT_SEQUENCE_ATTRIBUTES: [&str; 2] = ["UefiBootSeq", "BootSeq"];

/// Redfish REST API session
#[derive(Debug)]
pub struct RedfishSession {
    config: RedfishConfig,
    client: reqwest::Client,
    base_url: String,
    identity: String,
    oem: OemNamespace,
}

impl RedfishSession {
    /// Create a session with a known OEM namespace, without touching the network
    pub fn new(config: RedfishConfig, oem: OemNamespace) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(config.insecure)
            .timeout(config.request_timeout)
            .build()?;
        let base_url = config.base_url();
        let identity = config.endpoint_identity();
        Ok(Self {
            config,
            client,
            base_url,
            identity,
            oem,
        })
    }

    /// Create a session and resolve the controller's OEM namespace
    pub async fn connect(config: RedfishConfig) -> Result<Self> {
        let mut session = Self::new(config, OemNamespace::Managers)?;
        session.oem = session.detect_oem_namespace().await?;
        info!(
            endpoint = %session.identity,
            oem = %session.oem,
            "Connected to Redfish service"
        );
        Ok(session)
    }

    pub fn oem_namespace(&self) -> OemNamespace {
        self.oem
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn system_path(&self) -> String {
        format!("/redfish/v1/Systems/{}", self.config.system_id)
    }

    fn settings_path(&self, resource: SettingsResource) -> String {
        match resource {
            SettingsResource::Bios => format!("{}/Bios/Settings", self.system_path()),
            SettingsResource::BootSources => format!("{}/BootSources/Settings", self.system_path()),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        etag: Option<&str>,
    ) -> Result<Response> {
        let url = self.url(path);
        debug!(method = %method, url = %url, "Redfish request");
        let mut request = self
            .client
            .request(method, &url)
            .basic_auth(&self.config.username, Some(&self.config.password));
        if let Some(body) = body {
            request = request.json(body);
        }
        if let Some(etag) = etag {
            request = request.header(IF_MATCH, etag);
        }
        Ok(request.send().await?)
    }

    /// Send a request and fail on any non-success status
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        etag: Option<&str>,
    ) -> Result<Response> {
        let response = self.execute(method.clone(), path, body, etag).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(BmcError::Http {
            method: method.to_string(),
            url: self.url(path),
            status: status.as_u16(),
            body,
        })
    }

    /// GET a resource, returning its JSON body and entity tag
    async fn get_json(&self, path: &str) -> Result<(Value, Option<String>)> {
        let response = self.send(Method::GET, path, None, None).await?;
        let header_etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = read_json(response).await?;
        let etag = header_etag.or_else(|| {
            body.get("@odata.etag")
                .and_then(Value::as_str)
                .map(str::to_string)
        });
        Ok((body, etag))
    }

    /// Send a request answered with a task reference in `Location`
    async fn send_for_task(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<String>> {
        let response = self.send(method, path, body, None).await?;
        Ok(response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string))
    }

    async fn detect_oem_namespace(&self) -> Result<OemNamespace> {
        let path = OemNamespace::Managers.lc_service_path(&self.config.manager_id);
        let response = self.execute(Method::GET, &path, None, None).await?;
        match response.status() {
            status if status.is_success() => Ok(OemNamespace::Managers),
            StatusCode::NOT_FOUND => Ok(OemNamespace::DellRoot),
            status => Err(BmcError::Http {
                method: Method::GET.to_string(),
                url: self.url(&path),
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

/// Decode a response body; a malformed body is a serialization error
async fn read_json(response: Response) -> Result<Value> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn string_field<'v>(body: &'v Value, field: &str, resource: &str) -> Result<&'v str> {
    body.get(field)
        .and_then(Value::as_str)
        .ok_or_else(|| BmcError::UnexpectedResponse {
            resource: resource.to_string(),
            reason: format!("missing string field {}", field),
        })
}

fn attributes_of(body: &Value) -> Option<Map<String, Value>> {
    body.get("Attributes").and_then(Value::as_object).cloned()
}

fn parse_boot_options(entries: &[Value]) -> Vec<BootOption> {
    entries
        .iter()
        .map(|entry| BootOption {
            device_name: entry
                .get("Name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            id: entry
                .get("Id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            enabled: entry.get("Enabled").and_then(Value::as_bool).unwrap_or(true),
        })
        .collect()
}

#[async_trait]
impl ManagementSession for RedfishSession {
    fn endpoint(&self) -> &str {
        &self.identity
    }

    async fn get_power_state(&self) -> Result<PowerState> {
        let path = self.system_path();
        let (body, _) = self.get_json(&path).await?;
        let raw = string_field(&body, "PowerState", &path)?;
        PowerState::from_redfish(raw).ok_or_else(|| BmcError::UnexpectedResponse {
            resource: path.clone(),
            reason: format!("unknown power state {}", raw),
        })
    }

    async fn get_post_state(&self) -> Result<bool> {
        let path = self.oem.remote_services_status_path(&self.config.manager_id);
        let response = self
            .send(Method::POST, &path, Some(&json!({})), None)
            .await?;
        let body = read_json(response).await?;
        let status = string_field(&body, "ServerStatus", &path)?;
        Ok(status == "InPOST")
    }

    async fn reset(&self, reset_type: ResetType) -> Result<()> {
        let path = format!("{}/Actions/ComputerSystem.Reset", self.system_path());
        self.send(
            Method::POST,
            &path,
            Some(&json!({ "ResetType": reset_type.as_str() })),
            None,
        )
        .await?;
        Ok(())
    }

    async fn get_pending_settings(&self, resource: SettingsResource) -> Result<SettingsSnapshot> {
        let (body, etag) = self.get_json(&self.settings_path(resource)).await?;
        Ok(SettingsSnapshot {
            attributes: attributes_of(&body).unwrap_or_default(),
            etag,
        })
    }

    async fn patch_pending_settings(
        &self,
        resource: SettingsResource,
        attributes: Map<String, Value>,
        etag: Option<&str>,
    ) -> Result<()> {
        let body = json!({ "Attributes": attributes });
        self.send(Method::PATCH, &self.settings_path(resource), Some(&body), etag)
            .await?;
        Ok(())
    }

    async fn get_bios_attributes(&self) -> Result<Map<String, Value>> {
        let path = format!("{}/Bios", self.system_path());
        let (body, _) = self.get_json(&path).await?;
        attributes_of(&body).ok_or_else(|| BmcError::UnexpectedResponse {
            resource: path,
            reason: "missing Attributes".to_string(),
        })
    }

    async fn get_boot_order(&self) -> Result<Option<BootOrder>> {
        let path = format!("{}/BootSources", self.system_path());
        let (body, _) = self.get_json(&path).await?;
        let attributes = attributes_of(&body).unwrap_or_default();

        let found = BOOT_SEQUENCE_ATTRIBUTES.iter().find_map(|name| {
            attributes
                .get(*name)
                .and_then(Value::as_array)
                .map(|entries| (name.to_string(), parse_boot_options(entries)))
        });
        let Some((attribute, options)) = found else {
            return Ok(None);
        };

        // Writes go to the settings resource, so its tag guards them.
        let (_, etag) = self
            .get_json(&self.settings_path(SettingsResource::BootSources))
            .await?;
        Ok(Some(BootOrder {
            attribute,
            options,
            etag,
        }))
    }

    async fn get_task(&self, location: &str) -> Result<TaskSnapshot> {
        let (body, _) = self.get_json(location).await?;
        let state = TaskState::from_redfish(string_field(&body, "TaskState", location)?);
        let log_location = body
            .pointer("/Links/Log/@odata.id")
            .and_then(Value::as_str)
            .map(str::to_string);
        Ok(TaskSnapshot {
            state,
            log_location,
        })
    }

    async fn get_task_log(&self, location: &str) -> Result<Vec<u8>> {
        let response = self.send(Method::GET, location, None, None).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn create_volume(
        &self,
        controller: &str,
        request: &VolumeRequest,
    ) -> Result<Option<String>> {
        let path = format!("{}/Storage/{}/Volumes", self.system_path(), controller);
        self.send_for_task(Method::POST, &path, Some(&request.to_body()))
            .await
    }

    async fn delete_volume(&self, volume: &str) -> Result<Option<String>> {
        self.send_for_task(Method::DELETE, volume, None).await
    }
}
