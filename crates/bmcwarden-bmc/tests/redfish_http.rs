//! RedfishSession against an in-process fake controller
//!
//! The fake serves the handful of iDRAC resources the engine touches and
//! records every mutating request so the wire format can be checked.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use bmcwarden_bmc::{
    BmcError, BootOrderReconciler, EndpointLocks, HostEngine, ManagementSession, OemNamespace,
    PowerState, RedfishConfig, RedfishSession, ResetType, SettingsResource, TaskState,
    VolumeRequest,
};

const SYSTEM: &str = "/redfish/v1/Systems/System.Embedded.1";
const LC_STATUS: &str = "/redfish/v1/Dell/Managers/iDRAC.Embedded.1/DellLCService/Actions/DellLCService.GetRemoteServicesAPIStatus";
const TASK: &str = "/redfish/v1/TaskService/Tasks/JID_471269252011";
const TASK_HTML: &str = "/redfish/v1/TaskService/Tasks/JID_502";

#[derive(Default)]
struct Recorded {
    resets: Vec<Value>,
    patches: Vec<(String, Option<String>, Value)>,
    volumes: Vec<Value>,
    unauthenticated: usize,
}

type Shared = Arc<Mutex<Recorded>>;

fn check_auth(state: &Shared, headers: &HeaderMap) {
    if !headers.contains_key(header::AUTHORIZATION) {
        state.lock().unwrap().unauthenticated += 1;
    }
}

async fn system(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    check_auth(&state, &headers);
    Json(json!({ "Id": "System.Embedded.1", "PowerState": "On" }))
}

async fn lc_status(State(state): State<Shared>, headers: HeaderMap) -> Json<Value> {
    check_auth(&state, &headers);
    Json(json!({ "ServerStatus": "InPOST", "Status": "NotReady" }))
}

async fn reset(State(state): State<Shared>, Json(body): Json<Value>) -> StatusCode {
    state.lock().unwrap().resets.push(body);
    StatusCode::NO_CONTENT
}

async fn bios() -> Json<Value> {
    Json(json!({ "Attributes": { "BootMode": "Uefi", "LogicalProc": "Enabled" } }))
}

async fn bios_settings() -> impl IntoResponse {
    (
        [(header::ETAG, "W/\"bios-12\"")],
        Json(json!({ "Attributes": { "LogicalProc": "Disabled" } })),
    )
}

async fn patch_bios_settings(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let if_match = headers
        .get(header::IF_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .lock()
        .unwrap()
        .patches
        .push(("Bios".to_string(), if_match, body));
    StatusCode::OK
}

async fn boot_sources() -> Json<Value> {
    Json(json!({
        "Attributes": {
            "UefiBootSeq": [
                { "Enabled": true, "Id": "BIOS.Setup.1-1#UefiBootSeq#NIC.PxeDevice.1-1#0f6e", "Index": 0, "Name": "NIC.PxeDevice.1-1" },
                { "Enabled": false, "Id": "BIOS.Setup.1-1#UefiBootSeq#HardDisk.List.1-1#c9a2", "Index": 1, "Name": "HardDisk.List.1-1" }
            ]
        }
    }))
}

async fn boot_sources_settings() -> Json<Value> {
    Json(json!({ "@odata.etag": "W/\"gen-3\"", "Attributes": {} }))
}

async fn patch_boot_sources_settings(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    let if_match = headers
        .get(header::IF_MATCH)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state
        .lock()
        .unwrap()
        .patches
        .push(("BootSources".to_string(), if_match, body));
    StatusCode::OK
}

async fn task() -> Json<Value> {
    Json(json!({
        "Id": "JID_471269252011",
        "TaskState": "Exception",
        "Links": { "Log": { "@odata.id": format!("{}/Log", TASK) } }
    }))
}

async fn task_html() -> &'static str {
    "<html><body>Service Unavailable</body></html>"
}

async fn task_log() -> &'static str {
    "SYS011: RAID configuration failed"
}

async fn create_volume(State(state): State<Shared>, Json(body): Json<Value>) -> impl IntoResponse {
    state.lock().unwrap().volumes.push(body);
    (StatusCode::ACCEPTED, [(header::LOCATION, TASK)])
}

fn app(state: Shared) -> Router {
    Router::new()
        .route(SYSTEM, get(system))
        .route(LC_STATUS, post(lc_status))
        .route(&format!("{}/Actions/ComputerSystem.Reset", SYSTEM), post(reset))
        .route(&format!("{}/Bios", SYSTEM), get(bios))
        .route(
            &format!("{}/Bios/Settings", SYSTEM),
            get(bios_settings).patch(patch_bios_settings),
        )
        .route(&format!("{}/BootSources", SYSTEM), get(boot_sources))
        .route(
            &format!("{}/BootSources/Settings", SYSTEM),
            get(boot_sources_settings).patch(patch_boot_sources_settings),
        )
        .route(
            &format!("{}/Storage/RAID.Integrated.1-1/Volumes", SYSTEM),
            post(create_volume),
        )
        .route(TASK, get(task))
        .route(TASK_HTML, get(task_html))
        .route(&format!("{}/Log", TASK), get(task_log))
        .with_state(state)
}

async fn start() -> (RedfishSession, Shared) {
    let state = Shared::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let config = RedfishConfig::new(format!("http://{}", addr), "root", "calvin")
        .with_request_timeout(Duration::from_secs(5));
    let session = RedfishSession::connect(config).await.unwrap();
    (session, state)
}

#[tokio::test]
async fn test_missing_manager_oem_node_selects_dell_root() {
    let (session, _) = start().await;
    assert_eq!(session.oem_namespace(), OemNamespace::DellRoot);
}

#[tokio::test]
async fn test_power_and_post_reads() {
    let (session, state) = start().await;

    assert_eq!(session.get_power_state().await.unwrap(), PowerState::On);
    assert!(session.get_post_state().await.unwrap());
    assert_eq!(state.lock().unwrap().unauthenticated, 0);
}

#[tokio::test]
async fn test_reset_body() {
    let (session, state) = start().await;

    session.reset(ResetType::GracefulRestart).await.unwrap();
    assert_eq!(
        state.lock().unwrap().resets,
        vec![json!({ "ResetType": "GracefulRestart" })]
    );
}

#[tokio::test]
async fn test_pending_settings_carry_etag() {
    let (session, state) = start().await;

    let pending = session
        .get_pending_settings(SettingsResource::Bios)
        .await
        .unwrap();
    assert_eq!(pending.attributes.len(), 1);
    assert_eq!(pending.etag.as_deref(), Some("W/\"bios-12\""));

    let mut attributes = serde_json::Map::new();
    attributes.insert("LogicalProc".into(), json!("Disabled"));
    session
        .patch_pending_settings(SettingsResource::Bios, attributes, pending.etag.as_deref())
        .await
        .unwrap();

    let recorded = state.lock().unwrap();
    let (resource, if_match, body) = &recorded.patches[0];
    assert_eq!(resource, "Bios");
    assert_eq!(if_match.as_deref(), Some("W/\"bios-12\""));
    assert_eq!(body, &json!({ "Attributes": { "LogicalProc": "Disabled" } }));
}

#[tokio::test]
async fn test_boot_order_write() {
    let (session, state) = start().await;

    let current = session.get_boot_order().await.unwrap().unwrap();
    assert_eq!(current.attribute, "UefiBootSeq");
    assert_eq!(current.etag.as_deref(), Some("W/\"gen-3\""));
    assert!(!current.options[1].enabled);

    let planned: Vec<String> = current.ids().into_iter().rev().collect();
    assert!(BootOrderReconciler::new(&session)
        .validate_and_apply(&planned)
        .await
        .unwrap());

    let recorded = state.lock().unwrap();
    let (resource, if_match, body) = &recorded.patches[0];
    assert_eq!(resource, "BootSources");
    assert_eq!(if_match.as_deref(), Some("W/\"gen-3\""));
    assert_eq!(
        body["Attributes"]["UefiBootSeq"][0],
        json!({
            "Enabled": false,
            "Id": "BIOS.Setup.1-1#UefiBootSeq#HardDisk.List.1-1#c9a2",
            "Index": 0,
            "Name": "HardDisk.List.1-1"
        })
    );
}

#[tokio::test]
async fn test_failed_volume_task_reports_log() {
    let (session, state) = start().await;

    let snapshot = session.get_task(TASK).await.unwrap();
    assert_eq!(snapshot.state, TaskState::Failed("Exception".into()));

    let engine = HostEngine::new(Arc::new(session), EndpointLocks::new());
    let request = VolumeRequest::new("data", "RAID1")
        .with_drive(format!("{}/Storage/RAID.Integrated.1-1/Drives/Disk.Bay.0", SYSTEM));
    let err = engine
        .create_volume("RAID.Integrated.1-1", &request, Duration::from_secs(30))
        .await
        .unwrap_err();

    match err {
        BmcError::TaskFailed { state, log, .. } => {
            assert_eq!(state, "Exception");
            assert_eq!(log.as_deref(), Some("SYS011: RAID configuration failed"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(state.lock().unwrap().volumes[0]["RAIDType"], "RAID1");
}

#[tokio::test]
async fn test_http_error_status() {
    let (session, _) = start().await;

    let err = session
        .get_task("/redfish/v1/TaskService/Tasks/JID_0")
        .await
        .unwrap_err();
    assert!(matches!(err, BmcError::Http { status: 404, .. }));
}

#[tokio::test]
async fn test_malformed_body_is_serialization_error() {
    let (session, _) = start().await;

    let err = session.get_task(TASK_HTML).await.unwrap_err();
    assert!(matches!(err, BmcError::Serialization(_)), "unexpected error: {err}");
}
