//! Firmware update flow driven by the desired-version command

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use common::*;
use lwgw_core::{Device, GatewayError, WireValue};
use lwgw_gateway::{FirmwareOutcome, FirmwareUpdateOrchestrator, GatewaySettings};

fn firmware_device(endpoint: &str) -> serde_json::Value {
    document(
        "d1",
        "thermo",
        endpoint,
        vec![
            firmware("fw_state", "state"),
            firmware("fw_update", "update"),
            mapped("version", "dynamic", "string", "/3/0/3"),
        ],
    )
}

async fn bound(h: &Harness, secure: bool) {
    h.directory.insert(TENANT, firmware_device("E1"));
    h.engine
        .handle_northbound(&lifecycle("create", firmware_device("E1")))
        .await
        .unwrap();
    h.engine
        .on_registered(session("reg-1", "E1").with_secure(secure), None)
        .await
        .unwrap();
}

fn package_writes(h: &Harness) -> Vec<Call> {
    h.protocol
        .writes()
        .into_iter()
        .filter(|c| matches!(c, Call::Write(_, path, _) if path == "/5/0/1"))
        .collect()
}

fn desired(version: &str) -> lwgw_core::NorthboundEvent {
    lifecycle(
        "configure",
        json!({"id": "d1", "attrs": {"desirable_fw_version": version}}),
    )
}

#[tokio::test]
async fn same_version_writes_nothing() {
    let h = Harness::new();
    bound(&h, false).await;
    h.protocol.set_resource("/3/0/3", WireValue::String("1.0".into()));

    h.engine.handle_northbound(&desired("1.0")).await.unwrap();

    assert!(package_writes(&h).is_empty());
    assert!(h.images.downloads.lock().is_empty());
    assert!(h
        .protocol
        .calls()
        .contains(&Call::Read("E1".into(), "/3/0/3".into())));
}

#[tokio::test]
async fn new_version_delivers_insecure_uri_once() {
    let h = Harness::new();
    bound(&h, false).await;
    h.protocol.set_resource("/3/0/3", WireValue::String("1.0".into()));
    h.images.add("thermo", "1.1", "img-42");

    h.engine.handle_northbound(&desired("1.1")).await.unwrap();

    assert_eq!(
        package_writes(&h),
        vec![Call::Write(
            "E1".into(),
            "/5/0/1".into(),
            json!("coap://files.local:5693/data/img-42.hex")
        )]
    );
    assert_eq!(
        *h.images.downloads.lock(),
        vec![("img-42".to_string(), "token-admin".to_string())]
    );
}

#[tokio::test]
async fn secure_session_gets_secure_uri() {
    let h = Harness::new();
    bound(&h, true).await;
    h.protocol.set_resource("/3/0/3", WireValue::String("1.0".into()));
    h.images.add("thermo", "1.1", "img-42");

    h.engine.handle_northbound(&desired("1.1")).await.unwrap();

    let writes = package_writes(&h);
    assert_eq!(writes.len(), 1);
    let Call::Write(_, _, uri) = &writes[0] else {
        panic!("expected a write");
    };
    let uri = uri.as_str().unwrap();
    assert!(uri.starts_with("coaps://"));
    assert!(uri.contains(":5694/"));
    assert!(uri.contains("img-42"));
}

#[tokio::test]
async fn psk_device_gets_secure_uri_on_unflagged_session() {
    let h = Harness::new();
    let mut attrs = psk_attrs("0badc0de", "E1-id");
    attrs.push(firmware("fw_state", "state"));
    attrs.push(mapped("version", "dynamic", "string", "/3/0/3"));
    let doc = document("d1", "thermo", "E1", attrs);
    h.directory.insert(TENANT, doc.clone());
    h.engine.handle_northbound(&lifecycle("create", doc)).await.unwrap();
    h.engine.on_registered(session("reg-1", "E1"), None).await.unwrap();
    h.protocol.set_resource("/3/0/3", WireValue::String("1.0".into()));
    h.images.add("thermo", "1.1", "img-42");

    h.engine.handle_northbound(&desired("1.1")).await.unwrap();

    assert_eq!(
        package_writes(&h),
        vec![Call::Write(
            "E1".into(),
            "/5/0/1".into(),
            json!("coaps://files.local:5694/data/img-42.hex")
        )]
    );
}

#[tokio::test]
async fn missing_image_aborts_without_write() {
    let h = Harness::new();
    bound(&h, false).await;
    h.protocol.set_resource("/3/0/3", WireValue::String("1.0".into()));

    // The command itself completes; the firmware step is reported and dropped
    h.engine.handle_northbound(&desired("2.0")).await.unwrap();

    assert!(package_writes(&h).is_empty());
    assert!(h.images.downloads.lock().is_empty());
}

#[tokio::test]
async fn orchestrator_reports_outcomes() {
    let h = Harness::new();
    bound(&h, false).await;
    h.protocol.set_resource("/3/0/3", WireValue::Opaque(b"1.0".to_vec()));
    h.images.add("thermo", "1.1", "img-7");

    let orchestrator = FirmwareUpdateOrchestrator::new(
        h.engine.registry().clone(),
        h.protocol.clone(),
        h.images.clone(),
        std::sync::Arc::new(FakeTokens),
        &GatewaySettings::default(),
    );
    let device = Device::from_document(&firmware_device("E1"), TENANT).unwrap();

    assert_eq!(
        orchestrator.apply_desired_version("E1", "1.0", &device).await.unwrap(),
        FirmwareOutcome::AlreadyCurrent
    );
    assert_eq!(
        orchestrator.apply_desired_version("E1", "1.1", &device).await.unwrap(),
        FirmwareOutcome::UriDelivered {
            image_id: "img-7".into(),
            uri: "coap://files.local:5693/data/img-7.hex".into(),
        }
    );

    let err = orchestrator
        .apply_desired_version("E1", "9.9", &device)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::ImageNotFound { .. }));

    let err = orchestrator
        .apply_desired_version("E2", "1.1", &device)
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::NotRegistered(_)));
}

#[tokio::test]
async fn update_trigger_is_an_execute() {
    let h = Harness::new();
    bound(&h, false).await;

    h.engine
        .handle_northbound(&lifecycle("configure", json!({"id": "d1", "attrs": {"fw_update": ""}})))
        .await
        .unwrap();

    assert_eq!(
        h.protocol.writes(),
        vec![Call::Execute("E1".into(), "/5/0/2".into(), Some(String::new()))]
    );
}
