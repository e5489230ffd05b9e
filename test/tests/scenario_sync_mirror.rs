//! Local mutations mirrored to the server on the tick, and everything that
//! must never be mirrored.

use std::thread::sleep;
use std::time::Duration;

use scenesync_client::{Client, ClientConfig, ClientEvent};
use scenesync_test::helpers::frames;
use scenesync_test::helpers::mock_transport::{MockTransport, TransportHandle};
use serde_json::json;

fn connected_client() -> (Client, TransportHandle) {
    let (transport, handle) = MockTransport::create();
    let config = ClientConfig {
        url: "ws://localhost:9001".to_owned(),
        auto_reconnect: false,
        tick_interval: Duration::from_millis(1),
        ..ClientConfig::default()
    };
    let mut client = Client::new(config, transport);
    client.connect();
    handle.open();
    client.receive();
    client.subscribe("r");
    handle.deliver(frames::full_frame("r", 1.0, false, json!({"entities": {}})));
    client.receive();
    handle.take_sent();
    (client, handle)
}

fn sync_frames(handle: &TransportHandle) -> Vec<rmpv::Value> {
    handle
        .take_sent_values()
        .into_iter()
        .filter(|value| frames::kind(value) == Some("sync"))
        .collect()
}

#[test]
fn a_local_mutation_is_synced_once() {
    let (mut client, handle) = connected_client();

    client
        .document_mut("r")
        .unwrap()
        .set("/x", json!(7))
        .unwrap();
    sleep(Duration::from_millis(10));
    let events = client.receive();

    let synced = sync_frames(&handle);
    assert_eq!(synced.len(), 1);
    assert_eq!(
        frames::field(&synced[0], "n").and_then(|v| v.as_str()),
        Some("r")
    );
    let ops = frames::field(&synced[0], "p").unwrap().as_array().unwrap();
    assert_eq!(ops.len(), 1);
    assert_eq!(
        frames::field(&ops[0], "p").and_then(|v| v.as_str()),
        Some("/x")
    );
    assert_eq!(frames::field(&ops[0], "v").and_then(|v| v.as_u64()), Some(7));
    assert!(
        frames::field(&ops[0], "o").is_none(),
        "plain writes are replace ops"
    );

    // the host hears about its own outbound batch
    assert!(events
        .iter()
        .any(|event| matches!(event, ClientEvent::Change { ops: Some(_), .. })));

    // nothing further goes out until the next mutation
    sleep(Duration::from_millis(10));
    client.receive();
    assert!(sync_frames(&handle).is_empty());
}

#[test]
fn mutations_between_ticks_batch_into_one_sync() {
    let (mut client, handle) = connected_client();
    {
        let mut doc = client.document_mut("r").unwrap();
        doc.set("/a", json!(1)).unwrap();
        doc.set("/b", json!(2)).unwrap();
        doc.remove("/a").unwrap();
    }
    sleep(Duration::from_millis(10));
    client.receive();

    let synced = sync_frames(&handle);
    assert_eq!(synced.len(), 1);
    let ops = frames::field(&synced[0], "p").unwrap().as_array().unwrap();
    assert_eq!(ops.len(), 3);
    assert_eq!(
        frames::field(&ops[2], "o").and_then(|v| v.as_str()),
        Some("r"),
        "deletes travel as remove ops"
    );
}

#[test]
fn internal_and_entity_paths_are_never_synced() {
    let (mut client, handle) = connected_client();
    {
        let mut doc = client.document_mut("r").unwrap();
        doc.set("/_cursor", json!(1)).unwrap();
        doc.set("/entities/e9", json!({"hp": 1})).unwrap();
        doc.set("/entities/e9/position", json!([0.0, 0.0, 0.0]))
            .unwrap();
    }
    sleep(Duration::from_millis(10));
    client.receive();
    assert!(sync_frames(&handle).is_empty());

    // the writes themselves landed locally
    let doc = client.document("r").unwrap();
    assert_eq!(doc["_cursor"], json!(1));
    assert_eq!(doc["entities"]["e9"]["hp"], json!(1));
}

#[test]
fn inbound_applies_never_loop_back() {
    let (mut client, handle) = connected_client();

    handle.deliver(frames::patch_frame(
        "r",
        2.0,
        json!([{"o": "a", "p": "/hp", "v": 5}]),
    ));
    client.receive();
    handle.deliver(frames::full_frame(
        "r",
        3.0,
        false,
        json!({"entities": {}, "hp": 6}),
    ));
    client.receive();

    sleep(Duration::from_millis(10));
    client.receive();
    assert!(
        sync_frames(&handle).is_empty(),
        "server changes must not echo back as sync"
    );
}

#[test]
fn excluded_fields_are_applied_but_not_synced() {
    let (transport, handle) = MockTransport::create();
    let config = ClientConfig {
        url: "ws://localhost:9001".to_owned(),
        auto_reconnect: false,
        tick_interval: Duration::from_millis(1),
        excluded_fields: std::collections::HashSet::from(["camera".to_owned()]),
        ..ClientConfig::default()
    };
    let mut client = Client::new(config, transport);
    client.connect();
    handle.open();
    client.receive();
    client.subscribe("r");
    handle.take_sent();

    client
        .document_mut("r")
        .unwrap()
        .set("/camera", json!([1, 2, 3]))
        .unwrap();
    sleep(Duration::from_millis(10));
    client.receive();
    assert!(sync_frames(&handle).is_empty());
    assert_eq!(client.document("r").unwrap()["camera"], json!([1, 2, 3]));
}

#[test]
fn sync_is_disabled_entirely_when_allow_sync_is_off() {
    let (transport, handle) = MockTransport::create();
    let config = ClientConfig {
        url: "ws://localhost:9001".to_owned(),
        auto_reconnect: false,
        allow_sync: false,
        tick_interval: Duration::from_millis(1),
        ..ClientConfig::default()
    };
    let mut client = Client::new(config, transport);
    client.connect();
    handle.open();
    client.receive();
    client.subscribe("r");
    handle.take_sent();

    client
        .document_mut("r")
        .unwrap()
        .set("/x", json!(1))
        .unwrap();
    sleep(Duration::from_millis(10));
    client.receive();
    assert!(sync_frames(&handle).is_empty());
}
