//! Interpolation through the public client API, on the real clock.

use std::thread::sleep;
use std::time::Duration;

use scenesync_client::{Client, ClientConfig};
use scenesync_test::helpers::frames;
use scenesync_test::helpers::mock_transport::{MockTransport, TransportHandle};
use serde_json::json;

fn client_with_entity() -> (Client, TransportHandle) {
    let (transport, handle) = MockTransport::create();
    let config = ClientConfig {
        url: "ws://localhost:9001".to_owned(),
        auto_reconnect: false,
        ..ClientConfig::default()
    };
    let mut client = Client::new(config, transport);
    client.connect();
    handle.open();
    client.receive();
    client.subscribe("room");
    handle.deliver(frames::full_frame(
        "room",
        1.0,
        false,
        json!({"entities": {"1": {}}}),
    ));
    client.receive();
    (client, handle)
}

fn position_fpatch(u: u64, x: f64) -> Vec<u8> {
    frames::fpatch_frame(
        "room",
        u,
        vec![(
            "position",
            frames::transform_block(frames::position_record(1, [x, 0.0, 0.0])),
        )],
    )
}

fn visible_position(client: &Client) -> [f64; 3] {
    let value = &client.document("room").unwrap()["entities"]["1"]["position"];
    let items = value.as_array().expect("position is an array");
    [
        items[0].as_f64().unwrap(),
        items[1].as_f64().unwrap(),
        items[2].as_f64().unwrap(),
    ]
}

#[test]
fn stale_samples_snap_to_the_latest_sample() {
    let (mut client, handle) = client_with_entity();

    handle.deliver(position_fpatch(1, 0.0));
    client.receive();
    sleep(Duration::from_millis(100));
    handle.deliver(position_fpatch(2, 10.0));
    client.receive();

    // let the samples go stale, then take a normal-length tick
    sleep(Duration::from_millis(1300));
    client.interpolate();
    sleep(Duration::from_millis(100));
    client.interpolate();

    assert_eq!(visible_position(&client), [10.0, 0.0, 0.0], "snap is exact");
}

#[test]
fn fresh_samples_ease_smoothly_and_stay_finite() {
    let (mut client, handle) = client_with_entity();

    handle.deliver(position_fpatch(1, 0.0));
    client.receive();
    sleep(Duration::from_millis(50));
    handle.deliver(position_fpatch(2, 10.0));
    client.receive();

    client.interpolate();
    sleep(Duration::from_millis(20));
    client.interpolate();

    let position = visible_position(&client);
    for component in position {
        assert!(component.is_finite());
    }
    assert!(position[0] > 0.0, "eased off the first sample");
    assert!(position[0] < 10.0, "one easing step cannot reach the target");
}

#[test]
fn interpolate_without_samples_is_a_no_op() {
    let (mut client, _handle) = client_with_entity();
    client.interpolate();
    sleep(Duration::from_millis(20));
    client.interpolate();
    assert!(client.document("room").unwrap()["entities"]["1"]
        .get("position")
        .is_none());
}
