//! End-to-end driver tests over the mock transport.
//!
//! These exercise the bridge-facing entry points the way the bridge calls
//! them: JSON commands in, JSON state out.

use std::sync::Arc;
use std::time::Duration;

use huebl_core::mock::{MockLight, MockTransport};
use huebl_core::{Advertisement, Driver, DriverConfig, ReconnectPolicy};
use huebl_types::{LightCommand, LightDescriptor, LightState, uuids};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn driver_with(light: MockLight) -> (Arc<MockTransport>, Arc<MockLight>, Driver) {
    let transport = Arc::new(MockTransport::new());
    let light = transport.add_light(light);
    let driver = Driver::new(transport.clone());
    (transport, light, driver)
}

fn descriptor(light: &MockLight) -> LightDescriptor {
    LightDescriptor::new(light.address(), "Test light", "LCA001")
}

fn command(value: serde_json::Value) -> LightCommand {
    serde_json::from_value(value).unwrap()
}

// =============================================================================
// Apply
// =============================================================================

#[tokio::test]
async fn test_on_and_bri_command() {
    let (_transport, light, driver) = driver_with(MockLight::builder().build());

    driver
        .apply(&descriptor(&light), &command(json!({"on": true, "bri": 128})))
        .await;

    assert_eq!(
        light.writes(),
        vec![(uuids::POWER, vec![0x01]), (uuids::BRIGHTNESS, vec![129])]
    );
}

#[tokio::test]
async fn test_key_order_is_preserved() {
    let (_transport, light, driver) = driver_with(MockLight::builder().build());

    driver
        .apply(&descriptor(&light), &command(json!({"bri": 254, "on": false})))
        .await;

    let written: Vec<_> = light.writes().into_iter().map(|(uuid, _)| uuid).collect();
    assert_eq!(written, [uuids::BRIGHTNESS, uuids::POWER]);
}

#[tokio::test]
async fn test_xy_command_bytes() {
    let (_transport, light, driver) = driver_with(MockLight::builder().build());

    driver
        .apply(&descriptor(&light), &command(json!({"xy": [0.3127, 0.3290]})))
        .await;

    let x = 20493u16.to_le_bytes();
    let y = 21561u16.to_le_bytes();
    assert_eq!(
        light.writes(),
        vec![(uuids::COLOR_XY, vec![x[0], x[1], y[0], y[1]])]
    );
}

#[tokio::test]
async fn test_unsupported_xy_then_on() {
    let (_transport, light, driver) = driver_with(MockLight::builder().dimmable_only().build());

    driver
        .apply(
            &descriptor(&light),
            &command(json!({"xy": [0.3, 0.3], "on": true})),
        )
        .await;

    assert_eq!(light.writes(), vec![(uuids::POWER, vec![0x01])]);
}

#[tokio::test]
async fn test_unknown_keys_are_ignored() {
    let (_transport, light, driver) = driver_with(MockLight::builder().build());

    driver
        .apply(
            &descriptor(&light),
            &command(json!({"alert": "select", "on": true, "transitiontime": 4})),
        )
        .await;

    assert_eq!(light.writes(), vec![(uuids::POWER, vec![0x01])]);
}

#[tokio::test]
async fn test_transport_failure_mid_command_retries_whole_command() {
    let (transport, light, driver) = driver_with(MockLight::builder().build());
    driver
        .try_apply(light.address(), &LightCommand::new().on(false))
        .await
        .unwrap();
    light.clear_writes();

    // The first write of the next command fails; the retry writes both keys.
    light.set_transient_failures(1);
    let report = driver
        .try_apply(light.address(), &LightCommand::new().on(true).bri(1))
        .await
        .unwrap();

    assert_eq!(report.applied, ["on", "bri"]);
    assert_eq!(
        light.writes(),
        vec![(uuids::POWER, vec![0x01]), (uuids::BRIGHTNESS, vec![0x01])]
    );
    assert_eq!(transport.connect_count(), 2);
}

#[tokio::test]
async fn test_apply_to_unreachable_light_does_not_panic() {
    let (transport, light, driver) = driver_with(MockLight::builder().build());
    light.set_fail_connect(true);

    driver
        .apply(&descriptor(&light), &command(json!({"on": true})))
        .await;

    assert!(light.writes().is_empty());
    assert_eq!(transport.connect_count(), 2);
    assert!(
        driver
            .try_apply(light.address(), &LightCommand::new().on(true))
            .await
            .unwrap_err()
            .is_retryable()
    );
}

// =============================================================================
// Read state
// =============================================================================

#[tokio::test]
async fn test_read_state_brightness_only_light() {
    let (_transport, light, driver) = driver_with(
        MockLight::builder()
            .dimmable_only()
            .on(true)
            .initial_brightness(0.5)
            .build(),
    );

    let state = driver.read_state(&descriptor(&light)).await;
    let value = serde_json::to_value(&state).unwrap();

    assert_eq!(value["reachable"], true);
    assert_eq!(value["on"], true);
    assert!((value["bri"].as_f64().unwrap() - 128.0 / 255.0).abs() < 1e-9);
    assert!(value.get("colormode").is_none());
    assert!(value.get("xy").is_none());
}

#[tokio::test]
async fn test_read_state_color_light_json() {
    let (_transport, light, driver) =
        driver_with(MockLight::builder().on(false).initial_xy(0.0, 1.0).build());

    let state = driver.read_state(&descriptor(&light)).await;
    assert_eq!(
        serde_json::to_value(&state).unwrap(),
        json!({"reachable": true, "on": false, "xy": [0.0, 1.0], "colormode": "xy"})
    );
}

#[tokio::test]
async fn test_read_state_recovers_from_one_failure() {
    let (transport, light, driver) = driver_with(MockLight::builder().on(true).build());
    driver.read_state(&descriptor(&light)).await;
    light.set_transient_failures(1);

    let state = driver.read_state(&descriptor(&light)).await;
    assert!(state.reachable);
    assert_eq!(state.on, Some(true));
    assert_eq!(transport.connect_count(), 2);
}

#[tokio::test]
async fn test_read_state_always_failing_is_unreachable() {
    let (transport, light, driver) = driver_with(MockLight::builder().build());
    light.set_fail_connect(true);

    let state = driver.read_state(&descriptor(&light)).await;
    assert_eq!(state, LightState::unreachable());
    assert_eq!(
        serde_json::to_value(&state).unwrap(),
        json!({"reachable": false})
    );
    assert_eq!(transport.connect_count(), 2);
}

#[tokio::test]
async fn test_custom_policy_retries_more() {
    let transport = Arc::new(MockTransport::new());
    let light = transport.add_light(MockLight::builder().build());
    light.set_connect_failures(2);

    let config = DriverConfig::new().max_retries(2);
    let driver = Driver::with_config(transport.clone(), &config).unwrap();
    assert_eq!(driver.policy(), &ReconnectPolicy::new().max_retries(2));

    let state = driver.read_state(&descriptor(&light)).await;
    assert!(state.reachable);
    assert_eq!(transport.connect_count(), 3);
}

// =============================================================================
// Discovery
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_discover_registers_lights() {
    let transport = Arc::new(MockTransport::new());
    let light = transport.add_light(
        MockLight::builder()
            .address("C4:29:96:00:00:01")
            .name("Hue go")
            .model("LLC020")
            .build(),
    );
    transport.add_advertisement(Advertisement {
        address: "11:22:33:44:55:66".to_string(),
        local_name: Some("Headphones".to_string()),
        services: Vec::new(),
        rssi: Some(-70),
    });
    let driver = Driver::new(transport.clone());

    let mut lights = Vec::new();
    driver.discover(&mut lights).await;

    assert_eq!(lights.len(), 1);
    assert_eq!(
        serde_json::to_value(&lights[0]).unwrap(),
        json!({
            "protocol": "hue_bl",
            "name": "Hue go",
            "modelid": "LLC020",
            "protocol_cfg": {
                "ip": "C4:29:96:00:00:01",
                "modelid": "LLC020",
                "id": "C4:29:96:00:00:01",
                "uniqueid": "C4:29:96:00:00:01"
            }
        })
    );

    // The discovered session is reused.
    driver
        .apply(&lights[0], &LightCommand::new().on(true))
        .await;
    assert_eq!(transport.connect_count(), 1);
    assert_eq!(light.writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_discover_non_vendor_only() {
    let transport = Arc::new(MockTransport::new());
    transport.add_light(MockLight::builder().advertise_hue_service(false).build());
    let driver = Driver::new(transport.clone());

    let mut lights = Vec::new();
    driver.discover(&mut lights).await;
    assert!(lights.is_empty());
    assert_eq!(transport.connect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_discover_appends_to_existing_list() {
    let transport = Arc::new(MockTransport::new());
    transport.add_light(MockLight::builder().build());
    let driver = Driver::new(transport);

    let mut lights = vec![LightDescriptor::new("00:11:22:33:44:55", "Old", "LCT001")];
    driver.discover(&mut lights).await;
    assert_eq!(lights.len(), 2);
    assert_eq!(lights[0].name, "Old");
}

#[tokio::test(start_paused = true)]
async fn test_discover_scan_failure_is_logged() {
    let transport = Arc::new(MockTransport::new());
    transport.set_scan_should_fail(true);
    let driver = Driver::new(transport);

    let mut lights = Vec::new();
    driver.discover(&mut lights).await;
    assert!(lights.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_discover_cancelled() {
    let transport = Arc::new(MockTransport::new());
    transport.add_light(MockLight::builder().build());
    let driver = Driver::new(transport);
    let cancel = CancellationToken::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let mut lights = Vec::new();
    driver.discover_with_cancel(&mut lights, cancel).await;
    assert!(lights.is_empty());
}

// =============================================================================
// Cache
// =============================================================================

#[tokio::test]
async fn test_cache_holds_one_session_per_address() {
    let transport = Arc::new(MockTransport::new());
    let a = transport.add_light(MockLight::builder().build());
    let b = transport.add_light(MockLight::builder().build());
    let driver = Driver::new(transport.clone());

    for _ in 0..3 {
        driver.read_state(&descriptor(&a)).await;
        driver.read_state(&descriptor(&b)).await;
    }
    driver.cache().invalidate(a.address()).await;
    driver.read_state(&descriptor(&a)).await;

    assert_eq!(driver.cache().len().await, 2);
    assert_eq!(transport.connect_count(), 3);

    driver.shutdown().await;
    assert!(driver.cache().is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_calls_on_one_light_both_succeed() {
    let (transport, light, driver) = driver_with(MockLight::builder().build());
    light.set_operation_latency(Duration::from_millis(100));

    // Both calls connect; the later insert displaces the earlier session
    // while its owner is still reading or writing through it.
    let command = LightCommand::new().on(true);
    let (applied, state) = tokio::join!(
        driver.try_apply(light.address(), &command),
        driver.try_read_state(light.address()),
    );

    let report = applied.unwrap();
    assert_eq!(report.applied, ["on"]);
    assert!(state.unwrap().reachable);

    // The loser of the race retried once on the winner's session.
    assert_eq!(transport.connect_count(), 2);
    assert!(light.close_count() >= 1);
    assert_eq!(driver.cache().len().await, 1);
    assert_eq!(light.value(uuids::POWER), Some(vec![0x01]));
}
