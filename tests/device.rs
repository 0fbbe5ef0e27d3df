mod common;

use std::{thread, time::Duration};

use common::*;
use coolmaster::{emulator::Emulator, BridgeConfig, Error, FanSpeed, Mode, Swing, TemperatureUnit};

fn connector() -> TestConnector {
    let mut example = status("101 OFF 32C 04,93C Low  Dry  OK 1");
    example.swing = Some(Swing::Horizontal);

    TestConnector::new(Emulator::new().with_unit(uid("101"), example))
}

#[test]
fn test_status_accessors() {
    let connector = connector();
    let bridge = connector.bridge(BridgeConfig::default());
    let mut device = bridge.device(uid("101"));

    assert!(!device.is_on().unwrap());
    assert_eq!(device.unit().unwrap(), TemperatureUnit::Celsius);
    assert_eq!(device.thermostat().unwrap(), 32.0);
    assert_eq!(device.temperature().unwrap(), 4.93);
    assert_eq!(device.fan_speed().unwrap(), FanSpeed::Low);
    assert_eq!(device.mode().unwrap(), Mode::Dry);
    assert_eq!(device.swing().unwrap(), Some(Swing::Horizontal));
    assert_eq!(device.uid().as_str(), "101");

    // one refresh served every read above
    assert_eq!(connector.commands(), ["stat2 101", "query 101 s"]);
}

#[test]
fn test_stale_status_is_refreshed_once() {
    let connector = connector();
    let bridge = connector.bridge(BridgeConfig::default().max_age(Duration::from_millis(50)));
    let mut device = bridge.device(uid("101"));

    device.temperature().unwrap();
    thread::sleep(Duration::from_millis(60));

    connector.emulator().unit_mut(&uid("101")).unwrap().temperature = 21.25;

    assert_eq!(device.temperature().unwrap(), 21.25);
    assert_eq!(device.mode().unwrap(), Mode::Dry);

    assert_eq!(
        connector.commands(),
        ["stat2 101", "query 101 s", "stat2 101", "query 101 s"]
    );
}

#[test]
fn test_mutation_forces_refresh() {
    let connector = connector();
    let bridge = connector.bridge(BridgeConfig::default());
    let mut device = bridge.device(uid("101"));

    assert!(!device.is_on().unwrap());

    device.turn_on().unwrap();
    assert!(device.is_on().unwrap());

    device.set_mode("heat").unwrap();
    assert_eq!(device.mode().unwrap(), Mode::Heat);

    device.set_fan_speed(FanSpeed::Medium).unwrap();
    assert_eq!(device.fan_speed().unwrap(), FanSpeed::Medium);

    device.set_thermostat(23.5).unwrap();
    assert_eq!(device.thermostat().unwrap(), 23.5);

    device.set_swing("45").unwrap();
    assert_eq!(device.swing().unwrap(), Some(Swing::Deg45));

    device.turn_off().unwrap();
    assert!(!device.is_on().unwrap());

    let commands = connector.commands();
    let sent: Vec<&str> = commands
        .iter()
        .map(String::as_str)
        .filter(|command| !command.starts_with("stat2") && !command.starts_with("query"))
        .collect();

    assert_eq!(sent, ["on 101", "heat 101", "fspeed 101 med", "temp 101 23.5", "swing 101 4", "off 101"]);

    // initial refresh plus one after each of the six commands
    assert_eq!(commands.iter().filter(|command| *command == "stat2 101").count(), 7);
}

#[test]
fn test_invalid_mode() {
    let connector = connector();
    let bridge = connector.bridge(BridgeConfig::default());
    let mut device = bridge.device(uid("101"));

    let err = device.set_mode("bogus").unwrap_err();

    match err {
        Error::InvalidArgument { value, valid, .. } => {
            assert_eq!(value, "bogus");
            assert_eq!(valid, "auto cool dry fan heat");
        }
        other => panic!("unexpected error {other:?}"),
    }

    assert_eq!(connector.connects(), 0);
}

#[test]
fn test_invalid_swing() {
    let connector = connector();
    let bridge = connector.bridge(BridgeConfig::default());
    let mut device = bridge.device(uid("101"));

    device.status().unwrap();

    let err = device.set_swing("bogus").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }), "{err:?}");

    // "none" can be reported but not set
    assert!(device.set_swing("none").is_err());

    // nothing was sent and the cache is still fresh
    device.status().unwrap();
    assert_eq!(connector.connects(), 2);
}

#[test]
fn test_malformed_status_keeps_cache() {
    let connector = connector();
    let bridge = connector.bridge(BridgeConfig::default());
    let mut device = bridge.device(uid("101"));

    device.refresh().unwrap();
    let before = device.cached().cloned().unwrap();

    connector.push_reply(reply("stat2 101", "101 ON 20C 21C Low Cool\r\nOK\r\n>"));

    let err = device.refresh().unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err:?}");
    assert_eq!(device.cached(), Some(&before));

    // the swing query was never sent
    assert_eq!(connector.connects(), 3);
}

#[test]
fn test_failed_swing_query_keeps_cache() {
    let connector = connector();
    let bridge = connector.bridge(BridgeConfig::default());
    let mut device = bridge.device(uid("101"));

    device.refresh().unwrap();
    let before = device.cached().cloned().unwrap();

    // a good, different status line, then a swing response cut short
    connector.push_reply(reply("stat2 101", "101 ON  20C 21,00C High Cool OK 0\r\nOK\r\n>"));
    connector.push_reply(reply("query 101 s", "h\r\nOK"));

    let err = device.refresh().unwrap_err();
    assert!(matches!(err, Error::Protocol(_)), "{err:?}");
    assert_eq!(device.cached(), Some(&before));

    // the refresh timestamp is untouched as well
    assert!(!device.is_stale());
}

#[test]
fn test_unknown_swing_character() {
    let connector = connector();
    let bridge = connector.bridge(BridgeConfig::default());
    let mut device = bridge.device(uid("101"));

    connector.push_reply(reply("stat2 101", "101 ON  20C 21,00C High Cool OK 0\r\nOK\r\n>"));
    connector.push_reply(reply("query 101 s", "x\r\nOK\r\n>"));

    let err = device.is_on().unwrap_err();
    assert!(matches!(err, Error::Parse(_)), "{err:?}");
    assert!(device.cached().is_none());
}

#[test]
fn test_auto_update_disabled() {
    let connector = connector();
    let bridge = connector.bridge(BridgeConfig::default().auto_update(false));
    let mut device = bridge.device(uid("101"));

    let err = device.is_on().unwrap_err();
    assert!(matches!(err, Error::NoStatus(_)), "{err:?}");
    assert_eq!(connector.connects(), 0);

    device.refresh().unwrap();
    assert!(!device.is_on().unwrap());

    // cached values are returned even after a change on the bridge
    device.turn_on().unwrap();
    assert!(!device.is_on().unwrap());

    device.refresh().unwrap();
    assert!(device.is_on().unwrap());
}

#[test]
fn test_devices_from_enumeration() {
    let connector = connector();
    let bridge = connector.bridge(BridgeConfig::default());

    let mut devices = bridge.devices().unwrap();
    assert_eq!(devices.len(), 1);

    let status = devices[0].status().unwrap();
    assert_eq!(status.mode, Mode::Dry);
    assert_eq!(status.swing, Some(Swing::Horizontal));
}
