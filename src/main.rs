use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use coolmaster::{Bridge, BridgeConfig, Device, FanSpeed, TemperatureUnit, UnitId, UnitStatus};
use url::Url;

/// Query and control HVAC units attached to a CoolMaster bridge
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port the bridge is attached to
    ///
    /// either serial:///device/path or tcp+raw://host:port URLs supported.
    /// A bare device path is treated as a serial port.
    #[arg(long, env = "COOLMASTER_PORT", value_parser = parse_port)]
    port: Url,

    /// Serial baud rate
    #[arg(long, default_value_t = BridgeConfig::DEFAULT_BAUD)]
    baud: u32,

    /// Seconds to wait for the bridge to reply
    #[arg(long, default_value = "5", value_parser = parse_timeout)]
    timeout: Duration,

    /// Don't refresh unit status automatically before reading it
    #[arg(long)]
    no_auto_update: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List the attached units and their status
    Devices,
    /// Show the bridge settings
    Info,
    /// Show the status of one unit
    Status { uid: UnitId },
    /// Turn a unit on
    On { uid: UnitId },
    /// Turn a unit off
    Off { uid: UnitId },
    /// Set the operating mode (auto, cool, dry, fan, heat)
    Mode { uid: UnitId, mode: String },
    /// Set the fan speed (low, med, high, auto, top)
    Fan { uid: UnitId, speed: FanSpeed },
    /// Set the thermostat target
    Temp { uid: UnitId, value: f64 },
    /// Set the swing mode (auto, horizontal, 30, 45, 60, vertical)
    Swing { uid: UnitId, swing: String },
    /// Send a raw command and print the response
    Raw {
        #[arg(required = true)]
        command: Vec<String>,
    },
}

fn parse_port(s: &str) -> Result<Url, url::ParseError> {
    if s.contains("://") {
        Url::parse(s)
    } else {
        Url::parse(&format!("serial://{s}"))
    }
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    let seconds: f64 = s.parse().map_err(|e| format!("{e}"))?;

    Duration::try_from_secs_f64(seconds).map_err(|e| format!("{seconds} seconds: {e}"))
}

fn main() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr).init();

    let args = Args::parse();

    let config = BridgeConfig::default()
        .baud(args.baud)
        .read_timeout(args.timeout)
        .auto_update(!args.no_auto_update);

    let bridge = Bridge::connect(&args.port, config)
        .with_context(|| format!("invalid port {}", args.port))?;

    match args.command {
        Cmd::Devices => {
            for mut device in bridge.devices().context("failed to list units")? {
                let uid = device.uid().clone();
                let status = device.status().with_context(|| format!("failed to read unit {uid}"))?;
                print_status(&uid, status);
            }
        }
        Cmd::Info => {
            for (key, value) in bridge.info().context("failed to read bridge settings")? {
                println!("{key}: {value}");
            }
        }
        Cmd::Status { uid } => {
            let mut device = bridge.device(uid.clone());
            let status = device.status().with_context(|| format!("failed to read unit {uid}"))?;
            print_status(&uid, status);
        }
        Cmd::On { uid } => control(&bridge, uid, |device| device.turn_on())?,
        Cmd::Off { uid } => control(&bridge, uid, |device| device.turn_off())?,
        Cmd::Mode { uid, mode } => control(&bridge, uid, |device| device.set_mode(&mode))?,
        Cmd::Fan { uid, speed } => control(&bridge, uid, |device| device.set_fan_speed(speed))?,
        Cmd::Temp { uid, value } => control(&bridge, uid, |device| device.set_thermostat(value))?,
        Cmd::Swing { uid, swing } => control(&bridge, uid, |device| device.set_swing(&swing))?,
        Cmd::Raw { command } => {
            let command = command.join(" ");
            let response = bridge.execute(&command).with_context(|| format!("command {command:?} failed"))?;
            print!("{response}");
        }
    }

    Ok(())
}

fn control<F>(bridge: &Bridge, uid: UnitId, f: F) -> Result<()>
where
    F: FnOnce(&mut Device) -> coolmaster::Result<()>,
{
    let mut device = bridge.device(uid.clone());
    f(&mut device).with_context(|| format!("failed to update unit {uid}"))?;

    let status = device.status().with_context(|| format!("failed to read unit {uid}"))?;
    print_status(&uid, status);

    Ok(())
}

fn print_status(uid: &UnitId, status: &UnitStatus) {
    let power = if status.is_on { "ON".green() } else { "OFF".red() };
    let suffix = match status.unit {
        TemperatureUnit::Imperial => "F",
        TemperatureUnit::Celsius => "C",
    };
    let swing = status.swing.map_or("none".to_string(), |swing| swing.to_string());

    println!(
        "{} {power} set {}{suffix} room {:.1}{suffix} fan {} mode {} swing {swing}",
        uid.to_string().bold(),
        status.thermostat,
        status.temperature,
        status.fan_speed,
        status.mode,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("5").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_timeout("0.25").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_timeout("0").unwrap(), Duration::ZERO);

        assert!(parse_timeout("-1").is_err());
        assert!(parse_timeout("NaN").is_err());
        assert!(parse_timeout("inf").is_err());
        assert!(parse_timeout("soon").is_err());
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["coolmaster", "--port", "/dev/ttyUSB0", "--timeout", "1.5", "info"]).unwrap();
        assert_eq!(args.timeout, Duration::from_millis(1500));
        assert_eq!(args.port.scheme(), "serial");
        assert_eq!(args.port.path(), "/dev/ttyUSB0");

        let args = Args::try_parse_from(["coolmaster", "--port", "/dev/ttyUSB0", "info"]).unwrap();
        assert_eq!(args.timeout, Duration::from_secs(5));

        assert!(Args::try_parse_from(["coolmaster", "--port", "/dev/ttyUSB0", "--timeout", "NaN", "info"]).is_err());
        assert!(Args::try_parse_from(["coolmaster", "--port", "/dev/ttyUSB0", "--timeout=-1", "info"]).is_err());
    }
}
