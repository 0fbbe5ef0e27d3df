//! Client for the RS232 text protocol spoken by older CoolMaster HVAC bridges.
//!
//! ```no_run
//! use coolmaster::{Bridge, BridgeConfig};
//!
//! # fn main() -> coolmaster::Result<()> {
//! let url = url::Url::parse("serial:///dev/ttyUSB0").unwrap();
//! let bridge = Bridge::connect(&url, BridgeConfig::default())?;
//!
//! for mut device in bridge.devices()? {
//!     let temperature = device.temperature()?;
//!     println!("{}: {:.1}", device.uid(), temperature);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod config;
pub mod device;
pub mod emulator;
pub mod error;
pub mod protocol;
pub mod transport;

pub use bridge::Bridge;
pub use config::{BridgeConfig, Connector, Link};
pub use device::Device;
pub use error::{Error, Result};
pub use protocol::unit::{FanSpeed, Mode, Swing, TemperatureUnit, UnitId, UnitStatus};
