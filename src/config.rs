use std::{
    io::{Read, Write},
    net::TcpStream,
    time::Duration,
};

use tokio_serial::{DataBits, Parity, SerialPort, StopBits};
use tracing::debug;
use url::Url;

use crate::error::{Error, Result};

/// A byte stream to the bridge. Dropping it closes the connection.
pub trait Link: Read + Write + Send {}

impl<T> Link for T where T: Read + Write + Send {}

/// Opens a fresh `Link` for each exchange with the bridge.
pub trait Connector: Send {
    fn connect(&self) -> Result<Box<dyn Link>>;
}

/// Client behaviour settings for a `Bridge`.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Serial baud rate. The bridge's rate may have been changed with `set baud`.
    pub baud: u32,

    /// How long to wait for any expected reply before giving up.
    pub read_timeout: Duration,

    /// Refresh stale unit status automatically when it is read.
    pub auto_update: bool,

    /// Age after which cached unit status is stale.
    pub max_age: Duration,
}

impl BridgeConfig {
    pub const DEFAULT_BAUD: u32 = 9600;
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(1);

    pub fn baud(mut self, baud: u32) -> Self {
        self.baud = baud;
        self
    }

    pub fn read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn auto_update(mut self, auto_update: bool) -> Self {
        self.auto_update = auto_update;
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            baud: Self::DEFAULT_BAUD,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
            auto_update: true,
            max_age: Self::DEFAULT_MAX_AGE,
        }
    }
}

pub enum Port {
    Serial(Box<dyn SerialPort>),
    TcpRaw(TcpStream),
}

/// Where to find the bridge, parsed from a `serial://` or `tcp+raw://` url.
#[derive(Clone, Debug, PartialEq)]
pub enum PortAddress {
    Serial(String),
    TcpRaw { host: String, port: u16 },
}

impl PortAddress {
    pub fn from_url(url: &Url) -> Result<Self> {
        match url.scheme() {
            "serial" => {
                // serial:///dev/ttyUSB0, or serial://COM3 on Windows
                let path = match url.host_str() {
                    Some(host) => format!("{host}{}", url.path()),
                    None => url.path().to_string(),
                };

                if path.is_empty() {
                    return Err(Error::UnsupportedPort(format!("serial url without a device path: {url}")));
                }

                Ok(Self::Serial(path))
            }
            "tcp+raw" => {
                let host = url
                    .host_str()
                    .ok_or_else(|| Error::UnsupportedPort(format!("tcp+raw requires a host to be specified in the url: {url}")))?;

                let port = url
                    .port()
                    .ok_or_else(|| Error::UnsupportedPort(format!("tcp+raw requires a port number to be specified in the url: {url}")))?;

                Ok(Self::TcpRaw { host: host.to_string(), port })
            }
            other => Err(Error::UnsupportedPort(other.to_string())),
        }
    }
}

impl Port {
    pub fn open(address: &PortAddress, config: &BridgeConfig) -> Result<Self> {
        match address {
            PortAddress::Serial(path) => {
                let port = tokio_serial::new(path, config.baud)
                    .data_bits(DataBits::Eight)
                    .stop_bits(StopBits::One)
                    .parity(Parity::None)
                    .timeout(config.read_timeout)
                    .open()
                    .map_err(|e| Error::Open {
                        port: path.clone(),
                        source: e.into(),
                    })?;

                Ok(Self::Serial(port))
            }
            PortAddress::TcpRaw { host, port } => {
                let open_err = |source: std::io::Error| Error::Open {
                    port: format!("{host}:{port}"),
                    source,
                };

                let stream = TcpStream::connect((host.as_str(), *port)).map_err(open_err)?;

                stream.set_nodelay(true).map_err(open_err)?;
                stream.set_read_timeout(Some(config.read_timeout)).map_err(open_err)?;
                stream.set_write_timeout(Some(config.read_timeout)).map_err(open_err)?;

                Ok(Self::TcpRaw(stream))
            }
        }
    }

    pub fn into_link(self) -> Box<dyn Link> {
        match self {
            Port::Serial(port) => Box::new(port),
            Port::TcpRaw(stream) => Box::new(stream),
        }
    }
}

/// `Connector` for real bridges, selected by port url.
pub struct PortConnector {
    address: PortAddress,
    config: BridgeConfig,
}

impl PortConnector {
    pub fn new(url: &Url, config: &BridgeConfig) -> Result<Self> {
        Ok(Self {
            address: PortAddress::from_url(url)?,
            config: config.clone(),
        })
    }
}

impl Connector for PortConnector {
    fn connect(&self) -> Result<Box<dyn Link>> {
        debug!(address = ?self.address, baud = self.config.baud, "opening bridge port");

        Ok(Port::open(&self.address, &self.config)?.into_link())
    }
}
