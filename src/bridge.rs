use std::collections::BTreeMap;

use tracing::debug;
use url::Url;

use crate::{
    config::{BridgeConfig, Connector, PortConnector},
    device::Device,
    error::{Error, Result},
    protocol::{
        codec::LINE_TERMINATOR,
        commands::Command,
        unit::UnitId,
    },
    transport::Session,
};

/// A CoolMaster bridge and the units attached to it.
///
/// Nothing is held open between calls: every `execute` opens the link,
/// performs one exchange and closes it again.
pub struct Bridge {
    connector: Box<dyn Connector>,
    config: BridgeConfig,
}

impl Bridge {
    /// Create a bridge for a `serial://` or `tcp+raw://` port url. The port
    /// is not opened until the first request.
    pub fn connect(url: &Url, config: BridgeConfig) -> Result<Self> {
        let connector = PortConnector::new(url, &config)?;

        Ok(Self::with_connector(connector, config))
    }

    pub fn with_connector(connector: impl Connector + 'static, config: BridgeConfig) -> Self {
        Self {
            connector: Box::new(connector),
            config,
        }
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Send a single command and return the response body.
    pub fn execute(&self, command: &str) -> Result<String> {
        if command.contains(['\r', '\n']) {
            return Err(Error::InvalidArgument {
                what: "command",
                value: command.to_string(),
                valid: "a single line without terminators".to_string(),
            });
        }

        let mut session = Session::open(self.connector.as_ref(), self.config.read_timeout)?;
        session.exchange(command)
    }

    pub(crate) fn send(&self, command: &Command) -> Result<String> {
        self.execute(&command.to_string())
    }

    /// All units attached to the bridge, in the order the bridge lists them.
    pub fn devices(&self) -> Result<Vec<Device<'_>>> {
        let response = self.send(&Command::StatusAll)?;

        let devices = lines(&response)
            .map(|line| Ok(self.device(UnitId::from_status_line(line)?)))
            .collect::<Result<Vec<_>>>()?;

        debug!(count = devices.len(), "enumerated units");

        Ok(devices)
    }

    /// A handle to a single unit. The bridge is not contacted.
    pub fn device(&self, uid: UnitId) -> Device<'_> {
        Device::new(self, uid)
    }

    /// Bridge settings as reported by `set`.
    pub fn info(&self) -> Result<BTreeMap<String, String>> {
        let response = self.send(&Command::Settings)?;

        lines(&response)
            .map(|line| {
                let (key, value) = line
                    .split_once(':')
                    .ok_or_else(|| Error::parse(format!("expected `key : value`, got {line:?}")))?;

                Ok((key.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }
}

fn lines(response: &str) -> impl Iterator<Item = &str> {
    let response = response.trim();

    response.split(LINE_TERMINATOR).filter(move |_| !response.is_empty())
}
