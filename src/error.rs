use std::{io, str::FromStr, time::Duration};

use strum::VariantNames;
use thiserror::Error;

use crate::protocol::unit::UnitId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    /// The link to the bridge could not be opened.
    #[error("failed to open {port}")]
    Open {
        port: String,
        #[source]
        source: io::Error,
    },

    /// Reading from or writing to an open link failed.
    #[error("i/o error on bridge link")]
    Transport(#[from] io::Error),

    #[error("timed out after {waited:?} waiting for {expected}")]
    Timeout {
        waited: Duration,
        expected: String,
    },

    /// Prompt, echo or encoding framing was violated.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A response did not have the expected format.
    #[error("parse error: {0}")]
    Parse(String),

    #[error("unrecognized {what} {value:?}. Valid values: {valid}")]
    InvalidArgument {
        what: &'static str,
        value: String,
        valid: String,
    },

    #[error("port url scheme {0} not supported")]
    UnsupportedPort(String),

    #[error("no status cached for unit {0} (auto update is disabled, refresh it first)")]
    NoStatus(UnitId),
}

impl Error {
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        Error::Parse(message.into())
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(message.into())
    }
}

/// Parse `value` as one of the variants of `T`, failing with
/// `Error::InvalidArgument` listing the variants otherwise.
pub(crate) fn parse_choice<T>(what: &'static str, value: &str) -> Result<T>
where
    T: FromStr + VariantNames,
{
    value.parse().map_err(|_| Error::InvalidArgument {
        what,
        value: value.to_string(),
        valid: T::VARIANTS.join(" "),
    })
}
