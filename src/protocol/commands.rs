use std::{fmt, str::FromStr};

use super::unit::{FanSpeed, Mode, Swing, UnitId};
use crate::error::{Error, Result};

/// Commands understood by the bridge.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// `stat2` -- one status line per unit
    StatusAll,
    /// `stat2 <uid>`
    Status(UnitId),
    /// `set` -- bridge settings as `key : value` lines
    Settings,
    /// `query <uid> s` -- swing character, or empty
    QuerySwing(UnitId),
    On(UnitId),
    Off(UnitId),
    SetMode(UnitId, Mode),
    SetFanSpeed(UnitId, FanSpeed),
    SetThermostat(UnitId, f64),
    SetSwing(UnitId, Swing),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::StatusAll => write!(f, "stat2"),
            Command::Status(uid) => write!(f, "stat2 {uid}"),
            Command::Settings => write!(f, "set"),
            Command::QuerySwing(uid) => write!(f, "query {uid} s"),
            Command::On(uid) => write!(f, "on {uid}"),
            Command::Off(uid) => write!(f, "off {uid}"),
            Command::SetMode(uid, mode) => write!(f, "{mode} {uid}"),
            Command::SetFanSpeed(uid, speed) => write!(f, "fspeed {uid} {speed}"),
            Command::SetThermostat(uid, value) => write!(f, "temp {uid} {value}"),
            Command::SetSwing(uid, swing) => write!(f, "swing {uid} {}", swing.as_char()),
        }
    }
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let unknown = || Error::parse(format!("unknown command {s:?}"));

        let words: Vec<&str> = s.split_whitespace().collect();

        let command = match words[..] {
            ["stat2"] => Command::StatusAll,
            ["stat2", uid] => Command::Status(uid.parse()?),
            ["set"] => Command::Settings,
            ["query", uid, "s"] => Command::QuerySwing(uid.parse()?),
            ["on", uid] => Command::On(uid.parse()?),
            ["off", uid] => Command::Off(uid.parse()?),
            ["fspeed", uid, speed] => {
                Command::SetFanSpeed(uid.parse()?, speed.parse().map_err(|_| unknown())?)
            }
            ["temp", uid, value] => {
                Command::SetThermostat(uid.parse()?, value.parse().map_err(|_| unknown())?)
            }
            ["swing", uid, c] => {
                let mut chars = c.chars();
                let swing = match (chars.next(), chars.next()) {
                    (Some(c), None) => Swing::from_char(c)?.ok_or_else(unknown)?,
                    _ => return Err(unknown()),
                };
                Command::SetSwing(uid.parse()?, swing)
            }
            [mode, uid] => Command::SetMode(uid.parse()?, mode.parse().map_err(|_| unknown())?),
            _ => return Err(unknown()),
        };

        Ok(command)
    }
}
