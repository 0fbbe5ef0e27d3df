use std::{fmt, str::FromStr};

use strum_macros::{Display, EnumIter, EnumString, EnumVariantNames};

use crate::error::{Error, Result};

pub const UNIT_ID_LEN: usize = 3;

/// Unit identifier, e.g. `101`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(String);

impl UnitId {
    fn is_valid(id: &str) -> bool {
        id.len() == UNIT_ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric())
    }

    /// Take the unit identifier from the first characters of a `stat2` line.
    ///
    /// The bridge is trusted to name its own units, so only the length is
    /// checked.
    pub fn from_status_line(line: &str) -> Result<Self> {
        line.get(..UNIT_ID_LEN)
            .map(|id| UnitId(id.to_string()))
            .ok_or_else(|| Error::parse(format!("no unit id at the start of line {line:?}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for UnitId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if Self::is_valid(s) {
            Ok(UnitId(s.to_string()))
        } else {
            Err(Error::InvalidArgument {
                what: "unit id",
                value: s.to_string(),
                valid: format!("{UNIT_ID_LEN} alphanumeric characters"),
            })
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, EnumIter, EnumVariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    Auto,
    Cool,
    Dry,
    Fan,
    Heat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, EnumIter, EnumVariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum FanSpeed {
    Low,
    #[strum(to_string = "med")]
    Medium,
    High,
    Auto,
    Top,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, EnumVariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum TemperatureUnit {
    Imperial,
    Celsius,
}

impl TemperatureUnit {
    fn suffix(self) -> char {
        match self {
            TemperatureUnit::Imperial => 'F',
            TemperatureUnit::Celsius => 'C',
        }
    }
}

/// Louver swing position. "No swing" is represented as `None` wherever a
/// `Swing` is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, EnumString, EnumIter, EnumVariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum Swing {
    Auto,
    Horizontal,
    #[strum(to_string = "30")]
    Deg30,
    #[strum(to_string = "45")]
    Deg45,
    #[strum(to_string = "60")]
    Deg60,
    Vertical,
}

impl Swing {
    /// Character used by `swing` and `query <uid> s`.
    pub fn as_char(self) -> char {
        match self {
            Swing::Auto => 'a',
            Swing::Horizontal => 'h',
            Swing::Deg30 => '3',
            Swing::Deg45 => '4',
            Swing::Deg60 => '6',
            Swing::Vertical => 'v',
        }
    }

    pub fn from_char(c: char) -> Result<Option<Swing>> {
        match c {
            '-' | '0' => Ok(None),
            'a' => Ok(Some(Swing::Auto)),
            'h' => Ok(Some(Swing::Horizontal)),
            '3' => Ok(Some(Swing::Deg30)),
            '4' => Ok(Some(Swing::Deg45)),
            '6' => Ok(Some(Swing::Deg60)),
            'v' => Ok(Some(Swing::Vertical)),
            other => Err(Error::parse(format!("unrecognized swing character {other:?}"))),
        }
    }

    /// Decode the body of a `query <uid> s` response. An empty body means no swing.
    pub fn parse_query_response(response: &str) -> Result<Option<Swing>> {
        let mut chars = response.trim().chars();

        match (chars.next(), chars.next()) {
            (None, _) => Ok(None),
            (Some(c), None) => Swing::from_char(c),
            _ => Err(Error::parse(format!("unexpected swing response {response:?}"))),
        }
    }
}

/// Cached snapshot of a unit, built from one `stat2 <uid>` line and one swing query.
#[derive(Clone, Debug, PartialEq)]
pub struct UnitStatus {
    pub is_on: bool,
    pub unit: TemperatureUnit,
    pub thermostat: f64,
    pub temperature: f64,
    pub fan_speed: FanSpeed,
    pub mode: Mode,
    pub swing: Option<Swing>,
}

const STATUS_FIELDS: usize = 8;

impl UnitStatus {
    /// Parse a status line such as `101 OFF 32C 04,93C Low  Dry  OK 1`.
    ///
    /// The line carries no swing information, so `swing` is left as `None`.
    pub fn parse(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split_whitespace().collect();

        let [_uid, on_off, thermostat, temperature, fan_speed, mode, _ok, _count] = fields[..] else {
            return Err(Error::parse(format!(
                "unexpected status line format: expected {STATUS_FIELDS} fields, got {fields:?}"
            )));
        };

        let unit = if thermostat.ends_with('F') {
            TemperatureUnit::Imperial
        } else {
            TemperatureUnit::Celsius
        };

        Ok(UnitStatus {
            is_on: on_off == "ON",
            unit,
            thermostat: parse_temperature(thermostat)?,
            temperature: parse_temperature(temperature)?,
            fan_speed: parse_field(fan_speed, "fan speed")?,
            mode: parse_field(mode, "mode")?,
            swing: None,
        })
    }

    /// Render this status back into the `stat2` line layout.
    pub fn status_line<'a>(&'a self, uid: &'a UnitId) -> StatusLine<'a> {
        StatusLine { uid, status: self }
    }
}

/// Strip the trailing unit character and read the number, accepting a decimal comma.
fn parse_temperature(field: &str) -> Result<f64> {
    let mut chars = field.chars();
    chars.next_back();

    chars
        .as_str()
        .replace(',', ".")
        .parse()
        .map_err(|_| Error::parse(format!("invalid temperature {field:?}")))
}

fn parse_field<T: FromStr>(field: &str, what: &str) -> Result<T> {
    field
        .to_lowercase()
        .parse()
        .map_err(|_| Error::parse(format!("unrecognized {what} {field:?}")))
}

/// `Display` adapter producing a `stat2` status line.
pub struct StatusLine<'a> {
    uid: &'a UnitId,
    status: &'a UnitStatus,
}

impl fmt::Display for StatusLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = self.status;
        let suffix = status.unit.suffix();

        let on_off = if status.is_on { "ON" } else { "OFF" };
        let thermostat = status.thermostat.to_string().replace('.', ",");
        let temperature = format_temperature(status.temperature).replace('.', ",");
        let fan_speed = capitalize(&status.fan_speed.to_string());
        let mode = capitalize(&status.mode.to_string());

        write!(
            f,
            "{} {on_off:<3} {thermostat}{suffix} {temperature}{suffix} {fan_speed:<4} {mode:<4} OK 0",
            self.uid
        )
    }
}

/// Two decimals like the bridge, unless that would lose digits.
fn format_temperature(value: f64) -> String {
    let fixed = format!("{value:05.2}");

    if fixed.parse::<f64>() == Ok(value) {
        fixed
    } else {
        value.to_string()
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}
