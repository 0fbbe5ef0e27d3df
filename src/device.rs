use std::{
    fmt,
    time::{Duration, Instant},
};

use tracing::{debug, warn};

use crate::{
    bridge::Bridge,
    error::{parse_choice, Error, Result},
    protocol::{
        commands::Command,
        unit::{FanSpeed, Mode, Swing, TemperatureUnit, UnitId, UnitStatus},
    },
};

/// A unit attached to a bridge.
///
/// Status is cached: reading several properties in quick succession only
/// queries the bridge once. With auto update enabled, any read of a status
/// property refreshes the cache first when it is older than the bridge's
/// configured max age.
pub struct Device<'a> {
    bridge: &'a Bridge,
    uid: UnitId,
    auto_update: bool,
    max_age: Duration,
    last_refresh: Option<Instant>,
    status: Option<UnitStatus>,
}

impl fmt::Debug for Device<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("uid", &self.uid)
            .field("auto_update", &self.auto_update)
            .field("last_refresh", &self.last_refresh)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl<'a> Device<'a> {
    pub fn new(bridge: &'a Bridge, uid: UnitId) -> Self {
        let config = bridge.config();

        Self {
            bridge,
            uid,
            auto_update: config.auto_update,
            max_age: config.max_age,
            last_refresh: None,
            status: None,
        }
    }

    pub fn uid(&self) -> &UnitId {
        &self.uid
    }

    pub fn auto_update(&self) -> bool {
        self.auto_update
    }

    pub fn set_auto_update(&mut self, auto_update: bool) {
        self.auto_update = auto_update;
    }

    /// Last fetched status, without contacting the bridge.
    pub fn cached(&self) -> Option<&UnitStatus> {
        self.status.as_ref()
    }

    pub fn is_stale(&self) -> bool {
        self.last_refresh
            .map_or(true, |at| at.elapsed() >= self.max_age)
    }

    pub fn refresh_if_stale(&mut self) -> Result<()> {
        if self.auto_update && self.is_stale() {
            self.refresh()?;
        }

        Ok(())
    }

    /// Fetch the unit's status and swing mode from the bridge.
    ///
    /// The cache is only replaced once both requests have succeeded.
    pub fn refresh(&mut self) -> Result<()> {
        let line = self.bridge.send(&Command::Status(self.uid.clone()))?;
        let mut status = UnitStatus::parse(&line)?;

        let swing = self.bridge.send(&Command::QuerySwing(self.uid.clone()))?;
        status.swing = Swing::parse_query_response(&swing)?;

        debug!(uid = %self.uid, ?status, "refreshed unit status");

        self.status = Some(status);
        self.last_refresh = Some(Instant::now());

        Ok(())
    }

    /// Force the next status read to refresh.
    fn invalidate(&mut self) {
        self.last_refresh = None;
    }

    fn send(&mut self, command: Command) -> Result<()> {
        self.bridge.send(&command)?;
        self.invalidate();

        Ok(())
    }

    fn snapshot(&mut self) -> Result<&UnitStatus> {
        self.refresh_if_stale()?;

        self.status
            .as_ref()
            .ok_or_else(|| Error::NoStatus(self.uid.clone()))
    }

    pub fn status(&mut self) -> Result<&UnitStatus> {
        self.snapshot()
    }

    pub fn is_on(&mut self) -> Result<bool> {
        Ok(self.snapshot()?.is_on)
    }

    pub fn unit(&mut self) -> Result<TemperatureUnit> {
        Ok(self.snapshot()?.unit)
    }

    pub fn thermostat(&mut self) -> Result<f64> {
        Ok(self.snapshot()?.thermostat)
    }

    pub fn temperature(&mut self) -> Result<f64> {
        Ok(self.snapshot()?.temperature)
    }

    pub fn fan_speed(&mut self) -> Result<FanSpeed> {
        Ok(self.snapshot()?.fan_speed)
    }

    pub fn mode(&mut self) -> Result<Mode> {
        Ok(self.snapshot()?.mode)
    }

    pub fn swing(&mut self) -> Result<Option<Swing>> {
        Ok(self.snapshot()?.swing)
    }

    pub fn turn_on(&mut self) -> Result<()> {
        self.send(Command::On(self.uid.clone()))
    }

    pub fn turn_off(&mut self) -> Result<()> {
        self.send(Command::Off(self.uid.clone()))
    }

    /// Set the operating mode: one of `auto`, `cool`, `dry`, `fan` or `heat`.
    pub fn set_mode(&mut self, mode: &str) -> Result<()> {
        let mode = parse_choice::<Mode>("mode", mode).map_err(|e| {
            warn!(uid = %self.uid, "{e}");
            e
        })?;

        self.send(Command::SetMode(self.uid.clone(), mode))
    }

    pub fn set_fan_speed(&mut self, speed: FanSpeed) -> Result<()> {
        self.send(Command::SetFanSpeed(self.uid.clone(), speed))
    }

    pub fn set_thermostat(&mut self, value: f64) -> Result<()> {
        self.send(Command::SetThermostat(self.uid.clone(), value))
    }

    /// Set the swing mode: one of `auto`, `horizontal`, `30`, `45`, `60` or `vertical`.
    pub fn set_swing(&mut self, swing: &str) -> Result<()> {
        let swing = parse_choice::<Swing>("swing mode", swing).map_err(|e| {
            warn!(uid = %self.uid, "{e}");
            e
        })?;

        self.send(Command::SetSwing(self.uid.clone(), swing))
    }
}
