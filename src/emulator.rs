//! A software CoolMaster bridge.
//!
//! Speaks the same line protocol as the hardware: commands are echoed,
//! responses end with `OK` and the `>` prompt. Used to exercise the client
//! without a serial port, either in-process through [`EmulatorConnector`] or
//! over TCP with the `coolmaster-emu` binary.

use std::{
    collections::{BTreeMap, VecDeque},
    io::{self, ErrorKind, Read, Write},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::debug;

use crate::{
    config::{BridgeConfig, Connector, Link},
    error::Result,
    protocol::{
        codec::{ReadUntil, LINE_TERMINATOR, OK_SENTINEL, PROMPT},
        commands::Command,
        unit::{FanSpeed, Mode, TemperatureUnit, UnitId, UnitStatus},
    },
};

pub struct Emulator {
    units: BTreeMap<UnitId, UnitStatus>,
    baud: u32,
    commands: Option<Vec<String>>,
}

impl Emulator {
    pub fn new() -> Self {
        Self {
            units: BTreeMap::new(),
            baud: BridgeConfig::DEFAULT_BAUD,
            commands: None,
        }
    }

    /// Keep a log of every command line received, see [`Emulator::commands`].
    pub fn record_commands(mut self, record: bool) -> Self {
        self.commands = record.then(Vec::new);
        self
    }

    pub fn with_unit(mut self, uid: UnitId, status: UnitStatus) -> Self {
        self.units.insert(uid, status);
        self
    }

    /// A unit as it comes out of the box: off, cooling to 24C.
    pub fn default_status() -> UnitStatus {
        UnitStatus {
            is_on: false,
            unit: TemperatureUnit::Celsius,
            thermostat: 24.0,
            temperature: 25.5,
            fan_speed: FanSpeed::Auto,
            mode: Mode::Cool,
            swing: None,
        }
    }

    pub fn unit(&self, uid: &UnitId) -> Option<&UnitStatus> {
        self.units.get(uid)
    }

    pub fn unit_mut(&mut self, uid: &UnitId) -> Option<&mut UnitStatus> {
        self.units.get_mut(uid)
    }

    /// Every non-empty command line received so far. Empty unless recording
    /// was turned on.
    pub fn commands(&self) -> &[String] {
        self.commands.as_deref().unwrap_or_default()
    }

    /// Handle a command line, returning the response body including the `OK`
    /// sentinel (but not the prompt).
    pub fn respond(&mut self, line: &str) -> String {
        if let Some(commands) = &mut self.commands {
            commands.push(line.to_string());
        }

        match line.parse::<Command>() {
            Ok(command) => match self.dispatch(command) {
                Ok(body) => body + OK_SENTINEL,
                Err(message) => message,
            },
            Err(_) => format!("Unknown command{LINE_TERMINATOR}"),
        }
    }

    fn dispatch(&mut self, command: Command) -> std::result::Result<String, String> {
        let mut body = String::new();

        match command {
            Command::StatusAll => {
                for (uid, status) in &self.units {
                    body += &format!("{}{LINE_TERMINATOR}", status.status_line(uid));
                }
            }
            Command::Settings => {
                body += &format!("Baud : {}{LINE_TERMINATOR}", self.baud);
                body += &format!("Models : {}{LINE_TERMINATOR}", self.units.len());
            }
            Command::Status(uid) => {
                let status = self.units.get(&uid).ok_or_else(unknown_uid)?;
                body += &format!("{}{LINE_TERMINATOR}", status.status_line(&uid));
            }
            Command::QuerySwing(uid) => {
                let status = self.units.get(&uid).ok_or_else(unknown_uid)?;
                if let Some(swing) = status.swing {
                    body += &format!("{}{LINE_TERMINATOR}", swing.as_char());
                }
            }
            Command::On(uid) => self.update(&uid, |status| status.is_on = true)?,
            Command::Off(uid) => self.update(&uid, |status| status.is_on = false)?,
            Command::SetMode(uid, mode) => self.update(&uid, |status| status.mode = mode)?,
            Command::SetFanSpeed(uid, speed) => self.update(&uid, |status| status.fan_speed = speed)?,
            Command::SetThermostat(uid, value) => self.update(&uid, |status| status.thermostat = value)?,
            Command::SetSwing(uid, swing) => self.update(&uid, |status| status.swing = Some(swing))?,
        }

        Ok(body)
    }

    fn update(&mut self, uid: &UnitId, f: impl FnOnce(&mut UnitStatus)) -> std::result::Result<(), String> {
        let status = self.units.get_mut(uid).ok_or_else(unknown_uid)?;
        f(status);

        Ok(())
    }
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

fn unknown_uid() -> String {
    format!("Unknown UID{LINE_TERMINATOR}")
}

/// Per-connection line handling: echoes input and answers each complete line.
pub struct Console {
    input: BytesMut,
    lines: ReadUntil,
}

impl Console {
    pub fn new() -> Self {
        Self {
            input: BytesMut::new(),
            lines: ReadUntil::new(LINE_TERMINATOR),
        }
    }

    /// Feed received bytes, returning what the bridge sends back.
    pub fn receive(&mut self, emulator: &mut Emulator, bytes: &[u8]) -> Vec<u8> {
        self.input.extend_from_slice(bytes);

        let mut output = Vec::new();

        while let Ok(Some(line)) = self.lines.decode(&mut self.input) {
            output.extend_from_slice(&line);

            let line = String::from_utf8_lossy(&line);
            let command = line.trim_end_matches(LINE_TERMINATOR);

            if !command.is_empty() {
                debug!(command, "emulator received command");
                output.extend_from_slice(emulator.respond(command).as_bytes());
            }

            output.extend_from_slice(PROMPT.as_bytes());
        }

        output
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// An emulator shared between the links it hands out.
#[derive(Clone, Default)]
pub struct EmulatorConnector {
    emulator: Arc<Mutex<Emulator>>,
}

impl EmulatorConnector {
    pub fn new(emulator: Emulator) -> Self {
        Self {
            emulator: Arc::new(Mutex::new(emulator)),
        }
    }

    pub fn emulator(&self) -> MutexGuard<'_, Emulator> {
        self.emulator.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connector for EmulatorConnector {
    fn connect(&self) -> Result<Box<dyn Link>> {
        Ok(Box::new(EmulatorLink {
            emulator: self.emulator.clone(),
            console: Console::new(),
            output: VecDeque::new(),
        }))
    }
}

struct EmulatorLink {
    emulator: Arc<Mutex<Emulator>>,
    console: Console,
    output: VecDeque<u8>,
}

impl Read for EmulatorLink {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.output.is_empty() {
            // a real bridge would just stay quiet
            return Err(io::Error::new(ErrorKind::TimedOut, "emulator has nothing to send"));
        }

        self.output.read(buf)
    }
}

impl Write for EmulatorLink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut emulator = self.emulator.lock().unwrap_or_else(PoisonError::into_inner);
        self.output.extend(self.console.receive(&mut emulator, buf));

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
