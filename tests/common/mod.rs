#![allow(dead_code)]

use std::{
    collections::VecDeque,
    io::{self, Cursor, Read, Write},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use coolmaster::{
    emulator::{Emulator, EmulatorConnector},
    Bridge, BridgeConfig, Connector, Link, Result, UnitId, UnitStatus,
};

pub fn uid(id: &str) -> UnitId {
    id.parse().unwrap()
}

pub fn status(line: &str) -> UnitStatus {
    UnitStatus::parse(line).unwrap()
}

/// Everything the bridge sends back for one exchange: the synchronizing
/// prompt, the echo and the response.
pub fn reply(command: &str, response: &str) -> Vec<u8> {
    format!("\r\n>{command}\r\n{response}").into_bytes()
}

/// Connector backed by an emulator, with canned replies that take
/// precedence for the next connections.
#[derive(Clone)]
pub struct TestConnector {
    emulator: EmulatorConnector,
    canned: Arc<Mutex<VecDeque<Vec<u8>>>>,
    connects: Arc<AtomicUsize>,
}

impl TestConnector {
    pub fn new(emulator: Emulator) -> Self {
        Self {
            emulator: EmulatorConnector::new(emulator.record_commands(true)),
            canned: Default::default(),
            connects: Default::default(),
        }
    }

    pub fn bridge(&self, config: BridgeConfig) -> Bridge {
        Bridge::with_connector(self.clone(), config)
    }

    /// Serve `output` verbatim on the next connection instead of the emulator.
    pub fn push_reply(&self, output: Vec<u8>) {
        self.canned.lock().unwrap().push_back(output);
    }

    pub fn emulator(&self) -> MutexGuard<'_, Emulator> {
        self.emulator.emulator()
    }

    /// Commands the emulator has answered.
    pub fn commands(&self) -> Vec<String> {
        self.emulator().commands().to_vec()
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl Connector for TestConnector {
    fn connect(&self) -> Result<Box<dyn Link>> {
        self.connects.fetch_add(1, Ordering::SeqCst);

        match self.canned.lock().unwrap().pop_front() {
            Some(output) => Ok(Box::new(Canned(Cursor::new(output)))),
            None => self.emulator.connect(),
        }
    }
}

struct Canned(Cursor<Vec<u8>>);

impl Read for Canned {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for Canned {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
