//! Script execution against a simulated port.

use dout::{Command, ConfigError, ExecError, PortConfig, PortSession, SessionStats};
use hal::sim::{AbsentPort, RecordingPort};
use hal::DigitalOutPort;
use serde::Serialize;

/// How the simulated port behaves.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// Simulate a host with no board installed.
    pub absent: bool,
    /// Lines on the simulated port.
    pub resolution: u8,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            absent: false,
            resolution: 32,
        }
    }
}

/// What one script line did to the port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub line: usize,
    pub command: String,
    /// Whether the command added to the checksum.
    pub data: bool,
    /// Values latched on the port, in order.
    pub writes: Vec<u32>,
    pub failed_writes: u64,
    pub checksum: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<u16>,
}

/// Owns a session over the simulated port and tracks what each step wrote.
pub struct Runner {
    session: PortSession<Box<dyn DigitalOutPort>>,
    recorder: Option<RecordingPort>,
}

impl Runner {
    pub fn new(config: PortConfig, options: RunOptions) -> Result<Self, ConfigError> {
        let (port, recorder): (Box<dyn DigitalOutPort>, _) = if options.absent {
            (Box::new(AbsentPort::with_resolution(options.resolution)), None)
        } else {
            let recorder = RecordingPort::with_resolution(options.resolution);
            (Box::new(recorder.clone()), Some(recorder))
        };

        Ok(Self {
            session: PortSession::new(config, port)?,
            recorder,
        })
    }

    /// Parses and runs one script line. `Ok(None)` for blank and comment lines.
    pub fn step(&mut self, line: usize, text: &str) -> Result<Option<StepReport>, ExecError> {
        let Some(command) = Command::parse_line(text)? else {
            return Ok(None);
        };

        let failures_before = self.session.stats().write_failures;
        let reply = self.session.execute(&command)?;
        let failed_writes = self.session.stats().write_failures - failures_before;
        log::debug!("line {line}: {command}");

        Ok(Some(StepReport {
            line,
            command: command.to_string(),
            data: command.is_data(),
            writes: self.take_writes(),
            failed_writes,
            checksum: self.session.checksum(),
            reply,
        }))
    }

    fn take_writes(&self) -> Vec<u32> {
        self.recorder
            .as_ref()
            .map(RecordingPort::take_values)
            .unwrap_or_default()
    }

    pub fn checksum(&self) -> u16 {
        self.session.checksum()
    }

    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    pub fn last_value(&self) -> u32 {
        self.session.last_value()
    }
}
