//! The smoke test sequence: flash, capture the boot log, query the version and round-trip a
//! parameter.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info, warn};

use crate::channel::Channel;
use crate::console::{self, ParamReading};
use crate::logs::LogStore;
use crate::upload::{Flasher, Uploader};
use crate::{Error, SerialChannel};

/// The command used to query the firmware version information
pub const VERSION_COMMAND: &str = "ver all";

/// Settings for a smoke test run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Config {
    /// The serial device of the board's console
    pub port: String,
    pub baud_rate: u32,
    /// Upper bound for a single blocking read
    pub read_timeout: Duration,
    /// The build tool used to flash the board, invoked as `<build_tool> <build_target> upload`
    pub build_tool: String,
    pub build_target: String,
    /// How long to collect console output after opening the port
    pub boot_capture: Duration,
    /// Settle time for `ver all`
    pub version_settle: Duration,
    /// Settle time for `param show`
    pub param_settle: Duration,
    /// Settle time for `param set`
    pub set_settle: Duration,
    /// Directory that receives the boot logs and the version output
    pub log_root: PathBuf,
    /// The parameter to round-trip
    pub param_name: String,
    /// The value the parameter is temporarily set to
    pub probe_value: String,
    /// The value used instead of `probe_value` when the parameter already holds it
    pub fallback_value: String,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            port: "/dev/ttyACM0".to_owned(),
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(500),
            build_tool: "make".to_owned(),
            build_target: "microchip_samv71-xult-clickboards_default".to_owned(),
            boot_capture: Duration::from_secs(6),
            version_settle: Duration::from_millis(2500),
            param_settle: Duration::from_millis(1000),
            set_settle: Duration::from_millis(1500),
            log_root: PathBuf::from("test_data/boot_logs"),
            param_name: "SYS_AUTOSTART".to_owned(),
            probe_value: "60100".to_owned(),
            fallback_value: "0".to_owned(),
        }
    }
}

impl Config {
    /// Returns the uploader for the configured build tool and target.
    pub fn uploader(&self) -> Uploader {
        Uploader::new(self.build_tool.as_str(), self.build_target.as_str())
    }

    /// Opens the configured serial port.
    pub fn open_channel(&self) -> Result<SerialChannel, Error> {
        info!("Opening {} @ {} baud", self.port, self.baud_rate);

        SerialChannel::open(&self.port, self.baud_rate, self.read_timeout)
    }
}

/// Picks the value a parameter is temporarily set to.
///
/// This is `probe` unless `original` already equals it, in which case it is `fallback`.
pub fn toggle_value<'a>(original: &str, probe: &'a str, fallback: &'a str) -> &'a str {
    if original != probe {
        probe
    } else {
        fallback
    }
}

/// Outcome of the parameter read/write/restore sequence.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ParamRoundTrip {
    /// The parameter could not be read, so it was never written
    Missing { response: String },
    Completed {
        original: String,
        temporary: String,
        updated: Option<String>,
        restored: Option<String>,
    },
}

impl ParamRoundTrip {
    /// Returns `true` if the parameter was read back with its original value after restoring it.
    pub fn is_restored(&self) -> bool {
        match self {
            ParamRoundTrip::Completed {
                original, restored, ..
            } => restored.as_deref() == Some(original.as_str()),
            ParamRoundTrip::Missing { .. } => false,
        }
    }
}

/// A recoverable problem found during a run. It is logged and reported, but does not fail the
/// run.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Warning {
    /// Nothing was received during the boot capture window
    EmptyBootLog,
    /// The parameter could not be read, so it was left untouched
    ParamMissing(String),
    /// The parameter did not read back its original value after restoring it
    ParamNotRestored(String),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::EmptyBootLog => write!(f, "No boot output captured - continuing anyway"),
            Warning::ParamMissing(name) => write!(f, "Failed to read {}", name),
            Warning::ParamNotRestored(name) => write!(
                f,
                "{} did not read back its original value after restoring",
                name
            ),
        }
    }
}

fn report_warning(warnings: &mut Vec<Warning>, warning: Warning) {
    warn!("{}", warning);
    warnings.push(warning);
}

/// Everything a smoke test run captured.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Report {
    pub boot_log: String,
    pub boot_log_path: PathBuf,
    pub version_output: String,
    pub version_log_path: PathBuf,
    pub param: ParamRoundTrip,
    pub warnings: Vec<Warning>,
}

#[derive(Debug, Clone)]
pub struct SmokeTest {
    config: Config,
    logs: LogStore,
}

impl SmokeTest {
    pub fn new(config: Config) -> SmokeTest {
        let logs = LogStore::new(config.log_root.as_path());

        SmokeTest { config, logs }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs the whole sequence.
    ///
    /// The board is flashed with `flasher` before `open_channel` is called, and a flash or open
    /// failure ends the run before anything is logged. An empty boot log and a missing parameter
    /// only produce warnings.
    pub fn run<F, C, O>(&self, flasher: &mut F, open_channel: O) -> Result<Report, Error>
    where
        F: Flasher + ?Sized,
        C: Channel,
        O: FnOnce(&Config) -> Result<C, Error>,
    {
        flasher.flash()?;

        let mut channel = open_channel(&self.config)?;

        let mut warnings = Vec::new();
        let (boot_log, boot_log_path) = self.capture_boot_log(&mut channel)?;

        if boot_log.is_empty() {
            report_warning(&mut warnings, Warning::EmptyBootLog);
        }

        let version_output =
            console::send_command(&mut channel, VERSION_COMMAND, self.config.version_settle)?;
        debug!("{} returned {} bytes", VERSION_COMMAND, version_output.len());

        let param = self.round_trip_param(&mut channel)?;
        let name = &self.config.param_name;

        match &param {
            ParamRoundTrip::Missing { .. } => {
                report_warning(&mut warnings, Warning::ParamMissing(name.clone()))
            }
            completed if !completed.is_restored() => {
                report_warning(&mut warnings, Warning::ParamNotRestored(name.clone()))
            }
            _ => {}
        }

        let version_log_path = self.logs.write_version_output(&version_output)?;
        info!("VER output archived to {}", version_log_path.display());

        channel.close();

        Ok(Report {
            boot_log,
            boot_log_path,
            version_output,
            version_log_path,
            param,
            warnings,
        })
    }

    fn capture_boot_log<C: Channel>(&self, channel: &mut C) -> Result<(String, PathBuf), Error> {
        info!("Capturing boot log for {:?}", self.config.boot_capture);

        channel.reset_input_buffer()?;

        let log = console::drain(channel, self.config.boot_capture)?;
        let path = self.logs.write_boot_log(&log, &chrono::Local::now())?;

        info!("Boot log saved to {}", path.display());

        Ok((log, path))
    }

    fn round_trip_param<C: Channel>(&self, channel: &mut C) -> Result<ParamRoundTrip, Error> {
        let name = self.config.param_name.as_str();
        let settle = self.config.param_settle;

        let original = match console::fetch_param(channel, name, settle)? {
            ParamReading {
                value: Some(value), ..
            } => value,
            ParamReading {
                value: None,
                response,
            } => return Ok(ParamRoundTrip::Missing { response }),
        };

        info!("{} original value: {}", name, original);

        let temporary = toggle_value(
            &original,
            &self.config.probe_value,
            &self.config.fallback_value,
        )
        .to_owned();

        console::set_param(channel, name, &temporary, self.config.set_settle)?;
        let updated = console::fetch_param(channel, name, settle)?.value;
        info!("{} updated value: {:?}", name, updated);

        console::set_param(channel, name, &original, self.config.set_settle)?;
        let restored = console::fetch_param(channel, name, settle)?.value;
        info!("{} restored value: {:?}", name, restored);

        Ok(ParamRoundTrip::Completed {
            original,
            temporary,
            updated,
            restored,
        })
    }
}
