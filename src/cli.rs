use std::path::PathBuf;
use std::time::{Duration, Instant};

use structopt::StructOpt;

use px4_smoke::Config;

/// Parses a non-negative, decimal number of seconds
fn parse_seconds(src: &str) -> Result<Duration, String> {
    let secs: f64 = src
        .parse()
        .map_err(|err| format!("{:?} is not a number of seconds: {}", src, err))?;

    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("{:?} is not a valid duration", src));
    }

    let duration = Duration::try_from_secs_f64(secs)
        .map_err(|err| format!("{:?} is not a valid duration: {}", src, err))?;

    // The drain loop needs a deadline it can represent
    if Instant::now().checked_add(duration).is_none() {
        return Err(format!("{:?} is too long a duration", src));
    }

    Ok(duration)
}

#[derive(StructOpt, Debug)]
#[structopt(
    name = "px4-smoke",
    about = "Flashes a PX4 board and smoke tests its serial console"
)]
pub struct Opts {
    /// The serial device of the board's console
    #[structopt(
        env = "SERIAL_PORT",
        short = "p",
        long = "port",
        default_value = "/dev/ttyACM0"
    )]
    pub serial_port: String,
    /// The console baud rate
    #[structopt(
        env = "BAUD_RATE",
        short = "b",
        long = "baud-rate",
        default_value = "115200"
    )]
    pub baud_rate: u32,
    /// Upper bound in seconds for a single serial read
    #[structopt(
        env = "READ_TIMEOUT",
        long = "read-timeout",
        default_value = "0.5",
        parse(try_from_str = parse_seconds)
    )]
    pub read_timeout: Duration,
    /// The build tool used to flash the board
    #[structopt(env = "BUILD_TOOL", long = "build-tool", default_value = "make")]
    pub build_tool: String,
    /// The firmware target to build and upload
    #[structopt(
        env = "BUILD_TARGET",
        short = "t",
        long = "target",
        default_value = "microchip_samv71-xult-clickboards_default"
    )]
    pub build_target: String,
    /// Seconds of console output to capture as the boot log
    #[structopt(
        env = "BOOT_CAPTURE",
        long = "boot-capture",
        default_value = "6",
        parse(try_from_str = parse_seconds)
    )]
    pub boot_capture: Duration,
    /// Seconds to wait for the `ver all` response
    #[structopt(
        env = "VERSION_SETTLE",
        long = "version-settle",
        default_value = "2.5",
        parse(try_from_str = parse_seconds)
    )]
    pub version_settle: Duration,
    /// Seconds to wait for a `param show` response
    #[structopt(
        env = "PARAM_SETTLE",
        long = "param-settle",
        default_value = "1.0",
        parse(try_from_str = parse_seconds)
    )]
    pub param_settle: Duration,
    /// Seconds to wait after a `param set`
    #[structopt(
        env = "SET_SETTLE",
        long = "set-settle",
        default_value = "1.5",
        parse(try_from_str = parse_seconds)
    )]
    pub set_settle: Duration,
    /// The directory the logs are written to
    #[structopt(
        env = "LOG_ROOT",
        long = "log-root",
        default_value = "test_data/boot_logs",
        parse(from_os_str)
    )]
    pub log_root: PathBuf,
    /// The parameter to read, change and restore
    #[structopt(env = "PARAM_NAME", long = "param", default_value = "SYS_AUTOSTART")]
    pub param_name: String,
    /// The value the parameter is temporarily set to
    #[structopt(env = "PROBE_VALUE", long = "probe-value", default_value = "60100")]
    pub probe_value: String,
    /// The temporary value used when the parameter already holds the probe value
    #[structopt(env = "FALLBACK_VALUE", long = "fallback-value", default_value = "0")]
    pub fallback_value: String,
}

impl Opts {
    /// Returns the smoke test configuration described by the options.
    pub fn config(&self) -> Config {
        Config {
            port: self.serial_port.clone(),
            baud_rate: self.baud_rate,
            read_timeout: self.read_timeout,
            build_tool: self.build_tool.clone(),
            build_target: self.build_target.clone(),
            boot_capture: self.boot_capture,
            version_settle: self.version_settle,
            param_settle: self.param_settle,
            set_settle: self.set_settle,
            log_root: self.log_root.clone(),
            param_name: self.param_name.clone(),
            probe_value: self.probe_value.clone(),
            fallback_value: self.fallback_value.clone(),
        }
    }
}
