use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, TimeZone};
use log::debug;

use crate::Error;

/// Filename of the `ver all` capture, overwritten on every run
pub const VERSION_LOG_NAME: &str = "latest_ver_all.log";

/// Writes the captured console output below a log root directory.
///
/// The directory is created on the first write, not when the store is constructed.
#[derive(Debug, Clone)]
pub struct LogStore {
    root: PathBuf,
}

impl LogStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> LogStore {
        LogStore { root: root.into() }
    }

    /// Writes a boot log named after `timestamp` and returns its path.
    pub fn write_boot_log<Tz>(&self, text: &str, timestamp: &DateTime<Tz>) -> Result<PathBuf, Error>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let filename = format!("boot_{}.log", timestamp.format("%Y%m%d_%H%M%S"));

        self.write(&filename, text)
    }

    /// Writes the `ver all` output, replacing the previous run's file.
    pub fn write_version_output(&self, text: &str) -> Result<PathBuf, Error> {
        self.write(VERSION_LOG_NAME, text)
    }

    fn write(&self, filename: &str, text: &str) -> Result<PathBuf, Error> {
        fs::create_dir_all(&self.root)
            .map_err(|err| Error::LogWriteError(self.root.clone(), err))?;

        let path = self.root.join(filename);

        debug!("Writing {} bytes to {}", text.len(), path.display());
        fs::write(&path, text).map_err(|err| Error::LogWriteError(path.clone(), err))?;

        Ok(path)
    }
}
