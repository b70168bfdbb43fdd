use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error when opening serial port {}: {}", _0, _1)]
    SerialOpenError(String, serialport::Error),
    #[error("Could not launch build tool {:?}: {}", _0, _1)]
    UploadLaunchError(String, io::Error),
    #[error("Uploading target {} failed - build tool exited with {}", _0, _1)]
    UploadFailed(String, ExitStatus),
    #[error("Could not write log file {}: {}", _0.display(), _1)]
    LogWriteError(PathBuf, io::Error),
    #[error("I/O error: {}", _0)]
    IoError(#[from] io::Error),
}
