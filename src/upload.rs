use std::process::Command;

use log::{debug, info};

use crate::Error;

/// Something that can put a firmware image onto the board.
pub trait Flasher {
    fn flash(&mut self) -> Result<(), Error>;
}

/// Builds and uploads a firmware target by running `<build_tool> <target> upload`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Uploader {
    pub build_tool: String,
    pub target: String,
}

impl Uploader {
    pub fn new<S: Into<String>, T: Into<String>>(build_tool: S, target: T) -> Uploader {
        Uploader {
            build_tool: build_tool.into(),
            target: target.into(),
        }
    }

    /// Runs the build tool and blocks until it exits. A nonzero exit status is an error.
    pub fn upload(&self) -> Result<(), Error> {
        info!("Flashing target: {}", self.target);
        debug!("Running {} {} upload", self.build_tool, self.target);

        let status = Command::new(&self.build_tool)
            .arg(&self.target)
            .arg("upload")
            .status()
            .map_err(|err| Error::UploadLaunchError(self.build_tool.clone(), err))?;

        if !status.success() {
            return Err(Error::UploadFailed(self.target.clone(), status));
        }

        debug!("{} exited with {}", self.build_tool, status);

        Ok(())
    }
}

impl Flasher for Uploader {
    fn flash(&mut self) -> Result<(), Error> {
        self.upload()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn it_should_succeed_when_the_tool_exits_cleanly() {
        let uploader = Uploader::new("true", "microchip_samv71-xult-clickboards_default");

        assert!(uploader.upload().is_ok());
    }

    #[test]
    fn it_should_fail_on_a_nonzero_exit_status() {
        let mut uploader = Uploader::new("false", "microchip_samv71-xult-clickboards_default");

        match uploader.flash() {
            Err(Error::UploadFailed(target, status)) => {
                assert_eq!(target, "microchip_samv71-xult-clickboards_default");
                assert_eq!(status.code(), Some(1));
            }
            other => panic!("expected UploadFailed, got {:?}", other),
        }
    }

    #[test]
    fn it_should_fail_when_the_tool_cannot_be_launched() {
        let uploader = Uploader::new("./no-such-build-tool", "px4_sitl_default");

        match uploader.upload() {
            Err(Error::UploadLaunchError(tool, err)) => {
                assert_eq!(tool, "./no-such-build-tool");
                assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("expected UploadLaunchError, got {:?}", other),
        }
    }
}
