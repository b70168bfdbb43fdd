pub mod channel;
pub mod console;
mod error;
pub mod logs;
pub mod smoke;
pub mod upload;

use std::fmt;
use std::io::{self, Read, Write};
use std::ops::{Deref, DerefMut};
use std::time::Duration;

pub use error::Error;

pub use channel::Channel;
pub use smoke::{Config, ParamRoundTrip, Report, SmokeTest, Warning};
pub use upload::{Flasher, Uploader};

use log::debug;
pub use serialport;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, StopBits};

/// Serial connection to the board's console.
pub struct SerialChannel {
    inner_port: Box<dyn serialport::SerialPort>,
}

impl fmt::Debug for SerialChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialChannel")
            .field("name", &self.name())
            .field("baud_rate", &self.baud_rate().ok())
            .field("timeout", &self.timeout())
            .finish()
    }
}

impl Deref for SerialChannel {
    type Target = Box<dyn serialport::SerialPort>;

    fn deref(&self) -> &Self::Target {
        &self.inner_port
    }
}

impl DerefMut for SerialChannel {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner_port
    }
}

impl SerialChannel {
    /// Opens the given `port` with 8N1 framing at `baud_rate`. Reads block for at most
    /// `read_timeout`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    ///
    /// use px4_smoke::SerialChannel;
    ///
    /// let channel = SerialChannel::open("/dev/ttyACM0", 115_200, Duration::from_millis(500))?;
    ///
    /// # Ok::<(), px4_smoke::Error>(())
    /// ```
    pub fn open(port: &str, baud_rate: u32, read_timeout: Duration) -> Result<SerialChannel, Error> {
        debug!("Opening serial port {} @ {} baud", port, baud_rate);

        let serial_port = serialport::new(port, baud_rate)
            .data_bits(DataBits::Eight)
            .flow_control(FlowControl::None)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(read_timeout)
            .open()
            .map_err(|err| Error::SerialOpenError(port.to_owned(), err))?;

        Ok(SerialChannel {
            inner_port: serial_port,
        })
    }
}

impl Channel for SerialChannel {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        Write::write_all(&mut self.inner_port, bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        Ok(self.inner_port.bytes_to_read()? as usize)
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner_port.read(buf)
    }

    fn reset_input_buffer(&mut self) -> io::Result<()> {
        Ok(self.inner_port.clear(ClearBuffer::Input)?)
    }

    fn close(self) {
        debug!("Closing serial port {:?}", self.name());
    }
}
