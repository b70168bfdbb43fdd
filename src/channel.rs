//! Byte-level access to the board's serial console

use std::io;

/// A bidirectional byte channel to the firmware console.
///
/// `SerialChannel` is the real implementation. Everything that talks to the console is written
/// against this trait so that it can be driven by a scripted console in tests.
pub trait Channel {
    /// Writes all of `bytes`, blocking until the driver has accepted them.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Returns the number of bytes currently buffered for reading, without blocking.
    fn bytes_available(&mut self) -> io::Result<usize>;

    /// Performs a single read into `buf`, bounded by the channel's read timeout.
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Discards any bytes that are currently buffered for reading.
    fn reset_input_buffer(&mut self) -> io::Result<()>;

    /// Releases the channel.
    fn close(self)
    where
        Self: Sized,
    {
    }

    /// Reads the bytes that are buffered right now.
    ///
    /// Short reads are retried until the reported count has been read, and a read timeout ends
    /// the read with whatever arrived before it.
    fn read_available(&mut self) -> io::Result<Vec<u8>> {
        let pending = self.bytes_available()?;
        let mut buf = vec![0u8; pending];
        let mut filled = 0;

        while filled < pending {
            match self.read_bytes(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref err) if err.kind() == io::ErrorKind::TimedOut => break,
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }

        buf.truncate(filled);

        Ok(buf)
    }
}

impl<C: Channel + ?Sized> Channel for &mut C {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        (**self).bytes_available()
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_bytes(buf)
    }

    fn reset_input_buffer(&mut self) -> io::Result<()> {
        (**self).reset_input_buffer()
    }
}
