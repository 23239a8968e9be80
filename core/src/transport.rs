use crate::{Result, TransportError};

/// The byte-stream contract every transport binding satisfies.
///
/// Upper protocol layers use these four operations uniformly, independent of
/// the medium carrying the bytes. Each transport instance has exactly one
/// logical owner; operations take `&mut self` and are sequential.
pub trait Transport: std::fmt::Debug {
    /// Read up to `buf.len()` bytes, blocking until at least one byte is
    /// available, the transport's receive timeout elapses, or the
    /// connection errors. Returns the number of bytes read; `Ok(0)` means
    /// the peer closed the connection cleanly.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Send the whole byte slice. Errors from the underlying connection are
    /// surfaced, never swallowed.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Push any buffered bytes down to the wire. Transports that transmit
    /// synchronously on every write implement this as a no-op.
    fn flush(&mut self) -> Result<()>;

    /// Close the underlying connection. Operations after a close fail with
    /// a closed-transport condition.
    fn close(&mut self) -> Result<()>;

    /// Block until `buf` is filled exactly. A clean disconnect before the
    /// requested length is available is reported as [`TransportError::Closed`].
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..])? {
                0 => return Err(TransportError::Closed),
                n => filled += n,
            }
        }
        Ok(())
    }

    /// Send a payload made of non-contiguous chunks, in order.
    fn write_vectored_all(&mut self, bufs: &[&[u8]]) -> Result<()> {
        for buf in bufs {
            self.write(buf)?;
        }
        Ok(())
    }
}
