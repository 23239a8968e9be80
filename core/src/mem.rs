use std::collections::VecDeque;

use crate::{Result, Transport, TransportError};

/// In-memory transport: bytes written are queued and served back to reads.
///
/// Used as the test double for the decorators and anything else that needs a
/// transport without a socket. Reads never block; an empty queue reads as a
/// clean disconnect.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    queue:  VecDeque<u8>,
    closed: bool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued bytes.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Transport for MemoryTransport {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let n = buf.len().min(self.queue.len());
        for (slot, byte) in buf[..n].iter_mut().zip(self.queue.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.queue.extend(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.queue.clear();
        Ok(())
    }
}
