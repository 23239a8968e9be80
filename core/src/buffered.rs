use crate::{Result, Transport};

/// Default read/write buffer capacity.
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Batching decorator: coalesces small writes and reads ahead in fixed-size
/// chunks, without delimiting messages. Bytes cross the wire on `flush` or
/// when the write buffer fills.
#[derive(Debug)]
pub struct BufferedTransport<T> {
    inner: T,
    wbuf:  Vec<u8>,
    rbuf:  Vec<u8>,
    rpos:  usize,
    cap:   usize,
}

impl<T: Transport> BufferedTransport<T> {
    /// Wrap `inner` with the default buffer capacity.
    pub fn new(inner: T) -> Self {
        Self::with_capacity(inner, DEFAULT_BUFFER_CAPACITY)
    }

    /// Wrap `inner` with an explicit buffer capacity.
    pub fn with_capacity(inner: T, cap: usize) -> Self {
        Self {
            inner,
            wbuf: Vec::with_capacity(cap),
            rbuf: Vec::new(),
            rpos: 0,
            cap: cap.max(1),
        }
    }

    /// Consume the decorator, returning the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    fn flush_wbuf(&mut self) -> Result<()> {
        if !self.wbuf.is_empty() {
            self.inner.write(&self.wbuf)?;
            self.wbuf.clear();
        }
        Ok(())
    }
}

impl<T: Transport> Transport for BufferedTransport<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        if self.rpos == self.rbuf.len() {
            // Large reads bypass the buffer entirely.
            if buf.len() >= self.cap {
                return self.inner.read(buf);
            }
            self.rbuf.resize(self.cap, 0);
            let n = self.inner.read(&mut self.rbuf)?;
            self.rbuf.truncate(n);
            self.rpos = 0;
            if n == 0 {
                return Ok(0);
            }
        }

        let n = buf.len().min(self.rbuf.len() - self.rpos);
        buf[..n].copy_from_slice(&self.rbuf[self.rpos..self.rpos + n]);
        self.rpos += n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        if self.wbuf.len() + buf.len() > self.cap {
            self.flush_wbuf()?;
        }
        if buf.len() >= self.cap {
            // Too big to batch; send straight through.
            return self.inner.write(buf);
        }
        self.wbuf.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flush_wbuf()?;
        self.inner.flush()
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}
