use crate::encode::SpanWriter;
use crate::types::{Result, WriteError};
use log::trace;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Smallest buffer that still fits every fixed-shape fragment after a flush.
pub const MIN_BUFFER_SIZE: usize = 512;

pub const DEFAULT_BUFFER_SIZE: usize = 65_536;

/// Fixed-capacity staging area between the encoders and the sink.
///
/// The backing memory is allocated once and reused for every row. Only the
/// committed prefix (`as_bytes`) ever reaches the sink.
#[derive(Debug)]
pub struct SpreadsheetBuffer {
    data: Box<[u8]>,
    index: usize,
}

impl SpreadsheetBuffer {
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity < MIN_BUFFER_SIZE {
            return Err(WriteError::BufferTooSmall {
                size: capacity,
                min: MIN_BUFFER_SIZE,
            });
        }

        Ok(Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            index: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Committed bytes waiting for a flush.
    pub fn len(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.index == 0
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.index
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.index]
    }

    /// The writable tail. Nothing written here counts until [`advance`](Self::advance).
    pub fn span(&mut self) -> &mut [u8] {
        &mut self.data[self.index..]
    }

    /// Commits `n` bytes written into the last [`span`](Self::span).
    ///
    /// # Panics
    ///
    /// If `n` exceeds the remaining capacity.
    pub fn advance(&mut self, n: usize) {
        assert!(
            n <= self.remaining(),
            "advanced by {n} bytes with only {} remaining",
            self.remaining()
        );
        self.index += n;
    }

    /// Copies a fixed fragment in full, or leaves the buffer unchanged.
    pub fn try_write(&mut self, bytes: &[u8]) -> bool {
        self.try_put(|w| w.put(bytes))
    }

    /// Runs `write` against the tail and commits only if it reports success.
    pub(crate) fn try_put(&mut self, write: impl FnOnce(&mut SpanWriter) -> bool) -> bool {
        let mut w = SpanWriter::new(self.span());
        if !write(&mut w) {
            return false;
        }
        let written = w.written();
        self.advance(written);
        true
    }

    /// Discards committed bytes without writing them anywhere.
    pub fn clear(&mut self) {
        self.index = 0;
    }

    /// Hands every committed byte to `sink` and resets the buffer.
    ///
    /// An empty buffer is a no-op. Otherwise the token is checked before any
    /// I/O; on cancellation or an I/O error the committed bytes stay in place.
    pub async fn flush_to<W>(&mut self, sink: &mut W, cancel: &CancellationToken) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if self.index == 0 {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(WriteError::Cancelled);
        }

        trace!("flushing {} buffered bytes", self.index);
        sink.write_all(&self.data[..self.index]).await?;
        self.index = 0;
        Ok(())
    }
}

impl Default for SpreadsheetBuffer {
    fn default() -> Self {
        Self {
            data: vec![0u8; DEFAULT_BUFFER_SIZE].into_boxed_slice(),
            index: 0,
        }
    }
}
