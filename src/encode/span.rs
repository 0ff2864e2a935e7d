/// Write cursor over the unwritten tail of a buffer.
///
/// Bytes land in the span immediately but are only committed once the caller
/// advances the buffer by [`SpanWriter::written`], so a failed `put` leaves the
/// buffer's committed region untouched.
pub(crate) struct SpanWriter<'a> {
    dst: &'a mut [u8],
    pos: usize,
}

impl<'a> SpanWriter<'a> {
    #[inline(always)]
    pub(crate) fn new(dst: &'a mut [u8]) -> Self {
        Self { dst, pos: 0 }
    }

    #[inline(always)]
    pub(crate) fn written(&self) -> usize {
        self.pos
    }

    #[inline(always)]
    pub(crate) fn remaining(&self) -> usize {
        self.dst.len() - self.pos
    }

    /// Copies `bytes` in full, or nothing.
    #[inline(always)]
    pub(crate) fn put(&mut self, bytes: &[u8]) -> bool {
        let end = self.pos + bytes.len();
        match self.dst.get_mut(self.pos..end) {
            Some(slot) => {
                slot.copy_from_slice(bytes);
                self.pos = end;
                true
            }
            None => false,
        }
    }

    #[inline(always)]
    pub(crate) fn put_int<I: itoa::Integer>(&mut self, n: I) -> bool {
        self.put(itoa::Buffer::new().format(n).as_bytes())
    }
}

/// Decimal width of an integer, matching what [`SpanWriter::put_int`] writes.
#[inline(always)]
pub(crate) fn int_len<I: itoa::Integer>(n: I) -> usize {
    itoa::Buffer::new().format(n).len()
}
