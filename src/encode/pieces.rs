use super::{text, CellLayout, Segment, SpanWriter};
use crate::buffer::SpreadsheetBuffer;

/// Where a piece-by-piece cell write currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceStage {
    Start,
    /// `offset` is a byte offset into the segment's source text.
    Body { segment: usize, offset: usize },
    End,
    Done,
}

/// Writes one cell across as many buffer flushes as it needs.
///
/// Every stage is committed atomically, so after a flush the writer resumes
/// exactly where it stopped.
#[derive(Debug)]
pub struct CellPieces<'a> {
    layout: CellLayout<'a>,
    stage: PieceStage,
}

impl<'a> CellPieces<'a> {
    pub fn new(layout: CellLayout<'a>) -> Self {
        Self {
            layout,
            stage: PieceStage::Start,
        }
    }

    pub fn stage(&self) -> PieceStage {
        self.stage
    }

    pub fn is_done(&self) -> bool {
        self.stage == PieceStage::Done
    }

    /// Writes as many pieces as the buffer has room for.
    ///
    /// Returns `true` once the end tag is committed; `false` means the caller
    /// must flush and call again.
    pub fn write_available(&mut self, buf: &mut SpreadsheetBuffer) -> bool {
        loop {
            match self.stage {
                PieceStage::Start => {
                    let start = self.layout.start;
                    if !buf.try_put(|w| start.put(w)) {
                        return false;
                    }
                    self.stage = PieceStage::Body { segment: 0, offset: 0 };
                }
                PieceStage::Body { segment, offset } => match self.layout.segment(segment) {
                    None => self.stage = PieceStage::End,
                    Some(Segment::Escaped(s)) => {
                        let mut w = SpanWriter::new(buf.span());
                        let next = text::write_escaped_from(s, offset, &mut w);
                        let written = w.written();
                        buf.advance(written);
                        if next < s.len() {
                            self.stage = PieceStage::Body { segment, offset: next };
                            return false;
                        }
                        self.stage = PieceStage::Body { segment: segment + 1, offset: 0 };
                    }
                    Some(atomic) => {
                        if !buf.try_put(|w| atomic.put(w)) {
                            return false;
                        }
                        self.stage = PieceStage::Body { segment: segment + 1, offset: 0 };
                    }
                },
                PieceStage::End => {
                    if !buf.try_write(self.layout.end) {
                        return false;
                    }
                    self.stage = PieceStage::Done;
                }
                PieceStage::Done => return true,
            }
        }
    }
}
