//! Row-level write protocol.
//!
//! A row is `<row r="N" ...>`, its cells left to right, then `</row>`. The
//! synchronous `try_*` methods write as much as fits and leave a [`RowCursor`]
//! pointing at the first unwritten cell; [`RowWriter::write_row_async`] picks
//! up from that cursor and flushes to the sink until the row is closed.

use crate::buffer::SpreadsheetBuffer;
use crate::encode::{
    with_float_text, CellLayout, CellPieces, CellRef, EncodeContext, Fit, SpanWriter,
};
use crate::types::{Cell, CellContent, DataCell, Result, RowOptions, StyleId, StyledCell};
use log::debug;
use std::fmt;
use std::marker::PhantomData;
use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;

const ROW_END: &[u8] = b"</row>";

mod sealed {
    pub trait Sealed {}
}

/// Cell types a [`RowWriter`] knows how to encode.
///
/// Implemented for [`DataCell`], [`StyledCell`] and [`Cell`].
pub trait RowCell: sealed::Sealed {
    #[doc(hidden)]
    fn layout<'a>(&'a self, ctx: &EncodeContext) -> CellLayout<'a>;
}

impl sealed::Sealed for DataCell {}

impl RowCell for DataCell {
    fn layout<'a>(&'a self, ctx: &EncodeContext) -> CellLayout<'a> {
        CellLayout::value(self, None, ctx)
    }
}

impl sealed::Sealed for StyledCell {}

impl RowCell for StyledCell {
    fn layout<'a>(&'a self, ctx: &EncodeContext) -> CellLayout<'a> {
        CellLayout::value(&self.value, self.style, ctx)
    }
}

impl sealed::Sealed for Cell {}

impl RowCell for Cell {
    fn layout<'a>(&'a self, ctx: &EncodeContext) -> CellLayout<'a> {
        match &self.content {
            CellContent::Value(value) => CellLayout::value(value, self.style, ctx),
            CellContent::Formula(formula) => CellLayout::formula(formula, self.style, ctx),
        }
    }
}

/// Resumable position within the row being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RowCursor {
    /// No row start is committed to the buffer.
    #[default]
    Idle,
    /// The row start is committed along with every cell before `column`.
    Open { row: u32, column: usize },
    /// `</row>` is committed; the next row may start.
    Closed { row: u32 },
}

impl RowCursor {
    pub fn column(&self) -> Option<usize> {
        match self {
            RowCursor::Open { column, .. } => Some(*column),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, RowCursor::Open { .. })
    }
}

enum Attempt {
    Done,
    Blocked(Fit),
}

/// Writes rows of `C` cells into a [`SpreadsheetBuffer`].
pub struct RowWriter<C> {
    write_cell_references: bool,
    date_style: Option<StyleId>,
    _cells: PhantomData<fn(&C)>,
}

impl<C> Clone for RowWriter<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for RowWriter<C> {}

impl<C> Default for RowWriter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for RowWriter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowWriter")
            .field("write_cell_references", &self.write_cell_references)
            .field("date_style", &self.date_style)
            .finish()
    }
}

impl<C> RowWriter<C> {
    pub fn new() -> Self {
        Self {
            write_cell_references: false,
            date_style: None,
            _cells: PhantomData,
        }
    }

    /// Emit an `r="A1"` attribute on every cell.
    pub fn with_cell_references(mut self, enabled: bool) -> Self {
        self.write_cell_references = enabled;
        self
    }

    /// Style applied to date-time cells that carry none of their own.
    pub fn with_date_style(mut self, style: Option<StyleId>) -> Self {
        self.date_style = style;
        self
    }

    fn context(&self, row: u32, column: usize) -> EncodeContext {
        EncodeContext {
            reference: self
                .write_cell_references
                .then_some(CellRef { row, column }),
            date_style: self.date_style,
        }
    }

    /// Writes the row start tag. On failure nothing is committed and the
    /// cursor is reset to [`RowCursor::Idle`].
    pub fn try_start_row(
        &self,
        buf: &mut SpreadsheetBuffer,
        cursor: &mut RowCursor,
        row: u32,
        options: Option<&RowOptions>,
    ) -> bool {
        if buf.try_put(|w| write_row_start(w, row, options)) {
            *cursor = RowCursor::Open { row, column: 0 };
            true
        } else {
            *cursor = RowCursor::Idle;
            false
        }
    }
}

impl<C: RowCell> RowWriter<C> {
    /// Writes a whole row if it fits.
    ///
    /// On failure the cursor marks the first cell that did not fit, or is
    /// [`RowCursor::Idle`] when even the row start did not.
    pub fn try_write_row(
        &self,
        buf: &mut SpreadsheetBuffer,
        cursor: &mut RowCursor,
        cells: &[C],
        row: u32,
        options: Option<&RowOptions>,
    ) -> bool {
        self.try_start_row(buf, cursor, row, options) && self.try_continue_row(buf, cursor, cells)
    }

    /// Resumes an open row at the cursor's column.
    ///
    /// # Panics
    ///
    /// If the cursor is not [`RowCursor::Open`].
    pub fn try_continue_row(
        &self,
        buf: &mut SpreadsheetBuffer,
        cursor: &mut RowCursor,
        cells: &[C],
    ) -> bool {
        matches!(self.continue_row(buf, cursor, cells), Attempt::Done)
    }

    fn continue_row(
        &self,
        buf: &mut SpreadsheetBuffer,
        cursor: &mut RowCursor,
        cells: &[C],
    ) -> Attempt {
        let (row, mut column) = match *cursor {
            RowCursor::Open { row, column } => (row, column),
            other => panic!("no row in progress to continue: {other:?}"),
        };

        while let Some(cell) = cells.get(column) {
            match cell.layout(&self.context(row, column)).try_write(buf) {
                Fit::Written => column += 1,
                blocked => {
                    *cursor = RowCursor::Open { row, column };
                    return Attempt::Blocked(blocked);
                }
            }
        }

        *cursor = RowCursor::Open { row, column };
        if !buf.try_write(ROW_END) {
            return Attempt::Blocked(Fit::Retry);
        }
        *cursor = RowCursor::Closed { row };
        Attempt::Done
    }

    /// Finishes a row of any size, flushing to `sink` as often as needed.
    ///
    /// Meant to be called after [`try_write_row`](Self::try_write_row) gave up:
    /// an open cursor for the same row is resumed, anything else starts the
    /// row over. The buffer is flushed only when the next fragment does not
    /// fit, and a cell larger than the whole buffer is written piece by piece
    /// straight after whatever is already buffered. Returns once `</row>` is
    /// committed to the buffer.
    #[allow(clippy::too_many_arguments)]
    pub async fn write_row_async<W>(
        &self,
        buf: &mut SpreadsheetBuffer,
        cursor: &mut RowCursor,
        cells: &[C],
        row: u32,
        options: Option<&RowOptions>,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if !matches!(*cursor, RowCursor::Open { row: open, .. } if open == row)
            && !self.try_start_row(buf, cursor, row, options)
        {
            buf.flush_to(sink, cancel).await?;
            let started = self.try_start_row(buf, cursor, row, options);
            assert!(started, "row start must fit an empty buffer");
        }

        loop {
            match self.continue_row(buf, cursor, cells) {
                Attempt::Done => return Ok(()),
                Attempt::Blocked(Fit::Oversized) => {
                    let column = cursor.column().unwrap_or_default();
                    debug!("row {row}: writing column {column} piece by piece");
                    self.write_cell_pieces(&cells[column], row, column, buf, sink, cancel)
                        .await?;
                    *cursor = RowCursor::Open {
                        row,
                        column: column + 1,
                    };
                }
                Attempt::Blocked(_) => {
                    assert!(
                        !buf.is_empty(),
                        "row {row} made no progress in an empty buffer"
                    );
                    buf.flush_to(sink, cancel).await?;
                }
            }
        }
    }

    async fn write_cell_pieces<W>(
        &self,
        cell: &C,
        row: u32,
        column: usize,
        buf: &mut SpreadsheetBuffer,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let mut pieces = CellPieces::new(cell.layout(&self.context(row, column)));
        while !pieces.write_available(buf) {
            assert!(
                !buf.is_empty(),
                "cell at row {row}, column {column} made no progress in an empty buffer"
            );
            buf.flush_to(sink, cancel).await?;
        }
        Ok(())
    }
}

fn write_row_start(w: &mut SpanWriter, row: u32, options: Option<&RowOptions>) -> bool {
    if !(w.put(b"<row r=\"") && w.put_int(row) && w.put(b"\"")) {
        return false;
    }

    if let Some(options) = options {
        if let Some(StyleId(sid)) = options.style {
            if !(w.put(b" s=\"") && w.put_int(sid) && w.put(b"\" customFormat=\"1\"")) {
                return false;
            }
        }
        if let Some(height) = options.height.filter(|h| h.is_finite()) {
            if !(w.put(b" ht=\"")
                && with_float_text(height, |t| w.put(t))
                && w.put(b"\" customHeight=\"1\""))
            {
                return false;
            }
        }
        if options.hidden && !w.put(b" hidden=\"1\"") {
            return false;
        }
    }

    w.put(b">")
}
