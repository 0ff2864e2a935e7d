//! Worksheet-level row streaming.

use crate::buffer::SpreadsheetBuffer;
use crate::config::StreamOptions;
use crate::row::{RowCell, RowCursor, RowWriter};
use crate::types::{Result, RowOptions, WriteError};
use crate::validation::validate_row;
use log::{debug, warn};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Streams rows of one worksheet's `<sheetData>` into an async sink.
///
/// Rows are numbered from 1 and must be added in increasing order; gaps are
/// allowed through [`add_row_at`](Self::add_row_at). Once a write fails
/// part way through a row the stream is poisoned and every later call
/// returns [`WriteError::Poisoned`].
pub struct RowStream<W> {
    sink: W,
    buffer: SpreadsheetBuffer,
    cursor: RowCursor,
    next_row: u32,
    options: StreamOptions,
    cancel: CancellationToken,
    poisoned: bool,
}

impl<W: AsyncWrite + Unpin> RowStream<W> {
    pub fn new(sink: W, options: StreamOptions) -> Result<Self> {
        options.validate()?;
        let buffer = SpreadsheetBuffer::new(options.buffer_size)?;
        Ok(Self {
            sink,
            buffer,
            cursor: RowCursor::Idle,
            next_row: 1,
            options,
            cancel: CancellationToken::new(),
            poisoned: false,
        })
    }

    /// Cancelling `token` makes the next flush fail with
    /// [`WriteError::Cancelled`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Row index the next [`add_row`](Self::add_row) will use.
    pub fn next_row_index(&self) -> u32 {
        self.next_row
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Bytes committed but not yet handed to the sink.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub async fn add_row<C: RowCell>(&mut self, cells: &[C]) -> Result<()> {
        self.add_row_at(self.next_row, cells, None).await
    }

    pub async fn add_row_with_options<C: RowCell>(
        &mut self,
        cells: &[C],
        options: &RowOptions,
    ) -> Result<()> {
        self.add_row_at(self.next_row, cells, Some(options)).await
    }

    /// Writes `cells` as row `row`, which may skip ahead of
    /// [`next_row_index`](Self::next_row_index) but never go back.
    pub async fn add_row_at<C: RowCell>(
        &mut self,
        row: u32,
        cells: &[C],
        options: Option<&RowOptions>,
    ) -> Result<()> {
        self.ensure_usable()?;
        validate_row(row, self.next_row, cells.len(), options)?;

        let result = self.write_row(row, cells, options).await;
        self.settle(result)?;
        self.next_row = row + 1;
        Ok(())
    }

    async fn write_row<C: RowCell>(
        &mut self,
        row: u32,
        cells: &[C],
        options: Option<&RowOptions>,
    ) -> Result<()> {
        let writer = RowWriter::<C>::new()
            .with_cell_references(self.options.write_cell_references)
            .with_date_style(self.options.date_style);

        if writer.try_write_row(&mut self.buffer, &mut self.cursor, cells, row, options) {
            return Ok(());
        }

        writer
            .write_row_async(
                &mut self.buffer,
                &mut self.cursor,
                cells,
                row,
                options,
                &mut self.sink,
                &self.cancel,
            )
            .await
    }

    /// Passes surrounding markup such as `<sheetData>` through the same
    /// buffer so it stays ordered with the rows.
    pub async fn write_fragment(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_usable()?;
        let result = self.write_fragment_inner(bytes).await;
        self.settle(result)
    }

    async fn write_fragment_inner(&mut self, bytes: &[u8]) -> Result<()> {
        if self.buffer.try_write(bytes) {
            return Ok(());
        }
        self.buffer.flush_to(&mut self.sink, &self.cancel).await?;
        if self.buffer.try_write(bytes) {
            return Ok(());
        }

        if self.cancel.is_cancelled() {
            return Err(WriteError::Cancelled);
        }
        self.sink.write_all(bytes).await?;
        Ok(())
    }

    /// Hands everything buffered so far to the sink.
    pub async fn flush(&mut self) -> Result<()> {
        self.ensure_usable()?;
        let result = self.buffer.flush_to(&mut self.sink, &self.cancel).await;
        self.settle(result)
    }

    /// Flushes the buffer and the sink, then gives the sink back.
    pub async fn finish(mut self) -> Result<W> {
        self.flush().await?;
        let result = self.sink.flush().await.map_err(WriteError::from);
        self.settle(result)?;
        Ok(self.sink)
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            return Err(WriteError::Poisoned);
        }
        Ok(())
    }

    fn settle(&mut self, result: Result<()>) -> Result<()> {
        if let Err(err) = &result {
            self.poison(err);
        }
        result
    }

    fn poison(&mut self, err: &WriteError) {
        if matches!(err, WriteError::Cancelled) {
            warn!(
                "row stream cancelled, discarding {} buffered bytes",
                self.buffer.len()
            );
            self.buffer.clear();
        } else {
            debug!("row stream poisoned at row {}: {err}", self.next_row);
        }
        self.cursor = RowCursor::Idle;
        self.poisoned = true;
    }
}
