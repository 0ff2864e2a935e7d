//! Streaming xlsx row writer.
//!
//! Rows of cells are encoded as SpreadsheetML `<row>`/`<c>` markup into a
//! fixed-size [`SpreadsheetBuffer`] and flushed to any
//! [`tokio::io::AsyncWrite`] sink. Cells that do not fit the remaining space
//! wait for a flush; cells larger than the whole buffer are written piece by
//! piece, so memory use never depends on the size of a value.
//!
//! ```no_run
//! use jetrow::{DataCell, RowStream, StreamOptions};
//!
//! # async fn run() -> jetrow::Result<()> {
//! let file = tokio::fs::File::create("sheet1.xml").await?;
//! let mut rows = RowStream::new(file, StreamOptions::default())?;
//! rows.write_fragment(b"<sheetData>").await?;
//! rows.add_row(&[DataCell::from(42), DataCell::from("Nordmann"), DataCell::from(true)])
//!     .await?;
//! rows.write_fragment(b"</sheetData>").await?;
//! rows.finish().await?;
//! # Ok(())
//! # }
//! ```

mod encode;

pub mod buffer;
pub mod config;
pub mod row;
pub mod stream;
pub mod types;
pub mod validation;

#[cfg(feature = "arrow")]
pub mod arrow;

pub use buffer::{SpreadsheetBuffer, DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};
pub use config::StreamOptions;
pub use encode::{
    write_col_letter, CellLayout, CellPieces, CellRef, EncodeContext, Fit, PieceStage,
    MAX_ESCAPED_LEN, MAX_FIXED_CELL_LEN, MAX_NUMBER_LEN,
};
pub use row::{RowCell, RowCursor, RowWriter};
pub use stream::RowStream;
pub use types::{
    Cell, CellContent, CellError, DataCell, Formula, Result, RowOptions, StyleId, StyledCell,
    WriteError,
};
