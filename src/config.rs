use crate::buffer::{DEFAULT_BUFFER_SIZE, MIN_BUFFER_SIZE};
use crate::types::{StyleId, WriteError};

/// Settings for a [`RowStream`](crate::RowStream).
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOptions {
    /// Buffer capacity in bytes; at least [`MIN_BUFFER_SIZE`].
    pub buffer_size: usize,
    /// Write an `r` attribute on every cell (`<c r="B3">`).
    pub write_cell_references: bool,
    /// Style for date-time cells that have none, typically a date number format.
    pub date_style: Option<StyleId>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            write_cell_references: false,
            date_style: None,
        }
    }
}

impl StreamOptions {
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn with_cell_references(mut self, enabled: bool) -> Self {
        self.write_cell_references = enabled;
        self
    }

    pub fn with_date_style(mut self, style: impl Into<StyleId>) -> Self {
        self.date_style = Some(style.into());
        self
    }

    pub fn validate(&self) -> Result<(), WriteError> {
        if self.buffer_size < MIN_BUFFER_SIZE {
            return Err(WriteError::BufferTooSmall {
                size: self.buffer_size,
                min: MIN_BUFFER_SIZE,
            });
        }
        Ok(())
    }
}
