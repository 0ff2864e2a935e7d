//! Sheet limits checked before a row is buffered.

use crate::types::{RowOptions, WriteError};

// Excel hard limits
pub const MAX_ROWS: u32 = 1_048_576;
pub const MAX_COLS: usize = 16_384;
const MAX_ROW_HEIGHT: f64 = 409.5;

/// Validate a 1-based row index
pub fn validate_row_index(row: u32) -> Result<(), String> {
    if row == 0 || row > MAX_ROWS {
        return Err(format!("Row index {} out of range (1-{})", row, MAX_ROWS));
    }
    Ok(())
}

/// Rows must be written in strictly increasing order
pub fn validate_row_order(row: u32, next_row: u32) -> Result<(), String> {
    if row < next_row {
        return Err(format!(
            "Row {} written out of order, next row must be at least {}",
            row, next_row
        ));
    }
    Ok(())
}

pub fn validate_column_count(count: usize) -> Result<(), String> {
    if count > MAX_COLS {
        return Err(format!(
            "Row has {} cells, at most {} columns are allowed",
            count, MAX_COLS
        ));
    }
    Ok(())
}

/// Validate row height
pub fn validate_row_options(options: &RowOptions) -> Result<(), String> {
    if let Some(height) = options.height {
        if !height.is_finite() || !(0.0..=MAX_ROW_HEIGHT).contains(&height) {
            return Err(format!(
                "Row height {} out of range (0-{})",
                height, MAX_ROW_HEIGHT
            ));
        }
    }
    Ok(())
}

/// Everything a row must satisfy before any of it is buffered.
pub fn validate_row(
    row: u32,
    next_row: u32,
    column_count: usize,
    options: Option<&RowOptions>,
) -> Result<(), WriteError> {
    validate_row_index(row)
        .and_then(|_| validate_row_order(row, next_row))
        .and_then(|_| validate_column_count(column_count))
        .and_then(|_| options.map_or(Ok(()), validate_row_options))
        .map_err(WriteError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_index_bounds() {
        assert!(validate_row_index(0).is_err());
        assert!(validate_row_index(1).is_ok());
        assert!(validate_row_index(MAX_ROWS).is_ok());
        assert!(validate_row_index(MAX_ROWS + 1).is_err());
    }

    #[test]
    fn test_row_order() {
        assert!(validate_row_order(5, 5).is_ok());
        assert!(validate_row_order(9, 5).is_ok());
        assert!(validate_row_order(4, 5).is_err());
    }

    #[test]
    fn test_column_count() {
        assert!(validate_column_count(MAX_COLS).is_ok());
        assert!(validate_column_count(MAX_COLS + 1).is_err());
    }

    #[test]
    fn test_row_heights() {
        assert!(validate_row_options(&RowOptions::default().with_height(15.0)).is_ok());
        assert!(validate_row_options(&RowOptions::default().with_height(-1.0)).is_err());
        assert!(validate_row_options(&RowOptions::default().with_height(410.0)).is_err());
        assert!(validate_row_options(&RowOptions::default().with_height(f64::NAN)).is_err());
    }

    #[test]
    fn test_validate_row_wraps_message() {
        let err = validate_row(0, 1, 1, None).unwrap_err();
        assert!(matches!(err, WriteError::Validation(msg) if msg.contains("Row index 0")));
    }
}
