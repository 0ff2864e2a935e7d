use chrono::{NaiveDate, NaiveDateTime};
use thiserror::Error;

/// A single cell value, before styling or formulas are attached.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DataCell {
    #[default]
    Blank,
    Text(String),
    Number(f64),
    Integer(i64),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Error(CellError),
}

impl DataCell {
    /// Upper bound on the bytes the value itself needs once encoded.
    ///
    /// Scalars are bounded by the widest number text; text is bounded by the
    /// worst-case escape expansion of every source byte.
    pub fn encoded_len_hint(&self) -> usize {
        match self {
            DataCell::Blank => 0,
            DataCell::Text(s) => s.len() * crate::encode::MAX_ESCAPED_LEN,
            DataCell::Boolean(_) => 1,
            DataCell::Error(e) => e.as_str().len(),
            DataCell::Number(_) | DataCell::Integer(_) | DataCell::DateTime(_) => {
                crate::encode::MAX_NUMBER_LEN
            }
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, DataCell::Blank)
    }
}

impl From<&str> for DataCell {
    fn from(value: &str) -> Self {
        DataCell::Text(value.to_string())
    }
}

impl From<String> for DataCell {
    fn from(value: String) -> Self {
        DataCell::Text(value)
    }
}

impl From<f64> for DataCell {
    fn from(value: f64) -> Self {
        DataCell::Number(value)
    }
}

impl From<f32> for DataCell {
    fn from(value: f32) -> Self {
        DataCell::Number(value as f64)
    }
}

impl From<i64> for DataCell {
    fn from(value: i64) -> Self {
        DataCell::Integer(value)
    }
}

impl From<i32> for DataCell {
    fn from(value: i32) -> Self {
        DataCell::Integer(value as i64)
    }
}

impl From<u32> for DataCell {
    fn from(value: u32) -> Self {
        DataCell::Integer(value as i64)
    }
}

impl From<bool> for DataCell {
    fn from(value: bool) -> Self {
        DataCell::Boolean(value)
    }
}

impl From<NaiveDateTime> for DataCell {
    fn from(value: NaiveDateTime) -> Self {
        DataCell::DateTime(value)
    }
}

impl From<NaiveDate> for DataCell {
    fn from(value: NaiveDate) -> Self {
        DataCell::DateTime(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<CellError> for DataCell {
    fn from(value: CellError) -> Self {
        DataCell::Error(value)
    }
}

impl<T: Into<DataCell>> From<Option<T>> for DataCell {
    fn from(value: Option<T>) -> Self {
        value.map_or(DataCell::Blank, Into::into)
    }
}

/// Spreadsheet error literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    Null,
    DivisionByZero,
    Value,
    Reference,
    Name,
    Number,
    NotAvailable,
    GettingData,
}

impl CellError {
    pub fn as_str(self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::DivisionByZero => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Reference => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Number => "#NUM!",
            CellError::NotAvailable => "#N/A",
            CellError::GettingData => "#GETTING_DATA",
        }
    }
}

/// Style index already resolved against the workbook's `cellXfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleId(pub u32);

impl From<u32> for StyleId {
    fn from(id: u32) -> Self {
        StyleId(id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub text: String,
    pub cached: Option<DataCell>,
}

impl Formula {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cached: None,
        }
    }

    pub fn with_cached(mut self, value: impl Into<DataCell>) -> Self {
        self.cached = Some(value.into());
        self
    }
}

/// A value with an optional style.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyledCell {
    pub value: DataCell,
    pub style: Option<StyleId>,
}

impl StyledCell {
    pub fn new(value: impl Into<DataCell>, style: Option<StyleId>) -> Self {
        Self {
            value: value.into(),
            style,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Value(DataCell),
    Formula(Formula),
}

/// The most general cell: a value or a formula, optionally styled.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub content: CellContent,
    pub style: Option<StyleId>,
}

impl Cell {
    pub fn new(value: impl Into<DataCell>) -> Self {
        Self {
            content: CellContent::Value(value.into()),
            style: None,
        }
    }

    pub fn formula(formula: Formula) -> Self {
        Self {
            content: CellContent::Formula(formula),
            style: None,
        }
    }

    pub fn with_style(mut self, style: impl Into<StyleId>) -> Self {
        self.style = Some(style.into());
        self
    }
}

impl From<DataCell> for Cell {
    fn from(value: DataCell) -> Self {
        Cell::new(value)
    }
}

impl From<Formula> for Cell {
    fn from(formula: Formula) -> Self {
        Cell::formula(formula)
    }
}

/// Row-level attributes written on the `<row>` start tag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowOptions {
    /// Height in points.
    pub height: Option<f64>,
    pub hidden: bool,
    pub style: Option<StyleId>,
}

impl RowOptions {
    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_style(mut self, style: impl Into<StyleId>) -> Self {
        self.style = Some(style.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("write was cancelled")]
    Cancelled,

    #[error("row stream is unusable after an earlier failure")]
    Poisoned,

    #[error("buffer size {size} is below the minimum of {min} bytes")]
    BufferTooSmall { size: usize, min: usize },
}

pub type Result<T> = std::result::Result<T, WriteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_maps_none_to_blank() {
        assert_eq!(DataCell::from(None::<i32>), DataCell::Blank);
        assert_eq!(DataCell::from(Some("x")), DataCell::Text("x".to_string()));
    }

    #[test]
    fn test_date_converts_at_midnight() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let DataCell::DateTime(dt) = DataCell::from(date) else {
            panic!("expected a date-time cell");
        };
        assert_eq!(dt, date.and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn test_len_hint_bounds_text_escapes() {
        let cell = DataCell::from("<<<");
        assert!(cell.encoded_len_hint() >= "&lt;&lt;&lt;".len());
        assert_eq!(DataCell::Boolean(true).encoded_len_hint(), 1);
    }

    #[test]
    fn test_error_literals() {
        assert_eq!(CellError::NotAvailable.as_str(), "#N/A");
        assert_eq!(CellError::DivisionByZero.as_str(), "#DIV/0!");
    }
}
