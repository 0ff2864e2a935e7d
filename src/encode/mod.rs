//! Cell encoders.
//!
//! Every cell is described as a [`CellLayout`]: a start tag, up to three body
//! segments and an end tag. Writing the layout in one go and writing it piece
//! by piece through [`CellPieces`] produce the same bytes.

mod datetime;
mod element;
mod number;
mod pieces;
mod span;
mod text;

pub use element::{write_col_letter, CellRef};
pub use number::MAX_NUMBER_LEN;
pub use pieces::{CellPieces, PieceStage};
pub use text::MAX_ESCAPED_LEN;

pub(crate) use datetime::datetime_to_excel_serial;
pub(crate) use number::with_float_text;
pub(crate) use span::SpanWriter;

use crate::buffer::SpreadsheetBuffer;
use crate::types::{CellError, DataCell, Formula, StyleId};
use element::StartTag;

/// Upper bound on every part of a cell except its text payloads.
pub const MAX_FIXED_CELL_LEN: usize = 128;

/// Per-cell inputs that do not come from the cell itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeContext {
    /// Set when cells must carry an `r` attribute.
    pub reference: Option<CellRef>,
    /// Fallback style for date-time values without one.
    pub date_style: Option<StyleId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Error(CellError),
}

impl Scalar {
    #[inline(always)]
    fn with_text<R>(self, f: impl FnOnce(&[u8]) -> R) -> R {
        match self {
            Scalar::Integer(n) => f(itoa::Buffer::new().format(n).as_bytes()),
            Scalar::Float(n) => with_float_text(n, f),
            Scalar::Boolean(b) => f(if b { b"1" } else { b"0" }),
            Scalar::Error(e) => f(e.as_str().as_bytes()),
        }
    }

    fn len(self) -> usize {
        self.with_text(<[u8]>::len)
    }

    fn put(self, w: &mut SpanWriter) -> bool {
        self.with_text(|t| w.put(t))
    }
}

/// The closed set of value encodings, picked by the value's variant.
enum Strategy<'a> {
    Scalar {
        kind: Option<&'static [u8]>,
        value: Scalar,
    },
    Text(&'a str),
    Blank,
}

impl<'a> Strategy<'a> {
    fn of(value: &'a DataCell) -> Self {
        match value {
            DataCell::Integer(n) => Strategy::Scalar {
                kind: None,
                value: Scalar::Integer(*n),
            },
            DataCell::Number(n) if n.is_finite() => Strategy::Scalar {
                kind: None,
                value: Scalar::Float(*n),
            },
            DataCell::Number(_) => Strategy::Scalar {
                kind: Some(b"e"),
                value: Scalar::Error(CellError::Number),
            },
            DataCell::DateTime(dt) => Strategy::Scalar {
                kind: None,
                value: Scalar::Float(datetime_to_excel_serial(dt)),
            },
            DataCell::Boolean(b) => Strategy::Scalar {
                kind: Some(b"b"),
                value: Scalar::Boolean(*b),
            },
            DataCell::Error(e) => Strategy::Scalar {
                kind: Some(b"e"),
                value: Scalar::Error(*e),
            },
            DataCell::Text(s) => Strategy::Text(s),
            DataCell::Blank => Strategy::Blank,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Segment<'a> {
    Escaped(&'a str),
    Literal(&'static [u8]),
    Scalar(Scalar),
}

impl Segment<'_> {
    fn estimated_len(self) -> usize {
        match self {
            Segment::Escaped(s) => text::estimated_len(s),
            // Covered by MAX_FIXED_CELL_LEN.
            Segment::Literal(_) | Segment::Scalar(_) => 0,
        }
    }

    fn len(self) -> usize {
        match self {
            Segment::Escaped(s) => text::escaped_len(s),
            Segment::Literal(l) => l.len(),
            Segment::Scalar(v) => v.len(),
        }
    }

    fn put(self, w: &mut SpanWriter) -> bool {
        match self {
            Segment::Escaped(s) => text::write_escaped(s, w),
            Segment::Literal(l) => w.put(l),
            Segment::Scalar(v) => v.put(w),
        }
    }
}

/// Outcome of an atomic cell write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    Written,
    /// Did not fit the remaining space but fits an empty buffer.
    Retry,
    /// Larger than the whole buffer; must be written piece by piece.
    Oversized,
}

#[derive(Debug, Clone, Copy)]
pub struct CellLayout<'a> {
    start: StartTag,
    body: [Option<Segment<'a>>; 3],
    end: &'static [u8],
}

impl<'a> CellLayout<'a> {
    /// Plain or styled value cell.
    pub fn value(value: &'a DataCell, style: Option<StyleId>, ctx: &EncodeContext) -> Self {
        let style = style.or(date_style(Some(value), ctx));
        match Strategy::of(value) {
            Strategy::Scalar { kind, value } => Self {
                start: StartTag { reference: ctx.reference, style, kind, open: b"><v>" },
                body: [Some(Segment::Scalar(value)), None, None],
                end: b"</v></c>",
            },
            Strategy::Text(s) => Self {
                start: StartTag {
                    reference: ctx.reference,
                    style,
                    kind: Some(b"inlineStr"),
                    open: b"><is><t>",
                },
                body: [Some(Segment::Escaped(s)), None, None],
                end: b"</t></is></c>",
            },
            Strategy::Blank => Self {
                start: StartTag { reference: ctx.reference, style, kind: None, open: b"/>" },
                body: [None, None, None],
                end: b"",
            },
        }
    }

    /// Formula cell, followed by its cached value when there is one.
    pub fn formula(formula: &'a Formula, style: Option<StyleId>, ctx: &EncodeContext) -> Self {
        let cached = formula.cached.as_ref();
        let style = style.or(date_style(cached, ctx));
        let text = Segment::Escaped(&formula.text);
        let (kind, cached) = match cached.map(Strategy::of) {
            Some(Strategy::Scalar { kind, value }) => (kind, Some(Segment::Scalar(value))),
            Some(Strategy::Text(s)) => (Some(&b"str"[..]), Some(Segment::Escaped(s))),
            Some(Strategy::Blank) | None => (None, None),
        };
        let start = StartTag { reference: ctx.reference, style, kind, open: b"><f>" };

        match cached {
            Some(value) => Self {
                start,
                body: [Some(text), Some(Segment::Literal(b"</f><v>")), Some(value)],
                end: b"</v></c>",
            },
            None => Self {
                start,
                body: [Some(text), None, None],
                end: b"</f></c>",
            },
        }
    }

    /// Upper bound computed without scanning any text.
    pub fn estimated_len(&self) -> usize {
        MAX_FIXED_CELL_LEN + self.segments().map(Segment::estimated_len).sum::<usize>()
    }

    /// Exact number of bytes the cell encodes to.
    pub fn encoded_len(&self) -> usize {
        self.start.len() + self.segments().map(Segment::len).sum::<usize>() + self.end.len()
    }

    /// Writes the whole cell or nothing.
    ///
    /// Text is measured exactly only when the estimate does not fit; the
    /// write itself is a single pass either way.
    pub fn try_write(&self, buf: &mut SpreadsheetBuffer) -> Fit {
        let remaining = buf.remaining();
        if self.estimated_len() > remaining {
            let exact = self.encoded_len();
            if exact > remaining {
                return if exact > buf.capacity() {
                    Fit::Oversized
                } else {
                    Fit::Retry
                };
            }
        }

        if buf.try_put(|w| self.put(w)) {
            Fit::Written
        } else {
            Fit::Retry
        }
    }

    fn put(&self, w: &mut SpanWriter) -> bool {
        self.start.put(w) && self.segments().all(|segment| segment.put(w)) && w.put(self.end)
    }

    fn segments(&self) -> impl Iterator<Item = Segment<'a>> + '_ {
        self.body.iter().flatten().copied()
    }

    fn segment(&self, index: usize) -> Option<Segment<'a>> {
        self.body.get(index).copied().flatten()
    }
}

fn date_style(value: Option<&DataCell>, ctx: &EncodeContext) -> Option<StyleId> {
    match value {
        Some(DataCell::DateTime(_)) => ctx.date_style,
        _ => None,
    }
}
