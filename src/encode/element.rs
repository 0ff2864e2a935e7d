use super::span::{int_len, SpanWriter};
use crate::types::StyleId;

/// Zero-based column, one-based row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: u32,
    pub column: usize,
}

/// Writes column letters ("A", "AB", "XFD") and returns the length written.
#[inline(always)]
pub fn write_col_letter(col: usize, buf: &mut [u8; 16]) -> usize {
    if col < 26 {
        buf[0] = b'A' + col as u8;
        return 1;
    }

    let mut col = col;
    let mut stack = [0u8; 16];
    let mut stack_len = 0;

    while col >= 26 {
        stack[stack_len] = b'A' + (col % 26) as u8;
        stack_len += 1;
        col = col / 26 - 1;
    }
    stack[stack_len] = b'A' + col as u8;
    stack_len += 1;

    for i in 0..stack_len {
        buf[i] = stack[stack_len - 1 - i];
    }

    stack_len
}

impl CellRef {
    fn put(&self, w: &mut SpanWriter) -> bool {
        let mut letters = [0u8; 16];
        let len = write_col_letter(self.column, &mut letters);
        w.put(&letters[..len]) && w.put_int(self.row)
    }

    fn len(&self) -> usize {
        let mut letters = [0u8; 16];
        write_col_letter(self.column, &mut letters) + int_len(self.row)
    }
}

/// The `<c ...` start tag shared by every cell kind.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StartTag {
    pub reference: Option<CellRef>,
    pub style: Option<StyleId>,
    /// Value of the `t` attribute, if any.
    pub kind: Option<&'static [u8]>,
    /// What closes the tag: `><v>`, `><is><t>`, `><f>` or `/>`.
    pub open: &'static [u8],
}

impl StartTag {
    pub(crate) fn put(&self, w: &mut SpanWriter) -> bool {
        if !w.put(b"<c") {
            return false;
        }
        if let Some(reference) = &self.reference {
            if !(w.put(b" r=\"") && reference.put(w) && w.put(b"\"")) {
                return false;
            }
        }
        if let Some(StyleId(sid)) = self.style {
            if !(w.put(b" s=\"") && w.put_int(sid) && w.put(b"\"")) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if !(w.put(b" t=\"") && w.put(kind) && w.put(b"\"")) {
                return false;
            }
        }
        w.put(self.open)
    }

    pub(crate) fn len(&self) -> usize {
        let mut len = 2 + self.open.len();
        if let Some(reference) = &self.reference {
            len += 5 + reference.len();
        }
        if let Some(StyleId(sid)) = self.style {
            len += 5 + int_len(sid);
        }
        if let Some(kind) = self.kind {
            len += 5 + kind.len();
        }
        len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(col: usize) -> String {
        let mut buf = [0u8; 16];
        let len = write_col_letter(col, &mut buf);
        String::from_utf8(buf[..len].to_vec()).unwrap()
    }

    #[test]
    fn test_col_letters() {
        assert_eq!(letters(0), "A");
        assert_eq!(letters(25), "Z");
        assert_eq!(letters(26), "AA");
        assert_eq!(letters(701), "ZZ");
        assert_eq!(letters(702), "AAA");
        assert_eq!(letters(16_383), "XFD");
    }

    #[test]
    fn test_start_tag_len_matches_output() {
        let tag = StartTag {
            reference: Some(CellRef { row: 1_048_576, column: 16_383 }),
            style: Some(StyleId(u32::MAX)),
            kind: Some(b"inlineStr"),
            open: b"><is><t>",
        };
        let mut dst = [0u8; 128];
        let mut w = SpanWriter::new(&mut dst);
        assert!(tag.put(&mut w));
        let n = w.written();
        assert_eq!(n, tag.len());
        assert_eq!(
            &dst[..n],
            b"<c r=\"XFD1048576\" s=\"4294967295\" t=\"inlineStr\"><is><t>"
        );
    }

    #[test]
    fn test_bare_blank_tag() {
        let tag = StartTag { reference: None, style: None, kind: None, open: b"/>" };
        let mut dst = [0u8; 8];
        let mut w = SpanWriter::new(&mut dst);
        assert!(tag.put(&mut w));
        let n = w.written();
        assert_eq!(&dst[..n], b"<c/>");
    }
}
