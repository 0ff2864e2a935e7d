use super::span::SpanWriter;

/// Worst-case output bytes per input byte (`_x001F_`).
pub const MAX_ESCAPED_LEN: usize = 7;

const fn build_control_escapes() -> [[u8; 7]; 32] {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut table = [[0u8; 7]; 32];
    let mut i = 0;
    while i < 32 {
        table[i] = [b'_', b'x', b'0', b'0', HEX[i >> 4], HEX[i & 0xF], b'_'];
        i += 1;
    }
    table
}

/// `_xHHHH_` escapes for C0 controls, which XML 1.0 cannot carry literally.
static CONTROL_ESCAPES: [[u8; 7]; 32] = build_control_escapes();

#[inline(always)]
fn escape(byte: u8) -> Option<&'static [u8]> {
    match byte {
        b'&' => Some(b"&amp;"),
        b'<' => Some(b"&lt;"),
        b'>' => Some(b"&gt;"),
        b'"' => Some(b"&quot;"),
        b'\'' => Some(b"&apos;"),
        b'\t' | b'\n' | b'\r' => None,
        0x00..=0x1F => Some(&CONTROL_ESCAPES[byte as usize]),
        _ => None,
    }
}

#[inline(always)]
fn needs_escape(input: &[u8]) -> bool {
    memchr::memchr3(b'&', b'<', b'>', input).is_some()
        || memchr::memchr2(b'"', b'\'', input).is_some()
        || input
            .iter()
            .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r'))
}

/// Cheap upper bound on the escaped length; no scan.
#[inline(always)]
pub(crate) fn estimated_len(s: &str) -> usize {
    s.len() * MAX_ESCAPED_LEN
}

/// Exact escaped length; scans the whole string.
pub(crate) fn escaped_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    if !needs_escape(bytes) {
        return bytes.len();
    }
    bytes
        .iter()
        .map(|&b| escape(b).map_or(1, <[u8]>::len))
        .sum()
}

/// Writes the escaped form of `s` in full and reports whether it fit.
///
/// Makes a single pass with no up-front measuring. On failure part of the
/// text may sit in the span, so callers commit only on success.
#[inline]
pub(crate) fn write_escaped(s: &str, w: &mut SpanWriter) -> bool {
    write_escaped_from(s, 0, w) == s.len()
}

/// Writes as much of `s[from..]` as fits and returns the new source offset.
///
/// Offsets always land on a char boundary and an escape sequence is never
/// split, so resuming from the returned offset neither repeats nor skips input.
/// Only the bytes that can still fit in `w` are scanned.
pub(crate) fn write_escaped_from(s: &str, from: usize, w: &mut SpanWriter) -> usize {
    let bytes = s.as_bytes();
    let mut pos = from;

    while pos < bytes.len() {
        if let Some(escaped) = escape(bytes[pos]) {
            if !w.put(escaped) {
                break;
            }
            pos += 1;
            continue;
        }

        let limit = bytes.len().min(pos + w.remaining());
        let next_escape = bytes[pos..limit]
            .iter()
            .position(|&b| escape(b).is_some())
            .map(|i| pos + i);
        let mut end = next_escape.unwrap_or(limit);
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        w.put(&bytes[pos..end]);
        pos = end;
        // Out of room before the next escape or the end of the text.
        if next_escape.is_none() && pos < bytes.len() {
            break;
        }
    }

    pos
}
