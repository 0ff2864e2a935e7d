/// Widest text either formatter produces (`ryu` tops out at 24 bytes).
pub const MAX_NUMBER_LEN: usize = 24;

/// Largest magnitude below which every integral `f64` is exact.
const MAX_SAFE_INTEGER: f64 = 9007199254740992.0;

/// Formats a finite float without allocating and hands the text to `f`.
///
/// Integral values print like integers (`42`, not `42.0`); everything else
/// uses the shortest round-trip representation.
#[inline(always)]
pub(crate) fn with_float_text<R>(n: f64, f: impl FnOnce(&[u8]) -> R) -> R {
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        f(itoa::Buffer::new().format(n as i64).as_bytes())
    } else {
        f(ryu::Buffer::new().format_finite(n).as_bytes())
    }
}
