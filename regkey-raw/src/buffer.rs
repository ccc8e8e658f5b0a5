//! Grow-and-retry buffers for calls that report "more data"
//!
//! Registry calls fill a caller-supplied buffer and fail with
//! `ERROR_MORE_DATA` when it is too small. Some of them also report the size
//! they need, others do not. [`with_buffer`] hides that dance.

use crate::status::{RawError, Result};

/// Run `call` with a zeroed buffer, growing it until the call fits.
///
/// The first attempt uses `initial` elements. On [`RawError::MoreData`] the
/// buffer is re-allocated to the reported size, or doubled when no size (or no
/// larger size) was reported, and the call is re-issued. Sizes are capped at
/// `limit`; a call that still wants more fails with
/// [`RawError::BufferLimit`]. Any other result is returned as is.
///
/// # Example
///
/// ```ignore
/// use regkey_raw::{sys, with_buffer};
///
/// let data = with_buffer::<u8, _>("RegQueryValueExW", 1024, 1 << 24, |buf| {
///     let (len, _tag) = sys::query_value(key, "Path", buf)?;
///     Ok(buf[..len].to_vec())
/// })?;
/// ```
pub fn with_buffer<E, T>(
    op: &'static str,
    initial: usize,
    limit: usize,
    mut call: impl FnMut(&mut [E]) -> Result<T>,
) -> Result<T>
where
    E: Copy + Default,
{
    let limit = limit.max(1);
    let mut len = initial.clamp(1, limit);

    loop {
        let mut buf = vec![E::default(); len];
        match call(&mut buf) {
            Err(RawError::MoreData { required, .. }) => {
                if len >= limit {
                    return Err(RawError::BufferLimit { op, limit });
                }
                len = required
                    .filter(|&wanted| wanted > len)
                    .unwrap_or_else(|| len.saturating_mul(2))
                    .min(limit);
            }
            other => return other,
        }
    }
}
