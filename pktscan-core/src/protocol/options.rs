//! Type-length-value option walk shared by IPv4 and TCP.

use super::SubHeaderSink;
use crate::flags::HeaderFlags;

/// End of option list.
pub const END_OF_LIST: u8 = 0;

/// Single-byte padding option.
pub const NO_OPERATION: u8 = 1;

/// Record each option in `options` as a sub-header. `base` is the offset of
/// the option area within the parent header.
///
/// An option whose length byte is missing, below two, or runs past the
/// option area is recorded clipped with `HEADER_TRUNCATED` and ends the walk.
pub(crate) fn dissect_options(options: &[u8], base: usize, sink: &mut SubHeaderSink<'_>) {
    let mut pos = 0;
    while let Some(&code) = options.get(pos) {
        match code {
            END_OF_LIST => {
                sink.push(code, base + pos, 1, HeaderFlags::empty());
                return;
            }
            NO_OPERATION => {
                if !sink.push(code, base + pos, 1, HeaderFlags::empty()) {
                    return;
                }
                pos += 1;
            }
            _ => {
                let left = options.len() - pos;
                let length = match options.get(pos + 1) {
                    Some(&len) if len >= 2 && usize::from(len) <= left => usize::from(len),
                    _ => {
                        sink.push(code, base + pos, left, HeaderFlags::HEADER_TRUNCATED);
                        return;
                    }
                };
                if !sink.push(code, base + pos, length, HeaderFlags::empty()) {
                    return;
                }
                pos += length;
            }
        }
    }
}
