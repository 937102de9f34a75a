//! Byte/megabyte conversions and size reduction figures

/// Number of bytes in one megabyte (binary, 1024 * 1024)
pub const BYTES_PER_MB: usize = 1024 * 1024;

/// Converts a byte count to megabytes
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn bytes_to_mb(bytes: usize) -> f64 {
    bytes as f64 / BYTES_PER_MB as f64
}

/// Converts megabytes to a whole byte count, rounding to the nearest byte
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn mb_to_bytes(mb: f64) -> usize {
    (mb * BYTES_PER_MB as f64).round().max(0.0) as usize
}

/// Percentage by which `final_size` is smaller than `original_size`
///
/// Returns `NaN` when `original_size` is zero. Callers treat that as
/// "no meaningful reduction", not as an error.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn file_size_reduction_percent(original_size: usize, final_size: usize) -> f64 {
    if original_size == 0 {
        return f64::NAN;
    }

    100.0 - (final_size as f64 * 100.0 / original_size as f64)
}
