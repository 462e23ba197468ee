//! Lossless 128-bit / 64-bit half conversions.
//!
//! The backing store's widest native integer is a signed 64-bit `BIGINT`, so
//! 128-bit issuance counters are persisted as two halves. The halves are raw
//! bit patterns, not signed magnitudes: a counter whose low word has the top
//! bit set round-trips through a negative-looking `BIGINT` unchanged.

/// Split a `u128` into `(lo, hi)` signed 64-bit halves.
///
/// The halves carry the exact bit pattern of the low and high words; no
/// arithmetic reinterpretation happens.
///
/// # Examples
///
/// ```
/// use hayashi_common::math::split_u128;
///
/// assert_eq!(split_u128(90), (90, 0));
/// assert_eq!(split_u128(u64::MAX as u128), (-1, 0));
/// assert_eq!(split_u128(u128::MAX), (-1, -1));
/// ```
#[inline]
pub fn split_u128(value: u128) -> (i64, i64) {
    let lo = value as u64 as i64;
    let hi = (value >> 64) as u64 as i64;
    (lo, hi)
}

/// Reassemble a `u128` from the `(lo, hi)` halves produced by [`split_u128`].
///
/// # Examples
///
/// ```
/// use hayashi_common::math::{join_u128, split_u128};
///
/// let v = 0x0123_4567_89ab_cdef_fedc_ba98_7654_3210u128;
/// let (lo, hi) = split_u128(v);
/// assert_eq!(join_u128(lo, hi), v);
/// ```
#[inline]
pub fn join_u128(lo: i64, hi: i64) -> u128 {
    (lo as u64 as u128) | ((hi as u64 as u128) << 64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn split_small_value() {
        assert_eq!(split_u128(90), (90, 0));
        assert_eq!(split_u128(0), (0, 0));
    }

    #[test]
    fn split_boundary_values() {
        // Low word with its top bit set becomes a negative BIGINT.
        assert_eq!(split_u128(u64::MAX as u128), (-1, 0));
        assert_eq!(split_u128(1u128 << 63), (i64::MIN, 0));
        assert_eq!(split_u128(1u128 << 64), (0, 1));
        assert_eq!(split_u128(u128::MAX), (-1, -1));
    }

    #[test]
    fn join_inverts_split() {
        for v in [
            0u128,
            1,
            90,
            u64::MAX as u128,
            (u64::MAX as u128) + 1,
            1u128 << 63,
            1u128 << 127,
            u128::MAX,
        ] {
            let (lo, hi) = split_u128(v);
            assert_eq!(join_u128(lo, hi), v);
        }
    }

    proptest! {
        #[test]
        fn round_trips_any_value(v in any::<u128>()) {
            let (lo, hi) = split_u128(v);
            prop_assert_eq!(join_u128(lo, hi), v);
        }
    }
}
