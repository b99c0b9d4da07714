//! Border handling for neighbourhood operations.

/// Half-sample symmetric reflection of `idx` into `0..len`
/// (`d c b a | a b c d | d c b a`). Indices any distance outside the
/// image are folded repeatedly.
#[inline]
pub fn reflect_index(idx: isize, len: usize) -> usize {
    debug_assert!(len > 0);
    let n = len as isize;
    let m = idx.rem_euclid(2 * n);
    if m >= n {
        (2 * n - m - 1) as usize
    } else {
        m as usize
    }
}
