//! Triangle strip unrolling.

/// Unroll a triangle strip into discrete triangles.
///
/// The winding alternates on every triangle. `reversed` is the strip's
/// starting winding bit: it is toggled before each triangle, and a set bit
/// emits `(i, i+1, i+2)` while a clear bit emits `(i+1, i, i+2)`.
pub fn strip_triangles<T: Copy>(indices: &[T], reversed: bool) -> impl Iterator<Item = [T; 3]> + '_ {
    let mut winding = reversed;
    indices.windows(3).map(move |w| {
        winding = !winding;
        if winding {
            [w[0], w[1], w[2]]
        } else {
            [w[1], w[0], w[2]]
        }
    })
}
