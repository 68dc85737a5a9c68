//! Output reduction.

/// Index of the largest value, scanning in ascending order.
///
/// Ties keep the first index seen. Returns `None` for an empty slice.
pub fn argmax(values: &[f32]) -> Option<usize> {
    let (&first, rest) = values.split_first()?;
    let mut best = 0;
    let mut best_val = first;
    for (i, &v) in rest.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best = i + 1;
        }
    }
    Some(best)
}
