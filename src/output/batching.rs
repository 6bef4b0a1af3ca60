//! Batch planning along the iteration dimension

use crate::error::{Error, Result};
use std::ops::Range;

/// Boundaries splitting `[0, size)` into runs of `batch_size`
///
/// The last run may be shorter. `size == 0` yields `[0]`, i.e. no batches.
///
/// ```
/// use grid2parquet::output::batch_bounds;
///
/// assert_eq!(batch_bounds(13, 6).unwrap(), vec![0, 6, 12, 13]);
/// ```
pub fn batch_bounds(size: usize, batch_size: usize) -> Result<Vec<usize>> {
    if batch_size == 0 {
        return Err(Error::invalid_value("batch_size", "must be greater than 0"));
    }

    let mut bounds: Vec<usize> = (0..size).step_by(batch_size).collect();
    bounds.push(size);
    Ok(bounds)
}

/// Consecutive boundary pairs as half-open ranges
pub fn batch_ranges(bounds: &[usize]) -> impl Iterator<Item = Range<usize>> + '_ {
    bounds.windows(2).map(|w| w[0]..w[1])
}
