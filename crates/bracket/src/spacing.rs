//! Even distribution of repeated features along an axis.

use tracing::trace;

use crate::params::ParamError;

/// Start positions for `item_count` items of `item_width` along an axis of
/// `available_length`.
///
/// A single item sits at the midpoint. Several items are inset by one item
/// width from both ends with equal gaps between them; if rounding pushes the
/// last item past its inset, positions are pulled back in proportion to their
/// index so the first item stays put.
///
/// # Errors
///
/// [`ParamError::NoItems`] when `item_count` is zero.
///
/// # Example
///
/// ```
/// use bracket::spacing::distribute;
///
/// assert_eq!(distribute(100.0, 10.0, 3).unwrap(), vec![10.0, 45.0, 80.0]);
/// assert_eq!(distribute(100.0, 5.0, 1).unwrap(), vec![50.0]);
/// ```
pub fn distribute(
    available_length: f64,
    item_width: f64,
    item_count: u32,
) -> Result<Vec<f64>, ParamError> {
    match item_count {
        0 => Err(ParamError::NoItems),
        1 => Ok(vec![available_length / 2.0]),
        n => {
            let count = f64::from(n);
            let last_index = f64::from(n - 1);
            let usable = available_length - item_width * count - item_width * 2.0;
            let gap = usable / last_index;
            let mut positions: Vec<f64> = (0..n)
                .map(|i| item_width + f64::from(i) * (item_width + gap))
                .collect();

            let limit = available_length - item_width;
            let end = positions[positions.len() - 1] + item_width;
            if end > limit {
                let adjustment = end - limit;
                for (i, p) in positions.iter_mut().enumerate() {
                    *p -= adjustment * i as f64 / last_index;
                }
            }
            trace!(available_length, item_width, ?positions, "distributed");
            Ok(positions)
        }
    }
}
