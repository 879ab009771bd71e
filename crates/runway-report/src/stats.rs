//! Order statistics with linear interpolation.
//!
//! `percentile(values, p)` places the `p`-th percentile at fractional rank
//! `p / 100 * (n - 1)` of the sorted values and interpolates between the two
//! neighbouring order statistics. The median is the 50th percentile.

/// Returns the `p`-th percentile (`0.0..=100.0`) of `values`, or `None` when
/// `values` is empty.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let p = p.clamp(0.0, 100.0);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Returns the median of `values`, or `None` when empty.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}
