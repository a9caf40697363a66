//! Exponentially-weighted moving average.

/// EWMA of `samples` in the order given.
///
/// The first output is the first sample; each later output is
/// `alpha * sample + (1 - alpha) * previous`. Returns `None` for no samples.
pub fn ewma(samples: &[f64], alpha: f64) -> Option<f64> {
    let (first, rest) = samples.split_first()?;
    Some(
        rest.iter()
            .fold(*first, |acc, sample| alpha * sample + (1.0 - alpha) * acc),
    )
}
