use crate::error::SampleError;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

/// Sample a value from a union of disjoint half-open ranges `[lo, hi)`.
///
/// Without weights the ranges are treated as one contiguous interval, so each range receives
/// probability mass proportional to its length. For example a draw of 1.5 over
/// `[(0.0, 1.0), (2.0, 3.0)]` maps to 2.5. With weights, a range is chosen first with probability
/// proportional to its (normalized) weight and the value is then drawn uniformly inside it.
pub fn split_range_sample<R: Rng + ?Sized>(
    ranges: &[(f64, f64)],
    p: Option<&[f64]>,
    rng: &mut R,
) -> Result<f64, SampleError> {
    if ranges.is_empty() {
        return Err(SampleError::NoRanges);
    }

    if let Some(weights) = p {
        if weights.len() != ranges.len() {
            return Err(SampleError::WeightCount {
                expected: ranges.len(),
                actual: weights.len(),
            });
        }

        let index = WeightedIndex::new(weights)
            .map_err(|_| SampleError::InvalidWeights)?
            .sample(rng);
        let (lo, hi) = ranges[index];
        if hi <= lo {
            return Err(SampleError::EmptyRanges(hi - lo));
        }

        return Ok(rng.random_range(lo..hi));
    }

    let total: f64 = ranges.iter().map(|(lo, hi)| hi - lo).sum();
    if !(total > 0.0 && total.is_finite()) {
        return Err(SampleError::EmptyRanges(total));
    }

    let mut sample = rng.random::<f64>() * total;
    for &(lo, hi) in ranges {
        if sample < hi - lo {
            return Ok(lo + sample);
        }
        sample -= hi - lo;
    }

    Err(SampleError::OutsideRanges)
}

/// Sample an integer uniformly from a union of disjoint closed ranges `[lo, hi]`.
///
/// Ranges with `lo > hi` are empty and ignored.
pub fn split_range_sample_int<R: Rng + ?Sized>(
    ranges: &[(i64, i64)],
    rng: &mut R,
) -> Result<i64, SampleError> {
    let half_open: Vec<(f64, f64)> = ranges
        .iter()
        .filter(|(lo, hi)| lo <= hi)
        .map(|&(lo, hi)| (lo as f64, hi as f64 + 1.0))
        .collect();

    let sample = split_range_sample(&half_open, None, rng)?.floor() as i64;

    if in_ranges(ranges, sample) {
        return Ok(sample);
    }

    // Float rounding at a range's upper edge must not escape the range.
    let clamped = ranges
        .iter()
        .filter(|(lo, hi)| lo <= hi)
        .find(|(lo, hi)| sample >= *lo && sample <= hi.saturating_add(1))
        .map(|&(lo, hi)| sample.clamp(lo, hi));

    clamped.ok_or(SampleError::OutsideRanges)
}

/// Whether `value` lies inside any of the closed ranges.
pub fn in_ranges(ranges: &[(i64, i64)], value: i64) -> bool {
    ranges.iter().any(|&(lo, hi)| lo <= value && value <= hi)
}

/// Whether any of the closed ranges is non-empty.
pub fn any_nonempty(ranges: &[(i64, i64)]) -> bool {
    ranges.iter().any(|(lo, hi)| lo <= hi)
}
