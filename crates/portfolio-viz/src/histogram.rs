//! Equal-width histogram binning

use serde::Serialize;

/// Bin count for the Sharpe-ratio distribution
pub const SHARPE_BINS: usize = 50;

/// One histogram bin covering `[lower, upper)`; the last bin is closed
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Bin `values` into `bins` equal-width buckets over their range
///
/// Non-finite values are ignored. When every value is the same the range is
/// widened to one unit centred on it. Returns no bins when there is nothing
/// to count.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() || bins == 0 {
        return Vec::new();
    }

    let mut min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let mut max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        min -= 0.5;
        max += 0.5;
    }
    let width = (max - min) / bins as f64;

    let mut counts = vec![0usize; bins];
    for v in finite {
        let idx = ((v - min) / width).floor() as usize;
        counts[idx.min(bins - 1)] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| Bin {
            lower: min + width * i as f64,
            upper: if i + 1 == bins {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_every_value() {
        let values: Vec<f64> = (0..1000).map(|i| f64::from(i) / 10.0).collect();
        let bins = histogram(&values, SHARPE_BINS);

        assert_eq!(bins.len(), 50);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 1000);
        assert_eq!(bins[0].lower, 0.0);
        assert_eq!(bins[49].upper, 99.9);
    }

    #[test]
    fn test_maximum_lands_in_last_bin() {
        let bins = histogram(&[0.0, 1.0, 2.0, 4.0], 4);
        assert_eq!(
            bins.iter().map(|b| b.count).collect::<Vec<_>>(),
            vec![1, 1, 1, 1]
        );
    }

    #[test]
    fn test_ignores_non_finite() {
        let bins = histogram(&[1.0, f64::NAN, 2.0, f64::INFINITY], 2);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn test_constant_values() {
        let bins = histogram(&[3.0, 3.0, 3.0], 5);
        assert_eq!(bins.len(), 5);
        assert_eq!(bins[2].count, 3);
        assert!((bins[0].lower - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty() {
        assert!(histogram(&[], 10).is_empty());
        assert!(histogram(&[f64::NAN], 10).is_empty());
        assert!(histogram(&[1.0], 0).is_empty());
    }
}
