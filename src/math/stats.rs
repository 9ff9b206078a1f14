//! Plain numeric kernels over `f64` slices.
//!
//! Callers filter nulls first; every function here assumes finite inputs and
//! returns `None` where the statistic is undefined.

use std::num::NonZeroUsize;

pub fn mean(xs: &[f64]) -> Option<f64> {
    if xs.is_empty() {
        return None;
    }
    Some(xs.iter().sum::<f64>() / xs.len() as f64)
}

/// Sample standard deviation (n − 1 denominator).
pub fn sample_std(xs: &[f64]) -> Option<f64> {
    if xs.len() < 2 {
        return None;
    }
    let m = mean(xs)?;
    let ss: f64 = xs.iter().map(|x| (x - m) * (x - m)).sum();
    Some((ss / (xs.len() as f64 - 1.0)).sqrt())
}

pub fn min(xs: &[f64]) -> Option<f64> {
    xs.iter().copied().reduce(f64::min)
}

pub fn max(xs: &[f64]) -> Option<f64> {
    xs.iter().copied().reduce(f64::max)
}

/// Pearson product-moment correlation of paired samples.
///
/// `None` for fewer than two pairs or a zero-variance side. The result is
/// clamped to `[-1, 1]` against rounding.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for &(x, y) in pairs {
        let dx = x - mx;
        let dy = y - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    if r.is_finite() { Some(r.clamp(-1.0, 1.0)) } else { None }
}

/// Trailing simple moving average with a minimum of one period.
///
/// Position `i` averages `xs[i+1-w ..= i]`, or the whole prefix while fewer
/// than `w` values are available. Each window is summed directly, so `w = 1`
/// returns the input bit for bit.
pub fn rolling_mean(xs: &[f64], window: NonZeroUsize) -> Vec<f64> {
    let w = window.get();
    (0..xs.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(w);
            let slice = &xs[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn sample_std_matches_hand_computation() {
        // mean 5, squared deviations sum 32, / (8-1)
        let xs = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let sd = sample_std(&xs).unwrap();
        assert!((sd - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(sample_std(&[1.0]), None);
    }

    #[test]
    fn pearson_perfect_and_inverse() {
        let up: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, 2.0 * i as f64 + 1.0)).collect();
        assert!((pearson(&up).unwrap() - 1.0).abs() < 1e-12);
        let down: Vec<(f64, f64)> = (0..5).map(|i| (i as f64, -(i as f64))).collect();
        assert!((pearson(&down).unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_undefined_cases() {
        assert_eq!(pearson(&[(1.0, 2.0)]), None);
        assert_eq!(pearson(&[(1.0, 2.0), (1.0, 3.0)]), None);
    }

    #[test]
    fn rolling_mean_uses_short_prefix() {
        let out = rolling_mean(&[1.0, 2.0, 3.0, 4.0], w(3));
        assert_eq!(out, vec![1.0, 1.5, 2.0, 3.0]);
    }

    #[test]
    fn rolling_mean_window_one_is_identity() {
        let xs = [0.1, 0.2 + 0.1, -7.25, 1e-300, 3.0];
        assert_eq!(rolling_mean(&xs, w(1)), xs.to_vec());
    }

    #[test]
    fn rolling_mean_window_larger_than_series() {
        let out = rolling_mean(&[2.0, 4.0], w(10));
        assert_eq!(out, vec![2.0, 3.0]);
    }
}
