//! NaN-aware helpers over period-aligned `f64` series.
//!
//! Every stage of the pipeline produces a `Vec<f64>` with one entry per
//! price timestamp. `f64::NAN` marks a period whose lookback window is not
//! yet satisfied; these helpers skip or propagate it rather than failing.

/// Denominator offset used wherever zero is a legitimate input (e.g. an
/// ideal position of exactly zero contracts).
pub const ZERO_SAFE_EPSILON: f64 = 1e-9;

/// `a / (b + epsilon)`. Never divides by an exact zero.
pub fn zero_safe_divide(a: f64, b: f64) -> f64 {
    a / (b + ZERO_SAFE_EPSILON)
}

/// First difference; element 0 is undefined.
pub fn diff(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i == 0 {
            out.push(f64::NAN);
        } else {
            out.push(values[i] - values[i - 1]);
        }
    }
    out
}

/// Simple percentage change (as a fraction); element 0 is undefined.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    for i in 0..values.len() {
        if i == 0 {
            out.push(f64::NAN);
        } else {
            out.push(values[i] / values[i - 1] - 1.0);
        }
    }
    out
}

/// Carry the last defined value forward over NaN gaps.
pub fn ffill(values: &[f64]) -> Vec<f64> {
    let mut last = f64::NAN;
    values
        .iter()
        .map(|&v| {
            if !v.is_nan() {
                last = v;
            }
            last
        })
        .collect()
}

/// Carry the next defined value backward over NaN gaps.
pub fn bfill(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    let mut next = f64::NAN;
    for v in out.iter_mut().rev() {
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }
    out
}

/// Replace every NaN with `fill`.
pub fn fill_nan(values: &[f64], fill: f64) -> Vec<f64> {
    values
        .iter()
        .map(|&v| if v.is_nan() { fill } else { v })
        .collect()
}

/// Clamp into `[lower, upper]`; NaN passes through untouched.
pub fn clip(values: &[f64], lower: f64, upper: f64) -> Vec<f64> {
    values
        .iter()
        .map(|&v| if v.is_nan() { v } else { v.clamp(lower, upper) })
        .collect()
}

/// Running sum treating NaN as zero.
pub fn cumsum(values: &[f64]) -> Vec<f64> {
    let mut total = 0.0;
    values
        .iter()
        .map(|&v| {
            if !v.is_nan() {
                total += v;
            }
            total
        })
        .collect()
}

/// Expanding median over the defined values seen so far.
///
/// Output at `i` is undefined until at least `min_periods` defined values
/// have been observed.
pub fn expanding_median(values: &[f64], min_periods: usize) -> Vec<f64> {
    let min_periods = min_periods.max(1);
    let mut sorted: Vec<f64> = Vec::with_capacity(values.len());
    let mut out = Vec::with_capacity(values.len());

    for &v in values {
        if !v.is_nan() {
            let at = sorted.partition_point(|&x| x < v);
            sorted.insert(at, v);
        }
        if sorted.len() >= min_periods {
            out.push(sorted_median(&sorted));
        } else {
            out.push(f64::NAN);
        }
    }
    out
}

fn sorted_median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Mean of the defined values; NaN when there are none.
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Percentile (0..=100) with linear interpolation between closest ranks,
/// ignoring NaN. NaN for an empty input.
pub fn percentile(values: &[f64], pct: f64) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Final element of a series, NaN when empty.
pub fn last(values: &[f64]) -> f64 {
    values.last().copied().unwrap_or(f64::NAN)
}
