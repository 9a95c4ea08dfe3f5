//! Exponentially weighted moving average.
//!
//! With `alpha` from [`Decay`] and adjusted weights:
//! EWM[t] = sum(w_i * x[t-i]) / sum(w_i), w_i = (1 - alpha)^i.
//! Computed recursively; output is undefined until `min_periods` defined
//! observations have been seen.

use super::Decay;

pub fn ewm_mean(values: &[f64], decay: Decay, min_periods: usize) -> Vec<f64> {
    let min_periods = min_periods.max(1);
    let old_wt_factor = 1.0 - decay.alpha();
    let new_wt = 1.0;

    let mut out = Vec::with_capacity(values.len());
    let mut weighted = f64::NAN;
    let mut old_wt = 1.0;
    let mut nobs = 0usize;

    for (i, &cur) in values.iter().enumerate() {
        let is_observation = !cur.is_nan();
        if is_observation {
            nobs += 1;
        }

        if i == 0 {
            weighted = cur;
        } else if !weighted.is_nan() {
            old_wt *= old_wt_factor;
            if is_observation {
                if weighted != cur {
                    weighted = (old_wt * weighted + new_wt * cur) / (old_wt + new_wt);
                }
                old_wt += new_wt;
            }
        } else if is_observation {
            weighted = cur;
        }

        out.push(if nobs >= min_periods { weighted } else { f64::NAN });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ewm_mean_warmup() {
        let v = [10.0, 20.0, 30.0, 40.0, 50.0];
        let out = ewm_mean(&v, Decay::Span(3.0), 3);

        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert!(!out[2].is_nan());
        assert!(!out[4].is_nan());
    }

    #[test]
    fn ewm_mean_span_1_tracks_input() {
        let v = [10.0, 20.0, 30.0];
        let out = ewm_mean(&v, Decay::Span(1.0), 1);
        for (o, x) in out.iter().zip(v) {
            assert!((o - x).abs() < 1e-12);
        }
    }

    #[test]
    fn ewm_mean_adjusted_weights() {
        // alpha = 0.5: weights 1, 0.5, 0.25 from newest to oldest
        let v = [10.0, 20.0, 30.0];
        let out = ewm_mean(&v, Decay::Span(3.0), 1);

        assert!((out[0] - 10.0).abs() < 1e-12);
        let second = (20.0 + 0.5 * 10.0) / 1.5;
        assert!((out[1] - second).abs() < 1e-12);
        let third = (30.0 + 0.5 * 20.0 + 0.25 * 10.0) / 1.75;
        assert!((out[2] - third).abs() < 1e-12);
    }

    #[test]
    fn ewm_mean_constant_series() {
        let v = [100.0; 6];
        let out = ewm_mean(&v, Decay::Span(4.0), 2);
        assert!(out[0].is_nan());
        for o in &out[1..] {
            assert!((o - 100.0).abs() < 1e-12);
        }
    }

    #[test]
    fn ewm_mean_leading_nan_not_counted() {
        let v = [f64::NAN, 10.0, 20.0];
        let out = ewm_mean(&v, Decay::Span(3.0), 2);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        let expected = (20.0 + 0.5 * 10.0) / 1.5;
        assert!((out[2] - expected).abs() < 1e-12);
    }

    #[test]
    fn ewm_mean_empty() {
        assert!(ewm_mean(&[], Decay::Span(3.0), 1).is_empty());
    }
}
