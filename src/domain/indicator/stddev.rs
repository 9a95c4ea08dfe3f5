//! Exponentially weighted standard deviation.
//!
//! Weighted variance with the same adjusted weights as [`super::ema`],
//! bias-corrected by `sum_w^2 / (sum_w^2 - sum(w^2))`. Undefined until
//! `min_periods` defined observations, and wherever the correction
//! denominator is not positive (a single observation).

use super::Decay;

pub fn ewm_std(values: &[f64], decay: Decay, min_periods: usize) -> Vec<f64> {
    ewm_var(values, decay, min_periods)
        .into_iter()
        .map(f64::sqrt)
        .collect()
}

pub fn ewm_var(values: &[f64], decay: Decay, min_periods: usize) -> Vec<f64> {
    let min_periods = min_periods.max(1);
    let old_wt_factor = 1.0 - decay.alpha();
    let new_wt = 1.0;

    let mut out = Vec::with_capacity(values.len());
    let mut mean = f64::NAN;
    let mut cov = 0.0;
    let mut old_wt = 1.0;
    let mut sum_wt = 1.0;
    let mut sum_wt2 = 1.0;
    let mut nobs = 0usize;

    for (i, &cur) in values.iter().enumerate() {
        let is_observation = !cur.is_nan();
        if is_observation {
            nobs += 1;
        }

        if i == 0 {
            mean = cur;
        } else if !mean.is_nan() {
            sum_wt *= old_wt_factor;
            sum_wt2 *= old_wt_factor * old_wt_factor;
            old_wt *= old_wt_factor;
            if is_observation {
                let old_mean = mean;
                if mean != cur {
                    mean = (old_wt * old_mean + new_wt * cur) / (old_wt + new_wt);
                }
                let drift = old_mean - mean;
                let dev = cur - mean;
                cov = (old_wt * (cov + drift * drift) + new_wt * dev * dev) / (old_wt + new_wt);
                sum_wt += new_wt;
                sum_wt2 += new_wt * new_wt;
                old_wt += new_wt;
            }
        } else if is_observation {
            mean = cur;
        }

        let value = if nobs >= min_periods {
            let numerator = sum_wt * sum_wt;
            let denominator = numerator - sum_wt2;
            if denominator > 0.0 {
                numerator / denominator * cov
            } else {
                f64::NAN
            }
        } else {
            f64::NAN
        };
        out.push(value);
    }

    out
}
