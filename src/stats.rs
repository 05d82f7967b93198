//! Descriptive and inferential statistics
//!
//! Population moments (ddof = 0), Pearson correlation, one-way ANOVA and a
//! chi-square goodness-of-fit test, plus the special functions their
//! p-values need.
//!
//! References:
//! - Press et al., Numerical Recipes (3rd ed.) §6.1-6.4: `ln_gamma`,
//!   incomplete gamma and beta functions

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-14;
const FPMIN: f64 = 1e-300;
const MAX_ITER: usize = 300;

/// Arithmetic mean; 0 for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance; 0 for an empty slice.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
#[must_use]
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Minimum and maximum, or `None` when empty.
#[must_use]
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied();
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

/// `max - min`; 0 when empty.
#[must_use]
pub fn range(values: &[f64]) -> f64 {
    min_max(values).map_or(0.0, |(lo, hi)| hi - lo)
}

/// `std / mean`, or `None` when the mean is zero.
#[must_use]
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    let m = mean(values);
    if m == 0.0 {
        None
    } else {
        Some(std_dev(values) / m)
    }
}

/// First differences.
#[must_use]
pub fn diff<T>(values: &[T]) -> Vec<T>
where
    T: Copy + std::ops::Sub<Output = T>,
{
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Most frequent value; ties go to the smallest.
#[must_use]
pub fn mode(values: &[usize]) -> Option<usize> {
    let mut counts = std::collections::BTreeMap::new();
    for &v in values {
        *counts.entry(v).or_insert(0usize) += 1;
    }
    let mut best: Option<(usize, usize)> = None;
    for (value, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value)
}

/// Normalized autocorrelation for lags `0..lags` (un-centered, as
/// `np.correlate(x, x, 'full')` divided by lag 0).
///
/// Returns an empty vector when the signal has zero energy.
#[must_use]
pub fn autocorrelation(values: &[f64], lags: usize) -> Vec<f64> {
    let n = values.len();
    let energy: f64 = values.iter().map(|v| v * v).sum();
    if n == 0 || energy == 0.0 {
        return Vec::new();
    }
    (0..lags.min(n))
        .map(|lag| {
            let sum: f64 = values[..n - lag]
                .iter()
                .zip(&values[lag..])
                .map(|(a, b)| a * b)
                .sum();
            sum / energy
        })
        .collect()
}

/// Dominant frequency (cycles per sample) of the FFT spectrum, excluding
/// the DC term. Only bins `1..n/2` are searched, so the result is a
/// positive `fftfreq` value. Returns `None` for fewer than 4 samples.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn dominant_frequency(values: &[f64]) -> Option<f64> {
    let n = values.len();
    let upper = n / 2;
    if upper < 2 {
        return None;
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    let mut buffer: Vec<Complex<f64>> = values.iter().map(|&v| Complex::new(v, 0.0)).collect();
    fft.process(&mut buffer);

    let (best_k, _) = buffer[1..upper]
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(best_k, best), (i, c)| {
            let power = c.norm();
            if power > best {
                (i + 1, power)
            } else {
                (best_k, best)
            }
        });
    Some(best_k as f64 / n as f64)
}

/// Pearson correlation with a two-sided p-value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    /// Correlation coefficient
    pub r: f64,
    /// Two-sided p-value (Student-t, n-2 degrees of freedom)
    pub p_value: f64,
}

/// Pearson correlation of `x` and `y`.
///
/// Returns `None` for mismatched lengths, fewer than two points, or a
/// constant input.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn pearson(x: &[f64], y: &[f64]) -> Option<Correlation> {
    let n = x.len();
    if n != y.len() || n < 2 {
        return None;
    }
    let mx = mean(x);
    let my = mean(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    let r = (sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0);
    let df = (n - 2) as f64;
    let p_value = if df == 0.0 || (1.0 - r.abs()) < EPS {
        if df == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        let t2 = r * r * df / (1.0 - r * r);
        // Two-sided Student-t tail via the incomplete beta function
        regularized_incomplete_beta(df / 2.0, 0.5, df / (df + t2))
    };
    Some(Correlation { r, p_value })
}

/// One-way ANOVA result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnovaResult {
    /// F statistic
    pub f_statistic: f64,
    /// Upper-tail p-value of the F distribution
    pub p_value: f64,
    /// Between-group degrees of freedom
    pub df_between: usize,
    /// Within-group degrees of freedom
    pub df_within: usize,
}

/// One-way ANOVA across groups.
///
/// Returns `None` with fewer than two non-empty groups, no within-group
/// degrees of freedom, or zero within-group variance.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn one_way_anova(groups: &[Vec<f64>]) -> Option<AnovaResult> {
    let groups: Vec<&Vec<f64>> = groups.iter().filter(|g| !g.is_empty()).collect();
    let k = groups.len();
    let n: usize = groups.iter().map(|g| g.len()).sum();
    if k < 2 || n <= k {
        return None;
    }
    let all: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let grand = mean(&all);

    let ss_between: f64 = groups
        .iter()
        .map(|g| g.len() as f64 * (mean(g) - grand).powi(2))
        .sum();
    let ss_within: f64 = groups
        .iter()
        .map(|g| {
            let m = mean(g);
            g.iter().map(|v| (v - m).powi(2)).sum::<f64>()
        })
        .sum();
    if ss_within == 0.0 {
        return None;
    }

    let df_between = k - 1;
    let df_within = n - k;
    let f_statistic = (ss_between / df_between as f64) / (ss_within / df_within as f64);
    let p_value = f_survival(f_statistic, df_between as f64, df_within as f64);
    Some(AnovaResult {
        f_statistic,
        p_value,
        df_between,
        df_within,
    })
}

/// Chi-square goodness-of-fit result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChiSquare {
    /// Chi-square statistic
    pub statistic: f64,
    /// Upper-tail p-value
    pub p_value: f64,
    /// Degrees of freedom
    pub df: usize,
}

/// Chi-square test of `observed` counts against a uniform expectation.
///
/// Returns `None` with fewer than two categories or no observations.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn chi_square_uniform(observed: &[usize]) -> Option<ChiSquare> {
    let k = observed.len();
    let total: usize = observed.iter().sum();
    if k < 2 || total == 0 {
        return None;
    }
    let expected = total as f64 / k as f64;
    let statistic: f64 = observed
        .iter()
        .map(|&o| (o as f64 - expected).powi(2) / expected)
        .sum();
    let df = k - 1;
    Some(ChiSquare {
        statistic,
        p_value: regularized_gamma_q(df as f64 / 2.0, statistic / 2.0),
        df,
    })
}

/// Upper tail of the F distribution.
#[must_use]
pub fn f_survival(f: f64, d1: f64, d2: f64) -> f64 {
    if f <= 0.0 {
        return 1.0;
    }
    if !f.is_finite() {
        return 0.0;
    }
    regularized_incomplete_beta(d2 / 2.0, d1 / 2.0, d2 / (d2 + d1 * f))
}

/// Natural log of the gamma function (Lanczos approximation).
#[must_use]
#[allow(clippy::unreadable_literal, clippy::excessive_precision)]
pub fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 6] = [
        76.18009172947146,
        -86.50532032941677,
        24.01409824083091,
        -1.231739572450155,
        0.1208650973866179e-2,
        -0.5395239384953e-5,
    ];
    let mut y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut ser = 1.000000000190015;
    for c in COEFFS {
        y += 1.0;
        ser += c / y;
    }
    -tmp + (2.5066282746310005 * ser / x).ln()
}

/// Regularized incomplete beta function `I_x(a, b)`.
#[must_use]
pub fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(a, b, x) / a
    } else {
        1.0 - front * beta_continued_fraction(b, a, 1.0 - x) / b
    }
}

/// Lentz evaluation of the incomplete beta continued fraction.
#[allow(clippy::cast_precision_loss)]
fn beta_continued_fraction(a: f64, b: f64, x: f64) -> f64 {
    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FPMIN {
        d = FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;
    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// Regularized upper incomplete gamma function `Q(a, x) = 1 - P(a, x)`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn regularized_gamma_q(a: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    let gln = ln_gamma(a);
    if x < a + 1.0 {
        // Series for P(a, x)
        let mut ap = a;
        let mut sum = 1.0 / a;
        let mut del = sum;
        for _ in 0..MAX_ITER {
            ap += 1.0;
            del *= x / ap;
            sum += del;
            if del.abs() < sum.abs() * EPS {
                break;
            }
        }
        1.0 - sum * (-x + a * x.ln() - gln).exp()
    } else {
        // Continued fraction for Q(a, x)
        let mut b = x + 1.0 - a;
        let mut c = 1.0 / FPMIN;
        let mut d = 1.0 / b;
        let mut h = d;
        for i in 1..=MAX_ITER {
            let i = i as f64;
            let an = -i * (i - a);
            b += 2.0;
            d = an * d + b;
            if d.abs() < FPMIN {
                d = FPMIN;
            }
            c = b + an / c;
            if c.abs() < FPMIN {
                c = FPMIN;
            }
            d = 1.0 / d;
            let del = d * c;
            h *= del;
            if (del - 1.0).abs() < EPS {
                break;
            }
        }
        (-x + a * x.ln() - gln).exp() * h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moments() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert!((mean(&v) - 2.5).abs() < 1e-12);
        assert!((variance(&v) - 1.25).abs() < 1e-12);
        assert!((range(&v) - 3.0).abs() < 1e-12);
        assert_eq!(min_max(&[]), None);
        assert!(coefficient_of_variation(&[0.0, 0.0]).is_none());
    }

    #[test]
    fn test_ln_gamma_factorials() {
        // Gamma(5) = 24
        assert!((ln_gamma(5.0) - 24f64.ln()).abs() < 1e-9);
        assert!((ln_gamma(0.5) - std::f64::consts::PI.sqrt().ln()).abs() < 1e-9);
    }

    #[test]
    fn test_incomplete_beta_uniform_case() {
        for x in [0.1, 0.35, 0.8] {
            assert!((regularized_incomplete_beta(1.0, 1.0, x) - x).abs() < 1e-10);
        }
    }

    #[test]
    fn test_gamma_q_exponential_case() {
        for x in [0.5, 2.0, 7.0] {
            assert!((regularized_gamma_q(1.0, x) - (-x).exp()).abs() < 1e-10);
        }
    }

    #[test]
    fn test_pearson_perfect_and_constant() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 3.0, 5.0, 7.0, 9.0];
        let c = pearson(&x, &y).unwrap();
        assert!((c.r - 1.0).abs() < 1e-12);
        assert!(c.p_value < 1e-6);
        assert!(pearson(&x, &[2.0; 5]).is_none());
        assert!(pearson(&x, &y[..3]).is_none());
    }

    #[test]
    fn test_pearson_p_value_matches_reference() {
        // r = 51/55 with n = 10 -> t ≈ 7.005, p ≈ 1.12e-4 (two-sided)
        let x = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        let y = [2.0, 1.0, 4.0, 3.0, 7.0, 5.0, 6.0, 9.0, 8.0, 10.0];
        let c = pearson(&x, &y).unwrap();
        assert!((c.r - 51.0 / 55.0).abs() < 1e-12);
        assert!((c.p_value - 1.12e-4).abs() < 5e-6, "p = {}", c.p_value);
    }

    #[test]
    fn test_one_way_anova() {
        let groups = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        let result = one_way_anova(&groups).unwrap();
        assert!((result.f_statistic - 13.5).abs() < 1e-9);
        assert_eq!(result.df_between, 1);
        assert_eq!(result.df_within, 4);
        // F(1, 4) = 13.5 -> p ≈ 0.0213
        assert!((result.p_value - 0.0213).abs() < 1e-3);
        assert!(one_way_anova(&[vec![1.0, 1.0], vec![1.0, 1.0]]).is_none());
        assert!(one_way_anova(&[vec![1.0, 2.0]]).is_none());
    }

    #[test]
    fn test_chi_square_uniform() {
        let flat = chi_square_uniform(&[10, 10, 10, 10]).unwrap();
        assert!(flat.statistic.abs() < 1e-12);
        assert!((flat.p_value - 1.0).abs() < 1e-9);

        let skewed = chi_square_uniform(&[40, 0, 0, 0]).unwrap();
        assert!((skewed.statistic - 120.0).abs() < 1e-9);
        assert!(skewed.p_value < 1e-20);
        assert_eq!(skewed.df, 3);
    }

    #[test]
    fn test_autocorrelation_and_mode() {
        let ac = autocorrelation(&[1.0, 0.0, 1.0, 0.0], 3);
        assert_eq!(ac.len(), 3);
        assert!((ac[0] - 1.0).abs() < 1e-12);
        assert!(ac[1].abs() < 1e-12);
        assert!((ac[2] - 0.5).abs() < 1e-12);
        assert!(autocorrelation(&[0.0, 0.0], 2).is_empty());
        assert_eq!(mode(&[3, 2, 3, 2]), Some(2));
        assert_eq!(mode(&[]), None);
    }

    #[test]
    fn test_dominant_frequency_of_period_four() {
        let signal: Vec<f64> = (0..16)
            .map(|i| (2.0 * std::f64::consts::PI * f64::from(i) / 4.0).sin())
            .collect();
        let freq = dominant_frequency(&signal).unwrap();
        assert!((freq - 0.25).abs() < 1e-12);
        assert!(dominant_frequency(&[1.0, 2.0, 3.0]).is_none());
    }

    #[test]
    fn test_dominant_frequency_odd_length_ignores_dc() {
        // Period 5 over 35 samples plus a large offset
        let signal: Vec<f64> = (0..35)
            .map(|i| 10.0 + (2.0 * std::f64::consts::PI * f64::from(i) / 5.0).cos())
            .collect();
        let freq = dominant_frequency(&signal).unwrap();
        assert!((freq - 0.2).abs() < 1e-12);
    }
}
