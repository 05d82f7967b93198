//! Gaussian smoothing

/// One-dimensional Gaussian filter with `reflect` boundary handling
/// (`d c b a | a b c d | d c b a`), matching
/// `scipy.ndimage.gaussian_filter1d(x, sigma)` with the default truncation
/// of 4 standard deviations.
///
/// A non-positive or non-finite `sigma` returns the input unchanged.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
)]
pub fn gaussian_filter1d(x: &[f64], sigma: f64) -> Vec<f64> {
    if x.is_empty() || !sigma.is_finite() || sigma <= 0.0 {
        return x.to_vec();
    }
    let radius = (4.0 * sigma + 0.5) as usize;
    let kernel = gaussian_kernel(sigma, radius);
    let n = x.len() as isize;
    let radius = radius as isize;

    (0..n)
        .map(|i| {
            kernel
                .iter()
                .zip(-radius..=radius)
                .map(|(w, offset)| w * x[reflect_index(i + offset, n)])
                .sum()
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
fn gaussian_kernel(sigma: f64, radius: usize) -> Vec<f64> {
    let r = radius as f64;
    let weights: Vec<f64> = (0..=2 * radius)
        .map(|k| {
            let offset = k as f64 - r;
            (-0.5 * offset * offset / (sigma * sigma)).exp()
        })
        .collect();
    let total: f64 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

#[allow(clippy::cast_sign_loss)]
const fn reflect_index(i: isize, n: isize) -> usize {
    let period = 2 * n;
    let m = i.rem_euclid(period);
    if m < n {
        m as usize
    } else {
        (period - 1 - m) as usize
    }
}
