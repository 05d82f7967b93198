//! Local-extremum detection on 1-D signals
//!
//! Follows `scipy.signal.find_peaks` for the `height` and `distance`
//! arguments:
//!
//! 1. A peak is strictly greater than its left neighbour and greater than
//!    the first differing sample to its right. Flat tops report the middle
//!    sample (rounded down). The first and last samples are never peaks.
//! 2. `height` keeps peaks with `x[p] >= height`.
//! 3. `distance` visits peaks from highest to lowest (ties favour the later
//!    index) and removes every remaining peak closer than `distance`.

/// Optional filters for [`find_peaks`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PeakOptions {
    /// Minimum horizontal spacing between kept peaks, in samples
    pub distance: Option<usize>,
    /// Minimum peak value
    pub height: Option<f64>,
}

impl PeakOptions {
    /// Require at least `distance` samples between peaks.
    #[must_use]
    pub const fn with_distance(mut self, distance: usize) -> Self {
        self.distance = Some(distance);
        self
    }

    /// Require peaks to reach `height`.
    #[must_use]
    pub const fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }
}

/// Indices of the local maxima of `x`, in ascending order.
#[must_use]
pub fn find_peaks(x: &[f64], options: &PeakOptions) -> Vec<usize> {
    let mut peaks = local_maxima(x);
    if let Some(height) = options.height {
        peaks.retain(|&p| x[p] >= height);
    }
    if let Some(distance) = options.distance.filter(|&d| d > 1) {
        peaks = select_by_distance(x, &peaks, distance);
    }
    peaks
}

/// Indices of the local minima of `x`: the peaks of `-x`.
///
/// `options.height` applies to the negated signal.
#[must_use]
pub fn find_troughs(x: &[f64], options: &PeakOptions) -> Vec<usize> {
    let negated: Vec<f64> = x.iter().map(|v| -v).collect();
    find_peaks(&negated, options)
}

fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if x.len() < 3 {
        return peaks;
    }
    let i_max = x.len() - 1;
    let mut i = 1;
    while i < i_max {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < i_max && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    let n = peaks.len();
    let mut keep = vec![true; n];

    // Stable ascending sort by height; iterate from the back so the highest
    // (and, among equals, the rightmost) peak is handled first.
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| x[peaks[a]].total_cmp(&x[peaks[b]]));

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = j + 1;
        while k < n && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, kept)| kept.then_some(p))
        .collect()
}
