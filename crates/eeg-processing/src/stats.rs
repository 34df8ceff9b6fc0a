//! Robust and correlation statistics

/// Consistency constant turning a MAD into a Gaussian standard deviation
pub const MAD_TO_SIGMA: f64 = 1.4826;

/// Consistency constant turning a mean absolute deviation into a Gaussian
/// standard deviation (`sqrt(pi / 2)`)
pub const MEAN_AD_TO_SIGMA: f64 = 1.2533;

/// Median of `data`; `None` when empty
pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(0.5 * (sorted[mid - 1] + sorted[mid]))
    } else {
        Some(sorted[mid])
    }
}

/// Median and scaled median absolute deviation (robust sigma estimate)
pub fn robust_location_scale(data: &[f64]) -> Option<(f64, f64)> {
    let center = median(data)?;
    let deviations: Vec<f64> = data.iter().map(|x| (x - center).abs()).collect();
    let mad = median(&deviations)?;
    Some((center, MAD_TO_SIGMA * mad))
}

/// Median and a sigma estimate that survives mostly-constant data.
///
/// Uses the scaled MAD, falling back to the scaled mean absolute deviation
/// around the median when more than half of the values coincide. The scale
/// is 0 only when every value is identical.
pub fn location_scale(data: &[f64]) -> Option<(f64, f64)> {
    let (center, scale) = robust_location_scale(data)?;
    if scale > 0.0 {
        return Some((center, scale));
    }

    let mean_deviation = data.iter().map(|x| (x - center).abs()).sum::<f64>() / data.len() as f64;
    Some((center, MEAN_AD_TO_SIGMA * mean_deviation))
}

/// Pearson correlation; 0 when either input is constant
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }

    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }

    let denom = (var_a * var_b).sqrt();
    if denom > 0.0 { cov / denom } else { 0.0 }
}
