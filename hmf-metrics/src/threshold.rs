use crate::error::{AnalysisError, Result};

/// Quantile of pre-sorted data by linear interpolation between order
/// statistics (R type 7, the numpy/pandas default).
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    let h = (n - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    sorted[lo] + (h - h.floor()) * (sorted[hi] - sorted[lo])
}

/// The HMF threshold: the `q`-th quantile of all discharge values.
pub fn hmf_threshold(discharges: impl IntoIterator<Item = f64>, q: f64) -> Result<f64> {
    if !(q > 0.0 && q < 1.0) {
        return Err(AnalysisError::InvalidQuantile(q));
    }
    let mut sorted: Vec<f64> = discharges.into_iter().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return Err(AnalysisError::EmptySeries);
    }
    sorted.sort_by(f64::total_cmp);
    Ok(quantile_sorted(&sorted, q))
}
