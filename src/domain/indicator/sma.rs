//! Simple moving average over an optional-valued series.
//!
//! SMA(n)[i] = mean(values[i-n+1..=i]), defined only when every value in
//! the window is defined.

pub fn calculate_sma(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }

    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        let sum: Option<f64> = window.iter().copied().sum();
        out[i] = sum.map(|s| s / period as f64);
    }

    out
}
