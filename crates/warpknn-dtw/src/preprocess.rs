//! Series preprocessing.

use crate::error::PreprocessError;
use crate::series::TimeSeries;

/// Rescale a series to zero mean and unit (population) standard deviation.
///
/// DTW compares raw amplitudes, so series recorded on different scales or
/// offsets should be normalized before fitting and predicting.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`PreprocessError::ConstantSeries`] | zero variance, including length-1 series |
/// | [`PreprocessError::Overflow`] | a normalized value is not finite |
#[must_use = "returns a new normalized series; the original is unchanged"]
pub fn z_normalize(series: &TimeSeries) -> Result<TimeSeries, PreprocessError> {
    let data = series.as_ref();
    let constant = PreprocessError::ConstantSeries {
        n: data.len(),
        value: data[0],
    };

    // z-scores are scale invariant; dividing by the peak keeps sums of squares
    // finite for inputs near f64::MAX.
    let peak = data.iter().fold(0.0_f64, |acc, &x| acc.max(x.abs()));
    if peak == 0.0 {
        return Err(constant);
    }
    let scaled: Vec<f64> = data.iter().map(|&x| x / peak).collect();

    let n = scaled.len() as f64;
    let mean = scaled.iter().sum::<f64>() / n;
    let std = (scaled.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();

    if std == 0.0 {
        return Err(constant);
    }

    let normalized: Vec<f64> = scaled.iter().map(|&x| (x - mean) / std).collect();
    if normalized.iter().any(|v| !v.is_finite()) {
        return Err(PreprocessError::Overflow { n: data.len() });
    }
    Ok(TimeSeries::from_validated(normalized))
}

/// Z-normalize every series independently, failing on the first constant one.
///
/// # Errors
///
/// Returns the first [`PreprocessError`] encountered.
#[must_use = "returns a new vector of normalized series"]
pub fn z_normalize_batch(series: &[TimeSeries]) -> Result<Vec<TimeSeries>, PreprocessError> {
    series.iter().map(z_normalize).collect()
}
