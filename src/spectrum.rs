// ============================================================================
// SPECTRUM — centered 2-D DFT grids and display normalization
// ============================================================================
//
// Grids are row-major, `width` samples per row.  A centered spectrum holds the
// zero-frequency (DC) term at `(height / 2, width / 2)`.
// Row and column passes of the transform run in parallel via rayon.
// ============================================================================

use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::{FftDirection, FftPlanner};

use crate::error::MixError;

pub type Complex64 = Complex<f64>;

/// Ranges smaller than this fraction of the largest absolute value (or of 1.0,
/// whichever is larger) count as flat.
const FLAT_RANGE_TOLERANCE: f64 = 1e-9;

/// A complex grid in the frequency domain, stored with the DC term at the
/// center.
#[derive(Clone, Debug, PartialEq)]
pub struct Spectrum {
    width: u32,
    height: u32,
    data: Vec<Complex64>,
}

impl Spectrum {
    /// Wrap an existing centered buffer. Fails when `data` does not hold
    /// exactly `width * height` entries.
    pub fn from_vec(width: u32, height: u32, data: Vec<Complex64>) -> Result<Self, MixError> {
        let expected = width as usize * height as usize;
        if data.len() != expected {
            return Err(MixError::ShapeMismatch(format!(
                "{}x{} spectrum needs {} entries, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self { width, height, data })
    }

    /// Centered forward transform of a real sample grid.
    pub(crate) fn forward(samples: &[f64], width: u32, height: u32) -> Self {
        let mut buf: Vec<Complex64> = samples.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        fft_2d(&mut buf, width as usize, height as usize, FftDirection::Forward);
        Self {
            width,
            height,
            data: fftshift(&buf, width as usize, height as usize),
        }
    }

    /// Undo the centering and run the inverse transform, scaled by `1/N`.
    pub(crate) fn inverse(&self) -> Vec<Complex64> {
        let w = self.width as usize;
        let h = self.height as usize;
        let mut buf = ifftshift(&self.data, w, h);
        fft_2d(&mut buf, w, h, FftDirection::Inverse);
        let scale = 1.0 / (w * h).max(1) as f64;
        buf.par_iter_mut().for_each(|c| *c *= scale);
        buf
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    /// Flat index of the DC term.
    pub fn center_index(&self) -> usize {
        (self.height as usize / 2) * self.width as usize + self.width as usize / 2
    }

    /// Entry at column `x`, row `y` of the centered grid.
    pub fn get(&self, x: u32, y: u32) -> Option<Complex64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Apply `f` to every entry, producing a real grid of the same shape.
    pub fn map_real<F>(&self, f: F) -> Vec<f64>
    where
        F: Fn(Complex64) -> f64 + Sync,
    {
        self.data.par_iter().map(|&c| f(c)).collect()
    }
}

// ============================================================================
// TRANSFORM
// ============================================================================

/// In-place unnormalized 2-D FFT: every row, then every column.
fn fft_2d(data: &mut [Complex64], width: usize, height: usize, direction: FftDirection) {
    if width == 0 || height == 0 {
        return;
    }
    let mut planner = FftPlanner::<f64>::new();

    let row_fft = planner.plan_fft(width, direction);
    data.par_chunks_mut(width).for_each(|row| row_fft.process(row));

    let col_fft = planner.plan_fft(height, direction);
    let mut columns = transpose(data, width, height);
    columns.par_chunks_mut(height).for_each(|col| col_fft.process(col));
    let rows = transpose(&columns, height, width);
    data.copy_from_slice(&rows);
}

/// Transpose a `width`-wide row-major grid into a `height`-wide one.
fn transpose(data: &[Complex64], width: usize, height: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::new(0.0, 0.0); data.len()];
    out.par_chunks_mut(height).enumerate().for_each(|(x, col)| {
        for (y, v) in col.iter_mut().enumerate() {
            *v = data[y * width + x];
        }
    });
    out
}

// ============================================================================
// CENTERING
// ============================================================================

/// Move the zero-frequency term from `(0, 0)` to `(height / 2, width / 2)`.
pub fn fftshift(data: &[Complex64], width: usize, height: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::new(0.0, 0.0); data.len()];
    for y in 0..height {
        let dy = (y + height / 2) % height;
        for x in 0..width {
            let dx = (x + width / 2) % width;
            out[dy * width + dx] = data[y * width + x];
        }
    }
    out
}

/// Inverse of [`fftshift`]; differs from it only for odd dimensions.
pub fn ifftshift(data: &[Complex64], width: usize, height: usize) -> Vec<Complex64> {
    let mut out = vec![Complex64::new(0.0, 0.0); data.len()];
    for y in 0..height {
        let sy = (y + height / 2) % height;
        for x in 0..width {
            let sx = (x + width / 2) % width;
            out[y * width + x] = data[sy * width + sx];
        }
    }
    out
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// `(min, max)` over the finite values, `None` when there are none.
pub fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Linearly rescale `values` to `[0, 255]`.
/// Fails with `DegenerateRange` when max == min (within tolerance).
pub fn normalize_checked(values: &[f64]) -> Result<Vec<u8>, MixError> {
    let Some((min, max)) = value_range(values) else {
        return Err(MixError::DegenerateRange);
    };
    let range = max - min;
    let scale = min.abs().max(max.abs()).max(1.0);
    if range <= FLAT_RANGE_TOLERANCE * scale {
        return Err(MixError::DegenerateRange);
    }
    Ok(values
        .par_iter()
        .map(|&v| {
            if v.is_finite() {
                ((v - min) / range * 255.0).round().clamp(0.0, 255.0) as u8
            } else {
                0
            }
        })
        .collect())
}

/// [`normalize_checked`] with the flat-field fallback: all zeros.
pub fn normalize_to_u8(values: &[f64]) -> Vec<u8> {
    match normalize_checked(values) {
        Ok(out) => out,
        Err(_) => {
            crate::log_debug!("Flat field over {} values, display view is all zero", values.len());
            vec![0; values.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn c(re: f64) -> Complex64 {
        Complex64::new(re, 0.0)
    }

    #[test]
    fn shift_puts_dc_at_center_for_odd_and_even_sizes() {
        for (w, h) in [(4usize, 4usize), (5, 3), (1, 1), (6, 7)] {
            let mut data = vec![c(0.0); w * h];
            data[0] = c(1.0);
            let shifted = fftshift(&data, w, h);
            let center = (h / 2) * w + w / 2;
            assert_eq!(shifted[center], c(1.0), "size {}x{}", w, h);
            assert_eq!(ifftshift(&shifted, w, h), data);
        }
    }

    #[test]
    fn forward_dc_equals_sample_sum() {
        let samples: Vec<f64> = (0..12).map(|v| v as f64).collect();
        let spec = Spectrum::forward(&samples, 4, 3);
        let dc = spec.data()[spec.center_index()];
        assert_abs_diff_eq!(dc.re, 66.0, epsilon = 1e-9);
        assert_abs_diff_eq!(dc.im, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn inverse_recovers_samples() {
        let samples: Vec<f64> = (0..35).map(|v| ((v * 37) % 11) as f64).collect();
        let spec = Spectrum::forward(&samples, 7, 5);
        let back = spec.inverse();
        for (a, b) in samples.iter().zip(&back) {
            assert_abs_diff_eq!(*a, b.re, epsilon = 1e-9);
            assert_abs_diff_eq!(0.0, b.im, epsilon = 1e-9);
        }
    }

    #[test]
    fn from_vec_rejects_wrong_length() {
        let err = Spectrum::from_vec(3, 3, vec![c(0.0); 8]).unwrap_err();
        assert!(matches!(err, MixError::ShapeMismatch(_)));
    }

    #[test]
    fn normalize_spans_full_range() {
        let out = normalize_checked(&[-1.0, 0.0, 1.0]).unwrap();
        assert_eq!(out, vec![0, 128, 255]);
    }

    #[test]
    fn flat_field_is_degenerate_and_falls_back_to_zero() {
        assert_eq!(normalize_checked(&[3.0; 4]), Err(MixError::DegenerateRange));
        assert_eq!(normalize_to_u8(&[3.0, 3.0 + 1e-13]), vec![0, 0]);
        assert_eq!(normalize_checked(&[]), Err(MixError::DegenerateRange));
    }
}
