// ============================================================================
// SPECTRAL IMAGE — a luminance grid paired with its centered Fourier transform
// ============================================================================
//
// Each image keeps two pairs:
//   * `samples` / `spectrum`: the unedited baseline
//   * `edited_samples` / `edited_spectrum`: the same after brightness/contrast
//
// Brightness/contrast never re-runs the transform: an additive shift only
// touches the DC term and a scale multiplies every entry.
// ============================================================================

use image::{GrayImage, imageops};
use rayon::prelude::*;

use crate::config::ResizeFilter;
use crate::error::MixError;
use crate::spectrum::{self, Complex64, Spectrum};
use crate::{log_debug, log_info};

/// Real-valued view of a complex spectrum entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpectralComponent {
    Real,
    Imaginary,
    Magnitude,
    /// `atan2(im, re)` in radians, `(-π, π]`.
    Phase,
    /// `ln(1 + |z|)`.
    LogMagnitude,
}

impl SpectralComponent {
    pub const ALL: [SpectralComponent; 5] = [
        SpectralComponent::Real,
        SpectralComponent::Imaginary,
        SpectralComponent::Magnitude,
        SpectralComponent::Phase,
        SpectralComponent::LogMagnitude,
    ];

    pub fn extract(self, z: Complex64) -> f64 {
        match self {
            SpectralComponent::Real => z.re,
            SpectralComponent::Imaginary => z.im,
            SpectralComponent::Magnitude => z.norm(),
            SpectralComponent::Phase => z.arg(),
            SpectralComponent::LogMagnitude => z.norm().ln_1p(),
        }
    }
}

/// The component selector shown next to an input image.
/// Magnitude is displayed on a log scale; the rest map one to one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewComponent {
    Real,
    Imaginary,
    Magnitude,
    Phase,
}

impl ViewComponent {
    pub const ALL: [ViewComponent; 4] = [
        ViewComponent::Real,
        ViewComponent::Imaginary,
        ViewComponent::Magnitude,
        ViewComponent::Phase,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ViewComponent::Real => "Real",
            ViewComponent::Imaginary => "Imaginary",
            ViewComponent::Magnitude => "Magnitude",
            ViewComponent::Phase => "Phase",
        }
    }

    pub fn component(self) -> SpectralComponent {
        match self {
            ViewComponent::Real => SpectralComponent::Real,
            ViewComponent::Imaginary => SpectralComponent::Imaginary,
            ViewComponent::Magnitude => SpectralComponent::LogMagnitude,
            ViewComponent::Phase => SpectralComponent::Phase,
        }
    }
}

/// Grayscale image with its centered spectrum.
#[derive(Clone, Debug)]
pub struct SpectralImage {
    samples: GrayImage,
    edited_samples: GrayImage,
    spectrum: Spectrum,
    edited_spectrum: Spectrum,
}

impl SpectralImage {
    /// Take ownership of `buffer` and compute its centered spectrum.
    pub fn from_samples(buffer: GrayImage) -> Result<Self, MixError> {
        let (w, h) = buffer.dimensions();
        if w == 0 || h == 0 {
            return Err(MixError::InvalidImageData(format!(
                "empty {}x{} sample buffer",
                w, h
            )));
        }
        let values: Vec<f64> = buffer.as_raw().iter().map(|&v| v as f64).collect();
        let spectrum = Spectrum::forward(&values, w, h);
        log_debug!("Built {}x{} spectral image", w, h);
        Ok(Self {
            edited_samples: buffer.clone(),
            samples: buffer,
            edited_spectrum: spectrum.clone(),
            spectrum,
        })
    }

    /// Build from a raw row-major luminance buffer.
    pub fn from_raw(width: u32, height: u32, bytes: Vec<u8>) -> Result<Self, MixError> {
        let len = bytes.len();
        let buffer = GrayImage::from_raw(width, height, bytes).ok_or_else(|| {
            MixError::InvalidImageData(format!(
                "{} bytes cannot hold a {}x{} luminance image",
                len, width, height
            ))
        })?;
        Self::from_samples(buffer)
    }

    /// Reconstruct an image from a centered spectrum: undo the centering,
    /// inverse transform, take magnitudes and rescale to `[0, 255]`.
    ///
    /// A flat reconstruction keeps its raw intensity (clamped) rather than
    /// collapsing to zero, so a constant mix stays that constant.
    pub fn from_spectrum(centered: &Spectrum) -> Result<Self, MixError> {
        let (w, h) = centered.dimensions();
        if centered.is_empty() {
            return Err(MixError::InvalidImageData("empty spectrum".to_string()));
        }
        let magnitudes: Vec<f64> = centered.inverse().par_iter().map(|c| c.norm()).collect();
        let bytes = match spectrum::normalize_checked(&magnitudes) {
            Ok(bytes) => bytes,
            Err(_) => {
                log_debug!("Reconstruction is flat, keeping raw intensity");
                magnitudes
                    .iter()
                    .map(|&v| v.round().clamp(0.0, 255.0) as u8)
                    .collect()
            }
        };
        Self::from_raw(w, h, bytes)
    }

    /// Resample the edited samples to `new_width` x `new_height` and rebuild
    /// every buffer from the result. Edit history is discarded.
    pub fn resize(
        &mut self,
        new_width: u32,
        new_height: u32,
        filter: ResizeFilter,
    ) -> Result<(), MixError> {
        if new_width == 0 || new_height == 0 {
            return Err(MixError::InvalidImageData(format!(
                "cannot resize to {}x{}",
                new_width, new_height
            )));
        }
        let (w, h) = self.dimensions();
        let resized = imageops::resize(
            &self.edited_samples,
            new_width,
            new_height,
            filter.to_image_filter(),
        );
        *self = Self::from_samples(resized)?;
        log_info!("Resized image {}x{} -> {}x{}", w, h, new_width, new_height);
        Ok(())
    }

    pub fn width(&self) -> u32 {
        self.samples.width()
    }

    pub fn height(&self) -> u32 {
        self.samples.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.samples.dimensions()
    }

    /// Total sample count `N`.
    pub fn sample_count(&self) -> usize {
        self.samples.as_raw().len()
    }

    pub fn samples(&self) -> &GrayImage {
        &self.samples
    }

    /// The display buffer: samples after the current brightness/contrast edit.
    pub fn edited_samples(&self) -> &GrayImage {
        &self.edited_samples
    }

    pub fn spectrum(&self) -> &Spectrum {
        &self.spectrum
    }

    pub fn edited_spectrum(&self) -> &Spectrum {
        &self.edited_spectrum
    }

    // --- component extraction (from the edited spectrum) -------------------

    pub fn component(&self, component: SpectralComponent) -> Vec<f64> {
        self.edited_spectrum.map_real(|z| component.extract(z))
    }

    pub fn real_part(&self) -> Vec<f64> {
        self.component(SpectralComponent::Real)
    }

    pub fn imaginary_part(&self) -> Vec<f64> {
        self.component(SpectralComponent::Imaginary)
    }

    pub fn magnitude(&self) -> Vec<f64> {
        self.component(SpectralComponent::Magnitude)
    }

    pub fn phase(&self) -> Vec<f64> {
        self.component(SpectralComponent::Phase)
    }

    pub fn log_magnitude(&self) -> Vec<f64> {
        self.component(SpectralComponent::LogMagnitude)
    }

    /// `component` rescaled to `[0, 255]`. A flat component is all zero.
    pub fn normalized_display_view(&self, component: SpectralComponent) -> GrayImage {
        let (w, h) = self.dimensions();
        let bytes = spectrum::normalize_to_u8(&self.component(component));
        GrayImage::from_raw(w, h, bytes).unwrap_or_else(|| GrayImage::new(w, h))
    }

    /// Display view for the viewport selector.
    pub fn view(&self, view: ViewComponent) -> GrayImage {
        self.normalized_display_view(view.component())
    }

    // --- brightness / contrast ----------------------------------------------

    /// `output = (input - mean) * contrast + mean + brightness`, starting from
    /// the unedited baseline every call.
    ///
    /// The edited spectrum is updated algebraically and is not clipped; the
    /// edited samples are clipped to `[0, 255]`.
    pub fn apply_brightness_contrast(
        &mut self,
        brightness: f64,
        contrast: f64,
    ) -> Result<(), MixError> {
        if !brightness.is_finite() || !contrast.is_finite() {
            return Err(MixError::InvalidParameter(format!(
                "brightness {} / contrast {} must be finite",
                brightness, contrast
            )));
        }
        self.reset_edits();

        let mut edit = IntensityEdit::new(&self.edited_samples, self.edited_spectrum.clone());
        let mean = edit.mean();
        edit.shift_intensity(-mean);
        edit.scale_intensity(contrast);
        edit.shift_intensity(mean);
        edit.shift_intensity(brightness);

        let (w, h) = self.dimensions();
        let (bytes, spectrum) = edit.finish();
        self.edited_samples = GrayImage::from_raw(w, h, bytes)
            .ok_or_else(|| MixError::InvalidImageData("edited buffer lost its shape".to_string()))?;
        self.edited_spectrum = spectrum;
        log_debug!(
            "Brightness {:.3} / contrast {:.3} applied around mean {:.3}",
            brightness,
            contrast,
            mean
        );
        Ok(())
    }

    /// Drop any brightness/contrast edit.
    pub fn reset_edits(&mut self) {
        self.edited_samples = self.samples.clone();
        self.edited_spectrum = self.spectrum.clone();
    }
}

/// Working state for one brightness/contrast call: unclipped intensities plus
/// the spectrum they correspond to.
struct IntensityEdit {
    values: Vec<f64>,
    spectrum: Spectrum,
}

impl IntensityEdit {
    fn new(samples: &GrayImage, spectrum: Spectrum) -> Self {
        Self {
            values: samples.as_raw().iter().map(|&v| v as f64).collect(),
            spectrum,
        }
    }

    fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        self.values.iter().sum::<f64>() / self.values.len() as f64
    }

    /// Add `k` to every sample: only the DC term moves, by `k * N`.
    fn shift_intensity(&mut self, k: f64) {
        self.values.par_iter_mut().for_each(|v| *v += k);
        let n = self.values.len() as f64;
        let dc = self.spectrum.center_index();
        self.spectrum.data_mut()[dc] += Complex64::new(k * n, 0.0);
    }

    /// Multiply every sample, and so every spectrum entry, by `c`.
    fn scale_intensity(&mut self, c: f64) {
        self.values.par_iter_mut().for_each(|v| *v *= c);
        self.spectrum.data_mut().par_iter_mut().for_each(|z| *z *= c);
    }

    fn finish(self) -> (Vec<u8>, Spectrum) {
        let bytes = self
            .values
            .par_iter()
            .map(|&v| v.round().clamp(0.0, 255.0) as u8)
            .collect();
        (bytes, self.spectrum)
    }
}
