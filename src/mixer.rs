// ============================================================================
// SPECTRAL MIXER — weighted combination of several spectra under one mask
// ============================================================================
//
// The mixer borrows its images read-only.  Every mix:
//   1. normalizes each weight column to sum to 1
//   2. mixes the first component (magnitude or real part)
//   3. mixes the second component (phase or imaginary part)
//   4. assembles a centered complex spectrum
//   5. reconstructs a new SpectralImage through the inverse transform
// A progress callback is invoked after steps 2, 3, 4 and 5.
// ============================================================================

use rayon::prelude::*;

use crate::error::MixError;
use crate::spectral_image::{SpectralComponent, SpectralImage};
use crate::spectrum::{Complex64, Spectrum};
use crate::{log_debug, log_info};

// ============================================================================
// REGION + MASK
// ============================================================================

/// Rectangle in frequency-plane pixel coordinates, with the choice of keeping
/// the frequencies inside it (low-pass when centered) or outside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub keep_inside: bool,
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Region {
    pub fn new(keep_inside: bool, x: i64, y: i64, width: i64, height: i64) -> Self {
        Self { keep_inside, x, y, width, height }
    }

    /// Half-open `(x0, x1, y0, y1)` bounds clipped to a `w` x `h` grid.
    fn clipped(&self, w: u32, h: u32) -> (usize, usize, usize, usize) {
        let clip = |v: i64, max: u32| v.clamp(0, max as i64) as usize;
        let x0 = clip(self.x, w);
        let y0 = clip(self.y, h);
        let x1 = clip(self.x.saturating_add(self.width), w).max(x0);
        let y1 = clip(self.y.saturating_add(self.height), h).max(y0);
        (x0, x1, y0, y1)
    }
}

/// Binary frequency gate: 1 keeps a frequency, 0 drops it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrequencyMask {
    width: u32,
    height: u32,
    values: Vec<u8>,
}

impl FrequencyMask {
    pub fn all_ones(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            values: vec![1; width as usize * height as usize],
        }
    }

    /// Mask for an optional region: none keeps everything, `keep_inside`
    /// keeps only the rectangle, otherwise everything but the rectangle.
    pub fn from_region(width: u32, height: u32, region: Option<&Region>) -> Self {
        let Some(region) = region else {
            return Self::all_ones(width, height);
        };
        let (inside, outside) = if region.keep_inside { (1, 0) } else { (0, 1) };
        let (x0, x1, y0, y1) = region.clipped(width, height);
        let w = width as usize;
        let mut values = vec![outside; w * height as usize];
        for row in values.chunks_mut(w.max(1)).take(y1).skip(y0) {
            row[x0..x1].fill(inside);
        }
        Self { width, height, values }
    }

    /// Wrap an externally built grid; any non-zero value counts as 1.
    pub fn from_values(width: u32, height: u32, values: Vec<u8>) -> Result<Self, MixError> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(MixError::ShapeMismatch(format!(
                "{}x{} mask needs {} values, got {}",
                width,
                height,
                expected,
                values.len()
            )));
        }
        let values = values.into_iter().map(|v| u8::from(v != 0)).collect();
        Ok(Self { width, height, values })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    pub fn get(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Number of frequencies the mask lets through.
    pub fn kept_count(&self) -> usize {
        self.values.iter().filter(|&&v| v != 0).count()
    }
}

// ============================================================================
// WEIGHTS, MODES, STAGES
// ============================================================================

/// Weights for one image: `.0` applies to the first component of the mix
/// mode (magnitude or real), `.1` to the second (phase or imaginary).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightPair(pub f64, pub f64);

/// Which pair of spectral components is mixed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MixMode {
    MagnitudePhase,
    RealImaginary,
}

impl MixMode {
    /// Labels for the two weight columns.
    pub fn component_labels(self) -> (&'static str, &'static str) {
        match self {
            MixMode::MagnitudePhase => ("Magnitude", "Phase"),
            MixMode::RealImaginary => ("Real", "Imaginary"),
        }
    }
}

/// Progress notifications, emitted in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MixStage {
    FirstComponentMixed,
    SecondComponentMixed,
    SpectrumAssembled,
    InverseComputed,
}

impl MixStage {
    pub const ALL: [MixStage; 4] = [
        MixStage::FirstComponentMixed,
        MixStage::SecondComponentMixed,
        MixStage::SpectrumAssembled,
        MixStage::InverseComputed,
    ];

    /// Overall completion once this stage is reached.
    pub fn progress_percent(self) -> u8 {
        match self {
            MixStage::FirstComponentMixed => 25,
            MixStage::SecondComponentMixed => 50,
            MixStage::SpectrumAssembled => 75,
            MixStage::InverseComputed => 100,
        }
    }
}

// ============================================================================
// MIXER
// ============================================================================

pub struct SpectralMixer<'a> {
    images: Vec<&'a SpectralImage>,
    mask: FrequencyMask,
}

impl<'a> SpectralMixer<'a> {
    /// Mixer over `images` with a mask derived from `region`.
    pub fn new<I>(images: I, region: Option<Region>) -> Result<Self, MixError>
    where
        I: IntoIterator<Item = &'a SpectralImage>,
    {
        let images = collect_images(images)?;
        let (w, h) = images[0].dimensions();
        let mask = FrequencyMask::from_region(w, h, region.as_ref());
        if let Some(r) = region {
            log_info!(
                "Mixer over {} images, keeping {} of {}x{} at ({}, {}) [{} frequencies]",
                images.len(),
                if r.keep_inside { "inside" } else { "outside" },
                r.width,
                r.height,
                r.x,
                r.y,
                mask.kept_count()
            );
        } else {
            log_info!("Mixer over {} images, no frequency mask", images.len());
        }
        Ok(Self { images, mask })
    }

    /// Mixer over `images` with an explicitly supplied mask.
    pub fn with_mask<I>(images: I, mask: FrequencyMask) -> Result<Self, MixError>
    where
        I: IntoIterator<Item = &'a SpectralImage>,
    {
        let images = collect_images(images)?;
        let dims = images[0].dimensions();
        if mask.dimensions() != dims {
            return Err(MixError::shape(dims, mask.dimensions()));
        }
        log_info!(
            "Mixer over {} images, custom mask keeping {} frequencies",
            images.len(),
            mask.kept_count()
        );
        Ok(Self { images, mask })
    }

    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn mask(&self) -> &FrequencyMask {
        &self.mask
    }

    pub fn mix(&self, mode: MixMode, weights: &[WeightPair]) -> Result<SpectralImage, MixError> {
        self.mix_with_progress(mode, weights, |_| {})
    }

    pub fn mix_with_progress<F>(
        &self,
        mode: MixMode,
        weights: &[WeightPair],
        progress: F,
    ) -> Result<SpectralImage, MixError>
    where
        F: FnMut(MixStage),
    {
        match mode {
            MixMode::MagnitudePhase => self.mix_magnitude_phase_with_progress(weights, progress),
            MixMode::RealImaginary => self.mix_real_imaginary_with_progress(weights, progress),
        }
    }

    pub fn mix_magnitude_phase(&self, weights: &[WeightPair]) -> Result<SpectralImage, MixError> {
        self.mix_magnitude_phase_with_progress(weights, |_| {})
    }

    /// Weighted magnitude sum combined with the weighted circular mean of the
    /// phases.
    pub fn mix_magnitude_phase_with_progress<F>(
        &self,
        weights: &[WeightPair],
        mut progress: F,
    ) -> Result<SpectralImage, MixError>
    where
        F: FnMut(MixStage),
    {
        let (mag_w, phase_w) = self.normalized_weights(MixMode::MagnitudePhase, weights)?;

        let magnitudes = self.planes(SpectralComponent::Magnitude);
        let mixed_magnitude = weighted_sum(&magnitudes, &mag_w, self.mask.values());
        self.report(&mut progress, MixStage::FirstComponentMixed);

        let phases = self.planes(SpectralComponent::Phase);
        let mixed_phase = weighted_circular_mean(&phases, &phase_w, self.mask.values());
        self.report(&mut progress, MixStage::SecondComponentMixed);

        let data = mixed_magnitude
            .par_iter()
            .zip(mixed_phase.par_iter())
            .map(|(&m, &p)| Complex64::from_polar(m, p))
            .collect();
        self.reconstruct(data, &mut progress)
    }

    pub fn mix_real_imaginary(&self, weights: &[WeightPair]) -> Result<SpectralImage, MixError> {
        self.mix_real_imaginary_with_progress(weights, |_| {})
    }

    /// Weighted sums of the real and imaginary parts.
    pub fn mix_real_imaginary_with_progress<F>(
        &self,
        weights: &[WeightPair],
        mut progress: F,
    ) -> Result<SpectralImage, MixError>
    where
        F: FnMut(MixStage),
    {
        let (re_w, im_w) = self.normalized_weights(MixMode::RealImaginary, weights)?;

        let reals = self.planes(SpectralComponent::Real);
        let mixed_real = weighted_sum(&reals, &re_w, self.mask.values());
        self.report(&mut progress, MixStage::FirstComponentMixed);

        let imags = self.planes(SpectralComponent::Imaginary);
        let mixed_imag = weighted_sum(&imags, &im_w, self.mask.values());
        self.report(&mut progress, MixStage::SecondComponentMixed);

        let data = mixed_real
            .par_iter()
            .zip(mixed_imag.par_iter())
            .map(|(&re, &im)| Complex64::new(re, im))
            .collect();
        self.reconstruct(data, &mut progress)
    }

    // --- internals ----------------------------------------------------------

    fn planes(&self, component: SpectralComponent) -> Vec<Vec<f64>> {
        self.images.iter().map(|img| img.component(component)).collect()
    }

    fn report<F: FnMut(MixStage)>(&self, progress: &mut F, stage: MixStage) {
        log_debug!("Mix stage {:?} ({}%)", stage, stage.progress_percent());
        progress(stage);
    }

    fn reconstruct<F: FnMut(MixStage)>(
        &self,
        data: Vec<Complex64>,
        progress: &mut F,
    ) -> Result<SpectralImage, MixError> {
        let (w, h) = self.images[0].dimensions();
        let spectrum = Spectrum::from_vec(w, h, data)?;
        self.report(progress, MixStage::SpectrumAssembled);
        let image = SpectralImage::from_spectrum(&spectrum)?;
        self.report(progress, MixStage::InverseComputed);
        Ok(image)
    }

    /// Split the pairs into two columns, each scaled to sum to 1.
    fn normalized_weights(
        &self,
        mode: MixMode,
        weights: &[WeightPair],
    ) -> Result<(Vec<f64>, Vec<f64>), MixError> {
        if weights.len() != self.images.len() {
            return Err(MixError::WeightCountMismatch {
                expected: self.images.len(),
                found: weights.len(),
            });
        }
        let (first_label, second_label) = mode.component_labels();
        let first = normalize_column(first_label, weights.iter().map(|w| w.0).collect())?;
        let second = normalize_column(second_label, weights.iter().map(|w| w.1).collect())?;
        Ok((first, second))
    }
}

fn collect_images<'a, I>(images: I) -> Result<Vec<&'a SpectralImage>, MixError>
where
    I: IntoIterator<Item = &'a SpectralImage>,
{
    let images: Vec<&SpectralImage> = images.into_iter().collect();
    let Some(first) = images.first() else {
        return Err(MixError::InvalidImageData("mixer needs at least one image".to_string()));
    };
    let dims = first.dimensions();
    if let Some(other) = images.iter().find(|img| img.dimensions() != dims) {
        return Err(MixError::shape(dims, other.dimensions()));
    }
    Ok(images)
}

fn normalize_column(label: &str, column: Vec<f64>) -> Result<Vec<f64>, MixError> {
    if let Some(bad) = column.iter().find(|w| !w.is_finite()) {
        return Err(MixError::InvalidWeights(format!(
            "{} weight {} is not finite",
            label, bad
        )));
    }
    // Scale into [-1, 1] first so the sum cannot overflow.
    let largest = column.iter().fold(0.0_f64, |acc, w| acc.max(w.abs()));
    if largest == 0.0 {
        return Err(MixError::InvalidWeights(format!("{} weights sum to zero", label)));
    }
    let scaled: Vec<f64> = column.into_iter().map(|w| w / largest).collect();
    let sum: f64 = scaled.iter().sum();
    if sum == 0.0 {
        return Err(MixError::InvalidWeights(format!("{} weights sum to zero", label)));
    }
    if !sum.is_finite() {
        return Err(MixError::InvalidWeights(format!("{} weight sum is not finite", label)));
    }
    Ok(scaled.into_iter().map(|w| w / sum).collect())
}

/// Per-pixel `Σ weights[i] * planes[i] * mask`.
fn weighted_sum(planes: &[Vec<f64>], weights: &[f64], mask: &[u8]) -> Vec<f64> {
    let mut out = vec![0.0; mask.len()];
    out.par_iter_mut().enumerate().for_each(|(p, v)| {
        let m = mask[p] as f64;
        *v = planes
            .iter()
            .zip(weights)
            .map(|(plane, &w)| w * (plane[p] * m))
            .sum();
    });
    out
}

/// Per-pixel angle of `Σ weights[i] * exp(i * phases[i] * mask)`.
///
/// Summing unit vectors handles wraparound: `0.1` and `2π - 0.1` average to
/// `0`, not `π`.
pub fn weighted_circular_mean(phases: &[Vec<f64>], weights: &[f64], mask: &[u8]) -> Vec<f64> {
    let mut out = vec![0.0; mask.len()];
    out.par_iter_mut().enumerate().for_each(|(p, v)| {
        let m = mask[p] as f64;
        let sum: Complex64 = phases
            .iter()
            .zip(weights)
            .map(|(plane, &w)| Complex64::from_polar(1.0, plane[p] * m) * w)
            .sum();
        *v = sum.arg();
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn constant(value: u8) -> SpectralImage {
        SpectralImage::from_raw(4, 4, vec![value; 16]).unwrap()
    }

    fn textured(seed: u32) -> SpectralImage {
        let bytes = (0..64u32).map(|i| ((i * 37 + seed * 11) % 251) as u8).collect();
        SpectralImage::from_raw(8, 8, bytes).unwrap()
    }

    #[test]
    fn inside_and_outside_masks_are_complements() {
        let inside = FrequencyMask::from_region(10, 7, Some(&Region::new(true, 2, 1, 5, 3)));
        let outside = FrequencyMask::from_region(10, 7, Some(&Region::new(false, 2, 1, 5, 3)));
        assert_eq!(inside.kept_count(), 15);
        for (a, b) in inside.values().iter().zip(outside.values()) {
            assert_eq!(a + b, 1);
        }
        assert_eq!(inside.get(2, 1), Some(1));
        assert_eq!(inside.get(7, 1), Some(0));
    }

    #[test]
    fn region_is_clipped_to_grid() {
        let mask = FrequencyMask::from_region(4, 4, Some(&Region::new(true, -2, 2, 4, 10)));
        assert_eq!(mask.kept_count(), 4);
        assert_eq!(mask.get(1, 3), Some(1));
        assert_eq!(mask.get(2, 3), Some(0));

        let empty = FrequencyMask::from_region(4, 4, Some(&Region::new(true, 1, 1, -3, 2)));
        assert_eq!(empty.kept_count(), 0);
    }

    #[test]
    fn no_region_keeps_everything() {
        let mask = FrequencyMask::from_region(3, 2, None);
        assert_eq!(mask, FrequencyMask::all_ones(3, 2));
    }

    #[test]
    fn circular_mean_handles_wraparound() {
        let phases = vec![vec![0.1], vec![2.0 * PI - 0.1]];
        let mean = weighted_circular_mean(&phases, &[0.5, 0.5], &[1]);
        assert_abs_diff_eq!(mean[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn masked_phase_collapses_to_zero_angle() {
        let phases = vec![vec![2.0], vec![-1.0]];
        let mean = weighted_circular_mean(&phases, &[0.3, 0.7], &[0]);
        assert_abs_diff_eq!(mean[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn weighted_sum_applies_mask() {
        let planes = vec![vec![2.0, 4.0], vec![6.0, 8.0]];
        let out = weighted_sum(&planes, &[0.25, 0.75], &[1, 0]);
        assert_eq!(out, vec![5.0, 0.0]);
    }

    #[test]
    fn equal_constants_mix_to_their_average() {
        let a = constant(100);
        let b = constant(200);
        let mixer = SpectralMixer::new([&a, &b], None).unwrap();
        let weights = [WeightPair(0.5, 0.5), WeightPair(0.5, 0.5)];
        let out = mixer.mix_magnitude_phase(&weights).unwrap();
        assert_eq!(out.dimensions(), (4, 4));
        assert!(out.samples().as_raw().iter().all(|&v| v == 150));

        let out = mixer.mix_real_imaginary(&weights).unwrap();
        assert!(out.samples().as_raw().iter().all(|&v| v == 150));
    }

    #[test]
    fn scaling_a_weight_column_changes_nothing() {
        let a = textured(1);
        let b = textured(2);
        let mixer = SpectralMixer::new([&a, &b], None).unwrap();
        for mode in [MixMode::MagnitudePhase, MixMode::RealImaginary] {
            let base = mixer.mix(mode, &[WeightPair(0.2, 0.6), WeightPair(0.8, 0.4)]).unwrap();
            let scaled = mixer.mix(mode, &[WeightPair(0.4, 0.6), WeightPair(1.6, 0.4)]).unwrap();
            assert_eq!(base.samples(), scaled.samples());
        }
    }

    #[test]
    fn huge_weights_normalize_like_unit_weights() {
        let a = textured(5);
        let b = textured(6);
        let mixer = SpectralMixer::new([&a, &b], None).unwrap();
        let unit = [WeightPair(1.0, 1.0), WeightPair(1.0, 1.0)];
        let huge = [WeightPair(f64::MAX, f64::MAX), WeightPair(f64::MAX, f64::MAX)];
        for mode in [MixMode::MagnitudePhase, MixMode::RealImaginary] {
            let base = mixer.mix(mode, &unit).unwrap();
            let big = mixer.mix(mode, &huge).unwrap();
            assert!(base.samples().as_raw().iter().any(|&v| v != 0));
            assert_eq!(base.samples(), big.samples());
        }
        assert_eq!(
            normalize_column("Magnitude", vec![f64::MAX, f64::MAX]).unwrap(),
            vec![0.5, 0.5]
        );
        assert!(matches!(
            normalize_column("Phase", vec![f64::MAX, -f64::MAX]),
            Err(MixError::InvalidWeights(_))
        ));
    }

    #[test]
    fn stages_arrive_in_order() {
        let a = textured(3);
        let mixer = SpectralMixer::new([&a], None).unwrap();
        for mode in [MixMode::MagnitudePhase, MixMode::RealImaginary] {
            let mut seen = Vec::new();
            mixer
                .mix_with_progress(mode, &[WeightPair(1.0, 1.0)], |s| seen.push(s))
                .unwrap();
            assert_eq!(seen, MixStage::ALL.to_vec());
        }
    }

    #[test]
    fn single_image_full_weight_reproduces_it() {
        let a = textured(4);
        let mixer = SpectralMixer::new([&a], None).unwrap();
        let out = mixer.mix_real_imaginary(&[WeightPair(1.0, 1.0)]).unwrap();
        let direct = SpectralImage::from_spectrum(a.spectrum()).unwrap();
        assert_eq!(out.samples(), direct.samples());
    }

    #[test]
    fn weight_errors() {
        let a = constant(10);
        let b = constant(20);
        let mixer = SpectralMixer::new([&a, &b], None).unwrap();
        assert_eq!(
            mixer.mix_magnitude_phase(&[WeightPair(1.0, 1.0)]).unwrap_err(),
            MixError::WeightCountMismatch { expected: 2, found: 1 }
        );
        assert!(matches!(
            mixer.mix_magnitude_phase(&[WeightPair(0.0, 1.0), WeightPair(0.0, 1.0)]),
            Err(MixError::InvalidWeights(_))
        ));
        assert!(matches!(
            mixer.mix_real_imaginary(&[WeightPair(f64::INFINITY, 1.0), WeightPair(1.0, 1.0)]),
            Err(MixError::InvalidWeights(_))
        ));
    }

    #[test]
    fn construction_errors() {
        let a = constant(10);
        let small = SpectralImage::from_raw(2, 2, vec![1; 4]).unwrap();
        assert!(matches!(
            SpectralMixer::new([&a, &small], None),
            Err(MixError::ShapeMismatch(_))
        ));
        assert!(matches!(
            SpectralMixer::new(Vec::<&SpectralImage>::new(), None),
            Err(MixError::InvalidImageData(_))
        ));
        let mask = FrequencyMask::all_ones(3, 3);
        assert!(matches!(
            SpectralMixer::with_mask([&a], mask),
            Err(MixError::ShapeMismatch(_))
        ));
        assert!(matches!(
            FrequencyMask::from_values(2, 2, vec![1, 0, 1]),
            Err(MixError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn explicit_mask_matches_region_mask() {
        let a = textured(5);
        let region = Region::new(false, 3, 3, 2, 2);
        let from_region = SpectralMixer::new([&a], Some(region)).unwrap();
        let values = FrequencyMask::from_region(8, 8, Some(&region))
            .values()
            .iter()
            .map(|v| v * 9)
            .collect();
        let mask = FrequencyMask::from_values(8, 8, values).unwrap();
        let from_mask = SpectralMixer::with_mask([&a], mask).unwrap();
        assert_eq!(from_region.mask(), from_mask.mask());
        let w = [WeightPair(1.0, 1.0)];
        assert_eq!(
            from_region.mix_magnitude_phase(&w).unwrap().samples(),
            from_mask.mix_magnitude_phase(&w).unwrap().samples()
        );
    }
}
