// ============================================================================
// IMAGE LOADING — decode files into luminance SpectralImages
// ============================================================================

use std::path::Path;

use image::DynamicImage;

use crate::config::MixerSettings;
use crate::error::MixError;
use crate::spectral_image::SpectralImage;
use crate::{log_err, log_info};

/// Decode an image file and convert it to 8-bit luminance.
pub fn load_image_sync(path: &Path) -> Result<SpectralImage, MixError> {
    let img = image::open(path).map_err(|e| {
        log_err!("Failed to load {}: {}", path.display(), e);
        MixError::InvalidImageData(format!("{}: {}", path.display(), e))
    })?;
    log_info!(
        "Loaded {} ({}x{})",
        path.display(),
        img.width(),
        img.height()
    );
    into_spectral(img)
}

/// Decode an in-memory encoded image (PNG, JPEG, BMP).
pub fn load_from_memory(bytes: &[u8]) -> Result<SpectralImage, MixError> {
    let img = image::load_from_memory(bytes)?;
    into_spectral(img)
}

/// Load `path` and resample it to the configured target size, ready to be
/// mixed with other images loaded the same way.
pub fn load_for_mixing(path: &Path, settings: &MixerSettings) -> Result<SpectralImage, MixError> {
    let mut image = load_image_sync(path)?;
    if image.dimensions() != (settings.target_width, settings.target_height) {
        image.resize(
            settings.target_width,
            settings.target_height,
            settings.resize_filter,
        )?;
    }
    Ok(image)
}

fn into_spectral(img: DynamicImage) -> Result<SpectralImage, MixError> {
    SpectralImage::from_samples(img.into_luma8())
}
