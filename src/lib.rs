//! FourierMix — mix grayscale images in the Fourier domain.
//!
//! Images are loaded as [`SpectralImage`]s (luminance plus centered spectrum),
//! optionally edited for brightness/contrast, then combined by a
//! [`SpectralMixer`] either as magnitude/phase or as real/imaginary parts,
//! optionally restricted to a rectangular frequency region.  The mixed
//! spectrum is turned back into an image by inverse transform.
//!
//! ```no_run
//! use fouriermix::{MixerSettings, Region, SpectralMixer, WeightPair, io};
//! use std::path::Path;
//!
//! let settings = MixerSettings::default();
//! let a = io::load_for_mixing(Path::new("a.png"), &settings)?;
//! let b = io::load_for_mixing(Path::new("b.png"), &settings)?;
//! let low_pass = Region::new(true, 192, 192, 128, 128);
//! let mixer = SpectralMixer::new([&a, &b], Some(low_pass))?;
//! let out = mixer.mix_magnitude_phase(&[WeightPair(0.7, 0.2), WeightPair(0.3, 0.8)])?;
//! println!("{:?}", out.dimensions());
//! # Ok::<(), fouriermix::MixError>(())
//! ```

pub mod config;
pub mod error;
pub mod io;
pub mod logger;
pub mod mixer;
pub mod spectral_image;
pub mod spectrum;
pub mod worker;

pub use config::{MixerSettings, ResizeFilter};
pub use error::MixError;
pub use mixer::{FrequencyMask, MixMode, MixStage, Region, SpectralMixer, WeightPair};
pub use spectral_image::{SpectralComponent, SpectralImage, ViewComponent};
pub use spectrum::Spectrum;
pub use worker::{MixJob, MixMessage, spawn_mix, start_mix};
