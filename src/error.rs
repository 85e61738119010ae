// ============================================================================
// ERRORS — one taxonomy for every fallible operation in the crate
// ============================================================================

/// Error type for image construction, transforms and mixing.
#[derive(Debug, Clone, PartialEq)]
pub enum MixError {
    /// Empty, truncated or undecodable source buffer.
    InvalidImageData(String),
    /// Two grids that must agree in size do not.
    ShapeMismatch(String),
    /// One weight pair per image is required.
    WeightCountMismatch { expected: usize, found: usize },
    /// Non-finite weight or a weight column summing to zero.
    InvalidWeights(String),
    /// Min/max normalization over a constant field.
    DegenerateRange,
    /// Non-finite brightness / contrast or similar scalar argument.
    InvalidParameter(String),
    /// A background mixing job panicked.
    WorkerPanicked(String),
}

impl std::fmt::Display for MixError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MixError::InvalidImageData(e) => write!(f, "Invalid image data: {}", e),
            MixError::ShapeMismatch(e) => write!(f, "Shape mismatch: {}", e),
            MixError::WeightCountMismatch { expected, found } => write!(
                f,
                "Weight count mismatch: {} images but {} weight pairs",
                expected, found
            ),
            MixError::InvalidWeights(e) => write!(f, "Invalid weights: {}", e),
            MixError::DegenerateRange => write!(f, "Cannot normalize a constant-valued field"),
            MixError::InvalidParameter(e) => write!(f, "Invalid parameter: {}", e),
            MixError::WorkerPanicked(e) => write!(f, "Mixing job panicked: {}", e),
        }
    }
}

impl std::error::Error for MixError {}

impl MixError {
    /// `ShapeMismatch` between two `(width, height)` sizes.
    pub fn shape(expected: (u32, u32), found: (u32, u32)) -> Self {
        MixError::ShapeMismatch(format!(
            "expected {}x{}, found {}x{}",
            expected.0, expected.1, found.0, found.1
        ))
    }
}

impl From<image::ImageError> for MixError {
    fn from(e: image::ImageError) -> Self {
        MixError::InvalidImageData(e.to_string())
    }
}

impl From<std::io::Error> for MixError {
    fn from(e: std::io::Error) -> Self {
        MixError::InvalidImageData(e.to_string())
    }
}
