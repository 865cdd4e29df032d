//! Error types for bolt inspection

use thiserror::Error;

/// Result type alias for inspection operations
pub type Result<T> = std::result::Result<T, InspectError>;

#[derive(Error, Debug)]
pub enum InspectError {
    /// Input could not be interpreted as a raster image
    #[error("Failed to decode image: {message}")]
    Decode {
        message: String,
        #[source]
        source: Option<image::ImageError>,
    },

    /// A candidate's bounding rectangle could not be cut out of the source image
    #[error(
        "Region {index} at ({x}, {y}) size {width}x{height} does not fit in {image_width}x{image_height} image"
    )]
    RegionExtraction {
        index: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },

    /// Strategy configuration value out of range
    #[error("Invalid config: {parameter} = {value}")]
    InvalidConfig { parameter: String, value: String },

    /// Writing debug artifacts failed
    #[error("Debug output failed: {message}")]
    DebugOutput {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl InspectError {
    pub fn decode(message: impl Into<String>, source: image::ImageError) -> Self {
        Self::Decode {
            message: message.into(),
            source: Some(source),
        }
    }

    pub fn empty_image(width: u32, height: u32) -> Self {
        Self::Decode {
            message: format!("image has zero dimension ({}x{})", width, height),
            source: None,
        }
    }

    pub fn invalid_config(parameter: impl Into<String>, value: impl ToString) -> Self {
        Self::InvalidConfig {
            parameter: parameter.into(),
            value: value.to_string(),
        }
    }

    pub fn debug_output<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::DebugOutput {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Per-region faults are skipped; everything else aborts the inspection.
    pub fn is_region_fault(&self) -> bool {
        matches!(self, InspectError::RegionExtraction { .. })
    }
}
