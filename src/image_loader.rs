use std::path::Path;

use image::{DynamicImage, ImageReader};

use crate::error::{InspectError, Result};

/// Open and decode an image file, rejecting empty rasters
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path)
        .map_err(|e| InspectError::decode(format!("cannot open {:?}", path), e.into()))?
        .with_guessed_format()
        .map_err(|e| InspectError::decode(format!("cannot read {:?}", path), e.into()))?;
    let img = reader
        .decode()
        .map_err(|e| InspectError::decode(format!("cannot decode {:?}", path), e))?;
    ensure_not_empty(img)
}

/// Decode an in-memory upload
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage> {
    let img = image::load_from_memory(bytes)
        .map_err(|e| InspectError::decode("cannot decode image bytes", e))?;
    ensure_not_empty(img)
}

fn ensure_not_empty(img: DynamicImage) -> Result<DynamicImage> {
    if img.width() == 0 || img.height() == 0 {
        return Err(InspectError::empty_image(img.width(), img.height()));
    }
    Ok(img)
}
