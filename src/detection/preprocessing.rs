use image::{DynamicImage, GrayImage, Luma};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use imageproc::morphology;

use crate::config::PreprocessStrategy;
use crate::error::{InspectError, Result};

/// Convert image to grayscale
pub fn to_grayscale(img: &DynamicImage) -> GrayImage {
    img.to_luma8()
}

/// Apply Gaussian blur to reduce noise
pub fn apply_blur(img: &GrayImage, sigma: f32) -> GrayImage {
    gaussian_blur_f32(img, sigma)
}

/// Detect edges using Canny edge detector.
///
/// `imageproc`'s `canny` smooths with its own sigma 1.4 Gaussian first, so
/// callers that already blurred get both passes.
pub fn detect_edges(img: &GrayImage, low_threshold: f32, high_threshold: f32) -> GrayImage {
    canny(img, low_threshold, high_threshold)
}

/// Pixels strictly above `threshold` become 255, the rest 0
pub fn binary_threshold(img: &GrayImage, threshold: u8) -> GrayImage {
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        pixel[0] = if pixel[0] > threshold { 255 } else { 0 };
    }
    out
}

/// Equal-weight blend of |Sobel x| and |Sobel y|, each saturated to 8 bits
pub fn gradient_magnitude(img: &GrayImage) -> GrayImage {
    let gx = horizontal_sobel(img);
    let gy = vertical_sobel(img);
    let (width, height) = img.dimensions();

    let mut out = GrayImage::new(width, height);
    for (x, y, pixel) in out.enumerate_pixels_mut() {
        let ax = gx.get_pixel(x, y)[0].unsigned_abs().min(255) as f32;
        let ay = gy.get_pixel(x, y)[0].unsigned_abs().min(255) as f32;
        let blended = (0.5 * ax + 0.5 * ay).round().min(255.0);
        *pixel = Luma([blended as u8]);
    }
    out
}

/// Dilate then erode with a square structuring element of side `kernel_size`
pub fn morphological_cleanup(
    img: &GrayImage,
    kernel_size: u8,
    dilate_iterations: u8,
    erode_iterations: u8,
) -> GrayImage {
    // An L-infinity ball of radius k is a (2k+1)x(2k+1) square
    let radius = kernel_size / 2;
    let mut out = img.clone();
    for _ in 0..dilate_iterations {
        out = morphology::dilate(&out, Norm::LInf, radius);
    }
    for _ in 0..erode_iterations {
        out = morphology::erode(&out, Norm::LInf, radius);
    }
    out
}

/// Turn a color image into the edge/foreground map contours are traced on
pub fn preprocess(
    img: &DynamicImage,
    strategy: &PreprocessStrategy,
    blur_sigma: f32,
) -> Result<GrayImage> {
    if img.width() == 0 || img.height() == 0 {
        return Err(InspectError::empty_image(img.width(), img.height()));
    }

    let gray = to_grayscale(img);
    let blurred = apply_blur(&gray, blur_sigma);

    Ok(apply_strategy(&blurred, strategy))
}

/// Run only the strategy-specific part on an already smoothed grayscale image
pub fn apply_strategy(blurred: &GrayImage, strategy: &PreprocessStrategy) -> GrayImage {
    match *strategy {
        PreprocessStrategy::Edge {
            low_threshold,
            high_threshold,
        } => detect_edges(blurred, low_threshold, high_threshold),
        PreprocessStrategy::Gradient {
            threshold,
            dilate_iterations,
            erode_iterations,
            kernel_size,
        } => {
            let binary = binary_threshold(blurred, threshold);
            let magnitude = gradient_magnitude(&binary);
            morphological_cleanup(&magnitude, kernel_size, dilate_iterations, erode_iterations)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_strict() {
        let img = GrayImage::from_fn(3, 1, |x, _| Luma([[94u8, 95, 96][x as usize]]));
        let out = binary_threshold(&img, 95);
        assert_eq!(out.as_raw(), &vec![0, 0, 255]);
    }

    #[test]
    fn gradient_is_zero_on_flat_image() {
        let img = GrayImage::from_pixel(8, 8, Luma([200u8]));
        let out = gradient_magnitude(&img);
        assert!(out.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn cleanup_grows_a_single_pixel() {
        let mut img = GrayImage::new(21, 21);
        img.put_pixel(10, 10, Luma([255u8]));
        // net one 5x5 dilation survives three dilations and two erosions
        let out = morphological_cleanup(&img, 5, 3, 2);
        assert_eq!(out.get_pixel(12, 12)[0], 255);
        assert_eq!(out.get_pixel(13, 10)[0], 0);
    }

    #[test]
    fn zero_sized_image_is_a_decode_error() {
        let img = DynamicImage::new_luma8(0, 10);
        let err = preprocess(
            &img,
            &PreprocessStrategy::Edge {
                low_threshold: 50.0,
                high_threshold: 150.0,
            },
            1.0,
        )
        .unwrap_err();
        assert!(matches!(err, InspectError::Decode { .. }));
    }
}
