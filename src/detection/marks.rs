use image::{DynamicImage, GenericImageView, GrayImage};
use tracing::{debug, trace};

use crate::detection::hough::LineDetector;
use crate::detection::preprocessing;
use crate::error::{InspectError, Result};
use crate::models::{CandidateRegion, LineSegment};

/// Canny thresholds and segment cutoffs applied inside each region
#[derive(Debug, Clone, Copy)]
pub struct MarkParams {
    pub edge_low: f32,
    pub edge_high: f32,
    pub min_segment_length: f64,
    /// Distance from a crop side within which a segment counts as outline
    pub border_margin: u32,
}

/// True when both endpoints lie within `margin` pixels of the same side of a
/// `width`x`height` crop. The crop is the fastener's bounding box, so such a
/// segment traces the fastener's outline rather than a paint mark.
pub fn hugs_border(segment: &LineSegment, width: u32, height: u32, margin: u32) -> bool {
    let m = margin as i32;
    let right = width as i32 - 1 - m;
    let bottom = height as i32 - 1 - m;
    let (a, b) = (segment.start, segment.end);

    (a.x <= m && b.x <= m)
        || (a.x >= right && b.x >= right)
        || (a.y <= m && b.y <= m)
        || (a.y >= bottom && b.y >= bottom)
}

/// Cut the region's bounding rectangle out of the source image.
/// Fails instead of clamping when the rectangle does not fit.
pub fn extract_roi(source: &DynamicImage, region: &CandidateRegion) -> Result<DynamicImage> {
    let (image_width, image_height) = source.dimensions();
    let bbox = region.bbox;
    if !bbox.fits_within(image_width, image_height) {
        return Err(InspectError::RegionExtraction {
            index: region.index,
            x: bbox.x,
            y: bbox.y,
            width: bbox.width,
            height: bbox.height,
            image_width,
            image_height,
        });
    }
    Ok(source.crop_imm(bbox.x, bbox.y, bbox.width, bbox.height))
}

/// Edge map of an already cropped region and the segments found in it,
/// in detector order with short and outline segments removed
pub fn detect_in_roi(
    roi: &DynamicImage,
    detector: &LineDetector,
    params: &MarkParams,
) -> (GrayImage, Vec<LineSegment>) {
    let gray = preprocessing::to_grayscale(roi);
    let edges = preprocessing::detect_edges(&gray, params.edge_low, params.edge_high);
    let (width, height) = edges.dimensions();

    let detected = detector.detect(&edges);
    let total = detected.len();
    let segments: Vec<LineSegment> = detected
        .into_iter()
        .filter(|s| s.length() >= params.min_segment_length)
        .filter(|s| !hugs_border(s, width, height, params.border_margin))
        .collect();

    debug!(detected = total, kept = segments.len(), "mark segments filtered");
    (edges, segments)
}

/// Paint-mark candidates inside one region of `source`
pub fn detect_mark(
    source: &DynamicImage,
    region: &CandidateRegion,
    detector: &LineDetector,
    params: &MarkParams,
) -> Result<Vec<LineSegment>> {
    let roi = extract_roi(source, region)?;
    let (_, segments) = detect_in_roi(&roi, detector, params);

    for s in &segments {
        trace!(
            region = region.index,
            angle = s.angle_deg(),
            length = s.length(),
            "segment"
        );
    }
    Ok(segments)
}
