use crate::config::{AlignmentPolicy, AreaMeasure, ShapeFilter};
use crate::detection::hough::LineDetector;
use crate::detection::marks::{self, MarkParams};
use crate::detection::{contours, preprocessing};
use crate::error::Result;
use crate::pipeline::{PipelineContext, PipelineData, PipelineStep};
use image::DynamicImage;
use rayon::prelude::*;
use std::sync::Arc;
use tracing::{debug, warn};

/// Convert image to grayscale
pub struct GrayscaleStep;

impl PipelineStep for GrayscaleStep {
    fn process(
        &self,
        data: Vec<PipelineData>,
        _context: &PipelineContext,
    ) -> Result<Vec<PipelineData>> {
        Ok(data
            .iter()
            .map(|item| {
                let gray = preprocessing::to_grayscale(&item.image);
                item.with_image(DynamicImage::ImageLuma8(gray))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Grayscale Conversion"
    }
}

/// Apply Gaussian blur
pub struct BlurStep {
    pub sigma: f32,
}

impl PipelineStep for BlurStep {
    fn process(
        &self,
        data: Vec<PipelineData>,
        _context: &PipelineContext,
    ) -> Result<Vec<PipelineData>> {
        Ok(data
            .iter()
            .map(|item| {
                let gray = item.image.to_luma8();
                let blurred = preprocessing::apply_blur(&gray, self.sigma);
                item.with_image(DynamicImage::ImageLuma8(blurred))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Gaussian Blur"
    }
}

/// Detect edges using Canny
pub struct EdgeDetectionStep {
    pub low_threshold: f32,
    pub high_threshold: f32,
}

impl PipelineStep for EdgeDetectionStep {
    fn process(
        &self,
        data: Vec<PipelineData>,
        _context: &PipelineContext,
    ) -> Result<Vec<PipelineData>> {
        Ok(data
            .iter()
            .map(|item| {
                let gray = item.image.to_luma8();
                let edges =
                    preprocessing::detect_edges(&gray, self.low_threshold, self.high_threshold);
                item.with_image(DynamicImage::ImageLuma8(edges))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Edge Detection"
    }
}

/// Binary threshold, Sobel magnitude and dilate/erode cleanup
pub struct GradientStep {
    pub threshold: u8,
    pub kernel_size: u8,
    pub dilate_iterations: u8,
    pub erode_iterations: u8,
}

impl PipelineStep for GradientStep {
    fn process(
        &self,
        data: Vec<PipelineData>,
        _context: &PipelineContext,
    ) -> Result<Vec<PipelineData>> {
        Ok(data
            .iter()
            .map(|item| {
                let gray = item.image.to_luma8();
                let binary = preprocessing::binary_threshold(&gray, self.threshold);
                let magnitude = preprocessing::gradient_magnitude(&binary);
                let cleaned = preprocessing::morphological_cleanup(
                    &magnitude,
                    self.kernel_size,
                    self.dilate_iterations,
                    self.erode_iterations,
                );
                item.with_image(DynamicImage::ImageLuma8(cleaned))
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Gradient Edges"
    }
}

/// Find fastener-shaped contours in the edge map - splits one image into many regions
pub struct CandidateExtractionStep {
    pub filter: ShapeFilter,
    pub epsilon_ratio: f64,
    pub area_measure: AreaMeasure,
}

impl PipelineStep for CandidateExtractionStep {
    fn process(
        &self,
        data: Vec<PipelineData>,
        _context: &PipelineContext,
    ) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let edges = item.image.to_luma8();
            let candidates = contours::extract_candidates(
                &edges,
                &self.filter,
                self.epsilon_ratio,
                self.area_measure,
            );

            // Each candidate becomes its own PipelineData holding the color crop
            for region in candidates {
                match marks::extract_roi(&item.original, &region) {
                    Ok(cropped) => {
                        debug!(
                            index = region.index,
                            x = region.bbox.x,
                            y = region.bbox.y,
                            area = region.area,
                            aspect_ratio = region.aspect_ratio,
                            circularity = region.circularity,
                            "candidate accepted"
                        );
                        let original = item.original.clone();
                        result.push(PipelineData::from_region(cropped, original, region));
                    }
                    Err(e) => warn!(error = %e, "skipping candidate"),
                }
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Candidate Extraction"
    }
}

/// Run the line detector inside every region. Regions are processed in parallel;
/// the output keeps the input order.
pub struct MarkDetectionStep {
    pub detector: Arc<LineDetector>,
    pub params: MarkParams,
}

impl PipelineStep for MarkDetectionStep {
    fn process(
        &self,
        data: Vec<PipelineData>,
        _context: &PipelineContext,
    ) -> Result<Vec<PipelineData>> {
        let result = data
            .into_par_iter()
            .filter_map(|item| {
                if item.region.is_none() {
                    warn!("mark detection received an item without a region, skipping");
                    return None;
                }
                let (edges, segments) =
                    marks::detect_in_roi(&item.image, &self.detector, &self.params);
                let mut new_item = item.with_image(DynamicImage::ImageLuma8(edges));
                new_item.segments = segments;
                Some(new_item)
            })
            .collect();

        Ok(result)
    }

    fn name(&self) -> &str {
        "Mark Detection"
    }
}

/// Assign a label to every region from its segments
pub struct ClassificationStep {
    pub policy: AlignmentPolicy,
}

impl PipelineStep for ClassificationStep {
    fn process(
        &self,
        data: Vec<PipelineData>,
        _context: &PipelineContext,
    ) -> Result<Vec<PipelineData>> {
        Ok(data
            .into_iter()
            .map(|mut item| {
                let label = self.policy.classify(&item.segments);
                if let Some(region) = &item.region {
                    debug!(
                        index = region.index,
                        segments = item.segments.len(),
                        first_angle = item.segments.first().map(|s| s.angle_deg()),
                        %label,
                        "region classified"
                    );
                }
                item.label = Some(label);
                item
            })
            .collect())
    }

    fn name(&self) -> &str {
        "Classification"
    }
}
