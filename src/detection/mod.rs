pub mod annotate;
pub mod classify;
pub mod contours;
pub mod hough;
pub mod marks;
pub mod preprocessing;
pub mod steps;

use std::path::PathBuf;
use std::sync::Arc;

use image::{DynamicImage, GrayImage};
use tracing::{debug, info};

use crate::config::{PreprocessStrategy, StrategyConfig};
use crate::detection::hough::LineDetector;
use crate::detection::marks::MarkParams;
use crate::error::{InspectError, Result};
use crate::models::{CandidateRegion, InspectionResult, RegionReport};
use crate::pipeline::{DebugConfig, Pipeline, prepare_debug_dir};

/// Ready-to-use inspection handle.
///
/// Construction validates the strategy and precomputes the Hough tables once;
/// after that the handle can be shared across threads and reused for any
/// number of images.
#[derive(Debug, Clone)]
pub struct Inspector {
    config: StrategyConfig,
    detector: Arc<LineDetector>,
    debug: Option<DebugConfig>,
}

impl Inspector {
    pub fn new(config: StrategyConfig) -> Result<Self> {
        config.validate()?;
        let detector = Arc::new(LineDetector::new(config.hough.clone()));
        Ok(Self {
            config,
            detector,
            debug: None,
        })
    }

    /// Save every step's output under `output_dir` (must be empty or missing)
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        prepare_debug_dir(&output_dir)?;
        self.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });
        Ok(self)
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn line_detector(&self) -> &LineDetector {
        &self.detector
    }

    pub fn mark_params(&self) -> MarkParams {
        MarkParams {
            edge_low: self.config.mark_edge_low,
            edge_high: self.config.mark_edge_high,
            min_segment_length: self.config.min_segment_length,
            border_margin: self.config.border_margin,
        }
    }

    /// Build the step pipeline for this strategy
    pub fn build_pipeline(&self) -> Pipeline {
        use crate::detection::steps::*;

        let config = &self.config;
        let pipeline = Pipeline::new()
            .with_debug_config(self.debug.clone())
            .add_step(Arc::new(GrayscaleStep))
            .add_step(Arc::new(BlurStep {
                sigma: config.blur_sigma,
            }));

        let pipeline = match config.preprocess {
            PreprocessStrategy::Edge {
                low_threshold,
                high_threshold,
            } => pipeline.add_step(Arc::new(EdgeDetectionStep {
                low_threshold,
                high_threshold,
            })),
            PreprocessStrategy::Gradient {
                threshold,
                dilate_iterations,
                erode_iterations,
                kernel_size,
            } => pipeline.add_step(Arc::new(GradientStep {
                threshold,
                kernel_size,
                dilate_iterations,
                erode_iterations,
            })),
        };

        pipeline
            .add_step(Arc::new(CandidateExtractionStep {
                filter: config.shape_filter.clone(),
                epsilon_ratio: config.polygon_epsilon_ratio,
                area_measure: config.area_measure,
            }))
            .add_step(Arc::new(MarkDetectionStep {
                detector: self.detector.clone(),
                params: self.mark_params(),
            }))
            .add_step(Arc::new(ClassificationStep {
                policy: config.alignment.clone(),
            }))
    }

    /// Preprocessor stage only
    pub fn preprocess(&self, img: &DynamicImage) -> Result<GrayImage> {
        preprocessing::preprocess(img, &self.config.preprocess, self.config.blur_sigma)
    }

    /// Preprocessor and candidate extraction (for debugging and counting)
    pub fn extract_candidates(&self, img: &DynamicImage) -> Result<Vec<CandidateRegion>> {
        let edges = self.preprocess(img)?;
        Ok(contours::extract_candidates(
            &edges,
            &self.config.shape_filter,
            self.config.polygon_epsilon_ratio,
            self.config.area_measure,
        ))
    }

    /// Run the whole pipeline and keep the per-region evidence
    pub fn inspect_regions(&self, img: &DynamicImage) -> Result<Vec<RegionReport>> {
        if img.width() == 0 || img.height() == 0 {
            return Err(InspectError::empty_image(img.width(), img.height()));
        }

        let pipeline = self.build_pipeline();
        debug!(steps = ?pipeline.step_names(), "pipeline built");

        let items = pipeline.run(img.clone())?;
        let reports: Vec<RegionReport> = items
            .into_iter()
            .filter_map(|item| {
                Some(RegionReport {
                    label: item.label?,
                    region: item.region?,
                    segments: item.segments,
                })
            })
            .collect();

        info!(
            width = img.width(),
            height = img.height(),
            bolts = reports.len(),
            "inspection finished"
        );
        Ok(reports)
    }

    /// Classify every fastener in the image, in discovery order
    pub fn inspect(&self, img: &DynamicImage) -> Result<InspectionResult> {
        let reports = self.inspect_regions(img)?;
        Ok(InspectionResult::aggregate(reports.iter().map(|r| r.label)))
    }
}

/// One-shot convenience: validate `config`, then inspect `img`
pub fn inspect(img: &DynamicImage, config: &StrategyConfig) -> Result<InspectionResult> {
    Inspector::new(config.clone())?.inspect(img)
}
