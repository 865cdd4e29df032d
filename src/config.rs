//! Strategy configuration for the inspection pipeline.
//!
//! Every threshold the pipeline uses lives here. Two presets reproduce the
//! two known variants of the heuristic:
//!
//! - [`StrategyConfig::edge`]: Canny edges, near-square bolt heads, short paint marks
//! - [`StrategyConfig::gradient`]: Sobel gradients with morphological cleanup,
//!   round fasteners, long paint marks
//!
//! Configs can also be loaded from JSON:
//!
//! ```no_run
//! use boltmark::StrategyConfig;
//! use std::path::Path;
//!
//! let config = StrategyConfig::from_json_file(Path::new("strategy.json"))?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{InspectError, Result};

/// How the raw image is turned into an edge/foreground map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreprocessStrategy {
    /// Canny edge detection with fixed hysteresis thresholds
    Edge { low_threshold: f32, high_threshold: f32 },
    /// Binary threshold, Sobel magnitude, then dilate/erode cleanup
    Gradient {
        threshold: u8,
        dilate_iterations: u8,
        erode_iterations: u8,
        /// Side length of the square structuring element (odd)
        kernel_size: u8,
    },
}

/// Geometric rule deciding which contours are fasteners. All bounds are exclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShapeFilter {
    AspectRatio {
        min_area: f64,
        max_area: f64,
        min_aspect: f64,
        max_aspect: f64,
    },
    Circularity {
        min_area: f64,
        max_area: f64,
        min_circularity: f64,
    },
}

impl ShapeFilter {
    pub fn accepts(&self, area: f64, aspect_ratio: f64, circularity: f64) -> bool {
        match *self {
            ShapeFilter::AspectRatio {
                min_area,
                max_area,
                min_aspect,
                max_aspect,
            } => {
                area > min_area
                    && area < max_area
                    && aspect_ratio > min_aspect
                    && aspect_ratio < max_aspect
            }
            ShapeFilter::Circularity {
                min_area,
                max_area,
                min_circularity,
            } => area > min_area && area < max_area && circularity > min_circularity,
        }
    }
}

/// Which area a contour is judged by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AreaMeasure {
    /// Shoelace area of the simplified polygon
    Polygon,
    /// Bounding rectangle width × height
    BoundingBox,
}

/// Probabilistic Hough transform parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoughParams {
    /// Distance resolution of the accumulator in pixels
    pub distance_resolution: f64,
    /// Angle resolution of the accumulator in degrees
    pub angle_resolution_deg: f64,
    pub vote_threshold: u32,
    pub min_line_length: u32,
    pub max_line_gap: u32,
}

impl HoughParams {
    /// Short paint marks on small bolt heads
    pub fn short_segments() -> Self {
        Self {
            distance_resolution: 1.0,
            angle_resolution_deg: 1.0,
            vote_threshold: 15,
            min_line_length: 10,
            max_line_gap: 3,
        }
    }

    /// Long marks running across nut and surface
    pub fn long_segments() -> Self {
        Self {
            distance_resolution: 1.0,
            angle_resolution_deg: 1.0,
            vote_threshold: 30,
            min_line_length: 50,
            max_line_gap: 15,
        }
    }
}

/// Rule mapping detected segments to a label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// First segment within `tolerance_deg` of horizontal (inclusive) is aligned,
    /// any other first segment is misaligned
    AngleTolerance { tolerance_deg: f64 },
    /// Any segment with |dx| or |dy| under `tolerance_px` is aligned, otherwise no mark
    AxisAligned { tolerance_px: i32 },
}

impl Default for AlignmentPolicy {
    fn default() -> Self {
        AlignmentPolicy::AngleTolerance {
            tolerance_deg: 10.0,
        }
    }
}

/// Complete parameter set for one inspection strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub preprocess: PreprocessStrategy,
    /// Gaussian sigma applied before edge extraction
    pub blur_sigma: f32,
    pub shape_filter: ShapeFilter,
    pub area_measure: AreaMeasure,
    /// Douglas-Peucker tolerance as a fraction of the contour perimeter
    pub polygon_epsilon_ratio: f64,
    /// Canny thresholds used inside each cropped region
    pub mark_edge_low: f32,
    pub mark_edge_high: f32,
    pub hough: HoughParams,
    /// Segments shorter than this are dropped before classification
    pub min_segment_length: f64,
    /// Segments running along a crop side within this many pixels are the
    /// fastener's own outline and are dropped
    #[serde(default = "default_border_margin")]
    pub border_margin: u32,
    #[serde(default)]
    pub alignment: AlignmentPolicy,
}

fn default_border_margin() -> u32 {
    4
}

impl StrategyConfig {
    /// Canny + aspect-ratio filtering of near-square bolt heads
    pub fn edge() -> Self {
        Self {
            preprocess: PreprocessStrategy::Edge {
                low_threshold: 50.0,
                high_threshold: 150.0,
            },
            blur_sigma: 1.0,
            shape_filter: ShapeFilter::AspectRatio {
                min_area: 800.0,
                max_area: 3000.0,
                min_aspect: 0.9,
                max_aspect: 1.1,
            },
            area_measure: AreaMeasure::BoundingBox,
            polygon_epsilon_ratio: 0.02,
            mark_edge_low: 50.0,
            mark_edge_high: 100.0,
            hough: HoughParams::short_segments(),
            min_segment_length: 0.0,
            border_margin: 4,
            alignment: AlignmentPolicy::default(),
        }
    }

    /// Sobel gradient + circularity filtering of rounder fasteners
    pub fn gradient() -> Self {
        Self {
            preprocess: PreprocessStrategy::Gradient {
                threshold: 95,
                dilate_iterations: 3,
                erode_iterations: 2,
                kernel_size: 5,
            },
            blur_sigma: 1.0,
            shape_filter: ShapeFilter::Circularity {
                min_area: 800.0,
                max_area: 6000.0,
                min_circularity: 0.2,
            },
            area_measure: AreaMeasure::Polygon,
            polygon_epsilon_ratio: 0.02,
            mark_edge_low: 50.0,
            mark_edge_high: 150.0,
            hough: HoughParams::long_segments(),
            min_segment_length: 20.0,
            // the cleaned-up outline sits a few pixels inside the crop
            border_margin: 8,
            alignment: AlignmentPolicy::default(),
        }
    }

    pub fn with_alignment(mut self, alignment: AlignmentPolicy) -> Self {
        self.alignment = alignment;
        self
    }

    /// Reject values that would make a stage meaningless
    pub fn validate(&self) -> Result<()> {
        if !(self.blur_sigma > 0.0) {
            return Err(InspectError::invalid_config("blur_sigma", self.blur_sigma));
        }
        match &self.preprocess {
            PreprocessStrategy::Edge {
                low_threshold,
                high_threshold,
            } => {
                if !(low_threshold <= high_threshold) {
                    return Err(InspectError::invalid_config(
                        "preprocess.low_threshold",
                        low_threshold,
                    ));
                }
            }
            PreprocessStrategy::Gradient { kernel_size, .. } => {
                if *kernel_size == 0 || kernel_size % 2 == 0 {
                    return Err(InspectError::invalid_config(
                        "preprocess.kernel_size",
                        kernel_size,
                    ));
                }
            }
        }
        if !(self.polygon_epsilon_ratio >= 0.0) {
            return Err(InspectError::invalid_config(
                "polygon_epsilon_ratio",
                self.polygon_epsilon_ratio,
            ));
        }
        if !(self.mark_edge_low <= self.mark_edge_high) {
            return Err(InspectError::invalid_config("mark_edge_low", self.mark_edge_low));
        }
        if !(self.hough.distance_resolution > 0.0) {
            return Err(InspectError::invalid_config(
                "hough.distance_resolution",
                self.hough.distance_resolution,
            ));
        }
        if !(self.hough.angle_resolution_deg > 0.0 && self.hough.angle_resolution_deg <= 90.0) {
            return Err(InspectError::invalid_config(
                "hough.angle_resolution_deg",
                self.hough.angle_resolution_deg,
            ));
        }
        if self.hough.vote_threshold == 0 {
            return Err(InspectError::invalid_config("hough.vote_threshold", 0));
        }
        if let AlignmentPolicy::AngleTolerance { tolerance_deg } = self.alignment {
            if !(0.0..=90.0).contains(&tolerance_deg) {
                return Err(InspectError::invalid_config(
                    "alignment.tolerance_deg",
                    tolerance_deg,
                ));
            }
        }
        Ok(())
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read strategy config {:?}", path))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse strategy config {:?}", path))?;
        Ok(config)
    }

    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write strategy config {:?}", path))?;
        Ok(())
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self::edge()
    }
}
