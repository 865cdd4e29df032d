use image::DynamicImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

use crate::error::{InspectError, Result};
use crate::models::{BoundingBox, CandidateRegion, Label, LineSegment};

/// Data that flows through the pipeline
/// Each PipelineData represents the full image or a single candidate region
#[derive(Clone)]
pub struct PipelineData {
    /// The image data (can be grayscale or color)
    pub image: DynamicImage,

    /// Reference to the original image (shared efficiently via Arc)
    pub original: Arc<DynamicImage>,

    /// Candidate this item was split into (None means full image)
    pub region: Option<CandidateRegion>,

    /// Line segments found inside the region
    pub segments: Vec<LineSegment>,

    /// Verdict once the region has been classified
    pub label: Option<Label>,
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: DynamicImage) -> Self {
        let original = Arc::new(image.clone());
        Self {
            image,
            original,
            region: None,
            segments: Vec::new(),
            label: None,
        }
    }

    /// Create PipelineData for a region of an image
    pub fn from_region(
        image: DynamicImage,
        original: Arc<DynamicImage>,
        region: CandidateRegion,
    ) -> Self {
        Self {
            image,
            original,
            region: Some(region),
            segments: Vec::new(),
            label: None,
        }
    }

    /// Same item with a new image, everything else carried over
    pub fn with_image(&self, image: DynamicImage) -> Self {
        Self {
            image,
            original: self.original.clone(),
            region: self.region.clone(),
            segments: self.segments.clone(),
            label: self.label,
        }
    }

    pub fn bbox(&self) -> Option<BoundingBox> {
        self.region.as_ref().map(|r| r.bbox)
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    fn debug_dir(&self) -> Option<&Path> {
        self.debug
            .as_ref()
            .filter(|d| d.enabled)
            .map(|d| d.output_dir.as_path())
    }
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data
    /// Steps can split data (1 → many), filter (many → fewer), or transform (many → many)
    fn process(
        &self,
        data: Vec<PipelineData>,
        context: &PipelineContext,
    ) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in logs and debug directory names)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        prepare_debug_dir(&output_dir)?;
        self.context.debug = Some(DebugConfig {
            output_dir,
            enabled: true,
        });
        Ok(self)
    }

    /// Reuse an already prepared debug configuration
    pub fn with_debug_config(mut self, debug: Option<DebugConfig>) -> Self {
        self.context.debug = debug;
        self
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Helper method to add a step from a Box (for convenience)
    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run the pipeline sequentially on an input image
    pub fn run(&self, input: DynamicImage) -> Result<Vec<PipelineData>> {
        self.run_partial(input, self.steps.len())
    }

    /// Run the pipeline but stop after `num_steps` steps (useful for debugging)
    pub fn run_partial(&self, input: DynamicImage, num_steps: usize) -> Result<Vec<PipelineData>> {
        // Save initial input in debug mode
        if let Some(dir) = self.context.debug_dir() {
            save_images(dir, "00_input", std::slice::from_ref(&input))?;
        }

        // Start with a single PipelineData containing the full image
        let mut data = vec![PipelineData::from_image(input)];

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            debug!(step = step.name(), items = data.len(), "running step");

            data = step.process(data, &self.context)?;

            if let Some(dir) = self.context.debug_dir() {
                let step_dir_name = format!(
                    "{:02}_{}",
                    step_idx + 1,
                    step.name().to_lowercase().replace(' ', "_")
                );
                let images: Vec<DynamicImage> = data.iter().map(|d| d.image.clone()).collect();
                save_images(dir, &step_dir_name, &images)?;
            }

            debug!(step = step.name(), items = data.len(), "step finished");
        }

        Ok(data)
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Create the debug directory, refusing one that already has content
pub fn prepare_debug_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() {
        let mut entries = std::fs::read_dir(output_dir)
            .map_err(|e| InspectError::debug_output(format!("cannot read {:?}", output_dir), e))?;
        if entries.next().is_some() {
            return Err(InspectError::DebugOutput {
                message: format!("Debug directory is not empty: {}", output_dir.display()),
                source: None,
            });
        }
    } else {
        std::fs::create_dir_all(output_dir)
            .map_err(|e| InspectError::debug_output(format!("cannot create {:?}", output_dir), e))?;
    }
    Ok(())
}

fn save_images(root: &Path, step_dir_name: &str, images: &[DynamicImage]) -> Result<()> {
    let step_dir = root.join(step_dir_name);
    std::fs::create_dir_all(&step_dir)
        .map_err(|e| InspectError::debug_output(format!("cannot create {:?}", step_dir), e))?;

    for (idx, image) in images.iter().enumerate() {
        let output_path = step_dir.join(format!("{:02}.png", idx + 1));
        image
            .save(&output_path)
            .map_err(|e| InspectError::debug_output("Failed to save debug image", e))?;
    }

    debug!(count = images.len(), dir = step_dir_name, "saved debug images");
    Ok(())
}
