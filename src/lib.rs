//! Paint-mark inspection for bolts and nuts.
//!
//! An image goes through preprocessing, candidate extraction, per-region line
//! detection and classification; the outcome is one [`Label`] per accepted
//! fastener, in discovery order.

pub mod config;
pub mod core;
pub mod detection;
pub mod error;
pub mod image_loader;
pub mod models;
pub mod pipeline;

pub use config::{
    AlignmentPolicy, AreaMeasure, HoughParams, PreprocessStrategy, ShapeFilter, StrategyConfig,
};
pub use detection::{Inspector, inspect};
pub use error::{InspectError, Result};
pub use image_loader::{decode_image, load_image};
pub use models::{
    BoundingBox, CandidateRegion, InspectionResult, Label, LineSegment, RegionReport,
};
pub use pipeline::{DebugConfig, Pipeline, PipelineContext, PipelineData, PipelineStep};

/// Install a `tracing` subscriber honoring `RUST_LOG`, falling back to
/// `default_level` when the variable is unset.
pub fn init_tracing(default_level: &str) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
