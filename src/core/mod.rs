pub mod db;

use std::path::PathBuf;

use anyhow::Context;
use tracing::info;

use crate::detection::Inspector;
use crate::image_loader::load_image;
use crate::models::{InspectionResult, RegionReport};
use db::{InspectionRecord, InspectionRepository, NewInspection};

/// A stored inspection together with the per-region evidence behind its labels
#[derive(Debug, Clone)]
pub struct RecordedInspection {
    pub record: InspectionRecord,
    pub reports: Vec<RegionReport>,
}

/// Load `image_path`, inspect it off the async runtime and store the outcome
pub async fn inspect_and_record<R: InspectionRepository>(
    repo: &R,
    inspector: &Inspector,
    image_path: PathBuf,
) -> anyhow::Result<RecordedInspection> {
    let worker = inspector.clone();
    let path = image_path.clone();
    let reports = tokio::task::spawn_blocking(move || {
        let img = load_image(&path)?;
        worker.inspect_regions(&img)
    })
    .await
    .context("Inspection worker panicked")??;

    let result = InspectionResult::aggregate(reports.iter().map(|r| r.label));
    let record = repo
        .add_inspection(NewInspection { image_path, result })
        .await?;
    info!(id = record.id, bolts = record.result.len(), "inspection recorded");
    Ok(RecordedInspection { record, reports })
}
