use std::{future::Future, path::PathBuf};

use time::OffsetDateTime;

use crate::models::InspectionResult;

/// A stored inspection
#[derive(Debug, Clone)]
pub struct InspectionRecord {
    pub id: i64,
    /// Path of the stored copy of the uploaded image
    pub image_path: PathBuf,
    pub result: InspectionResult,
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewInspection {
    /// Image to copy into the uploads directory
    pub image_path: PathBuf,
    pub result: InspectionResult,
}

pub trait InspectionRepository {
    fn add_inspection(
        &self,
        inspection: NewInspection,
    ) -> impl Future<Output = anyhow::Result<InspectionRecord>>;
    fn get_inspection(
        &self,
        id: i64,
    ) -> impl Future<Output = anyhow::Result<Option<InspectionRecord>>>;
    /// Newest first
    fn get_inspections(&self) -> impl Future<Output = anyhow::Result<Vec<InspectionRecord>>>;
}
