mod inspection;
mod state;

use std::{path::Path, path::PathBuf, sync::Arc};

use anyhow::Context;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use state::StoreState;
use time::OffsetDateTime;

use crate::models::InspectionResult;

pub use inspection::{InspectionRecord, InspectionRepository, NewInspection};

/// SQLite-backed history of inspections plus the directory holding the uploaded images
#[derive(Debug, Clone)]
pub struct InspectionDb {
    state: Arc<StoreState>,
}

impl InspectionDb {
    pub async fn open<P: AsRef<Path>, Q: AsRef<Path>>(
        db_file: P,
        uploads_dir: Q,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StoreState::new(db_file, uploads_dir).await?),
        })
    }

    /// Open an existing database for reading history. Unlike [`InspectionDb::open`]
    /// this fails instead of creating the database file or the uploads directory.
    pub async fn open_existing<P: AsRef<Path>, Q: AsRef<Path>>(
        db_file: P,
        uploads_dir: Q,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            state: Arc::new(StoreState::existing(db_file, uploads_dir).await?),
        })
    }

    async fn insert_row(
        &self,
        stored_path: &Path,
        result: &InspectionResult,
        timestamp: OffsetDateTime,
    ) -> anyhow::Result<i64> {
        let stored_str = stored_path
            .to_str()
            .with_context(|| format!("Stored image path is not UTF-8: {:?}", stored_path))?;
        let result_json = result.to_json()?;

        let id: i64 = sqlx::query(
            "INSERT INTO inspections (image_path, result, timestamp) \
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(stored_str)
        .bind(&result_json)
        .bind(to_micros(timestamp))
        .fetch_one(&self.state.pool)
        .await?
        .try_get("id")?;
        Ok(id)
    }

    /// Close the connection pool. Further queries fail.
    pub async fn close(&self) {
        self.state.close().await;
    }
}

fn to_micros(ts: OffsetDateTime) -> i64 {
    (ts.unix_timestamp_nanos() / 1_000) as i64
}

fn from_micros(us: i64) -> anyhow::Result<OffsetDateTime> {
    Ok(OffsetDateTime::from_unix_timestamp_nanos(us as i128 * 1_000)?)
}

fn record_from_row(row: &SqliteRow) -> anyhow::Result<InspectionRecord> {
    let result_json: String = row.try_get("result")?;
    let result = InspectionResult::from_json(&result_json)
        .with_context(|| format!("Stored result is not a label array: {}", result_json))?;
    let image_path: String = row.try_get("image_path")?;
    Ok(InspectionRecord {
        id: row.try_get("id")?,
        image_path: PathBuf::from(image_path),
        result,
        timestamp: from_micros(row.try_get("timestamp")?)?,
    })
}

impl InspectionRepository for InspectionDb {
    async fn add_inspection(&self, inspection: NewInspection) -> anyhow::Result<InspectionRecord> {
        let stored_path = self.state.store_image(&inspection.image_path).await?;
        // Stored at microsecond precision so the returned record matches a later read
        let timestamp = from_micros(to_micros(OffsetDateTime::now_utc()))?;

        let id = match self.insert_row(&stored_path, &inspection.result, timestamp).await {
            Ok(id) => id,
            Err(e) => {
                self.state.discard_image(&stored_path).await;
                return Err(e);
            }
        };

        Ok(InspectionRecord {
            id,
            image_path: stored_path,
            result: inspection.result,
            timestamp,
        })
    }

    async fn get_inspection(&self, id: i64) -> anyhow::Result<Option<InspectionRecord>> {
        let row = sqlx::query(
            "SELECT id, image_path, result, timestamp FROM inspections WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.state.pool)
        .await?;
        row.as_ref().map(record_from_row).transpose()
    }

    async fn get_inspections(&self) -> anyhow::Result<Vec<InspectionRecord>> {
        sqlx::query(
            "SELECT id, image_path, result, timestamp FROM inspections \
             ORDER BY timestamp DESC, id DESC",
        )
        .fetch_all(&self.state.pool)
        .await?
        .iter()
        .map(record_from_row)
        .collect()
    }
}
