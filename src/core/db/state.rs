use anyhow::Context;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tokio::fs as async_fs;
use tracing::warn;
use uuid::Uuid;

use std::path::{Path, PathBuf};

pub(super) struct StoreState {
    pub(super) pool: SqlitePool,
    uploads_dir: PathBuf,
}

impl std::fmt::Debug for StoreState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreState")
            .field("uploads_dir", &self.uploads_dir)
            .finish()
    }
}

impl StoreState {
    pub(super) async fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        db_file: P,
        uploads_dir: Q,
    ) -> anyhow::Result<Self> {
        let db_file = db_file.as_ref();
        let uploads_dir = uploads_dir.as_ref().to_path_buf();

        if let Some(parent) = db_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            async_fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create database directory {:?}", parent))?;
        }
        async_fs::create_dir_all(&uploads_dir)
            .await
            .with_context(|| format!("Failed to create uploads directory {:?}", uploads_dir))?;

        Self::connect(db_file, uploads_dir, true).await
    }

    /// Open a database that must already exist. Nothing is created on disk.
    pub(super) async fn existing<P: AsRef<Path>, Q: AsRef<Path>>(
        db_file: P,
        uploads_dir: Q,
    ) -> anyhow::Result<Self> {
        let db_file = db_file.as_ref();
        if !async_fs::try_exists(db_file).await.unwrap_or(false) {
            anyhow::bail!("No inspection database at {:?}", db_file);
        }
        Self::connect(db_file, uploads_dir.as_ref().to_path_buf(), false).await
    }

    async fn connect(db_file: &Path, uploads_dir: PathBuf, create: bool) -> anyhow::Result<Self> {
        let connect_opts = SqliteConnectOptions::new()
            .filename(db_file)
            .create_if_missing(create)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("Failed to open inspection database {:?}", db_file))?;
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool, uploads_dir })
    }

    /// Copy an uploaded image into the uploads directory under a fresh name,
    /// returning the stored path.
    pub(super) async fn store_image<P: AsRef<Path>>(&self, img_path: P) -> anyhow::Result<PathBuf> {
        let img_path = img_path.as_ref();
        let original_name = img_path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Image path has no usable file name: {:?}", img_path))?;

        let dest_path = self
            .uploads_dir
            .join(format!("{}-{}", Uuid::new_v4(), original_name));
        async_fs::copy(img_path, &dest_path).await.with_context(|| {
            format!(
                "Failed to copy image from {:?} to {:?}",
                img_path, dest_path
            )
        })?;
        Ok(dest_path)
    }

    /// Best-effort removal of an image copy whose row was never written
    pub(super) async fn discard_image(&self, stored_path: &Path) {
        if let Err(e) = async_fs::remove_file(stored_path).await {
            warn!(path = %stored_path.display(), error = %e, "failed to remove orphaned upload");
        }
    }

    pub(super) async fn close(&self) {
        self.pool.close().await;
    }
}
