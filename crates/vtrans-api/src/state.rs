//! Application state.

use std::sync::Arc;

use vtrans_engine::JobRegistry;
use vtrans_pipeline::{CancellationManager, PipelineConfig, TranscodePipeline, UploadFinalizer};
use vtrans_progress::{ProgressChannel, ProgressStore};
use vtrans_storage::{ObjectCatalog, S3Store};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline_config: PipelineConfig,
    pub store: ProgressStore,
    pub channel: ProgressChannel,
    pub storage: Arc<S3Store>,
    pub registry: Arc<JobRegistry>,
    pub pipeline: Arc<TranscodePipeline>,
    pub canceller: Arc<CancellationManager>,
    pub finalizer: Arc<UploadFinalizer>,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let pipeline_config = PipelineConfig::from_env();

        tokio::fs::create_dir_all(&config.upload_dir).await?;
        tokio::fs::create_dir_all(&pipeline_config.work_dir).await?;

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let store = ProgressStore::new(&redis_url)?;
        let channel = ProgressChannel::new(&redis_url, store.clone())?;

        let storage = Arc::new(S3Store::from_env()?);
        let catalog = Arc::new(ObjectCatalog::new(Arc::clone(&storage)));

        let registry = Arc::new(JobRegistry::new());
        let finalizer = Arc::new(UploadFinalizer::new(
            storage.clone(),
            catalog,
            pipeline_config.work_dir.clone(),
            pipeline_config.upload_attempts,
            pipeline_config.signed_url_ttl,
        ));
        let pipeline = Arc::new(TranscodePipeline::new(
            &pipeline_config,
            Arc::clone(&registry),
            channel.clone(),
            Arc::clone(&finalizer),
        ));
        let canceller = Arc::new(CancellationManager::new(
            Arc::clone(&registry),
            store.clone(),
            pipeline_config.work_dir.clone(),
        ));

        Ok(Self {
            config,
            pipeline_config,
            store,
            channel,
            storage,
            registry,
            pipeline,
            canceller,
            finalizer,
        })
    }
}
