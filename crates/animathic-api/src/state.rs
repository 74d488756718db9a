//! Shared application state.

use std::sync::Arc;

use animathic_db::{JobRepository, UserRepository, VideoRepository};
use animathic_storage::StorageClient;

use crate::config::ApiConfig;

#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub storage: Arc<StorageClient>,
    pub videos: Arc<VideoRepository>,
    pub jobs: Arc<JobRepository>,
    pub users: Arc<UserRepository>,
}

impl AppState {
    pub async fn new(config: ApiConfig, pool: sqlx::PgPool, storage: StorageClient) -> Self {
        Self {
            config,
            storage: Arc::new(storage),
            videos: Arc::new(VideoRepository::new(pool.clone())),
            jobs: Arc::new(JobRepository::new(pool.clone())),
            users: Arc::new(UserRepository::new(pool)),
        }
    }
}
