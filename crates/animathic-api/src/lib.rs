//! HTTP surface fixed by spec §6: `generate`/`status`/`videos`/`stream`,
//! consumed by external clients. Enqueues work; `animathic-worker` is the
//! only process that ever mutates a job past `queued`.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
