//! The worker process: claims queued jobs and drives each one through the
//! pipeline via [`JobCoordinator`], the sole writer of its own job row.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod logging;
pub mod stale_detector;
pub mod status_cache;

pub use config::WorkerConfig;
pub use coordinator::JobCoordinator;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use stale_detector::StaleJobDetector;
pub use status_cache::{JobStatus, JobStatusCache};
