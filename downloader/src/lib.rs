//! Coverfetch download engine.
//!
//! Two stages that compose through the shared data model:
//! - [`Fetcher`] retrieves every variant concurrently and keeps only the
//!   ones that came back `200 OK` with a complete body.
//! - [`Persister`] writes every retrieved payload concurrently under a
//!   sniffed suffix and reports each failed write.
pub mod fetcher;
pub mod persister;
pub mod pipeline;

pub use fetcher::Fetcher;
pub use persister::Persister;
pub use pipeline::download_and_save;

use std::sync::Arc;
use tokio::sync::Semaphore;

/// Build the optional concurrency limiter shared by both stages.
///
/// A limit of zero is treated as one.
pub(crate) fn concurrency_limit(max_concurrent: Option<usize>) -> Option<Arc<Semaphore>> {
    max_concurrent.map(|max| Arc::new(Semaphore::new(max.max(1))))
}
