/// Concurrent persistence of fetched payloads.
///
/// Each payload is written to `<output_dir>/<prefix>-<key><suffix>` where the
/// suffix is sniffed from the payload bytes. Write failures are collected
/// into the returned [`Report`], never raised.
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use coverfetch_shared::sniff::derive_suffix;
use coverfetch_shared::{FetchResult, Payload, Report, WriteError};

use crate::concurrency_limit;

/// Writes payloads to durable storage.
#[derive(Clone)]
pub struct Persister {
    output_dir: PathBuf,
    limit: Option<Arc<Semaphore>>,
}

impl Persister {
    /// Create a persister writing into `output_dir`.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            limit: None,
        }
    }

    /// Limit how many writes run at once. `None` removes the limit.
    pub fn with_max_concurrent(mut self, max_concurrent: Option<usize>) -> Self {
        self.limit = concurrency_limit(max_concurrent);
        self
    }

    /// Write every payload concurrently and report the failures.
    ///
    /// Waits for every spawned write before returning. Both lists in the
    /// report are ordered by key.
    pub async fn persist<K>(&self, prefix: &str, payloads: FetchResult<K>) -> Report
    where
        K: Ord + Clone + Display + Send + 'static,
    {
        // Payload clones share their bytes; they name the target of any task
        // that never reports back.
        let mut pending: BTreeMap<K, Payload> = BTreeMap::new();
        let mut tasks = JoinSet::new();
        for (key, payload) in payloads {
            pending.insert(key.clone(), payload.clone());

            let output_dir = self.output_dir.clone();
            let prefix = prefix.to_string();
            let limit = self.limit.clone();
            tasks.spawn(async move {
                let _permit = match limit {
                    Some(semaphore) => semaphore.acquire_owned().await.ok(),
                    None => None,
                };
                let path = target_path(&output_dir, &prefix, &key, &payload);
                let outcome = write_payload(&path, &payload).await;
                (key, path, outcome)
            });
        }

        let mut outcomes: BTreeMap<K, (PathBuf, std::io::Result<()>)> = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, path, outcome)) => {
                    pending.remove(&key);
                    outcomes.insert(key, (path, outcome));
                }
                Err(e) => error!("Write task did not complete: {}", e),
            }
        }

        // Tasks that never reported back still count as failed writes.
        for (key, payload) in pending {
            let path = target_path(&self.output_dir, prefix, &key, &payload);
            let cause = std::io::Error::new(std::io::ErrorKind::Other, "write task aborted");
            outcomes.insert(key, (path, Err(cause)));
        }

        let mut report = Report::default();
        for (key, (path, outcome)) in outcomes {
            match outcome {
                Ok(()) => {
                    debug!("Saved {} cover to {}", key, path.display());
                    report.written.push(path);
                }
                Err(source) => {
                    let failure = WriteError {
                        key: key.to_string(),
                        path,
                        source,
                    };
                    error!("{}", failure);
                    report.failures.push(failure);
                }
            }
        }

        info!(
            "Saved {} cover(s), {} failed",
            report.written.len(),
            report.failures.len()
        );
        report
    }
}

/// `<output_dir>/<prefix>-<key><suffix>`, with the suffix sniffed from the payload.
fn target_path(
    output_dir: &Path,
    prefix: &str,
    key: &impl Display,
    payload: &Payload,
) -> PathBuf {
    let suffix = derive_suffix(payload.as_bytes());
    output_dir.join(format!("{}-{}{}", prefix, key, suffix))
}

/// Create or truncate `path` and write the payload to it.
///
/// New files get mode `0666` before the process umask is applied.
async fn write_payload(path: &Path, payload: &Payload) -> std::io::Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o666);

    let mut file = options.open(path).await?;
    file.write_all(payload.as_bytes()).await?;
    file.flush().await
}
