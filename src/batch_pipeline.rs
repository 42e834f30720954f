// THEORY:
// The `batch_pipeline` drives the form reader over many scans at once, for
// example a day's worth of order slips dropped into a folder. Each form is
// independent, so forms are spread over a bounded pool of blocking worker
// threads while the caller awaits the results in submission order.
//
// Key architectural principles:
// 1.  **Shared, Stateless Reader**: Every worker uses the same `FormPipeline`
//     behind an `Arc`. The pipeline holds no mutable state, so no locking is needed.
// 2.  **Bounded Parallelism**: A semaphore caps how many forms are decoded at once,
//     which caps memory as well as CPU.
// 3.  **Per-Form Timeout**: A form that takes too long is reported as unreadable on
//     its own; the rest of the batch is unaffected.
// 4.  **Ordered Results**: Results come back in the order the paths were given,
//     whatever order the workers finish in.

use crate::error::OmrError;
use crate::pipeline::{FormPipeline, FormReport};
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Maximum number of forms processed concurrently.
    pub workers: usize,
    /// Time allowed for a single form, decoding included. `None` waits indefinitely.
    pub per_image_timeout: Option<Duration>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: num_cpus::get(),
            per_image_timeout: None,
        }
    }
}

/// The report for one form of a batch.
#[derive(Debug, Clone)]
pub struct BatchItem {
    pub path: PathBuf,
    pub report: FormReport,
}

pub struct BatchPipeline {
    pipeline: Arc<FormPipeline>,
    config: BatchConfig,
    permits: Arc<Semaphore>,
}

impl BatchPipeline {
    pub fn new(pipeline: FormPipeline, config: BatchConfig) -> Self {
        let workers = config.workers.max(1);
        Self {
            pipeline: Arc::new(pipeline),
            config: BatchConfig { workers, ..config },
            permits: Arc::new(Semaphore::new(workers)),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Reads every form, returning one item per path in input order.
    pub async fn process_all<I>(&self, paths: I) -> Vec<BatchItem>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let jobs = paths.into_iter().map(|path| async move {
            let report = self.process_form(path.clone()).await;
            BatchItem { path, report }
        });
        let items = join_all(jobs).await;

        let failed = items.iter().filter(|item| !item.report.is_success()).count();
        tracing::info!(forms = items.len(), failed, "batch finished");
        items
    }

    /// Reads one form on the worker pool.
    pub async fn process_form(&self, path: PathBuf) -> FormReport {
        let permit = match self.permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return Self::unreadable(&path, "worker pool is closed".to_string()),
        };

        let pipeline = Arc::clone(&self.pipeline);
        let job_path = path.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let report = pipeline.generate_report(&job_path);
            drop(permit);
            report
        });

        let joined = match self.config.per_image_timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::warn!(path = %path.display(), ?limit, "form timed out");
                    return Self::unreadable(&path, format!("timed out after {} ms", limit.as_millis()));
                }
            },
            None => handle.await,
        };

        joined.unwrap_or_else(|error| Self::unreadable(&path, format!("worker failed: {error}")))
    }

    fn unreadable(path: &std::path::Path, reason: String) -> FormReport {
        FormReport::from_error(&OmrError::ImageLoad {
            path: path.display().to_string(),
            reason,
        })
    }
}
