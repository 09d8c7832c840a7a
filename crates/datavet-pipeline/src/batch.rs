//! Concurrent runs
//!
//! Every request becomes an independent run on the blocking pool; a
//! semaphore bounds how many execute at once. Runs share the coordinator's
//! configuration and schema cache and nothing else.

use crate::context::RunRequest;
use crate::coordinator::{Coordinator, RunOutcome};
use crate::{Error, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Result of one request in a batch
#[derive(Debug)]
pub struct BatchItem {
    /// Position of the request in the batch
    pub position: usize,
    pub request: RunRequest,
    pub result: Result<RunOutcome>,
}

impl BatchItem {
    /// Exit code of this item; failures to produce a report count as critical
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.result.as_ref().map_or(2, RunOutcome::exit_code)
    }
}

/// Run every request, at most `max_concurrency` at a time
///
/// Items come back in request order.
pub async fn run_batch(
    coordinator: Coordinator,
    requests: Vec<RunRequest>,
    max_concurrency: usize,
) -> Vec<BatchItem> {
    let coordinator = Arc::new(coordinator);
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));
    let mut handles = Vec::with_capacity(requests.len());

    for (position, request) in requests.into_iter().enumerate() {
        let coordinator = Arc::clone(&coordinator);
        let semaphore = Arc::clone(&semaphore);
        let task_request = request.clone();
        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| Error::pipeline("batch", "", format!("Semaphore error: {e}")))?;
            debug!("Starting batch item {}", position);
            tokio::task::spawn_blocking(move || coordinator.run(&task_request))
                .await
                .map_err(|e| Error::pipeline("batch", "", format!("Run task failed: {e}")))?
        });
        handles.push((position, request, handle));
    }

    let mut items = Vec::with_capacity(handles.len());
    for (position, request, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::pipeline(
                "batch",
                request.data_path.display().to_string(),
                format!("Run task failed: {e}"),
            )),
        };
        if let Err(e) = &result {
            warn!("Batch item {} failed: {}", position, e);
        }
        items.push(BatchItem {
            position,
            request,
            result,
        });
    }
    items
}

/// Worst exit code of a batch, 0 when empty
#[must_use]
pub fn worst_exit_code(items: &[BatchItem]) -> i32 {
    items.iter().map(BatchItem::exit_code).max().unwrap_or(0)
}
