//! Fan-out of the augmentation loop across many dbids.
//!
//! dbids share nothing but the read-only loop configuration, so they run as
//! independent tasks with bounded concurrency. A dbid whose loop errors or
//! panics still gets a failed result, keeping the last generated code when
//! the loop got that far.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use super::engine::AugmentationLoop;
use super::result::{AugmentationResult, AugmentationResults, TargetDatabase};
use crate::metrics::METRICS;

/// Run every target and collect exactly one result per dbid.
pub async fn augment_all(
    engine: Arc<AugmentationLoop>,
    targets: Vec<TargetDatabase>,
    concurrency: usize,
) -> AugmentationResults {
    let total = targets.len();
    let batch_id = Uuid::new_v4();
    let span = info_span!("synthdb.batch", batch_id = %batch_id);
    info!(parent: &span, total, concurrency, "batch augmentation started");

    let results: AugmentationResults = stream::iter(targets)
        .map(|target| {
            let engine = Arc::clone(&engine);
            async move {
                let dbid = target.dbid.clone();
                let handle = tokio::spawn(async move { engine.run(&target).await });
                let result = match handle.await {
                    Ok(Ok(report)) => report.result,
                    Ok(Err(e)) => {
                        error!(dbid = %dbid, error = %e, "augmentation aborted");
                        METRICS.record_augment_outcome(false);
                        AugmentationResult::failed(e.last_code().unwrap_or_default())
                    }
                    Err(e) => {
                        error!(dbid = %dbid, error = %e, "augmentation task failed");
                        METRICS.record_augment_outcome(false);
                        AugmentationResult::failed(String::new())
                    }
                };
                (dbid, result)
            }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .instrument(span.clone())
        .await;

    let succeeded = results.values().filter(|r| r.success).count();
    info!(
        parent: &span,
        total,
        succeeded,
        failed = total - succeeded,
        "batch augmentation finished"
    );
    results
}
