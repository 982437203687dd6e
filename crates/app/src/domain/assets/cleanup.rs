//! Best-effort removal of superseded objects.

use futures::future::join_all;
use tracing::{debug, warn};

use crate::domain::assets::{errors::AssetStoreError, models::AssetKey, store::AssetStore};

/// Outcome of a cleanup fan-out. Only ever logged, never surfaced to callers.
#[derive(Debug, Default)]
pub struct CleanupReport {
    pub attempted: usize,
    pub failed: Vec<AssetStoreError>,
}

impl CleanupReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.attempted - self.failed.len()
    }
}

/// Delete every key concurrently, waiting for all attempts to finish.
///
/// A failing or slow delete never prevents the others from being attempted.
pub async fn delete_best_effort<I>(store: &dyn AssetStore, keys: I) -> CleanupReport
where
    I: IntoIterator<Item = AssetKey>,
{
    let results = join_all(keys.into_iter().map(|key| store.delete(key))).await;

    let attempted = results.len();
    let failed: Vec<AssetStoreError> = results.into_iter().filter_map(Result::err).collect();

    for error in &failed {
        warn!(key = %error.key(), error = ?error, "asset cleanup failed, object left orphaned");
    }

    let report = CleanupReport { attempted, failed };

    if report.attempted > 0 {
        debug!(
            attempted = report.attempted,
            succeeded = report.succeeded(),
            "asset cleanup finished"
        );
    }

    report
}
