//! Batch updater: sequential, fixed-size, no retry, no rollback

use crate::error::{BasediffError, Result};
use crate::model::PendingUpdate;
use crate::store::BaseStore;

/// Outcome of a fully successful batch run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
    pub batches: usize,
    pub records: usize,
}

/// Write `updates` in consecutive chunks of at most `batch_size`, one host call
/// per chunk, each issued only after the previous one returned.
///
/// The first failing chunk aborts the run. Chunks written before it stay
/// written; the error reports how many records that was.
pub async fn apply_updates(
    store: &dyn BaseStore,
    table_id: &str,
    updates: &[PendingUpdate],
    batch_size: usize,
    progress_callback: Option<&dyn Fn(u64, u64, &str)>,
) -> Result<BatchSummary> {
    if batch_size == 0 {
        return Err(BasediffError::config("batch size must be greater than zero"));
    }

    let total = updates.len().div_ceil(batch_size);
    let mut committed = 0usize;

    for (index, batch) in updates.chunks(batch_size).enumerate() {
        if let Err(source) = store.apply_record_updates(table_id, batch).await {
            log::error!(
                "❌ Batch {} of {total} failed after {committed} records were written: {source:#}",
                index + 1
            );
            return Err(BasediffError::BatchWrite {
                batch: index + 1,
                total,
                committed,
                source,
            });
        }
        committed += batch.len();
        log::debug!("Wrote batch {} of {total} ({} records)", index + 1, batch.len());

        if let Some(callback) = progress_callback {
            callback(committed as u64, updates.len() as u64, "Writing updates...");
        }
    }

    Ok(BatchSummary {
        batches: total,
        records: committed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{pending_updates, MemoryStore, TableFixture};

    #[tokio::test]
    async fn test_chunks_preserve_order_and_sizes() {
        let store = MemoryStore::new(vec![TableFixture::with_text_records("tbl1", 123)]);
        let updates = pending_updates(123, "fld_out");

        let summary = apply_updates(&store, "tbl1", &updates, 50, None).await.unwrap();

        assert_eq!(summary, BatchSummary { batches: 3, records: 123 });
        let batches = store.update_batches();
        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![50, 50, 23]);
        assert_eq!(batches[1][0].record_id, "rec50");
        assert_eq!(batches[2][22].record_id, "rec122");
    }

    #[tokio::test]
    async fn test_failure_stops_later_batches() {
        let store = MemoryStore::new(vec![TableFixture::with_text_records("tbl1", 123)]);
        store.fail_update_call(2);
        let updates = pending_updates(123, "fld_out");

        let err = apply_updates(&store, "tbl1", &updates, 50, None).await.unwrap_err();

        match err {
            BasediffError::BatchWrite { batch, total, committed, .. } => {
                assert_eq!((batch, total, committed), (2, 3, 50));
            }
            other => panic!("unexpected error: {other}"),
        }
        // Attempted: first (applied) and second (rejected); third never issued
        assert_eq!(store.update_calls(), 2);
        assert_eq!(store.update_batches().len(), 1);
        let written = store.record("tbl1", "rec0").unwrap();
        assert!(written.fields.contains_key("fld_out"));
        assert!(!store.record("tbl1", "rec60").unwrap().fields.contains_key("fld_out"));
    }

    #[tokio::test]
    async fn test_no_updates_means_no_calls() {
        let store = MemoryStore::new(vec![TableFixture::with_text_records("tbl1", 0)]);
        let summary = apply_updates(&store, "tbl1", &[], 50, None).await.unwrap();
        assert_eq!(summary, BatchSummary { batches: 0, records: 0 });
        assert_eq!(store.update_calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_batch_size_is_rejected() {
        let store = MemoryStore::new(vec![]);
        let updates = pending_updates(1, "fld_out");
        let err = apply_updates(&store, "tbl1", &updates, 0, None).await.unwrap_err();
        assert!(matches!(err, BasediffError::Config(_)));
    }
}
