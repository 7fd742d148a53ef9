use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::model::*;

use super::conflict::validate_interval;
use super::{IntervalIndex, Store, StoreError, Transaction, WalCommand};

impl Transaction<'_> {
    /// Insert `interval`. Visible to this transaction's queries immediately and to everyone
    /// else after `commit`.
    pub fn add(&mut self, interval: Interval) -> Result<(), StoreError> {
        let Some(write) = self.write.as_mut() else {
            return Err(StoreError::ReadOnly);
        };
        validate_interval(&interval)?;
        if self.index.len() >= write.store.max_intervals {
            return Err(StoreError::LimitExceeded("too many intervals in store"));
        }
        // First add copies the shared snapshot; later ones mutate the private copy.
        Arc::make_mut(&mut self.index).insert(interval.clone())?;
        write.pending.push(interval);
        Ok(())
    }

    /// Persist pending adds as one WAL record, then publish them.
    ///
    /// On failure nothing is published. Read-only and empty transactions commit trivially.
    pub async fn commit(self) -> Result<(), StoreError> {
        let Transaction { index, write } = self;
        let Some(write) = write else {
            return Ok(());
        };
        if write.pending.is_empty() {
            return Ok(());
        }
        let store = write.store;
        let added = write.pending.len();

        let appends = match store
            .wal_append(Event::Committed {
                intervals: write.pending,
            })
            .await
        {
            Ok(n) => n,
            Err(e) => {
                metrics::counter!(crate::observability::COMMITS_TOTAL, "status" => "error")
                    .increment(1);
                warn!("commit of {added} intervals failed: {e}");
                return Err(e);
            }
        };

        store.publish(index.clone()).await;
        metrics::counter!(crate::observability::COMMITS_TOTAL, "status" => "ok").increment(1);
        metrics::counter!(crate::observability::INTERVALS_ADDED_TOTAL).increment(added as u64);
        debug!("committed {added} intervals, {} stored", index.len());

        if store.compact_threshold > 0 && appends >= store.compact_threshold {
            // Still holding the writer lock: the compaction is queued ahead of any later append.
            match store.enqueue_compaction(&index).await {
                Ok(response) => {
                    tokio::spawn(async move {
                        if let Ok(Err(e)) = response.await {
                            error!("background compaction failed: {e}");
                        }
                    });
                }
                Err(e) => warn!("could not schedule compaction: {e}"),
            }
        }
        Ok(())
    }

    /// Discard pending adds.
    pub fn rollback(self) {
        if let Some(write) = &self.write
            && !write.pending.is_empty()
        {
            debug!("rolled back {} intervals", write.pending.len());
        }
    }
}

fn compaction_events(index: &IntervalIndex) -> Vec<Event> {
    if index.is_empty() {
        return Vec::new();
    }
    vec![Event::Committed {
        intervals: index.iter().map(|i| (**i).clone()).collect(),
    }]
}

impl Store {
    async fn enqueue_compaction(
        &self,
        index: &IntervalIndex,
    ) -> Result<oneshot::Receiver<std::io::Result<()>>, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.wal_tx
            .send(WalCommand::Compact {
                events: compaction_events(index),
                response: tx,
            })
            .await
            .map_err(|_| StoreError::StorageFault("WAL writer shut down".into()))?;
        Ok(rx)
    }

    /// Rewrite the WAL as a single record holding the committed snapshot.
    pub async fn compact_wal(&self) -> Result<(), StoreError> {
        // Block writers so no commit lands between the snapshot and the rewrite.
        let _guard = self.writer.lock().await;
        let index = self.snapshot().await;
        let rx = self.enqueue_compaction(&index).await?;
        rx.await
            .map_err(|_| StoreError::StorageFault("WAL writer dropped response".into()))?
            .map_err(|e| StoreError::StorageFault(e.to_string()))
    }
}
