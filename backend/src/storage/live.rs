//! Live queries: long-lived subscriptions that re-run their SQL whenever
//! a relevant table changes and deliver the full new result list.
//!
//! Consumers must treat every emission as an authoritative replacement of
//! the previous results, never a delta. Dropping the `LiveQuery` tears the
//! subscription down; nothing is delivered after that.

use anyhow::{bail, Result};
use std::future::Future;
use std::pin::Pin;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use super::events::Table;

pub type QueryFuture<T> = Pin<Box<dyn Future<Output = Result<Vec<T>>> + Send>>;

type QueryFn<T> = Box<dyn Fn() -> QueryFuture<T> + Send + Sync>;

/// A re-runnable query bound to the tables its SQL reads.
pub struct LiveQuery<T> {
    rx: broadcast::Receiver<Table>,
    tables: &'static [Table],
    query: QueryFn<T>,
}

impl<T> LiveQuery<T> {
    pub(crate) fn new<F>(
        rx: broadcast::Receiver<Table>,
        tables: &'static [Table],
        query: F,
    ) -> Self
    where
        F: Fn() -> QueryFuture<T> + Send + Sync + 'static,
    {
        Self {
            rx,
            tables,
            query: Box::new(query),
        }
    }

    /// Run the query once and return the current results.
    pub async fn snapshot(&self) -> Result<Vec<T>> {
        (self.query)().await
    }

    /// Wait until a write touches one of this query's tables, then re-run
    /// and return the full new result list. Notifications queued behind
    /// the first relevant one are drained before the requery, so a burst
    /// of writes costs one recomputation, not one per write.
    pub async fn changed(&mut self) -> Result<Vec<T>> {
        loop {
            match self.rx.recv().await {
                Ok(table) if self.is_relevant(table) => {
                    self.drain_pending();
                    return self.snapshot().await;
                }
                Ok(_) => continue,
                // Missed notifications; the snapshot is authoritative
                // regardless of what they were
                Err(RecvError::Lagged(_)) => {
                    self.drain_pending();
                    return self.snapshot().await;
                }
                Err(RecvError::Closed) => bail!("change notifier closed"),
            }
        }
    }

    fn is_relevant(&self, table: Table) -> bool {
        self.tables.contains(&table)
    }

    fn drain_pending(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(_) => continue,
                Err(TryRecvError::Lagged(_)) => continue,
                Err(_) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::events::ChangeNotifier;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::timeout;

    fn counting_query(runs: Arc<AtomicUsize>) -> impl Fn() -> QueryFuture<usize> + Send + Sync {
        move || {
            let runs = runs.clone();
            Box::pin(async move {
                let n = runs.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(vec![n])
            })
        }
    }

    #[tokio::test]
    async fn test_changed_reruns_on_relevant_write() {
        let notifier = ChangeNotifier::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let mut live = LiveQuery::new(
            notifier.subscribe(),
            &[Table::Cobros],
            counting_query(runs.clone()),
        );

        notifier.publish(Table::Cobros);
        let result = timeout(Duration::from_secs(1), live.changed())
            .await
            .expect("changed() should fire")
            .unwrap();
        assert_eq!(result, vec![1]);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_irrelevant_writes_are_skipped() {
        let notifier = ChangeNotifier::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let mut live = LiveQuery::new(
            notifier.subscribe(),
            &[Table::Comerciantes],
            counting_query(runs.clone()),
        );

        notifier.publish(Table::Usuarios);
        notifier.publish(Table::Cobros);
        notifier.publish(Table::Comerciantes);

        timeout(Duration::from_secs(1), live.changed())
            .await
            .expect("changed() should fire")
            .unwrap();
        // Only the comerciantes write triggered a requery
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_burst_of_writes_coalesces_into_one_requery() {
        let notifier = ChangeNotifier::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let mut live = LiveQuery::new(
            notifier.subscribe(),
            &[Table::Puestos],
            counting_query(runs.clone()),
        );

        for _ in 0..5 {
            notifier.publish(Table::Puestos);
        }

        timeout(Duration::from_secs(1), live.changed())
            .await
            .expect("changed() should fire")
            .unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        // All five notifications were consumed by the first changed();
        // with no further writes a second changed() stays pending
        let second = timeout(Duration::from_millis(50), live.changed()).await;
        assert!(second.is_err(), "no pending notification should remain");
    }
}
