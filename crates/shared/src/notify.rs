//! Stage-waiting notification fan-out.
//!
//! After a commit advances one or more budget items, the workflow enqueues a
//! `StageWaiting` event here. Events are coalesced for a short window so rapid
//! successive commits produce one notification per department, then handed to
//! the email collaborator. Delivery failures never propagate to the caller.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;

use crate::email::EmailError;

/// Coalescing window for rapid successive commits.
const DEBOUNCE: Duration = Duration::from_secs(1);

/// A single post-commit notification event.
#[derive(Debug, Clone)]
pub enum StageWaiting {
    /// Items in these budgets advanced to a new owning department.
    Budgets {
        /// Budget ids touched by the commit.
        budget_ids: Vec<i64>,
    },
    /// Needed-stage decisions, with per-item hints so the collaborator may
    /// restrict recipients to the accounts of interest.
    NeededItems {
        /// Hints for recipient restriction.
        items: Vec<StageItemHint>,
    },
}

/// Per-item hint attached to needed-stage notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageItemHint {
    /// The decided item.
    pub item_id: i64,
    /// Stage the decision was made at.
    pub source_stage: String,
}

/// A coalesced batch handed to the sink.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageWaitingBatch {
    /// Deduplicated budget ids, ascending.
    pub budget_ids: Vec<i64>,
    /// Accumulated needed-stage hints.
    pub item_hints: Vec<StageItemHint>,
}

impl StageWaitingBatch {
    /// Returns true if the batch carries nothing to deliver.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.budget_ids.is_empty() && self.item_hints.is_empty()
    }
}

/// Destination for coalesced stage-waiting batches (the email collaborator).
pub trait StageWaitingSink: Send + Sync + 'static {
    /// Delivers one coalesced batch.
    fn deliver(
        &self,
        batch: StageWaitingBatch,
    ) -> Pin<Box<dyn Future<Output = Result<(), EmailError>> + Send + '_>>;
}

/// Handle used by repositories to enqueue post-commit notifications.
///
/// Cloning is cheap; dropping every clone drains the worker and stops it.
#[derive(Clone)]
pub struct StageNotifier {
    tx: mpsc::UnboundedSender<StageWaiting>,
}

impl StageNotifier {
    /// Spawns the coalescing worker and returns the enqueue handle.
    #[must_use]
    pub fn spawn<S: StageWaitingSink>(sink: Arc<S>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(rx, sink));
        Self { tx }
    }

    /// Enqueues a notification event.
    ///
    /// Never fails from the caller's point of view; a stopped worker is
    /// logged as a degraded side effect.
    pub fn enqueue(&self, event: StageWaiting) {
        if self.tx.send(event).is_err() {
            warn!("stage notifier worker is gone; notification dropped");
        }
    }
}

async fn run_worker<S: StageWaitingSink>(
    mut rx: mpsc::UnboundedReceiver<StageWaiting>,
    sink: Arc<S>,
) {
    while let Some(first) = rx.recv().await {
        let mut budget_ids = BTreeSet::new();
        let mut item_hints = Vec::new();
        merge(&mut budget_ids, &mut item_hints, first);

        // Coalesce everything that arrives within the debounce window.
        let deadline = tokio::time::Instant::now() + DEBOUNCE;
        loop {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(event)) => merge(&mut budget_ids, &mut item_hints, event),
                Ok(None) | Err(_) => break,
            }
        }

        let batch = StageWaitingBatch {
            budget_ids: budget_ids.into_iter().collect(),
            item_hints,
        };
        if batch.is_empty() {
            continue;
        }

        if let Err(e) = sink.deliver(batch).await {
            warn!(error = %e, "stage-waiting notification delivery failed");
        }
    }
}

fn merge(budget_ids: &mut BTreeSet<i64>, item_hints: &mut Vec<StageItemHint>, event: StageWaiting) {
    match event {
        StageWaiting::Budgets { budget_ids: ids } => budget_ids.extend(ids),
        StageWaiting::NeededItems { items } => item_hints.extend(items),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    struct RecordingSink {
        batches: Mutex<Vec<StageWaitingBatch>>,
    }

    impl StageWaitingSink for RecordingSink {
        fn deliver(
            &self,
            batch: StageWaitingBatch,
        ) -> Pin<Box<dyn Future<Output = Result<(), EmailError>> + Send + '_>> {
            Box::pin(async move {
                self.batches.lock().await.push(batch);
                Ok(())
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_events_coalesce_into_one_batch() {
        let sink = Arc::new(RecordingSink {
            batches: Mutex::new(Vec::new()),
        });
        let notifier = StageNotifier::spawn(Arc::clone(&sink));

        notifier.enqueue(StageWaiting::Budgets {
            budget_ids: vec![2, 1],
        });
        notifier.enqueue(StageWaiting::Budgets {
            budget_ids: vec![2, 3],
        });
        notifier.enqueue(StageWaiting::NeededItems {
            items: vec![StageItemHint {
                item_id: 10,
                source_stage: "needed".to_string(),
            }],
        });

        tokio::time::sleep(Duration::from_secs(2)).await;

        let batches = sink.batches.lock().await;
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].budget_ids, vec![1, 2, 3]);
        assert_eq!(batches[0].item_hints.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_windows_produce_separate_batches() {
        let sink = Arc::new(RecordingSink {
            batches: Mutex::new(Vec::new()),
        });
        let notifier = StageNotifier::spawn(Arc::clone(&sink));

        notifier.enqueue(StageWaiting::Budgets { budget_ids: vec![1] });
        tokio::time::sleep(Duration::from_secs(2)).await;

        notifier.enqueue(StageWaiting::Budgets { budget_ids: vec![2] });
        tokio::time::sleep(Duration::from_secs(2)).await;

        let batches = sink.batches.lock().await;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].budget_ids, vec![1]);
        assert_eq!(batches[1].budget_ids, vec![2]);
    }
}
