use std::future::Future;
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::error::TaskFailure;

pub type Slot<R> = Result<R, TaskFailure>;

/// Runs `worker` over every item with at most `limit` running at once.
///
/// A permit is taken before each task is spawned, so the number of live
/// tasks never exceeds `limit` and a finishing task admits the next item.
/// The returned vector is indexed like `items`. A panicking worker only
/// fails its own slot; once `cancel` fires, in-flight workers are dropped
/// and unadmitted items are reported as [`TaskFailure::Cancelled`].
pub async fn run_bounded<T, R, F, Fut>(
    items: Vec<T>,
    limit: usize,
    cancel: &CancellationToken,
    worker: F,
) -> Vec<Slot<R>>
where
    T: Send + 'static,
    R: Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    let total = items.len();
    let semaphore = Arc::new(Semaphore::new(limit.max(1)));
    let worker = Arc::new(worker);
    let mut tasks = FuturesUnordered::new();

    for (index, item) in items.into_iter().enumerate() {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(p) => p,
                Err(_) => break,
            },
        };

        let worker = Arc::clone(&worker);
        let cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let _permit = permit;
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(TaskFailure::Cancelled),
                output = (*worker)(item) => Ok(output),
            }
        });
        tasks.push(join_slot(index, handle));
    }

    let mut slots: Vec<Option<Slot<R>>> = (0..total).map(|_| None).collect();
    while let Some((index, slot)) = tasks.next().await {
        slots[index] = Some(slot);
    }

    slots
        .into_iter()
        .map(|slot| slot.unwrap_or(Err(TaskFailure::Cancelled)))
        .collect()
}

async fn join_slot<R>(index: usize, handle: JoinHandle<Slot<R>>) -> (usize, Slot<R>) {
    match handle.await {
        Ok(slot) => (index, slot),
        Err(e) if e.is_panic() => {
            error!(index, "task panicked: {:?}", e);
            (index, Err(TaskFailure::Panicked(e.to_string())))
        }
        Err(e) => {
            error!(index, "task failed: {:?}", e);
            (index, Err(TaskFailure::Cancelled))
        }
    }
}
