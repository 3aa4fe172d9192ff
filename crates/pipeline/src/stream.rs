//! Bounded producer/consumer plumbing around the orchestrator.
//!
//! Detection records may be produced ahead of the consumer, but never more
//! than `capacity` at a time, and the single consumer handles them strictly
//! in arrival order.

use crate::error::PipelineError;
use crate::orchestrator::Orchestrator;
use crate::source::{read_jsonl, SourceItem};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStats {
    pub received: u64,
    pub processed: u64,
    pub skipped: u64,
}

async fn consume(
    orchestrator: &mut Orchestrator,
    mut rx: mpsc::Receiver<SourceItem>,
) -> StreamStats {
    let mut stats = StreamStats::default();
    while let Some(item) = rx.recv().await {
        stats.received += 1;
        match orchestrator.process_item(item).await {
            Ok(_) => stats.processed += 1,
            Err(_) => stats.skipped += 1,
        }
    }
    stats
}

async fn join_producer<T>(producer: JoinHandle<T>) -> Result<T, PipelineError> {
    producer
        .await
        .map_err(|e| PipelineError::Producer(e.to_string()))
}

/// Feed already-available items through a bounded queue
pub async fn run_stream<I>(
    orchestrator: &mut Orchestrator,
    items: I,
    capacity: usize,
) -> Result<StreamStats, PipelineError>
where
    I: IntoIterator<Item = SourceItem> + Send + 'static,
    I::IntoIter: Send,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));

    let producer = tokio::spawn(async move {
        for item in items {
            if tx.send(item).await.is_err() {
                break;
            }
        }
    });

    let stats = consume(orchestrator, rx).await;
    join_producer(producer).await?;
    Ok(stats)
}

/// Read a JSON-lines file on a producer task and process it as it arrives
pub async fn run_jsonl(
    orchestrator: &mut Orchestrator,
    path: PathBuf,
    capacity: usize,
) -> Result<StreamStats, PipelineError> {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let producer = tokio::spawn(async move { read_jsonl(&path, tx).await });

    let stats = consume(orchestrator, rx).await;
    let sent = join_producer(producer).await??;
    tracing::debug!(sent, received = stats.received, "Detection stream drained");
    Ok(stats)
}
