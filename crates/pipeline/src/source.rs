//! JSON-lines detection source: one `DetectionRecord` object per line.

use common::{DetectionError, DetectionRecord};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

pub type SourceItem = Result<DetectionRecord, DetectionError>;

/// Parse one line; blank lines yield nothing
pub fn parse_line(line: &str) -> Option<SourceItem> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str::<DetectionRecord>(line)
            .map_err(|e| DetectionError::Unparsable(e.to_string())),
    )
}

pub fn parse_str(input: &str) -> Vec<SourceItem> {
    input.lines().filter_map(parse_line).collect()
}

/// Stream a JSON-lines file into `tx`, in file order.
///
/// Returns the number of items sent. Stops early, without error, when the
/// receiving side has gone away.
pub async fn read_jsonl(path: &Path, tx: mpsc::Sender<SourceItem>) -> std::io::Result<u64> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut sent = 0;

    while let Some(line) = lines.next_line().await? {
        let Some(item) = parse_line(&line) else {
            continue;
        };
        if tx.send(item).await.is_err() {
            tracing::debug!(sent, "Detection consumer closed, stopping reader");
            break;
        }
        sent += 1;
    }
    Ok(sent)
}
