//! Newline-delimited JSON chain-event feed.

use chain::ChainEvent;
use projections::ChainSyncProcessor;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{IndexerError, Result};

/// Applies every event read from `reader`, one JSON object per line, and
/// returns how many were applied.
///
/// Blank lines are ignored. The first malformed line or projection failure
/// stops the feed; events before it stay applied.
#[tracing::instrument(skip_all)]
pub async fn run<R>(reader: R, processor: &ChainSyncProcessor) -> Result<u64>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_number: u64 = 0;
    let mut applied: u64 = 0;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;
        if line.trim().is_empty() {
            continue;
        }

        let event: ChainEvent =
            serde_json::from_str(&line).map_err(|source| IndexerError::Parse {
                line: line_number,
                source,
            })?;
        processor.handle(&event).await?;
        applied += 1;
        metrics::counter!("indexer_events_applied").increment(1);
    }

    tracing::info!(events = applied, "feed exhausted");
    Ok(applied)
}
