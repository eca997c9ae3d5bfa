//! Replay of recorded per-frame observations.
//!
//! Input is JSON Lines, one [`FrameObservations`] per line. Blank lines are
//! ignored and malformed lines are skipped with a warning; the frame counter
//! only advances for frames that parse.

use crate::pipeline::ThreatPipeline;
use anyhow::{Context, Result};
use common::FrameObservations;
use serde::Serialize;
use std::path::Path;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub frames: u64,
    pub ticks: u64,
    pub malformed_lines: u64,
    pub rejected_boxes: u64,
    pub sink_failures: u64,
    /// Stopped by the cancellation token before the input ended
    pub cancelled: bool,
}

pub async fn replay_file(
    path: impl AsRef<Path>,
    pipeline: &mut ThreatPipeline,
    cancel: &CancellationToken,
) -> Result<ReplaySummary> {
    let path = path.as_ref();
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;

    info!(path = %path.display(), "replaying observations");
    replay(BufReader::new(file), pipeline, cancel).await
}

pub async fn replay<R>(
    reader: R,
    pipeline: &mut ThreatPipeline,
    cancel: &CancellationToken,
) -> Result<ReplaySummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = ReplaySummary::default();
    let mut lines = reader.lines();
    let mut line_number = 0u64;

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                summary.cancelled = true;
                break;
            }
            line = lines.next_line() => line.context("failed to read observations")?,
        };
        let Some(line) = line else {
            break;
        };
        line_number += 1;

        if line.trim().is_empty() {
            continue;
        }

        let frame: FrameObservations = match serde_json::from_str(&line) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(line = line_number, error = %e, "skipping malformed observation line");
                summary.malformed_lines += 1;
                continue;
            }
        };

        let outcome = pipeline.process_frame(&frame).await?;
        summary.frames += 1;
        summary.rejected_boxes += outcome.ingest.rejected as u64;
        summary.sink_failures += outcome.sink_failures.len() as u64;
        if outcome.report.is_some() {
            summary.ticks += 1;
        }
    }

    // reports still queued for the sinks are written before the summary is final
    summary.sink_failures += pipeline.flush_reports().await.len() as u64;

    info!(
        frames = summary.frames,
        ticks = summary.ticks,
        malformed = summary.malformed_lines,
        sink_failures = summary.sink_failures,
        cancelled = summary.cancelled,
        "replay finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThreatEngineConfig;
    use crate::sink::{MemorySink, SinkSet};
    use std::sync::Arc;

    fn pipeline(frames_per_tick: u64) -> (ThreatPipeline, Arc<MemorySink>) {
        let memory = Arc::new(MemorySink::new(64));
        let config = ThreatEngineConfig {
            frames_per_tick,
            ..Default::default()
        };
        (
            ThreatPipeline::new(config, SinkSet::new().with(memory.clone())).unwrap(),
            memory,
        )
    }

    const LINE: &str = r#"{"timestamp":1700000000000,"width":640,"height":480,"tracks":[{"track_id":1,"bbox":{"x":10,"y":10,"width":40,"height":90},"gesture":"POINTING"}]}"#;

    #[tokio::test]
    async fn test_replay_counts_frames_and_ticks() {
        let (mut pipeline, memory) = pipeline(2);
        let input = format!("{LINE}\n\n{{broken\n{LINE}\n{LINE}\n");

        let summary = replay(input.as_bytes(), &mut pipeline, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.frames, 3);
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.malformed_lines, 1);
        assert!(!summary.cancelled);
        assert_eq!(memory.incidents().await.len(), 1);
        assert_eq!(
            memory.incidents().await[0].gesture,
            common::Gesture::Pointing
        );
    }

    #[tokio::test]
    async fn test_cancelled_replay_stops() {
        let (mut pipeline, _) = pipeline(30);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = replay(LINE.as_bytes(), &mut pipeline, &cancel).await.unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.frames, 0);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (mut pipeline, _) = pipeline(30);
        let result = replay_file(
            "/nonexistent/observations.jsonl",
            &mut pipeline,
            &CancellationToken::new(),
        )
        .await;
        assert!(result.is_err());
    }
}
