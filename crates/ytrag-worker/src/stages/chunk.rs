use tracing::{info, warn};
use ytrag_core::llm::{ChatTurn, LlmClient, Role};
use ytrag_db::models::{PackedChunk, Segment};
use ytrag_db::{ChunkRepo, SegmentRepo};

use crate::error::Result;

const TARGET_TOKENS: usize = 512;
const OVERLAP_TOKENS: usize = 100;
const AVG_CHARS_PER_TOKEN: usize = 4;
const RESIDUAL_TOKEN_THRESHOLD: usize = 50;

fn estimate_tokens(char_len: usize) -> usize {
    char_len.div_ceil(AVG_CHARS_PER_TOKEN)
}

fn join_window(window: &[&Segment]) -> (f64, f64, String) {
    let start_time = window.first().map(|s| s.start_time).unwrap_or(0.0);
    let end_time = window.last().map(|s| s.end_time).unwrap_or(0.0);
    let text = window.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ");
    (start_time, end_time, text)
}

/// Packs segments into token-bounded, overlapping windows. Pure and
/// deterministic; the `+ 1` per segment covers the joining space.
pub fn pack_segments(segments: &[Segment]) -> Vec<(f64, f64, String)> {
    let mut windows = Vec::new();
    let mut window: Vec<&Segment> = Vec::new();
    let mut char_len = 0usize;

    for segment in segments {
        if segment.text.trim().is_empty() {
            continue;
        }
        window.push(segment);
        char_len += segment.text.len() + 1;

        if estimate_tokens(char_len) >= TARGET_TOKENS {
            windows.push(join_window(&window));

            while window.len() > 1 && char_len > OVERLAP_TOKENS * AVG_CHARS_PER_TOKEN {
                let removed = window.remove(0);
                char_len -= removed.text.len() + 1;
            }
        }
    }

    if !window.is_empty() && estimate_tokens(char_len) > RESIDUAL_TOKEN_THRESHOLD {
        windows.push(join_window(&window));
    }

    windows
}

const SUMMARY_SYSTEM_PROMPT: &str =
    "Summarize the following transcript excerpt in exactly one sentence, in Spanish.";

async fn summarize(llm: &dyn LlmClient, text: &str) -> Option<String> {
    let turns = [ChatTurn {
        role: Role::User,
        content: text.to_string(),
    }];
    match llm.complete(SUMMARY_SYSTEM_PROMPT, &turns, 0.2).await {
        Ok(summary) => Some(summary.trim().to_string()),
        Err(e) => {
            warn!(error = %e, "chunk summary failed, leaving chunk unsummarized");
            None
        }
    }
}

/// Chunks one video's segments, summarizes each chunk, and persists the
/// result idempotently by replacing the video's prior chunk set.
pub async fn chunk_video(
    chunk_repo: &ChunkRepo,
    segment_repo: &SegmentRepo,
    llm: &dyn LlmClient,
    video_id: &str,
) -> Result<usize> {
    let segments = segment_repo.list_by_video(video_id).await?;
    let windows = pack_segments(&segments);

    let mut packed = Vec::with_capacity(windows.len());
    for (start_time, end_time, text) in windows {
        let summary = summarize(llm, &text).await;
        packed.push(PackedChunk {
            start_time,
            end_time,
            text,
            summary,
        });
    }

    let count = packed.len();
    chunk_repo.replace_all(video_id, &packed).await?;

    info!(video_id, count, "chunked video");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(id: i64, start: f64, end: f64, text: &str) -> Segment {
        Segment {
            id,
            video_id: "v1".to_string(),
            start_time: start,
            end_time: end,
            text: text.to_string(),
        }
    }

    #[test]
    fn empty_segments_produce_no_chunks() {
        assert!(pack_segments(&[]).is_empty());
    }

    #[test]
    fn skips_empty_text_segments() {
        let segments = vec![seg(1, 0.0, 1.0, ""), seg(2, 1.0, 2.0, "   ")];
        assert!(pack_segments(&segments).is_empty());
    }

    #[test]
    fn small_transcript_yields_single_residual_chunk() {
        let text = "word ".repeat(60);
        let segments = vec![seg(1, 0.0, 10.0, text.trim())];
        let chunks = pack_segments(&segments);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].0, 0.0);
        assert_eq!(chunks[0].1, 10.0);
    }

    #[test]
    fn tiny_residual_below_threshold_is_dropped() {
        let segments = vec![seg(1, 0.0, 1.0, "hi")];
        assert!(pack_segments(&segments).is_empty());
    }

    #[test]
    fn long_transcript_slides_with_overlap() {
        let text = "x".repeat(160);
        let segments: Vec<Segment> = (0..60)
            .map(|i| seg(i, i as f64, i as f64 + 1.0, &text))
            .collect();
        let chunks = pack_segments(&segments);
        assert!(chunks.len() >= 2, "expected at least two chunks, got {}", chunks.len());

        for window in chunks.windows(2) {
            assert!(window[1].0 >= window[0].0);
        }
    }
}
