use tracing::info;
use ytrag_db::{SegmentRepo, VideoRepo};

use crate::error::{Result, StageError};
use crate::services::SpeechToText;

/// Transcribes one downloaded video and persists its segments. A
/// missing audio file is a per-video failure, not a task-level one —
/// the caller (the worker's per-video loop) is responsible for catching
/// this and recording the video as failed without aborting the run.
pub async fn transcribe_video(
    segments: &SegmentRepo,
    videos: &VideoRepo,
    stt: &dyn SpeechToText,
    video_id: &str,
    language: &str,
) -> Result<()> {
    let video = videos.get(video_id).await?;

    let audio_path = video
        .audio_path
        .ok_or_else(|| StageError::NotFound(format!("video {video_id} has no audio_path")))?;

    if !video.downloaded {
        return Err(StageError::NotFound(format!("video {video_id} is not marked downloaded")));
    }

    let raw_segments = stt.transcribe(&audio_path, language).await?;

    // Segments and the transcribed flag must land together: a crash
    // between the two writes would otherwise leave segments committed
    // with transcribed still false.
    let mut tx = segments.pool().begin().await.map_err(ytrag_db::DbError::from)?;
    SegmentRepo::replace_all_in_tx(&mut tx, video_id, &raw_segments).await?;
    VideoRepo::mark_transcribed_in_tx(&mut tx, video_id).await?;
    tx.commit().await.map_err(ytrag_db::DbError::from)?;

    info!(video_id, count = raw_segments.len(), "transcribed video");
    Ok(())
}
