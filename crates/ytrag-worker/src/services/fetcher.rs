use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{info, warn};
use ytrag_core::{DOWNLOAD_TIMEOUT_SECS, METADATA_TIMEOUT_SECS};

use crate::error::{Result, StageError};

/// A single video's metadata as fetched from the channel listing.
#[derive(Debug, Clone)]
pub struct FetchedVideo {
    pub video_id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub duration: Option<i32>,
}

/// The external media fetcher (yt-dlp/ffmpeg). Treated as a black-box
/// collaborator per the Non-goals; this trait is the ambient-stack
/// seam a test double substitutes in unit tests.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch_channel_videos(
        &self,
        channel_url: &str,
        max_videos: u32,
    ) -> Result<Vec<FetchedVideo>>;

    async fn download_audio(&self, video_id: &str) -> Result<String>;
}

pub struct YtDlpFetcher {
    yt_dlp_path: String,
    ffmpeg_path: String,
    audio_dir: std::path::PathBuf,
}

impl YtDlpFetcher {
    pub fn new(yt_dlp_path: String, ffmpeg_path: String, audio_dir: String) -> Self {
        Self {
            yt_dlp_path,
            ffmpeg_path,
            audio_dir: std::path::PathBuf::from(audio_dir),
        }
    }
}

#[derive(Deserialize)]
struct YtDlpEntry {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    live_status: Option<String>,
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    /// Fetches up to `max_videos` entries, over-fetching 3x to account
    /// for upcoming/live/durationless entries being filtered out.
    async fn fetch_channel_videos(
        &self,
        channel_url: &str,
        max_videos: u32,
    ) -> Result<Vec<FetchedVideo>> {
        let fetch_limit = max_videos * 3;

        let output = tokio::time::timeout(
            Duration::from_secs(METADATA_TIMEOUT_SECS * 2),
            Command::new(&self.yt_dlp_path)
                .args([
                    "-v",
                    "--flat-playlist",
                    "--dump-json",
                    "--playlist-end",
                    &fetch_limit.to_string(),
                    channel_url,
                ])
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| StageError::Timeout(METADATA_TIMEOUT_SECS * 2))?
        .map_err(|e| StageError::Subprocess(format!("failed to spawn yt-dlp: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StageError::ExternalService {
                service: "yt-dlp",
                message: stderr.into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut videos = Vec::new();

        for line in stdout.lines() {
            if videos.len() >= max_videos as usize {
                break;
            }
            let Ok(entry) = serde_json::from_str::<YtDlpEntry>(line) else {
                continue;
            };

            if entry.live_status.as_deref() == Some("is_upcoming") {
                info!(video_id = %entry.id, "skipping upcoming video");
                continue;
            }
            if entry.live_status.as_deref() == Some("is_live") {
                info!(video_id = %entry.id, "skipping currently live video");
                continue;
            }
            if entry.duration.is_none() {
                info!(video_id = %entry.id, "skipping video with no duration");
                continue;
            }

            let published_at = entry.upload_date.as_deref().and_then(|d| {
                NaiveDate::parse_from_str(d, "%Y%m%d")
                    .ok()
                    .map(|date| date.and_hms_opt(0, 0, 0).unwrap().and_utc())
            });

            videos.push(FetchedVideo {
                video_id: entry.id,
                title: entry.title,
                description: entry.description,
                published_at,
                duration: entry.duration.map(|d| d as i32),
            });
        }

        info!(count = videos.len(), "fetched valid video metadata entries");
        Ok(videos)
    }

    /// Pipes yt-dlp's audio stream directly into ffmpeg for resampling,
    /// writing through a `_tmp` file first so a crash never leaves a
    /// partial file at the final path.
    async fn download_audio(&self, video_id: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.audio_dir)
            .await
            .map_err(|e| StageError::Subprocess(format!("could not create audio dir: {e}")))?;

        let output_path = self.audio_dir.join(format!("{video_id}.wav"));
        let tmp_path = self.audio_dir.join(format!("{video_id}_tmp.wav"));

        if output_path.exists() {
            return Ok(output_path.to_string_lossy().into_owned());
        }

        let url = format!("https://www.youtube.com/watch?v={video_id}");

        let mut yt_dlp = Command::new(&self.yt_dlp_path)
            .args([&url, "-f", "bestaudio/best", "--no-playlist", "-o", "-", "-q", "--no-warnings"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StageError::Subprocess(format!("failed to spawn yt-dlp: {e}")))?;

        let yt_dlp_stdout = yt_dlp
            .stdout
            .take()
            .ok_or_else(|| StageError::Subprocess("yt-dlp stdout unavailable".into()))?;

        let mut ffmpeg = Command::new(&self.ffmpeg_path)
            .args([
                "-y",
                "-i",
                "pipe:0",
                "-ar",
                "16000",
                "-ac",
                "1",
                "-f",
                "wav",
                tmp_path.to_str().unwrap_or_default(),
            ])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| StageError::Subprocess(format!("failed to spawn ffmpeg: {e}")))?;

        let mut ffmpeg_stdin = ffmpeg
            .stdin
            .take()
            .ok_or_else(|| StageError::Subprocess("ffmpeg stdin unavailable".into()))?;

        let copy_task = tokio::spawn(async move {
            let mut stdout = yt_dlp_stdout;
            let _ = tokio::io::copy(&mut stdout, &mut ffmpeg_stdin).await;
            let _ = ffmpeg_stdin.shutdown().await;
        });

        let ffmpeg_result = tokio::time::timeout(
            Duration::from_secs(DOWNLOAD_TIMEOUT_SECS),
            ffmpeg.wait_with_output(),
        )
        .await;

        let _ = copy_task.await;
        let _ = yt_dlp.wait().await;

        let output = match ffmpeg_result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(StageError::Subprocess(format!("ffmpeg failed: {e}")));
            }
            Err(_) => {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(StageError::Timeout(DOWNLOAD_TIMEOUT_SECS));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(video_id, %stderr, "ffmpeg conversion failed");
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(StageError::ExternalService {
                service: "ffmpeg",
                message: stderr.into_owned(),
            });
        }

        tokio::fs::rename(&tmp_path, &output_path)
            .await
            .map_err(|e| StageError::Subprocess(format!("could not finalize audio file: {e}")))?;

        Ok(output_path.to_string_lossy().into_owned())
    }
}
