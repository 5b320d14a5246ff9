use tracing::{info, warn};
use ytrag_db::{ChannelRepo, VideoRepo};

use crate::error::Result;
use crate::services::MediaFetcher;

pub struct IngestResult {
    pub channel_id: i64,
    pub new_video_ids: Vec<String>,
    pub videos_fetched: usize,
    pub videos_downloaded: usize,
    pub videos_failed: usize,
}

/// Registers the channel, fetches its video list, registers any videos
/// not already known, and optionally downloads audio for the new ones.
pub async fn ingest_channel(
    channels: &ChannelRepo,
    videos: &VideoRepo,
    fetcher: &dyn MediaFetcher,
    channel_url: &str,
    max_videos: u32,
    download: bool,
) -> Result<IngestResult> {
    let channel_name = channel_url
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(channel_url)
        .to_string();
    let channel = channels.get_or_create(&channel_name, channel_url).await?;

    let fetched = fetcher.fetch_channel_videos(channel_url, max_videos).await?;
    let videos_fetched = fetched.len();

    let mut new_video_ids = Vec::new();
    for video in &fetched {
        let registered = videos
            .register_if_new(
                &video.video_id,
                channel.id,
                video.title.as_deref(),
                video.description.as_deref(),
                video.published_at,
                video.duration,
            )
            .await?;
        if registered.is_some() {
            new_video_ids.push(video.video_id.clone());
        }
    }

    info!(channel_id = channel.id, count = new_video_ids.len(), "registered videos");

    let mut downloaded = 0usize;
    let mut failed = 0usize;

    if download {
        for video_id in &new_video_ids {
            match fetcher.download_audio(video_id).await {
                Ok(path) => {
                    videos.mark_downloaded(video_id, &path).await?;
                    downloaded += 1;
                }
                Err(e) => {
                    warn!(video_id, error = %e, "audio download failed");
                    failed += 1;
                }
            }
        }
    }

    Ok(IngestResult {
        channel_id: channel.id,
        new_video_ids,
        videos_fetched,
        videos_downloaded: downloaded,
        videos_failed: failed,
    })
}
