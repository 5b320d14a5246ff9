use pgvector::Vector;
use tracing::{info, warn};
use ytrag_db::models::Chunk;
use ytrag_db::ChunkRepo;

use crate::error::Result;
use crate::services::encoder::l2_normalize;
use crate::services::SentenceEncoder;

/// Runs the embed stage until a batch returns nothing left to do,
/// optionally restricted to `video_ids`. The total logged against is a
/// snapshot taken once at the start — an accepted undercount if new
/// chunks appear mid-run. Returns the number of chunks embedded.
pub async fn embed_pending(
    chunks: &ChunkRepo,
    encoder: &dyn SentenceEncoder,
    video_ids: Option<&[String]>,
    batch_size: i64,
) -> Result<usize> {
    let total = chunks.count_pending_embeddings(video_ids).await?;
    info!(total, "embed stage starting");

    let mut processed = 0usize;
    loop {
        let batch = chunks.pending_embeddings(video_ids, batch_size).await?;
        if batch.is_empty() {
            break;
        }

        match embed_batch(chunks, encoder, &batch).await {
            Ok(n) => {
                processed += n;
                info!(processed, total, "embed batch committed");
            }
            Err(e) => {
                warn!(error = %e, "embed batch failed, stopping embed stage");
                break;
            }
        }
    }

    Ok(processed)
}

async fn embed_batch(chunks: &ChunkRepo, encoder: &dyn SentenceEncoder, batch: &[Chunk]) -> Result<usize> {
    let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
    let summaries: Vec<String> = batch.iter().map(|c| c.summary.clone().unwrap_or_default()).collect();

    let mut text_embeddings = encoder.encode_batch(&texts).await?;
    let mut summary_embeddings = encoder.encode_batch(&summaries).await?;

    for v in text_embeddings.iter_mut() {
        l2_normalize(v);
    }
    for v in summary_embeddings.iter_mut() {
        l2_normalize(v);
    }

    let updates: Vec<(i64, Vector, Option<Vector>)> = batch
        .iter()
        .zip(text_embeddings)
        .zip(summary_embeddings)
        .map(|((chunk, text_emb), summary_emb)| {
            let has_summary = chunk.summary.as_deref().is_some_and(|s| !s.is_empty());
            let summary_vec = has_summary.then(|| Vector::from(summary_emb));
            (chunk.id, Vector::from(text_emb), summary_vec)
        })
        .collect();

    chunks.write_embeddings_batch(&updates).await?;
    Ok(batch.len())
}

/// Encodes a single question for the `embed_question` task type,
/// returning the L2-normalized vector ready for JSON serialization into
/// `task.result`.
pub async fn embed_question(encoder: &dyn SentenceEncoder, question: &str) -> Result<Vec<f32>> {
    let mut embeddings = encoder.encode_batch(&[question.to_string()]).await?;
    let mut vector = embeddings.pop().unwrap_or_default();
    l2_normalize(&mut vector);
    Ok(vector)
}
