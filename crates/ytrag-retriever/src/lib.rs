//! Hybrid vector + full-text retrieval over `chunks`.

use pgvector::Vector;
use serde::Serialize;
use sqlx::PgPool;
use ytrag_core::types::TargetIndex;

/// One retrieved passage plus its blended score.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub id: i64,
    pub video_id: String,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub summary: Option<String>,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct HybridQuery<'a> {
    pub query_text: &'a str,
    pub query_embedding: Option<&'a Vector>,
    pub video_ids: &'a [String],
    pub target_index: TargetIndex,
    pub top_k: i64,
    pub vector_weight: f64,
    pub text_weight: f64,
}

/// Runs the hybrid scoring algorithm: separate vector and full-text
/// candidate sets, `FULL OUTER JOIN`ed on chunk id, blended by
/// `vector_weight`/`text_weight`, sorted desc, truncated to `top_k`.
///
/// Empty `video_ids` short-circuits to the empty list without querying.
/// A missing `query_embedding` short-circuits the vector leg to 0 for
/// every row (text-only search).
pub async fn search_hybrid(pool: &PgPool, q: HybridQuery<'_>) -> sqlx::Result<Vec<RetrievedChunk>> {
    if q.video_ids.is_empty() {
        return Ok(Vec::new());
    }

    let (vcol, tcol, text_col) = match q.target_index {
        TargetIndex::Chunks => ("embedding", "search_vector", "text"),
        TargetIndex::Summaries => ("summary_embedding", "summary_search_vector", "summary"),
    };

    // With no query embedding, the vector leg contributes nothing rather
    // than running `<->` against a dimensionless vector (which Postgres
    // would reject as a dimension mismatch against `vector(384)`).
    let vector_cte = if q.query_embedding.is_some() {
        format!(
            r#"
            SELECT id, video_id, start_time, end_time, text, summary,
                   {vcol} <-> $1 AS vector_distance
            FROM chunks
            WHERE {vcol} IS NOT NULL AND video_id = ANY($2)
            ORDER BY vector_distance
            LIMIT $3
            "#
        )
    } else {
        // References $1 so the placeholder count still lines up, but the
        // `FALSE AND` prefix guarantees the vector leg never contributes
        // rows when no query embedding was provided.
        format!(
            r#"
            SELECT id, video_id, start_time, end_time, text, summary,
                   NULL::double precision AS vector_distance
            FROM chunks
            WHERE FALSE AND {vcol} <-> $1 IS NOT NULL
            "#
        )
    };

    let sql = format!(
        r#"
        WITH vector_results AS ({vector_cte}),
        text_results AS (
            SELECT id, video_id, start_time, end_time, text, summary,
                   ts_rank({tcol}, plainto_tsquery('spanish', $4)) AS text_rank
            FROM chunks
            WHERE {tcol} @@ plainto_tsquery('spanish', $4) AND video_id = ANY($2)
            ORDER BY text_rank DESC
            LIMIT $3
        )
        SELECT
            COALESCE(v.id, t.id) AS id,
            COALESCE(v.video_id, t.video_id) AS video_id,
            COALESCE(v.start_time, t.start_time) AS start_time,
            COALESCE(v.end_time, t.end_time) AS end_time,
            COALESCE(v.{text_col}, t.{text_col}) AS text,
            COALESCE(v.summary, t.summary) AS summary,
            v.vector_distance,
            t.text_rank
        FROM vector_results v
        FULL OUTER JOIN text_results t ON v.id = t.id
        "#
    );

    let zero_vec = Vector::from(vec![0.0_f32; 0]);
    let embedding = q.query_embedding.unwrap_or(&zero_vec);

    let rows: Vec<(i64, String, f64, f64, String, Option<String>, Option<f64>, Option<f32>)> =
        sqlx::query_as(&sql)
            .bind(embedding)
            .bind(q.video_ids)
            .bind(q.top_k)
            .bind(q.query_text)
            .fetch_all(pool)
            .await?;

    let mut merged: Vec<RetrievedChunk> = rows
        .into_iter()
        .map(|(id, video_id, start, end, text, summary, vector_distance, text_rank)| {
            let vector_score = vector_distance.map(|d| 1.0 - d).unwrap_or(0.0);
            let text_score = text_rank.map(|r| r as f64).unwrap_or(0.0);
            let score = q.vector_weight * vector_score + q.text_weight * text_score;
            RetrievedChunk {
                id,
                video_id,
                start,
                end,
                text,
                summary,
                score,
            }
        })
        .collect();

    merged.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    merged.truncate(q.top_k as usize);

    Ok(merged)
}

/// Builds the YouTube deep-link timestamp URL used in `sources` events.
pub fn deep_link(video_id: &str, start: f64) -> String {
    format!("https://www.youtube.com/watch?v={video_id}&t={}s", start as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_link_truncates_seconds() {
        assert_eq!(
            deep_link("abc123", 42.9),
            "https://www.youtube.com/watch?v=abc123&t=42s"
        );
    }

    #[test]
    fn score_blend_matches_weights() {
        let vector_score = 1.0 - 0.2_f64;
        let text_score = 0.5_f64;
        let score = 0.7 * vector_score + 0.3 * text_score;
        assert!((score - (0.7 * 0.8 + 0.3 * 0.5)).abs() < 1e-9);
    }
}
