//! Metadata/SQL-agent path: the LLM writes a `SELECT` against a fixed
//! schema prompt, we execute it read-only, then hand the rows back to
//! the LLM to phrase a natural-language answer.

use sqlx::{Column, PgPool, Row};
use ytrag_core::llm::{ChatTurn, LlmClient, Role};

use crate::error::{RagError, Result};

const SCHEMA_PROMPT: &str = "\
Tables:
1. channels (id BIGINT, name TEXT, url TEXT, created_at TIMESTAMPTZ)
2. videos (video_id TEXT, channel_id BIGINT, title TEXT, description TEXT,
   published_at TIMESTAMPTZ, duration INTEGER (seconds), audio_path TEXT,
   downloaded BOOLEAN, transcribed BOOLEAN, created_at TIMESTAMPTZ)
3. chat_sessions (id UUID, channel_id BIGINT, title TEXT, created_at TIMESTAMPTZ)
4. chat_messages (id BIGINT, session_id UUID, role TEXT, content TEXT,
   sources JSONB, created_at TIMESTAMPTZ)";

/// Runs the METADATA intent path end to end: generate SQL, execute it
/// (SELECT-only), summarize the rows into a natural-language answer.
pub async fn handle_metadata_query(pool: &PgPool, llm: &dyn LlmClient, question: &str) -> Result<String> {
    let sql = generate_sql(llm, question).await?;
    tracing::info!(sql = %sql, "sql agent generated query");

    if !is_select_only(&sql) {
        return Ok("I can only perform read operations (SELECT).".to_string());
    }

    let rows = match sqlx::query(&sql).fetch_all(pool).await {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(error = %e, sql = %sql, "sql agent query execution failed");
            return Ok(format!("I tried to query the database, but an error occurred: {e}"));
        }
    };

    let data = rows_to_json(&rows);
    summarize_results(llm, question, &data).await
}

async fn generate_sql(llm: &dyn LlmClient, question: &str) -> Result<String> {
    let system = format!(
        "You are a SQL expert. Convert the user's question into a SQL query \
         based on the schema below.\n\nRules:\n\
         - Return ONLY the raw SQL query. No markdown, no explanation.\n\
         - Use PostgreSQL syntax.\n\
         - Only SELECT statements are allowed.\n\nSchema:\n{SCHEMA_PROMPT}"
    );
    let turns = [ChatTurn {
        role: Role::User,
        content: format!("Question: {question}\nSQL:"),
    }];

    let reply = llm
        .complete(&system, &turns, 0.0)
        .await
        .map_err(|e| RagError::ExternalService {
            service: "llm",
            message: e.to_string(),
        })?;

    Ok(strip_code_fences(&reply))
}

/// Strips leading/trailing ```sql fences the model sometimes wraps its
/// answer in.
fn strip_code_fences(raw: &str) -> String {
    raw.replace("```sql", "").replace("```", "").trim().to_string()
}

/// Rejects unless the first non-whitespace token (uppercased) is SELECT.
fn is_select_only(sql: &str) -> bool {
    sql.trim_start()
        .split_whitespace()
        .next()
        .map(|tok| tok.to_uppercase() == "SELECT")
        .unwrap_or(false)
}

/// Converts result rows into an array of column-named JSON records,
/// best-effort per column type.
fn rows_to_json(rows: &[sqlx::postgres::PgRow]) -> Vec<serde_json::Map<String, serde_json::Value>> {
    rows.iter()
        .map(|row| {
            let mut record = serde_json::Map::new();
            for column in row.columns() {
                let name = column.name().to_string();
                let value = column_to_json(row, column.ordinal());
                record.insert(name, value);
            }
            record
        })
        .collect()
}

fn column_to_json(row: &sqlx::postgres::PgRow, idx: usize) -> serde_json::Value {
    use serde_json::Value;

    if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
        return v.map(Value::String).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
        return v.map(|n| Value::from(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
        return v.map(|n| Value::from(n)).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
        return v.map(Value::Bool).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
        return v.map(|d| Value::String(d.to_rfc3339())).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<serde_json::Value>, _>(idx) {
        return v.unwrap_or(Value::Null);
    }
    Value::Null
}

async fn summarize_results(
    llm: &dyn LlmClient,
    question: &str,
    data: &[serde_json::Map<String, serde_json::Value>],
) -> Result<String> {
    if data.is_empty() {
        return Ok("The database query returned no results.".to_string());
    }

    let truncated = data.len() > 50;
    let shown = &data[..data.len().min(50)];
    let mut data_str = serde_json::to_string(shown).unwrap_or_default();
    if truncated {
        data_str.push_str(&format!("... (and {} more items)", data.len() - 50));
    }

    let turns = [ChatTurn {
        role: Role::User,
        content: format!(
            "User Question: {question}\nDatabase Results: {data_str}\n\n\
             Answer the user's question naturally based on the results above. \
             If it's a list, format it nicely."
        ),
    }];

    llm.complete("You summarize database query results in natural language.", &turns, 0.2)
        .await
        .map_err(|e| RagError::ExternalService {
            service: "llm",
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_select() {
        assert!(is_select_only("SELECT * FROM videos"));
        assert!(is_select_only("  select count(*) from channels"));
    }

    #[test]
    fn rejects_non_select() {
        assert!(!is_select_only("DELETE FROM videos"));
        assert!(!is_select_only("DROP TABLE channels"));
        assert!(!is_select_only(""));
    }

    #[test]
    fn strips_markdown_fences() {
        let raw = "```sql\nSELECT 1\n```";
        assert_eq!(strip_code_fences(raw), "SELECT 1");
    }
}
