//! Intent classification used by `ask_stream` to pick an answer strategy.

use ytrag_core::llm::{ChatTurn, LlmClient, Role};
use ytrag_core::types::Intent;

const CLASSIFY_SYSTEM_PROMPT: &str = "\
Classify the following user question into one of the categories:

- METADATA: Questions about the video library itself (titles, counts, dates, channels).
- CONTENT: Questions about specific topics discussed in the videos.
- CONTENT_GLOBAL: Questions asking for summaries, main points, or overviews across videos.

Return ONLY one of: METADATA, CONTENT, CONTENT_GLOBAL.";

/// Classifies `question` via the LLM. Any reply outside the three labels
/// — including an LLM error — defaults to `Content`.
pub async fn classify_intent(llm: &dyn LlmClient, question: &str) -> Intent {
    let turns = [ChatTurn {
        role: Role::User,
        content: format!("Question:\n{question}\n\nCategory:"),
    }];

    match llm.complete(CLASSIFY_SYSTEM_PROMPT, &turns, 0.0).await {
        Ok(reply) => reply.trim().to_uppercase().parse().unwrap_or(Intent::Content),
        Err(e) => {
            tracing::warn!(error = %e, "intent classification failed, defaulting to CONTENT");
            Intent::Content
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_reply_string_falls_back_to_content() {
        let parsed: Result<Intent, ()> = "banana".parse();
        assert!(parsed.is_err());
    }

    #[test]
    fn recognizes_all_three_labels() {
        assert_eq!("METADATA".parse::<Intent>().unwrap(), Intent::Metadata);
        assert_eq!("CONTENT".parse::<Intent>().unwrap(), Intent::Content);
        assert_eq!("CONTENT_GLOBAL".parse::<Intent>().unwrap(), Intent::ContentGlobal);
    }
}
