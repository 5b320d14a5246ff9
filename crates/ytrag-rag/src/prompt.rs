//! Prompt assembly for the CONTENT and CONTENT_GLOBAL answer paths.

use ytrag_db::models::ChatMessage;
use ytrag_retriever::RetrievedChunk;
use ytrag_core::types::ChatRole;

/// Builds the strict-grounding CONTENT prompt: recent chat context, then
/// one `[Context N | video_id | Ns–Ns]` block per retrieved chunk with
/// summary+transcript, then the question.
pub fn build_content_prompt(question: &str, chunks: &[RetrievedChunk], chat_context: &[ChatMessage]) -> String {
    let mut chat_block = String::new();
    if !chat_context.is_empty() {
        chat_block.push_str("Conversation so far:\n");
        for msg in chat_context {
            let role = if msg.role == ChatRole::User { "User" } else { "Assistant" };
            chat_block.push_str(&format!("{role}: {}\n", msg.content));
        }
        chat_block.push('\n');
    }

    let mut context_blocks = Vec::with_capacity(chunks.len());
    for (i, ch) in chunks.iter().enumerate() {
        let mut block = format!("[Context {} | {} | {:.1}s\u{2013}{:.1}s]\n", i + 1, ch.video_id, ch.start, ch.end);
        if let Some(summary) = ch.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            block.push_str(&format!("Summary:\n{}\n\n", summary.trim()));
        }
        block.push_str(&format!("Transcript:\n{}", ch.text.trim()));
        context_blocks.push(block);
    }
    let context = context_blocks.join("\n\n");

    format!(
        "You are an expert assistant answering questions strictly using the provided video context.\n\n\
         Your goal is to produce answers that are:\n\
         - Factually accurate\n\
         - Well-structured\n\
         - Easy to follow\n\
         - Grounded only in the given information\n\n\
         Strict rules:\n\
         - Use ONLY the information explicitly present in the context.\n\
         - Do NOT introduce external knowledge, assumptions, or general facts.\n\
         - If the context does not contain enough information, state this clearly.\n\
         - Do NOT merge or confuse information from unrelated fragments.\n\n\
         How to use the context:\n\
         - Use the *Summaries* to understand the main idea of each fragment.\n\
         - Use the *Transcripts* to extract details, explanations, or exact wording.\n\
         - Prefer summaries for high-level reasoning and structure.\n\
         - Prefer transcripts for precision and evidence.\n\n\
         Answer structure guidelines:\n\
         - Start with a direct, clear answer to the question.\n\
         - If the answer is complex, break it into logical sections.\n\
         - Use bullet points or numbered lists when appropriate.\n\
         - When multiple fragments contribute, synthesize them coherently.\n\
         - Avoid redundancy unless it improves clarity.\n\n\
         Conversation context:\n{chat_block}\n\
         Video context:\n{context}\n\n\
         User question:\n{question}\n\n\
         Answer:"
    )
}

/// One video's ordered chunk summaries, capped at `max_summaries_per_video`.
pub struct VideoSummaries {
    pub video_id: String,
    pub summaries: Vec<(String, f64, f64)>,
}

/// Builds the CONTENT_GLOBAL cross-video summary prompt, asking for a
/// bullet-point answer in Spanish — kept as an intentional product
/// choice (the DB's `'spanish'` text-search config corroborates this),
/// not translated to the API caller's language.
pub fn build_global_prompt(per_video: &[VideoSummaries]) -> String {
    let mut summaries_text = String::new();
    for video in per_video {
        summaries_text.push_str(&format!("\nVideo {}:\n", video.video_id));
        for (summary, _, _) in &video.summaries {
            summaries_text.push_str(&format!("- {summary}\n"));
        }
    }

    format!(
        "You are given summarized segments from one or more YouTube videos.\n\n\
         Your task is to identify the main points discussed across the selected videos\n\
         and present them as a concise, structured list of bullet points in Spanish.\n\n\
         Rules:\n\
         - Do NOT invent information.\n\
         - Base your answer strictly on the provided summaries.\n\
         - Group related ideas across videos when appropriate.\n\
         - Focus on recurring themes, arguments, and conclusions.\n\n\
         Summaries:\n{summaries_text}\n\
         Main points:"
    )
}
