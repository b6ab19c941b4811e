//! Prompt construction for grounded answers

use std::fmt::Write;

use super::ConversationTurn;
use crate::retrieval::RetrievedChunk;

/// Answer the model gives when the context does not cover the question
pub const FALLBACK_ANSWER: &str =
    "I don't have enough information in the provided documents to answer that.";

const INSTRUCTIONS: &str = "You are SmartDocs, an assistant that answers questions using ONLY the document excerpts below.

RULES:
1. Use only information stated in the CONTEXT section.
2. If the context does not contain the answer, reply exactly: \"{fallback}\"
3. Do not use outside knowledge and do not guess.
4. Use the conversation so far only to understand what the question refers to.";

/// Build the full prompt: instructions, context, trimmed history, question
pub fn build_prompt(question: &str, chunks: &[RetrievedChunk], history: &[ConversationTurn]) -> String {
    let mut prompt = INSTRUCTIONS.replace("{fallback}", FALLBACK_ANSWER);

    prompt.push_str("\n\nCONTEXT:\n");
    if chunks.is_empty() {
        prompt.push_str("(no matching documents)\n");
    } else {
        let context = chunks
            .iter()
            .map(|chunk| format!("[{}]\n{}", chunk.source_id, chunk.text.trim()))
            .collect::<Vec<_>>()
            .join("\n\n");
        prompt.push_str(&context);
        prompt.push('\n');
    }

    if !history.is_empty() {
        prompt.push_str("\nCONVERSATION SO FAR:\n");
        for turn in history {
            // Writing to a String cannot fail.
            let _ = writeln!(prompt, "{}: {}", turn.role.label(), turn.content.trim());
        }
    }

    let _ = write!(prompt, "\nQuestion: {}\nAnswer:", question.trim());
    prompt
}
