use crate::store::QueryMatch;

const SYSTEM_INSTRUCTION: &str = "You are a helpful assistant answering questions about the user's documents. \
Use only the context below. If the context does not contain the answer, say that you do not know.";

/// Join match texts in ranked order, separated by a blank line.
pub fn build_context(matches: &[QueryMatch]) -> String {
    matches
        .iter()
        .map(|m| m.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Assemble the fixed answer prompt: instruction, context block, question, answer cue.
pub fn build_prompt(query: &str, matches: &[QueryMatch]) -> String {
    format!(
        "{SYSTEM_INSTRUCTION}\n\nContext:\n{context}\n\nQuestion: {question}\n\nAnswer:",
        context = build_context(matches),
        question = query.trim(),
    )
}
