//! Prompt construction for grounded answering

use crate::citations::marker;
use ragline_domain::{AssembledContext, Query};
use std::fmt::Write;

const GROUNDED_INSTRUCTIONS: &str = "You are a question answering assistant. \
Answer the question using only the information in the context below. \
After every statement, cite the chunk it comes from using its marker exactly \
as written, for example [source:chunk-1]. Do not cite chunks that are not listed.";

const GENERAL_INSTRUCTIONS: &str = "You are a question answering assistant. \
No indexed documents matched this question. Answer from general knowledge, \
and state clearly that the answer is not based on the indexed documents. \
Do not invent citations.";

/// Builds prompts for the generation provider
///
/// Output is a pure function of the query, the context and the builder
/// settings.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    decline_message: String,
    max_history_turns: usize,
}

impl PromptBuilder {
    /// Create a new prompt builder
    pub fn new(decline_message: impl Into<String>, max_history_turns: usize) -> Self {
        Self {
            decline_message: decline_message.into(),
            max_history_turns,
        }
    }

    /// Build the grounded prompt: instructions, history, tagged context, question
    pub fn build(&self, query: &Query, context: &AssembledContext) -> String {
        let mut prompt = String::new();

        // 1. Instructions, including the exact decline reply
        prompt.push_str(GROUNDED_INSTRUCTIONS);
        let _ = write!(
            prompt,
            "\nIf the context does not contain the answer, reply exactly: \"{}\"\n\n",
            self.decline_message
        );

        // 2. Conversation so far
        self.push_history(&mut prompt, query);

        // 3. Enumerated context
        prompt.push_str("Context:\n");
        for (i, chunk) in context.chunks.iter().enumerate() {
            let _ = writeln!(
                prompt,
                "{}. {} (document: {})",
                i + 1,
                marker(&chunk.chunk_id),
                chunk.source_document_id
            );
            prompt.push_str(chunk.text.trim());
            prompt.push_str("\n\n");
        }

        // 4. The question
        Self::push_question(&mut prompt, query);
        prompt
    }

    /// Build the prompt used when no evidence was found and general
    /// knowledge answers are allowed
    pub fn build_general(&self, query: &Query) -> String {
        let mut prompt = String::new();
        prompt.push_str(GENERAL_INSTRUCTIONS);
        let _ = write!(
            prompt,
            "\nIf you do not know the answer, reply exactly: \"{}\"\n\n",
            self.decline_message
        );
        self.push_history(&mut prompt, query);
        Self::push_question(&mut prompt, query);
        prompt
    }

    fn push_history(&self, prompt: &mut String, query: &Query) {
        let turns = query.recent_history(self.max_history_turns);
        if turns.is_empty() {
            return;
        }
        prompt.push_str("Conversation so far:\n");
        for turn in turns {
            let _ = writeln!(prompt, "User: {}", turn.question.trim());
            let _ = writeln!(prompt, "Assistant: {}", turn.answer.trim());
        }
        prompt.push('\n');
    }

    fn push_question(prompt: &mut String, query: &Query) {
        let _ = write!(prompt, "Question: {}\nAnswer:", query.text.trim());
    }
}
