use rag_core::Document;

/// Builds the generation prompt from retrieved context and the user query
pub struct PromptBuilder;

impl PromptBuilder {
    pub const INSTRUCTION: &'static str =
        "Given the following context and query, provide a detailed answer:";

    /// Assemble the prompt.
    ///
    /// Context documents appear one per line in the order given (descending
    /// score when called by the pipeline). An empty context still yields the
    /// `Context:` block, just with nothing in it. Output depends only on the
    /// inputs.
    pub fn build<'a, I>(query: &str, context_docs: I) -> String
    where
        I: IntoIterator<Item = &'a Document>,
    {
        let context = context_docs
            .into_iter()
            .map(|doc| doc.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut prompt = String::with_capacity(Self::INSTRUCTION.len() + context.len() + query.len() + 32);
        prompt.push_str(Self::INSTRUCTION);
        prompt.push_str("\n\n");
        prompt.push_str("Context:\n");
        prompt.push_str(&context);
        prompt.push_str("\n\n");
        prompt.push_str(&format!("Query: {}\n\n", query));
        prompt.push_str("Answer:");

        prompt
    }
}
