//! Query classification and prompt assembly.
use index::SearchHit;

/// Phrases that mark a question about the tool itself.
pub const META_PHRASES: [&str; 4] = ["who are you", "what are you", "who is this", "what is this"];

pub const META_ANSWER: &str = "I am the SHL Assessment Recommendation Engine, here to help you find the best SHL assessments for specific roles and job levels!";

pub const FALLBACK_NOTICE: &str =
    "No assessments match the selected filters. Showing results without filters.";

pub const EMPTY_QUERY_NOTICE: &str =
    "Please enter a query or select a sample question to get a recommendation.";

pub const SAMPLE_QUESTIONS: [&str; 3] = [
    "Which assessment is suitable for an entry-level customer service role?",
    "Recommend an assessment for a mid-level manager in the insurance industry.",
    "What’s the best assessment for a senior sales professional?",
];

/// Whether `query` asks about the assistant rather than about assessments.
pub fn is_meta_query(query: &str) -> bool {
    let normalized = query.trim().to_lowercase();
    META_PHRASES
        .iter()
        .any(|phrase| normalized.contains(phrase))
}

/// Join document texts in rank order, one per line.
pub fn build_context(hits: &[SearchHit<'_>]) -> String {
    hits.iter()
        .map(|hit| hit.document.text())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the generation prompt around `context` and the raw user question.
pub fn build_prompt(context: &str, question: &str, max_recommendations: usize) -> String {
    let mut prompt = String::with_capacity(context.len() + question.len() + 768);
    prompt.push_str(
        "You are an SHL Assessment Recommendation Engine. Use the following context to \
         recommend the most suitable SHL assessments based on the user's query. Prioritize \
         the assessment that best matches the query in terms of job level, role, and industry. \
         If multiple assessments are relevant, provide a ranked list (up to ",
    );
    prompt.push_str(&max_recommendations.to_string());
    prompt.push_str(
        ") with the product name, description, job level, test duration, and a brief reason \
         for the match. If no suitable assessment is found, suggest the closest match and \
         explain why, or indicate that no match was found.",
    );
    prompt.push_str("\n\nContext:\n");
    prompt.push_str(context);
    prompt.push_str("\n\nQuestion: ");
    prompt.push_str(question);
    prompt
}
