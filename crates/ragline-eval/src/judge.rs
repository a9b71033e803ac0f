//! Judge prompts and reply parsing

use ragline_domain::{Answer, AssembledContext, Metric, Query};
use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(-?\d+(?:\.\d+)?)\s*(%|/\s*(\d+(?:\.\d+)?))?").expect("score regex is valid")
});

fn criterion(metric: Metric) -> &'static str {
    match metric {
        Metric::Groundedness => {
            "Groundedness: what fraction of the statements in the answer are directly \
             supported by the context? 1 means every statement is supported, 0 means none are."
        }
        Metric::Relevance => {
            "Relevance: how well does the answer address the question that was asked? \
             1 means it answers the question fully and directly, 0 means it is unrelated."
        }
        Metric::Faithfulness => {
            "Faithfulness: is the answer free of claims that contradict the context? \
             1 means nothing contradicts the context, 0 means the answer mostly contradicts it."
        }
    }
}

/// Build the judge prompt for one metric
pub fn judge_prompt(metric: Metric, query: &Query, context: &AssembledContext, answer: &Answer) -> String {
    let mut prompt = String::from(
        "You are grading the output of a question answering system.\n",
    );
    prompt.push_str(criterion(metric));
    prompt.push_str("\n\n");

    if metric != Metric::Relevance {
        prompt.push_str("Context:\n");
        if context.is_empty() {
            prompt.push_str("(no context)\n");
        }
        for (i, chunk) in context.chunks.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {}", i + 1, chunk.text.trim());
        }
        prompt.push('\n');
    }

    let _ = write!(
        prompt,
        "Question: {}\nAnswer: {}\n\nReply with a single number between 0 and 1 and nothing else.\nScore:",
        query.text.trim(),
        answer.text().trim()
    );
    prompt
}

/// Pull a score in [0, 1] out of a judge reply
///
/// The first number wins. `85%` and `8.5/10` are normalised; bare numbers
/// above 1 are read as out of 10, or out of 100 above 10.
///
/// # Examples
///
/// ```
/// use ragline_eval::parse_score;
///
/// assert_eq!(parse_score("0.75"), Some(0.75));
/// assert_eq!(parse_score("Score: 8/10"), Some(0.8));
/// assert_eq!(parse_score("about 90% supported"), Some(0.9));
/// assert_eq!(parse_score("no idea"), None);
/// ```
pub fn parse_score(reply: &str) -> Option<f64> {
    let caps = NUMBER_RE.captures(reply)?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;

    let normalised = match (caps.get(2), caps.get(3)) {
        (Some(m), _) if m.as_str() == "%" => value / 100.0,
        (Some(_), Some(scale)) => {
            let scale: f64 = scale.as_str().parse().ok()?;
            if scale <= 0.0 {
                return None;
            }
            value / scale
        }
        _ if value <= 1.0 => value,
        _ if value <= 10.0 => value / 10.0,
        _ if value <= 100.0 => value / 100.0,
        _ => return None,
    };
    Some(normalised.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_domain::{EvidenceChunk, FinishReason};

    #[test]
    fn test_parse_variants() {
        assert_eq!(parse_score("1"), Some(1.0));
        assert_eq!(parse_score("0"), Some(0.0));
        assert_eq!(parse_score("  0.4\n"), Some(0.4));
        assert_eq!(parse_score("7"), Some(0.7));
        assert_eq!(parse_score("65"), Some(0.65));
        assert_eq!(parse_score("3 / 4"), Some(0.75));
        assert_eq!(parse_score("-0.3"), Some(0.0));
        assert_eq!(parse_score("12/10"), Some(1.0));
    }

    #[test]
    fn test_parse_rejects() {
        assert_eq!(parse_score(""), None);
        assert_eq!(parse_score("fully supported"), None);
        assert_eq!(parse_score("250"), None);
        assert_eq!(parse_score("1/0"), None);
    }

    #[test]
    fn test_first_number_wins() {
        assert_eq!(parse_score("0.6 (previously 0.9)"), Some(0.6));
    }

    #[test]
    fn test_prompts() {
        let query = Query::new("Capital of France?");
        let context = AssembledContext {
            chunks: vec![EvidenceChunk::new("c1", "d", "Paris is the capital.", 0.9)],
            total_token_count: 5,
            truncated: false,
        };
        let answer = Answer::new("Paris.", vec!["c1".into()], FinishReason::Complete, 3);

        let grounded = judge_prompt(Metric::Groundedness, &query, &context, &answer);
        assert!(grounded.contains("Groundedness"));
        assert!(grounded.contains("1. Paris is the capital."));
        assert!(grounded.ends_with("Score:"));

        let relevance = judge_prompt(Metric::Relevance, &query, &context, &answer);
        assert!(!relevance.contains("Context:"));
        assert!(relevance.contains("Question: Capital of France?"));
    }
}
