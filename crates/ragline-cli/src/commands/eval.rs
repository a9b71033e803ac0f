//! Eval command implementation.

use crate::cli::EvalArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::pipeline::Pipeline;
use ragline_eval::{EvaluationSink, JsonlEvaluationSink};
use ragline_orchestrator::QueryRequest;
use std::fs;
use tokio_util::sync::CancellationToken;

/// Read questions from `contents`.
///
/// Accepts a JSON array of query requests, or plain text with one question
/// per line (blank lines and `#` comments are skipped).
pub fn parse_questions(contents: &str) -> Result<Vec<QueryRequest>> {
    let trimmed = contents.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(QueryRequest::new)
        .collect())
}

/// Execute the eval command.
pub async fn execute_eval(args: EvalArgs, config: &Config, formatter: &Formatter) -> Result<()> {
    if !config.pipeline.evaluation.enabled {
        return Err(CliError::InvalidInput(
            "evaluation is disabled in the [evaluation] section".to_string(),
        ));
    }

    let requests = parse_questions(&fs::read_to_string(&args.file)?)?;
    if requests.is_empty() {
        return Err(CliError::InvalidInput(format!(
            "No questions found in {}",
            args.file.display()
        )));
    }

    let sink = match &args.output {
        Some(path) => Some(Box::new(JsonlEvaluationSink::open(path)?) as Box<dyn EvaluationSink>),
        None => None,
    };
    let pipeline = Pipeline::start_with_evaluation(config, sink)?;
    let results = pipeline.results().clone();

    println!(
        "{}",
        formatter.info(&format!("Answering {} question(s)", requests.len()))
    );
    let cancel = CancellationToken::new();
    let mut answered = Vec::with_capacity(requests.len());
    for request in requests {
        let question = request.question.clone();
        match pipeline
            .orchestrator()
            .answer(request.with_evaluation(true), &cancel)
            .await
        {
            Ok(response) => answered.push((question, Some(response.query_id))),
            Err(failure) => {
                eprintln!("{}", formatter.format_failure(&failure)?);
                answered.push((question, None));
            }
        }
    }

    let (_, metrics) = pipeline.finish().await;

    let rows: Vec<_> = answered
        .into_iter()
        .map(|(question, id)| (question, id.and_then(|id| results.get(id))))
        .collect();
    println!("{}", formatter.format_evaluations(&rows)?);
    if let Some(metrics) = metrics {
        println!("{}", metrics.summary());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_questions() {
        let requests = parse_questions("# smoke set\nWhat is RAG?\n\n  Who wrote it?  \n").unwrap();
        let questions: Vec<_> = requests.iter().map(|r| r.question.as_str()).collect();
        assert_eq!(questions, vec!["What is RAG?", "Who wrote it?"]);
    }

    #[test]
    fn test_json_requests() {
        let requests =
            parse_questions(r#"[{"question": "What is RAG?", "top_k": 2}, {"question": "Why?"}]"#)
                .unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].top_k, Some(2));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            parse_questions("[{\"nope\": 1}]"),
            Err(CliError::Serialization(_))
        ));
    }
}
