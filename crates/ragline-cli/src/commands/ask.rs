//! Ask command implementation.

use crate::cli::AskArgs;
use crate::config::OutputFormat;
use crate::error::Result;
use crate::output::Formatter;
use ragline_domain::ConversationTurn;
use ragline_orchestrator::{QueryEvent, QueryFailure, QueryOrchestrator, QueryRequest, QueryResponse};
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Conversation state carried between questions
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    /// Identifier passed through to traces
    pub id: Option<String>,
    /// Earlier turns, oldest first
    pub history: Vec<ConversationTurn>,
}

/// Build the request for one question.
pub fn build_request(args: &AskArgs, conversation: &Conversation) -> Result<QueryRequest> {
    let mut request = QueryRequest::new(args.question_text())
        .with_history(conversation.history.clone())
        .with_filters(args.metadata_filter()?)
        .with_sources(!args.no_sources)
        .with_evaluation(args.evaluate);
    if let Some(k) = args.top_k {
        request = request.with_top_k(k);
    }
    request.conversation_id = conversation.id.clone();
    Ok(request)
}

/// Execute the ask command.
///
/// Ctrl-C cancels the question in flight.
pub async fn execute_ask(
    args: &AskArgs,
    orchestrator: &QueryOrchestrator,
    formatter: &Formatter,
    conversation: &Conversation,
) -> Result<QueryResponse> {
    let request = build_request(args, conversation)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let outcome = if args.stream {
        stream_answer(request, orchestrator, formatter, cancel).await
    } else {
        match orchestrator.answer(request, &cancel).await {
            Ok(response) => {
                println!("{}", formatter.format_response(&response)?);
                Ok(response)
            }
            Err(failure) => Err(failure.into()),
        }
    };
    watcher.abort();
    outcome
}

async fn stream_answer(
    request: QueryRequest,
    orchestrator: &QueryOrchestrator,
    formatter: &Formatter,
    cancel: CancellationToken,
) -> Result<QueryResponse> {
    let echo = formatter.format() != OutputFormat::Json;
    let mut stream = orchestrator.answer_stream(request, cancel)?;
    let mut stdout = std::io::stdout();

    while let Some(event) = stream.next_event().await {
        match event {
            QueryEvent::Fragment { text, .. } => {
                if echo {
                    print!("{}", text);
                    stdout.flush()?;
                }
            }
            QueryEvent::Completed { response } => {
                if echo {
                    println!();
                    println!();
                }
                let footer = formatter.format_streamed(&response)?;
                if !footer.is_empty() {
                    println!("{}", footer);
                }
                return Ok(response);
            }
            QueryEvent::Failed { error, partial_answer } => {
                if echo && partial_answer.is_some() {
                    println!();
                }
                return Err(QueryFailure::from_response(error, partial_answer).into());
            }
        }
    }
    Err(QueryFailure::cancelled().into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use clap::Parser;

    fn ask_args(argv: &[&str]) -> AskArgs {
        let mut full = vec!["ragline", "ask"];
        full.extend_from_slice(argv);
        match Cli::parse_from(full).command {
            Some(Command::Ask(args)) => args,
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_request_carries_options() {
        let args = ask_args(&["what", "is", "rag", "-k", "3", "--no-sources", "--evaluate"]);
        let conversation = Conversation {
            id: Some("session-1".to_string()),
            history: vec![ConversationTurn::new("hi", "hello")],
        };

        let request = build_request(&args, &conversation).unwrap();
        assert_eq!(request.question, "what is rag");
        assert_eq!(request.top_k, Some(3));
        assert!(!request.include_sources);
        assert!(request.enable_evaluation);
        assert_eq!(request.conversation_id.as_deref(), Some("session-1"));
        assert_eq!(request.history.len(), 1);
    }

    #[test]
    fn test_bad_filter_is_rejected() {
        let args = ask_args(&["q", "--filter", "nokey"]);
        assert!(build_request(&args, &Conversation::default()).is_err());
    }
}
