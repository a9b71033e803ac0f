//! Interactive REPL (Read-Eval-Print Loop) mode.
//!
//! Every line is a question, asked with the conversation so far as history.
//! Lines starting with `:` are REPL commands.

use crate::cli::AskArgs;
use crate::commands::ask::{execute_ask, Conversation};
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::pipeline::Pipeline;
use ragline_domain::{ConversationTurn, QueryId};
use rustyline::config::Config as EditorConfig;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::path::PathBuf;

/// Turns kept for follow-up questions
const MAX_TURNS: usize = 20;

/// Run the interactive REPL.
pub async fn run_repl(config: &Config, formatter: &Formatter) -> Result<()> {
    println!(
        "{}",
        formatter.info("Ragline REPL - Ask a question, ':help' for commands, ':quit' to exit")
    );
    println!();

    let editor_config = EditorConfig::builder()
        .max_history_size(config.settings.history_size)
        .map_err(|e| CliError::Config(format!("Invalid history size: {}", e)))?
        .build();
    let mut editor = DefaultEditor::with_config(editor_config)
        .map_err(|e| CliError::Io(std::io::Error::other(format!("Failed to initialize editor: {}", e))))?;

    let history_path = get_history_path()?;
    let _ = editor.load_history(&history_path);

    let pipeline = Pipeline::start(config)?;
    let mut session = Session::new();

    loop {
        let prompt = if session.stream { "ragline~> " } else { "ragline> " };

        match editor.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                editor.add_history_entry(line).ok();

                match parse_repl_line(line) {
                    Ok(ReplCommand::Exit) => {
                        println!("{}", formatter.info("Goodbye!"));
                        break;
                    }
                    Ok(ReplCommand::Help) => print_help(formatter),
                    Ok(ReplCommand::Reset) => {
                        session.reset();
                        println!("{}", formatter.success("Conversation cleared"));
                    }
                    Ok(ReplCommand::ToggleStream) => {
                        session.stream = !session.stream;
                        let state = if session.stream { "on" } else { "off" };
                        println!("{}", formatter.info(&format!("Streaming {}", state)));
                    }
                    Ok(ReplCommand::ToggleSources) => {
                        session.sources = !session.sources;
                        let state = if session.sources { "on" } else { "off" };
                        println!("{}", formatter.info(&format!("Sources {}", state)));
                    }
                    Ok(ReplCommand::Health) => {
                        let readiness = pipeline.orchestrator().readiness().await;
                        println!("{}", formatter.format_readiness(&readiness)?);
                    }
                    Ok(ReplCommand::Ask(question)) => {
                        let args = session.ask_args(question.clone());
                        let outcome = execute_ask(
                            &args,
                            pipeline.orchestrator(),
                            formatter,
                            &session.conversation,
                        )
                        .await;
                        match outcome {
                            Ok(response) => session.record(question, response.answer),
                            Err(e) => eprintln!("{}", formatter.error(&e.to_string())),
                        }
                    }
                    Err(e) => eprintln!("{}", formatter.error(&e.to_string())),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", formatter.info("Use ':quit' to exit"));
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}", formatter.error(&format!("Error: {}", err)));
                break;
            }
        }
    }

    editor.save_history(&history_path).ok();
    pipeline.finish().await;
    Ok(())
}

/// REPL command type.
#[derive(Debug, PartialEq)]
enum ReplCommand {
    Exit,
    Help,
    Reset,
    ToggleStream,
    ToggleSources,
    Health,
    Ask(String),
}

/// State kept across questions.
struct Session {
    conversation: Conversation,
    stream: bool,
    sources: bool,
}

impl Session {
    fn new() -> Self {
        Self {
            conversation: Conversation {
                id: Some(QueryId::new().to_string()),
                history: Vec::new(),
            },
            stream: true,
            sources: false,
        }
    }

    fn reset(&mut self) {
        *self = Self {
            stream: self.stream,
            sources: self.sources,
            ..Self::new()
        };
    }

    fn ask_args(&self, question: String) -> AskArgs {
        AskArgs {
            question: vec![question],
            top_k: None,
            filters: Vec::new(),
            no_sources: !self.sources,
            stream: self.stream,
            evaluate: false,
        }
    }

    fn record(&mut self, question: String, answer: String) {
        let history = &mut self.conversation.history;
        history.push(ConversationTurn::new(question, answer));
        if history.len() > MAX_TURNS {
            history.drain(..history.len() - MAX_TURNS);
        }
    }
}

/// Parse a REPL line.
fn parse_repl_line(line: &str) -> Result<ReplCommand> {
    let Some(command) = line.strip_prefix(':') else {
        return Ok(ReplCommand::Ask(line.to_string()));
    };

    match command.trim() {
        "quit" | "exit" | "q" => Ok(ReplCommand::Exit),
        "help" | "?" => Ok(ReplCommand::Help),
        "reset" | "clear" => Ok(ReplCommand::Reset),
        "stream" => Ok(ReplCommand::ToggleStream),
        "sources" => Ok(ReplCommand::ToggleSources),
        "health" => Ok(ReplCommand::Health),
        other => Err(CliError::InvalidInput(format!(
            "Unknown command: :{}. Type ':help' for available commands.",
            other
        ))),
    }
}

fn get_history_path() -> Result<PathBuf> {
    let dir = Config::home()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir.join("history.txt"))
}

fn print_help(formatter: &Formatter) {
    println!("{}", formatter.info("Available commands:"));
    println!();
    println!("  <question>          - Ask a question (follow-ups see earlier turns)");
    println!("  :stream             - Toggle streamed answers");
    println!("  :sources            - Toggle the sources table");
    println!("  :reset, :clear      - Start a new conversation");
    println!("  :health             - Check the index");
    println!("  :help, :?           - Show this help");
    println!("  :quit, :exit, :q    - Exit REPL");
    println!();
}
