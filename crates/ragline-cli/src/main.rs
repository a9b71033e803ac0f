//! Ragline CLI - Ask questions against an indexed corpus.

use clap::Parser;
use ragline_cli::commands::{self, ask::Conversation};
use ragline_cli::repl;
use ragline_cli::{Cli, Command, Config, Formatter, Pipeline};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> ragline_cli::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // RUST_LOG wins over the configured level; logs go to stderr so answers
    // can be piped
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.settings.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let format = cli.format.map(Into::into).unwrap_or(config.settings.format);
    let color_enabled = !cli.no_color && config.settings.color;
    let formatter = Formatter::new(format, color_enabled);

    match cli.command {
        None | Some(Command::Repl) => {
            repl::run_repl(&config, &formatter).await?;
        }
        Some(Command::Ask(args)) => {
            let pipeline = if args.evaluate {
                Pipeline::start_with_evaluation(&config, None)?
            } else {
                Pipeline::start(&config)?
            };
            let outcome = commands::execute_ask(
                &args,
                pipeline.orchestrator(),
                &formatter,
                &Conversation::default(),
            )
            .await;
            let results = pipeline.results().clone();
            let (_, evaluation) = pipeline.finish().await;

            let response = outcome?;
            if evaluation.is_some() {
                let row = (response.question.clone(), results.get(response.query_id));
                println!("{}", formatter.format_evaluations(&[row])?);
            }
        }
        Some(Command::Eval(args)) => {
            commands::execute_eval(args, &config, &formatter).await?;
        }
        Some(Command::Health) => {
            commands::execute_health(&config, &formatter).await?;
        }
        Some(Command::Config(args)) => {
            commands::execute_config(args, &config, cli.config.as_deref(), &formatter).await?;
        }
    }

    Ok(())
}
