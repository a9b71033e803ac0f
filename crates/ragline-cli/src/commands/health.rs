//! Health command implementation.

use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::Formatter;
use crate::pipeline::Pipeline;

/// Execute the health command.
pub async fn execute_health(config: &Config, formatter: &Formatter) -> Result<()> {
    let pipeline = Pipeline::start(config)?;
    let readiness = pipeline.orchestrator().readiness().await;
    pipeline.finish().await;

    println!("{}", formatter.format_readiness(&readiness)?);
    if readiness.ready {
        Ok(())
    } else {
        Err(CliError::NotReady)
    }
}
