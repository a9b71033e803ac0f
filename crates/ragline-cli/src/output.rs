//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use ragline_domain::{EvaluationResult, FinishReason};
use ragline_orchestrator::{QueryFailure, QueryResponse, Readiness, SourceDocument};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Longest source excerpt shown in a table cell
const EXCERPT_CHARS: usize = 80;

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// The selected format.
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Format a completed answer.
    pub fn format_response(&self, response: &QueryResponse) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(response)?),
            OutputFormat::Quiet => Ok(response.answer.clone()),
            OutputFormat::Table => Ok(self.format_response_table(response)),
        }
    }

    /// Footer printed after a streamed answer.
    ///
    /// The answer text itself has already been printed fragment by fragment.
    pub fn format_streamed(&self, response: &QueryResponse) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(response)?),
            OutputFormat::Quiet => Ok(String::new()),
            OutputFormat::Table => Ok(self.response_details(response)),
        }
    }

    fn format_response_table(&self, response: &QueryResponse) -> String {
        let mut out = response.answer.clone();
        out.push_str("\n\n");
        out.push_str(&self.response_details(response));
        out
    }

    fn response_details(&self, response: &QueryResponse) -> String {
        let mut out = String::new();
        if response.finish_reason == FinishReason::Truncated {
            out.push_str(&self.warning("Answer truncated at the length limit"));
            out.push('\n');
        }
        if response.truncated_context {
            out.push_str(&self.warning("Some evidence did not fit the token budget"));
            out.push('\n');
        }
        if let Some(sources) = &response.sources {
            out.push_str(&self.sources_table(sources, &response.citations));
            out.push('\n');
        }
        out.push_str(&self.colorize(
            &format!(
                "query {} · {} citation(s) · {}ms",
                response.query_id,
                response.citations.len(),
                response.processing_time_ms
            ),
            "cyan",
        ));
        out
    }

    fn sources_table(&self, sources: &[SourceDocument], citations: &[String]) -> String {
        if sources.is_empty() {
            return self.colorize("No sources found.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(["", "Chunk", "Document", "Score", "Excerpt"]);
        for source in sources {
            let cited = if citations.contains(&source.chunk_id) { "*" } else { "" };
            builder.push_record([
                cited.to_string(),
                source.chunk_id.clone(),
                source.source_document_id.clone(),
                format!("{:.3}", source.score),
                excerpt(&source.content),
            ]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    /// Format a failed query.
    pub fn format_failure(&self, failure: &QueryFailure) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(&failure.to_response())?),
            _ => {
                let mut out = self.error(&format!("{} ({})", failure.message, failure.kind));
                if let Some(partial) = &failure.partial_answer {
                    out.push('\n');
                    out.push_str(&self.warning(&format!("Partial answer: {}", partial)));
                }
                Ok(out)
            }
        }
    }

    /// Format a readiness report.
    pub fn format_readiness(&self, readiness: &Readiness) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(readiness)?),
            OutputFormat::Quiet => Ok(if readiness.ready { "ready" } else { "not ready" }.to_string()),
            OutputFormat::Table => {
                let status = if readiness.ready {
                    self.success("Ready")
                } else {
                    self.error("Not ready: index unhealthy or missing")
                };
                if readiness.indexes.is_empty() {
                    return Ok(status);
                }

                let mut builder = Builder::default();
                builder.push_record(["Index", "Chunks", "Dimension"]);
                for index in &readiness.indexes {
                    builder.push_record([
                        index.name.clone(),
                        index.chunk_count.to_string(),
                        index
                            .dimension
                            .map(|d| d.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                    ]);
                }
                let mut table = builder.build();
                table.with(Style::rounded());
                Ok(format!("{}\n{}", status, table))
            }
        }
    }

    /// Format evaluation results next to their questions.
    pub fn format_evaluations(&self, rows: &[(String, Option<EvaluationResult>)]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let results: Vec<&EvaluationResult> =
                    rows.iter().filter_map(|(_, result)| result.as_ref()).collect();
                Ok(serde_json::to_string_pretty(&results)?)
            }
            OutputFormat::Quiet => Ok(rows
                .iter()
                .map(|(_, result)| {
                    result
                        .as_ref()
                        .map(|r| format!("{:.3}", r.mean()))
                        .unwrap_or_else(|| "-".to_string())
                })
                .collect::<Vec<_>>()
                .join("\n")),
            OutputFormat::Table => {
                if rows.is_empty() {
                    return Ok(self.colorize("No questions evaluated.", "yellow"));
                }
                let mut builder = Builder::default();
                builder.push_record(["Question", "Grounded", "Relevant", "Faithful"]);
                for (question, result) in rows {
                    let cells = match result {
                        Some(r) => [r.groundedness, r.relevance, r.faithfulness]
                            .map(|score| format!("{:.2}", score)),
                        None => ["-".to_string(), "-".to_string(), "-".to_string()],
                    };
                    let [grounded, relevant, faithful] = cells;
                    builder.push_record([excerpt(question), grounded, relevant, faithful]);
                }
                let mut table = builder.build();
                table
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()));
                Ok(table.to_string())
            }
        }
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

/// First line of `text`, cut to a table-friendly length.
fn excerpt(text: &str) -> String {
    let line = text.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= EXCERPT_CHARS {
        return line.to_string();
    }
    let cut: String = line.chars().take(EXCERPT_CHARS - 1).collect();
    format!("{}…", cut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragline_domain::{ErrorKind, Metadata, QueryId};
    use ragline_store::IndexInfo;

    fn response(sources: Option<Vec<SourceDocument>>) -> QueryResponse {
        QueryResponse {
            query_id: QueryId::from_value(7),
            question: "How do panels work?".to_string(),
            answer: "They convert sunlight [source:solar]".to_string(),
            citations: vec!["solar".to_string()],
            finish_reason: FinishReason::Complete,
            sources,
            processing_time_ms: 42,
            truncated_context: false,
        }
    }

    fn source() -> SourceDocument {
        SourceDocument {
            chunk_id: "solar".to_string(),
            source_document_id: "energy".to_string(),
            content: "solar panels turn sunlight into electricity".to_string(),
            metadata: Metadata::new(),
            score: 0.91,
        }
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_response(&response(Some(vec![source()]))).unwrap();
        assert!(output.starts_with("They convert sunlight"));
        assert!(output.contains("Chunk"));
        assert!(output.contains("0.910"));
        assert!(output.contains("1 citation(s)"));
    }

    #[test]
    fn test_quiet_format() {
        let formatter = Formatter::new(OutputFormat::Quiet, false);
        let output = formatter.format_response(&response(None)).unwrap();
        assert_eq!(output, "They convert sunlight [source:solar]");
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_response(&response(None)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["citations"][0], "solar");
    }

    #[test]
    fn test_failure_shows_partial_answer() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let failure = QueryFailure::cancelled().with_partial_answer("They conv");
        let output = formatter.format_failure(&failure).unwrap();
        assert!(output.contains("Request cancelled (cancelled)"));
        assert!(output.contains("Partial answer: They conv"));

        let json = Formatter::new(OutputFormat::Json, false)
            .format_failure(&QueryFailure::new(ErrorKind::GenerationTimeout, "slow"))
            .unwrap();
        assert!(json.contains("generation_timeout"));
    }

    #[test]
    fn test_readiness() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let readiness = Readiness {
            ready: true,
            index_healthy: true,
            indexes: vec![IndexInfo {
                name: "default".to_string(),
                chunk_count: 12,
                dimension: Some(768),
            }],
        };
        let output = formatter.format_readiness(&readiness).unwrap();
        assert!(output.starts_with("✓ Ready"));
        assert!(output.contains("768"));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("short\nsecond line"), "short");
        let long = "x".repeat(200);
        assert_eq!(excerpt(&long).chars().count(), EXCERPT_CHARS);
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
    }
}
