//! Command-line front end for the ingestion pipeline.
//!
//! Runs the same validation, extraction, and normalization as the HTTP server, reading from
//! local files (or stdin for `normalize -`) and writing results to stdout.
use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docprep::{
    config, logging,
    ingest::{self, IngestOutcome, RawDocument},
};
use serde_json::json;

#[derive(Parser)]
#[command(
    name = "docprep-cli",
    about = "Extract and normalize documents for summarization"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extract text from a PDF, DOCX, or TXT file and normalize it.
    Extract {
        path: PathBuf,
        /// Declared MIME type; the file extension is used when omitted.
        #[arg(long, default_value = "")]
        content_type: String,
        /// Print metadata and text as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Normalize plain text from a file, or from stdin when the path is `-`.
    Normalize { path: PathBuf },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    config::init_config();
    logging::init_tracing_with(false);

    let config = config::get_config();
    let ocr = ingest::default_provider(&config.ocr_language, config.tessdata_dir.as_deref());
    let service = ingest::IngestService::new(ocr);

    match cli.command {
        Command::Extract {
            path,
            content_type,
            json,
        } => {
            let bytes = fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let raw = RawDocument::new(bytes, content_type, file_name(&path));
            let outcome = service
                .ingest_document(raw)
                .await
                .with_context(|| format!("failed to ingest {}", path.display()))?;
            print_outcome(&outcome, json)
        }
        Command::Normalize { path } => {
            let text = read_text(&path)?;
            let normalized = service.ingest_text(text).await?;
            write_stdout(&format!("{normalized}\n"))
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn read_text(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .context("failed to read stdin")?;
        return Ok(text);
    }
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn print_outcome(outcome: &IngestOutcome, as_json: bool) -> Result<()> {
    let document = &outcome.document;
    if as_json {
        let value = json!({
            "document": document,
            "text": outcome.text,
            "wordCount": outcome.text.word_count(),
        });
        let rendered =
            serde_json::to_string_pretty(&value).context("failed to render JSON output")?;
        return write_stdout(&format!("{rendered}\n"));
    }

    let mut report = format!(
        "format: {}\nwords: {}\nsize: {} bytes\n",
        document.format, document.word_count, document.size_bytes
    );
    if let Some(pages) = document.page_count {
        report.push_str(&format!("pages: {pages}\n"));
    }
    if let Some(title) = &document.title {
        report.push_str(&format!("title: {title}\n"));
    }
    if let Some(author) = &document.author {
        report.push_str(&format!("author: {author}\n"));
    }
    if document.ocr_applied {
        report.push_str("ocr: applied\n");
    }
    for warning in &document.warnings {
        report.push_str(&format!("warning: {warning}\n"));
    }
    report.push('\n');
    report.push_str(outcome.text.as_str());
    report.push('\n');
    write_stdout(&report)
}

fn write_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .context("failed to write output")?;
    stdout.flush().context("failed to flush output")
}
