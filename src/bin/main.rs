use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use toolwright::config::{CoverageHighlightMode, load_settings};
use toolwright::coverage::{self, CoverageOverlay};
use toolwright::host::{Document, OutputSurface, ProcessExecutor, ToolInstaller, ToolLocator};
use toolwright::system::{
    ConsoleOutput, FileDocument, GoInstaller, PathLocator, StaticWorkspace, SystemExecutor,
};
use toolwright::{Collaborators, FormatOutcome, HandleOutcome, HostCommand, RunOutcome, Toolwright};

/// Format, test and show coverage for Go sources with their external tools
#[derive(Parser)]
#[command(name = "toolwright")]
#[command(version)]
#[command(about = "Format, test and show coverage for Go sources with their external tools")]
struct Cli {
    /// Project root (default: current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Format a file with gofmt, goimports or goreturns
    Format {
        file: PathBuf,

        /// Formatter tool (default: from configuration)
        #[arg(long)]
        tool: Option<String>,

        /// Write the result back instead of printing it
        #[arg(long)]
        write: bool,
    },
    /// Run the tests of a file's package and show its coverage
    Test { file: PathBuf },
    /// Show the ranges of a coverage report
    Coverage {
        report: PathBuf,

        /// Only show ranges marked on this file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Highlight mode (default: from configuration)
        #[arg(long)]
        mode: Option<CoverageHighlightMode>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let root = match cli.root.map(Ok).unwrap_or_else(std::env::current_dir) {
        Ok(root) => root,
        Err(e) => {
            eprintln!("Error: Could not determine project root: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Commands::Format { file, tool, write } => format(&root, &file, tool, write).await,
        Commands::Test { file } => test(&root, &file).await,
        Commands::Coverage { report, file, mode } => show_coverage(&root, &report, file, mode),
    }
}

fn open_document(file: &Path) -> Option<Arc<FileDocument>> {
    let file = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
    match FileDocument::open(file) {
        Ok(document) => Some(Arc::new(document)),
        Err(e) => {
            eprintln!("Error: {}", e);
            None
        }
    }
}

fn build(root: &Path, document: Arc<FileDocument>) -> Toolwright {
    let outcome = load_settings(Some(root), None);
    for event in &outcome.events {
        event.log();
    }

    let locator: Arc<dyn ToolLocator> = Arc::new(PathLocator::new());
    let executor: Arc<dyn ProcessExecutor> = Arc::new(SystemExecutor::new());
    let installer: Arc<dyn ToolInstaller> = Arc::new(GoInstaller::new(
        Arc::clone(&locator),
        Arc::clone(&executor),
    ));
    let output: Arc<dyn OutputSurface> = Arc::new(ConsoleOutput::new());
    let workspace = Arc::new(StaticWorkspace::new(
        vec![root.display().to_string()],
        vec![document as Arc<dyn Document>],
    ));

    Toolwright::new(
        Collaborators {
            locator,
            executor,
            installer: Some(installer),
            workspace,
            output,
        },
        outcome.settings,
    )
}

async fn format(root: &Path, file: &Path, tool: Option<String>, write: bool) -> ExitCode {
    let Some(document) = open_document(file) else {
        return ExitCode::FAILURE;
    };
    let toolwright = build(root, Arc::clone(&document));
    toolwright.start().await;

    let tool = tool.unwrap_or_else(|| toolwright.settings().format.tool.clone());
    toolwright.format_cache().ensure_available(&tool).await;

    let outcome = match toolwright.handle_command(HostCommand::Format(tool.clone())).await {
        HandleOutcome::Formatted(outcome) => outcome,
        other => {
            eprintln!("Error: nothing to format ({:?})", other);
            return ExitCode::FAILURE;
        }
    };

    match outcome {
        FormatOutcome::Applied { .. } | FormatOutcome::Unchanged => {
            if write {
                if let Err(e) = document.write_back() {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            } else {
                print!("{}", document.text());
            }
            ExitCode::SUCCESS
        }
        FormatOutcome::ToolUnavailable => {
            eprintln!("Error: {} is not available", tool);
            ExitCode::FAILURE
        }
        FormatOutcome::ToolError(stderr) => {
            eprintln!("{}", stderr.trim_end());
            ExitCode::FAILURE
        }
        other => {
            eprintln!("Error: formatting failed ({:?})", other);
            ExitCode::FAILURE
        }
    }
}

async fn test(root: &Path, file: &Path) -> ExitCode {
    let Some(document) = open_document(file) else {
        return ExitCode::FAILURE;
    };
    let toolwright = build(root, Arc::clone(&document));
    toolwright.start().await;

    let outcome = toolwright.handle_command(HostCommand::RunTests).await;
    print_layers(&document);
    toolwright.shutdown();

    match outcome {
        HandleOutcome::Tested(RunOutcome::Passed) => ExitCode::SUCCESS,
        HandleOutcome::Tested(RunOutcome::ToolMissing(tool)) => {
            eprintln!("Error: {} not found", tool);
            ExitCode::FAILURE
        }
        _ => ExitCode::FAILURE,
    }
}

fn show_coverage(
    root: &Path,
    report: &Path,
    file: Option<PathBuf>,
    mode: Option<CoverageHighlightMode>,
) -> ExitCode {
    let ranges = coverage::parse(report);
    let Some(file) = file else {
        for range in &ranges {
            println!(
                "{}:{}.{},{}.{} {} {}",
                range.file.display(),
                range.start_line,
                range.start_column,
                range.end_line,
                range.end_column,
                range.statements,
                range.hits
            );
        }
        return ExitCode::SUCCESS;
    };

    let Some(document) = open_document(&file) else {
        return ExitCode::FAILURE;
    };
    let mode = mode.unwrap_or_else(|| {
        load_settings(Some(root), None)
            .settings
            .test
            .coverage_highlight_mode
    });
    let overlay = CoverageOverlay::new();
    overlay.apply(&ranges, &[Arc::clone(&document) as Arc<dyn Document>], mode);
    print_layers(&document);
    ExitCode::SUCCESS
}

fn print_layers(document: &FileDocument) {
    for layer in document.layers() {
        let class = layer
            .decoration
            .as_ref()
            .map(|decoration| decoration.class.as_str())
            .unwrap_or("unknown");
        for range in &layer.ranges {
            println!(
                "{}\t{}:{}-{}:{}",
                class,
                range.start.line + 1,
                range.start.column + 1,
                range.end.line + 1,
                range.end.column + 1
            );
        }
    }
}
