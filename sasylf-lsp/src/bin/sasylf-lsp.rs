use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sasylf_analysis::ast::CheckerOutput;
use sasylf_analysis::diagnostics::collect_diagnostics;
use sasylf_lsp::features::checker::{Checker, ProcessChecker};
use sasylf_lsp::server::{GET_AST_METHOD, VALIDATE_METHOD};
use sasylf_lsp::{CheckerConfig, SasylfConfiguration, SasylfLanguageServer};
use tokio::io::{stdin, stdout};
use tower_lsp::lsp_types::DiagnosticSeverity;
use tower_lsp::{Client, LspService, Server};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type DefaultServer = SasylfLanguageServer<Client, ProcessChecker>;

#[derive(Parser, Debug)]
#[command(name = "sasylf-lsp", version)]
#[command(about = "Language server for the SASyLF proof assistant")]
struct Cli {
    /// Command line that launches the checker; `--lsp --stdin` is appended
    #[arg(long, value_name = "COMMAND")]
    checker: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Check one file and print its diagnostics as JSON
    Check {
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // stdout carries the protocol, so logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = SasylfConfiguration::default();
    if let Some(line) = cli.checker.as_deref() {
        match CheckerConfig::from_command_line(line) {
            Some(checker) => config.checker = checker,
            None => {
                error!("--checker needs a command");
                return ExitCode::FAILURE;
            }
        }
    }

    if let Some(Commands::Check { file }) = cli.command {
        return check_file(&file, &config);
    }

    info!(checker = %config.checker.display(), "starting sasylf-lsp on stdio");
    let (service, socket) = LspService::build(move |client| {
        SasylfLanguageServer::new(client).with_configuration(config)
    })
    .custom_method(GET_AST_METHOD, DefaultServer::get_ast)
    .custom_method(VALIDATE_METHOD, DefaultServer::validate_text_document)
    .finish();
    Server::new(stdin(), stdout(), socket).serve(service).await;
    ExitCode::SUCCESS
}

fn check_file(file: &PathBuf, config: &SasylfConfiguration) -> ExitCode {
    let source = match fs::read_to_string(file) {
        Ok(source) => source,
        Err(err) => {
            error!("cannot read {}: {err}", file.display());
            return ExitCode::FAILURE;
        }
    };

    let stdout = match ProcessChecker::new().check(&config.checker, &source) {
        Ok(stdout) => stdout,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let output = match CheckerOutput::from_json(&stdout) {
        Ok(output) => output,
        Err(err) => {
            error!("{err}");
            eprintln!("{}", stdout.trim());
            return ExitCode::FAILURE;
        }
    };

    let checked = collect_diagnostics(&output.quickfixes, config.max_number_of_problems);
    match serde_json::to_string_pretty(&checked.diagnostics) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            error!("cannot encode diagnostics: {err}");
            return ExitCode::FAILURE;
        }
    }

    let has_errors = checked
        .diagnostics
        .iter()
        .any(|diagnostic| diagnostic.severity == Some(DiagnosticSeverity::ERROR));
    if has_errors {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
