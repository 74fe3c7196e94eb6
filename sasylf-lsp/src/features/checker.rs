//! Invocation of the external SASyLF checker.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::thread;

use thiserror::Error;
use tracing::debug;

use crate::config::CheckerConfig;

pub const LSP_FLAGS: [&str; 2] = ["--lsp", "--stdin"];

#[derive(Debug, Error)]
pub enum CheckerError {
    #[error("failed to start checker `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to send document to checker: {0}")]
    Stdin(#[source] io::Error),
    #[error("checker did not finish: {0}")]
    Wait(#[source] io::Error),
}

pub type CheckerResult<T> = std::result::Result<T, CheckerError>;

/// Runs the checker over a document and returns its raw stdout.
pub trait Checker: Send + Sync + 'static {
    fn check(&self, config: &CheckerConfig, source: &str) -> CheckerResult<String>;
}

/// Spawns `<command> <args> --lsp --stdin` and blocks until it exits.
#[derive(Debug, Default, Clone)]
pub struct ProcessChecker;

impl ProcessChecker {
    pub fn new() -> Self {
        Self
    }
}

impl Checker for ProcessChecker {
    fn check(&self, config: &CheckerConfig, source: &str) -> CheckerResult<String> {
        let mut child = Command::new(&config.command)
            .args(&config.args)
            .args(LSP_FLAGS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| CheckerError::Spawn {
                command: config.display(),
                source,
            })?;

        // stdin is fed from its own thread while stdout and stderr are drained, so a
        // checker that writes before it has read the whole document cannot stall.
        let stdin = child.stdin.take();
        let (written, output) = thread::scope(|scope| {
            let writer = scope.spawn(move || match stdin {
                Some(mut stdin) => stdin.write_all(source.as_bytes()),
                None => Ok(()),
            });
            let output = child.wait_with_output();
            let written = writer
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stdin writer panicked")));
            (written, output)
        });
        let output = output.map_err(CheckerError::Wait)?;
        written.map_err(CheckerError::Stdin)?;
        if !output.stderr.is_empty() {
            debug!(
                stderr = %String::from_utf8_lossy(&output.stderr),
                "checker wrote to stderr"
            );
        }
        debug!(status = %output.status, bytes = output.stdout.len(), "checker finished");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
