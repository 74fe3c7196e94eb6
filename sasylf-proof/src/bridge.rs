//! Requests the proof editor sends to the checker.
//!
//! The checker is run once per request with one of three flag sets:
//!
//! - `--parse=<conclusion> --rule=<rule> <file>` answers `{"arguments": [...]}`
//! - `--premises=<json> --rule=<rule> <file>` answers `{"conclusion": [c]}`
//! - `--substitute=<text> --old=<var> --new=<term> <file>` answers `{"result": r}`
//!
//! Anything on stdout that is not JSON is the checker's error list for the file.
//! A JSON object without the expected key means the request itself was refused.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use sasylf_analysis::command::CheckerConfig;
use serde_json::{json, Value};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ProofError, ProofResult};

#[async_trait]
pub trait ProofBridge: Send + Sync + 'static {
    /// Premises a rule needs to conclude `conclusion`.
    async fn parse(&self, conclusion: &str, rule: &str, file: &Path) -> ProofResult<Vec<String>>;

    /// Conclusion a rule yields from the given premises.
    async fn topdown_parse(&self, premises: &[String], rule: &str, file: &Path)
        -> ProofResult<String>;

    /// `text` with `old` replaced by `new`; `None` when `old` is not free in `text`.
    async fn substitute(
        &self,
        text: &str,
        old: &str,
        new: &str,
        file: &Path,
    ) -> ProofResult<Option<String>>;
}

/// Runs the checker as a subprocess for every request.
#[derive(Debug, Clone, Default)]
pub struct CheckerBridge {
    checker: CheckerConfig,
}

impl From<CheckerConfig> for CheckerBridge {
    fn from(checker: CheckerConfig) -> Self {
        Self { checker }
    }
}

impl CheckerBridge {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        CheckerConfig::new(command, args).into()
    }

    pub fn from_command_line(line: &str) -> Option<Self> {
        CheckerConfig::from_command_line(line).map(Self::from)
    }

    pub fn checker(&self) -> &CheckerConfig {
        &self.checker
    }

    async fn run(&self, flags: Vec<String>, file: &Path) -> ProofResult<String> {
        debug!(
            checker = %self.checker.display(),
            ?flags,
            file = %file.display(),
            "proof request"
        );
        let output = Command::new(&self.checker.command)
            .args(&self.checker.args)
            .args(&flags)
            .arg(file)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| ProofError::Spawn {
                command: self.checker.display(),
                source,
            })?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if stdout.trim().is_empty() {
            // Nothing on stdout; whatever the checker said on stderr is the reason.
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            return Err(ProofError::Rejected(error_lines(
                &stderr,
                "the checker produced no output",
            )));
        }
        Ok(stdout)
    }
}

#[async_trait]
impl ProofBridge for CheckerBridge {
    async fn parse(&self, conclusion: &str, rule: &str, file: &Path) -> ProofResult<Vec<String>> {
        let flags = vec![format!("--parse={conclusion}"), format!("--rule={rule}")];
        let stdout = self.run(flags, file).await?;
        parse_arguments(&stdout, conclusion, rule)
    }

    async fn topdown_parse(
        &self,
        premises: &[String],
        rule: &str,
        file: &Path,
    ) -> ProofResult<String> {
        let payload = json!({ "premises": premises });
        let flags = vec![format!("--premises={payload}"), format!("--rule={rule}")];
        let stdout = self.run(flags, file).await?;
        parse_conclusion(&stdout, rule)
    }

    async fn substitute(
        &self,
        text: &str,
        old: &str,
        new: &str,
        file: &Path,
    ) -> ProofResult<Option<String>> {
        let flags = vec![
            format!("--substitute={text}"),
            format!("--old={old}"),
            format!("--new={new}"),
        ];
        let stdout = self.run(flags, file).await?;
        parse_substitution(&stdout)
    }
}

/// Decodes the answer to `--parse`.
pub fn parse_arguments(stdout: &str, conclusion: &str, rule: &str) -> ProofResult<Vec<String>> {
    let value = decode(stdout)?;
    match value.get("arguments").and_then(Value::as_array) {
        Some(arguments) => Ok(arguments
            .iter()
            .map(|argument| match argument {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect()),
        None => {
            warn!(rule, conclusion, "checker refused rule application");
            Err(ProofError::Rejected(vec![format!(
                "rule {rule} cannot conclude {conclusion}"
            )]))
        }
    }
}

/// Decodes the answer to `--premises`.
pub fn parse_conclusion(stdout: &str, rule: &str) -> ProofResult<String> {
    let value = decode(stdout)?;
    let conclusion = value
        .get("conclusion")
        .and_then(Value::as_array)
        .and_then(|conclusions| conclusions.first())
        .and_then(Value::as_str);
    match conclusion {
        Some(conclusion) => Ok(conclusion.to_string()),
        None => {
            warn!(rule, "checker refused premises");
            Err(ProofError::Rejected(vec![format!(
                "rule {rule} does not apply to these premises"
            )]))
        }
    }
}

/// Decodes the answer to `--substitute`.
pub fn parse_substitution(stdout: &str) -> ProofResult<Option<String>> {
    let value = decode(stdout)?;
    Ok(value
        .get("result")
        .and_then(Value::as_str)
        .map(str::to_string))
}

fn decode(stdout: &str) -> ProofResult<Value> {
    let trimmed = stdout.trim();
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) if value.is_object() => Ok(value),
        _ => Err(ProofError::Rejected(error_lines(
            trimmed,
            "the checker produced no output",
        ))),
    }
}

fn error_lines(text: &str, fallback: &str) -> Vec<String> {
    let lines: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if lines.is_empty() {
        vec![fallback.to_string()]
    } else {
        lines
    }
}
