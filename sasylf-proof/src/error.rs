//! Failures of proof editing operations.
//!
//! Every variant is something the user caused or the checker refused. None of them
//! leave the tree partially updated, and each one renders to the text of a blocking
//! modal through [`ProofError::modal_text`].

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProofError {
    /// The checker answered with its error list instead of JSON.
    #[error("{}", join_capitalized(.0))]
    Rejected(Vec<String>),
    #[error("rule {rule} takes {expected} premise(s) but {actual} were supplied")]
    ArityMismatch {
        rule: String,
        expected: usize,
        actual: usize,
    },
    #[error("unknown rule {0}")]
    UnknownRule(String),
    #[error("no proof node is mounted at {0}")]
    UnknownTarget(u32),
    #[error("{0}")]
    InvalidDrop(String),
    #[error("derivation of {delivered} cannot replace {expected}")]
    ConclusionMismatch { expected: String, delivered: String },
    #[error("{0} is not a finished derivation")]
    Incomplete(String),
    #[error("free variables are not allowed in {0}")]
    NotFree(String),
    #[error("the proof changed before the checker answered")]
    Stale,
    #[error("failed to run checker `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type ProofResult<T> = std::result::Result<T, ProofError>;

impl ProofError {
    /// Text shown to the user when an operation is refused.
    pub fn modal_text(&self) -> String {
        match self {
            ProofError::Rejected(errors) => join_capitalized(errors),
            other => capitalize(&other.to_string()),
        }
    }
}

fn join_capitalized(errors: &[String]) -> String {
    errors
        .iter()
        .map(|error| capitalize(error))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
