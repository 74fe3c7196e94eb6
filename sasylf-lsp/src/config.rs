use serde_json::Value;

pub const DEFAULT_MAX_PROBLEMS: usize = 1000;
pub const DEFAULT_INDENT_SIZE: u32 = 4;

/// The checker command; the server appends `--lsp --stdin`.
pub use sasylf_analysis::command::CheckerConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct SasylfConfiguration {
    pub checker: CheckerConfig,
    pub max_number_of_problems: usize,
    pub indent_size: u32,
    /// Line terminator used when the client does not report `files.eol`.
    pub eol: Option<String>,
}

impl Default for SasylfConfiguration {
    fn default() -> Self {
        Self {
            checker: CheckerConfig::default(),
            max_number_of_problems: DEFAULT_MAX_PROBLEMS,
            indent_size: DEFAULT_INDENT_SIZE,
            eol: None,
        }
    }
}

impl SasylfConfiguration {
    /// Applies a `didChangeConfiguration` payload. Accepts either the whole settings
    /// object or just its `sasylf` section; unknown keys are ignored.
    pub fn apply(&mut self, settings: &Value) {
        let section = settings.get("sasylf").unwrap_or(settings);

        if let Some(max) = section.get("maxNumberOfProblems").and_then(Value::as_u64) {
            self.max_number_of_problems = max as usize;
        }
        if let Some(checker) = section
            .get("checkerCommand")
            .and_then(Value::as_str)
            .and_then(CheckerConfig::from_command_line)
        {
            self.checker = checker;
        }
        if let Some(size) = section.get("indentSize").and_then(Value::as_u64) {
            self.indent_size = size.min(u32::MAX as u64) as u32;
        }
        if let Some(eol) = section.get("eol").and_then(Value::as_str) {
            self.eol = normalize_eol(eol);
        }
    }
}

/// Maps a `files.eol` style value to a terminator; `auto` and unknown values yield `None`.
pub fn normalize_eol(value: &str) -> Option<String> {
    match value {
        "\n" | "lf" | "LF" => Some("\n".to_string()),
        "\r\n" | "crlf" | "CRLF" => Some("\r\n".to_string()),
        _ => None,
    }
}
