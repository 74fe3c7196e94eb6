/// How to launch the SASyLF checker: a program and the arguments placed before any
/// request flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckerConfig {
    pub command: String,
    pub args: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            command: "java".to_string(),
            args: vec!["-jar".to_string(), "SASyLF.jar".to_string()],
        }
    }
}

impl CheckerConfig {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Splits a shell-style command line on whitespace. Returns `None` when empty.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let command = parts.next()?;
        Some(Self::new(command, parts.collect()))
    }

    pub fn display(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_round_trips_for_display() {
        let checker = CheckerConfig::from_command_line("java -jar SASyLF.jar").unwrap();
        assert_eq!(checker, CheckerConfig::default());
        assert_eq!(checker.display(), "java -jar SASyLF.jar");
    }

    #[test]
    fn blank_command_line_is_rejected() {
        assert!(CheckerConfig::from_command_line(" \t ").is_none());
        let checker = CheckerConfig::from_command_line("  sasylf   --verbose ").unwrap();
        assert_eq!(checker.args, vec!["--verbose"]);
    }
}
