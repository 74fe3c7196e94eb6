//! Finished derivations and their export to checker source.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// One resolved step: a conclusion justified by a rule applied to premises.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationLine {
    pub conclusion: String,
    #[serde(default)]
    pub name: String,
    pub rule: String,
    #[serde(default)]
    pub premises: Vec<DerivationLine>,
}

impl DerivationLine {
    pub fn new(conclusion: impl Into<String>, rule: impl Into<String>) -> Self {
        Self {
            conclusion: conclusion.into(),
            name: String::new(),
            rule: rule.into(),
            premises: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_premises(mut self, premises: Vec<DerivationLine>) -> Self {
        self.premises = premises;
        self
    }

    /// Steps in post-order: every premise comes before the step that uses it.
    pub fn post_order(&self) -> Vec<&DerivationLine> {
        let mut steps = Vec::new();
        collect_post_order(self, &mut steps);
        steps
    }

    pub fn step_count(&self) -> usize {
        1 + self.premises.iter().map(DerivationLine::step_count).sum::<usize>()
    }
}

fn collect_post_order<'a>(line: &'a DerivationLine, steps: &mut Vec<&'a DerivationLine>) {
    for premise in &line.premises {
        collect_post_order(premise, steps);
    }
    steps.push(line);
}

/// One name per step of `steps`, all distinct.
///
/// The first step carrying a user name keeps it. Blank names and later repeats get
/// the first `d<n>` at or after their output position that no step uses.
fn step_names(steps: &[&DerivationLine]) -> Vec<String> {
    let mut taken: HashSet<String> = steps
        .iter()
        .map(|step| step.name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    let mut kept: HashSet<&str> = HashSet::new();

    let mut names = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().enumerate() {
        let given = step.name.trim();
        if !given.is_empty() && kept.insert(given) {
            names.push(given.to_string());
            continue;
        }
        let mut number = index + 1;
        while taken.contains(&format!("d{number}")) {
            number += 1;
        }
        let fresh = format!("d{number}");
        taken.insert(fresh.clone());
        names.push(fresh);
    }
    names
}

/// Renders one theorem.
///
/// Every step gets a distinct name (see [`step_names`]), so every `on` clause
/// refers to a step that was already written.
pub fn create_theorem(name: &str, quantifiers: &str, root: &DerivationLine) -> String {
    let steps = root.post_order();
    let names = step_names(&steps);

    let quantifiers = quantifiers.trim();
    let mut content = if quantifiers.is_empty() {
        format!("theorem {} : exists {}.\n", name.trim(), root.conclusion.trim())
    } else {
        format!(
            "theorem {} : {} exists {}.\n",
            name.trim(),
            quantifiers,
            root.conclusion.trim()
        )
    };

    for (index, step) in steps.iter().enumerate() {
        content.push_str(&format!(
            "{}: {} by rule {}",
            names[index],
            step.conclusion.trim(),
            step.rule.trim()
        ));
        if !step.premises.is_empty() {
            let used: Vec<&str> = step
                .premises
                .iter()
                .map(|premise| {
                    let position = steps
                        .iter()
                        .position(|candidate| std::ptr::eq(*candidate, premise))
                        .unwrap_or(index);
                    names[position].as_str()
                })
                .collect();
            content.push_str(" on ");
            content.push_str(&used.join(", "));
        }
        content.push('\n');
    }
    content
}

/// Writes exported theorems, replacing the file.
pub fn save_theorems(path: &Path, content: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}
