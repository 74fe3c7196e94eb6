//! Typed model of the JSON emitted by `SASyLF --lsp`.
//!
//! The checker has shipped two output shapes. The current one uses snake_case
//! keys (`quickfixes`, `ast`, `syntax_declarations`, ...) and a list of modules;
//! the legacy one capitalizes everything (`Quickfixes`, `AST`, `"Syntax
//! Declarations"`, `"In File"`) and carries a single `Module` object. Both decode
//! into the same types; [`CheckerOutput::from_json`] folds the legacy module into
//! the module list.

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// One complete checker run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckerOutput {
    #[serde(default, alias = "Quickfixes")]
    pub quickfixes: Vec<QuickfixEntry>,
    #[serde(default, alias = "AST")]
    pub ast: CompilationUnit,
}

impl CheckerOutput {
    pub fn from_json(source: &str) -> Result<Self> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(AnalysisError::EmptyOutput);
        }
        let mut output: CheckerOutput = serde_json::from_str(trimmed)?;
        output.ast.normalize();
        Ok(output)
    }
}

/// Raw checker report before it is split into a diagnostic and a quickfix record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuickfixEntry {
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub error_info: Option<String>,
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub begin_line: u32,
    #[serde(default)]
    pub begin_column: u32,
    #[serde(default)]
    pub end_line: u32,
    #[serde(default)]
    pub end_column: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Theorems")]
    pub theorems: Vec<TheoremNode>,
    #[serde(default, alias = "Modules")]
    pub modules: Vec<ModuleNode>,
    #[serde(default, alias = "Syntax")]
    pub syntax: SyntaxNode,
    #[serde(default, alias = "Judgments")]
    pub judgments: Vec<JudgmentNode>,
    #[serde(default, rename = "Module", skip_serializing)]
    legacy_module: Option<ModuleNode>,
}

impl CompilationUnit {
    /// Moves a legacy single `Module` entry into `modules`, recursively.
    fn normalize(&mut self) {
        if let Some(module) = self.legacy_module.take() {
            if !module.name.is_empty() {
                self.modules.insert(0, module);
            }
        }
        for module in &mut self.modules {
            if let Some(ast) = module.ast.as_deref_mut() {
                ast.normalize();
            }
        }
    }

    /// Rules declared in this file, across all judgments, in declaration order.
    pub fn in_file_rules(&self) -> impl Iterator<Item = &RuleNode> {
        self.judgments
            .iter()
            .flat_map(|judgment| judgment.rules.iter())
            .filter(|rule| rule.in_file)
    }

    /// Finds a rule by name, accepting a `Module.rule` qualification.
    pub fn find_rule(&self, rule_name: &str) -> Option<&RuleNode> {
        if let Some((module_name, local)) = rule_name.split_once('.') {
            let module = self.find_module(module_name)?;
            let file = module.file.as_str();
            return self
                .judgments
                .iter()
                .flat_map(|judgment| judgment.rules.iter())
                .find(|rule| rule.name == local && rule.file == file)
                .or_else(|| module.ast.as_deref().and_then(|ast| ast.find_rule(local)));
        }
        self.judgments
            .iter()
            .flat_map(|judgment| judgment.rules.iter())
            .find(|rule| rule.name == rule_name)
    }

    pub fn find_theorem(&self, name: &str) -> Option<&TheoremNode> {
        self.theorems.iter().find(|theorem| theorem.name == name)
    }

    pub fn find_module(&self, name: &str) -> Option<&ModuleNode> {
        self.modules.iter().find(|module| module.short_name() == name)
    }

    /// Number of premises a rule-like item takes, if it is known.
    pub fn rule_arity(&self, name: &str) -> Option<usize> {
        self.find_theorem(name)
            .map(|theorem| theorem.foralls.len())
            .or_else(|| self.find_rule(name).map(|rule| rule.premises.len()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TheoremNode {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Column")]
    pub column: u32,
    #[serde(default, alias = "Line")]
    pub line: u32,
    #[serde(default, alias = "Kind")]
    pub kind: String,
    #[serde(default, alias = "Foralls")]
    pub foralls: Vec<String>,
    #[serde(default, alias = "Conclusion")]
    pub conclusion: String,
}

impl TheoremNode {
    pub fn is_lemma(&self) -> bool {
        self.kind != "theorem"
    }

    /// Premise lines, a dashed bar, and the conclusion.
    pub fn display_lines(&self) -> Vec<String> {
        display_lines(&self.foralls, &self.name, &self.conclusion)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleNode {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Begin Column")]
    pub begin_column: u32,
    #[serde(default, alias = "End Column")]
    pub end_column: u32,
    #[serde(default, alias = "Begin Line")]
    pub begin_line: u32,
    #[serde(default, alias = "End Line")]
    pub end_line: u32,
    #[serde(default, alias = "File")]
    pub file: String,
    #[serde(default, alias = "AST")]
    pub ast: Option<Box<CompilationUnit>>,
    /// Source of a module that lives outside the workspace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ModuleNode {
    /// The module name without the `: path` suffix the checker sometimes appends.
    pub fn short_name(&self) -> &str {
        match self.name.split_once(':') {
            Some((name, _)) => name.trim(),
            None => self.name.trim(),
        }
    }

    /// Path component of a `"Name: Path"` composite, falling back to `file`.
    pub fn path(&self) -> &str {
        match self.name.split_once(':') {
            Some((_, path)) if !path.trim().is_empty() => path.trim(),
            _ => self.file.as_str(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntaxNode {
    #[serde(default, alias = "Syntax Declarations")]
    pub syntax_declarations: Vec<SyntaxDeclarationNode>,
    #[serde(default, alias = "Sugars")]
    pub sugars: Vec<SyntaxSugarNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntaxDeclarationNode {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Column")]
    pub column: u32,
    #[serde(default, alias = "Line")]
    pub line: u32,
    #[serde(default, alias = "Clauses")]
    pub clauses: Vec<ClauseNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClauseNode {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Column")]
    pub column: u32,
    #[serde(default, alias = "Line")]
    pub line: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyntaxSugarNode {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Column")]
    pub column: u32,
    #[serde(default, alias = "Line")]
    pub line: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JudgmentNode {
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Column")]
    pub column: u32,
    #[serde(default, alias = "Line")]
    pub line: u32,
    #[serde(default, alias = "Form")]
    pub form: String,
    #[serde(default, alias = "Rules")]
    pub rules: Vec<RuleNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleNode {
    #[serde(default, alias = "Premises")]
    pub premises: Vec<String>,
    #[serde(default, alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Conclusion")]
    pub conclusion: String,
    #[serde(default, alias = "In File")]
    pub in_file: bool,
    #[serde(default, alias = "Column")]
    pub column: u32,
    #[serde(default, alias = "Line")]
    pub line: u32,
    #[serde(default, alias = "File")]
    pub file: String,
}

impl RuleNode {
    /// Width of the inference bar: the longest of the premises and conclusion.
    pub fn bar_width(&self) -> usize {
        self.premises
            .iter()
            .map(|premise| premise.chars().count())
            .chain(std::iter::once(self.conclusion.chars().count()))
            .max()
            .unwrap_or(0)
    }

    pub fn display_lines(&self) -> Vec<String> {
        display_lines(&self.premises, &self.name, &self.conclusion)
    }
}

fn display_lines(premises: &[String], name: &str, conclusion: &str) -> Vec<String> {
    let width = premises
        .iter()
        .map(|premise| premise.chars().count())
        .chain(std::iter::once(conclusion.chars().count()))
        .max()
        .unwrap_or(0);
    let mut lines: Vec<String> = premises.to_vec();
    lines.push(format!("{} {}", "-".repeat(width), name));
    lines.push(conclusion.to_string());
    lines
}
