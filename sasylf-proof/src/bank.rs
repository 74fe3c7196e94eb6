use sasylf_analysis::ast::{CompilationUnit, JudgmentNode, RuleNode, TheoremNode};
use serde::Serialize;

/// A draggable rule-like block. `name` is what lands on a rule target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankEntry {
    pub name: String,
    pub lines: Vec<String>,
    pub arity: usize,
}

impl BankEntry {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgmentGroup {
    pub header: String,
    pub rules: Vec<BankEntry>,
}

/// Theorems and judgment rules of a compilation unit, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleBank {
    pub theorems: Vec<BankEntry>,
    pub judgments: Vec<JudgmentGroup>,
}

impl RuleBank {
    pub fn from_unit(unit: &CompilationUnit) -> Self {
        Self {
            theorems: unit.theorems.iter().map(theorem_entry).collect(),
            judgments: unit.judgments.iter().map(judgment_group).collect(),
        }
    }

    pub fn find(&self, name: &str) -> Option<&BankEntry> {
        self.theorems
            .iter()
            .chain(self.judgments.iter().flat_map(|group| group.rules.iter()))
            .find(|entry| entry.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.theorems.is_empty() && self.judgments.iter().all(|group| group.rules.is_empty())
    }
}

fn theorem_entry(theorem: &TheoremNode) -> BankEntry {
    BankEntry {
        name: theorem.name.clone(),
        lines: theorem.display_lines(),
        arity: theorem.foralls.len(),
    }
}

fn rule_entry(rule: &RuleNode) -> BankEntry {
    BankEntry {
        name: rule.name.clone(),
        lines: rule.display_lines(),
        arity: rule.premises.len(),
    }
}

fn judgment_group(judgment: &JudgmentNode) -> JudgmentGroup {
    JudgmentGroup {
        header: format!("judgment {}: {}", judgment.name, judgment.form),
        rules: judgment.rules.iter().map(rule_entry).collect(),
    }
}
