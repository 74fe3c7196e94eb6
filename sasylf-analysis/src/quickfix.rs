//! Quickfix synthesis for checker error reports.
//!
//! The checker tags each error with an error type and an `error_info` payload
//! whose meaning depends on the type (usually newline-separated old/new text).
//! [`synthesize`] turns one record into zero or more edit proposals against the
//! current document text. Proposals are never applied here.

use std::fmt;

use lsp_types::{Position, Range};
use tracing::debug;

use crate::ast::CompilationUnit;
use crate::utils::{is_single_line, leading_whitespace, line_span, utf16_len, TextIndex};

/// Error tags the checker attaches to reports.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ErrorType {
    AbstractNotPermittedHere,
    IllegalAssumes,
    ExtraneousAssumes,
    RuleNotTheorem,
    TheoremNotRule,
    TheoremKindWrong,
    TheoremKindMissing,
    InductionRepeat,
    WrongEnd,
    WrongModuleName,
    PartialCaseAnalysis,
    WrongPackage,
    MissingAssumes,
    AssumedAssumes,
    MissingCase,
    OtherJustified,
    RuleConclusionContradiction,
    DerivationNotFound,
    CaseRedundant,
    CaseUnnecessary,
    Unknown(String),
}

impl From<&str> for ErrorType {
    fn from(tag: &str) -> Self {
        match tag {
            "ABSTRACT_NOT_PERMITTED_HERE" => Self::AbstractNotPermittedHere,
            "ILLEGAL_ASSUMES" => Self::IllegalAssumes,
            "EXTRANEOUS_ASSUMES" => Self::ExtraneousAssumes,
            "RULE_NOT_THEOREM" => Self::RuleNotTheorem,
            "THEOREM_NOT_RULE" => Self::TheoremNotRule,
            "THEOREM_KIND_WRONG" => Self::TheoremKindWrong,
            "THEOREM_KIND_MISSING" => Self::TheoremKindMissing,
            "INDUCTION_REPEAT" => Self::InductionRepeat,
            "WRONG_END" => Self::WrongEnd,
            "WRONG_MODULE_NAME" => Self::WrongModuleName,
            "PARTIAL_CASE_ANALYSIS" => Self::PartialCaseAnalysis,
            "WRONG_PACKAGE" => Self::WrongPackage,
            "MISSING_ASSUMES" => Self::MissingAssumes,
            "ASSUMED_ASSUMES" => Self::AssumedAssumes,
            "MISSING_CASE" => Self::MissingCase,
            "OTHER_JUSTIFIED" => Self::OtherJustified,
            "RULE_CONCLUSION_CONTRADICTION" => Self::RuleConclusionContradiction,
            "DERIVATION_NOT_FOUND" => Self::DerivationNotFound,
            "CASE_REDUNDANT" => Self::CaseRedundant,
            "CASE_UNNECESSARY" => Self::CaseUnnecessary,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::AbstractNotPermittedHere => "ABSTRACT_NOT_PERMITTED_HERE",
            Self::IllegalAssumes => "ILLEGAL_ASSUMES",
            Self::ExtraneousAssumes => "EXTRANEOUS_ASSUMES",
            Self::RuleNotTheorem => "RULE_NOT_THEOREM",
            Self::TheoremNotRule => "THEOREM_NOT_RULE",
            Self::TheoremKindWrong => "THEOREM_KIND_WRONG",
            Self::TheoremKindMissing => "THEOREM_KIND_MISSING",
            Self::InductionRepeat => "INDUCTION_REPEAT",
            Self::WrongEnd => "WRONG_END",
            Self::WrongModuleName => "WRONG_MODULE_NAME",
            Self::PartialCaseAnalysis => "PARTIAL_CASE_ANALYSIS",
            Self::WrongPackage => "WRONG_PACKAGE",
            Self::MissingAssumes => "MISSING_ASSUMES",
            Self::AssumedAssumes => "ASSUMED_ASSUMES",
            Self::MissingCase => "MISSING_CASE",
            Self::OtherJustified => "OTHER_JUSTIFIED",
            Self::RuleConclusionContradiction => "RULE_CONCLUSION_CONTRADICTION",
            Self::DerivationNotFound => "DERIVATION_NOT_FOUND",
            Self::CaseRedundant => "CASE_REDUNDANT",
            Self::CaseUnnecessary => "CASE_UNNECESSARY",
            Self::Unknown(tag) => tag.as_str(),
        };
        f.write_str(tag)
    }
}

/// Fix data kept for one error diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickfixRecord {
    pub error_type: ErrorType,
    pub error_info: String,
    pub range: Range,
}

/// Editor formatting preferences used for inserted text.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatSettings {
    pub eol: String,
    pub indent_size: u32,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            eol: "\n".to_string(),
            indent_size: 4,
        }
    }
}

impl FormatSettings {
    /// One indentation level; sizes outside 0..=8 fall back to four spaces.
    pub fn indent_unit(&self) -> String {
        if self.indent_size <= 8 {
            " ".repeat(self.indent_size as usize)
        } else {
            "    ".to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickfixEdit {
    pub range: Range,
    pub new_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuickfixProposal {
    pub title: String,
    pub edits: Vec<QuickfixEdit>,
}

impl QuickfixProposal {
    fn single(title: String, range: Range, new_text: impl Into<String>) -> Self {
        Self {
            title,
            edits: vec![QuickfixEdit {
                range,
                new_text: new_text.into(),
            }],
        }
    }
}

struct FixContext<'a> {
    index: TextIndex<'a>,
    line: u32,
    line_text: &'a str,
    line_indent: &'a str,
    indent: String,
    eol: &'a str,
    info: &'a str,
    split: Vec<&'a str>,
    old: Option<Range>,
}

impl<'a> FixContext<'a> {
    fn whole_line(&self) -> Range {
        Range::new(
            Position::new(self.line, 0),
            Position::new(self.line, utf16_len(self.line_text)),
        )
    }

    fn first(&self) -> &'a str {
        self.split.first().copied().unwrap_or("")
    }

    fn second(&self) -> Option<&'a str> {
        self.split.get(1).copied()
    }

    /// Edit inserting `body` (which ends with a line terminator) as the line after the
    /// diagnostic line.
    fn insert_after(&self, body: String) -> (Range, String) {
        if self.index.is_last_line(self.line) {
            let end = Position::new(self.line, utf16_len(self.line_text));
            let trimmed = body.strip_suffix(self.eol).unwrap_or(&body);
            (Range::new(end, end), format!("{}{}", self.eol, trimmed))
        } else {
            let start = Position::new(self.line + 1, 0);
            (Range::new(start, start), body)
        }
    }
}

/// Builds the edit proposals for one quickfix record.
///
/// Returns nothing for multi-line records, empty payloads, informational error
/// types, unknown tags, and whenever the text the fix anchors on cannot be found.
pub fn synthesize(
    source: &str,
    record: &QuickfixRecord,
    unit: Option<&CompilationUnit>,
    settings: &FormatSettings,
) -> Vec<QuickfixProposal> {
    if !is_single_line(&record.range) {
        debug!(error_type = %record.error_type, "multi-line error, skipping quickfix");
        return Vec::new();
    }
    if record.error_info.is_empty() {
        return Vec::new();
    }

    let index = TextIndex::new(source);
    let line = record.range.start.line;
    let Some(line_text) = index.line_text(line) else {
        return Vec::new();
    };
    let info = record.error_info.as_str();
    let split: Vec<&str> = info
        .split('\n')
        .map(|part| part.strip_suffix('\r').unwrap_or(part))
        .collect();
    let old = locate(line, line_text, split.first().copied().unwrap_or(""));

    let ctx = FixContext {
        index,
        line,
        line_text,
        line_indent: leading_whitespace(line_text),
        indent: settings.indent_unit(),
        eol: settings.eol.as_str(),
        info,
        split,
        old,
    };

    match &record.error_type {
        ErrorType::AbstractNotPermittedHere
        | ErrorType::IllegalAssumes
        | ErrorType::ExtraneousAssumes => remove_or_replace(&ctx),
        ErrorType::RuleNotTheorem
        | ErrorType::TheoremNotRule
        | ErrorType::TheoremKindWrong
        | ErrorType::TheoremKindMissing
        | ErrorType::InductionRepeat
        | ErrorType::WrongEnd
        | ErrorType::WrongModuleName
        | ErrorType::PartialCaseAnalysis => replace_token(&ctx).into_iter().collect(),
        ErrorType::WrongPackage => wrong_package(&ctx),
        ErrorType::MissingAssumes => vec![insert_assumes(&ctx, "")],
        ErrorType::AssumedAssumes => vec![insert_assumes(&ctx, &ctx.indent)],
        ErrorType::MissingCase => missing_case(&ctx, unit).into_iter().collect(),
        ErrorType::OtherJustified => other_justified(&ctx).into_iter().collect(),
        ErrorType::RuleConclusionContradiction => {
            conclusion_contradiction(&ctx).into_iter().collect()
        }
        ErrorType::DerivationNotFound => derivation_not_found(&ctx, record.range),
        ErrorType::CaseRedundant | ErrorType::CaseUnnecessary => Vec::new(),
        ErrorType::Unknown(tag) => {
            debug!(tag = %tag, "no quickfix for error type");
            Vec::new()
        }
    }
}

/// Span of `needle` within the line; a whitespace-insensitive whole-line match is
/// accepted as a fallback.
fn locate(line: u32, line_text: &str, needle: &str) -> Option<Range> {
    if needle.is_empty() {
        return None;
    }
    if let Some(start) = line_text.find(needle) {
        return Some(line_span(line, line_text, start, needle.len()));
    }
    if needle.trim() == line_text.trim() {
        return Some(line_span(line, line_text, 0, line_text.len()));
    }
    None
}

fn replace_token(ctx: &FixContext<'_>) -> Option<QuickfixProposal> {
    let old = ctx.old?;
    let replacement = ctx.second().filter(|text| !text.is_empty())?;
    Some(QuickfixProposal::single(
        format!("replace '{}' with '{}'", ctx.first(), replacement),
        old,
        replacement,
    ))
}

fn remove_or_replace(ctx: &FixContext<'_>) -> Vec<QuickfixProposal> {
    let Some(old) = ctx.old else {
        return Vec::new();
    };
    match replace_token(ctx) {
        Some(replace) => vec![replace],
        None => vec![QuickfixProposal::single(
            format!("remove '{}'", ctx.first()),
            old,
            "",
        )],
    }
}

fn wrong_package(ctx: &FixContext<'_>) -> Vec<QuickfixProposal> {
    let mut proposals = Vec::new();
    if ctx.first().is_empty() {
        if let Some(package) = ctx.second().filter(|text| !text.is_empty()) {
            let (range, text) = ctx.insert_after(format!("{package}{}", ctx.eol));
            proposals.push(QuickfixProposal::single(
                format!("insert '{package}'"),
                range,
                text,
            ));
        }
    }
    if let (Some(old), Some(replacement)) = (ctx.old, ctx.second()) {
        if replacement.is_empty() {
            proposals.push(QuickfixProposal::single(
                format!("remove '{}'", ctx.first()),
                old,
                "",
            ));
        } else {
            proposals.push(QuickfixProposal::single(
                format!("replace '{}' with '{}'", ctx.first(), replacement),
                old,
                replacement,
            ));
        }
    }
    proposals
}

fn insert_assumes(ctx: &FixContext<'_>, extra_indent: &str) -> QuickfixProposal {
    let body = format!("{}{}{}{}", ctx.line_indent, extra_indent, ctx.info, ctx.eol);
    let (range, text) = ctx.insert_after(body);
    QuickfixProposal::single(format!("insert '{}'", ctx.info), range, text)
}

fn missing_case(ctx: &FixContext<'_>, unit: Option<&CompilationUnit>) -> Option<QuickfixProposal> {
    let cases = if ctx.info.contains("\n\n") || ctx.info.contains("\r\n\r\n") {
        rule_cases(ctx, unit)
    } else {
        syntax_cases(ctx)
    };
    if cases.is_empty() {
        return None;
    }

    if ctx.line_text.contains("by contradiction on")
        && !ctx.line_text.contains("by case analysis on")
    {
        let parts: Vec<&str> = ctx.line_text.split_whitespace().collect();
        let count = parts.len();
        if count <= 3 || parts[count - 2] != "on" {
            return None;
        }
        let target = parts[count - 1];
        let start = ctx.line_text.find("by contradiction on")? + "by ".len();
        let range = Range::new(
            line_span(ctx.line, ctx.line_text, start, 0).start,
            Position::new(ctx.line, utf16_len(ctx.line_text)),
        );
        let text = format!(
            "case analysis on {target}:{eol}{cases}{indent}end case analysis",
            eol = ctx.eol,
            indent = ctx.line_indent,
        );
        return Some(QuickfixProposal::single(
            "convert to case analysis with missing case(s)".to_string(),
            range,
            text,
        ));
    }

    let (range, text) = ctx.insert_after(cases);
    Some(QuickfixProposal::single(
        "insert missing case(s)".to_string(),
        range,
        text,
    ))
}

fn syntax_cases(ctx: &FixContext<'_>) -> String {
    let outer = format!("{}{}", ctx.line_indent, ctx.indent);
    let inner = format!("{outer}{}", ctx.indent);
    let eol = ctx.eol;
    let count = ctx.split.len().saturating_sub(1);
    let mut cases = String::new();
    for label in &ctx.split[..count] {
        cases.push_str(&format!(
            "{outer}case {label} is{eol}{inner}proof by unproved{eol}{outer}end case{eol}{eol}"
        ));
    }
    cases
}

fn rule_cases(ctx: &FixContext<'_>, unit: Option<&CompilationUnit>) -> String {
    let outer = format!("{}{}", ctx.line_indent, ctx.indent);
    let inner = format!("{outer}{}", ctx.indent);
    let eol = ctx.eol;
    let count = ctx.split.len().saturating_sub(1);
    let mut cases = String::new();
    let mut start_case = true;
    for entry in &ctx.split[..count] {
        if start_case {
            cases.push_str(&format!("{outer}case rule{eol}"));
            start_case = false;
        }
        if entry.is_empty() {
            cases.push_str(&format!(
                "{outer}is{eol}{inner}proof by unproved{eol}{outer}end case{eol}{eol}"
            ));
            start_case = true;
            continue;
        }
        if entry.starts_with("---") {
            cases.push_str(&format!("{inner}{}{eol}", rule_bar(entry, unit)));
        } else {
            cases.push_str(&format!("{inner}_: {entry}{eol}"));
        }
    }
    cases
}

/// Rebuilds a `--- rule-name` line with a bar as wide as the rule's own.
fn rule_bar(entry: &str, unit: Option<&CompilationUnit>) -> String {
    let Some(rule_name) = entry.split(' ').nth(1) else {
        return entry.to_string();
    };
    let Some(rule) = unit.and_then(|unit| unit.find_rule(rule_name)) else {
        return entry.to_string();
    };
    let bar = "-".repeat(rule.bar_width());
    if bar.len() < 3 {
        return entry.to_string();
    }
    // Premise lines are prefixed with "_: ", so widen the bar to cover them.
    format!("------{bar} {rule_name}")
}

fn other_justified(ctx: &FixContext<'_>) -> Option<QuickfixProposal> {
    let pattern = ctx.first();
    let replacement = ctx.second()?;
    let hole = pattern.find("...")?;
    let head = &pattern[..hole];
    let tail = &pattern[hole + 3..];
    let found = ctx.line_text.find(head)?;
    let interior_start = found + head.len();
    let interior_end = interior_start + ctx.line_text[interior_start..].find(tail)?;
    let old_text = &ctx.line_text[interior_start..interior_end];
    let new_text = format!(" {replacement}");
    Some(QuickfixProposal::single(
        format!("replace '{old_text}' with '{new_text}'"),
        line_span(ctx.line, ctx.line_text, interior_start, old_text.len()),
        new_text,
    ))
}

fn conclusion_contradiction(ctx: &FixContext<'_>) -> Option<QuickfixProposal> {
    let by = ctx.line_text.find(" by ")?;
    let start = ctx.line_indent.len();
    if by < start {
        return None;
    }
    let old_text = &ctx.line_text[start..by];
    Some(QuickfixProposal::single(
        format!("replace '{old_text}' with '_: contradiction'"),
        line_span(ctx.line, ctx.line_text, start, old_text.len()),
        "_: contradiction",
    ))
}

fn derivation_not_found(ctx: &FixContext<'_>, use_range: Range) -> Vec<QuickfixProposal> {
    let declaration = ctx.first();
    let Some(colon) = declaration.find(':') else {
        return vec![QuickfixProposal::single(
            format!("replace '{}' with '{declaration}'", ctx.line_text),
            ctx.whole_line(),
            declaration,
        )];
    };
    let def_name = &declaration[..colon];
    let use_name = ctx.index.text_in(use_range);

    let distance = ctx
        .second()
        .and_then(|text| text.trim().parse::<u32>().ok())
        .unwrap_or(0);
    let target_line = ctx.line.saturating_sub(distance);
    let insert_at = Position::new(target_line, 0);

    let mut edits = vec![QuickfixEdit {
        range: Range::new(insert_at, insert_at),
        new_text: format!(
            "{}{declaration} by unproved{}",
            ctx.line_indent, ctx.eol
        ),
    }];
    let mut extra = String::new();
    if def_name != use_name && use_name == "_" {
        extra = format!(", and replace '_' with '{def_name}'");
        edits.push(QuickfixEdit {
            range: use_range,
            new_text: def_name.to_string(),
        });
    }

    vec![QuickfixProposal {
        title: format!("insert '{declaration} by unproved' before this line{extra}"),
        edits,
    }]
}
