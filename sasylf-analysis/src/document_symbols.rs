use lsp_types::{Position, Range, SymbolKind};

use crate::ast::{CompilationUnit, ModuleNode, RuleNode, TheoremNode};
use crate::utils::{from_one_based, utf16_len};

#[derive(Debug, Clone, PartialEq)]
pub struct SasylfDocumentSymbol {
    pub name: String,
    pub detail: Option<String>,
    pub kind: SymbolKind,
    pub range: Range,
    pub selection_range: Range,
    pub children: Vec<SasylfDocumentSymbol>,
}

/// Outline of a compilation unit: modules, syntax, sugars, theorems, then judgments.
pub fn collect_document_symbols(unit: &CompilationUnit) -> Vec<SasylfDocumentSymbol> {
    let mut symbols: Vec<SasylfDocumentSymbol> = unit
        .modules
        .iter()
        .filter(|module| !module.name.is_empty())
        .map(module_symbol)
        .collect();

    for declaration in &unit.syntax.syntax_declarations {
        let children = declaration
            .clauses
            .iter()
            .map(|clause| {
                leaf(&clause.name, None, SymbolKind::KEY, clause.line, clause.column)
            })
            .collect();
        symbols.push(SasylfDocumentSymbol {
            children,
            ..leaf(
                &declaration.name,
                None,
                SymbolKind::STRING,
                declaration.line,
                declaration.column,
            )
        });
    }

    symbols.extend(unit.syntax.sugars.iter().map(|sugar| {
        let name = sugar.name.strip_suffix('\n').unwrap_or(&sugar.name);
        let name = name.strip_suffix('\r').unwrap_or(name);
        leaf(name, None, SymbolKind::STRING, sugar.line, sugar.column)
    }));

    symbols.extend(unit.theorems.iter().map(theorem_symbol));

    for judgment in &unit.judgments {
        let children = judgment
            .rules
            .iter()
            .filter(|rule| rule.in_file)
            .map(rule_symbol)
            .collect();
        symbols.push(SasylfDocumentSymbol {
            children,
            ..leaf(
                &judgment.name,
                Some(judgment.form.clone()),
                SymbolKind::VARIABLE,
                judgment.line,
                judgment.column,
            )
        });
    }

    symbols
}

/// `∀premise...∃conclusion` summary shown next to theorems and rules.
pub fn quantifier_detail(premises: &[String], conclusion: &str) -> String {
    let mut detail: String = premises.iter().map(|premise| format!("∀{premise}")).collect();
    detail.push('∃');
    detail.push_str(conclusion);
    detail
}

fn module_symbol(module: &ModuleNode) -> SasylfDocumentSymbol {
    let range = Range::new(
        from_one_based(module.begin_line, module.begin_column),
        from_one_based(module.end_line, module.end_column),
    );
    let path = module.path();
    SasylfDocumentSymbol {
        name: module.short_name().to_string(),
        detail: (!path.is_empty()).then(|| path.to_string()),
        kind: SymbolKind::MODULE,
        range,
        selection_range: range,
        children: Vec::new(),
    }
}

fn theorem_symbol(theorem: &TheoremNode) -> SasylfDocumentSymbol {
    let kind = if theorem.is_lemma() {
        SymbolKind::STRUCT
    } else {
        SymbolKind::CLASS
    };
    leaf(
        &theorem.name,
        Some(quantifier_detail(&theorem.foralls, &theorem.conclusion)),
        kind,
        theorem.line,
        theorem.column,
    )
}

fn rule_symbol(rule: &RuleNode) -> SasylfDocumentSymbol {
    leaf(
        &rule.name,
        Some(quantifier_detail(&rule.premises, &rule.conclusion)),
        SymbolKind::PROPERTY,
        rule.line,
        rule.column,
    )
}

fn leaf(
    name: &str,
    detail: Option<String>,
    kind: SymbolKind,
    line: u32,
    column: u32,
) -> SasylfDocumentSymbol {
    let range = name_range(from_one_based(line, column), name);
    SasylfDocumentSymbol {
        name: name.to_string(),
        detail,
        kind,
        range,
        selection_range: range,
        children: Vec::new(),
    }
}

fn name_range(start: Position, name: &str) -> Range {
    let width = name.lines().next().map(utf16_len).unwrap_or(0);
    Range::new(start, Position::new(start.line, start.character + width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_unit;

    fn find<'a>(symbols: &'a [SasylfDocumentSymbol], name: &str) -> &'a SasylfDocumentSymbol {
        symbols
            .iter()
            .find(|symbol| symbol.name == name)
            .unwrap_or_else(|| panic!("missing symbol {name}"))
    }

    #[test]
    fn outline_orders_sections() {
        let symbols = collect_document_symbols(&sample_unit());
        let kinds: Vec<SymbolKind> = symbols.iter().map(|symbol| symbol.kind).collect();
        let first_theorem = kinds
            .iter()
            .position(|kind| *kind == SymbolKind::CLASS || *kind == SymbolKind::STRUCT)
            .unwrap();
        let first_judgment = kinds
            .iter()
            .position(|kind| *kind == SymbolKind::VARIABLE)
            .unwrap();
        assert_eq!(kinds[0], SymbolKind::MODULE);
        assert!(first_theorem < first_judgment);
    }

    #[test]
    fn module_symbol_uses_short_name_and_path() {
        let symbols = collect_document_symbols(&sample_unit());
        let module = &symbols[0];
        assert_eq!(module.name, "Nat");
        assert_eq!(module.detail.as_deref(), Some("org/sasylf/util/Nat.slf"));
        assert_eq!(module.range.start, Position::new(0, 0));
    }

    #[test]
    fn syntax_declarations_nest_clauses() {
        let symbols = collect_document_symbols(&sample_unit());
        let declaration = find(&symbols, "n");
        assert_eq!(declaration.kind, SymbolKind::STRING);
        let clauses: Vec<&str> = declaration
            .children
            .iter()
            .map(|clause| clause.name.as_str())
            .collect();
        assert_eq!(clauses, vec!["z", "s n"]);
        assert!(declaration
            .children
            .iter()
            .all(|clause| clause.kind == SymbolKind::KEY));
    }

    #[test]
    fn sugar_names_drop_trailing_newline() {
        let symbols = collect_document_symbols(&sample_unit());
        let sugar = find(&symbols, "1 := s z");
        assert_eq!(sugar.kind, SymbolKind::STRING);
    }

    #[test]
    fn theorems_and_lemmas_use_distinct_kinds() {
        let symbols = collect_document_symbols(&sample_unit());
        let theorem = find(&symbols, "plus-total");
        assert_eq!(theorem.kind, SymbolKind::CLASS);
        assert_eq!(
            theorem.detail.as_deref(),
            Some("∀n1∀n2∃n1 + n2 = n3")
        );
        assert_eq!(theorem.selection_range.start, Position::new(21, 8));
        assert_eq!(find(&symbols, "plus-z-right").kind, SymbolKind::STRUCT);
    }

    #[test]
    fn judgments_list_only_in_file_rules() {
        let symbols = collect_document_symbols(&sample_unit());
        let judgment = find(&symbols, "plus");
        assert_eq!(judgment.kind, SymbolKind::VARIABLE);
        assert_eq!(judgment.detail.as_deref(), Some("n + n = n"));
        let rules: Vec<&str> = judgment
            .children
            .iter()
            .map(|rule| rule.name.as_str())
            .collect();
        assert_eq!(rules, vec!["plus-z", "plus-s"]);
        assert_eq!(
            judgment.children[1].detail.as_deref(),
            Some("∀n1 + n2 = n3∃s n1 + n2 = s n3")
        );
        assert!(find(&symbols, "equal").children.is_empty());
    }
}
