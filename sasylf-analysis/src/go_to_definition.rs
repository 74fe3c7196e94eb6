use lsp_types::{Position, Range};

use crate::ast::{CompilationUnit, ModuleNode};
use crate::utils::{from_one_based, utf16_len};

/// Where a name is declared. `module` is set when the declaration lives in an
/// imported module rather than the current document.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionTarget<'a> {
    pub module: Option<&'a ModuleNode>,
    pub range: Range,
}

/// Resolves a theorem or rule name, optionally qualified as `Module.name`.
///
/// Theorems win over rules; only rules declared in the searched file count.
pub fn resolve_definition<'a>(
    unit: &'a CompilationUnit,
    word: &str,
) -> Option<DefinitionTarget<'a>> {
    if let Some((module_name, local)) = word.split_once('.') {
        let module = unit.find_module(module_name)?;
        let nested = module.ast.as_deref()?;
        let range = local_declaration(nested, local)?;
        return Some(DefinitionTarget {
            module: Some(module),
            range,
        });
    }
    local_declaration(unit, word).map(|range| DefinitionTarget {
        module: None,
        range,
    })
}

fn local_declaration(unit: &CompilationUnit, name: &str) -> Option<Range> {
    if let Some(theorem) = unit.find_theorem(name) {
        return Some(declaration_range(theorem.line, theorem.column, &theorem.name));
    }
    unit.in_file_rules()
        .find(|rule| rule.name == name)
        .map(|rule| declaration_range(rule.line, rule.column, &rule.name))
}

fn declaration_range(line: u32, column: u32, name: &str) -> Range {
    let start = from_one_based(line, column);
    Range::new(start, Position::new(start.line, start.character + utf16_len(name)))
}
