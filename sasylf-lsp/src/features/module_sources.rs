//! Locations for definitions that live in imported modules.
//!
//! A module the checker resolved from its library carries its source as embedded
//! text. Such sources are written below a scratch directory and handed to the
//! editor as `temporary:` URIs, which the client extension reads back from disk.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use sasylf_analysis::ast::ModuleNode;
use tower_lsp::lsp_types::Url;
use tracing::debug;

pub const TEMPORARY_SCHEME: &str = "temporary";

#[derive(Debug, Clone)]
pub struct ModuleSources {
    root: PathBuf,
}

impl Default for ModuleSources {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join("sasylf-lsp"))
    }
}

impl ModuleSources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// URI for a module's source. Embedded text is materialized first; otherwise
    /// the module path is resolved next to `document`.
    pub fn locate(&self, module: &ModuleNode, document: &Url) -> io::Result<Option<Url>> {
        if let Some(text) = module.text.as_deref() {
            let path = self.materialize(module, text)?;
            return Ok(temporary_uri(&path));
        }
        Ok(sibling_uri(document, module.path()))
    }

    fn materialize(&self, module: &ModuleNode, text: &str) -> io::Result<PathBuf> {
        let relative = sanitized_relative(module.path())
            .unwrap_or_else(|| PathBuf::from(format!("{}.slf", module.short_name())));
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, text)?;
        debug!(path = %path.display(), "materialized module source");
        Ok(path)
    }
}

/// Keeps only normal components so embedded paths cannot escape the scratch root.
fn sanitized_relative(path: &str) -> Option<PathBuf> {
    let relative: PathBuf = Path::new(path)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    if relative.as_os_str().is_empty() {
        None
    } else {
        Some(relative)
    }
}

fn temporary_uri(path: &Path) -> Option<Url> {
    let file = Url::from_file_path(path).ok()?;
    Url::parse(&format!("{TEMPORARY_SCHEME}:{}", file.path())).ok()
}

fn sibling_uri(document: &Url, module_path: &str) -> Option<Url> {
    if module_path.is_empty() {
        return None;
    }
    let target = Path::new(module_path);
    if target.is_absolute() {
        return Url::from_file_path(target).ok();
    }
    document.join(module_path).ok()
}
