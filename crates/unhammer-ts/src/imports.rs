//! Per-file import indexing and cross-file symbol resolution.
//!
//! A local identifier only means something once it is traced back to the
//! module that originally exported it: `import { Config } from './shared'`
//! where `shared.ts` says `export { GestureConfig as Config } from
//! '@angular/material'` must resolve to `GestureConfig @ @angular/material`.
//! [`Project::resolve_reference`] follows such re-export chains through
//! relative specifiers; bare (package) specifiers terminate the walk.

use std::collections::{BTreeMap, HashMap};

use crate::ast::{ImportClause, NodeArena, NodeId, NodeKind};
use crate::parser::parse;

/// Resolved origin of a binding: the exported symbol and its module.
///
/// A namespace import binds the whole module; its symbol is `"*"`. A default
/// import binds `"default"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportData {
    pub symbol_name: String,
    pub module_name: String,
}

impl ImportData {
    pub fn new(symbol: impl Into<String>, module: impl Into<String>) -> Self {
        ImportData {
            symbol_name: symbol.into(),
            module_name: module.into(),
        }
    }
}

/// One local name introduced by an import statement.
#[derive(Debug, Clone)]
pub struct ImportBinding {
    pub local: String,
    pub data: ImportData,
    /// The `ImportDecl` node.
    pub decl: NodeId,
    /// The `ImportSpecifier` node for named imports; `None` for default and
    /// namespace bindings.
    pub specifier: Option<NodeId>,
}

/// Everything one file's import/export statements say.
#[derive(Debug, Default)]
pub struct ImportIndex {
    /// Local name to binding.
    pub bindings: HashMap<String, ImportBinding>,
    /// All `ImportDecl` nodes in document order.
    pub decls: Vec<NodeId>,
    /// `(exported_name, original_name, module)` triples from `export {} from`.
    pub reexports: Vec<(String, String, String)>,
}

impl ImportIndex {
    /// Build the index from a parsed file.
    pub fn build(arena: &NodeArena) -> Self {
        let mut index = ImportIndex::default();
        for &child in &arena.get(arena.root()).children {
            match &arena.get(child).kind {
                NodeKind::ImportDecl { module, clause } => {
                    index.decls.push(child);
                    match clause {
                        ImportClause::SideEffect => {}
                        ImportClause::Namespace { local } => {
                            index.bindings.insert(
                                local.clone(),
                                ImportBinding {
                                    local: local.clone(),
                                    data: ImportData::new("*", module.clone()),
                                    decl: child,
                                    specifier: None,
                                },
                            );
                        }
                        ImportClause::Default { local } => {
                            index.bindings.insert(
                                local.clone(),
                                ImportBinding {
                                    local: local.clone(),
                                    data: ImportData::new("default", module.clone()),
                                    decl: child,
                                    specifier: None,
                                },
                            );
                        }
                        ImportClause::Named => {}
                    }
                    for &spec in &arena.get(child).children {
                        if let NodeKind::ImportSpecifier { imported, local } =
                            &arena.get(spec).kind
                        {
                            index.bindings.insert(
                                local.clone(),
                                ImportBinding {
                                    local: local.clone(),
                                    data: ImportData::new(imported.clone(), module.clone()),
                                    decl: child,
                                    specifier: Some(spec),
                                },
                            );
                        }
                    }
                }
                NodeKind::ExportFrom { module, names } => {
                    for (original, exported) in names {
                        index
                            .reexports
                            .push((exported.clone(), original.clone(), module.clone()));
                    }
                }
                _ => {}
            }
        }
        index
    }
}

/// One parsed file: source text, tree and import index.
#[derive(Debug)]
pub struct SourceUnit {
    pub path: String,
    pub source: String,
    pub arena: NodeArena,
    pub imports: ImportIndex,
}

impl SourceUnit {
    pub fn parse(path: impl Into<String>, source: impl Into<String>) -> Self {
        let path = path.into();
        let source = source.into();
        let arena = parse(&source);
        let imports = ImportIndex::build(&arena);
        SourceUnit {
            path,
            source,
            arena,
            imports,
        }
    }
}

/// Re-export chains are bounded; deeper ones are treated as unresolved.
const MAX_ALIAS_DEPTH: usize = 16;

/// A set of parsed files addressable by normalized relative path.
#[derive(Debug, Default)]
pub struct Project {
    units: BTreeMap<String, SourceUnit>,
}

impl Project {
    pub fn new() -> Self {
        Project::default()
    }

    pub fn add_unit(&mut self, unit: SourceUnit) {
        self.units.insert(unit.path.clone(), unit);
    }

    pub fn get(&self, path: &str) -> Option<&SourceUnit> {
        self.units.get(path)
    }

    pub fn units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.units.values()
    }

    /// Resolve a relative specifier against a file of this project.
    ///
    /// Tries `<spec>.ts` and `<spec>/index.ts`; returns the path of the unit
    /// that exists.
    pub fn resolve_module(&self, from: &str, spec: &str) -> Option<String> {
        let base = join_relative(from, spec)?;
        for candidate in [format!("{}.ts", base), format!("{}/index.ts", base), base] {
            if self.units.contains_key(&candidate) {
                return Some(candidate);
            }
        }
        None
    }

    /// Resolve a local name in `file` to its originally exported symbol.
    ///
    /// Follows named re-exports through relative specifiers until a bare
    /// module specifier (or a dead end) is reached. Returns `None` when the
    /// name is not import-bound in `file`.
    pub fn resolve_reference(&self, file: &str, local: &str) -> Option<ImportData> {
        let binding = self.units.get(file)?.imports.bindings.get(local)?;
        Some(self.unwrap_alias(file, binding.data.clone()))
    }

    fn unwrap_alias(&self, file: &str, mut data: ImportData) -> ImportData {
        let mut current_file = file.to_string();
        for _ in 0..MAX_ALIAS_DEPTH {
            if !data.module_name.starts_with('.') {
                return data;
            }
            let Some(target) = self.resolve_module(&current_file, &data.module_name) else {
                return data;
            };
            let Some(unit) = self.units.get(&target) else {
                return data;
            };
            let Some((_, original, module)) = unit
                .imports
                .reexports
                .iter()
                .find(|(exported, _, _)| *exported == data.symbol_name)
            else {
                return data;
            };
            data = ImportData::new(original.clone(), module.clone());
            current_file = target;
        }
        data
    }
}

/// Join a relative specifier onto the directory of `from`. Returns `None`
/// when the specifier escapes the project root.
fn join_relative(from: &str, spec: &str) -> Option<String> {
    if !spec.starts_with('.') {
        return None;
    }
    let mut parts: Vec<&str> = from.split('/').collect();
    parts.pop();
    for seg in spec.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

/// Build the specifier that imports `to_file` from `from_file`.
///
/// The `.ts` extension is dropped and a `./` prefix added when the target is
/// not reached through a parent directory.
pub fn relative_import(from_file: &str, to_file: &str) -> String {
    let from_dir: Vec<&str> = {
        let mut p: Vec<&str> = from_file.split('/').collect();
        p.pop();
        p
    };
    let target = to_file.strip_suffix(".ts").unwrap_or(to_file);
    let to_parts: Vec<&str> = target.split('/').collect();

    let mut common = 0;
    while common < from_dir.len()
        && common + 1 < to_parts.len()
        && from_dir[common] == to_parts[common]
    {
        common += 1;
    }

    let ups = from_dir.len() - common;
    let mut spec = String::new();
    if ups == 0 {
        spec.push_str("./");
    } else {
        for _ in 0..ups {
            spec.push_str("../");
        }
    }
    spec.push_str(&to_parts[common..].join("/"));
    spec
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_bindings_resolve_locally() {
        let mut project = Project::new();
        project.add_unit(SourceUnit::parse(
            "src/app.ts",
            "import { GestureConfig as GC } from '@angular/material/core';\n",
        ));
        assert_eq!(
            project.resolve_reference("src/app.ts", "GC"),
            Some(ImportData::new("GestureConfig", "@angular/material/core"))
        );
        assert_eq!(project.resolve_reference("src/app.ts", "GestureConfig"), None);
    }

    #[test]
    fn namespace_import_binds_star() {
        let mut project = Project::new();
        project.add_unit(SourceUnit::parse(
            "src/a.ts",
            "import * as hammer from 'hammerjs';\n",
        ));
        assert_eq!(
            project.resolve_reference("src/a.ts", "hammer"),
            Some(ImportData::new("*", "hammerjs"))
        );
    }

    #[test]
    fn alias_unwraps_through_reexport_chain() {
        let mut project = Project::new();
        project.add_unit(SourceUnit::parse(
            "src/shared/index.ts",
            "export { Config as AppConfig } from './config';\n",
        ));
        project.add_unit(SourceUnit::parse(
            "src/shared/config.ts",
            "export { GestureConfig as Config } from '@angular/material/core';\n",
        ));
        project.add_unit(SourceUnit::parse(
            "src/app.ts",
            "import { AppConfig } from './shared';\n",
        ));
        assert_eq!(
            project.resolve_reference("src/app.ts", "AppConfig"),
            Some(ImportData::new("GestureConfig", "@angular/material/core"))
        );
    }

    #[test]
    fn unresolved_chain_keeps_last_known_origin() {
        let mut project = Project::new();
        project.add_unit(SourceUnit::parse(
            "src/app.ts",
            "import { Thing } from './missing';\n",
        ));
        assert_eq!(
            project.resolve_reference("src/app.ts", "Thing"),
            Some(ImportData::new("Thing", "./missing"))
        );
    }

    #[test]
    fn module_resolution_tries_index_files() {
        let mut project = Project::new();
        project.add_unit(SourceUnit::parse("src/lib/index.ts", ""));
        project.add_unit(SourceUnit::parse("src/main.ts", ""));
        assert_eq!(
            project.resolve_module("src/main.ts", "./lib"),
            Some("src/lib/index.ts".to_string())
        );
        assert_eq!(project.resolve_module("src/main.ts", "hammerjs"), None);
    }

    #[test]
    fn relative_import_specifiers() {
        assert_eq!(
            relative_import("src/app/app.module.ts", "src/app/gesture-config.ts"),
            "./gesture-config"
        );
        assert_eq!(
            relative_import("src/app/feature/page.ts", "src/app/gesture-config.ts"),
            "../gesture-config"
        );
        assert_eq!(
            relative_import("src/main.ts", "src/app/gesture-config.ts"),
            "./app/gesture-config"
        );
    }
}
