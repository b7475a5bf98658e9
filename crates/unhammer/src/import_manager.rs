//! Batched import-list editing.
//!
//! Strategies request symbol additions and binding deletions while they walk
//! and rewrite code; nothing touches an import statement until
//! [`ImportManager::record_changes`] runs exactly once at the end of the
//! target. Additions merge into a surviving import from the same module when
//! one exists, removals delete the named binding with comma cleanup or the
//! whole declaration once it carries no bindings.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;
use unhammer_core::recorder::Span;
use unhammer_core::tree::FileTree;
use unhammer_ts::ast::{ImportClause, NodeId, NodeKind};
use unhammer_ts::imports::{ImportData, Project, SourceUnit};

#[derive(Debug, Clone)]
struct PendingImport {
    symbol: String,
    alias: String,
    module: String,
}

impl PendingImport {
    fn specifier_text(&self) -> String {
        if self.symbol == self.alias {
            self.symbol.clone()
        } else {
            format!("{} as {}", self.symbol, self.alias)
        }
    }
}

/// Per-run batch of import edits, keyed by file.
#[derive(Debug, Default)]
pub struct ImportManager {
    additions: BTreeMap<String, Vec<PendingImport>>,
    removals: BTreeMap<String, Vec<ImportData>>,
}

impl ImportManager {
    pub fn new() -> Self {
        ImportManager::default()
    }

    /// Request that `symbol` from `module` be importable in `file`; returns
    /// the local alias to splice into expressions.
    ///
    /// Aliases avoid every identifier already present in the file except
    /// those in `ignore` (bindings scheduled for deletion must not force a
    /// rename). Repeated requests for the same symbol return the same alias.
    pub fn add_import(
        &mut self,
        project: &Project,
        file: &str,
        symbol: &str,
        module: &str,
        ignore: &HashSet<String>,
    ) -> String {
        if let Some(pending) = self.additions.get(file) {
            if let Some(existing) = pending
                .iter()
                .find(|p| p.symbol == symbol && p.module == module)
            {
                return existing.alias.clone();
            }
        }

        let unit = project.get(file);

        // Reuse an existing binding for the exact same origin.
        if let Some(unit) = unit {
            let scheduled = self.removals.get(file);
            for binding in unit.imports.bindings.values() {
                if binding.data.symbol_name == symbol
                    && binding.data.module_name == module
                    && !ignore.contains(&binding.local)
                {
                    let resolved = project
                        .resolve_reference(file, &binding.local)
                        .unwrap_or_else(|| binding.data.clone());
                    let doomed = scheduled
                        .map(|list| list.contains(&resolved))
                        .unwrap_or(false);
                    if !doomed {
                        return binding.local.clone();
                    }
                }
            }
        }

        let mut used: HashSet<String> = HashSet::new();
        if let Some(unit) = unit {
            collect_used_names(unit, &mut used);
        }
        if let Some(pending) = self.additions.get(file) {
            for import in pending {
                used.insert(import.alias.clone());
            }
        }
        for name in ignore {
            used.remove(name);
        }

        let mut alias = symbol.to_string();
        let mut counter = 1;
        while used.contains(&alias) {
            alias = format!("{}_{}", symbol, counter);
            counter += 1;
        }

        self.additions.entry(file.to_string()).or_default().push(PendingImport {
            symbol: symbol.to_string(),
            alias: alias.clone(),
            module: module.to_string(),
        });
        alias
    }

    /// Request deletion of every binding in `file` whose resolved origin is
    /// `symbol` from `module`.
    pub fn delete_named_binding(&mut self, file: &str, symbol: &str, module: &str) {
        self.removals
            .entry(file.to_string())
            .or_default()
            .push(ImportData::new(symbol, module));
    }

    /// Record every batched addition and removal into the tree's edit
    /// recorders. Consumes the batch; a second call is a no-op.
    pub fn record_changes(&mut self, project: &Project, tree: &mut FileTree) {
        let additions = std::mem::take(&mut self.additions);
        let removals = std::mem::take(&mut self.removals);

        let mut files: Vec<&String> = additions.keys().chain(removals.keys()).collect();
        files.sort();
        files.dedup();

        for file in files {
            let Some(unit) = project.get(file) else {
                continue;
            };
            let doomed = removals.get(file.as_str()).cloned().unwrap_or_default();
            let pending = additions.get(file.as_str()).cloned().unwrap_or_default();
            self.record_file(project, unit, &doomed, &pending, tree);
        }
    }

    fn record_file(
        &self,
        project: &Project,
        unit: &SourceUnit,
        doomed: &[ImportData],
        pending: &[PendingImport],
        tree: &mut FileTree,
    ) {
        let arena = &unit.arena;
        let source = &unit.source;

        // Which specifier/decl nodes are scheduled for removal. Bindings are
        // matched by their alias-unwrapped origin so re-exported names are
        // found too.
        let mut doomed_specs: HashSet<NodeId> = HashSet::new();
        let mut doomed_decls: HashSet<NodeId> = HashSet::new();
        for binding in unit.imports.bindings.values() {
            let resolved = project
                .resolve_reference(&unit.path, &binding.local)
                .unwrap_or_else(|| binding.data.clone());
            let matched = doomed.iter().any(|d| &resolved == d);
            if !matched {
                continue;
            }
            match binding.specifier {
                Some(spec) => {
                    doomed_specs.insert(spec);
                }
                // Default/namespace bindings cannot be removed piecemeal.
                None => {
                    doomed_decls.insert(binding.decl);
                }
            }
        }

        let recorder = tree.edit(&unit.path);

        // Per declaration: full removal or comma-correct specifier removal.
        let mut surviving_decl_end: Option<usize> = None;
        let mut merge_targets: BTreeMap<String, usize> = BTreeMap::new();
        for &decl in &unit.imports.decls {
            let node = arena.get(decl);
            let NodeKind::ImportDecl { module, clause } = &node.kind else {
                continue;
            };
            let specs: Vec<NodeId> = node
                .children
                .iter()
                .copied()
                .filter(|&c| matches!(arena.get(c).kind, NodeKind::ImportSpecifier { .. }))
                .collect();
            let removed: Vec<usize> = specs
                .iter()
                .enumerate()
                .filter(|(_, s)| doomed_specs.contains(s))
                .map(|(i, _)| i)
                .collect();

            let whole_decl = doomed_decls.contains(&decl)
                || (*clause == ImportClause::Named && !specs.is_empty() && removed.len() == specs.len());
            if whole_decl {
                recorder.remove_span(extend_past_newline(source, node.span));
                continue;
            }

            if !removed.is_empty() {
                let spans: Vec<Span> = specs.iter().map(|&s| arena.get(s).span).collect();
                recorder.remove_list_elements(source, &spans, &removed);
            }

            surviving_decl_end = Some(
                surviving_decl_end
                    .map(|e| e.max(node.span.end))
                    .unwrap_or(node.span.end),
            );
            // The last kept specifier is where merged additions land.
            if *clause == ImportClause::Named {
                if let Some(last_kept) = specs
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| !removed.contains(i))
                    .map(|(_, &s)| arena.get(s).span.end)
                    .last()
                {
                    merge_targets.entry(module.clone()).or_insert(last_kept);
                }
            }
        }

        // Additions: merge or append new statements.
        let mut by_module: BTreeMap<&str, Vec<&PendingImport>> = BTreeMap::new();
        for p in pending {
            by_module.entry(p.module.as_str()).or_default().push(p);
        }
        for (module, imports) in by_module {
            if let Some(&pos) = merge_targets.get(module) {
                for import in imports {
                    recorder.insert_right(pos, format!(", {}", import.specifier_text()));
                }
                continue;
            }
            let specifiers: Vec<String> =
                imports.iter().map(|p| p.specifier_text()).collect();
            let statement = format!("import {{{}}} from '{}';", specifiers.join(", "), module);
            match surviving_decl_end {
                Some(pos) => recorder.insert_right(pos, format!("\n{}", statement)),
                None => recorder.insert_right(0, format!("{}\n", statement)),
            }
        }
        debug!(file = %unit.path, "recorded import changes");
    }
}

/// Extend a statement span over the line break that follows it.
pub(crate) fn extend_past_newline(source: &str, span: Span) -> Span {
    let bytes = source.as_bytes();
    let mut end = span.end;
    if end < bytes.len() && bytes[end] == b'\r' {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'\n' {
        end += 1;
    }
    Span::new(span.start, end)
}

fn collect_used_names(unit: &SourceUnit, used: &mut HashSet<String>) {
    for i in 0..unit.arena.len() {
        let id = NodeId(i as u32);
        match &unit.arena.get(id).kind {
            NodeKind::Identifier { name } => {
                used.insert(name.clone());
            }
            NodeKind::ImportSpecifier { local, .. } => {
                used.insert(local.clone());
            }
            NodeKind::ImportDecl { clause, .. } => match clause {
                ImportClause::Namespace { local } | ImportClause::Default { local } => {
                    used.insert(local.clone());
                }
                _ => {}
            },
            _ => {}
        }
    }
}
