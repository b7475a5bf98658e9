//! Per-target migration driver.
//!
//! A target is migrated in two phases. The collect phase parses every source
//! file once, gathers facts and picks a strategy; it records no edits. The
//! mutate phase records deferred edits (reference removals, rewrites, module
//! wiring) against the file tree, commits imports exactly once, applies all
//! recorders, and finally remaps failure offsets through the displacement
//! ledgers into line/column diagnostics.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use unhammer_core::error::TreeError;
use unhammer_core::recorder::Span;
use unhammer_core::text::offset_to_position;
use unhammer_core::tree::FileTree;
use unhammer_ts::ast::{NodeArena, NodeId, NodeKind};
use unhammer_ts::imports::{relative_import, Project, SourceUnit};

use crate::coordinator::{GlobalUsageState, ManifestError};
use crate::decision::{decide, DecisionInput, MigrationStrategy};
use crate::events::find_hammer_scripts;
use crate::facts::{
    collect_facts, custom_config_provided, looks_like_provider_declaration, IdentifierReference,
    TargetFacts, GESTURE_CONFIG_CLASS, HAMMER_CONFIG_TOKEN, HAMMER_MODULE_NAME,
    PLATFORM_BROWSER_MODULE,
};
use crate::gesture_config::{gesture_config_path, GESTURE_CONFIG_TEMPLATE};
use crate::import_manager::{extend_past_newline, ImportManager};

// ============================================================================
// Reporting types
// ============================================================================

/// Fatal engine failures. Per-reference problems are diagnostics, not errors.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

/// 1-indexed line/character position.
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

/// A position-correct message about something the migration could not do.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub file_path: String,
    pub position: Position,
    pub severity: Severity,
    pub message: String,
}

/// A failure captured during analysis or mutation, at a pre-edit offset.
/// Remapped through the displacement ledger after commit.
#[derive(Debug, Clone)]
pub struct NodeFailure {
    pub file: String,
    pub offset: usize,
    pub severity: Severity,
    pub message: String,
}

/// One migratable application within the loaded tree.
#[derive(Debug, Clone)]
pub struct MigrationTarget {
    pub name: String,
    /// The file that calls `bootstrapModule`.
    pub entry_file: String,
    /// Directory prefix of the target's sources ("" for the tree root).
    pub source_root: String,
    /// Entry-point HTML documents, candidates for `<script>` stripping.
    pub index_files: Vec<String>,
}

/// Outcome of one target migration.
#[derive(Debug, Serialize)]
pub struct TargetReport {
    pub target: String,
    pub strategy: &'static str,
    pub changed_files: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

// ============================================================================
// Target discovery
// ============================================================================

/// Find targets in the loaded tree: every directory with a `main.ts` entry
/// file is one target; an `index.html` next to it is its entry-point HTML.
pub fn discover_targets(tree: &FileTree) -> Vec<MigrationTarget> {
    let mut targets = Vec::new();
    for path in tree.paths_with_extension("ts") {
        if path != "main.ts" && !path.ends_with("/main.ts") {
            continue;
        }
        let source_root = match path.rfind('/') {
            Some(pos) => path[..pos].to_string(),
            None => String::new(),
        };
        let index = if source_root.is_empty() {
            "index.html".to_string()
        } else {
            format!("{}/index.html", source_root)
        };
        let index_files = if tree.exists(&index) { vec![index] } else { Vec::new() };
        let name = if source_root.is_empty() {
            ".".to_string()
        } else {
            source_root.clone()
        };
        targets.push(MigrationTarget {
            name,
            entry_file: path,
            source_root,
            index_files,
        });
    }
    targets
}

fn in_target(path: &str, target: &MigrationTarget) -> bool {
    target.source_root.is_empty() || path.starts_with(&format!("{}/", target.source_root))
}

// ============================================================================
// Driver
// ============================================================================

/// Migrate one target against the shared tree and global state.
pub fn migrate_target(
    tree: &mut FileTree,
    global: &mut GlobalUsageState,
    target: &MigrationTarget,
) -> Result<TargetReport, MigrationError> {
    info!(target = %target.name, "migrating target");

    let mut project = Project::new();
    for path in tree.paths_with_extension("ts") {
        if in_target(&path, target) {
            let source = tree.read(&path).unwrap_or("").to_string();
            project.add_unit(SourceUnit::parse(path, source));
        }
    }
    let mut templates = Vec::new();
    for path in tree.paths_with_extension("html") {
        if in_target(&path, target) {
            templates.push((path.clone(), tree.read(&path).unwrap_or("").to_string()));
        }
    }

    let facts = collect_facts(&project, &templates);
    let input = DecisionInput {
        custom_config_provided: custom_config_provided(&project, &facts),
        custom_events_used: !facts.template_usage.custom.is_empty(),
        standard_events_used: !facts.template_usage.standard.is_empty(),
        used_at_runtime: facts.used_at_runtime,
    };
    let strategy = decide(&input);
    info!(strategy = strategy.as_str(), "selected strategy");

    if strategy != MigrationStrategy::RemoveUnused {
        global.mark_used();
    }

    let mut mutator = Mutator {
        tree,
        project: &project,
        target,
        facts: &facts,
        imports: ImportManager::new(),
        failures: Vec::new(),
        array_removals: BTreeMap::new(),
        created: Vec::new(),
    };
    match strategy {
        MigrationStrategy::KeepCustomConfig => mutator.keep_custom_config(),
        MigrationStrategy::CopyGestureConfig => mutator.copy_gesture_config(),
        MigrationStrategy::RegisterHammerModule => mutator.register_hammer_module(),
        MigrationStrategy::RuntimeOnly => mutator.runtime_only(),
        MigrationStrategy::RemoveUnused => mutator.remove_unused(),
    }
    mutator.flush_array_removals();

    let failures = std::mem::take(&mut mutator.failures);
    let mut imports = std::mem::take(&mut mutator.imports);
    let mut changed_files = std::mem::take(&mut mutator.created);
    drop(mutator);

    imports.record_changes(&project, tree);
    changed_files.extend(tree.commit_edits()?);

    let diagnostics = failures
        .into_iter()
        .map(|failure| {
            let offset = tree.displacement(&failure.file, failure.offset);
            let content = tree.read(&failure.file).unwrap_or("");
            let (line, character) = offset_to_position(content, offset);
            Diagnostic {
                file_path: failure.file,
                position: Position { line, character },
                severity: failure.severity,
                message: failure.message,
            }
        })
        .collect();

    Ok(TargetReport {
        target: target.name.clone(),
        strategy: strategy.as_str(),
        changed_files,
        diagnostics,
    })
}

// ============================================================================
// Mutator
// ============================================================================

struct Mutator<'a> {
    tree: &'a mut FileTree,
    project: &'a Project,
    target: &'a MigrationTarget,
    facts: &'a TargetFacts,
    imports: ImportManager,
    failures: Vec<NodeFailure>,
    /// Element indices to delete, grouped per array literal so duplicate
    /// requests for the same element collapse into one removal.
    array_removals: BTreeMap<(String, NodeId), BTreeSet<usize>>,
    created: Vec<String>,
}

impl Mutator<'_> {
    // --------------------------------------------------------------
    // Strategies
    // --------------------------------------------------------------

    fn keep_custom_config(&mut self) {
        if !self.facts.template_usage.is_empty() {
            for file in self.facts.event_files.clone() {
                self.failures.push(NodeFailure {
                    file,
                    offset: 0,
                    severity: Severity::Info,
                    message: "A custom HammerJS gesture config is provided, so the bound \
                              gesture events cannot be verified automatically. Please check \
                              that the custom config handles them."
                        .to_string(),
                });
            }
            return;
        }
        // No events bound anywhere: library gesture config references are
        // stale.
        for reference in self.facts.config_refs.clone() {
            self.remove_reference(&reference);
        }
        self.flush_array_removals();
        self.cleanup_token_imports();
    }

    fn copy_gesture_config(&mut self) {
        let path = gesture_config_path(self.tree, &self.target.source_root);
        self.tree.create(&path, GESTURE_CONFIG_TEMPLATE);
        self.created.push(path.clone());
        debug!(path = %path, "copied gesture config");

        // Locals of bindings scheduled for deletion must not force renames.
        let refs = self.facts.config_refs.clone();
        let mut ignore_by_file: HashMap<String, HashSet<String>> = HashMap::new();
        for reference in refs.iter().filter(|r| r.is_import) {
            if let Some(local) = self.binding_local(reference) {
                ignore_by_file
                    .entry(reference.file.clone())
                    .or_default()
                    .insert(local);
            }
            self.imports.delete_named_binding(
                &reference.file,
                &reference.import_data.symbol_name,
                &reference.import_data.module_name,
            );
        }
        for reference in refs.iter().filter(|r| !r.is_import) {
            let ignore = ignore_by_file
                .get(&reference.file)
                .cloned()
                .unwrap_or_default();
            let module = relative_import(&reference.file, &path);
            let alias = self.imports.add_import(
                self.project,
                &reference.file,
                GESTURE_CONFIG_CLASS,
                &module,
                &ignore,
            );
            self.tree.edit(&reference.file).replace_span(reference.span, alias);
        }

        self.ensure_hammer_installed();

        match self.find_root_module() {
            Some((file, metadata)) => {
                self.ensure_module_registration(&file, metadata);
                if !self.has_existing_token_provider() {
                    let ignore = ignore_by_file.get(&file).cloned().unwrap_or_default();
                    let config_module = relative_import(&file, &path);
                    let config_alias = self.imports.add_import(
                        self.project,
                        &file,
                        GESTURE_CONFIG_CLASS,
                        &config_module,
                        &ignore,
                    );
                    let token_alias = self.imports.add_import(
                        self.project,
                        &file,
                        HAMMER_CONFIG_TOKEN,
                        PLATFORM_BROWSER_MODULE,
                        &ignore,
                    );
                    let provider =
                        format!("{{provide: {}, useClass: {}}}", token_alias, config_alias);
                    self.add_to_metadata_array(&file, metadata, "providers", &provider);
                }
            }
            None => self.report_missing_root(),
        }
    }

    fn register_hammer_module(&mut self) {
        // Standard events need no gesture config at all.
        for reference in self.facts.config_refs.clone() {
            self.remove_reference(&reference);
        }
        self.flush_array_removals();
        self.cleanup_token_imports();
        self.ensure_hammer_installed();
        match self.find_root_module() {
            Some((file, metadata)) => self.ensure_module_registration(&file, metadata),
            None => self.report_missing_root(),
        }
    }

    fn runtime_only(&mut self) {
        // No gesture events are bound; all gesture wiring is dead weight.
        // Programmatic library use stays untouched.
        self.remove_all_marker_refs();
    }

    fn remove_unused(&mut self) {
        self.remove_all_marker_refs();
        self.flush_array_removals();
        for (file, span) in self.facts.install_imports.clone() {
            let extended = match self.tree.read(&file) {
                Some(source) => extend_past_newline(source, span),
                None => span,
            };
            self.tree.edit(&file).remove_span(extended);
        }
        for index in self.target.index_files.clone() {
            let spans: Vec<Span> = match self.tree.read(&index) {
                Some(html) => find_hammer_scripts(html),
                None => continue,
            };
            let recorder = self.tree.edit(&index);
            for span in spans {
                recorder.remove_span(span);
            }
        }
    }

    // --------------------------------------------------------------
    // Shared operations
    // --------------------------------------------------------------

    fn remove_all_marker_refs(&mut self) {
        let mut refs = self.facts.config_refs.clone();
        refs.extend(self.facts.token_refs.clone());
        refs.extend(self.facts.module_refs.clone());
        for reference in refs {
            self.remove_reference(&reference);
        }
    }

    /// Delete one reference: import bindings go through the import manager,
    /// array elements through comma-correct list removal, and anything else
    /// is replaced with a placeholder plus a diagnostic.
    fn remove_reference(&mut self, reference: &IdentifierReference) {
        if reference.is_import {
            self.imports.delete_named_binding(
                &reference.file,
                &reference.import_data.symbol_name,
                &reference.import_data.module_name,
            );
            return;
        }
        let Some(unit) = self.project.get(&reference.file) else {
            return;
        };
        let arena = &unit.arena;

        // Climb to the node whose parent is an array literal, if any.
        let mut element = None;
        let mut current = reference.node;
        loop {
            let Some(parent) = arena.get(current).parent else {
                break;
            };
            if matches!(arena.get(parent).kind, NodeKind::ArrayLiteral) {
                element = Some((parent, current));
                break;
            }
            current = parent;
        }

        match element {
            Some((array, elem)) => {
                let index = arena
                    .get(array)
                    .children
                    .iter()
                    .position(|&c| c == elem)
                    .unwrap_or(0);
                self.array_removals
                    .entry((reference.file.clone(), array))
                    .or_default()
                    .insert(index);
            }
            None => {
                self.failures.push(NodeFailure {
                    file: reference.file.clone(),
                    offset: reference.span.start,
                    severity: Severity::Warning,
                    message: format!(
                        "Unable to delete this reference to `{}` automatically. \
                         Please clean it up manually.",
                        reference.import_data.symbol_name
                    ),
                });
                self.tree
                    .edit(&reference.file)
                    .replace_span(reference.span, "undefined /* TODO: remove */");
            }
        }
    }

    fn flush_array_removals(&mut self) {
        let removals = std::mem::take(&mut self.array_removals);
        for ((file, array), indices) in removals {
            let Some(unit) = self.project.get(&file) else {
                continue;
            };
            let spans: Vec<Span> = unit
                .arena
                .get(array)
                .children
                .iter()
                .map(|&c| unit.arena.get(c).span)
                .collect();
            let indices: Vec<usize> = indices.into_iter().collect();
            self.tree
                .edit(&file)
                .remove_list_elements(&unit.source, &spans, &indices);
        }
    }

    /// Drop DI token import bindings whose every use site was removed.
    fn cleanup_token_imports(&mut self) {
        let refs = self.facts.token_refs.clone();
        for import_ref in refs.iter().filter(|r| r.is_import) {
            let mut survivor = false;
            for use_ref in refs.iter().filter(|u| !u.is_import && u.file == import_ref.file) {
                if !self.tree.edit(&use_ref.file).offset_removed(use_ref.span.start) {
                    survivor = true;
                    break;
                }
            }
            if !survivor {
                self.imports.delete_named_binding(
                    &import_ref.file,
                    &import_ref.import_data.symbol_name,
                    &import_ref.import_data.module_name,
                );
            }
        }
    }

    /// Add a side-effect `import 'hammerjs'` to the entry file when the
    /// library is not installed anywhere in the target.
    fn ensure_hammer_installed(&mut self) {
        if !self.facts.install_imports.is_empty() || !self.facts.consuming_imports.is_empty() {
            return;
        }
        let entry = self.target.entry_file.clone();
        if self.tree.exists(&entry) {
            self.tree.edit(&entry).insert_right(0, "import 'hammerjs';\n");
        }
    }

    fn has_existing_token_provider(&self) -> bool {
        self.facts.token_refs.iter().any(|r| {
            if r.is_import {
                return false;
            }
            self.project
                .get(&r.file)
                .and_then(|unit| looks_like_provider_declaration(&unit.arena, r.node))
                .is_some()
        })
    }

    fn report_missing_root(&mut self) {
        self.failures.push(NodeFailure {
            file: self.target.entry_file.clone(),
            offset: 0,
            severity: Severity::Warning,
            message: "Could not find the application's root module from the entry file's \
                      bootstrap call. HammerModule and the gesture config provider were not \
                      registered; please add them to your root module manually."
                .to_string(),
        });
    }

    /// The root `@NgModule` metadata object, located through the entry file's
    /// `bootstrapModule(<RootModule>)` call.
    fn find_root_module(&self) -> Option<(String, NodeId)> {
        let entry = self.project.get(&self.target.entry_file)?;
        let arena = &entry.arena;

        let mut module_local = None;
        for id in all_nodes(arena) {
            if !matches!(arena.get(id).kind, NodeKind::Call) {
                continue;
            }
            let children = &arena.get(id).children;
            let Some(&callee) = children.first() else {
                continue;
            };
            let is_bootstrap = matches!(
                &arena.get(callee).kind,
                NodeKind::PropertyAccess { property } if property == "bootstrapModule"
            ) || matches!(
                &arena.get(callee).kind,
                NodeKind::Identifier { name } if name == "bootstrapModule"
            );
            if !is_bootstrap {
                continue;
            }
            let Some(&argument) = children.get(1) else {
                continue;
            };
            if let Some(ident) = first_descendant(arena, argument, |kind| {
                matches!(kind, NodeKind::Identifier { .. })
            }) {
                if let NodeKind::Identifier { name } = &arena.get(ident).kind {
                    module_local = Some(name.clone());
                    break;
                }
            }
        }
        let local = module_local?;

        let binding = entry.imports.bindings.get(&local)?;
        let file = self
            .project
            .resolve_module(&self.target.entry_file, &binding.data.module_name)?;
        let unit = self.project.get(&file)?;

        // The decorated `@NgModule({...})` call in the root module file.
        for id in all_nodes(&unit.arena) {
            if !matches!(unit.arena.get(id).kind, NodeKind::Call) {
                continue;
            }
            let children = &unit.arena.get(id).children;
            let Some(&callee) = children.first() else {
                continue;
            };
            if !matches!(
                &unit.arena.get(callee).kind,
                NodeKind::Identifier { name } if name == "NgModule"
            ) {
                continue;
            }
            if unit
                .arena
                .find_ancestor(id, |n| matches!(n.kind, NodeKind::Decorator))
                .is_none()
            {
                continue;
            }
            let Some(&argument) = children.get(1) else {
                continue;
            };
            if let Some(metadata) = first_descendant(&unit.arena, argument, |kind| {
                matches!(kind, NodeKind::ObjectLiteral)
            }) {
                return Some((file, metadata));
            }
        }
        None
    }

    /// Register the optional gesture module in the root `imports:` array,
    /// unless a registration already exists in that file.
    fn ensure_module_registration(&mut self, file: &str, metadata: NodeId) {
        let already = self
            .facts
            .module_refs
            .iter()
            .any(|r| !r.is_import && r.file == file);
        if already {
            return;
        }
        let alias = self.imports.add_import(
            self.project,
            file,
            HAMMER_MODULE_NAME,
            PLATFORM_BROWSER_MODULE,
            &HashSet::new(),
        );
        self.add_to_metadata_array(file, metadata, "imports", &alias);
    }

    /// Append `text` to the named array property of a metadata object
    /// literal, creating the property when it is missing.
    fn add_to_metadata_array(&mut self, file: &str, metadata: NodeId, property: &str, text: &str) {
        let Some(unit) = self.project.get(file) else {
            return;
        };
        let arena = &unit.arena;

        for &child in &arena.get(metadata).children {
            let NodeKind::PropertyAssignment { name } = &arena.get(child).kind else {
                continue;
            };
            if name != property {
                continue;
            }
            let Some(array) = first_descendant(arena, child, |kind| {
                matches!(kind, NodeKind::ArrayLiteral)
            }) else {
                self.failures.push(NodeFailure {
                    file: file.to_string(),
                    offset: arena.get(child).span.start,
                    severity: Severity::Warning,
                    message: format!(
                        "The `{}` property of the root module is not an array literal; \
                         please add `{}` to it manually.",
                        property, text
                    ),
                });
                return;
            };
            let insertion = match arena.get(array).children.last() {
                Some(&last) => (arena.get(last).span.end, format!(", {}", text)),
                None => (arena.get(array).span.start + 1, text.to_string()),
            };
            self.tree.edit(file).insert_right(insertion.0, insertion.1);
            return;
        }

        // No such property yet.
        let insertion = match arena.get(metadata).children.last() {
            Some(&last) => (
                arena.get(last).span.end,
                format!(",\n  {}: [{}]", property, text),
            ),
            None => (
                arena.get(metadata).span.start + 1,
                format!("{}: [{}]", property, text),
            ),
        };
        self.tree.edit(file).insert_right(insertion.0, insertion.1);
    }

    /// Local name of an import-binding reference.
    fn binding_local(&self, reference: &IdentifierReference) -> Option<String> {
        let unit = self.project.get(&reference.file)?;
        match &unit.arena.get(reference.node).kind {
            NodeKind::ImportSpecifier { local, .. } => Some(local.clone()),
            _ => None,
        }
    }
}

fn all_nodes(arena: &NodeArena) -> impl Iterator<Item = NodeId> {
    (0..arena.len() as u32).map(NodeId)
}

fn first_descendant(
    arena: &NodeArena,
    root: NodeId,
    pred: impl Fn(&NodeKind) -> bool,
) -> Option<NodeId> {
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if pred(&arena.get(id).kind) {
            return Some(id);
        }
        for &child in arena.get(id).children.iter().rev() {
            stack.push(child);
        }
    }
    None
}
