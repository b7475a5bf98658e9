//! Fact collection.
//!
//! One read-only walk per source file populates [`TargetFacts`]; nothing is
//! mutated while facts are being gathered. Marker references are resolved
//! through the project's import index so aliases and re-export chains cannot
//! hide a library symbol.

use tracing::debug;
use unhammer_core::recorder::Span;
use unhammer_ts::ast::{ImportClause, NodeArena, NodeId, NodeKind};
use unhammer_ts::imports::{ImportData, Project, SourceUnit};
use unhammer_ts::visitor::{walk, VisitResult, Visitor};

use crate::events::{scan_template, TemplateUsage};

/// Module specifier of the runtime library.
pub const HAMMER_MODULE_SPECIFIER: &str = "hammerjs";
/// Global object the runtime library installs.
pub const HAMMER_GLOBAL: &str = "Hammer";
/// Gesture config class shipped by the component library.
pub const GESTURE_CONFIG_CLASS: &str = "GestureConfig";
/// Namespace prefix under which the library gesture config is declared.
pub const GESTURE_CONFIG_MODULE_PREFIX: &str = "@angular/material";
/// DI token for gesture configs.
pub const HAMMER_CONFIG_TOKEN: &str = "HAMMER_GESTURE_CONFIG";
/// Optional platform module enabling gesture event plumbing.
pub const HAMMER_MODULE_NAME: &str = "HammerModule";
/// Module declaring the token and the optional module.
pub const PLATFORM_BROWSER_MODULE: &str = "@angular/platform-browser";

/// The library symbols the migration tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    GestureConfig,
    ConfigToken,
    HammerModule,
}

/// Classify resolved import data as one of the tracked markers.
pub fn classify_marker(data: &ImportData) -> Option<Marker> {
    if data.symbol_name == GESTURE_CONFIG_CLASS
        && data.module_name.starts_with(GESTURE_CONFIG_MODULE_PREFIX)
    {
        return Some(Marker::GestureConfig);
    }
    if data.module_name == PLATFORM_BROWSER_MODULE {
        if data.symbol_name == HAMMER_CONFIG_TOKEN {
            return Some(Marker::ConfigToken);
        }
        if data.symbol_name == HAMMER_MODULE_NAME {
            return Some(Marker::HammerModule);
        }
    }
    None
}

/// One occurrence of a tracked symbol.
#[derive(Debug, Clone)]
pub struct IdentifierReference {
    pub file: String,
    pub node: NodeId,
    pub span: Span,
    pub import_data: ImportData,
    /// The reference is the import binding itself, not a use site.
    pub is_import: bool,
}

/// Everything fact collection learned about one target.
#[derive(Debug, Default)]
pub struct TargetFacts {
    /// Side-effect `import 'hammerjs'` statements: `(file, statement span)`.
    pub install_imports: Vec<(String, Span)>,
    /// Named/namespace/default imports from the runtime library.
    pub consuming_imports: Vec<(String, Span)>,
    /// Programmatic access to the runtime library.
    pub used_at_runtime: bool,
    pub config_refs: Vec<IdentifierReference>,
    pub token_refs: Vec<IdentifierReference>,
    pub module_refs: Vec<IdentifierReference>,
    pub template_usage: TemplateUsage,
    /// Files (templates or components) where gesture events are bound.
    pub event_files: Vec<String>,
}

impl TargetFacts {
    fn push_ref(&mut self, marker: Marker, reference: IdentifierReference) {
        match marker {
            Marker::GestureConfig => self.config_refs.push(reference),
            Marker::ConfigToken => self.token_refs.push(reference),
            Marker::HammerModule => self.module_refs.push(reference),
        }
    }

    fn record_usage(&mut self, file: &str, usage: TemplateUsage) {
        if usage.is_empty() {
            return;
        }
        if !self.event_files.iter().any(|f| f == file) {
            self.event_files.push(file.to_string());
        }
        self.template_usage.merge(usage);
    }
}

/// Collect facts from every parsed unit of `project` plus the standalone
/// templates in `templates`.
pub fn collect_facts(project: &Project, templates: &[(String, String)]) -> TargetFacts {
    let mut facts = TargetFacts::default();
    for unit in project.units() {
        let mut collector = FactCollector {
            unit,
            project,
            facts: &mut facts,
        };
        walk(&unit.arena, unit.arena.root(), &mut collector);
    }
    for (path, markup) in templates {
        facts.record_usage(path, scan_template(markup));
    }
    debug!(
        config_refs = facts.config_refs.len(),
        token_refs = facts.token_refs.len(),
        module_refs = facts.module_refs.len(),
        runtime = facts.used_at_runtime,
        "collected facts"
    );
    facts
}

struct FactCollector<'a> {
    unit: &'a SourceUnit,
    project: &'a Project,
    facts: &'a mut TargetFacts,
}

impl FactCollector<'_> {
    /// `window.Hammer` style access: the accessed object must be a global
    /// object reference.
    fn is_global_object(&self, arena: &NodeArena, id: NodeId) -> bool {
        matches!(
            &arena.get(id).kind,
            NodeKind::Identifier { name } if name == "window" || name == "globalThis"
        )
    }
}

impl Visitor for FactCollector<'_> {
    fn visit(&mut self, arena: &NodeArena, id: NodeId) -> VisitResult {
        let file = &self.unit.path;
        match &arena.get(id).kind {
            NodeKind::ImportDecl { module, clause } => {
                if module == HAMMER_MODULE_SPECIFIER {
                    let span = arena.get(id).span;
                    match clause {
                        ImportClause::SideEffect => {
                            self.facts.install_imports.push((file.clone(), span));
                        }
                        _ => {
                            // Importing symbols from the library is
                            // programmatic use.
                            self.facts.consuming_imports.push((file.clone(), span));
                            self.facts.used_at_runtime = true;
                        }
                    }
                    return VisitResult::SkipChildren;
                }
                // Import bindings of tracked markers are references too; the
                // mutation phase deletes them through the import manager.
                for &spec in &arena.get(id).children {
                    if let NodeKind::ImportSpecifier { local, .. } = &arena.get(spec).kind {
                        if let Some(data) = self.project.resolve_reference(file, local) {
                            if let Some(marker) = classify_marker(&data) {
                                self.facts.push_ref(
                                    marker,
                                    IdentifierReference {
                                        file: file.clone(),
                                        node: spec,
                                        span: arena.get(spec).span,
                                        import_data: data,
                                        is_import: true,
                                    },
                                );
                            }
                        }
                    }
                }
                VisitResult::SkipChildren
            }

            NodeKind::Identifier { name } => {
                match self.project.resolve_reference(file, name) {
                    Some(data) => {
                        if data.module_name == HAMMER_MODULE_SPECIFIER {
                            self.facts.used_at_runtime = true;
                        } else if let Some(marker) = classify_marker(&data) {
                            self.facts.push_ref(
                                marker,
                                IdentifierReference {
                                    file: file.clone(),
                                    node: id,
                                    span: arena.get(id).span,
                                    import_data: data,
                                    is_import: false,
                                },
                            );
                        }
                    }
                    None => {
                        // A bare unresolved `Hammer` is ambient global
                        // access.
                        if name == HAMMER_GLOBAL {
                            self.facts.used_at_runtime = true;
                        }
                    }
                }
                VisitResult::Continue
            }

            NodeKind::PropertyAccess { property } if property == HAMMER_GLOBAL => {
                let children = &arena.get(id).children;
                if let Some(&object) = children.first() {
                    if self.is_global_object(arena, object) {
                        self.facts.used_at_runtime = true;
                    }
                }
                VisitResult::Continue
            }

            NodeKind::ElementAccess {
                argument: Some(arg),
            } if arg == HAMMER_GLOBAL => {
                let children = &arena.get(id).children;
                if let Some(&object) = children.first() {
                    if self.is_global_object(arena, object) {
                        self.facts.used_at_runtime = true;
                    }
                }
                VisitResult::Continue
            }

            NodeKind::PropertyAssignment { name } if name == "template" => {
                // Inline component templates get the same classifier as
                // standalone markup files.
                for &child in &arena.get(id).children {
                    collect_inline_template(arena, child, |markup| {
                        self.facts.record_usage(file, scan_template(markup));
                    });
                }
                VisitResult::Continue
            }

            _ => VisitResult::Continue,
        }
    }
}

fn collect_inline_template(arena: &NodeArena, id: NodeId, mut sink: impl FnMut(&str)) {
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        match &arena.get(current).kind {
            NodeKind::StringLiteral { value } => sink(value),
            NodeKind::TemplateLiteral { raw } => sink(raw),
            _ => {}
        }
        stack.extend(arena.get(current).children.iter().copied());
    }
}

/// The provider object literal a DI token reference is part of, if the
/// reference sits in a `provide:` property.
pub fn looks_like_provider_declaration(arena: &NodeArena, id: NodeId) -> Option<NodeId> {
    let property = arena.find_ancestor(id, |n| {
        matches!(&n.kind, NodeKind::PropertyAssignment { name } if name == "provide")
    })?;
    arena.find_ancestor(property, |n| matches!(n.kind, NodeKind::ObjectLiteral))
}

/// True when some provider declaration binds the DI token to a config that is
/// not the library's: a hand-written setup the migration must not replace.
pub fn custom_config_provided(project: &Project, facts: &TargetFacts) -> bool {
    for token_ref in facts.token_refs.iter().filter(|r| !r.is_import) {
        let Some(unit) = project.get(&token_ref.file) else {
            continue;
        };
        let Some(literal) = looks_like_provider_declaration(&unit.arena, token_ref.node) else {
            continue;
        };
        let mut uses_library_config = false;
        let mut stack = vec![literal];
        while let Some(current) = stack.pop() {
            if let NodeKind::Identifier { name } = &unit.arena.get(current).kind {
                if let Some(data) = project.resolve_reference(&token_ref.file, name) {
                    if classify_marker(&data) == Some(Marker::GestureConfig) {
                        uses_library_config = true;
                    }
                }
            }
            stack.extend(unit.arena.get(current).children.iter().copied());
        }
        if !uses_library_config {
            return true;
        }
    }
    false
}
