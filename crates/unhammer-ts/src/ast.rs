//! Structural syntax tree.
//!
//! Nodes live in a flat arena and point at each other by index. Every node
//! carries its byte span in the original source plus a parent link, which is
//! what the rewrite side needs: "is this identifier an element of an array
//! literal" and "which object literal encloses this property" are ancestor
//! walks, not type queries.

use unhammer_core::recorder::Span;

/// Index of a node in its [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// How an import statement binds names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportClause {
    /// `import 'module';`
    SideEffect,
    /// `import { a, b as c } from 'module';` (specifiers are child nodes)
    Named,
    /// `import * as ns from 'module';`
    Namespace { local: String },
    /// `import def from 'module';` (may also carry named specifier children)
    Default { local: String },
}

/// Node payloads. Constructs the engine does not reason about degrade to
/// [`NodeKind::Expr`] or [`NodeKind::Block`] containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    SourceFile,
    ImportDecl {
        module: String,
        clause: ImportClause,
    },
    /// One `imported as local` entry of a named import.
    ImportSpecifier {
        imported: String,
        local: String,
    },
    /// `export { a, b as c } from 'module';` with `(original, exported)` pairs.
    ExportFrom {
        module: String,
        names: Vec<(String, String)>,
    },
    Identifier {
        name: String,
    },
    /// `<child>.property`; the accessed object is the single child.
    PropertyAccess {
        property: String,
    },
    /// `<child>[arg]`; `argument` is set when the index is a string literal.
    ElementAccess {
        argument: Option<String>,
    },
    ObjectLiteral,
    /// `name: <value>` or shorthand `name` inside an object literal.
    PropertyAssignment {
        name: String,
    },
    ArrayLiteral,
    /// Children are `[callee, arg0, arg1, ...]`.
    Call,
    /// `@expr`; the decorated expression is the single child.
    Decorator,
    StringLiteral {
        value: String,
    },
    TemplateLiteral {
        raw: String,
    },
    /// Brace-delimited statement region.
    Block,
    /// Generic expression container.
    Expr,
}

/// A node: payload, span, parent link, ordered children.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Flat node storage. Index 0 is always the [`NodeKind::SourceFile`] root.
#[derive(Debug)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    /// Create an arena holding a root `SourceFile` node spanning the source.
    pub fn new(source_len: usize) -> Self {
        NodeArena {
            nodes: vec![Node {
                kind: NodeKind::SourceFile,
                span: Span::new(0, source_len),
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// The `SourceFile` root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Allocate a node and link it under `parent`.
    pub fn alloc(&mut self, parent: NodeId, kind: NodeKind, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            span,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0 as usize].children.push(id);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    /// Widen or correct a node's span after its extent is known.
    pub fn set_span(&mut self, id: NodeId, span: Span) {
        self.nodes[id.0 as usize].span = span;
    }

    /// Detach `child` from its current parent and append it under
    /// `new_parent`. Used to build postfix chains (`a.b(c)[d]`) bottom-up.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) {
        if let Some(old) = self.nodes[child.0 as usize].parent {
            self.nodes[old.0 as usize].children.retain(|&c| c != child);
        }
        self.nodes[child.0 as usize].parent = Some(new_parent);
        self.nodes[new_parent.0 as usize].children.push(child);
    }

    /// Iterate ancestors from the parent upward to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            current: self.get(id).parent,
        }
    }

    /// First ancestor matching the predicate.
    pub fn find_ancestor(
        &self,
        id: NodeId,
        mut pred: impl FnMut(&Node) -> bool,
    ) -> Option<NodeId> {
        self.ancestors(id).find(|&a| pred(self.get(a)))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        // The root always exists.
        false
    }
}

/// Iterator over a node's ancestors, nearest first.
pub struct Ancestors<'a> {
    arena: &'a NodeArena,
    current: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.arena.get(id).parent;
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_links_parent_and_child() {
        let mut arena = NodeArena::new(10);
        let root = arena.root();
        let child = arena.alloc(root, NodeKind::Expr, Span::new(0, 5));
        assert_eq!(arena.get(child).parent, Some(root));
        assert_eq!(arena.get(root).children, vec![child]);
    }

    #[test]
    fn reparent_moves_child() {
        let mut arena = NodeArena::new(10);
        let root = arena.root();
        let a = arena.alloc(root, NodeKind::Expr, Span::new(0, 3));
        let b = arena.alloc(root, NodeKind::Call, Span::new(0, 5));
        arena.reparent(a, b);
        assert_eq!(arena.get(a).parent, Some(b));
        assert_eq!(arena.get(root).children, vec![b]);
        assert_eq!(arena.get(b).children, vec![a]);
    }

    #[test]
    fn ancestors_walk_to_root() {
        let mut arena = NodeArena::new(10);
        let root = arena.root();
        let a = arena.alloc(root, NodeKind::Block, Span::new(0, 10));
        let b = arena.alloc(a, NodeKind::Expr, Span::new(1, 4));
        let chain: Vec<NodeId> = arena.ancestors(b).collect();
        assert_eq!(chain, vec![a, root]);
        let found = arena.find_ancestor(b, |n| matches!(n.kind, NodeKind::Block));
        assert_eq!(found, Some(a));
    }
}
