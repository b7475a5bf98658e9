//! Depth-first tree traversal.

use crate::ast::{NodeArena, NodeId};

/// Flow control returned from [`Visitor::visit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitResult {
    /// Descend into children.
    Continue,
    /// Skip this node's children.
    SkipChildren,
    /// Abort the whole traversal.
    Stop,
}

/// Read-only visitor over a [`NodeArena`].
pub trait Visitor {
    fn visit(&mut self, arena: &NodeArena, id: NodeId) -> VisitResult;
}

/// Preorder walk from `root`. Returns `false` if the visitor stopped early.
pub fn walk(arena: &NodeArena, root: NodeId, visitor: &mut impl Visitor) -> bool {
    match visitor.visit(arena, root) {
        VisitResult::Stop => return false,
        VisitResult::SkipChildren => return true,
        VisitResult::Continue => {}
    }
    // Children are snapshotted; visitors cannot mutate the arena.
    for &child in &arena.get(root).children {
        if !walk(arena, child, visitor) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::parser::parse;

    struct IdentCollector {
        names: Vec<String>,
        stop_at: Option<String>,
    }

    impl Visitor for IdentCollector {
        fn visit(&mut self, arena: &NodeArena, id: NodeId) -> VisitResult {
            if let NodeKind::Identifier { name } = &arena.get(id).kind {
                self.names.push(name.clone());
                if self.stop_at.as_deref() == Some(name) {
                    return VisitResult::Stop;
                }
            }
            VisitResult::Continue
        }
    }

    #[test]
    fn walks_in_document_order() {
        let arena = parse("first(second, third);");
        let mut collector = IdentCollector {
            names: Vec::new(),
            stop_at: None,
        };
        assert!(walk(&arena, arena.root(), &mut collector));
        assert_eq!(collector.names, vec!["first", "second", "third"]);
    }

    #[test]
    fn stop_aborts_traversal() {
        let arena = parse("first(second, third);");
        let mut collector = IdentCollector {
            names: Vec::new(),
            stop_at: Some("second".to_string()),
        };
        assert!(!walk(&arena, arena.root(), &mut collector));
        assert_eq!(collector.names, vec!["first", "second"]);
    }
}
