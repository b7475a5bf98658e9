//! Tolerant TypeScript front end for unhammer.
//!
//! This crate parses TypeScript sources into a *structural* concrete syntax
//! tree: the constructs the migration engine reasons about (imports,
//! identifiers, property access, object/array literals, decorators, calls)
//! are modeled precisely with byte spans and parent links, while everything
//! else degrades to generic container nodes. The parser never rejects input;
//! unknown syntax still lands in the tree with correct spans so ancestor
//! walks stay possible.

pub mod ast;
pub mod imports;
pub mod parser;
pub mod tokenizer;
pub mod visitor;

pub use ast::{ImportClause, Node, NodeArena, NodeId, NodeKind};
pub use imports::{ImportData, ImportIndex, Project, SourceUnit};
pub use visitor::{walk, VisitResult, Visitor};
