//! Core infrastructure for unhammer.
//!
//! This crate provides the language-agnostic pieces of the migration engine:
//! - Byte spans and text position conversion
//! - The per-file update recorder (deferred edits with a displacement ledger)
//! - The virtual file tree the engine reads from and commits into
//! - Error types

pub mod error;
pub mod recorder;
pub mod text;
pub mod tree;
