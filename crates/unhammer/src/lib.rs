//! Migration engine for Angular-style apps using the HammerJS gesture
//! runtime.
//!
//! The engine collects facts about how an application uses the library
//! (imports, global access, gesture event bindings, DI wiring), decides on
//! one of five migration strategies, and rewrites the sources through
//! deferred, conflict-checked edits. Problems it cannot fix become
//! position-correct diagnostics instead of errors.

pub mod coordinator;
pub mod decision;
pub mod engine;
pub mod events;
pub mod facts;
pub mod gesture_config;
pub mod import_manager;

pub use coordinator::GlobalUsageState;
pub use decision::{decide, DecisionInput, MigrationStrategy};
pub use engine::{
    discover_targets, migrate_target, Diagnostic, MigrationError, MigrationTarget, Severity,
    TargetReport,
};
pub use import_manager::ImportManager;
