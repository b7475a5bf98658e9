//! Cross-target usage state and the final manifest decision.
//!
//! Targets run strictly one after another against one shared
//! [`GlobalUsageState`]. Any target that keeps the runtime library flips the
//! state to "in use"; the transition is one-directional within a run.
//! [`GlobalUsageState::finalize`] makes the package manifest decision and
//! always resets the state afterwards, so a second run on the same context
//! starts clean.

use serde_json::Value;
use thiserror::Error;
use tracing::info;
use unhammer_core::tree::FileTree;

/// Failures raised while editing the dependency manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("package.json is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Whether any migrated target still depends on the runtime library.
#[derive(Debug, Default)]
pub struct GlobalUsageState {
    library_used: bool,
}

impl GlobalUsageState {
    pub fn new() -> Self {
        GlobalUsageState::default()
    }

    /// Record that some target keeps using the library.
    pub fn mark_used(&mut self) {
        self.library_used = true;
    }

    pub fn is_used(&self) -> bool {
        self.library_used
    }

    /// Make the manifest decision and reset the state.
    ///
    /// When no target uses the library, the `hammerjs` entry is deleted from
    /// `package.json` `dependencies`/`devDependencies`. Returns `true` when
    /// the manifest changed (the caller should reinstall node modules).
    /// The reset to clean happens unconditionally, error or not.
    pub fn finalize(&mut self, tree: &mut FileTree) -> Result<bool, ManifestError> {
        let used = self.library_used;
        self.library_used = false;
        if used {
            info!("runtime library still in use, keeping manifest entry");
            return Ok(false);
        }
        let Some(manifest) = tree.read("package.json") else {
            return Ok(false);
        };
        let mut value: Value = serde_json::from_str(manifest)?;
        let mut changed = false;
        for section in ["dependencies", "devDependencies"] {
            if let Some(deps) = value.get_mut(section).and_then(Value::as_object_mut) {
                if deps.remove(crate::facts::HAMMER_MODULE_SPECIFIER).is_some() {
                    changed = true;
                }
            }
        }
        if changed {
            let mut out = serde_json::to_string_pretty(&value)?;
            out.push('\n');
            tree.overwrite("package.json", out);
            info!("removed hammerjs from package.json");
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"{
  "name": "demo",
  "dependencies": {
    "@angular/core": "^9.0.0",
    "hammerjs": "^2.0.8"
  },
  "devDependencies": {
    "hammerjs": "^2.0.8"
  }
}
"#;

    #[test]
    fn unused_library_is_dropped_from_manifest() {
        let mut tree = FileTree::new();
        tree.insert("package.json", MANIFEST);
        let mut state = GlobalUsageState::new();
        assert!(state.finalize(&mut tree).unwrap());
        let manifest = tree.read("package.json").unwrap();
        assert!(!manifest.contains("hammerjs"));
        assert!(manifest.contains("@angular/core"));
    }

    #[test]
    fn used_library_keeps_manifest() {
        let mut tree = FileTree::new();
        tree.insert("package.json", MANIFEST);
        let mut state = GlobalUsageState::new();
        state.mark_used();
        assert!(!state.finalize(&mut tree).unwrap());
        assert!(tree.read("package.json").unwrap().contains("hammerjs"));
    }

    #[test]
    fn finalize_always_resets() {
        let mut tree = FileTree::new();
        tree.insert("package.json", MANIFEST);
        let mut state = GlobalUsageState::new();
        state.mark_used();
        state.finalize(&mut tree).unwrap();
        assert!(!state.is_used());
        // A clean second run may now drop the entry.
        assert!(state.finalize(&mut tree).unwrap());
    }

    #[test]
    fn reset_happens_even_when_manifest_is_broken() {
        let mut tree = FileTree::new();
        tree.insert("package.json", "{ not json");
        let mut state = GlobalUsageState::new();
        assert!(state.finalize(&mut tree).is_err());
        assert!(!state.is_used());
    }

    #[test]
    fn missing_manifest_is_fine() {
        let mut tree = FileTree::new();
        let mut state = GlobalUsageState::new();
        assert!(!state.finalize(&mut tree).unwrap());
    }

    #[test]
    fn manifest_without_entry_is_untouched() {
        let mut tree = FileTree::new();
        tree.insert("package.json", "{\n  \"dependencies\": {}\n}\n");
        let mut state = GlobalUsageState::new();
        assert!(!state.finalize(&mut tree).unwrap());
        assert_eq!(tree.dirty_paths().count(), 0);
    }
}
