//! Strategy selection.
//!
//! A pure function from collected facts to one of five strategies. The
//! priority order is fixed: an existing custom configuration always wins,
//! custom events outrank standard events, standard events outrank plain
//! runtime access, and a target that touches nothing gets a full cleanup.

/// What to do with a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationStrategy {
    /// A hand-written gesture config exists; leave the setup alone apart
    /// from stale library references.
    KeepCustomConfig,
    /// Custom gesture events are bound; copy the library gesture config into
    /// the project and wire it up.
    CopyGestureConfig,
    /// Only standard gesture events are bound; registering the platform
    /// gesture module is enough.
    RegisterHammerModule,
    /// The runtime library is used programmatically but no gesture events
    /// are bound; drop the gesture wiring, keep the library.
    RuntimeOnly,
    /// Nothing uses the library; remove every trace of it.
    RemoveUnused,
}

impl MigrationStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStrategy::KeepCustomConfig => "keep-custom-config",
            MigrationStrategy::CopyGestureConfig => "copy-gesture-config",
            MigrationStrategy::RegisterHammerModule => "register-hammer-module",
            MigrationStrategy::RuntimeOnly => "runtime-only",
            MigrationStrategy::RemoveUnused => "remove-unused",
        }
    }
}

/// Facts feeding the decision, already reduced to booleans.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecisionInput {
    pub custom_config_provided: bool,
    pub custom_events_used: bool,
    pub standard_events_used: bool,
    pub used_at_runtime: bool,
}

/// Map facts to a strategy.
pub fn decide(input: &DecisionInput) -> MigrationStrategy {
    if input.custom_config_provided {
        MigrationStrategy::KeepCustomConfig
    } else if input.custom_events_used {
        MigrationStrategy::CopyGestureConfig
    } else if input.standard_events_used {
        MigrationStrategy::RegisterHammerModule
    } else if input.used_at_runtime {
        MigrationStrategy::RuntimeOnly
    } else {
        MigrationStrategy::RemoveUnused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(
        custom_config_provided: bool,
        custom_events_used: bool,
        standard_events_used: bool,
        used_at_runtime: bool,
    ) -> DecisionInput {
        DecisionInput {
            custom_config_provided,
            custom_events_used,
            standard_events_used,
            used_at_runtime,
        }
    }

    #[test]
    fn custom_config_wins_over_everything() {
        for custom in [false, true] {
            for standard in [false, true] {
                for runtime in [false, true] {
                    assert_eq!(
                        decide(&input(true, custom, standard, runtime)),
                        MigrationStrategy::KeepCustomConfig
                    );
                }
            }
        }
    }

    #[test]
    fn custom_events_outrank_standard_events() {
        for standard in [false, true] {
            for runtime in [false, true] {
                assert_eq!(
                    decide(&input(false, true, standard, runtime)),
                    MigrationStrategy::CopyGestureConfig
                );
            }
        }
    }

    #[test]
    fn standard_events_outrank_runtime_access() {
        for runtime in [false, true] {
            assert_eq!(
                decide(&input(false, false, true, runtime)),
                MigrationStrategy::RegisterHammerModule
            );
        }
    }

    #[test]
    fn runtime_access_alone() {
        assert_eq!(
            decide(&input(false, false, false, true)),
            MigrationStrategy::RuntimeOnly
        );
    }

    #[test]
    fn nothing_used_means_removal() {
        assert_eq!(
            decide(&DecisionInput::default()),
            MigrationStrategy::RemoveUnused
        );
    }
}
