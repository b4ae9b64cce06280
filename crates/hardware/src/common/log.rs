//! Per-component debug logging switch.
//!
//! Every simulated component carries a [`ComponentLog`]. Debug events are emitted through
//! `tracing` only while the component's switch is on, so verbose transaction traces can be
//! enabled for one block at runtime without recompiling or touching the global subscriber.

/// Named runtime switch for a component's debug trace.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentLog {
    name: String,
    enabled: bool,
}

impl ComponentLog {
    /// Creates a disabled log for the component called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
        }
    }

    /// Returns the component name used as the `component` field of every event.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns whether debug events are currently emitted.
    #[inline(always)]
    pub const fn enabled(&self) -> bool {
        self.enabled
    }

    /// Turns the debug trace on or off.
    pub const fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}
