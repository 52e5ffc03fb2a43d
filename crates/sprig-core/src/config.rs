/// Runtime knobs. `Default` matches what most embedders want.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    /// Nested class updates deeper than this are abandoned with an error log.
    pub max_update_depth: usize,
    /// Log when `set_state` targets an unmounted component.
    pub warn_on_unmounted_updates: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_update_depth: 50,
            warn_on_unmounted_updates: true,
        }
    }
}

impl RuntimeConfig {
    pub fn max_update_depth(mut self, depth: usize) -> Self {
        self.max_update_depth = depth;
        self
    }

    pub fn warn_on_unmounted_updates(mut self, warn: bool) -> Self {
        self.warn_on_unmounted_updates = warn;
        self
    }
}
