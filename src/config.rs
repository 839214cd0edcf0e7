//! Configuration for a processing run.

use crate::assets::DEFAULT_NETWORK_ROOT;
use crate::spatial::UnmatchedPolicy;
use crate::tabular::TabularMode;

/// Label used for the distribution-box column when the document has none.
pub const DEFAULT_DISTRIBUTION_BOX: &str = "FRL0210";

/// Processing configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Name of the folder holding the network taxonomy.
    pub network_root: String,

    /// Distribution-box label used when the document has no distribution box.
    pub default_distribution_box: String,

    /// Placement of subscriber points outside every boundary region.
    pub unmatched: UnmatchedPolicy,

    /// Template parsing and output serialization flavour.
    pub tabular_mode: TabularMode,

    /// Require the name column (and, for subscribers, the region column) to
    /// be mapped before processing.
    pub require_core_columns: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            network_root: DEFAULT_NETWORK_ROOT.to_string(),
            default_distribution_box: DEFAULT_DISTRIBUTION_BOX.to_string(),
            unmatched: UnmatchedPolicy::FirstRegion,
            tabular_mode: TabularMode::Compat,
            require_core_columns: false,
        }
    }

    /// Set the network root folder name.
    pub fn with_network_root(mut self, name: impl Into<String>) -> Self {
        self.network_root = name.into();
        self
    }

    /// Set the fallback distribution-box label.
    pub fn with_default_distribution_box(mut self, label: impl Into<String>) -> Self {
        self.default_distribution_box = label.into();
        self
    }

    /// Set the unmatched-point policy.
    pub fn with_unmatched(mut self, policy: UnmatchedPolicy) -> Self {
        self.unmatched = policy;
        self
    }

    /// Set the tabular mode.
    pub fn with_tabular_mode(mut self, mode: TabularMode) -> Self {
        self.tabular_mode = mode;
        self
    }

    /// Require core columns to be mapped.
    pub fn with_require_core_columns(mut self, enable: bool) -> Self {
        self.require_core_columns = enable;
        self
    }
}
