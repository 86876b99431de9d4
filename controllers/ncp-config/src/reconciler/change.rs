//! Change detection against the last-applied baseline.

use crate::operator_config::{Component, ConfigView, OperatorConfig};

/// Which managed workloads need to pick up new configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeFlags {
    /// NCP view changed
    pub ncp: bool,
    /// Node agent view changed
    pub agent: bool,
}

impl ChangeFlags {
    /// Whether either workload changed.
    pub fn any(self) -> bool {
        self.ncp || self.agent
    }

    /// Flag for `component`
    pub fn get(self, component: Component) -> bool {
        match component {
            Component::Ncp => self.ncp,
            Component::NodeAgent => self.agent,
        }
    }
}

/// Last-applied configuration, one view per workload.
///
/// Views advance independently: after a partial disruption only the
/// workloads that no longer need eviction move forward.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Baseline {
    /// Keys last applied to NCP
    pub ncp: ConfigView,
    /// Keys last applied to the node agent
    pub agent: ConfigView,
}

impl Baseline {
    /// Baseline with both views taken from `config`.
    pub fn from_config(config: &OperatorConfig) -> Self {
        Self {
            ncp: config.view(Component::Ncp),
            agent: config.view(Component::NodeAgent),
        }
    }

    /// View last applied to `component`.
    pub fn view(&self, component: Component) -> &ConfigView {
        match component {
            Component::Ncp => &self.ncp,
            Component::NodeAgent => &self.agent,
        }
    }

    /// Move one workload's view to `config`.
    pub fn advance(&mut self, component: Component, config: &OperatorConfig) {
        let view = config.view(component);
        match component {
            Component::Ncp => self.ncp = view,
            Component::NodeAgent => self.agent = view,
        }
    }
}

/// Classify `candidate` against `baseline`. Without a baseline every
/// workload counts as changed.
pub fn detect_changes(candidate: &OperatorConfig, baseline: Option<&Baseline>) -> ChangeFlags {
    let Some(baseline) = baseline else {
        return ChangeFlags { ncp: true, agent: true };
    };
    ChangeFlags {
        ncp: &candidate.view(Component::Ncp) != baseline.view(Component::Ncp),
        agent: &candidate.view(Component::NodeAgent) != baseline.view(Component::NodeAgent),
    }
}
