//! Fixed object names and identifiers the operator depends on.

/// Namespace the operator runs in and reads its ConfigMap from
pub const OPERATOR_NAMESPACE: &str = "nsx-system-operator";
/// User-supplied operator configuration
pub const OPERATOR_CONFIG_MAP: &str = "nsx-ncp-operator-config";
/// Cluster-scoped Network object (empty namespace)
pub const NETWORK_NAME: &str = "cluster";

/// Namespace of the managed workloads
pub const NSX_NAMESPACE: &str = "nsx-system";
/// NCP Deployment
pub const NCP_DEPLOYMENT: &str = "nsx-ncp";
/// Node agent DaemonSet
pub const NODE_AGENT_DAEMONSET: &str = "nsx-node-agent";
/// Bootstrap DaemonSet preparing each node
pub const NCP_BOOTSTRAP_DAEMONSET: &str = "nsx-ncp-bootstrap";
/// Derived ConfigMap holding the NCP view
pub const NCP_CONFIG_MAP: &str = "nsx-ncp-config";
/// Derived ConfigMap holding the node agent view
pub const NODE_AGENT_CONFIG_MAP: &str = "nsx-node-agent-config";
/// Load-balancer default certificate and key
pub const LB_SECRET: &str = "lb-secret";

/// Environment variable carrying the NCP container image
pub const NCP_IMAGE_ENV: &str = "NCP_IMAGE";
/// Pod label selecting a managed component
pub const COMPONENT_LABEL: &str = "component";
/// Field manager used for server-side apply
pub const FIELD_MANAGER: &str = "nsx-ncp-operator";
