//! NCP Operator CRD Definitions
//!
//! Kubernetes Custom Resource Definitions consumed by the NCP operator.

pub mod network;

pub use network::*;
