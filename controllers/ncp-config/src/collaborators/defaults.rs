//! Defaulting and validation against the cluster Network spec.

use super::ConfigDefaulter;
use crate::error::CollaboratorError;
use crate::operator_config::{keys, OperatorConfig};
use crds::NetworkSpec;
use std::net::IpAddr;

const NETWORK_TYPE: &str = "ncp";
const DEFAULT_ADAPTOR: &str = "openshift4";
const DEFAULT_CLUSTER: &str = "cluster";
const DEFAULT_OVS_BRIDGE: &str = "br-int";

/// Defaults derived from the cluster Network plus static fallbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetworkDefaulter;

/// Parses `addr/prefix`, checking the prefix against the address family.
fn valid_cidr(value: &str) -> bool {
    let Some((addr, prefix)) = value.trim().split_once('/') else {
        return false;
    };
    let Ok(addr) = addr.parse::<IpAddr>() else {
        return false;
    };
    let Ok(prefix) = prefix.parse::<u8>() else {
        return false;
    };
    match addr {
        IpAddr::V4(_) => prefix <= 32,
        IpAddr::V6(_) => prefix <= 128,
    }
}

impl ConfigDefaulter for NetworkDefaulter {
    fn fill_defaults(&self, config: &mut OperatorConfig, network: &NetworkSpec) -> Result<(), CollaboratorError> {
        if network.cluster_network.is_empty() {
            return Err(CollaboratorError::Missing("clusterNetwork in Network spec".to_string()));
        }

        let blocks = network
            .cluster_network
            .iter()
            .map(|entry| entry.cidr.as_str())
            .collect::<Vec<_>>()
            .join(",");
        config.set_default(keys::CONTAINER_IP_BLOCKS, blocks);
        if let Some(service) = network.service_network.first() {
            config.set_default(keys::SERVICE_CLUSTER_IP_RANGE, service.clone());
        }
        config.set_default(keys::COE_ADAPTOR, DEFAULT_ADAPTOR);
        config.set_default(keys::COE_CLUSTER, DEFAULT_CLUSTER);
        config.set_default(keys::OVS_BRIDGE, DEFAULT_OVS_BRIDGE);
        Ok(())
    }

    fn validate(&self, config: &OperatorConfig, network: &NetworkSpec) -> Result<(), CollaboratorError> {
        if !network.network_type.eq_ignore_ascii_case(NETWORK_TYPE) {
            return Err(CollaboratorError::Invalid(format!(
                "unsupported networkType {:?}, expected {}",
                network.network_type, NETWORK_TYPE
            )));
        }

        if !config.is_set(keys::NSX_API_MANAGERS) {
            return Err(CollaboratorError::Invalid(format!("{} must be set", keys::NSX_API_MANAGERS)));
        }

        if let Some(blocks) = config.get(keys::CONTAINER_IP_BLOCKS) {
            if let Some(bad) = blocks.split(',').find(|block| !valid_cidr(block)) {
                return Err(CollaboratorError::Invalid(format!(
                    "{} contains invalid CIDR {:?}",
                    keys::CONTAINER_IP_BLOCKS,
                    bad.trim()
                )));
            }
        }

        if config.is_set(keys::LB_DEFAULT_CERT) != config.is_set(keys::LB_PRIV_KEY) {
            return Err(CollaboratorError::Invalid(format!(
                "{} and {} must be set together",
                keys::LB_DEFAULT_CERT,
                keys::LB_PRIV_KEY
            )));
        }
        Ok(())
    }
}
