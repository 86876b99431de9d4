//! Baseline reconstruction from deployed ConfigMaps and the LB secret.

use super::{ConfigGenerator, DeployedFragments};
use crate::error::CollaboratorError;
use crate::operator_config::{keys, OperatorConfig};
use k8s_openapi::api::core::v1::Secret;

const TLS_CERT: &str = "tls.crt";
const TLS_KEY: &str = "tls.key";

/// Merges the node-agent and NCP ConfigMaps (NCP wins on shared keys) and
/// maps the LB secret's certificate pair back to `nsx_v3` keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct FragmentConfigGenerator;

fn secret_value(secret: &Secret, key: &str) -> Result<Option<String>, CollaboratorError> {
    if let Some(value) = secret.string_data.as_ref().and_then(|d| d.get(key)) {
        return Ok(Some(value.clone()));
    }
    match secret.data.as_ref().and_then(|d| d.get(key)) {
        Some(bytes) => String::from_utf8(bytes.0.clone())
            .map(Some)
            .map_err(|_| CollaboratorError::Invalid(format!("secret key {} is not valid UTF-8", key))),
        None => Ok(None),
    }
}

impl ConfigGenerator for FragmentConfigGenerator {
    fn generate(&self, fragments: &DeployedFragments) -> Result<OperatorConfig, CollaboratorError> {
        let mut config = OperatorConfig::default();
        for config_map in [&fragments.node_agent_config, &fragments.ncp_config] {
            for (key, value) in config_map.data.iter().flatten() {
                config.set(key.clone(), value.clone());
            }
        }

        if let Some(secret) = &fragments.lb_secret {
            if let Some(cert) = secret_value(secret, TLS_CERT)? {
                config.set(keys::LB_DEFAULT_CERT, cert);
            }
            if let Some(key) = secret_value(secret, TLS_KEY)? {
                config.set(keys::LB_PRIV_KEY, key);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ConfigMap;
    use k8s_openapi::ByteString;
    use std::collections::BTreeMap;

    fn config_map(pairs: &[(&str, &str)]) -> ConfigMap {
        ConfigMap {
            data: Some(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_ncp_wins_on_shared_keys() {
        let fragments = DeployedFragments {
            ncp_config: config_map(&[("coe.cluster", "from-ncp"), ("nsx_v3.nsx_api_managers", "10.0.0.1")]),
            node_agent_config: config_map(&[("coe.cluster", "from-agent"), ("nsx_node_agent.ovs_bridge", "br-int")]),
            lb_secret: None,
        };

        let config = FragmentConfigGenerator.generate(&fragments).unwrap();
        assert_eq!(config.get("coe.cluster"), Some("from-ncp"));
        assert_eq!(config.get("nsx_node_agent.ovs_bridge"), Some("br-int"));
        assert_eq!(config.get("nsx_v3.nsx_api_managers"), Some("10.0.0.1"));
    }

    #[test]
    fn test_lb_secret_maps_to_cert_keys() {
        let mut data = BTreeMap::new();
        data.insert("tls.crt".to_string(), ByteString(b"CERT".to_vec()));
        data.insert("tls.key".to_string(), ByteString(b"KEY".to_vec()));
        let fragments = DeployedFragments {
            ncp_config: config_map(&[]),
            node_agent_config: config_map(&[]),
            lb_secret: Some(Secret {
                data: Some(data),
                ..Default::default()
            }),
        };

        let config = FragmentConfigGenerator.generate(&fragments).unwrap();
        assert_eq!(config.get(keys::LB_DEFAULT_CERT), Some("CERT"));
        assert_eq!(config.get(keys::LB_PRIV_KEY), Some("KEY"));
    }

    #[test]
    fn test_non_utf8_secret_is_rejected() {
        let mut data = BTreeMap::new();
        data.insert("tls.crt".to_string(), ByteString(vec![0xff, 0xfe]));
        let fragments = DeployedFragments {
            ncp_config: config_map(&[]),
            node_agent_config: config_map(&[]),
            lb_secret: Some(Secret {
                data: Some(data),
                ..Default::default()
            }),
        };

        assert!(matches!(
            FragmentConfigGenerator.generate(&fragments),
            Err(CollaboratorError::Invalid(_))
        ));
    }
}
