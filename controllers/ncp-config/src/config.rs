//! Operator settings loaded from environment variables.

use crate::error::ControllerError;
use crate::names::NCP_IMAGE_ENV;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PROBE_PORT: u16 = 8081;
const DEFAULT_DEBOUNCE_SECS: u64 = 1;
const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;
const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Process-wide settings for the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSettings {
    /// Image for the NCP deployment and daemonsets
    pub ncp_image: String,
    /// Port serving /healthz, /readyz and /metrics
    pub probe_port: u16,
    /// Quiet period before a burst of watch events triggers a cycle
    pub debounce: Duration,
    /// First retry delay after a failed cycle
    pub backoff_min_secs: u64,
    /// Upper bound on the retry delay
    pub backoff_max_secs: u64,
}

fn parse_or<T: FromStr>(
    name: &str,
    value: Option<String>,
    default: T,
) -> Result<T, ControllerError> {
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| {
            ControllerError::InvalidConfig(format!("{} must be a number, got {:?}", name, raw))
        }),
    }
}

impl OperatorSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let ncp_image = lookup(NCP_IMAGE_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                ControllerError::InvalidConfig(format!("{} environment variable is required", NCP_IMAGE_ENV))
            })?;
        let probe_port = parse_or("PROBE_PORT", lookup("PROBE_PORT"), DEFAULT_PROBE_PORT)?;
        let debounce_secs = parse_or(
            "RECONCILE_DEBOUNCE_SECS",
            lookup("RECONCILE_DEBOUNCE_SECS"),
            DEFAULT_DEBOUNCE_SECS,
        )?;
        let backoff_min_secs = parse_or("BACKOFF_MIN_SECS", lookup("BACKOFF_MIN_SECS"), DEFAULT_BACKOFF_MIN_SECS)?;
        let backoff_max_secs = parse_or("BACKOFF_MAX_SECS", lookup("BACKOFF_MAX_SECS"), DEFAULT_BACKOFF_MAX_SECS)?;

        if backoff_min_secs == 0 || backoff_min_secs > backoff_max_secs {
            return Err(ControllerError::InvalidConfig(format!(
                "BACKOFF_MIN_SECS ({}) must be positive and not exceed BACKOFF_MAX_SECS ({})",
                backoff_min_secs, backoff_max_secs
            )));
        }

        Ok(Self {
            ncp_image,
            probe_port,
            debounce: Duration::from_secs(debounce_secs),
            backoff_min_secs,
            backoff_max_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<OperatorSettings, ControllerError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        OperatorSettings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[("NCP_IMAGE", "ncp:1")]).unwrap();
        assert_eq!(settings.ncp_image, "ncp:1");
        assert_eq!(settings.probe_port, 8081);
        assert_eq!(settings.debounce, Duration::from_secs(1));
        assert_eq!(settings.backoff_min_secs, 5);
        assert_eq!(settings.backoff_max_secs, 300);
    }

    #[test]
    fn test_image_required() {
        assert!(matches!(settings(&[]), Err(ControllerError::InvalidConfig(_))));
        assert!(settings(&[("NCP_IMAGE", " ")]).is_err());
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let parsed = settings(&[("NCP_IMAGE", "ncp:1"), ("PROBE_PORT", "9090"), ("BACKOFF_MAX_SECS", "60")]).unwrap();
        assert_eq!(parsed.probe_port, 9090);
        assert_eq!(parsed.backoff_max_secs, 60);

        assert!(settings(&[("NCP_IMAGE", "ncp:1"), ("PROBE_PORT", "http")]).is_err());
        assert!(settings(&[("NCP_IMAGE", "ncp:1"), ("BACKOFF_MIN_SECS", "600")]).is_err());
    }
}
