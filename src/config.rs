use crate::types::{PoseFields, Transport};
use crate::{Result, WebArError};

/// Environment variable selecting the transport (`shared` or `handle`).
pub const ENV_TRANSPORT: &str = "WEBAR_TRANSPORT";
/// Environment variable enabling the projection matrix field.
pub const ENV_PROJECTION: &str = "WEBAR_PROJECTION";
/// Environment variable enabling the redundant position field.
pub const ENV_POSITION: &str = "WEBAR_POSITION";

/// How the bridge exchanges pose data with the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BridgeConfig {
    pub transport: Transport,
    pub fields: PoseFields,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Shared,
            fields: PoseFields::VIEW,
        }
    }
}

impl BridgeConfig {
    pub fn new(transport: Transport, fields: PoseFields) -> Self {
        Self { transport, fields }
    }

    /// Build from `WEBAR_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let transport = match read_string(&lookup, ENV_TRANSPORT, "shared").as_str() {
            "shared" => Transport::Shared,
            "handle" => Transport::Handle,
            other => {
                log::warn!(
                    "Unknown {}='{}', using shared (supported: shared|handle)",
                    ENV_TRANSPORT,
                    other
                );
                Transport::Shared
            }
        };

        let mut fields = PoseFields::VIEW;
        if read_bool(&lookup, ENV_PROJECTION, false) {
            fields |= PoseFields::PROJECTION;
        }
        if read_bool(&lookup, ENV_POSITION, false) {
            fields |= PoseFields::POSITION;
        }

        let config = Self { transport, fields };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fields.contains(PoseFields::VIEW) {
            return Err(WebArError::InvalidConfig(
                "pose layout must carry the view matrix".into(),
            ));
        }
        if self.transport == Transport::Handle && self.fields.contains(PoseFields::POSITION) {
            return Err(WebArError::InvalidConfig(
                "handle transport cannot carry a redundant position".into(),
            ));
        }
        Ok(())
    }
}

fn read_bool<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str, default: bool) -> bool {
    lookup(name)
        .and_then(|v| {
            let v = v.trim().to_ascii_lowercase();
            match v.as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            }
        })
        .unwrap_or(default)
}

fn read_string<F: Fn(&str) -> Option<String>>(lookup: &F, name: &str, default: &str) -> String {
    lookup(name)
        .map(|v| v.trim().to_ascii_lowercase())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_handle_with_projection() {
        let config = BridgeConfig::from_lookup(lookup(&[
            (ENV_TRANSPORT, " Handle "),
            (ENV_PROJECTION, "yes"),
        ]))
        .unwrap();
        assert_eq!(config.transport, Transport::Handle);
        assert_eq!(config.fields, PoseFields::VIEW | PoseFields::PROJECTION);
    }

    #[test]
    fn test_unknown_values_fall_back() {
        let config = BridgeConfig::from_lookup(lookup(&[
            (ENV_TRANSPORT, "carrier-pigeon"),
            (ENV_PROJECTION, "maybe"),
        ]))
        .unwrap();
        assert_eq!(config, BridgeConfig::default());
    }

    #[test]
    fn test_handle_with_position_rejected() {
        let result = BridgeConfig::from_lookup(lookup(&[
            (ENV_TRANSPORT, "handle"),
            (ENV_POSITION, "1"),
        ]));
        assert!(matches!(result, Err(WebArError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_view_rejected() {
        let config = BridgeConfig::new(Transport::Shared, PoseFields::PROJECTION);
        assert!(config.validate().is_err());
    }
}
