// src/config.rs
//! Bridge configuration

use serde::{Deserialize, Serialize};

/// Package identifier of the launcher itself
pub const DEFAULT_OWN_PACKAGE: &str = "com.cloudcatcher.mars_launcher";

/// Configuration for a [`crate::api::LauncherBridge`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BridgeConfig {
    /// Package excluded from enumeration (the hosting app)
    pub own_package: String,
    /// Prefix of every channel name; falls back to `own_package`
    pub channel_namespace: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            own_package: DEFAULT_OWN_PACKAGE.to_string(),
            channel_namespace: None,
        }
    }
}

impl BridgeConfig {
    pub fn new(own_package: impl Into<String>) -> Self {
        Self {
            own_package: own_package.into(),
            channel_namespace: None,
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.channel_namespace = Some(namespace.into());
        self
    }

    pub fn namespace(&self) -> &str {
        self.channel_namespace.as_deref().unwrap_or(&self.own_package)
    }

    /// Full channel name, e.g. `com.cloudcatcher.mars_launcher/launch_app`
    pub fn channel_name(&self, short: &str) -> String {
        format!("{}/{}", self.namespace(), short)
    }

    /// Strip the namespace from a full channel name
    pub fn short_channel_name<'a>(&self, full: &'a str) -> Option<&'a str> {
        full.strip_prefix(self.namespace())?.strip_prefix('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_defaults_to_own_package() {
        let config = BridgeConfig::default();
        assert_eq!(
            config.channel_name("launch_app"),
            "com.cloudcatcher.mars_launcher/launch_app"
        );
        assert_eq!(
            config.short_channel_name("com.cloudcatcher.mars_launcher/installed_apps"),
            Some("installed_apps")
        );
        assert_eq!(config.short_channel_name("other/installed_apps"), None);
    }

    #[test]
    fn deserializes_partial_config() {
        let config: BridgeConfig =
            serde_json::from_str(r#"{"channelNamespace": "dev.launcher"}"#).unwrap();
        assert_eq!(config.own_package, DEFAULT_OWN_PACKAGE);
        assert_eq!(config.channel_name("x"), "dev.launcher/x");
    }
}
