// src/core/intent.rs
//! Platform intents and the `package:` data URIs they carry

use serde::{Deserialize, Serialize};
use std::fmt;

pub const ACTION_MAIN: &str = "android.intent.action.MAIN";
pub const ACTION_PACKAGE_ADDED: &str = "android.intent.action.PACKAGE_ADDED";
pub const ACTION_PACKAGE_REMOVED: &str = "android.intent.action.PACKAGE_REMOVED";
pub const ACTION_HOME_SETTINGS: &str = "android.settings.HOME_SETTINGS";
pub const ACTION_APPLICATION_DETAILS_SETTINGS: &str =
    "android.settings.APPLICATION_DETAILS_SETTINGS";

pub const CATEGORY_LAUNCHER: &str = "android.intent.category.LAUNCHER";

/// Scheme used by package broadcasts and app-details settings
pub const PACKAGE_SCHEME: &str = "package";

/// An intent as seen by this crate: enough to start an activity or
/// describe a received broadcast
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Intent {
    pub action: Option<String>,
    /// Data URI, e.g. `package:com.example.app`
    pub data: Option<String>,
    /// Explicit target package (launch intents)
    pub package: Option<String>,
    pub categories: Vec<String>,
}

impl Intent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// The main/launcher intent resolved for `package`
    pub fn launcher_for(package: impl Into<String>) -> Self {
        Self {
            action: Some(ACTION_MAIN.to_string()),
            data: None,
            package: Some(package.into()),
            categories: vec![CATEGORY_LAUNCHER.to_string()],
        }
    }

    /// Intent for the default-home-app chooser
    pub fn home_settings() -> Self {
        Self::new(ACTION_HOME_SETTINGS)
    }

    /// Intent for the app details screen of exactly `package`
    pub fn app_details_settings(package: &str) -> Self {
        Self::new(ACTION_APPLICATION_DETAILS_SETTINGS).with_data(package_uri(package))
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// Scheme-specific part of the data URI (`package:foo` -> `foo`)
    pub fn data_scheme_specific_part(&self) -> Option<&str> {
        self.data.as_deref().map(scheme_specific_part)
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Intent {{ act={}", self.action.as_deref().unwrap_or("-"))?;
        if let Some(data) = &self.data {
            write!(f, " dat={}", data)?;
        }
        if let Some(pkg) = &self.package {
            write!(f, " pkg={}", pkg)?;
        }
        write!(f, " }}")
    }
}

pub fn package_uri(package: &str) -> String {
    format!("{}:{}", PACKAGE_SCHEME, package)
}

/// Everything after the scheme separator; a URI without a scheme is
/// returned whole
pub fn scheme_specific_part(uri: &str) -> &str {
    match uri.split_once(':') {
        Some((_scheme, rest)) => rest,
        None => uri,
    }
}

/// Matches broadcasts by action and data scheme
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntentFilter {
    pub actions: Vec<String>,
    pub data_schemes: Vec<String>,
}

impl IntentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_action(mut self, action: &str) -> Self {
        self.actions.push(action.to_string());
        self
    }

    pub fn add_data_scheme(mut self, scheme: &str) -> Self {
        self.data_schemes.push(scheme.to_string());
        self
    }

    pub fn matches(&self, intent: &Intent) -> bool {
        let action_ok = intent
            .action()
            .map(|a| self.actions.iter().any(|x| x == a))
            .unwrap_or(false);
        if !action_ok {
            return false;
        }
        if self.data_schemes.is_empty() {
            return true;
        }
        match intent.data.as_deref().and_then(|d| d.split_once(':')) {
            Some((scheme, _)) => self.data_schemes.iter().any(|s| s == scheme),
            None => false,
        }
    }
}
