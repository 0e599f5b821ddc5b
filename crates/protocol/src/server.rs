//! Server configuration and capability listing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfiguration {
    #[serde(rename = "cfgVer", default)]
    pub version: i64,
    #[serde(default)]
    pub capabilities: HashMap<String, Vec<String>>,
}

impl ServerConfiguration {
    pub fn supports(&self, group: &str, capability: &str) -> bool {
        self.capabilities
            .get(group)
            .is_some_and(|values| values.iter().any(|value| value == capability))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfigurationEnvelope {
    #[serde(rename = "serverConfiguration")]
    pub configuration: ServerConfiguration,
}
