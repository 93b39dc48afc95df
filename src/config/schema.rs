//! Configuration schema definitions.
//!
//! Keys are PascalCase (`Cores`, `MQTT.Listen`, `Services.<name>.Enabled`).
//! Lower-case spellings are accepted on input.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Root configuration for the supervisor.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CasaConfig {
    /// Worker threads for the runtime. 0 uses every available core.
    #[serde(rename = "Cores", alias = "cores")]
    pub cores: usize,

    /// Print debugging output.
    #[serde(rename = "Debug", alias = "debug")]
    pub debug: bool,

    /// Message transport settings, visible to every service.
    #[serde(rename = "MQTT", alias = "mqtt")]
    pub mqtt: MqttConfig,

    /// Candidate services keyed by registry name.
    #[serde(rename = "Services", alias = "services")]
    pub services: BTreeMap<String, ServiceSection>,
}

impl Default for CasaConfig {
    fn default() -> Self {
        let mut services = BTreeMap::new();
        services.insert(
            "Logger".to_string(),
            ServiceSection::new(true).with("Topics", vec!["#"]),
        );
        services.insert(
            "Hue".to_string(),
            ServiceSection::new(false)
                .with("BridgeIP", "")
                .with("User", ""),
        );
        services.insert(
            "Storage".to_string(),
            ServiceSection::new(true).with("Topics", vec!["#"]),
        );

        Self {
            services,
            ..Self::without_services()
        }
    }
}

impl CasaConfig {
    /// Shipped defaults minus the service sections.
    pub fn without_services() -> Self {
        Self {
            cores: 0,
            debug: true,
            mqtt: MqttConfig::default(),
            services: BTreeMap::new(),
        }
    }

    /// Look up a service section by name.
    pub fn service(&self, name: &str) -> Option<&ServiceSection> {
        self.services.get(name)
    }
}

/// `MQTT` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct MqttConfig {
    /// Transport listen address, e.g. `tcp://:1883`.
    #[serde(rename = "Listen", alias = "listen")]
    pub listen: String,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            listen: "tcp://:1883".to_string(),
        }
    }
}

/// `Services.<name>` section: the `Enabled` switch plus service-specific keys.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServiceSection {
    #[serde(
        rename = "Enabled",
        alias = "enabled",
        default,
        deserialize_with = "bool_or_string"
    )]
    pub enabled: bool,

    #[serde(flatten)]
    pub settings: toml::Table,
}

impl ServiceSection {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            settings: toml::Table::new(),
        }
    }

    /// Add a service-specific key.
    pub fn with(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.settings.insert(key.to_string(), value.into());
        self
    }

    /// The section as a plain table, `Enabled` included.
    pub fn to_table(&self) -> toml::Table {
        let mut table = self.settings.clone();
        table.insert("Enabled".to_string(), toml::Value::Boolean(self.enabled));
        table
    }
}

// Older generated files wrote `Enabled = "true"`.
fn bool_or_string<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(value) => Ok(value),
        Flag::Text(text) => text
            .trim()
            .parse::<bool>()
            .map_err(|_| serde::de::Error::custom(format!("expected a boolean, got {:?}", text))),
    }
}
