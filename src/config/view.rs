//! Per-service configuration view.

use serde::de::DeserializeOwned;

use crate::config::loader::ConfigError;
use crate::config::schema::{CasaConfig, MqttConfig};

/// Snapshot handed to one `Service::start` call: the service section with
/// the global `MQTT` section merged in under `MQTT`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigView {
    service: String,
    table: toml::Table,
}

impl ConfigView {
    /// Build the view for `name` from a configuration snapshot.
    pub fn for_service(config: &CasaConfig, name: &str) -> Self {
        let mut table = config
            .service(name)
            .map(|section| section.to_table())
            .unwrap_or_default();
        table.insert("MQTT".to_string(), mqtt_table(&config.mqtt));

        Self {
            service: name.to_string(),
            table,
        }
    }

    /// Wrap an arbitrary table.
    pub fn from_table(service: impl Into<String>, table: toml::Table) -> Self {
        Self {
            service: service.into(),
            table,
        }
    }

    /// Name of the service this view was built for.
    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn table(&self) -> &toml::Table {
        &self.table
    }

    /// Look up a dotted key such as `MQTT.Listen`. Each segment matches
    /// exactly first, then ignoring ASCII case.
    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        let mut segments = key.split('.');
        let mut current = lookup(&self.table, segments.next()?)?;
        for segment in segments {
            current = lookup(current.as_table()?, segment)?;
        }
        Some(current)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key)?.as_bool()
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key)?.as_integer()
    }

    /// A list of strings. Non-string entries are skipped.
    pub fn get_string_list(&self, key: &str) -> Option<Vec<String>> {
        let values = self.get(key)?.as_array()?;
        Some(
            values
                .iter()
                .filter_map(|value| value.as_str().map(str::to_string))
                .collect(),
        )
    }

    /// The transport settings every service sees.
    pub fn mqtt(&self) -> MqttConfig {
        self.get("MQTT")
            .cloned()
            .and_then(|value| value.try_into().ok())
            .unwrap_or_default()
    }

    /// Deserialize the whole view into a typed settings struct.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        toml::Value::Table(self.table.clone())
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Service {
                service: self.service.clone(),
                reason: e.to_string(),
            })
    }
}

fn lookup<'a>(table: &'a toml::Table, key: &str) -> Option<&'a toml::Value> {
    table.get(key).or_else(|| {
        table
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
    })
}

fn mqtt_table(mqtt: &MqttConfig) -> toml::Value {
    let mut table = toml::Table::new();
    table.insert("Listen".to_string(), toml::Value::String(mqtt.listen.clone()));
    toml::Value::Table(table)
}
