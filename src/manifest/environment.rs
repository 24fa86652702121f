// ABOUTME: Compose key/value blocks (environment, labels).
// ABOUTME: Accepts both the map form and the KEY=VALUE list form.

use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyValues(HashMap<String, String>);

impl KeyValues {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn into_inner(self) -> HashMap<String, String> {
        self.0
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawKeyValues {
    Map(HashMap<String, Value>),
    List(Vec<String>),
}

fn scalar_to_string(key: &str, value: Value) -> Result<String, String> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(format!("value of {} must be a scalar", key)),
    }
}

impl<'de> Deserialize<'de> for KeyValues {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawKeyValues::deserialize(deserializer)?;
        let map = match raw {
            RawKeyValues::Map(map) => map
                .into_iter()
                .map(|(k, v)| scalar_to_string(&k, v).map(|v| (k, v)))
                .collect::<Result<HashMap<_, _>, _>>()
                .map_err(serde::de::Error::custom)?,
            // A bare `KEY` in list form sets an empty value.
            RawKeyValues::List(entries) => entries
                .into_iter()
                .map(|entry| match entry.split_once('=') {
                    Some((k, v)) => (k.to_string(), v.to_string()),
                    None => (entry, String::new()),
                })
                .collect(),
        };
        Ok(KeyValues(map))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_form_stringifies_scalars() {
        let kv: KeyValues = serde_yaml::from_str("PORT: 8080\nDEBUG: true\nNAME: app").unwrap();
        assert_eq!(kv.get("PORT"), Some("8080"));
        assert_eq!(kv.get("DEBUG"), Some("true"));
        assert_eq!(kv.get("NAME"), Some("app"));
    }

    #[test]
    fn list_form_splits_on_first_equals() {
        let kv: KeyValues = serde_yaml::from_str("- URL=postgres://u:p@db/x?a=b\n- EMPTY").unwrap();
        assert_eq!(kv.get("URL"), Some("postgres://u:p@db/x?a=b"));
        assert_eq!(kv.get("EMPTY"), Some(""));
    }

    #[test]
    fn nested_values_are_rejected() {
        assert!(serde_yaml::from_str::<KeyValues>("KEY:\n  nested: 1").is_err());
    }
}
