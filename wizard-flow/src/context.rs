use dashmap::DashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Key/value state shared by every step of a wizard session.
///
/// Values are stored as JSON so a session can be persisted as a whole.
/// Clones share the same underlying map.
#[derive(Clone, Debug)]
pub struct Context {
    data: Arc<DashMap<String, Value>>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }

    pub async fn set(&self, key: impl Into<String>, value: impl Serialize) {
        self.set_sync(key, value);
    }

    pub fn set_sync(&self, key: impl Into<String>, value: impl Serialize) {
        let key = key.into();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.data.insert(key, value);
            }
            Err(e) => warn!(key = %key, error = %e, "Dropping context value that failed to serialize"),
        }
    }

    pub async fn get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_sync(key)
    }

    /// Synchronous read, usable from edge conditions
    pub fn get_sync<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub async fn remove(&self, key: &str) -> Option<Value> {
        self.data.remove(key).map(|(_, v)| v)
    }

    /// Snapshot of every entry, ordered by key
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.data
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for Context {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.snapshot().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Context {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = BTreeMap::<String, Value>::deserialize(deserializer)?;
        let data = DashMap::new();
        for (key, value) in entries {
            data.insert(key, value);
        }
        Ok(Self {
            data: Arc::new(data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_state() {
        let context = Context::new();
        let other = context.clone();
        context.set("complaint", "chest pain").await;

        let value: Option<String> = other.get("complaint").await;
        assert_eq!(value.as_deref(), Some("chest pain"));
    }

    #[tokio::test]
    async fn wrong_type_reads_as_none() {
        let context = Context::new();
        context.set("age", 54).await;

        assert_eq!(context.get_sync::<u32>("age"), Some(54));
        assert!(context.get_sync::<String>("age").is_none());
    }

    #[test]
    fn survives_json_round_trip() {
        let context = Context::new();
        context.set_sync("step", "history");

        let json = serde_json::to_string(&context).unwrap();
        let restored: Context = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.get_sync::<String>("step").as_deref(), Some("history"));
    }
}
