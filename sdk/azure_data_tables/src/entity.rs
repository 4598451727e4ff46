//! Table entity model.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// A single table entity: partition key, row key, and a set of named
/// properties.
///
/// # Example
///
/// ```rust
/// use azure_data_tables::entity::TableEntity;
///
/// let entity = TableEntity::new("sales", "order-001")
///     .property("Amount", 250)
///     .property("Region", "emea");
///
/// assert_eq!(entity.partition_key(), "sales");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableEntity {
    partition_key: String,
    row_key: String,
    properties: Map<String, Value>,
}

impl TableEntity {
    /// Create an entity with the given keys and no properties.
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            properties: Map::new(),
        }
    }

    /// Add or replace a property, consuming and returning the entity.
    pub fn property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Get the partition key.
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    /// Get the row key.
    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    /// Get a property value by name.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// All properties, excluding the keys.
    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// The JSON object sent to the service: all properties with
    /// `PartitionKey` and `RowKey` alongside. The key fields win over
    /// properties with the same names.
    pub(crate) fn to_json(&self) -> Value {
        let mut object = Map::with_capacity(self.properties.len() + 2);
        for (name, value) in &self.properties {
            object.insert(name.clone(), value.clone());
        }
        object.insert(
            "PartitionKey".to_string(),
            Value::String(self.partition_key.clone()),
        );
        object.insert("RowKey".to_string(), Value::String(self.row_key.clone()));
        Value::Object(object)
    }
}

impl Serialize for TableEntity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}
