//! Physical item representation for the single-table layout.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sort key of the metadata item of every partition.
pub const METADATA_SK: &str = "METADATA";

/// The three secondary indexes. Projection names are part of the persisted
/// layout and must stay stable across migration phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexName {
    Gsi1,
    Gsi2,
    Gsi3,
}

/// A denormalized partition/sort pair stored on an item solely to support an
/// alternate query pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKey {
    pub partition: String,
    pub sort: String,
}

impl IndexKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

/// One physical record: partition/sort key, the `entity_type` discriminator
/// every item carries so store-wide scans can be filtered, the attribute map,
/// and up to three secondary-index projections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub pk: String,
    pub sk: String,
    pub entity_type: String,
    pub attributes: Map<String, Value>,
    pub gsi1: Option<IndexKey>,
    pub gsi2: Option<IndexKey>,
    pub gsi3: Option<IndexKey>,
}

impl Item {
    pub fn new(
        pk: impl Into<String>,
        sk: impl Into<String>,
        entity_type: impl Into<String>,
        attributes: Map<String, Value>,
    ) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
            entity_type: entity_type.into(),
            attributes,
            gsi1: None,
            gsi2: None,
            gsi3: None,
        }
    }

    pub fn index(&self, name: IndexName) -> Option<&IndexKey> {
        match name {
            IndexName::Gsi1 => self.gsi1.as_ref(),
            IndexName::Gsi2 => self.gsi2.as_ref(),
            IndexName::Gsi3 => self.gsi3.as_ref(),
        }
    }

    pub fn attr_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }

    pub fn attr_i64(&self, name: &str) -> Option<i64> {
        self.attributes.get(name).and_then(Value::as_i64)
    }

    pub fn is_metadata(&self) -> bool {
        self.sk == METADATA_SK
    }
}
