//! In-process single-table engine.
//!
//! Items live in one ordered map keyed by `(pk, sk)`, so a partition query is
//! a contiguous range. Secondary-index queries walk the table and match the
//! projection — the in-memory stand-in for a store-maintained index, with the
//! same observable ordering (index sort key, then primary key).

use std::collections::BTreeMap;

use parking_lot::RwLock;

use shopfront_core::error::Result;

use crate::item::{IndexName, Item};

#[derive(Debug, Default)]
pub struct WideColumnTable {
    items: RwLock<BTreeMap<(String, String), Item>>,
}

impl WideColumnTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, pk: &str, sk: &str) -> Option<Item> {
        self.items
            .read()
            .get(&(pk.to_string(), sk.to_string()))
            .cloned()
    }

    /// Insert a new item. Returns `false` when the key is already taken.
    pub fn insert(&self, item: Item) -> bool {
        let mut items = self.items.write();
        let key = (item.pk.clone(), item.sk.clone());
        if items.contains_key(&key) {
            return false;
        }
        items.insert(key, item);
        true
    }

    /// Unconditional put (insert or replace).
    pub fn put(&self, item: Item) {
        let mut items = self.items.write();
        items.insert((item.pk.clone(), item.sk.clone()), item);
    }

    /// Remove one item. Returns `false` when it was absent.
    pub fn delete(&self, pk: &str, sk: &str) -> bool {
        self.items
            .write()
            .remove(&(pk.to_string(), sk.to_string()))
            .is_some()
    }

    /// Remove a whole partition (metadata plus children). Returns the number
    /// of items removed.
    pub fn delete_partition(&self, pk: &str) -> usize {
        let mut items = self.items.write();
        let keys: Vec<_> = items
            .range((pk.to_string(), String::new())..)
            .take_while(|((item_pk, _), _)| item_pk == pk)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            items.remove(key);
        }
        keys.len()
    }

    /// All items of one partition in sort-key order.
    pub fn query_partition(&self, pk: &str) -> Vec<Item> {
        self.items
            .read()
            .range((pk.to_string(), String::new())..)
            .take_while(|((item_pk, _), _)| item_pk == pk)
            .map(|(_, item)| item.clone())
            .collect()
    }

    /// Items of one partition whose sort key starts with `sk_prefix`.
    pub fn query_prefix(&self, pk: &str, sk_prefix: &str) -> Vec<Item> {
        self.items
            .read()
            .range((pk.to_string(), sk_prefix.to_string())..)
            .take_while(|((item_pk, sk), _)| item_pk == pk && sk.starts_with(sk_prefix))
            .map(|(_, item)| item.clone())
            .collect()
    }

    /// Secondary-index query: all items whose projection on `index` has the
    /// given partition value, ordered by index sort key then primary key.
    pub fn query_index(&self, index: IndexName, partition: &str) -> Vec<Item> {
        let items = self.items.read();
        let mut hits: Vec<&Item> = items
            .values()
            .filter(|item| {
                item.index(index)
                    .is_some_and(|key| key.partition == partition)
            })
            .collect();
        hits.sort_by(|a, b| {
            let sa = a.index(index).map(|key| key.sort.as_str()).unwrap_or("");
            let sb = b.index(index).map(|key| key.sort.as_str()).unwrap_or("");
            sa.cmp(sb).then_with(|| a.pk.cmp(&b.pk))
        });
        hits.into_iter().cloned().collect()
    }

    /// Full-table scan filtered by the `entity_type` discriminator. The
    /// expensive fallback behind un-indexed `find_all` calls.
    pub fn scan_type(&self, entity_type: &str) -> Vec<Item> {
        self.items
            .read()
            .values()
            .filter(|item| item.entity_type == entity_type)
            .cloned()
            .collect()
    }

    pub fn count_type(&self, entity_type: &str) -> usize {
        self.items
            .read()
            .values()
            .filter(|item| item.entity_type == entity_type)
            .count()
    }

    /// Atomically mutate one item under the write lock.
    ///
    /// `f` runs against a working copy; the table is only updated when it
    /// returns `Ok`, so a failed conditional update (a stock adjustment that
    /// would go negative, say) leaves the item untouched. Returns `Ok(None)`
    /// when the item does not exist.
    pub fn modify<R>(
        &self,
        pk: &str,
        sk: &str,
        f: impl FnOnce(&mut Item) -> Result<R>,
    ) -> Result<Option<R>> {
        let mut items = self.items.write();
        let Some(item) = items.get_mut(&(pk.to_string(), sk.to_string())) else {
            return Ok(None);
        };
        let mut working = item.clone();
        let out = f(&mut working)?;
        *item = working;
        Ok(Some(out))
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use shopfront_core::StoreError;

    fn item(pk: &str, sk: &str, entity_type: &str) -> Item {
        Item::new(pk, sk, entity_type, Map::new())
    }

    #[test]
    fn partition_query_is_contiguous_and_sorted() {
        let table = WideColumnTable::new();
        table.put(item("PRODUCT#b", "REVIEW#1", "REVIEW"));
        table.put(item("PRODUCT#b", "METADATA", "PRODUCT"));
        table.put(item("PRODUCT#a", "METADATA", "PRODUCT"));
        table.put(item("PRODUCT#c", "METADATA", "PRODUCT"));

        let partition = table.query_partition("PRODUCT#b");
        assert_eq!(partition.len(), 2);
        assert_eq!(partition[0].sk, "METADATA");
        assert_eq!(partition[1].sk, "REVIEW#1");
    }

    #[test]
    fn failed_modify_leaves_item_untouched() {
        let table = WideColumnTable::new();
        let mut meta = item("PRODUCT#a", "METADATA", "PRODUCT");
        meta.attributes.insert("stock".into(), 3.into());
        table.put(meta);

        let result = table.modify("PRODUCT#a", "METADATA", |working| {
            working.attributes.insert("stock".into(), 0.into());
            Err::<(), _>(StoreError::validation("conditional check failed"))
        });
        assert!(result.is_err());
        assert_eq!(
            table.get("PRODUCT#a", "METADATA").unwrap().attr_i64("stock"),
            Some(3)
        );
    }

    #[test]
    fn delete_partition_takes_children_along() {
        let table = WideColumnTable::new();
        table.put(item("ORDER#1", "METADATA", "ORDER"));
        table.put(item("ORDER#1", "ITEM#0001", "ORDER_ITEM"));
        table.put(item("ORDER#2", "METADATA", "ORDER"));

        assert_eq!(table.delete_partition("ORDER#1"), 2);
        assert_eq!(table.len(), 1);
    }
}
