//! The item table — canonical item order shared by every scorer.
//!
//! Row `i` of the embedding matrix, row `i` of the feature matrix and slot
//! `i` of every [`ScoreVector`](crate::types::ScoreVector) all refer to
//! `catalog.items()[i]`. Nothing in the scoring path reorders items.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::error::{MeepleError, Result};
use crate::types::{Item, ItemId};

/// Read-only item table with id and name lookups.
#[derive(Debug, Clone)]
pub struct ItemCatalog {
    items: Vec<Item>,
    index: HashMap<ItemId, usize>,
    by_name: HashMap<String, ItemId>,
}

impl ItemCatalog {
    /// Build a catalog; the order of `items` becomes the canonical index.
    ///
    /// # Errors
    /// Returns [`MeepleError::DuplicateItem`] if two items share an id.
    pub fn new(items: Vec<Item>) -> Result<Self> {
        let mut index = HashMap::with_capacity(items.len());
        let mut by_name = HashMap::with_capacity(items.len());

        for (i, item) in items.iter().enumerate() {
            if index.insert(item.id, i).is_some() {
                return Err(MeepleError::DuplicateItem(item.id));
            }
            // First occurrence wins for duplicate display names.
            by_name.entry(item.name.clone()).or_insert(item.id);
        }

        Ok(Self {
            items,
            index,
            by_name,
        })
    }

    /// Parse a JSON array of items.
    ///
    /// # Errors
    /// Returns [`MeepleError::Serialization`] on malformed JSON, or any
    /// error from [`ItemCatalog::new`].
    pub fn from_json(json: &str) -> Result<Self> {
        let items: Vec<Item> =
            serde_json::from_str(json).map_err(|e| MeepleError::Serialization(e.to_string()))?;
        Self::new(items)
    }

    /// Load a JSON item feed from disk.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// All items in canonical order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Item at canonical index `idx`.
    #[must_use]
    pub fn get(&self, idx: usize) -> Option<&Item> {
        self.items.get(idx)
    }

    /// Canonical index of an item id.
    #[must_use]
    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Look up an item by id.
    ///
    /// # Errors
    /// Returns [`MeepleError::UnknownItem`] if the id is not in the catalog.
    pub fn item(&self, id: ItemId) -> Result<&Item> {
        self.index_of(id)
            .map(|i| &self.items[i])
            .ok_or(MeepleError::UnknownItem(id))
    }

    /// Resolve an exact display name to its id.
    #[must_use]
    pub fn id_by_name(&self, name: &str) -> Option<ItemId> {
        self.by_name.get(name).copied()
    }

    /// Canonical indices for `ids`, skipping unknown ids and duplicates.
    /// Order follows first appearance in `ids`.
    #[must_use]
    pub fn indices_of(&self, ids: &[ItemId]) -> Vec<usize> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            match self.index_of(*id) {
                Some(i) if !out.contains(&i) => out.push(i),
                Some(_) => {}
                None => debug!(item = %id, "ignoring id not present in catalog"),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: u32, name: &str) -> Item {
        Item {
            id: ItemId(id),
            name: name.to_string(),
            description: String::new(),
            categories: Default::default(),
            mechanics: Default::default(),
            types: Default::default(),
            weight: 2.0,
            players: (2, 4),
            best_players: 3.0,
            play_time: (30, 60),
            avg_play_time: 45.0,
            year_published: 2010,
            avg_rating: 7.0,
        }
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = ItemCatalog::new(vec![item(1, "A"), item(1, "B")])
            .expect_err("duplicate should fail");
        assert!(matches!(err, MeepleError::DuplicateItem(ItemId(1))));
    }

    #[test]
    fn lookups_follow_canonical_order() {
        let catalog = ItemCatalog::new(vec![item(10, "Azul"), item(20, "Brass")]).expect("catalog");
        assert_eq!(catalog.index_of(ItemId(20)), Some(1));
        assert_eq!(catalog.id_by_name("Azul"), Some(ItemId(10)));
        assert_eq!(catalog.item(ItemId(10)).expect("item").name, "Azul");
        assert!(catalog.item(ItemId(99)).is_err());
    }

    #[test]
    fn indices_skip_unknown_and_duplicate_ids() {
        let catalog = ItemCatalog::new(vec![item(10, "Azul"), item(20, "Brass")]).expect("catalog");
        let idx = catalog.indices_of(&[ItemId(20), ItemId(99), ItemId(20), ItemId(10)]);
        assert_eq!(idx, vec![1, 0]);
    }

    #[test]
    fn parses_json_feed() {
        let json = r#"[{
            "id": 13, "name": "Catan", "categories": ["Negotiation"],
            "weight": 2.3, "players": [3, 4], "best_players": 4.0,
            "play_time": [60, 120], "avg_play_time": 90.0,
            "year_published": 1995, "avg_rating": 7.1
        }]"#;
        let catalog = ItemCatalog::from_json(json).expect("catalog");
        assert_eq!(catalog.len(), 1);
        assert!(catalog.items()[0].categories.contains("Negotiation"));
    }
}
