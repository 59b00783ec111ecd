//! # Catalog Collections
//!
//! Containers for the catalogs the host returns: commands, options and
//! library entities. Commands and options are keyed by a dotted name such
//! as `Edit.Copy` or `engraving.staff.lineThickness`, and can be browsed as
//! a tree built from those dots.

use crate::error::CollectionError;
use serde::de::{Deserialize, Deserializer, Error as DeError};
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// An item that can be filed by its dotted name.
pub trait Organizable {
    /// The key the item is stored under.
    fn name_key(&self) -> &str;
}

/// Name-keyed collection with a lazily built dot-path tree.
#[derive(Debug)]
pub struct OrganizedCollection<T> {
    items: BTreeMap<String, T>,
    tree: OnceLock<OrganizedTreeNode<T>>,
}

impl<T: Organizable + Clone> OrganizedCollection<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: BTreeMap::new(),
            tree: OnceLock::new(),
        }
    }

    /// Add an item. Names must be unique.
    pub fn insert(&mut self, item: T) -> Result<(), CollectionError> {
        let key = item.name_key().to_string();
        if self.items.contains_key(&key) {
            return Err(CollectionError::DuplicateKey(key));
        }
        self.items.insert(key, item);
        self.tree = OnceLock::new();
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&T> {
        self.items.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in name order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.values()
    }

    /// Root of the dot-path tree, built on first access.
    pub fn organized(&self) -> &OrganizedTreeNode<T> {
        self.tree
            .get_or_init(|| OrganizedTreeNode::build(self.items.values().cloned()))
    }
}

impl<T: Organizable + Clone> Default for OrganizedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for OrganizedCollection<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            tree: OnceLock::new(),
        }
    }
}

impl<T: PartialEq> PartialEq for OrganizedCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Serialize> Serialize for OrganizedCollection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.items.len()))?;
        for item in self.items.values() {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

impl<'de, T> Deserialize<'de> for OrganizedCollection<T>
where
    T: Deserialize<'de> + Organizable + Clone,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        let mut collection = Self::new();
        for item in items {
            collection.insert(item).map_err(D::Error::custom)?;
        }
        Ok(collection)
    }
}

/// One level of the dot-path tree.
///
/// An item named `A.B.c` is stored in node `A` -> `B`; an undotted name is
/// stored at the root, whose path is `"."`.
#[derive(Debug, Clone, PartialEq)]
pub struct OrganizedTreeNode<T> {
    path: String,
    values: Vec<T>,
    children: Vec<OrganizedTreeNode<T>>,
}

impl<T: Organizable> OrganizedTreeNode<T> {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            values: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Build a tree rooted at `"."` from a set of items.
    pub fn build(items: impl IntoIterator<Item = T>) -> Self {
        let mut root = Self::new(".");
        for item in items {
            let segments: Vec<String> = {
                let name = item.name_key();
                let mut parts: Vec<&str> = name.split('.').collect();
                parts.pop();
                parts.into_iter().map(str::to_string).collect()
            };
            root.descend(&segments).values.push(item);
        }
        root
    }

    fn descend(&mut self, segments: &[String]) -> &mut Self {
        let Some((head, rest)) = segments.split_first() else {
            return self;
        };
        let index = match self.children.iter().position(|c| &c.path == head) {
            Some(index) => index,
            None => {
                self.children.push(Self::new(head.clone()));
                self.children.len() - 1
            }
        };
        self.children[index].descend(rest)
    }

    /// This node's segment name.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Items filed directly under this node.
    #[must_use]
    pub fn values(&self) -> &[T] {
        &self.values
    }

    #[must_use]
    pub fn children(&self) -> &[OrganizedTreeNode<T>] {
        &self.children
    }

    /// Child by segment name.
    #[must_use]
    pub fn child(&self, path: &str) -> Option<&OrganizedTreeNode<T>> {
        self.children.iter().find(|c| c.path == path)
    }
}

/// Library entities, addressable by id or by display name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryEntityCollection {
    by_id: BTreeMap<String, crate::responses::LibraryEntity>,
    by_name: HashMap<String, Vec<String>>,
}

impl LibraryEntityCollection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity. Ids must be unique; names may repeat.
    pub fn insert(&mut self, entity: crate::responses::LibraryEntity) -> Result<(), CollectionError> {
        if self.by_id.contains_key(&entity.entity_id) {
            return Err(CollectionError::DuplicateKey(entity.entity_id));
        }
        self.by_name
            .entry(entity.name.clone())
            .or_default()
            .push(entity.entity_id.clone());
        self.by_id.insert(entity.entity_id.clone(), entity);
        Ok(())
    }

    #[must_use]
    pub fn get_by_id(&self, entity_id: &str) -> Option<&crate::responses::LibraryEntity> {
        self.by_id.get(entity_id)
    }

    /// All entities sharing a name, in insertion order.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Vec<&crate::responses::LibraryEntity> {
        self.by_name
            .get(name)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &crate::responses::LibraryEntity> {
        self.by_id.values()
    }
}

impl Serialize for LibraryEntityCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.by_id.len()))?;
        for entity in self.by_id.values() {
            seq.serialize_element(entity)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for LibraryEntityCollection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entities = Vec::<crate::responses::LibraryEntity>::deserialize(deserializer)?;
        let mut collection = Self::new();
        for entity in entities {
            collection.insert(entity).map_err(D::Error::custom)?;
        }
        Ok(collection)
    }
}
