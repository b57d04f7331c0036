//! Keyed entity list shared by the order and bill feeds.
//!
//! A feed reducer never mutates its list in place. Each event is turned into
//! a [`Patch`], and [`KeyedList::apply`] produces the next list. Entities are
//! held behind `Arc`, so applying a per-id patch copies one entity and shares
//! every other entry with the previous list.

use std::sync::Arc;

use tableside_common::{BillView, OrderView};

/// An entity with a stable identifier used as the merge key.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for OrderView {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for BillView {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Boxed per-entity update: receives the current entity, returns its successor.
pub type Update<T> = Box<dyn FnOnce(&T) -> T + Send>;

/// Builds a partial entity when an upsert finds no match.
pub type Fallback<T> = Box<dyn FnOnce() -> T + Send>;

/// The effect one event has on a keyed list.
pub enum Patch<T> {
    /// Replace the whole list (snapshot).
    Replace(Vec<T>),
    /// Append a new entity, or replace the existing entry with the same key.
    Insert(T),
    /// Rebuild the entity with this key; no-op when absent.
    Update(String, Update<T>),
    /// Rebuild the entity with this key, or append the fallback when absent.
    Upsert(String, Update<T>, Fallback<T>),
    /// Drop the entity with this key; no-op when absent.
    Remove(String),
}

impl<T> Patch<T> {
    pub fn update(key: impl Into<String>, f: impl FnOnce(&T) -> T + Send + 'static) -> Self {
        Patch::Update(key.into(), Box::new(f))
    }

    pub fn upsert(
        key: impl Into<String>,
        f: impl FnOnce(&T) -> T + Send + 'static,
        fallback: impl FnOnce() -> T + Send + 'static,
    ) -> Self {
        Patch::Upsert(key.into(), Box::new(f), Box::new(fallback))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Patch::Replace(_) => "replace",
            Patch::Insert(_) => "insert",
            Patch::Update(..) => "update",
            Patch::Upsert(..) => "upsert",
            Patch::Remove(_) => "remove",
        }
    }
}

/// What [`KeyedList::apply`] did, for logging and counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Replaced { len: usize },
    Appended,
    Overwritten,
    Updated,
    Removed,
    /// The patch targeted a key that is not in the list.
    Missing,
}

/// Ordered list of entities with at most one entry per key.
#[derive(Debug)]
pub struct KeyedList<T> {
    entries: Vec<Arc<T>>,
}

impl<T> Clone for KeyedList<T> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<T> Default for KeyedList<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Keyed> KeyedList<T> {
    /// Build a list from a snapshot. A key seen twice keeps its first
    /// position and its last value.
    pub fn from_snapshot(items: Vec<T>) -> Self {
        let mut entries: Vec<Arc<T>> = Vec::with_capacity(items.len());
        for item in items {
            match entries.iter().position(|e| e.key() == item.key()) {
                Some(idx) => entries[idx] = Arc::new(item),
                None => entries.push(Arc::new(item)),
            }
        }
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries
            .iter()
            .find(|e| e.key() == key)
            .map(|e| e.as_ref())
    }

    /// Shared handle to an entry, for identity checks across revisions.
    pub fn get_shared(&self, key: &str) -> Option<&Arc<T>> {
        self.entries.iter().find(|e| e.key() == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_shared(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|e| e.as_ref())
    }

    /// Apply a patch, returning the next list and what happened.
    pub fn apply(&self, patch: Patch<T>) -> (Self, Applied) {
        match patch {
            Patch::Replace(items) => {
                let next = Self::from_snapshot(items);
                let len = next.len();
                (next, Applied::Replaced { len })
            }
            Patch::Insert(item) => {
                let mut entries = self.entries.clone();
                let applied = match entries.iter().position(|e| e.key() == item.key()) {
                    Some(idx) => {
                        entries[idx] = Arc::new(item);
                        Applied::Overwritten
                    }
                    None => {
                        entries.push(Arc::new(item));
                        Applied::Appended
                    }
                };
                (Self { entries }, applied)
            }
            Patch::Update(key, update) => match self.position(&key) {
                Some(idx) => {
                    let mut entries = self.entries.clone();
                    entries[idx] = Arc::new(update(self.entries[idx].as_ref()));
                    (Self { entries }, Applied::Updated)
                }
                None => (self.clone(), Applied::Missing),
            },
            Patch::Upsert(key, update, fallback) => {
                let mut entries = self.entries.clone();
                let applied = match self.position(&key) {
                    Some(idx) => {
                        entries[idx] = Arc::new(update(self.entries[idx].as_ref()));
                        Applied::Updated
                    }
                    None => {
                        entries.push(Arc::new(fallback()));
                        Applied::Appended
                    }
                };
                (Self { entries }, applied)
            }
            Patch::Remove(key) => match self.position(&key) {
                Some(idx) => {
                    let mut entries = self.entries.clone();
                    entries.remove(idx);
                    (Self { entries }, Applied::Removed)
                }
                None => (self.clone(), Applied::Missing),
            },
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key() == key)
    }
}

impl<T: Keyed + Clone> KeyedList<T> {
    /// Owned copy of the entities, in list order.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }
}
