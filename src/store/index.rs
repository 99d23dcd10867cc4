use crate::model::{CatalogEntity, EntityKey, Id};
use std::collections::HashMap;

/// Multi-key in-memory index over one entity kind.
///
/// The primary key is the id; the secondary key is the entity's scoped name
/// ([`CatalogEntity::index_key`]), with an optional alternate text key
/// (e.g. namespace URI) that may have duplicates. Bucket contents keep
/// insertion order, also across clear/re-add cycles, so lookups are
/// deterministic.
///
/// The index itself takes no locks: catalog writes are serialized one
/// level up and readers only ever see fully-built snapshots.
#[derive(Debug, Clone)]
pub struct EntityIndex<E: CatalogEntity> {
    by_id: HashMap<Id, E>,
    order: Vec<Id>,
    by_key: HashMap<EntityKey, Vec<Id>>,
    by_alt: HashMap<String, Vec<Id>>,
    alt_key: Option<fn(&E) -> Option<String>>,
}

impl<E: CatalogEntity> Default for EntityIndex<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: CatalogEntity> EntityIndex<E> {
    pub fn new() -> Self {
        Self {
            by_id: HashMap::new(),
            order: Vec::new(),
            by_key: HashMap::new(),
            by_alt: HashMap::new(),
            alt_key: None,
        }
    }

    /// Index with an alternate key extractor (duplicates allowed).
    pub fn with_alt_key(alt_key: fn(&E) -> Option<String>) -> Self {
        Self {
            alt_key: Some(alt_key),
            ..Self::new()
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn contains(&self, id: &Id) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn add(&mut self, entity: E) {
        let id = entity.id().clone();
        if self.by_id.contains_key(&id) {
            // Same id twice is a replace, not a duplicate slot.
            self.update(entity);
            return;
        }
        self.by_key
            .entry(entity.index_key())
            .or_default()
            .push(id.clone());
        if let Some(alt) = self.alt_value(&entity) {
            self.by_alt.entry(alt).or_default().push(id.clone());
        }
        self.order.push(id.clone());
        self.by_id.insert(id, entity);
    }

    pub fn remove(&mut self, id: &Id) -> Option<E> {
        let entity = self.by_id.remove(id)?;
        self.order.retain(|slot| slot != id);
        Self::drop_from_bucket(&mut self.by_key, &entity.index_key(), id);
        if let Some(alt) = self.alt_value(&entity) {
            Self::drop_from_bucket(&mut self.by_alt, &alt, id);
        }
        Some(entity)
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.order.clear();
        self.by_key.clear();
        self.by_alt.clear();
    }

    /// Replace a stored entity, relocating it between key buckets when the
    /// indexed key changed. The bucket move is atomic from any reader's
    /// point of view because readers only see whole-index snapshots.
    pub fn update(&mut self, changed: E) {
        let id = changed.id().clone();
        let Some(previous) = self.by_id.get(&id) else {
            self.add(changed);
            return;
        };

        let old_key = previous.index_key();
        let new_key = changed.index_key();
        if old_key != new_key {
            Self::drop_from_bucket(&mut self.by_key, &old_key, &id);
            self.by_key.entry(new_key).or_default().push(id.clone());
        }

        let old_alt = self.alt_value(previous);
        let new_alt = self.alt_value(&changed);
        if old_alt != new_alt {
            if let Some(old) = old_alt {
                Self::drop_from_bucket(&mut self.by_alt, &old, &id);
            }
            if let Some(new) = new_alt {
                self.by_alt.entry(new).or_default().push(id.clone());
            }
        }

        self.by_id.insert(id, changed);
    }

    pub fn get(&self, id: &Id) -> Option<&E> {
        self.by_id.get(id)
    }

    /// All entities under a key, in insertion order. Unknown keys yield an
    /// empty list, never a missing one.
    pub fn find_by_key(&self, key: &EntityKey) -> Vec<&E> {
        self.by_key
            .get(key)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// First entity under a key, by insertion order.
    pub fn find_one_by_key(&self, key: &EntityKey) -> Option<&E> {
        self.by_key
            .get(key)
            .and_then(|ids| ids.first())
            .and_then(|id| self.by_id.get(id))
    }

    pub fn find_by_alt_key(&self, alt: &str) -> Vec<&E> {
        self.by_alt
            .get(alt)
            .map(|ids| ids.iter().filter_map(|id| self.by_id.get(id)).collect())
            .unwrap_or_default()
    }

    /// All entities in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }

    /// First entity by insertion order, the default-promotion candidate.
    pub fn first(&self) -> Option<&E> {
        self.order.first().and_then(|id| self.by_id.get(id))
    }

    fn alt_value(&self, entity: &E) -> Option<String> {
        self.alt_key.and_then(|f| f(entity))
    }

    fn drop_from_bucket<K: std::hash::Hash + Eq>(
        buckets: &mut HashMap<K, Vec<Id>>,
        key: &K,
        id: &Id,
    ) {
        if let Some(bucket) = buckets.get_mut(key) {
            bucket.retain(|slot| slot != id);
            if bucket.is_empty() {
                buckets.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EntityKey, Namespace, Style};

    fn uri_key(ns: &Namespace) -> Option<String> {
        Some(ns.uri.clone())
    }

    #[test]
    fn lookup_by_unknown_key_is_empty_not_missing() {
        let index: EntityIndex<Style> = EntityIndex::new();
        assert!(index.find_by_key(&EntityKey::global("nope")).is_empty());
        assert!(index.find_by_alt_key("nope").is_empty());
    }

    #[test]
    fn buckets_keep_insertion_order_across_clear_cycles() {
        let mut index: EntityIndex<Style> = EntityIndex::new();
        for name in ["a", "b", "c"] {
            index.add(Style::new(name));
        }
        let names: Vec<_> = index.iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, ["a", "b", "c"]);

        index.clear();
        assert!(index.is_empty());
        for name in ["c", "a"] {
            index.add(Style::new(name));
        }
        let names: Vec<_> = index.iter().map(|s| s.name.clone()).collect();
        assert_eq!(names, ["c", "a"]);
    }

    #[test]
    fn update_moves_the_entity_between_key_buckets() {
        let mut index: EntityIndex<Namespace> = EntityIndex::with_alt_key(uri_key);
        let ns = Namespace::new("topp", "http://topp.org");
        let id = ns.id.clone();
        index.add(ns.clone());

        let mut renamed = ns;
        renamed.prefix = "renamed".to_string();
        renamed.uri = "http://renamed.org".to_string();
        index.update(renamed);

        assert!(index.find_by_key(&EntityKey::global("topp")).is_empty());
        assert_eq!(index.find_by_key(&EntityKey::global("renamed")).len(), 1);
        assert!(index.find_by_alt_key("http://topp.org").is_empty());
        assert_eq!(index.find_by_alt_key("http://renamed.org")[0].id, id);
    }

    #[test]
    fn duplicate_alt_keys_keep_stable_order() {
        let mut index: EntityIndex<Namespace> = EntityIndex::with_alt_key(uri_key);
        let first = Namespace::new("a", "http://shared.org");
        let second = Namespace::new("b", "http://shared.org");
        index.add(first.clone());
        index.add(second.clone());

        let found = index.find_by_alt_key("http://shared.org");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, first.id);
        assert_eq!(found[1].id, second.id);
    }

    #[test]
    fn first_follows_insertion_order_after_removals() {
        let mut index: EntityIndex<Style> = EntityIndex::new();
        let a = Style::new("a");
        let b = Style::new("b");
        let c = Style::new("c");
        index.add(a.clone());
        index.add(b.clone());
        index.add(c.clone());

        index.remove(&a.id);
        assert_eq!(index.first().unwrap().id, b.id);
    }
}
