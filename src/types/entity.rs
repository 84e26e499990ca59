//! Entities and the in-memory entity store.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use super::{EntityUid, Record, Value};
use crate::traits::EntityStore;

/// An entity: its attributes plus the full set of its ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    uid: EntityUid,
    attrs: Record,
    ancestors: HashSet<EntityUid>,
}

impl Entity {
    pub fn new(uid: EntityUid, attrs: Record, ancestors: HashSet<EntityUid>) -> Self {
        Entity {
            uid,
            attrs,
            ancestors,
        }
    }

    pub fn uid(&self) -> &EntityUid {
        &self.uid
    }

    pub fn attrs(&self) -> &Record {
        &self.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn ancestors(&self) -> impl Iterator<Item = &EntityUid> {
        self.ancestors.iter()
    }

    pub fn is_descendant_of(&self, ancestor: &EntityUid) -> bool {
        self.ancestors.contains(ancestor)
    }
}

/// Read-only entity store whose ancestor sets are transitively closed.
///
/// Build one with [`EntitiesBuilder`]; the closure is computed once there
/// so membership queries never walk the hierarchy.
#[derive(Debug, Clone, Default)]
pub struct Entities {
    entities: HashMap<EntityUid, Entity>,
}

impl Entities {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> EntitiesBuilder {
        EntitiesBuilder::default()
    }

    pub fn get(&self, uid: &EntityUid) -> Option<&Entity> {
        self.entities.get(uid)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }
}

impl EntityStore for Entities {
    fn attribute(&self, uid: &EntityUid, key: &str) -> Option<&Value> {
        self.entities.get(uid).and_then(|e| e.attr(key))
    }

    fn is_ancestor(&self, uid: &EntityUid, candidate: &EntityUid) -> bool {
        self.entities
            .get(uid)
            .is_some_and(|e| e.is_descendant_of(candidate))
    }

    fn exists(&self, uid: &EntityUid) -> bool {
        self.entities.contains_key(uid)
    }
}

/// Collects entities with their direct parents and closes the hierarchy.
#[derive(Debug, Default)]
pub struct EntitiesBuilder {
    attrs: HashMap<EntityUid, Record>,
    parents: HashMap<EntityUid, HashSet<EntityUid>>,
}

impl EntitiesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity with its direct parents. Adding a uid twice merges
    /// the parent sets and keeps the latest attributes.
    pub fn add_entity(
        mut self,
        uid: EntityUid,
        attrs: Record,
        parents: impl IntoIterator<Item = EntityUid>,
    ) -> Self {
        self.attrs.insert(uid.clone(), attrs);
        self.parents.entry(uid).or_default().extend(parents);
        self
    }

    /// Add a parent-less, attribute-less entity.
    pub fn add_uid(self, uid: EntityUid) -> Self {
        self.add_entity(uid, Record::new(), [])
    }

    /// Compute every entity's transitive ancestors and freeze the store.
    ///
    /// Parents that were never added as entities still count as ancestors
    /// but get no entry of their own. Cycles are tolerated.
    pub fn build(self) -> Entities {
        let EntitiesBuilder { attrs, parents } = self;

        let mut entities = HashMap::with_capacity(attrs.len());
        for (uid, attrs) in attrs {
            let ancestors = closure(&uid, &parents);
            entities.insert(uid.clone(), Entity::new(uid, attrs, ancestors));
        }

        debug!(
            event = "Entities",
            phase = "Build",
            entities = entities.len()
        );
        Entities { entities }
    }
}

fn closure(
    uid: &EntityUid,
    parents: &HashMap<EntityUid, HashSet<EntityUid>>,
) -> HashSet<EntityUid> {
    let mut seen: HashSet<EntityUid> = HashSet::new();
    let mut stack: Vec<&EntityUid> = parents
        .get(uid)
        .map(|p| p.iter().collect())
        .unwrap_or_default();

    while let Some(next) = stack.pop() {
        if seen.insert(next.clone()) {
            if let Some(grand) = parents.get(next) {
                stack.extend(grand.iter());
            }
        }
    }
    seen
}
