//! View slots and the pool that owns them.
//!
//! A slot is a live view instance tagged with its shape. It is bound to at
//! most one item at a time and survives across passes; slots leave the pool
//! only when the collection is disposed.

use std::collections::HashMap;
use std::hash::Hash;

use slotmap::{SlotMap, new_key_type};

use crate::shape::ShapeId;

new_key_type! {
    /// Handle to a slot in a [`SlotPool`].
    pub struct SlotId;
}

/// One reusable view instance.
#[derive(Debug)]
pub(crate) struct Slot<I, V> {
    pub view: V,
    pub shape: ShapeId,
    pub item: Option<I>,
    pub in_use: bool,
    pub visible: bool,
    pub position: Option<f32>,
    /// False while the slot is a specimen whose geometry has not settled yet.
    pub settled: bool,
}

/// A read-only view of a slot, for inspection and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSnapshot<I> {
    pub id: SlotId,
    pub shape: ShapeId,
    pub item: Option<I>,
    pub in_use: bool,
    pub visible: bool,
    pub position: Option<f32>,
}

/// Every slot the collection has created, plus an item → slot index.
#[derive(Debug)]
pub(crate) struct SlotPool<I, V> {
    slots: SlotMap<SlotId, Slot<I, V>>,
    bound: HashMap<I, SlotId>,
}

impl<I, V> Default for SlotPool<I, V> {
    fn default() -> Self {
        Self {
            slots: SlotMap::with_key(),
            bound: HashMap::new(),
        }
    }
}

impl<I, V> SlotPool<I, V>
where
    I: Clone + Eq + Hash,
{
    /// Add a hidden, unused slot for a freshly attached view.
    pub fn insert(&mut self, view: V, shape: ShapeId) -> SlotId {
        self.slots.insert(Slot {
            view,
            shape,
            item: None,
            in_use: false,
            visible: false,
            position: None,
            settled: true,
        })
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot<I, V>> {
        self.slots.get(id)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut Slot<I, V>> {
        self.slots.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &Slot<I, V>)> {
        self.slots.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut Slot<I, V>)> {
        self.slots.iter_mut()
    }

    /// The slot currently bound to `item`.
    pub fn bound_to(&self, item: &I) -> Option<SlotId> {
        self.bound.get(item).copied()
    }

    /// Record that `id` now displays `item`. Returns the previously bound item.
    pub fn bind(&mut self, id: SlotId, item: I) -> Option<I> {
        let slot = self.slots.get_mut(id)?;
        let previous = slot.item.replace(item.clone());
        if let Some(old) = &previous {
            if self.bound.get(old) == Some(&id) {
                self.bound.remove(old);
            }
        }
        self.bound.insert(item, id);
        previous
    }

    /// Remove every slot, returning their views.
    pub fn drain(&mut self) -> Vec<V> {
        self.bound.clear();
        self.slots.drain().map(|(_, slot)| slot.view).collect()
    }

    pub fn snapshot(&self) -> Vec<SlotSnapshot<I>> {
        self.slots
            .iter()
            .map(|(id, slot)| SlotSnapshot {
                id,
                shape: slot.shape,
                item: slot.item.clone(),
                in_use: slot.in_use,
                visible: slot.visible,
                position: slot.position,
            })
            .collect()
    }
}
