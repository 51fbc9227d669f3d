//! Generational arena (slot map)

use crate::NodeId;

/// Slot map handing out generational [`NodeId`]s.
///
/// Removing a value bumps the slot generation, so handles to the removed
/// value stop resolving even after the slot is reused.
#[derive(Debug)]
pub(crate) struct NodeArena<T> {
    items: Vec<Option<T>>,
    generations: Vec<u32>,
    free_list: Vec<u32>,
}

impl<T> NodeArena<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
        }
    }

    /// Insert item
    pub fn insert(&mut self, value: T) -> NodeId {
        if let Some(index) = self.free_list.pop() {
            self.items[index as usize] = Some(value);
            NodeId {
                index,
                generation: self.generations[index as usize],
            }
        } else {
            let index = self.items.len() as u32;
            self.items.push(Some(value));
            self.generations.push(0);
            NodeId { index, generation: 0 }
        }
    }

    fn live(&self, id: NodeId) -> bool {
        self.generations.get(id.index as usize) == Some(&id.generation)
    }

    /// Get item
    pub fn get(&self, id: NodeId) -> Option<&T> {
        if !self.live(id) {
            return None;
        }
        self.items.get(id.index as usize).and_then(|slot| slot.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut T> {
        if !self.live(id) {
            return None;
        }
        self.items.get_mut(id.index as usize).and_then(|slot| slot.as_mut())
    }

    /// Remove item
    pub fn remove(&mut self, id: NodeId) -> Option<T> {
        if !self.live(id) {
            return None;
        }
        let value = self.items.get_mut(id.index as usize)?.take()?;
        self.generations[id.index as usize] = id.generation.wrapping_add(1);
        self.free_list.push(id.index);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.items.iter().filter(|i| i.is_some()).count()
    }
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}
