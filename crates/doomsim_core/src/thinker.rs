//! The thinker list: every object that runs once per tic.
//!
//! Thinkers live in a generational slot arena threaded into one circular,
//! insertion-ordered list through a sentinel at slot 0. Removal only marks
//! a thinker [`ThinkerState::Removed`]; the next sweep unlinks it when it
//! gets there. Thinkers added during a sweep are appended before the
//! sentinel and therefore run later in that same sweep.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Handle to a thinker. Stale handles (removed and swept) never resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThinkerId {
    index: u32,
    generation: u32,
}

impl ThinkerId {
    /// Build a handle from its parts.
    #[must_use]
    pub const fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }
}

/// Lifecycle of a thinker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThinkerState {
    /// Runs every tic.
    Active,
    /// Linked but skipped by the sweep.
    InStasis,
    /// Waiting to be unlinked.
    Removed,
}

const SENTINEL: u32 = 0;

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    state: ThinkerState,
    prev: u32,
    next: u32,
    linked: bool,
    value: Option<T>,
}

impl<T> Slot<T> {
    const fn sentinel() -> Self {
        Self {
            generation: 0,
            state: ThinkerState::Active,
            prev: SENTINEL,
            next: SENTINEL,
            linked: true,
            value: None,
        }
    }
}

/// Insertion-ordered thinker registry.
#[derive(Debug, Clone)]
pub struct Thinkers<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for Thinkers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Thinkers<T> {
    /// An empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![Slot::sentinel()],
            free: Vec::new(),
            live: 0,
        }
    }

    /// Append a thinker at the tail.
    pub fn add(&mut self, value: T) -> ThinkerId {
        let index = if let Some(index) = self.free.pop() {
            index
        } else {
            self.slots.push(Slot {
                generation: 0,
                state: ThinkerState::Active,
                prev: SENTINEL,
                next: SENTINEL,
                linked: false,
                value: None,
            });
            (self.slots.len() - 1) as u32
        };

        let tail = self.slots[SENTINEL as usize].prev;
        {
            let slot = &mut self.slots[index as usize];
            slot.state = ThinkerState::Active;
            slot.prev = tail;
            slot.next = SENTINEL;
            slot.linked = true;
            slot.value = Some(value);
        }
        self.slots[tail as usize].next = index;
        self.slots[SENTINEL as usize].prev = index;
        self.live += 1;

        ThinkerId {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn slot(&self, id: ThinkerId) -> Option<&Slot<T>> {
        if id.index == SENTINEL {
            return None;
        }
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.linked && slot.generation == id.generation)
    }

    fn slot_mut(&mut self, id: ThinkerId) -> Option<&mut Slot<T>> {
        if id.index == SENTINEL {
            return None;
        }
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.linked && slot.generation == id.generation)
    }

    /// Mark a thinker for removal. Returns `false` for handles that are
    /// stale or already removed.
    pub fn remove(&mut self, id: ThinkerId) -> bool {
        match self.slot_mut(id) {
            Some(slot) if slot.state != ThinkerState::Removed => {
                slot.state = ThinkerState::Removed;
                self.live -= 1;
                true
            }
            _ => false,
        }
    }

    /// Current state, `None` for stale handles.
    #[must_use]
    pub fn state(&self, id: ThinkerId) -> Option<ThinkerState> {
        self.slot(id).map(|slot| slot.state)
    }

    /// Move a live thinker between [`ThinkerState::Active`] and
    /// [`ThinkerState::InStasis`]. Removed thinkers stay removed.
    pub fn set_state(&mut self, id: ThinkerId, state: ThinkerState) {
        if let Some(slot) = self.slot_mut(id) {
            if slot.state != ThinkerState::Removed && state != ThinkerState::Removed {
                slot.state = state;
            }
        }
    }

    /// Borrow a live thinker.
    #[must_use]
    pub fn get(&self, id: ThinkerId) -> Option<&T> {
        self.slot(id)
            .filter(|slot| slot.state != ThinkerState::Removed)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Mutably borrow a live thinker.
    pub fn get_mut(&mut self, id: ThinkerId) -> Option<&mut T> {
        self.slot_mut(id)
            .filter(|slot| slot.state != ThinkerState::Removed)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Move a live thinker's value out so it can be updated alongside the
    /// rest of the list. Until [`Thinkers::restore`] it is invisible to
    /// `get` and `iter`.
    pub(crate) fn take(&mut self, id: ThinkerId) -> Option<T> {
        self.slot_mut(id)
            .filter(|slot| slot.state != ThinkerState::Removed)
            .and_then(|slot| slot.value.take())
    }

    /// Put back a value moved out with [`Thinkers::take`].
    pub(crate) fn restore(&mut self, id: ThinkerId, value: T) {
        if let Some(slot) = self.slot_mut(id) {
            if slot.value.is_none() {
                slot.value = Some(value);
            }
        }
    }

    /// Number of thinkers not marked removed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// `true` when nothing is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live thinkers in list order. Removed entries are skipped, as is a
    /// thinker currently running inside a sweep.
    pub fn iter(&self) -> impl Iterator<Item = (ThinkerId, ThinkerState, &T)> + '_ {
        let mut cursor = self.slots[SENTINEL as usize].next;
        std::iter::from_fn(move || loop {
            if cursor == SENTINEL {
                return None;
            }
            let index = cursor;
            let slot = &self.slots[index as usize];
            cursor = slot.next;
            if slot.state == ThinkerState::Removed {
                continue;
            }
            if let Some(value) = slot.value.as_ref() {
                let id = ThinkerId {
                    index,
                    generation: slot.generation,
                };
                return Some((id, slot.state, value));
            }
        })
    }

    /// Handles of live thinkers in list order.
    #[must_use]
    pub fn ids(&self) -> Vec<ThinkerId> {
        self.iter().map(|(id, _, _)| id).collect()
    }

    /// Run every active thinker once, in list order.
    ///
    /// Removed thinkers met along the way are unlinked and their slots
    /// freed. While `think` runs, the thinker's value is moved out of the
    /// list, so the callback can freely use the rest of it; `get` on the
    /// running thinker's own handle returns `None`. The successor is read
    /// after the callback so thinkers it adds still run this sweep.
    pub fn run<F>(&mut self, mut think: F) -> Result<()>
    where
        F: FnMut(&mut Self, ThinkerId, &mut T) -> Result<()>,
    {
        let mut cursor = self.slots[SENTINEL as usize].next;
        while cursor != SENTINEL {
            let index = cursor;
            match self.slots[index as usize].state {
                ThinkerState::Removed => {
                    cursor = self.slots[index as usize].next;
                    self.unlink(index);
                }
                ThinkerState::InStasis => {
                    cursor = self.slots[index as usize].next;
                }
                ThinkerState::Active => {
                    let id = ThinkerId {
                        index,
                        generation: self.slots[index as usize].generation,
                    };
                    if let Some(mut value) = self.slots[index as usize].value.take() {
                        let outcome = think(self, id, &mut value);
                        self.slots[index as usize].value = Some(value);
                        outcome?;
                    }
                    cursor = self.slots[index as usize].next;
                }
            }
        }
        Ok(())
    }

    fn unlink(&mut self, index: u32) {
        let (prev, next) = {
            let slot = &self.slots[index as usize];
            (slot.prev, slot.next)
        };
        self.slots[prev as usize].next = next;
        self.slots[next as usize].prev = prev;

        let slot = &mut self.slots[index as usize];
        slot.linked = false;
        slot.value = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
    }

    /// Remove everything at once, e.g. before rebuilding from a snapshot.
    pub fn clear(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(list: &Thinkers<u32>) -> Vec<u32> {
        list.iter().map(|(_, _, v)| *v).collect()
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let mut list = Thinkers::new();
        for v in 1..=4 {
            list.add(v);
        }
        assert_eq!(order(&list), vec![1, 2, 3, 4]);
        assert_eq!(list.len(), 4);
    }

    #[test]
    fn test_remove_is_lazy() {
        let mut list = Thinkers::new();
        let a = list.add(1);
        let b = list.add(2);
        assert!(list.remove(a));
        assert!(!list.remove(a));
        assert_eq!(list.state(a), Some(ThinkerState::Removed));
        assert_eq!(list.get(a), None);
        assert_eq!(order(&list), vec![2]);

        list.run(|_, _, _| Ok(())).unwrap();
        assert_eq!(list.state(a), None);
        assert_eq!(list.get(b), Some(&2));
    }

    #[test]
    fn test_stale_handle_does_not_alias_reused_slot() {
        let mut list = Thinkers::new();
        let a = list.add(1);
        list.remove(a);
        list.run(|_, _, _| Ok(())).unwrap();
        let b = list.add(2);
        assert_eq!(a.index(), b.index());
        assert_eq!(list.get(a), None);
        assert_eq!(list.get(b), Some(&2));
    }

    #[test]
    fn test_sweep_runs_additions_in_same_pass() {
        let mut list = Thinkers::new();
        list.add(1);
        list.add(2);
        let mut ran = Vec::new();
        list.run(|list, _, value| {
            ran.push(*value);
            if *value == 1 {
                list.add(10);
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(ran, vec![1, 2, 10]);
    }

    #[test]
    fn test_self_removal_during_sweep() {
        let mut list = Thinkers::new();
        list.add(1);
        list.add(2);
        list.add(3);
        let mut ran = Vec::new();
        list.run(|list, id, value| {
            ran.push(*value);
            if *value == 2 {
                list.remove(id);
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(ran, vec![1, 2, 3]);
        assert_eq!(order(&list), vec![1, 3]);

        ran.clear();
        list.run(|_, _, value| {
            ran.push(*value);
            Ok(())
        })
        .unwrap();
        assert_eq!(ran, vec![1, 3]);
    }

    #[test]
    fn test_removing_a_later_thinker_skips_it() {
        let mut list = Thinkers::new();
        list.add(1);
        let b = list.add(2);
        let mut ran = Vec::new();
        list.run(|list, _, value| {
            ran.push(*value);
            list.remove(b);
            Ok(())
        })
        .unwrap();
        assert_eq!(ran, vec![1]);
    }

    #[test]
    fn test_stasis_is_skipped_but_kept() {
        let mut list = Thinkers::new();
        let a = list.add(1);
        list.add(2);
        list.set_state(a, ThinkerState::InStasis);
        let mut ran = Vec::new();
        list.run(|_, _, value| {
            ran.push(*value);
            Ok(())
        })
        .unwrap();
        assert_eq!(ran, vec![2]);
        assert_eq!(order(&list), vec![1, 2]);

        list.set_state(a, ThinkerState::Active);
        ran.clear();
        list.run(|_, _, value| {
            ran.push(*value);
            Ok(())
        })
        .unwrap();
        assert_eq!(ran, vec![1, 2]);
    }

    #[test]
    fn test_running_thinker_is_hidden() {
        let mut list = Thinkers::new();
        let a = list.add(1);
        list.run(|list, id, _| {
            assert_eq!(id, a);
            assert!(list.get(a).is_none());
            Ok(())
        })
        .unwrap();
        assert_eq!(list.get(a), Some(&1));
    }

    #[test]
    fn test_take_and_restore() {
        let mut list = Thinkers::new();
        let a = list.add(1);
        let taken = list.take(a).unwrap();
        assert!(list.get(a).is_none());
        assert!(list.take(a).is_none());
        assert_eq!(order(&list), Vec::<u32>::new());
        list.restore(a, taken + 1);
        assert_eq!(list.get(a), Some(&2));
    }

    #[test]
    fn test_error_stops_sweep_and_keeps_value() {
        let mut list = Thinkers::new();
        let a = list.add(1);
        list.add(2);
        let err = list.run(|_, _, value| {
            if *value == 1 {
                Err(crate::error::SimError::InvalidState("boom".into()))
            } else {
                Ok(())
            }
        });
        assert!(err.is_err());
        assert_eq!(list.get(a), Some(&1));
    }
}
