//! Generational slot storage behind variable and constraint handles.
//!
//! Freed slots are reused, lowest first. Each slot carries a generation that
//! is bumped when its record is removed, so a handle kept past its release
//! never resolves to the record that later takes its slot.

use std::collections::BTreeSet;

#[derive(Debug)]
struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub(crate) struct Arena<T> {
    entries: Vec<Entry<T>>,
    vacant: BTreeSet<u32>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            vacant: BTreeSet::new(),
        }
    }
}

impl<T> Arena<T> {
    /// Store `value` and return its `(slot, generation)`, or `None` when the
    /// slot space is exhausted.
    pub(crate) fn insert(&mut self, value: T) -> Option<(u32, u32)> {
        if let Some(slot) = self.vacant.pop_first() {
            let entry = self.entries.get_mut(slot as usize)?;
            entry.value = Some(value);
            return Some((slot, entry.generation));
        }
        let slot = u32::try_from(self.entries.len()).ok()?;
        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });
        Some((slot, 0))
    }

    pub(crate) fn get(&self, slot: usize, generation: u32) -> Option<&T> {
        self.entries
            .get(slot)
            .filter(|entry| entry.generation == generation)
            .and_then(|entry| entry.value.as_ref())
    }

    pub(crate) fn get_mut(&mut self, slot: usize, generation: u32) -> Option<&mut T> {
        self.entries
            .get_mut(slot)
            .filter(|entry| entry.generation == generation)
            .and_then(|entry| entry.value.as_mut())
    }

    pub(crate) fn remove(&mut self, slot: usize, generation: u32) -> Option<T> {
        let entry = self
            .entries
            .get_mut(slot)
            .filter(|entry| entry.generation == generation)?;
        let value = entry.value.take()?;
        Self::vacate(entry, slot, &mut self.vacant);
        Some(value)
    }

    /// Remove every record for which `keep` returns false.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&T) -> bool) {
        for (slot, entry) in self.entries.iter_mut().enumerate() {
            if entry.value.as_ref().is_some_and(|value| !keep(value)) {
                entry.value = None;
                Self::vacate(entry, slot, &mut self.vacant);
            }
        }
    }

    /// Remove every record. Generations survive, so no earlier handle
    /// resolves again.
    pub(crate) fn clear(&mut self) {
        self.retain(|_| false);
    }

    /// Live records with their `(slot, generation)`, in slot order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (u32, u32, &T)> + '_ {
        self.entries.iter().enumerate().filter_map(|(slot, entry)| {
            let value = entry.value.as_ref()?;
            Some((slot as u32, entry.generation, value))
        })
    }

    pub(crate) fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().filter_map(|entry| entry.value.as_ref())
    }

    pub(crate) fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.entries.iter_mut().filter_map(|entry| entry.value.as_mut())
    }

    /// Slots ever allocated, live or vacant.
    pub(crate) fn slots(&self) -> usize {
        self.entries.len()
    }

    // A slot whose generation is exhausted is retired instead of reused.
    fn vacate(entry: &mut Entry<T>, slot: usize, vacant: &mut BTreeSet<u32>) {
        if let (Some(next), Ok(slot)) = (entry.generation.checked_add(1), u32::try_from(slot)) {
            entry.generation = next;
            vacant.insert(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freed_slot_is_reused_with_new_generation() {
        let mut arena = Arena::default();
        let (a, a_gen) = arena.insert("a").unwrap();
        let (b, _) = arena.insert("b").unwrap();
        assert_eq!(arena.remove(a as usize, a_gen), Some("a"));

        let (c, c_gen) = arena.insert("c").unwrap();
        assert_eq!(c, a);
        assert_ne!(c_gen, a_gen);
        assert_eq!(arena.get(a as usize, a_gen), None);
        assert_eq!(arena.get(c as usize, c_gen), Some(&"c"));
        assert_eq!(arena.remove(a as usize, a_gen), None);
        assert_eq!(arena.slots(), 2);
        assert_eq!(arena.get(b as usize, 0), Some(&"b"));
    }

    #[test]
    fn lowest_vacant_slot_first() {
        let mut arena = Arena::default();
        for value in 0..4 {
            arena.insert(value).unwrap();
        }
        arena.retain(|value| value % 2 == 0);
        assert_eq!(arena.insert(10).unwrap().0, 1);
        assert_eq!(arena.insert(11).unwrap().0, 3);
        assert_eq!(arena.insert(12).unwrap().0, 4);
        let live: Vec<_> = arena.values().copied().collect();
        assert_eq!(live, vec![0, 10, 2, 11, 12]);
    }

    #[test]
    fn clear_keeps_old_handles_dead() {
        let mut arena = Arena::default();
        let (slot, generation) = arena.insert('x').unwrap();
        arena.clear();
        assert_eq!(arena.values().count(), 0);
        let (again, next) = arena.insert('y').unwrap();
        assert_eq!(again, slot);
        assert_eq!(arena.get(slot as usize, generation), None);
        assert_eq!(arena.get(again as usize, next), Some(&'y'));
    }
}
