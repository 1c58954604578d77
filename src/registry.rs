// --- File: registry.rs ---
use crate::organism::Organism;
use std::collections::HashMap;

/// Opaque process-unique organism identity. Never reused within a run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrganismId(u64);

impl OrganismId {
    #[cfg(test)]
    pub fn test_value(raw: u64) -> Self {
        Self(raw)
    }
}

/// Issues strictly increasing identifiers.
#[derive(Debug, Default)]
pub struct IdServer {
    next: u64,
}

impl IdServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self) -> OrganismId {
        let id = OrganismId(self.next);
        self.next += 1;
        id
    }
}

/// Insertion-ordered organism collection with tombstoned removal and a
/// single forward iteration cursor that stays valid while entries --
/// including the current one -- are removed.
#[derive(Debug, Default)]
pub struct Registry {
    slots: Vec<Option<Organism>>,
    index: HashMap<OrganismId, usize>,
    cursor: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of organisms currently present.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn append(&mut self, organism: Organism) {
        let id = organism.id;
        debug_assert!(
            !self.index.contains_key(&id),
            "duplicate organism id appended"
        );
        self.index.insert(id, self.slots.len());
        self.slots.push(Some(organism));
    }

    /// Tombstone an organism, returning it. The iteration cursor is not
    /// disturbed: a removed current entry is simply skipped from then on.
    pub fn remove(&mut self, id: OrganismId) -> Option<Organism> {
        let slot = self.index.remove(&id)?;
        self.slots[slot].take()
    }

    pub fn get(&self, id: OrganismId) -> Option<&Organism> {
        let slot = *self.index.get(&id)?;
        self.slots[slot].as_ref()
    }

    pub fn get_mut(&mut self, id: OrganismId) -> Option<&mut Organism> {
        let slot = *self.index.get(&id)?;
        self.slots[slot].as_mut()
    }

    pub fn contains(&self, id: OrganismId) -> bool {
        self.index.contains_key(&id)
    }

    /// Reset the iteration cursor to the start.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// Advance the cursor past tombstones and return the next organism's
    /// id, or None at the end. Entries appended during iteration are
    /// visited too (they sit past the cursor).
    pub fn next_id(&mut self) -> Option<OrganismId> {
        while self.cursor < self.slots.len() {
            let slot = self.cursor;
            self.cursor += 1;
            if let Some(o) = &self.slots[slot] {
                return Some(o.id);
            }
        }
        None
    }

    /// Insertion-ordered pass over the occupied slots.
    pub fn iter(&self) -> impl Iterator<Item = &Organism> {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    /// Drop tombstoned slots and rebuild the index. Must only run between
    /// ticks, while no cursor iteration is in flight.
    pub fn compact(&mut self) {
        if self.slots.len() == self.index.len() {
            return;
        }
        self.slots.retain(|s| s.is_some());
        self.index.clear();
        for (slot, o) in self.slots.iter().enumerate() {
            if let Some(o) = o {
                self.index.insert(o.id, slot);
            }
        }
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::genome::Genome;
    use crate::universe::SimRng;
    use glam::Vec3;
    use rand::SeedableRng;

    fn setup(count: usize) -> (Registry, Vec<OrganismId>) {
        let config = SimulationConfig::default();
        let mut rng = SimRng::seed_from_u64(5);
        let mut ids = IdServer::new();
        let mut registry = Registry::new();
        let mut issued = Vec::new();
        for _ in 0..count {
            let id = ids.issue();
            let genome = Genome::random(&mut rng);
            registry.append(Organism::new(id, Vec3::ZERO, genome, &config, &mut rng));
            issued.push(id);
        }
        (registry, issued)
    }

    #[test]
    fn ids_are_strictly_increasing_and_unique() {
        let mut server = IdServer::new();
        let mut last = server.issue();
        for _ in 0..1000 {
            let next = server.issue();
            assert!(next > last);
            last = next;
        }
    }

    #[test]
    fn append_then_iterate_in_insertion_order() {
        let (mut registry, ids) = setup(4);
        registry.rewind();
        let mut seen = Vec::new();
        while let Some(id) = registry.next_id() {
            seen.push(id);
        }
        assert_eq!(seen, ids);
    }

    #[test]
    fn removing_current_entry_does_not_skip_the_next() {
        let (mut registry, ids) = setup(4);
        registry.rewind();
        let first = registry.next_id().unwrap();
        assert_eq!(first, ids[0]);
        registry.remove(first);
        // The following live entry must still be returned, exactly once.
        assert_eq!(registry.next_id(), Some(ids[1]));
        assert_eq!(registry.next_id(), Some(ids[2]));
        assert_eq!(registry.next_id(), Some(ids[3]));
        assert_eq!(registry.next_id(), None);
    }

    #[test]
    fn removed_entries_are_never_returned() {
        let (mut registry, ids) = setup(5);
        registry.remove(ids[1]);
        registry.remove(ids[3]);
        registry.rewind();
        let mut seen = Vec::new();
        while let Some(id) = registry.next_id() {
            seen.push(id);
        }
        assert_eq!(seen, vec![ids[0], ids[2], ids[4]]);
    }

    #[test]
    fn appends_during_iteration_are_visited() {
        let (mut registry, ids) = setup(2);
        let config = SimulationConfig::default();
        let mut rng = SimRng::seed_from_u64(9);
        let mut server = IdServer::new();
        // Skip ids already taken by setup.
        for _ in 0..ids.len() {
            server.issue();
        }
        registry.rewind();
        assert_eq!(registry.next_id(), Some(ids[0]));
        let newcomer = server.issue();
        let genome = Genome::random(&mut rng);
        registry.append(Organism::new(newcomer, Vec3::ZERO, genome, &config, &mut rng));
        assert_eq!(registry.next_id(), Some(ids[1]));
        assert_eq!(registry.next_id(), Some(newcomer));
        assert_eq!(registry.next_id(), None);
    }

    #[test]
    fn compact_preserves_order_and_lookup() {
        let (mut registry, ids) = setup(6);
        registry.remove(ids[0]);
        registry.remove(ids[4]);
        registry.compact();
        assert_eq!(registry.len(), 4);
        let survivors: Vec<_> = registry.iter().map(|o| o.id).collect();
        assert_eq!(survivors, vec![ids[1], ids[2], ids[3], ids[5]]);
        for id in &survivors {
            assert!(registry.get(*id).is_some());
        }
        assert!(registry.get(ids[0]).is_none());
    }

    #[test]
    fn remove_returns_the_organism() {
        let (mut registry, ids) = setup(2);
        let removed = registry.remove(ids[0]).unwrap();
        assert_eq!(removed.id, ids[0]);
        assert!(registry.remove(ids[0]).is_none());
        assert_eq!(registry.len(), 1);
    }
}
