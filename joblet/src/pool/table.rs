//! Fixed-capacity slot table: the record of which jobs are running.

use std::fmt;

use tokio::process::Child;

/// Index of one slot in the table. Stable for the table's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotId(usize);

impl SlotId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed-capacity record of running jobs, one child handle per occupied slot.
///
/// The table is plain owned state: the dispatcher holds it and lends it to
/// the reap and drain operations. Occupancy bookkeeping errors are protocol
/// violations and panic rather than continue with a corrupted pool.
pub struct SlotTable {
    slots: Vec<Option<Child>>,
}

impl SlotTable {
    /// Create a table with `capacity` EMPTY slots.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// True iff every slot is EMPTY.
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    /// True iff any slot is EMPTY. Pure query, never blocks.
    pub fn has_free_slot(&self) -> bool {
        self.slots.iter().any(|slot| slot.is_none())
    }

    /// Place a child into the lowest-index EMPTY slot.
    ///
    /// The caller must have established a free slot via the reap protocol.
    ///
    /// # Panics
    ///
    /// Panics if no slot is EMPTY: admission control was bypassed.
    pub fn occupy(&mut self, child: Child) -> SlotId {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_none() {
                *slot = Some(child);
                return SlotId(index);
            }
        }
        panic!("occupy on a full slot table: admission protocol violated");
    }

    /// Take the occupant out of `slot`, marking it EMPTY.
    ///
    /// # Panics
    ///
    /// Panics if the slot is already EMPTY: pool bookkeeping is corrupted.
    pub fn release(&mut self, slot: SlotId) -> Child {
        match self.slots[slot.0].take() {
            Some(child) => child,
            None => panic!("release of EMPTY slot {slot}"),
        }
    }

    /// Ids of occupied slots, in index order.
    pub fn occupied(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|_| SlotId(index)))
    }

    /// Occupied slots with their child handles, in index order.
    pub fn occupied_mut(&mut self) -> impl Iterator<Item = (SlotId, &mut Child)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|child| (SlotId(index), child)))
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut Child> {
        self.slots[slot.0].as_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::process::Command;

    fn spawn_child(cmd: &str) -> Child {
        Command::new("/bin/sh").arg("-c").arg(cmd).spawn().unwrap()
    }

    #[tokio::test]
    async fn occupies_lowest_empty_slot() {
        let mut table = SlotTable::new(3);
        assert!(table.is_empty());
        assert!(table.has_free_slot());

        let a = table.occupy(spawn_child("exit 0"));
        let b = table.occupy(spawn_child("exit 0"));
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(table.len(), 2);

        table.release(a);
        let c = table.occupy(spawn_child("exit 0"));
        assert_eq!(c.index(), 0);
    }

    #[tokio::test]
    async fn occupied_iterates_in_index_order() {
        let mut table = SlotTable::new(3);
        let _a = table.occupy(spawn_child("exit 0"));
        let b = table.occupy(spawn_child("exit 0"));
        let _c = table.occupy(spawn_child("exit 0"));
        table.release(b);

        let ids: Vec<usize> = table.occupied().map(|slot| slot.index()).collect();
        assert_eq!(ids, vec![0, 2]);
    }

    #[tokio::test]
    async fn release_leaves_slot_reusable() {
        let mut table = SlotTable::new(1);
        let slot = table.occupy(spawn_child("exit 0"));
        assert!(!table.has_free_slot());

        let mut child = table.release(slot);
        let _ = child.wait().await;
        assert!(table.is_empty());
        assert!(table.has_free_slot());
    }

    #[tokio::test]
    #[should_panic(expected = "full slot table")]
    async fn occupy_full_table_panics() {
        let mut table = SlotTable::new(1);
        let _a = table.occupy(spawn_child("exit 0"));
        let _b = table.occupy(spawn_child("exit 0"));
    }

    #[tokio::test]
    #[should_panic(expected = "release of EMPTY slot")]
    async fn release_empty_slot_panics() {
        let mut table = SlotTable::new(2);
        let slot = table.occupy(spawn_child("exit 0"));
        table.release(slot);
        table.release(slot);
    }
}
