//! Open-addressed id index used by the graph arenas.
//!
//! Maps 64-bit object ids to arena slots. Tracks the observed
//! `[min_id, max_id]` range so lookups outside it answer absent without
//! probing, uses a tombstone marker for deletions, and rehashes at 70%
//! load.

const EMPTY: u64 = u64::MAX;
const TOMB: u64 = u64::MAX - 1;

#[derive(Debug, Clone)]
pub struct IdIndex {
    // parallel arrays: key id, value slot
    keys: Vec<u64>,
    slots: Vec<usize>,
    live: usize,
    used: usize, // live + tombstones
    min_id: u64,
    max_id: u64,
}

impl Default for IdIndex {
    fn default() -> Self {
        Self::with_capacity(16)
    }
}

impl IdIndex {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.next_power_of_two().max(16);
        Self {
            keys: vec![EMPTY; cap],
            slots: vec![0; cap],
            live: 0,
            used: 0,
            min_id: u64::MAX,
            max_id: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    fn mask(&self) -> u64 {
        self.keys.len() as u64 - 1
    }

    // Fibonacci hashing; ids are dense so a multiplicative spread matters.
    fn bucket(&self, id: u64) -> usize {
        (id.wrapping_mul(0x9E37_79B9_7F4A_7C15) & self.mask()) as usize
    }

    pub fn insert(&mut self, id: u64, slot: usize) {
        debug_assert!(id < TOMB);
        if (self.used + 1) * 10 > self.keys.len() * 7 {
            self.rehash();
        }
        let mut i = self.bucket(id);
        loop {
            match self.keys[i] {
                EMPTY | TOMB => {
                    if self.keys[i] == EMPTY {
                        self.used += 1;
                    }
                    self.keys[i] = id;
                    self.slots[i] = slot;
                    self.live += 1;
                    self.min_id = self.min_id.min(id);
                    self.max_id = self.max_id.max(id);
                    return;
                }
                k if k == id => {
                    self.slots[i] = slot;
                    return;
                }
                _ => i = (i + 1) & self.mask() as usize,
            }
        }
    }

    /// Expected O(1); short-circuits to `None` outside the observed range.
    pub fn get(&self, id: u64) -> Option<usize> {
        if self.live == 0 || id < self.min_id || id > self.max_id {
            return None;
        }
        let mut i = self.bucket(id);
        loop {
            match self.keys[i] {
                EMPTY => return None,
                k if k == id => return Some(self.slots[i]),
                _ => i = (i + 1) & self.mask() as usize,
            }
        }
    }

    /// Remove `id`, leaving a tombstone. Returns the slot if present.
    pub fn remove(&mut self, id: u64) -> Option<usize> {
        if self.live == 0 || id < self.min_id || id > self.max_id {
            return None;
        }
        let mut i = self.bucket(id);
        loop {
            match self.keys[i] {
                EMPTY => return None,
                k if k == id => {
                    self.keys[i] = TOMB;
                    self.live -= 1;
                    return Some(self.slots[i]);
                }
                _ => i = (i + 1) & self.mask() as usize,
            }
        }
    }

    fn rehash(&mut self) {
        let new_cap = if self.live * 2 >= self.keys.len() {
            self.keys.len() * 2
        } else {
            self.keys.len() // tombstone-heavy: same size, drop tombstones
        };
        let old_keys = std::mem::replace(&mut self.keys, vec![EMPTY; new_cap]);
        let old_slots = std::mem::take(&mut self.slots);
        self.slots = vec![0; new_cap];
        self.live = 0;
        self.used = 0;
        for (k, s) in old_keys.into_iter().zip(old_slots) {
            if k != EMPTY && k != TOMB {
                self.insert(k, s);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_remove() {
        let mut ix = IdIndex::default();
        for id in 0..100u64 {
            ix.insert(id, id as usize * 2);
        }
        assert_eq!(ix.len(), 100);
        assert_eq!(ix.get(40), Some(80));
        assert_eq!(ix.remove(40), Some(80));
        assert_eq!(ix.get(40), None);
        assert_eq!(ix.len(), 99);
    }

    #[test]
    fn out_of_range_short_circuits() {
        let mut ix = IdIndex::default();
        ix.insert(10, 0);
        ix.insert(20, 1);
        assert_eq!(ix.get(5), None);
        assert_eq!(ix.get(9_999), None);
        assert_eq!(ix.get(10), Some(0));
    }

    #[test]
    fn survives_rehash_with_tombstones() {
        let mut ix = IdIndex::with_capacity(16);
        for id in 0..1000u64 {
            ix.insert(id, id as usize);
        }
        for id in (0..1000u64).step_by(2) {
            ix.remove(id);
        }
        for id in 1000..2000u64 {
            ix.insert(id, id as usize);
        }
        for id in (1..1000u64).step_by(2) {
            assert_eq!(ix.get(id), Some(id as usize));
        }
        assert_eq!(ix.get(500), None);
        assert_eq!(ix.get(1500), Some(1500));
    }
}
