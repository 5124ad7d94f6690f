use crate::core::types::TermHash;

const MIN_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    hash: TermHash,
    freq: u16, // 0 marks an empty slot
}

/// Per-document term aggregation table.
///
/// Open addressing with linear probing over a power-of-two slot array. The
/// `used` list remembers occupied slots so `clear` costs O(used) instead of
/// O(capacity); the table is meant to be owned by a worker and reused for
/// every document it tokenizes.
#[derive(Debug, Clone)]
pub struct TermFreqTable {
    slots: Vec<Slot>,
    used: Vec<u32>,
    mask: usize,
}

impl Default for TermFreqTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TermFreqTable {
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(MIN_CAPACITY).next_power_of_two();
        TermFreqTable {
            slots: vec![Slot::default(); capacity],
            used: Vec::with_capacity(capacity / 2),
            mask: capacity - 1,
        }
    }

    #[inline]
    fn slot_for(&self, hash: TermHash) -> usize {
        ((hash ^ (hash >> 29)) as usize) & self.mask
    }

    /// Count one occurrence of `hash`; frequencies saturate at `u16::MAX`.
    #[inline]
    pub fn add(&mut self, hash: TermHash) {
        if (self.used.len() + 1) * 2 > self.slots.len() {
            self.grow();
        }
        let mut idx = self.slot_for(hash);
        loop {
            let slot = &mut self.slots[idx];
            if slot.freq == 0 {
                slot.hash = hash;
                slot.freq = 1;
                self.used.push(idx as u32);
                return;
            }
            if slot.hash == hash {
                slot.freq = slot.freq.saturating_add(1);
                return;
            }
            idx = (idx + 1) & self.mask;
        }
    }

    pub fn get(&self, hash: TermHash) -> u16 {
        let mut idx = self.slot_for(hash);
        loop {
            let slot = &self.slots[idx];
            if slot.freq == 0 {
                return 0;
            }
            if slot.hash == hash {
                return slot.freq;
            }
            idx = (idx + 1) & self.mask;
        }
    }

    fn grow(&mut self) {
        let entries: Vec<Slot> = self.used.iter().map(|&i| self.slots[i as usize]).collect();
        let capacity = self.slots.len() * 2;
        self.slots = vec![Slot::default(); capacity];
        self.mask = capacity - 1;
        self.used.clear();
        for entry in entries {
            let mut idx = self.slot_for(entry.hash);
            while self.slots[idx].freq != 0 {
                idx = (idx + 1) & self.mask;
            }
            self.slots[idx] = entry;
            self.used.push(idx as u32);
        }
    }

    pub fn clear(&mut self) {
        for &idx in &self.used {
            self.slots[idx as usize].freq = 0;
        }
        self.used.clear();
    }

    /// Distinct terms seen since the last clear.
    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Entries in first-occurrence order.
    pub fn entries(&self) -> impl Iterator<Item = (TermHash, u16)> + '_ {
        self.used.iter().map(move |&i| {
            let slot = &self.slots[i as usize];
            (slot.hash, slot.freq)
        })
    }
}
