//! Recency index shared by the file and directory stores.
//!
//! A binary min-heap over (key, last-touched) with an auxiliary map from key
//! to heap slot, so touching an existing key reorders it in place in
//! O(log n) instead of scanning. A monotonic sequence number breaks ties
//! between touches that land on the same instant.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Debug)]
struct HeapSlot {
    key: PathBuf,
    last_touched: Instant,
    seq: u64,
}

impl HeapSlot {
    fn stamp(&self) -> (Instant, u64) {
        (self.last_touched, self.seq)
    }
}

#[derive(Debug, Default)]
pub(crate) struct LruIndex {
    heap: Vec<HeapSlot>,
    positions: HashMap<PathBuf, usize>,
    next_seq: u64,
}

impl LruIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as most recently used, inserting it if new.
    pub fn touch(&mut self, key: &Path) {
        let now = Instant::now();
        let seq = self.next_seq;
        self.next_seq += 1;

        match self.positions.get(key).copied() {
            Some(i) => {
                self.heap[i].last_touched = now;
                self.heap[i].seq = seq;
                // The new stamp is maximal, so only sifting down can apply.
                self.sift_down(i);
            }
            None => {
                let i = self.heap.len();
                self.heap.push(HeapSlot {
                    key: key.to_path_buf(),
                    last_touched: now,
                    seq,
                });
                self.positions.insert(key.to_path_buf(), i);
                self.sift_up(i);
            }
        }
    }

    /// Pop up to `n` least-recently-touched keys, oldest first.
    pub fn evict_oldest(&mut self, n: usize) -> Vec<PathBuf> {
        let mut evicted = Vec::with_capacity(n.min(self.heap.len()));
        while evicted.len() < n && !self.heap.is_empty() {
            let last = self.heap.len() - 1;
            self.swap_slots(0, last);
            if let Some(slot) = self.heap.pop() {
                self.positions.remove(&slot.key);
                if !self.heap.is_empty() {
                    self.sift_down(0);
                }
                evicted.push(slot.key);
            }
        }
        evicted
    }

    /// Remove a specific key regardless of its recency.
    pub fn remove(&mut self, key: &Path) {
        let Some(&i) = self.positions.get(key) else {
            return;
        };
        let last = self.heap.len() - 1;
        self.swap_slots(i, last);
        self.heap.pop();
        self.positions.remove(key);
        if i < self.heap.len() {
            self.sift_down(i);
            self.sift_up(i);
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.positions.clear();
    }

    fn swap_slots(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.positions.insert(self.heap[a].key.clone(), a);
        self.positions.insert(self.heap[b].key.clone(), b);
    }

    fn sift_up(&mut self, mut i: usize) {
        while i > 0 {
            let parent = (i - 1) / 2;
            if self.heap[i].stamp() < self.heap[parent].stamp() {
                self.swap_slots(i, parent);
                i = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut i: usize) {
        loop {
            let left = 2 * i + 1;
            let right = left + 1;
            let mut smallest = i;
            if left < self.heap.len() && self.heap[left].stamp() < self.heap[smallest].stamp() {
                smallest = left;
            }
            if right < self.heap.len() && self.heap[right].stamp() < self.heap[smallest].stamp() {
                smallest = right;
            }
            if smallest == i {
                break;
            }
            self.swap_slots(i, smallest);
            i = smallest;
        }
    }
}
