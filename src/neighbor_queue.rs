//! Bounded top-k selection over f32 keys for BinaryHeap.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// A candidate with its ranking key (smaller is better) and id.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub key: f32,
    pub id: usize,
}

impl Neighbor {
    pub fn new(id: usize, key: f32) -> Self {
        Self { key, id }
    }
}

impl PartialEq for Neighbor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Neighbor {}

impl PartialOrd for Neighbor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Total order: key first, then id. Equal keys therefore prefer the lower id,
// whatever order candidates arrive in.
impl Ord for Neighbor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .total_cmp(&other.key)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Max-heap holding the best `limit` neighbors seen so far; the worst sits on top.
pub struct TopK {
    heap: BinaryHeap<Neighbor>,
    limit: usize,
}

impl TopK {
    pub fn new(limit: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(limit.saturating_add(1).min(1024)),
            limit,
        }
    }

    /// Offer a candidate; it is kept only if it beats the current worst.
    pub fn push(&mut self, n: Neighbor) {
        if self.limit == 0 {
            return;
        }
        if self.heap.len() < self.limit {
            self.heap.push(n);
        } else if let Some(worst) = self.heap.peek() {
            if n < *worst {
                self.heap.pop();
                self.heap.push(n);
            }
        }
    }

    /// The current worst kept neighbor.
    pub fn peek(&self) -> Option<&Neighbor> {
        self.heap.peek()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into a Vec sorted best-first.
    pub fn into_sorted_vec(self) -> Vec<Neighbor> {
        self.heap.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_smallest() {
        let mut top = TopK::new(2);
        top.push(Neighbor::new(0, 5.0));
        top.push(Neighbor::new(1, 1.0));
        top.push(Neighbor::new(2, 3.0));

        assert_eq!(top.len(), 2);
        assert_eq!(top.peek().unwrap().key, 3.0);
        let sorted = top.into_sorted_vec();
        assert_eq!(sorted[0].id, 1);
        assert_eq!(sorted[1].id, 2);
    }

    #[test]
    fn test_tie_prefers_lower_id() {
        let mut top = TopK::new(2);
        top.push(Neighbor::new(7, 1.0));
        top.push(Neighbor::new(9, 1.0));
        top.push(Neighbor::new(3, 1.0));

        let ids: Vec<usize> = top.into_sorted_vec().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![3, 7]);
    }

    #[test]
    fn test_limit_larger_than_input() {
        let mut top = TopK::new(10);
        top.push(Neighbor::new(0, 2.0));
        top.push(Neighbor::new(1, 1.0));
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn test_zero_limit_keeps_nothing() {
        let mut top = TopK::new(0);
        top.push(Neighbor::new(0, 2.0));
        assert!(top.is_empty());
    }

    #[test]
    fn test_into_sorted_vec() {
        let mut top = TopK::new(4);
        for (id, key) in [(0, 5.0), (1, 1.0), (2, 3.0), (3, 2.0)] {
            top.push(Neighbor::new(id, key));
        }
        let sorted = top.into_sorted_vec();
        for pair in sorted.windows(2) {
            assert!(pair[0].key <= pair[1].key);
        }
    }
}
