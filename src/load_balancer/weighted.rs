//! Smooth weighted round-robin strategy.
//!
//! The cursor walks the ring; each time it wraps to the first relation the
//! current weight drops by the gcd of all weights (resetting to the maximum
//! weight once it reaches zero). A relation is accepted only while its
//! weight is at least the current weight, so heavy relations are picked
//! more often and light ones are interleaved once per cycle.

use crate::load_balancer::relation::{Relation, RelationSet};
use crate::load_balancer::HealthView;

/// Rotation state of one relation ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rotation {
    /// Last picked position, `None` before the first pick.
    pub current_index: Option<usize>,
    pub current_weight: i64,
    pub gcd: i64,
    pub max_weight: i64,
}

fn gcd(mut a: i64, mut b: i64) -> i64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl Rotation {
    /// Initial cursor for `relations`, with gcd and max weight computed.
    pub fn for_relations(relations: &[Relation]) -> Self {
        let weights = relations.iter().map(|r| i64::from(r.weight));
        Self {
            current_index: None,
            current_weight: 0,
            gcd: weights.clone().fold(0, gcd),
            max_weight: weights.max().unwrap_or(0),
        }
    }

    /// Move to the next accepted position and return it.
    pub fn advance(&mut self, relations: &[Relation]) -> Option<usize> {
        if relations.is_empty() {
            return None;
        }

        let len = relations.len();
        // All-zero weights leave gcd at 0; step by at least one so the
        // cursor still cycles.
        let step = self.gcd.max(1);
        let mut index = self.current_index;
        let mut weight = self.current_weight;
        loop {
            let next = index.map_or(0, |i| (i + 1) % len);
            if next == 0 {
                weight -= step;
                if weight <= 0 {
                    weight = self.max_weight;
                }
            }
            index = Some(next);
            if i64::from(relations[next].weight) >= weight {
                break;
            }
        }

        self.current_index = index;
        self.current_weight = weight;
        index
    }
}

impl RelationSet {
    /// Advance the rotation and return the picked position.
    pub fn next_index(&self) -> Option<usize> {
        self.lock_rotation().advance(self.relations())
    }

    /// Pick the next address that `health` does not flag as unhealthy.
    ///
    /// Unhealthy candidates are dropped from a working copy of the ring and
    /// the rotation keeps advancing, so the call ends after at most one
    /// attempt per relation. `None` means nothing is available.
    pub fn pick_addr<H: HealthView + ?Sized>(&self, health: &H) -> Option<String> {
        let relations = self.relations();
        if relations.is_empty() {
            return None;
        }

        let mut rotation = self.lock_rotation();
        let mut candidates: Vec<&Relation> = relations.iter().collect();
        while !candidates.is_empty() {
            let index = rotation.advance(relations)? % candidates.len();
            let addr = candidates[index].addr();
            if !health.is_unhealthy(&addr) {
                return Some(addr);
            }
            tracing::trace!(addr = %addr, "Skipping unhealthy relation");
            candidates.remove(index);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_balancer::relation::Transport;
    use std::collections::HashSet;

    impl HealthView for HashSet<String> {
        fn is_unhealthy(&self, addr: &str) -> bool {
            self.contains(addr)
        }
    }

    fn set_with_weights(weights: &[u32]) -> RelationSet {
        let relations = weights
            .iter()
            .enumerate()
            .map(|(i, w)| Relation {
                name: "svc.a".into(),
                ip: format!("10.0.0.{}", i + 1),
                port: 9000,
                transport: Transport::Tcp,
                weight: *w,
            })
            .collect();
        RelationSet::new(relations, "cc")
    }

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(0, 6), 6);
        assert_eq!(gcd(12, 18), 6);
        assert_eq!(gcd(5, 1), 1);
    }

    #[test]
    fn test_weighted_sequence() {
        let set = set_with_weights(&[5, 1, 1]);
        let picks: Vec<usize> = (0..14).map(|_| set.next_index().unwrap()).collect();
        assert_eq!(picks, vec![0, 0, 0, 0, 0, 1, 2, 0, 0, 0, 0, 0, 1, 2]);
    }

    #[test]
    fn test_frequency_converges_to_weights() {
        let set = set_with_weights(&[5, 1, 1]);
        let mut counts = [0usize; 3];
        for _ in 0..7000 {
            counts[set.next_index().unwrap()] += 1;
        }
        assert_eq!(counts, [5000, 1000, 1000]);
    }

    #[test]
    fn test_light_relations_never_repeat() {
        let set = set_with_weights(&[5, 1, 1]);
        let picks: Vec<usize> = (0..700).map(|_| set.next_index().unwrap()).collect();
        for pair in picks.windows(2) {
            if pair[0] == pair[1] {
                assert_eq!(pair[0], 0, "only the heaviest relation may repeat");
            }
        }
    }

    #[test]
    fn test_equal_weights_is_round_robin() {
        let set = set_with_weights(&[3, 3, 3]);
        let picks: Vec<usize> = (0..6).map(|_| set.next_index().unwrap()).collect();
        assert_eq!(picks, vec![0, 1, 2, 0, 1, 2]);
    }

    #[test]
    fn test_single_and_empty() {
        let single = set_with_weights(&[7]);
        for _ in 0..5 {
            assert_eq!(single.next_index(), Some(0));
        }
        let empty = set_with_weights(&[]);
        assert_eq!(empty.next_index(), None);
        assert_eq!(empty.pick_addr(&HashSet::new()), None);
    }

    #[test]
    fn test_zero_weights_still_cycle() {
        let set = set_with_weights(&[0, 0]);
        let picks: Vec<usize> = (0..4).map(|_| set.next_index().unwrap()).collect();
        assert_eq!(picks, vec![0, 1, 0, 1]);
    }

    #[test]
    fn test_not_modified_continues_sequence() {
        let set = set_with_weights(&[2, 1]);
        assert_eq!(set.next_index(), Some(0));
        assert_eq!(set.next_index(), Some(0));

        let refreshed = set.not_modified();
        assert_eq!(refreshed.next_index(), Some(1));

        let reloaded = set_with_weights(&[2, 1]);
        assert_eq!(reloaded.next_index(), Some(0));
    }

    #[test]
    fn test_pick_skips_unhealthy() {
        let set = set_with_weights(&[1, 1, 1]);
        let mut down = HashSet::new();
        down.insert("10.0.0.2:9000".to_string());

        for _ in 0..30 {
            let addr = set.pick_addr(&down).unwrap();
            assert_ne!(addr, "10.0.0.2:9000");
        }
    }

    #[test]
    fn test_pick_none_when_all_unhealthy() {
        let set = set_with_weights(&[2, 1]);
        let down: HashSet<String> = ["10.0.0.1:9000", "10.0.0.2:9000"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(set.pick_addr(&down), None);

        let mut partial = down.clone();
        partial.remove("10.0.0.2:9000");
        assert_eq!(set.pick_addr(&partial).as_deref(), Some("10.0.0.2:9000"));
    }

    #[test]
    fn test_concurrent_picks_are_gap_free() {
        let set = std::sync::Arc::new(set_with_weights(&[1, 1, 1, 1]));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let set = set.clone();
                std::thread::spawn(move || {
                    (0..100).map(|_| set.next_index().unwrap()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut counts = [0usize; 4];
        for handle in handles {
            for index in handle.join().unwrap() {
                counts[index] += 1;
            }
        }
        assert_eq!(counts, [100, 100, 100, 100]);
    }
}
