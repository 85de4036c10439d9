//! Relation model.
//!
//! # Responsibilities
//! - Represent a single backend instance registered under a service name
//! - Hold the ordered relation ring of one service together with its
//!   version token and rotation cursor

use std::net::Ipv6Addr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::load_balancer::weighted::Rotation;

/// Transport a backend listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transport {
    Tcp,
    Udp,
}

impl Transport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Transport::Tcp => "tcp",
            Transport::Udp => "udp",
        }
    }
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One backend instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Service the instance belongs to.
    pub name: String,
    pub ip: String,
    pub port: u16,
    pub transport: Transport,
    /// Relative selection frequency.
    pub weight: u32,
}

impl Relation {
    /// `host:port`, with IPv6 hosts bracketed.
    pub fn addr(&self) -> String {
        if self.ip.parse::<Ipv6Addr>().is_ok() {
            format!("[{}]:{}", self.ip, self.port)
        } else {
            format!("{}:{}", self.ip, self.port)
        }
    }
}

/// The resolved, cached view of one service.
///
/// A set is never replaced field by field: a refresh builds a new set and
/// swaps the cache entry. Only the rotation cursor and the request counter
/// change in place. A "not modified" successor shares its predecessor's
/// cursor, so picks racing the swap still advance one sequence.
#[derive(Debug)]
pub struct RelationSet {
    relations: Arc<[Relation]>,
    check_code: String,
    request_count: AtomicU64,
    rotation: Arc<Mutex<Rotation>>,
}

impl RelationSet {
    /// Build a set from a full registry answer. The cursor starts before
    /// the first relation.
    pub fn new(relations: Vec<Relation>, check_code: impl Into<String>) -> Self {
        let relations: Arc<[Relation]> = relations.into();
        let rotation = Rotation::for_relations(&relations);
        Self {
            relations,
            check_code: check_code.into(),
            request_count: AtomicU64::new(0),
            rotation: Arc::new(Mutex::new(rotation)),
        }
    }

    /// Successor for a "not modified" answer: same relations, check code
    /// and rotation cursor, so the ring continues where it stopped. Only
    /// the request counter starts over.
    pub fn not_modified(&self) -> Self {
        Self {
            relations: Arc::clone(&self.relations),
            check_code: self.check_code.clone(),
            request_count: AtomicU64::new(0),
            rotation: Arc::clone(&self.rotation),
        }
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn check_code(&self) -> &str {
        &self.check_code
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Count one resolution against this set. Returns the new total.
    pub fn record_request(&self) -> u64 {
        self.request_count.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Snapshot of the rotation cursor.
    pub fn rotation(&self) -> Rotation {
        *self.lock_rotation()
    }

    /// Shares the relation storage with `other`.
    pub fn shares_relations(&self, other: &RelationSet) -> bool {
        Arc::ptr_eq(&self.relations, &other.relations)
    }

    pub(crate) fn lock_rotation(&self) -> MutexGuard<'_, Rotation> {
        self.rotation.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(ip: &str, port: u16, weight: u32) -> Relation {
        Relation {
            name: "svc.a".into(),
            ip: ip.into(),
            port,
            transport: Transport::Tcp,
            weight,
        }
    }

    #[test]
    fn test_addr_formatting() {
        assert_eq!(rel("10.0.0.1", 9000, 1).addr(), "10.0.0.1:9000");
        assert_eq!(rel("::1", 53, 1).addr(), "[::1]:53");
        assert_eq!(rel("db.internal", 5432, 1).addr(), "db.internal:5432");
    }

    #[test]
    fn test_new_set_rotation() {
        let set = RelationSet::new(vec![rel("10.0.0.1", 1, 4), rel("10.0.0.2", 1, 6)], "cc1");
        let rotation = set.rotation();
        assert_eq!(rotation.current_index, None);
        assert_eq!(rotation.gcd, 2);
        assert_eq!(rotation.max_weight, 6);
        assert_eq!(set.check_code(), "cc1");
    }

    #[test]
    fn test_not_modified_carries_cursor() {
        let set = RelationSet::new(vec![rel("10.0.0.1", 1, 3), rel("10.0.0.2", 1, 1)], "cc1");
        set.lock_rotation().advance(set.relations());
        set.lock_rotation().advance(set.relations());
        set.record_request();
        let before = set.rotation();

        let next = set.not_modified();
        assert_eq!(next.rotation(), before);
        assert_eq!(next.check_code(), "cc1");
        assert_eq!(next.request_count(), 0);
        assert!(next.shares_relations(&set));
    }

    #[test]
    fn test_not_modified_shares_cursor_with_predecessor() {
        let set = RelationSet::new(
            vec![rel("10.0.0.1", 1, 1), rel("10.0.0.2", 1, 1), rel("10.0.0.3", 1, 1)],
            "cc1",
        );
        let next = set.not_modified();

        // A pick on the old set after the successor exists is not lost.
        assert_eq!(set.next_index(), Some(0));
        assert_eq!(next.next_index(), Some(1));
        assert_eq!(set.next_index(), Some(2));
        assert_eq!(next.next_index(), Some(0));
        assert_eq!(next.rotation(), set.rotation());
    }

    #[test]
    fn test_request_counter() {
        let set = RelationSet::new(Vec::new(), "");
        assert_eq!(set.record_request(), 1);
        assert_eq!(set.record_request(), 2);
        assert_eq!(set.request_count(), 2);
        assert!(set.is_empty());
    }
}
