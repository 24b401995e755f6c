//! Protocol name registry
//!
//! Hands out BIRD protocol identifiers that are unique for the lifetime of a
//! registry, and remembers which operator-facing peer produced each one. A
//! registry is created by the caller and shared with the template engine, so
//! every generation run (and every test) starts from an empty one.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tracing::debug;

/// The operator-facing identity behind a generated protocol identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Protocol {
    /// Peer name as written in the configuration
    pub name: String,
    /// Tags declared on the peer
    pub tags: Vec<String>,
}

#[derive(Debug, Default)]
struct Allocations {
    /// Identifiers in allocation order
    order: Vec<String>,
    protocols: HashMap<String, Protocol>,
}

/// Allocator for unique protocol identifiers
#[derive(Debug, Default)]
pub struct ProtocolRegistry {
    inner: Mutex<Allocations>,
}

impl ProtocolRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    // Allocations are only ever appended while the lock is held, so the data
    // is consistent even if a holder panicked.
    fn lock(&self) -> MutexGuard<'_, Allocations> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Allocate a unique identifier of the form `{base}_AS{asn}_v{af}`
    ///
    /// If that identifier is taken, `_1`, `_2`, ... is appended until a free
    /// one is found. Existing entries are never overwritten.
    ///
    /// ```rust
    /// use pathgen::ProtocolRegistry;
    ///
    /// let registry = ProtocolRegistry::new();
    /// assert_eq!(registry.allocate("EXAMPLE", "Example", "4", 65530, None), "EXAMPLE_AS65530_v4");
    /// assert_eq!(registry.allocate("EXAMPLE", "Example", "4", 65530, None), "EXAMPLE_AS65530_v4_1");
    /// ```
    pub fn allocate(
        &self,
        base: &str,
        operator_name: &str,
        address_family: &str,
        asn: u32,
        tags: Option<&[String]>,
    ) -> String {
        let candidate = format!("{}_AS{}_v{}", base, asn, address_family);

        let mut allocations = self.lock();
        let mut name = candidate.clone();
        let mut suffix: u64 = 1;
        while allocations.protocols.contains_key(&name) {
            name = format!("{}_{}", candidate, suffix);
            suffix += 1;
        }
        if suffix > 1 {
            debug!(candidate = %candidate, allocated = %name, "protocol name collision");
        }

        allocations.protocols.insert(
            name.clone(),
            Protocol {
                name: operator_name.to_string(),
                tags: tags.map(<[String]>::to_vec).unwrap_or_default(),
            },
        );
        allocations.order.push(name.clone());
        name
    }

    /// Snapshot of every allocated identifier and its protocol
    pub fn lookup(&self) -> BTreeMap<String, Protocol> {
        self.lock()
            .protocols
            .iter()
            .map(|(name, protocol)| (name.clone(), protocol.clone()))
            .collect()
    }

    /// Allocated identifiers in allocation order
    pub fn names(&self) -> Vec<String> {
        self.lock().order.clone()
    }

    pub fn get(&self, name: &str) -> Option<Protocol> {
        self.lock().protocols.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_first_allocation_has_no_suffix() {
        let registry = ProtocolRegistry::new();
        let name = registry.allocate("CLOUDFLARE", "Cloudflare", "6", 13335, None);
        assert_eq!(name, "CLOUDFLARE_AS13335_v6");
    }

    #[test]
    fn test_collisions_use_increasing_suffixes() {
        let registry = ProtocolRegistry::new();
        let names: Vec<String> = (0..4)
            .map(|_| registry.allocate("PEER", "Peer", "4", 64500, None))
            .collect();
        assert_eq!(
            names,
            vec![
                "PEER_AS64500_v4",
                "PEER_AS64500_v4_1",
                "PEER_AS64500_v4_2",
                "PEER_AS64500_v4_3",
            ]
        );
    }

    #[test]
    fn test_distinct_inputs_do_not_collide() {
        let registry = ProtocolRegistry::new();
        assert_eq!(registry.allocate("PEER", "Peer", "4", 64500, None), "PEER_AS64500_v4");
        assert_eq!(registry.allocate("PEER", "Peer", "6", 64500, None), "PEER_AS64500_v6");
        assert_eq!(registry.allocate("PEER", "Peer", "4", 64501, None), "PEER_AS64501_v4");
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_suffixed_name_already_taken() {
        // A base that literally ends in a suffix must not be handed out twice
        let registry = ProtocolRegistry::new();
        let a = registry.allocate("X", "a", "4", 1, None);
        let b = registry.allocate("X", "b", "4", 1, None);
        assert_eq!(b, "X_AS1_v4_1");
        let c = registry.allocate("X", "c", "4_1", 1, None);
        assert_eq!(c, "X_AS1_v4_1_1");
        let unique: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn test_lookup_records_operator_name_and_tags() {
        let registry = ProtocolRegistry::new();
        let tags = vec!["transit".to_string(), "upstream".to_string()];
        let name = registry.allocate("HE", "Hurricane Electric", "6", 6939, Some(&tags[..]));

        let protocols = registry.lookup();
        assert_eq!(
            protocols.get(&name),
            Some(&Protocol {
                name: "Hurricane Electric".to_string(),
                tags,
            })
        );
    }

    #[test]
    fn test_missing_tags_become_empty() {
        let registry = ProtocolRegistry::new();
        let name = registry.allocate("IXP", "Route Server", "4", 64512, None);
        assert_eq!(registry.get(&name).map(|p| p.tags), Some(vec![]));
    }

    #[test]
    fn test_entries_are_never_overwritten() {
        let registry = ProtocolRegistry::new();
        let first = registry.allocate("DUP", "first", "4", 1, None);
        registry.allocate("DUP", "second", "4", 1, None);
        assert_eq!(registry.get(&first).map(|p| p.name), Some("first".to_string()));
    }

    #[test]
    fn test_names_keep_allocation_order() {
        let registry = ProtocolRegistry::new();
        registry.allocate("ZULU", "z", "4", 1, None);
        registry.allocate("ALPHA", "a", "4", 1, None);
        assert_eq!(registry.names(), vec!["ZULU_AS1_v4", "ALPHA_AS1_v4"]);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let registry = Arc::new(ProtocolRegistry::new());
        let per_thread = 50;
        let threads = 8;

        std::thread::scope(|scope| {
            for _ in 0..threads {
                let registry = Arc::clone(&registry);
                scope.spawn(move || {
                    for _ in 0..per_thread {
                        registry.allocate("RACE", "race", "4", 64500, None);
                    }
                });
            }
        });

        let names = registry.names();
        assert_eq!(names.len(), per_thread * threads);
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
        assert!(unique.contains(&"RACE_AS64500_v4".to_string()));
        let last = format!("RACE_AS64500_v4_{}", per_thread * threads - 1);
        assert!(unique.contains(&last));
    }
}
