// Copyright 2024 FastLabs Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::buffer::BufferEntry;
use crate::buffer::BufferHandle;

/// A buffer entry paired with the logger that mirrors into it.
#[derive(Debug)]
pub struct BufferSlot<L> {
    /// The accumulator.
    pub entry: BufferHandle,
    /// The logger writing into [`entry`](Self::entry).
    pub logger: Arc<L>,
}

impl<L> Clone for BufferSlot<L> {
    fn clone(&self) -> Self {
        Self {
            entry: self.entry.clone(),
            logger: self.logger.clone(),
        }
    }
}

/// A bounded, insertion-ordered collection of [`BufferSlot`]s.
///
/// Lookup is a linear scan over identities. Inserting beyond capacity evicts the oldest-inserted
/// slot; lookups never promote a slot. Handles held by callers outlive eviction, but an evicted
/// identity is recreated from scratch on the next request.
#[derive(Debug)]
pub struct BufferRegistry<L> {
    capacity: AtomicUsize,
    slots: Mutex<VecDeque<BufferSlot<L>>>,
}

impl<L> BufferRegistry<L> {
    /// Create an empty registry holding at most `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: AtomicUsize::new(capacity),
            slots: Mutex::new(VecDeque::new()),
        }
    }

    /// The maximum number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Relaxed)
    }

    /// Change the maximum number of slots. Excess slots are evicted on the next insertion.
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Relaxed);
    }

    /// Number of slots currently held.
    pub fn len(&self) -> usize {
        self.slots().len()
    }

    /// Whether the registry holds no slot.
    pub fn is_empty(&self) -> bool {
        self.slots().is_empty()
    }

    /// Return the slot for this identity, creating it with `make_logger` when absent.
    ///
    /// The boolean is `true` when an existing slot was reused.
    pub fn get_or_create<F>(
        &self,
        prefix: &str,
        service_name: &str,
        extra_info: &str,
        make_logger: F,
    ) -> (BufferSlot<L>, bool)
    where
        F: FnOnce(&BufferHandle) -> L,
    {
        let mut slots = self.slots();
        if let Some(slot) = find(&slots, service_name, extra_info) {
            return (slot, true);
        }

        let entry = Arc::new(BufferEntry::new(prefix, service_name, extra_info));
        let logger = Arc::new(make_logger(&entry));
        let slot = BufferSlot { entry, logger };

        let capacity = self.capacity();
        let mut evicted = vec![];
        while !slots.is_empty() && slots.len() >= capacity {
            evicted.extend(slots.pop_front());
        }
        if capacity > 0 {
            slots.push_back(slot.clone());
        }
        drop(slots);

        for old in evicted {
            log::debug!(
                target: "logforth_buffer",
                service_name = old.entry.service_name(),
                extra_info = old.entry.extra_info();
                "evicted oldest buffer"
            );
        }
        (slot, false)
    }

    /// Find the slot for this identity.
    pub fn lookup(&self, service_name: &str, extra_info: &str) -> Option<BufferSlot<L>> {
        find(&self.slots(), service_name, extra_info)
    }

    /// Identities of the held slots, oldest first.
    pub fn identities(&self) -> Vec<(String, String)> {
        self.slots()
            .iter()
            .map(|slot| {
                (
                    slot.entry.service_name().to_string(),
                    slot.entry.extra_info().to_string(),
                )
            })
            .collect()
    }

    /// Entries of the held slots, oldest first.
    pub fn handles(&self) -> Vec<BufferHandle> {
        self.slots().iter().map(|slot| slot.entry.clone()).collect()
    }

    /// Drop every slot.
    pub fn clear(&self) {
        self.slots().clear();
    }

    fn slots(&self) -> MutexGuard<'_, VecDeque<BufferSlot<L>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn find<L>(
    slots: &VecDeque<BufferSlot<L>>,
    service_name: &str,
    extra_info: &str,
) -> Option<BufferSlot<L>> {
    slots
        .iter()
        .find(|slot| slot.entry.matches(service_name, extra_info))
        .cloned()
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    fn create(registry: &BufferRegistry<()>, service_name: &str) -> (BufferSlot<()>, bool) {
        registry.get_or_create("logs/", service_name, "", |_| ())
    }

    #[test]
    fn test_same_identity_returns_same_entry() {
        let registry = BufferRegistry::new(4);
        let (first, reused) = create(&registry, "a");
        assert!(!reused);
        first.entry.write(b"kept");

        let (second, reused) = create(&registry, "a");
        assert!(reused);
        assert!(Arc::ptr_eq(&first.entry, &second.entry));
        assert!(Arc::ptr_eq(&first.logger, &second.logger));
        assert_eq!(second.entry.contents(), b"kept");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_fifo_eviction_recreates_evicted_identity() {
        let registry = BufferRegistry::new(2);
        let (x, _) = create(&registry, "x");
        x.entry.write(b"old");
        x.entry.mark_dirty();
        create(&registry, "y");
        create(&registry, "z");

        assert_eq!(
            registry.identities(),
            vec![
                ("y".to_string(), String::new()),
                ("z".to_string(), String::new())
            ]
        );
        assert!(registry.lookup("x", "").is_none());

        let (fresh, reused) = create(&registry, "x");
        assert!(!reused);
        assert!(!Arc::ptr_eq(&x.entry, &fresh.entry));
        assert!(fresh.entry.is_empty());
        assert!(!fresh.entry.is_dirty());
        assert_eq!(registry.identities()[1].0, "x");
    }

    #[test]
    fn test_lookup_does_not_promote() {
        let registry = BufferRegistry::new(2);
        create(&registry, "a");
        create(&registry, "b");
        assert!(registry.lookup("a", "").is_some());
        create(&registry, "c");

        assert!(registry.lookup("a", "").is_none());
        assert!(registry.lookup("b", "").is_some());
    }

    #[test]
    fn test_zero_capacity_holds_nothing() {
        let registry = BufferRegistry::new(0);
        let (slot, reused) = create(&registry, "a");
        assert!(!reused);
        assert!(slot.entry.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_shrinking_capacity_evicts_on_next_insert() {
        let registry = BufferRegistry::new(5);
        for name in ["a", "b", "c", "d"] {
            create(&registry, name);
        }
        registry.set_capacity(2);
        assert_eq!(registry.len(), 4);

        create(&registry, "e");
        let names = registry
            .identities()
            .into_iter()
            .map(|(service_name, _)| service_name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["d", "e"]);
    }

    #[test]
    fn test_random_sequences_stay_bounded_and_fifo() {
        let mut rng = rand::rng();
        for _ in 0..50 {
            let capacity = rng.random_range(1..6);
            let registry = BufferRegistry::new(capacity);
            let mut model: VecDeque<String> = VecDeque::new();

            for _ in 0..40 {
                let name = format!("svc-{}", rng.random_range(0..8));
                let (_, reused) = create(&registry, &name);
                assert_eq!(reused, model.contains(&name));
                if !reused {
                    if model.len() >= capacity {
                        model.pop_front();
                    }
                    model.push_back(name);
                }

                assert!(registry.len() <= capacity);
                let names = registry
                    .identities()
                    .into_iter()
                    .map(|(service_name, _)| service_name)
                    .collect::<VecDeque<_>>();
                assert_eq!(names, model);
            }
        }
    }
}
