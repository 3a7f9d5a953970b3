//! Identity tokens and the resolver seam
//!
//! The store never looks inside an object. All it needs is the token an
//! instance resolves to and the namespace the instance belongs to, both
//! supplied through [`Identified`].

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Opaque per-instance key.
///
/// A token is a raw slot plus a generation. Slots are recycled, generations
/// are not: a slot handed out again always carries a higher generation, so
/// leftover entries of a dead instance can never be read through a new one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityToken {
    slot: u64,
    generation: u32,
}

impl IdentityToken {
    pub const fn new(slot: u64, generation: u32) -> Self {
        Self { slot, generation }
    }

    pub fn slot(&self) -> u64 {
        self.slot
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for IdentityToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "id:{}v{}", self.slot, self.generation)
    }
}

/// Resolves a live object to its identity token and owning namespace.
///
/// Implementations must return the same token for the whole lifetime of the
/// object and must not hand that token to another object while entries keyed
/// on it may still exist.
pub trait Identified {
    fn identity(&self) -> IdentityToken;

    fn namespace(&self) -> &str;
}

impl<T: Identified + ?Sized> Identified for &T {
    fn identity(&self) -> IdentityToken {
        (**self).identity()
    }

    fn namespace(&self) -> &str {
        (**self).namespace()
    }
}

/// Source of never-before-seen slots, shared by every allocator in the
/// process so two registries can never issue the same token.
static NEXT_SLOT: AtomicU64 = AtomicU64::new(0);

/// Hands out generational identity tokens.
///
/// Fresh slots are drawn from a process-wide counter; released slots return
/// to this allocator's free list only. A slot whose generation is exhausted
/// is retired instead of recycled.
pub struct TokenAllocator {
    inner: Mutex<Slots>,
}

struct Slots {
    generations: HashMap<u64, u32>,
    free: Vec<u64>,
    live: usize,
}

impl TokenAllocator {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Slots {
                generations: HashMap::new(),
                free: Vec::new(),
                live: 0,
            }),
        }
    }

    /// Allocate a token, reusing a released slot when one is available.
    pub fn allocate(&self) -> IdentityToken {
        let mut slots = self.inner.lock();
        slots.live += 1;
        if let Some(slot) = slots.free.pop() {
            if let Some(&generation) = slots.generations.get(&slot) {
                return IdentityToken::new(slot, generation);
            }
        }
        let slot = NEXT_SLOT.fetch_add(1, Ordering::Relaxed);
        slots.generations.insert(slot, 0);
        IdentityToken::new(slot, 0)
    }

    /// Return a token's slot for reuse under the next generation.
    ///
    /// Releasing a stale token (wrong generation, already released, or
    /// issued by another allocator) is a no-op and returns `false`.
    pub fn release(&self, token: IdentityToken) -> bool {
        let mut guard = self.inner.lock();
        let slots = &mut *guard;
        let next = match slots.generations.get(&token.slot) {
            Some(&generation) if generation == token.generation => generation.checked_add(1),
            _ => return false,
        };
        match next {
            Some(generation) => {
                slots.generations.insert(token.slot, generation);
                slots.free.push(token.slot);
            }
            None => {
                slots.generations.remove(&token.slot);
            }
        }
        slots.live -= 1;
        true
    }

    /// Number of tokens handed out and not yet released.
    pub fn live(&self) -> usize {
        self.inner.lock().live
    }
}

impl Default for TokenAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tokens_are_distinct() {
        let alloc = TokenAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_ne!(a, b);
        assert_eq!(alloc.live(), 2);
    }

    #[test]
    fn recycled_slot_bumps_generation() {
        let alloc = TokenAllocator::new();
        let a = alloc.allocate();
        assert!(alloc.release(a));

        let b = alloc.allocate();
        assert_eq!(b.slot(), a.slot());
        assert_eq!(b.generation(), a.generation() + 1);
        assert_ne!(a, b);
    }

    #[test]
    fn double_release_is_ignored() {
        let alloc = TokenAllocator::new();
        let a = alloc.allocate();
        assert!(alloc.release(a));
        assert!(!alloc.release(a));
        assert_eq!(alloc.live(), 0);

        // The stale token must not free the slot now owned by `b`.
        let b = alloc.allocate();
        assert!(!alloc.release(a));
        assert_eq!(alloc.live(), 1);
        assert!(alloc.release(b));
    }

    #[test]
    fn allocators_never_share_slots() {
        let one = TokenAllocator::new();
        let two = TokenAllocator::new();
        let a = one.allocate();
        let b = two.allocate();
        assert_ne!(a.slot(), b.slot());

        // A token from another allocator is not ours to release.
        assert!(!two.release(a));
        assert_eq!(two.live(), 1);
    }

    #[test]
    fn exhausted_slot_is_retired() {
        let alloc = TokenAllocator::new();
        let a = alloc.allocate();
        alloc.inner.lock().generations.insert(a.slot(), u32::MAX);
        let last = IdentityToken::new(a.slot(), u32::MAX);

        assert!(alloc.release(last));
        assert_eq!(alloc.live(), 0);
        assert!(!alloc.release(last));

        let b = alloc.allocate();
        assert_ne!(b.slot(), a.slot());
        assert_eq!(b.generation(), 0);
    }

    #[test]
    fn display_shows_slot_and_generation() {
        assert_eq!(IdentityToken::new(7, 2).to_string(), "id:7v2");
    }
}
