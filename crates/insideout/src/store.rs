//! Identity store - the side table itself
//!
//! Values are kept per attribute, keyed by identity token:
//! `SpecId -> (IdentityToken -> Value)`. Each attribute's slot map lives in
//! its own `DashMap` entry, so every read or write of one attribute is
//! serialized on that entry's shard lock while unrelated attributes proceed
//! independently.

use std::collections::HashMap;

use dashmap::DashMap;
use serde_json::Value;

use crate::attribute::SpecId;
use crate::identity::IdentityToken;

/// The slot map for an attribute is gone (its namespace was reclaimed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingSlot;

/// In-memory identity-keyed value store
pub struct IdentityStore {
    slots: DashMap<SpecId, HashMap<IdentityToken, Value>>,
}

impl IdentityStore {
    pub fn new() -> Self {
        Self {
            slots: DashMap::new(),
        }
    }

    /// Open an empty slot map for a newly declared attribute.
    pub fn open(&self, spec: SpecId) {
        self.slots.entry(spec).or_default();
    }

    pub fn is_open(&self, spec: &SpecId) -> bool {
        self.slots.contains_key(spec)
    }

    pub fn get(&self, spec: &SpecId, id: &IdentityToken) -> Option<Value> {
        self.slots
            .get(spec)
            .and_then(|values| values.get(id).cloned())
    }

    pub fn contains(&self, spec: &SpecId, id: &IdentityToken) -> bool {
        self.slots
            .get(spec)
            .map(|values| values.contains_key(id))
            .unwrap_or(false)
    }

    /// Unconditional overwrite.
    pub fn set(
        &self,
        spec: &SpecId,
        id: IdentityToken,
        value: Value,
    ) -> Result<(), MissingSlot> {
        let mut values = self.slots.get_mut(spec).ok_or(MissingSlot)?;
        values.insert(id, value);
        Ok(())
    }

    /// Return the stored value, storing `default` first if there is none.
    ///
    /// Lookup and insert happen under one lock, so two concurrent readers
    /// never materialize the default twice.
    pub fn get_or_insert(
        &self,
        spec: &SpecId,
        id: IdentityToken,
        default: &Value,
    ) -> Result<Value, MissingSlot> {
        let mut values = self.slots.get_mut(spec).ok_or(MissingSlot)?;
        Ok(values.entry(id).or_insert_with(|| default.clone()).clone())
    }

    /// Idempotent; deleting an absent entry is not an error.
    pub fn delete(&self, spec: &SpecId, id: &IdentityToken) -> bool {
        self.slots
            .get_mut(spec)
            .map(|mut values| values.remove(id).is_some())
            .unwrap_or(false)
    }

    /// Drop every value of an attribute, keeping the attribute itself.
    pub fn clear(&self, spec: &SpecId) -> usize {
        self.slots
            .get_mut(spec)
            .map(|mut values| {
                let n = values.len();
                values.clear();
                n
            })
            .unwrap_or(0)
    }

    /// Drop an attribute's slot map entirely.
    pub fn remove(&self, spec: &SpecId) -> usize {
        self.slots
            .remove(spec)
            .map(|(_, values)| values.len())
            .unwrap_or(0)
    }

    /// Total number of materialized entries.
    pub fn entry_count(&self) -> usize {
        self.slots.iter().map(|values| values.len()).sum()
    }

    /// Number of entries held for one attribute.
    pub fn len_of(&self, spec: &SpecId) -> usize {
        self.slots.get(spec).map(|values| values.len()).unwrap_or(0)
    }
}

impl Default for IdentityStore {
    fn default() -> Self {
        Self::new()
    }
}
