//! End-of-life operations: destroy, reset, reclaim, and diagnostics
//!
//! A namespace is `Active` after declaration, `Reset` after its values were
//! wiped, and gone from the catalog once reclaimed. Reset namespaces behave
//! exactly like active ones on the next access.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::identity::{IdentityToken, Identified};
use crate::registry::Registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceState {
    Active,
    Reset,
}

/// Identity of an instance, detached from the instance itself.
///
/// Lets a namespace that opted out of automatic cleanup destroy an
/// instance's values after the instance is gone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceKey {
    pub namespace: String,
    pub token: IdentityToken,
}

impl Identified for InstanceKey {
    fn identity(&self) -> IdentityToken {
        self.token
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl Registry {
    /// Delete every value stored for `instance`.
    ///
    /// Idempotent. Returns the number of entries removed.
    pub fn destroy<I: Identified + ?Sized>(&self, instance: &I) -> usize {
        let id = instance.identity();
        let removed = self
            .find_specs_for_instance(instance)
            .iter()
            .filter(|spec| self.inner.store.delete(&spec.id, &id))
            .count();
        debug!(namespace = instance.namespace(), token = %id, removed, "Instance destroyed");
        removed
    }

    /// Wipe all values of every attribute in `namespace`, keeping the
    /// attributes and their defaults. Returns the number of attributes.
    #[instrument(skip(self))]
    pub fn reset(&self, namespace: &str) -> usize {
        let mut catalog = self.inner.catalog.write();
        let Some(ns) = catalog.get_mut(namespace) else {
            return 0;
        };

        let entries: usize = ns
            .specs
            .iter()
            .map(|spec| self.inner.store.clear(&spec.id))
            .sum();
        ns.state = NamespaceState::Reset;
        debug!(attributes = ns.specs.len(), entries, "Namespace reset");
        ns.specs.len()
    }

    /// Remove `namespace` entirely: attributes, defaults, cleanup flag and
    /// values. Returns the number of attributes removed.
    ///
    /// Accessors obtained earlier stay callable but read as unset and fail
    /// on set.
    #[instrument(skip(self))]
    pub fn reclaim(&self, namespace: &str) -> usize {
        let Some(ns) = self.inner.catalog.write().remove(namespace) else {
            return 0;
        };

        let entries: usize = ns
            .specs
            .iter()
            .map(|spec| self.inner.store.remove(&spec.id))
            .sum();
        debug!(attributes = ns.specs.len(), entries, "Namespace reclaimed");
        ns.specs.len()
    }

    /// Names of all namespaces not yet reclaimed, sorted.
    pub fn list_namespaces(&self) -> Vec<String> {
        self.inner.catalog.read().keys().cloned().collect()
    }

    pub fn namespace_state(&self, namespace: &str) -> Option<NamespaceState> {
        self.inner.catalog.read().get(namespace).map(|ns| ns.state)
    }

    /// Stored values for `instance`, by attribute name.
    ///
    /// Defaults are not materialized; attributes never read or written are
    /// absent from the map.
    pub fn dump<I: Identified + ?Sized>(&self, instance: &I) -> BTreeMap<String, Value> {
        let id = instance.identity();
        self.find_specs_for_instance(instance)
            .iter()
            .filter_map(|spec| {
                self.inner
                    .store
                    .get(&spec.id, &id)
                    .map(|value| (spec.name.clone(), value))
            })
            .collect()
    }

    /// Run end-of-life cleanup for an instance that is going away, then
    /// retire its token.
    pub(crate) fn finalize<I: Identified + ?Sized>(&self, instance: &I) {
        let id = instance.identity();
        if self.cleanup_enabled(instance.namespace()) {
            self.destroy(instance);
        } else {
            debug!(namespace = instance.namespace(), token = %id, "Cleanup suppressed, values kept");
        }
        self.inner.tokens.release(id);
    }
}
