//! Registry-issued instances
//!
//! An [`Instance`] is the finalizer contract in concrete form: it owns a
//! generational token and, when dropped, destroys its values (unless its
//! namespace suppressed cleanup) before returning the token's slot for
//! reuse. Because the slot comes back under a new generation, a later
//! instance can never read what this one left behind.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::identity::{IdentityToken, Identified};
use crate::lifecycle::InstanceKey;
use crate::registry::Registry;

pub struct Instance<T = ()> {
    registry: Registry,
    namespace: String,
    token: IdentityToken,
    data: T,
}

impl<T> Instance<T> {
    pub(crate) fn new(registry: Registry, namespace: String, token: IdentityToken, data: T) -> Self {
        Self {
            registry,
            namespace,
            token,
            data,
        }
    }

    /// Detached identity, usable with `destroy` or `dump` after the
    /// instance has been dropped.
    pub fn key(&self) -> InstanceKey {
        InstanceKey {
            namespace: self.namespace.clone(),
            token: self.token,
        }
    }
}

impl<T> Identified for Instance<T> {
    fn identity(&self) -> IdentityToken {
        self.token
    }

    fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl<T> Deref for Instance<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for Instance<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

impl<T> Drop for Instance<T> {
    fn drop(&mut self) {
        self.registry.finalize(&*self);
    }
}

impl<T: fmt::Debug> fmt::Debug for Instance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("namespace", &self.namespace)
            .field("token", &self.token)
            .field("data", &self.data)
            .finish()
    }
}
