//! Generated get/set behaviour for a declared attribute
//!
//! An [`Accessor`] is the capability handed out when an attribute is
//! declared. It is also installed in the owning namespace's accessor table so
//! callers can look it up by name.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, trace};

use crate::attribute::{AttributeSpec, SpecId};
use crate::error::AccessError;
use crate::identity::Identified;
use crate::store::IdentityStore;

/// Which of the four default x validator combinations an accessor serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorKind {
    Plain,
    Defaulted,
    Validated,
    DefaultedValidated,
}

impl AccessorKind {
    pub fn of(spec: &AttributeSpec) -> Self {
        match (spec.has_default(), spec.has_validator()) {
            (false, false) => Self::Plain,
            (true, false) => Self::Defaulted,
            (false, true) => Self::Validated,
            (true, true) => Self::DefaultedValidated,
        }
    }
}

/// Outcome of [`Accessor::access`].
#[derive(Debug)]
pub enum Accessed<'a, I> {
    /// A read; `None` means the attribute is unset.
    Value(Option<Value>),
    /// A successful write hands the instance back for chaining.
    Instance(&'a I),
}

impl<'a, I> Accessed<'a, I> {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(v) => v,
            Self::Instance(_) => None,
        }
    }
}

/// Get/set capability for one attribute.
#[derive(Clone)]
pub struct Accessor {
    spec: Arc<AttributeSpec>,
    store: Arc<IdentityStore>,
    kind: AccessorKind,
}

impl Accessor {
    pub(crate) fn new(spec: Arc<AttributeSpec>, store: Arc<IdentityStore>) -> Self {
        let kind = AccessorKind::of(&spec);
        Self { spec, store, kind }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn namespace(&self) -> &str {
        &self.spec.namespace
    }

    pub fn spec_id(&self) -> SpecId {
        self.spec.id
    }

    pub fn spec(&self) -> &AttributeSpec {
        &self.spec
    }

    pub fn kind(&self) -> AccessorKind {
        self.kind
    }

    /// Get with no value, set with one.
    pub fn access<'a, I: Identified>(
        &self,
        instance: &'a I,
        new_value: Option<Value>,
    ) -> Result<Accessed<'a, I>, AccessError> {
        match new_value {
            None => Ok(Accessed::Value(self.get(instance))),
            Some(value) => self.set(instance, value).map(Accessed::Instance),
        }
    }

    /// Read the attribute.
    ///
    /// Falls back to the default (materializing it for this instance) when
    /// nothing is stored, and to `None` when there is no default either.
    pub fn get<I: Identified + ?Sized>(&self, instance: &I) -> Option<Value> {
        let id = instance.identity();
        let value = match &self.spec.default {
            Some(default) => self.store.get_or_insert(&self.spec.id, id, default).ok(),
            None => self.store.get(&self.spec.id, &id),
        };
        trace!(attribute = %self.spec.name, token = %id, found = value.is_some(), "get");
        value
    }

    /// Read the stored value only, never materializing the default.
    pub fn peek<I: Identified + ?Sized>(&self, instance: &I) -> Option<Value> {
        self.store.get(&self.spec.id, &instance.identity())
    }

    /// Write the attribute after running the validator, if any.
    ///
    /// A rejected value leaves the store untouched.
    ///
    /// Writing through an accessor of another registered namespace is
    /// allowed, but the instance's own cleanup only walks its own namespace:
    /// such an entry outlives the instance until the accessor's namespace is
    /// reset or reclaimed.
    pub fn set<'a, I: Identified>(
        &self,
        instance: &'a I,
        value: impl Into<Value>,
    ) -> Result<&'a I, AccessError> {
        let value = value.into();
        if let Some(validator) = &self.spec.validator {
            (**validator)(instance as &dyn Identified, &value).map_err(|source| {
                AccessError::Rejected {
                    attribute: self.spec.name.clone(),
                    source,
                }
            })?;
        }

        let id = instance.identity();
        if instance.namespace() != self.spec.namespace {
            debug!(
                namespace = instance.namespace(),
                owner = %self.spec.namespace,
                attribute = %self.spec.name,
                token = %id,
                "Cross-namespace write"
            );
        }
        self.store
            .set(&self.spec.id, id, value)
            .map_err(|_| AccessError::Reclaimed {
                namespace: self.spec.namespace.clone(),
                attribute: self.spec.name.clone(),
            })?;
        trace!(attribute = %self.spec.name, token = %id, "set");
        Ok(instance)
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor")
            .field("namespace", &self.spec.namespace)
            .field("name", &self.spec.name)
            .field("kind", &self.kind)
            .finish()
    }
}
