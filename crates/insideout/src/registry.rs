//! Attribute registry
//!
//! The registry is the explicit context object tying everything together:
//! the namespace catalog (namespace -> declared attributes, accessor table,
//! cleanup flag), the identity store holding the values, and the token
//! allocator backing [`Instance`]. Independent registries share nothing but
//! the process-wide slot counter that keeps their tokens distinct.
//!
//! Lock order is always catalog first, then store.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::accessor::Accessor;
use crate::attribute::{AttributeSpec, Constraints};
use crate::builder::{Declaration, NamespaceBuilder};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, Result};
use crate::identity::{Identified, TokenAllocator};
use crate::instance::Instance;
use crate::lifecycle::NamespaceState;
use crate::store::IdentityStore;

/// Shared handle to a registry; clones refer to the same catalog and store.
#[derive(Clone)]
pub struct Registry {
    pub(crate) inner: Arc<Inner>,
}

pub(crate) struct Inner {
    pub(crate) config: RegistryConfig,
    pub(crate) catalog: RwLock<BTreeMap<String, Namespace>>,
    pub(crate) store: Arc<IdentityStore>,
    pub(crate) tokens: TokenAllocator,
}

/// Catalog record for one namespace.
pub(crate) struct Namespace {
    pub(crate) specs: Vec<Arc<AttributeSpec>>,
    pub(crate) accessors: HashMap<String, Accessor>,
    pub(crate) suppress_cleanup: bool,
    pub(crate) state: NamespaceState,
}

impl Namespace {
    fn new(suppress_cleanup: bool) -> Self {
        Self {
            specs: Vec::new(),
            accessors: HashMap::new(),
            suppress_cleanup,
            state: NamespaceState::Active,
        }
    }
}

/// Registry-wide counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StoreStats {
    pub namespaces: usize,
    pub attributes: usize,
    pub entries: usize,
    pub live_instances: usize,
}

impl Registry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                catalog: RwLock::new(BTreeMap::new()),
                store: Arc::new(IdentityStore::new()),
                tokens: TokenAllocator::new(),
            }),
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Start a fluent declaration list for `namespace`.
    pub fn build(&self, namespace: impl Into<String>) -> NamespaceBuilder<'_> {
        NamespaceBuilder::new(self, namespace.into())
    }

    /// Declare one attribute and return its accessor.
    pub fn register(
        &self,
        namespace: &str,
        name: &str,
        constraints: Constraints,
    ) -> Result<Accessor> {
        let spec = Arc::new(AttributeSpec::new(namespace, name, constraints)?);

        let mut catalog = self.inner.catalog.write();
        self.ensure_unique(&catalog, namespace, std::slice::from_ref(&spec))?;
        let ns = self.namespace_mut(&mut catalog, namespace);
        Ok(self.install(ns, spec))
    }

    /// Register a whole declaration list in one call.
    ///
    /// Every declaration is checked before anything is installed, so a
    /// failing list leaves the catalog untouched. [`Declaration::NoCleanup`]
    /// switches off end-of-life cleanup for the namespace.
    pub fn declare<I>(&self, namespace: &str, declarations: I) -> Result<Vec<Accessor>>
    where
        I: IntoIterator,
        I::Item: Into<Declaration>,
    {
        let mut specs = Vec::new();
        let mut suppress = false;
        for declaration in declarations {
            match declaration.into() {
                Declaration::NoCleanup => suppress = true,
                Declaration::Attribute { name, constraints } => {
                    specs.push(Arc::new(AttributeSpec::new(namespace, &name, constraints)?));
                }
            }
        }

        let mut catalog = self.inner.catalog.write();
        self.ensure_unique(&catalog, namespace, &specs)?;
        let ns = self.namespace_mut(&mut catalog, namespace);
        if suppress {
            debug!(namespace, "End-of-life cleanup suppressed");
            ns.suppress_cleanup = true;
        }
        let mut accessors = Vec::with_capacity(specs.len());
        for spec in specs {
            accessors.push(self.install(ns, spec));
        }
        Ok(accessors)
    }

    /// Look up an installed accessor by attribute name.
    pub fn accessor(&self, namespace: &str, name: &str) -> Option<Accessor> {
        self.inner
            .catalog
            .read()
            .get(namespace)
            .and_then(|ns| ns.accessors.get(name).cloned())
    }

    /// Declared attribute names, in declaration order.
    pub fn attributes(&self, namespace: &str) -> Vec<String> {
        self.inner
            .catalog
            .read()
            .get(namespace)
            .map(|ns| ns.specs.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }

    /// Whether instances of `namespace` clean up after themselves on drop.
    pub fn cleanup_enabled(&self, namespace: &str) -> bool {
        self.inner
            .catalog
            .read()
            .get(namespace)
            .map(|ns| !ns.suppress_cleanup)
            .unwrap_or(true)
    }

    /// Create an instance of `namespace` with no payload.
    pub fn instantiate(&self, namespace: impl Into<String>) -> Instance {
        self.instantiate_with(namespace, ())
    }

    /// Create an instance of `namespace` carrying `data`.
    pub fn instantiate_with<T>(&self, namespace: impl Into<String>, data: T) -> Instance<T> {
        let token = self.inner.tokens.allocate();
        Instance::new(self.clone(), namespace.into(), token, data)
    }

    /// Attributes that may hold values for `instance`.
    ///
    /// A known namespace answers directly from the catalog. For an unknown
    /// namespace every attribute of every namespace is checked for an entry
    /// keyed on the instance's token, unless the fallback scan is disabled.
    pub fn find_specs_for_instance<I: Identified + ?Sized>(
        &self,
        instance: &I,
    ) -> Vec<Arc<AttributeSpec>> {
        let catalog = self.inner.catalog.read();
        if let Some(ns) = catalog.get(instance.namespace()) {
            return ns.specs.clone();
        }

        let id = instance.identity();
        if !self.inner.config.fallback_scan {
            debug!(namespace = instance.namespace(), token = %id, "Unknown namespace, fallback scan disabled");
            return Vec::new();
        }

        warn!(namespace = instance.namespace(), token = %id, "Unknown namespace, scanning all attributes");
        catalog
            .values()
            .flat_map(|ns| ns.specs.iter())
            .filter(|spec| self.inner.store.contains(&spec.id, &id))
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> StoreStats {
        let catalog = self.inner.catalog.read();
        StoreStats {
            namespaces: catalog.len(),
            attributes: catalog.values().map(|ns| ns.specs.len()).sum(),
            entries: self.inner.store.entry_count(),
            live_instances: self.inner.tokens.live(),
        }
    }

    fn ensure_unique(
        &self,
        catalog: &BTreeMap<String, Namespace>,
        namespace: &str,
        specs: &[Arc<AttributeSpec>],
    ) -> Result<()> {
        if self.inner.config.allow_redeclare {
            return Ok(());
        }

        let mut seen: HashSet<&str> = catalog
            .get(namespace)
            .map(|ns| ns.accessors.keys().map(String::as_str).collect())
            .unwrap_or_default();
        for spec in specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(RegistryError::DuplicateAttribute {
                    namespace: namespace.to_string(),
                    attribute: spec.name.clone(),
                });
            }
        }
        Ok(())
    }

    fn namespace_mut<'c>(
        &self,
        catalog: &'c mut BTreeMap<String, Namespace>,
        namespace: &str,
    ) -> &'c mut Namespace {
        let suppress = !self.inner.config.auto_cleanup;
        catalog.entry(namespace.to_string()).or_insert_with(|| {
            debug!(namespace, "Namespace created");
            Namespace::new(suppress)
        })
    }

    fn install(&self, ns: &mut Namespace, spec: Arc<AttributeSpec>) -> Accessor {
        self.inner.store.open(spec.id);
        let accessor = Accessor::new(Arc::clone(&spec), Arc::clone(&self.inner.store));
        debug!(
            namespace = %spec.namespace,
            attribute = %spec.name,
            kind = ?accessor.kind(),
            "Attribute declared"
        );
        ns.accessors.insert(spec.name.clone(), accessor.clone());
        ns.specs.push(spec);
        ns.state = NamespaceState::Active;
        accessor
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Constraint, DEFAULT_KEY};
    use crate::builder::NO_CLEANUP;
    use serde_json::json;

    #[test]
    fn register_installs_accessor() {
        let registry = Registry::default();
        let rank = registry
            .register("Foo", "rank", Constraints::new().default_value("private"))
            .unwrap();

        let looked_up = registry.accessor("Foo", "rank").unwrap();
        assert_eq!(looked_up.spec_id(), rank.spec_id());
        assert_eq!(registry.attributes("Foo"), vec!["rank".to_string()]);
    }

    #[test]
    fn invalid_name_creates_nothing() {
        let registry = Registry::default();
        let err = registry
            .register("Foo", "bad name", Constraints::new())
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidName(_)));
        assert_eq!(registry.stats().namespaces, 0);
    }

    #[test]
    fn failing_list_installs_nothing() {
        let registry = Registry::default();
        let err = registry
            .declare("Foo", ["name", "rank", "2bad"])
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidName(n) if n == "2bad"));
        assert!(registry.attributes("Foo").is_empty());
        assert!(registry.accessor("Foo", "name").is_none());
    }

    #[test]
    fn duplicate_names_rejected_by_default() {
        let registry = Registry::default();
        registry.declare("Foo", ["name"]).unwrap();

        let err = registry
            .register("Foo", "name", Constraints::new())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAttribute { .. }));

        let err = registry.declare("Bar", ["x", "x"]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateAttribute { attribute, .. } if attribute == "x"));
    }

    #[test]
    fn redeclare_allowed_keeps_last_accessor() {
        let registry = Registry::new(RegistryConfig {
            allow_redeclare: true,
            ..RegistryConfig::default()
        });
        let accessors = registry
            .declare(
                "Foo",
                vec![
                    Declaration::attribute("x", Constraints::new().default_value(1)),
                    Declaration::attribute("x", Constraints::new().default_value(2)),
                ],
            )
            .unwrap();

        let installed = registry.accessor("Foo", "x").unwrap();
        assert_eq!(installed.spec_id(), accessors[1].spec_id());
        assert_eq!(registry.attributes("Foo"), vec!["x".to_string(), "x".to_string()]);
        assert_eq!(installed.spec().default, Some(json!(2)));

        let a = registry.instantiate("Foo");
        accessors[0].set(&a, "shadowed").unwrap();
        accessors[1].set(&a, "visible").unwrap();
        assert_eq!(registry.stats().entries, 2);

        assert_eq!(registry.reset("Foo"), 2);
        assert_eq!(accessors[0].peek(&a), None);
        assert_eq!(accessors[1].peek(&a), None);
        assert_eq!(registry.stats().entries, 0);

        accessors[0].set(&a, "again").unwrap();
        assert_eq!(registry.reclaim("Foo"), 2);
        assert_eq!(registry.stats().entries, 0);
        assert_eq!(registry.stats().attributes, 0);
    }

    #[test]
    fn sentinel_suppresses_cleanup() {
        let registry = Registry::default();
        let accessors = registry.declare("Foo", [NO_CLEANUP, "name"]).unwrap();

        assert_eq!(accessors.len(), 1);
        assert!(!registry.cleanup_enabled("Foo"));
        assert!(registry.cleanup_enabled("Other"));
        assert_eq!(registry.attributes("Foo"), vec!["name".to_string()]);
    }

    #[test]
    fn auto_cleanup_off_by_config() {
        let registry = Registry::new(RegistryConfig {
            auto_cleanup: false,
            ..RegistryConfig::default()
        });
        registry.declare("Foo", ["name"]).unwrap();
        assert!(!registry.cleanup_enabled("Foo"));
    }

    #[test]
    fn constraints_from_options_flow_through() {
        let registry = Registry::default();
        let constraints = Constraints::from_options(
            "rank",
            [(DEFAULT_KEY.to_string(), Constraint::from(json!("private")))],
        )
        .unwrap();
        let rank = registry.register("Foo", "rank", constraints).unwrap();

        let a = registry.instantiate("Foo");
        assert_eq!(rank.get(&a), Some(json!("private")));
    }

    #[test]
    fn find_specs_known_namespace() {
        let registry = Registry::default();
        registry.declare("Foo", ["a", "b"]).unwrap();
        registry.declare("Bar", ["c"]).unwrap();

        let inst = registry.instantiate("Foo");
        let names: Vec<String> = registry
            .find_specs_for_instance(&inst)
            .iter()
            .map(|s| s.name.clone())
            .collect();
        assert_eq!(names, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn find_specs_falls_back_to_scan() {
        let registry = Registry::default();
        let accessors = registry.declare("Foo", ["a", "b"]).unwrap();

        let stranger = registry.instantiate("Unregistered");
        accessors[1].set(&stranger, 1).unwrap();

        let found = registry.find_specs_for_instance(&stranger);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "b");
    }

    #[test]
    fn strict_config_skips_scan() {
        let registry = Registry::new(RegistryConfig::strict());
        let accessors = registry.declare("Foo", ["a"]).unwrap();

        let stranger = registry.instantiate("Unregistered");
        accessors[0].set(&stranger, 1).unwrap();
        assert!(registry.find_specs_for_instance(&stranger).is_empty());
    }

    #[test]
    fn registries_are_independent() {
        let one = Registry::default();
        let two = Registry::default();
        one.declare("Foo", ["name"]).unwrap();

        assert!(two.accessor("Foo", "name").is_none());
        assert_eq!(two.stats(), StoreStats::default());
    }

    #[test]
    fn instances_of_different_registries_never_alias() {
        let one = Registry::default();
        let two = Registry::default();
        let name = two.register("Foo", "name", Constraints::new()).unwrap();

        let a = one.instantiate("Foo");
        let b = two.instantiate("Foo");
        assert_ne!(a.identity(), b.identity());

        name.set(&a, "from a").unwrap();
        assert_eq!(name.get(&b), None);
        name.set(&b, "from b").unwrap();
        assert_eq!(name.get(&a), Some(json!("from a")));
    }
}
