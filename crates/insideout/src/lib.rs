//! insideout - Identity-keyed attribute storage
//!
//! Objects acquire named attributes without carrying storage of their own.
//! Values live in a side table keyed by the object's identity token and
//! scoped to an owning namespace:
//!
//! - **Registry**: per-namespace catalog of declared attributes, builder and
//!   declaration-list API
//! - **Accessor**: get/set capability generated for each attribute, with lazy
//!   defaults and caller-supplied validation
//! - **IdentityStore**: the side table itself, `attribute -> token -> value`
//! - **Lifecycle**: destroy, reset, reclaim, namespace listing and dumps
//!
//! ## Leaks and identity reuse
//!
//! The store never owns the objects it describes. [`Instance`] runs cleanup
//! exactly once when dropped, and tokens are generational, so a recycled
//! identity never aliases the leftovers of a dead instance.
//!
//! ```
//! use insideout::{Constraints, Registry};
//! use serde_json::json;
//!
//! let registry = Registry::default();
//! let rank = registry
//!     .register("Foo", "rank", Constraints::new().default_value("private"))
//!     .unwrap();
//!
//! let a = registry.instantiate("Foo");
//! assert_eq!(rank.get(&a), Some(json!("private")));
//! rank.set(&a, "corporal").unwrap();
//! assert_eq!(rank.get(&a), Some(json!("corporal")));
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod accessor;
pub mod attribute;
pub mod builder;
pub mod config;
pub mod error;
pub mod identity;
pub mod instance;
pub mod lifecycle;
pub mod registry;
pub mod store;

// Re-exports
pub use accessor::{Accessed, Accessor, AccessorKind};
pub use attribute::{
    is_identifier, AttributeSpec, Constraint, Constraints, SpecId, Validator, DEFAULT_KEY,
    VALIDATOR_KEY,
};
pub use builder::{Declaration, NamespaceBuilder, NO_CLEANUP};
pub use config::RegistryConfig;
pub use error::{AccessError, ConfigError, RegistryError, Result, ValidationError};
pub use identity::{IdentityToken, Identified, TokenAllocator};
pub use instance::Instance;
pub use lifecycle::{InstanceKey, NamespaceState};
pub use registry::{Registry, StoreStats};
pub use serde_json::Value;
pub use store::IdentityStore;
