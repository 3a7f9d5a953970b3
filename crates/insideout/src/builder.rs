//! Declaration lists and the fluent namespace builder

use crate::accessor::Accessor;
use crate::attribute::Constraints;
use crate::error::Result;
use crate::registry::Registry;

/// Reserved entry in a declaration list that switches off end-of-life
/// cleanup for the namespace instead of declaring an attribute.
pub const NO_CLEANUP: &str = "-nocleanup";

/// One entry of a declaration list.
#[derive(Debug, Clone)]
pub enum Declaration {
    Attribute { name: String, constraints: Constraints },
    NoCleanup,
}

impl Declaration {
    pub fn attribute(name: impl Into<String>, constraints: Constraints) -> Self {
        Self::Attribute {
            name: name.into(),
            constraints,
        }
    }
}

impl From<&str> for Declaration {
    fn from(entry: &str) -> Self {
        if entry == NO_CLEANUP {
            Self::NoCleanup
        } else {
            Self::attribute(entry, Constraints::new())
        }
    }
}

impl From<String> for Declaration {
    fn from(entry: String) -> Self {
        Self::from(entry.as_str())
    }
}

impl<S: Into<String>> From<(S, Constraints)> for Declaration {
    fn from((name, constraints): (S, Constraints)) -> Self {
        Self::attribute(name, constraints)
    }
}

/// Collects declarations for one namespace and registers them together.
///
/// ```
/// use insideout::{Constraints, Registry};
///
/// let registry = Registry::default();
/// let accessors = registry
///     .build("Foo")
///     .attr("name")
///     .attr_with("rank", Constraints::new().default_value("private"))
///     .finish()
///     .unwrap();
/// assert_eq!(accessors.len(), 2);
/// ```
#[must_use = "declarations are only registered by `finish`"]
pub struct NamespaceBuilder<'r> {
    registry: &'r Registry,
    namespace: String,
    declarations: Vec<Declaration>,
}

impl<'r> NamespaceBuilder<'r> {
    pub(crate) fn new(registry: &'r Registry, namespace: String) -> Self {
        Self {
            registry,
            namespace,
            declarations: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>) -> Self {
        self.declarations
            .push(Declaration::attribute(name, Constraints::new()));
        self
    }

    pub fn attr_with(mut self, name: impl Into<String>, constraints: Constraints) -> Self {
        self.declarations
            .push(Declaration::attribute(name, constraints));
        self
    }

    pub fn no_cleanup(mut self) -> Self {
        self.declarations.push(Declaration::NoCleanup);
        self
    }

    pub fn declaration(mut self, declaration: impl Into<Declaration>) -> Self {
        self.declarations.push(declaration.into());
        self
    }

    pub fn finish(self) -> Result<Vec<Accessor>> {
        self.registry.declare(&self.namespace, self.declarations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_parses_to_no_cleanup() {
        assert!(matches!(Declaration::from(NO_CLEANUP), Declaration::NoCleanup));
        assert!(matches!(
            Declaration::from("rank"),
            Declaration::Attribute { ref name, .. } if name == "rank"
        ));
    }

    #[test]
    fn builder_registers_in_order() {
        let registry = Registry::default();
        let accessors = registry
            .build("Foo")
            .attr("name")
            .declaration(("rank", Constraints::new().default_value("private")))
            .no_cleanup()
            .finish()
            .unwrap();

        let names: Vec<&str> = accessors.iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["name", "rank"]);
        assert!(!registry.cleanup_enabled("Foo"));
    }

    #[test]
    fn builder_surfaces_registration_errors() {
        let registry = Registry::default();
        let result = registry.build("Foo").attr("ok").attr("not ok").finish();
        assert!(result.is_err());
        assert!(registry.attributes("Foo").is_empty());
    }
}
