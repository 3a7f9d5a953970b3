//! Attribute specifications and their constraints

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RegistryError, Result, ValidationError};
use crate::identity::Identified;

/// Constraint key carrying the default value.
pub const DEFAULT_KEY: &str = "default";

/// Constraint key carrying the validator.
pub const VALIDATOR_KEY: &str = "validator";

/// Unique identifier for a declared attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SpecId(pub uuid::Uuid);

impl SpecId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SpecId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SpecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spec:{}", self.0)
    }
}

/// Caller-supplied check run before every set.
pub type Validator =
    Arc<dyn Fn(&dyn Identified, &Value) -> std::result::Result<(), ValidationError> + Send + Sync>;

/// A declared attribute: name, optional default, optional validator.
pub struct AttributeSpec {
    pub id: SpecId,
    pub namespace: String,
    pub name: String,
    pub default: Option<Value>,
    pub validator: Option<Validator>,
}

impl AttributeSpec {
    pub(crate) fn new(namespace: &str, name: &str, constraints: Constraints) -> Result<Self> {
        if !is_identifier(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        Ok(Self {
            id: SpecId::new(),
            namespace: namespace.to_string(),
            name: name.to_string(),
            default: constraints.default,
            validator: constraints.validator,
        })
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }
}

impl fmt::Debug for AttributeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeSpec")
            .field("id", &self.id)
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .field("default", &self.default)
            .field("validator", &self.validator.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Options accepted when declaring an attribute.
#[derive(Clone, Default)]
pub struct Constraints {
    default: Option<Value>,
    validator: Option<Validator>,
}

impl Constraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn validator<F>(mut self, f: F) -> Self
    where
        F: Fn(&dyn Identified, &Value) -> std::result::Result<(), ValidationError>
            + Send
            + Sync
            + 'static,
    {
        self.validator = Some(Arc::new(f));
        self
    }

    /// Build constraints from a keyed option list.
    ///
    /// Only [`DEFAULT_KEY`] and [`VALIDATOR_KEY`] are recognised. Every other
    /// key is reported at once, sorted.
    pub fn from_options(
        attribute: &str,
        options: impl IntoIterator<Item = (String, Constraint)>,
    ) -> Result<Self> {
        let options: BTreeMap<String, Constraint> = options.into_iter().collect();

        let unknown: Vec<String> = options
            .keys()
            .filter(|k| k.as_str() != DEFAULT_KEY && k.as_str() != VALIDATOR_KEY)
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(RegistryError::UnknownConstraint {
                attribute: attribute.to_string(),
                keys: unknown,
            });
        }

        let mut constraints = Self::new();
        for (key, option) in options {
            match option {
                Constraint::Value(v) if key == DEFAULT_KEY => constraints.default = Some(v),
                Constraint::Validator(f) if key == VALIDATOR_KEY => {
                    constraints.validator = Some(f)
                }
                _ => {
                    let expected = if key == DEFAULT_KEY { "value" } else { "validator" };
                    return Err(RegistryError::MisplacedConstraint {
                        attribute: attribute.to_string(),
                        key,
                        expected,
                    });
                }
            }
        }
        Ok(constraints)
    }
}

impl fmt::Debug for Constraints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraints")
            .field("default", &self.default)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// A single keyed option for [`Constraints::from_options`].
#[derive(Clone)]
pub enum Constraint {
    Value(Value),
    Validator(Validator),
}

impl Constraint {
    pub fn validator<F>(f: F) -> Self
    where
        F: Fn(&dyn Identified, &Value) -> std::result::Result<(), ValidationError>
            + Send
            + Sync
            + 'static,
    {
        Self::Validator(Arc::new(f))
    }
}

impl From<Value> for Constraint {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

/// Leading letter or underscore, then word characters.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}
