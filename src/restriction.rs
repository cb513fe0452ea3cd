//! Named predicate lists attached to a value slot.
//!
//! Predicates run in registration order; the first one returning `false`
//! determines the reported [`LayoutError::RestrictionViolation`].

use std::fmt;
use std::sync::Arc;

use crate::error::{LayoutError, Result};
use crate::value::Value;

/// A predicate over a candidate value.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
pub struct Restriction {
    field: String,
    rules: Vec<(String, Predicate)>,
}

impl Restriction {
    pub fn new(field: impl Into<String>) -> Self {
        Restriction {
            field: field.into(),
            rules: Vec::new(),
        }
    }

    /// Appends a named predicate.
    pub fn restrict<F>(&mut self, name: impl Into<String>, predicate: F) -> &mut Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.rules.push((name.into(), Arc::new(predicate)));
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Rule names in evaluation order.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        for (name, predicate) in &self.rules {
            if !predicate(value) {
                return Err(LayoutError::RestrictionViolation {
                    field: self.field.clone(),
                    value: value.clone(),
                    rule: name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Restriction")
            .field("field", &self.field)
            .field("rules", &self.rule_names().collect::<Vec<_>>())
            .finish()
    }
}
