//! Schema-bound value container.
//!
//! An [`Editable`] walks a [`StructField`] once and materializes one slot per member:
//! a current [`Value`] plus the [`Restriction`] guarding it. Nested structs become
//! nested containers. Writes go through [`Editable::set`], which runs every predicate
//! of the slot before committing; a rejected write leaves the slot untouched.
//!
//! ## Synthesized slots
//!
//! | Member | Initial value | Rules |
//! |--------|---------------|-------|
//! | `char c` | `"\0"` | `field_type` (text), `field_size` (== 1) |
//! | `bool b` | `false` | `field_type` |
//! | numeric scalar | default or `0` / `0.0` | `field_type`, `field_value` (catalog range) |
//! | numeric bit-field | as above | plus `field_width` (fits in the declared bits) |
//! | `T a[]`, `T *p` | empty list (empty text for `char`) | `field_type` on elements |
//! | `char s[n]` | `n - 1` NULs | `field_type`, `field_size` (== n - 1) |
//! | `T a[n]` | `n` element defaults | `field_type` on elements, `field_size` (== n) |
//! | `T a[n][m]...` | nested lists | `field_type` (list), `field_size` (== n, outermost only) |
//! | `T *(p)[n]...` | as the pointed-to array | as the pointed-to array |
//! | `struct {...} s` | nested [`Editable`] | delegated to the nested container |
//!
//! Custom (non-catalog) types start at `0` (scalars) or `0` elements and carry no
//! type rules. Pointer members are keyed by their undecorated name (`*name` -> `name`).

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{LayoutError, Result};
use crate::field::{ArrayField, Field, ScalarField, StructField, TypeRef};
use crate::restriction::Restriction;
use crate::types::{Bounds, NativeKind};
use crate::value::Value;

#[derive(Debug, Clone)]
struct Slot {
    name: String,
    value: Value,
    /// `None` for nested containers, which validate themselves.
    restriction: Option<Restriction>,
}

/// Named, validated values bound to a struct layout.
#[derive(Debug, Clone)]
pub struct Editable {
    name: String,
    slots: Vec<Slot>,
    index: HashMap<String, usize>,
}

impl PartialEq for Editable {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.slots.len() == other.slots.len()
            && self
                .slots
                .iter()
                .zip(&other.slots)
                .all(|(a, b)| a.name == b.name && a.value == b.value)
    }
}

impl Editable {
    pub fn from_struct(layout: &StructField) -> Self {
        let mut editable = Editable {
            name: layout.tag().to_string(),
            slots: Vec::with_capacity(layout.fields().len()),
            index: HashMap::new(),
        };
        for field in layout.fields() {
            editable.register(field);
        }
        debug!("bound container to struct '{}' ({} slot(s))", editable.name, editable.slots.len());
        editable
    }

    fn register(&mut self, field: &Field) {
        let key = field.key().to_string();
        let (value, restriction) = match field {
            Field::Struct(s) => (Value::Struct(Editable::from_struct(s)), None),
            Field::Scalar(s) => {
                let (value, restriction) = scalar_slot(&key, s);
                (value, Some(restriction))
            }
            Field::Array(a) => {
                let (value, restriction) = array_slot(&key, a);
                (value, Some(restriction))
            }
            Field::Pointer(p) => {
                let (value, restriction) = match p.target() {
                    Field::Array(a) => array_slot(&key, a),
                    target => flexible_slot(&key, target.type_ref()),
                };
                (value, Some(restriction))
            }
        };
        self.insert(Slot {
            name: key,
            value,
            restriction,
        });
    }

    fn insert(&mut self, slot: Slot) {
        match self.index.get(&slot.name) {
            Some(&i) => self.slots[i] = slot,
            None => {
                self.index.insert(slot.name.clone(), self.slots.len());
                self.slots.push(slot);
            }
        }
    }

    fn slot(&self, name: &str) -> Result<&Slot> {
        self.index
            .get(name)
            .map(|&i| &self.slots[i])
            .ok_or_else(|| LayoutError::UnknownAttribute(format!("'{}' has no attribute {}", self.name, name)))
    }

    fn slot_mut(&mut self, name: &str) -> Result<&mut Slot> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.slots[i]),
            None => Err(LayoutError::UnknownAttribute(format!(
                "'{}' has no attribute {}",
                self.name, name
            ))),
        }
    }

    /// Tag of the layout this container is bound to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, name: &str) -> Result<&Value> {
        self.slot(name).map(|s| &s.value)
    }

    /// Nested container for an embedded struct member.
    pub fn get_struct(&self, name: &str) -> Result<&Editable> {
        match &self.slot(name)?.value {
            Value::Struct(e) => Ok(e),
            _ => Err(LayoutError::UnknownAttribute(format!(
                "'{}' has no struct attribute {}",
                self.name, name
            ))),
        }
    }

    /// Mutable nested container; writes through it are validated by the nested container.
    pub fn get_struct_mut(&mut self, name: &str) -> Result<&mut Editable> {
        let container = self.name.clone();
        match &mut self.slot_mut(name)?.value {
            Value::Struct(e) => Ok(e),
            _ => Err(LayoutError::UnknownAttribute(format!(
                "'{}' has no struct attribute {}",
                container, name
            ))),
        }
    }

    /// Validates `value` against the slot's rules, then commits it. On failure the
    /// stored value is unchanged.
    ///
    /// A nested struct slot takes a [`Value::Struct`] with the same members. Each of
    /// its values is checked against this container's nested rules and only the
    /// values are adopted; the nested container keeps its own layout and rules.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let slot = self.slot_mut(name)?;
        let checked = match &slot.restriction {
            Some(restriction) => restriction.validate(&value),
            None => check_nested(&slot.name, &slot.value, &value),
        };
        if let Err(e) = checked {
            debug!("rejected write: {}", e);
            return Err(e);
        }
        trace!("{} = {}", slot.name, value);
        match (&mut slot.value, value) {
            (Value::Struct(current), Value::Struct(incoming)) => current.adopt_values(incoming),
            (stored, value) => *stored = value,
        }
        Ok(())
    }

    /// Checks every value of `candidate` against the matching slot of `self`.
    fn check_values(&self, candidate: &Editable) -> Result<()> {
        for (slot, incoming) in self.slots.iter().zip(&candidate.slots) {
            match &slot.restriction {
                Some(restriction) => restriction.validate(&incoming.value)?,
                None => check_nested(&slot.name, &slot.value, &incoming.value)?,
            }
        }
        Ok(())
    }

    /// Copies values slot by slot; restrictions and names stay as they are.
    fn adopt_values(&mut self, incoming: Editable) {
        for (slot, other) in self.slots.iter_mut().zip(incoming.slots) {
            match (&mut slot.value, other.value) {
                (Value::Struct(current), Value::Struct(nested)) => current.adopt_values(nested),
                (stored, value) => *stored = value,
            }
        }
    }

    /// Appends a named predicate to a member's rules. No-op when the member is
    /// absent or is a nested struct.
    pub fn add_restriction<F>(&mut self, name: &str, rule: &str, predicate: F) -> &mut Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        if let Some(&i) = self.index.get(name) {
            if let Some(restriction) = self.slots[i].restriction.as_mut() {
                restriction.restrict(rule, predicate);
            }
        }
        self
    }

    pub fn restriction(&self, name: &str) -> Option<&Restriction> {
        self.index
            .get(name)
            .and_then(|&i| self.slots[i].restriction.as_ref())
    }

    /// Re-checks every stored value, recursing into nested containers.
    pub fn validate_all(&self) -> Result<()> {
        for slot in &self.slots {
            match (&slot.restriction, &slot.value) {
                (Some(restriction), value) => restriction.validate(value)?,
                (None, Value::Struct(nested)) => nested.validate_all()?,
                (None, _) => {}
            }
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Member names in layout order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slots.iter().map(|s| s.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.slots.iter().map(|s| (s.name.as_str(), &s.value))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// A replacement for a nested container must have the same members, and each of its
/// values must pass the current container's rules for that member.
fn check_nested(field: &str, current: &Value, candidate: &Value) -> Result<()> {
    let violation = |rule: &str| LayoutError::RestrictionViolation {
        field: field.to_string(),
        value: candidate.clone(),
        rule: rule.to_string(),
    };
    let (Value::Struct(current), Value::Struct(candidate)) = (current, candidate) else {
        return Err(violation("field_type"));
    };
    if !current.names().eq(candidate.names()) {
        return Err(violation("struct_layout"));
    }
    current.check_values(candidate)
}

fn type_rule(restriction: &mut Restriction, kind: NativeKind) {
    restriction.restrict("field_type", move |v| v.is_kind(kind));
}

fn elements_rule(restriction: &mut Restriction, kind: NativeKind) {
    restriction.restrict("field_type", move |v| {
        v.as_list()
            .is_some_and(|items| items.iter().all(|item| item.is_kind(kind)))
    });
}

fn size_rule(restriction: &mut Restriction, len: usize) {
    restriction.restrict("field_size", move |v| v.len() == Some(len));
}

/// Range of a `width`-bit field of a type with `bounds` (signed when the type's min is negative).
fn width_bounds(bounds: Bounds, width: u32) -> Option<(i128, i128)> {
    let Bounds::Int { min, .. } = bounds else {
        return None;
    };
    if width == 0 || width >= 127 {
        return None;
    }
    if min < 0 {
        let half = 1i128 << (width - 1);
        Some((-half, half - 1))
    } else {
        Some((0, (1i128 << width) - 1))
    }
}

fn scalar_slot(key: &str, field: &ScalarField) -> (Value, Restriction) {
    let mut restriction = Restriction::new(key);
    let mut value = Value::Int(0);
    if let Some(t) = field.type_ref().field_type() {
        let kind = t.kind();
        value = kind.zero();
        type_rule(&mut restriction, kind);
        match kind {
            NativeKind::Text => size_rule(&mut restriction, 1),
            NativeKind::Boolean => {}
            NativeKind::Integer | NativeKind::Real => {
                let bounds = t.bounds();
                restriction.restrict("field_value", move |v| bounds.contains(v));
                if let Some((lo, hi)) = width_bounds(bounds, field.width()) {
                    restriction.restrict("field_width", move |v| {
                        v.as_i128().is_some_and(|x| lo <= x && x <= hi)
                    });
                }
            }
        }
    }
    if let Some(default) = field.default() {
        value = default.clone();
    }
    (value, restriction)
}

fn element_default(ty: &TypeRef) -> Value {
    match ty.field_type() {
        Some(t) => t.kind().zero(),
        None => Value::Int(0),
    }
}

/// Unbounded sequence: flexible arrays and pointers to scalars.
fn flexible_slot(key: &str, ty: Option<&TypeRef>) -> (Value, Restriction) {
    let mut restriction = Restriction::new(key);
    match ty.and_then(TypeRef::field_type).map(|t| t.kind()) {
        Some(NativeKind::Text) => {
            type_rule(&mut restriction, NativeKind::Text);
            (Value::Text(String::new()), restriction)
        }
        Some(kind) => {
            elements_rule(&mut restriction, kind);
            (Value::List(Vec::new()), restriction)
        }
        None => (Value::List(Vec::new()), restriction),
    }
}

fn array_slot(key: &str, field: &ArrayField) -> (Value, Restriction) {
    let lengths = field.lengths();
    let kind = field.type_ref().field_type().map(|t| t.kind());
    match lengths {
        [] => flexible_slot(key, Some(field.type_ref())),
        [len] => {
            let mut restriction = Restriction::new(key);
            match kind {
                Some(NativeKind::Text) => {
                    // One slot is reserved for the terminator.
                    let chars = len.saturating_sub(1);
                    type_rule(&mut restriction, NativeKind::Text);
                    size_rule(&mut restriction, chars);
                    (Value::Text("\0".repeat(chars)), restriction)
                }
                _ => {
                    if let Some(kind) = kind {
                        elements_rule(&mut restriction, kind);
                    }
                    size_rule(&mut restriction, *len);
                    let element = element_default(field.type_ref());
                    (Value::List(vec![element; *len]), restriction)
                }
            }
        }
        [outer, ..] => {
            let mut restriction = Restriction::new(key);
            restriction.restrict("field_type", |v| v.as_list().is_some());
            size_rule(&mut restriction, *outer);
            let value = match kind {
                Some(NativeKind::Text) => {
                    // Innermost dimension holds the characters of each string.
                    let (leading, inner) = lengths.split_at(lengths.len() - 1);
                    nested_list(leading, Value::Text("\0".repeat(inner[0].saturating_sub(1))))
                }
                _ => nested_list(lengths, element_default(field.type_ref())),
            };
            (value, restriction)
        }
    }
}

/// `lengths[0]` lists of `lengths[1]` lists ... of `leaf`.
fn nested_list(lengths: &[usize], leaf: Value) -> Value {
    match lengths.split_first() {
        None => leaf,
        Some((len, rest)) => Value::List(vec![nested_list(rest, leaf); *len]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::StructBuilder;
    use crate::types::{DOUBLE, INT32_T, INT8_T, UINT8_T};

    #[test]
    fn nested_list_shape() {
        let v = nested_list(&[2, 3], Value::Int(0));
        let outer = v.as_list().unwrap();
        assert_eq!(outer.len(), 2);
        assert_eq!(outer[0].as_list().unwrap().len(), 3);
    }

    #[test]
    fn width_bounds_signedness() {
        assert_eq!(width_bounds(UINT8_T.bounds(), 3), Some((0, 7)));
        assert_eq!(width_bounds(INT8_T.bounds(), 3), Some((-4, 3)));
        assert_eq!(width_bounds(UINT8_T.bounds(), 0), None);
    }

    #[test]
    fn bit_field_width_is_enforced() {
        let layout = StructBuilder::new().add_bit_field("mode", UINT8_T, 2).build("s", "").unwrap();
        let mut e = Editable::from_struct(&layout);
        assert!(e.set("mode", 3).is_ok());
        let err = e.set("mode", 4).unwrap_err();
        assert_eq!(err.rule(), Some("field_width"));
        assert_eq!(e.get("mode").unwrap(), &Value::Int(3));
    }

    #[test]
    fn nested_replacement_must_match_layout() {
        let inner = StructBuilder::new().add_field("x", UINT8_T).build("inner", "").unwrap();
        let other = StructBuilder::new().add_field("y", UINT8_T).build("other", "").unwrap();
        let outer = StructBuilder::new().add_struct(&inner, true, "pos").build("outer", "").unwrap();
        let mut e = Editable::from_struct(&outer);

        let err = e.set("pos", Editable::from_struct(&other)).unwrap_err();
        assert_eq!(err.rule(), Some("struct_layout"));
        assert_eq!(e.set("pos", 5).unwrap_err().rule(), Some("field_type"));

        let mut replacement = Editable::from_struct(&inner);
        replacement.set("x", 9).unwrap();
        e.set("pos", replacement).unwrap();
        assert_eq!(e.get_struct("pos").unwrap().get("x").unwrap(), &Value::Int(9));
    }

    #[test]
    fn nested_replacement_keeps_the_bound_rules() {
        let inner = StructBuilder::new().add_field("x", UINT8_T).build("inner", "").unwrap();
        let lookalike = StructBuilder::new().add_field("x", DOUBLE).build("lookalike", "").unwrap();
        let wide = StructBuilder::new().add_field("x", INT32_T).build("wide", "").unwrap();
        let outer = StructBuilder::new().add_struct(&inner, true, "pos").build("outer", "").unwrap();
        let mut e = Editable::from_struct(&outer);
        e.add_restriction("pos", "unused", |_| false);

        let mut real = Editable::from_struct(&lookalike);
        real.set("x", 1.5).unwrap();
        assert_eq!(e.set("pos", real).unwrap_err().rule(), Some("field_type"));

        let mut big = Editable::from_struct(&wide);
        big.set("x", 300).unwrap();
        assert_eq!(e.set("pos", big).unwrap_err().rule(), Some("field_value"));
        assert_eq!(e.get_struct("pos").unwrap().get("x").unwrap(), &Value::Int(0));

        let mut fits = Editable::from_struct(&wide);
        fits.set("x", 7).unwrap();
        e.set("pos", fits).unwrap();
        let nested = e.get_struct_mut("pos").unwrap();
        assert_eq!(nested.name(), "inner");
        assert_eq!(nested.get("x").unwrap(), &Value::Int(7));
        assert_eq!(nested.set("x", 1.5).unwrap_err().rule(), Some("field_type"));
        assert_eq!(nested.set("x", 256).unwrap_err().rule(), Some("field_value"));
    }

    #[test]
    fn nested_replacement_keeps_added_rules() {
        let inner = StructBuilder::new().add_field("x", UINT8_T).build("inner", "").unwrap();
        let outer = StructBuilder::new().add_struct(&inner, true, "pos").build("outer", "").unwrap();
        let mut e = Editable::from_struct(&outer);
        e.get_struct_mut("pos")
            .unwrap()
            .add_restriction("x", "even", |v| v.as_i128().is_some_and(|x| x % 2 == 0));

        let mut odd = Editable::from_struct(&inner);
        odd.set("x", 3).unwrap();
        assert_eq!(e.set("pos", odd).unwrap_err().rule(), Some("even"));
        let rules: Vec<&str> = e
            .get_struct("pos")
            .unwrap()
            .restriction("x")
            .unwrap()
            .rule_names()
            .collect();
        assert_eq!(rules, vec!["field_type", "field_value", "even"]);
    }
}
