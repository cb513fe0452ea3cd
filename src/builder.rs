//! Fluent assembly of [`StructField`] layouts.
//!
//! ```
//! use rawlayout::builder::StructBuilder;
//! use rawlayout::types::UINT8_T;
//!
//! let flags = StructBuilder::new()
//!     .add_bit_field("enable", UINT8_T, 2)
//!     .add_bit_field("type", UINT8_T, 2)
//!     .add_bit_field("masked", UINT8_T, 1)
//!     .add_bit_field("unused", UINT8_T, 3)
//!     .build("flags", "")
//!     .unwrap();
//! assert_eq!(flags.byte_size(), 1);
//! ```
//!
//! Members are keyed by name in insertion order. Adding a member under a name that
//! is already present replaces it in place. Every struct passed in is copied, so the
//! builder never aliases (or mutates) a previously built layout.

use tracing::{debug, trace};

use crate::error::Result;
use crate::field::{element_bytes, strip_declarator, ArrayField, Field, PointerField, ScalarField, StructField, TypeRef};
use crate::value::Value;

#[derive(Debug, Clone, Default)]
pub struct StructBuilder {
    fields: Vec<(String, Field)>,
}

impl StructBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, key: String, field: Field) -> &mut Self {
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => {
                trace!("redefining member '{}'", key);
                slot.1 = field;
            }
            None => {
                trace!("adding member '{}' ({} byte(s))", key, field.byte_size());
                self.fields.push((key, field));
            }
        }
        self
    }

    /// Scalar member; `width > 0` makes it a bit-field.
    pub fn add_scalar(
        &mut self,
        name: &str,
        ty: impl Into<TypeRef>,
        width: u32,
        default: Option<Value>,
    ) -> &mut Self {
        self.insert(name.to_string(), ScalarField::new(name, ty, width, default).into())
    }

    /// `type name;`
    pub fn add_field(&mut self, name: &str, ty: impl Into<TypeRef>) -> &mut Self {
        self.add_scalar(name, ty, 0, None)
    }

    /// `type name:width;`
    pub fn add_bit_field(&mut self, name: &str, ty: impl Into<TypeRef>, width: u32) -> &mut Self {
        self.add_scalar(name, ty, width, None)
    }

    /// `type name;` with a default value for [`Editable`](crate::editable::Editable) slots.
    pub fn add_field_with_default(
        &mut self,
        name: &str,
        ty: impl Into<TypeRef>,
        default: impl Into<Value>,
    ) -> &mut Self {
        self.add_scalar(name, ty, 0, Some(default.into()))
    }

    /// `type name[l0][l1]...;`, or `type name[];` when `dimension` is 0.
    pub fn add_array(
        &mut self,
        name: &str,
        ty: impl Into<TypeRef>,
        dimension: usize,
        lengths: &[usize],
    ) -> Result<&mut Self> {
        let array = ArrayField::new(name, ty, dimension, lengths)?;
        Ok(self.insert(name.to_string(), array.into()))
    }

    /// `type *name;`
    pub fn add_pointer_field(&mut self, name: &str, ty: impl Into<TypeRef>) -> &mut Self {
        self.insert(name.to_string(), PointerField::of_type(name, ty).into())
    }

    /// Pointer to a copy of `field` (a pointer field yields a pointer-to-pointer).
    pub fn add_pointer_to(&mut self, field: impl Into<Field>) -> &mut Self {
        let field = field.into();
        let key = field.key().to_string();
        self.insert(key, PointerField::new(field).into())
    }

    /// `type *(name)[l0]...;`: always pointer-sized.
    pub fn add_pointer_of_array(
        &mut self,
        name: &str,
        ty: impl Into<TypeRef>,
        dimension: usize,
        lengths: &[usize],
    ) -> Result<&mut Self> {
        let array = ArrayField::new(name, ty, dimension, lengths)?;
        Ok(self.insert(name.to_string(), PointerField::new(array).into()))
    }

    /// `type *name[l0]...;`: `8 × ∏ lengths` bytes whatever the pointee. Keyed by
    /// the undecorated name, like every other pointer member.
    pub fn add_array_of_pointers(
        &mut self,
        pointer: &PointerField,
        dimension: usize,
        lengths: &[usize],
    ) -> Result<&mut Self> {
        let array = ArrayField::of_pointer(pointer, dimension, lengths)?;
        Ok(self.insert(strip_declarator(pointer.name()).to_string(), array.into()))
    }

    /// Embeds a copy of `layout` by value. With `show_name == false` the copy renders
    /// as an anonymous struct; `declared_name` (possibly empty) names the member variable.
    pub fn add_struct(&mut self, layout: &StructField, show_name: bool, declared_name: &str) -> &mut Self {
        let embedded = layout.embed(show_name, declared_name);
        self.insert(layout.tag().to_string(), embedded.into())
    }

    /// `struct tag name;`: sized like the referenced struct.
    pub fn add_struct_field(&mut self, name: &str, layout: &StructField) -> &mut Self {
        let field = ScalarField::new(name, struct_type(layout), 0, None).with_size(layout.byte_size());
        self.insert(name.to_string(), field.into())
    }

    /// `struct tag name[l0]...;`: `struct size × ∏ lengths`, or pointer-sized when flexible.
    pub fn add_struct_array(
        &mut self,
        name: &str,
        layout: &StructField,
        dimension: usize,
        lengths: &[usize],
    ) -> Result<&mut Self> {
        let array = ArrayField::new(name, struct_type(layout), dimension, lengths)?;
        let size = element_bytes(layout.byte_size(), dimension, lengths)?;
        Ok(self.insert(name.to_string(), array.with_size(size).into()))
    }

    /// `struct tag *name;`
    pub fn add_pointer_struct_field(&mut self, name: &str, layout: &StructField) -> &mut Self {
        self.insert(name.to_string(), PointerField::of_type(name, struct_type(layout)).into())
    }

    /// Opaque member whose layout is supplied elsewhere; size unknown (0).
    pub fn add_custom(&mut self, name: &str, custom_type: &str) -> &mut Self {
        self.add_field(name, TypeRef::Custom(custom_type.to_string()))
    }

    /// Removes the member registered under `name`; no-op when absent.
    pub fn remove_field(&mut self, name: &str) -> &mut Self {
        self.fields.retain(|(k, _)| k != name);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Snapshots the current members into a new struct. The builder stays usable.
    ///
    /// Fails with [`LayoutError::SizeOverflow`](crate::error::LayoutError::SizeOverflow)
    /// when the members add up to more than `usize::MAX` bytes.
    pub fn build(&self, name: &str, declared_name: &str) -> Result<StructField> {
        let fields: Vec<Field> = self.fields.iter().map(|(_, f)| f.clone()).collect();
        let layout = StructField::new(name, fields, declared_name)?;
        debug!(
            "built struct '{}' ({} member(s), {} byte(s))",
            name,
            layout.fields().len(),
            layout.byte_size()
        );
        Ok(layout)
    }
}

fn struct_type(layout: &StructField) -> TypeRef {
    TypeRef::Custom(format!("struct {}", layout.tag()))
}
