//! Field model: the members of a C-compatible layout.
//!
//! A [`Field`] is one of four variants, each computing its own byte size, bit size
//! and canonical C-like rendering:
//!
//! | Variant | Byte size | Renders as |
//! |---------|-----------|------------|
//! | [`ScalarField`] | type size, or 0 for a bit-field | `uint8_t a;` / `uint8_t a:3;` |
//! | [`ArrayField`] | element size × ∏ lengths, 8 when flexible | `uint64_t m[10][20];` / `char s[];` |
//! | [`PointerField`] | always [`POINTER_SIZE`] | `char *name;` / `uint64_t *(m)[10];` |
//! | [`StructField`] | Σ member bytes + ⌈Σ member bits / 8⌉ | `struct tag { ... } var;` |
//!
//! Fields are plain values: copying a field into a pointer or a parent struct never
//! aliases the source field.

use crate::error::{LayoutError, Result};
use crate::types::{Catalog, FieldType};
use crate::value::Value;

/// Width of every pointer, in bytes.
pub const POINTER_SIZE: usize = 8;

/// Declared type of a scalar/array member: a catalog entry or an opaque name.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Known(FieldType),
    Custom(String),
}

impl TypeRef {
    /// Resolves `name` against `catalog`, falling back to a custom type.
    pub fn resolve(name: &str, catalog: &Catalog) -> Self {
        match catalog.lookup(name) {
            Some(t) => TypeRef::Known(t.clone()),
            None => TypeRef::Custom(name.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TypeRef::Known(t) => t.name(),
            TypeRef::Custom(s) => s,
        }
    }

    pub fn field_type(&self) -> Option<&FieldType> {
        match self {
            TypeRef::Known(t) => Some(t),
            TypeRef::Custom(_) => None,
        }
    }

    /// Size in bytes; 0 (unknown) for custom types.
    pub fn size(&self) -> usize {
        self.field_type().map(FieldType::size).unwrap_or(0)
    }
}

impl From<FieldType> for TypeRef {
    fn from(t: FieldType) -> Self {
        TypeRef::Known(t)
    }
}

impl From<&FieldType> for TypeRef {
    fn from(t: &FieldType) -> Self {
        TypeRef::Known(t.clone())
    }
}

/// A plain string is always an opaque type; use [`TypeRef::resolve`] for catalog names.
impl From<&str> for TypeRef {
    fn from(s: &str) -> Self {
        TypeRef::Custom(s.to_string())
    }
}

impl From<String> for TypeRef {
    fn from(s: String) -> Self {
        TypeRef::Custom(s)
    }
}

/// One declared member of a layout.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Scalar(ScalarField),
    Array(ArrayField),
    Pointer(PointerField),
    Struct(StructField),
}

impl Field {
    /// Display name (pointers carry their `*` prefix, anonymous structs may be empty).
    pub fn name(&self) -> &str {
        match self {
            Field::Scalar(f) => &f.name,
            Field::Array(f) => &f.name,
            Field::Pointer(f) => f.name(),
            Field::Struct(f) => f.key(),
        }
    }

    /// Name under which the field's value lives in an [`Editable`](crate::editable::Editable):
    /// the display name without pointer decoration.
    pub fn key(&self) -> &str {
        strip_declarator(self.name())
    }

    pub fn byte_size(&self) -> usize {
        match self {
            Field::Scalar(f) => f.size,
            Field::Array(f) => f.size,
            Field::Pointer(_) => POINTER_SIZE,
            Field::Struct(f) => f.size,
        }
    }

    /// Bits contributed to the enclosing struct's trailing bit run; 0 unless a bit-field.
    pub fn bit_size(&self) -> usize {
        match self {
            Field::Scalar(f) => f.width as usize,
            Field::Array(_) | Field::Pointer(_) | Field::Struct(_) => 0,
        }
    }

    /// Declared element type; `None` for structs.
    pub fn type_ref(&self) -> Option<&TypeRef> {
        match self {
            Field::Scalar(f) => Some(&f.ty),
            Field::Array(f) => Some(&f.ty),
            Field::Pointer(f) => f.target.type_ref(),
            Field::Struct(_) => None,
        }
    }

    pub fn render(&self, level: usize) -> String {
        match self {
            Field::Scalar(f) => f.render(level),
            Field::Array(f) => f.render(level),
            Field::Pointer(f) => f.render(level),
            Field::Struct(f) => f.render(level),
        }
    }

    /// Renames the innermost declarator (pointers rename what they point to).
    pub(crate) fn set_name(&mut self, name: String) {
        match self {
            Field::Scalar(f) => f.name = name,
            Field::Array(f) => f.name = name,
            Field::Pointer(f) => f.target.set_name(name),
            Field::Struct(f) => f.declared_name = name,
        }
    }
}

impl From<ScalarField> for Field {
    fn from(f: ScalarField) -> Self {
        Field::Scalar(f)
    }
}

impl From<ArrayField> for Field {
    fn from(f: ArrayField) -> Self {
        Field::Array(f)
    }
}

impl From<PointerField> for Field {
    fn from(f: PointerField) -> Self {
        Field::Pointer(f)
    }
}

impl From<StructField> for Field {
    fn from(f: StructField) -> Self {
        Field::Struct(f)
    }
}

/// Strips pointer decoration: `**(name)` -> `name`.
pub(crate) fn strip_declarator(name: &str) -> &str {
    name.trim_start_matches(['*', '('])
        .trim_end_matches(')')
}

fn indent(level: usize) -> String {
    "\t".repeat(level)
}

/// Whole-value or bit-field member: `type name[:width];`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    name: String,
    ty: TypeRef,
    width: u32,
    default: Option<Value>,
    size: usize,
}

impl ScalarField {
    /// `width == 0` declares a whole-value field consuming the type's bytes;
    /// `width > 0` declares a bit-field consuming no bytes of its own.
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>, width: u32, default: Option<Value>) -> Self {
        let ty = ty.into();
        let size = if width == 0 { ty.size() } else { 0 };
        ScalarField {
            name: name.into(),
            ty,
            width,
            default,
            size,
        }
    }

    /// Overrides the byte size (members whose type is another struct).
    pub(crate) fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub(crate) fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    /// Bit width; 0 for a whole-value field.
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn render(&self, level: usize) -> String {
        let mut out = format!("{}{} {}", indent(level), self.ty.name(), self.name);
        if self.width > 0 {
            out.push_str(&format!(":{}", self.width));
        }
        out.push(';');
        if let Some(default) = &self.default {
            out.push_str(&format!(" // default: {}", default));
        }
        out
    }
}

/// Fixed or flexible array member: `type name[a][b];` / `type name[];`.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayField {
    name: String,
    ty: TypeRef,
    dimension: usize,
    lengths: Vec<usize>,
    size: usize,
}

impl ArrayField {
    /// Fails with [`LayoutError::DimensionMismatch`] when `dimension != 0` and
    /// `lengths.len() != dimension`. A zero dimension declares a flexible array.
    pub fn new(name: impl Into<String>, ty: impl Into<TypeRef>, dimension: usize, lengths: &[usize]) -> Result<Self> {
        let ty = ty.into();
        check_dimension(dimension, lengths)?;
        let size = match ty.field_type() {
            Some(t) => element_bytes(t.size(), dimension, lengths)?,
            None => 0,
        };
        Ok(ArrayField {
            name: name.into(),
            ty,
            dimension,
            lengths: lengths_for(dimension, lengths),
            size,
        })
    }

    /// Array whose elements are `pointer`: `type *name[n];`. Each element is
    /// pointer-sized whatever the pointee.
    pub fn of_pointer(pointer: &PointerField, dimension: usize, lengths: &[usize]) -> Result<Self> {
        check_dimension(dimension, lengths)?;
        let ty = pointer
            .type_ref()
            .cloned()
            .unwrap_or_else(|| TypeRef::Custom(String::new()));
        Ok(ArrayField {
            name: pointer.name().to_string(),
            ty,
            dimension,
            lengths: lengths_for(dimension, lengths),
            size: element_bytes(POINTER_SIZE, dimension, lengths)?,
        })
    }

    pub(crate) fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }

    /// Number of dimensions; 0 for a flexible array.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    pub fn render(&self, level: usize) -> String {
        let mut out = format!("{}{} {}", indent(level), self.ty.name(), self.name);
        if self.dimension == 0 {
            out.push_str("[]");
        } else {
            for len in &self.lengths {
                out.push_str(&format!("[{}]", len));
            }
        }
        out.push(';');
        out
    }
}

pub(crate) fn check_dimension(dimension: usize, lengths: &[usize]) -> Result<()> {
    if dimension == 0 {
        return Ok(());
    }
    if lengths.len() != dimension {
        return Err(LayoutError::DimensionMismatch {
            lengths: lengths.len(),
            dimension,
        });
    }
    match lengths.iter().position(|&len| len == 0) {
        Some(index) => Err(LayoutError::ZeroLength { index }),
        None => Ok(()),
    }
}

fn lengths_for(dimension: usize, lengths: &[usize]) -> Vec<usize> {
    if dimension == 0 {
        Vec::new()
    } else {
        lengths.to_vec()
    }
}

/// `element × ∏ lengths`, or one pointer for a flexible array.
pub(crate) fn element_bytes(element: usize, dimension: usize, lengths: &[usize]) -> Result<usize> {
    if dimension == 0 {
        return Ok(POINTER_SIZE);
    }
    lengths
        .iter()
        .try_fold(element, |acc, &len| acc.checked_mul(len))
        .ok_or_else(|| {
            LayoutError::SizeOverflow(format!("{} byte(s) x {:?} does not fit in usize", element, lengths))
        })
}

/// Pointer to another field, holding its own copy of the pointee declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct PointerField {
    target: Box<Field>,
}

impl PointerField {
    /// Wraps a copy of `target`, prefixing its name with `*` (or `*(...)` for an
    /// array, so subscripts bind to the pointee).
    pub fn new(target: impl Into<Field>) -> Self {
        let mut target = target.into();
        let name = match target {
            Field::Array(_) => format!("*({})", target.name()),
            _ => format!("*{}", target.name()),
        };
        target.set_name(name);
        PointerField {
            target: Box::new(target),
        }
    }

    /// Pointer to a freshly declared scalar of type `ty`.
    pub fn of_type(name: impl Into<String>, ty: impl Into<TypeRef>) -> Self {
        Self::new(ScalarField::new(name, ty, 0, None))
    }

    /// Pointer to this pointer.
    pub fn pointerize(&self) -> PointerField {
        PointerField::new(self.clone())
    }

    /// Decorated name, e.g. `*name` or `*(name)`.
    pub fn name(&self) -> &str {
        self.target.name()
    }

    pub fn target(&self) -> &Field {
        &self.target
    }

    /// Type of the innermost pointee.
    pub fn type_ref(&self) -> Option<&TypeRef> {
        self.target.type_ref()
    }

    pub fn render(&self, level: usize) -> String {
        self.target.render(level)
    }
}

/// Immutable ordered member list with a computed size. Build with
/// [`StructBuilder`](crate::builder::StructBuilder).
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    tag: String,
    show_tag: bool,
    declared_name: String,
    fields: Vec<Field>,
    is_extern: bool,
    size: usize,
    bits: usize,
}

impl StructField {
    /// Byte size is `Σ member bytes + ⌈Σ member bits / 8⌉` over the whole struct:
    /// bit-fields are packed as one trailing run, never aligned individually.
    ///
    /// Fails with [`LayoutError::SizeOverflow`] when the total does not fit in `usize`.
    pub fn new(tag: impl Into<String>, fields: Vec<Field>, declared_name: impl Into<String>) -> Result<Self> {
        let tag = tag.into();
        let overflow = || LayoutError::SizeOverflow(format!("struct {} is larger than usize::MAX bytes", tag));
        let bits = fields
            .iter()
            .try_fold(0usize, |acc, f| acc.checked_add(f.bit_size()))
            .ok_or_else(overflow)?;
        let size = fields
            .iter()
            .try_fold(bits.div_ceil(8), |acc, f| acc.checked_add(f.byte_size()))
            .ok_or_else(overflow)?;
        Ok(StructField {
            tag,
            show_tag: true,
            declared_name: declared_name.into(),
            fields,
            is_extern: false,
            size,
            bits,
        })
    }

    /// Rendered tag; empty when anonymous.
    pub fn name(&self) -> &str {
        if self.show_tag {
            &self.tag
        } else {
            ""
        }
    }

    /// Tag the struct was built with, even when rendered anonymously.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn declared_name(&self) -> &str {
        &self.declared_name
    }

    /// Declared variable name, falling back to the tag.
    pub fn key(&self) -> &str {
        if self.declared_name.is_empty() {
            &self.tag
        } else {
            &self.declared_name
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key() == key)
    }

    pub fn byte_size(&self) -> usize {
        self.size
    }

    /// Sum of the members' bit-field widths.
    pub fn packed_bits(&self) -> usize {
        self.bits
    }

    pub fn is_extern(&self) -> bool {
        self.is_extern
    }

    pub fn set_extern(&mut self, status: bool) -> &mut Self {
        self.is_extern = status;
        self
    }

    pub(crate) fn embed(&self, show_tag: bool, declared_name: &str) -> StructField {
        let mut copy = self.clone();
        copy.show_tag = show_tag;
        copy.declared_name = declared_name.to_string();
        copy
    }

    pub fn render(&self, level: usize) -> String {
        let pad = indent(level);
        let mut out = pad.clone();
        if self.is_extern {
            out.push_str("extern ");
        }
        out.push_str("struct ");
        if !self.name().is_empty() {
            out.push_str(self.name());
            out.push(' ');
        }
        out.push_str("{\n");
        let members: Vec<String> = self.fields.iter().map(|f| f.render(level + 1)).collect();
        if !members.is_empty() {
            out.push_str(&members.join("\n"));
            out.push('\n');
        }
        out.push_str(&pad);
        out.push('}');
        if !self.declared_name.is_empty() {
            out.push(' ');
            out.push_str(&self.declared_name);
        }
        out.push(';');
        out
    }
}
