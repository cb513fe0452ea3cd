//! # rawlayout: C-compatible binary layouts with validated values
//!
//! Describe an on-disk structure once (scalars, bit-fields, fixed/flexible arrays,
//! pointers, nested structs) and get its byte size, a C-like rendering and a
//! validated value container for free. Resource-format readers/writers build on it
//! to declare their headers and tables.
//!
//! ## Layers
//!
//! - **Catalog** ([`types`]): C primitives with size, value kind and range.
//! - **Fields** ([`field`]): scalar / array / pointer / struct members with the size algebra.
//! - **Builder** ([`builder`]): fluent, name-keyed assembly of immutable [`StructField`]s.
//! - **Values** ([`editable`], [`restriction`], [`value`]): an [`Editable`] binds a struct to
//!   live values; every write is checked against named predicates before it is committed.
//! - **Declarations** ([`parser`]): parse rendered structs back into layouts.
//! - **Streams** ([`stream`]): the byte-stream contract format code uses to move values.
//!
//! ## Size rule
//!
//! A struct's size is the sum of its members' byte sizes plus the struct-wide bit-field
//! total rounded up to whole bytes. Bit-fields are never aligned individually, and every
//! pointer is 8 bytes regardless of what it points to.
//!
//! ## Example
//!
//! ```
//! use rawlayout::{Editable, StructBuilder, Value};
//! use rawlayout::types::{CHAR, UINT8_T, UINT64_T};
//!
//! let person = StructBuilder::new()
//!     .add_field("id", UINT64_T)
//!     .add_field("age", UINT8_T)
//!     .add_array("name", CHAR, 1, &[10])
//!     .expect("one length for one dimension")
//!     .build("person", "")
//!     .expect("size fits in usize");
//! assert_eq!(person.byte_size(), 19);
//!
//! let mut values = Editable::from_struct(&person);
//! assert!(values.set("age", 300).is_err());
//! assert_eq!(values.get("age").unwrap(), &Value::Int(0));
//! values.set("name", "Bulbasaur").unwrap();
//! ```

pub mod builder;
pub mod editable;
pub mod error;
pub mod field;
pub mod parser;
pub mod restriction;
pub mod stream;
pub mod types;
pub mod value;

pub use builder::StructBuilder;
pub use editable::Editable;
pub use error::{LayoutError, Result};
pub use field::{ArrayField, Field, PointerField, ScalarField, StructField, TypeRef, POINTER_SIZE};
pub use parser::{parse_declarations, parse_struct};
pub use restriction::Restriction;
pub use stream::{ByteStream, Endianness, MemoryStream};
pub use types::{Catalog, FieldType, NativeKind};
pub use value::Value;
