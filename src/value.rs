//! Runtime values bound to layout fields by an [`Editable`](crate::editable::Editable).

use std::fmt;

use crate::editable::Editable;
use crate::types::NativeKind;

/// A single field value (scalar, sequence or nested container).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Bool(bool),
    /// Wide enough for every catalog integer (`int64_t` through `uint64_t`).
    Int(i128),
    Real(f64),
    List(Vec<Value>),
    Struct(Editable),
}

impl Value {
    /// Catalog kind this value satisfies, if any. Lists and structs have none.
    pub fn native_kind(&self) -> Option<NativeKind> {
        match self {
            Value::Text(_) => Some(NativeKind::Text),
            Value::Bool(_) => Some(NativeKind::Boolean),
            Value::Int(_) => Some(NativeKind::Integer),
            Value::Real(_) => Some(NativeKind::Real),
            Value::List(_) | Value::Struct(_) => None,
        }
    }

    pub fn is_kind(&self, kind: NativeKind) -> bool {
        self.native_kind() == Some(kind)
    }

    /// Character count for text, element count for lists.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Text(s) => Some(s.chars().count()),
            Value::List(v) => Some(v.len()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == Some(0)
    }

    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        self.as_i128().and_then(|x| u64::try_from(x).ok())
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_i128().and_then(|x| i64::try_from(x).ok())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Value::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&Editable> {
        match self {
            Value::Struct(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(x) => write!(f, "{}", x),
            Value::Real(x) => write!(f, "{:?}", x),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Struct(e) => {
                write!(f, "{{")?;
                for (i, (name, value)) in e.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

macro_rules! value_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(x: $t) -> Self {
                    Value::Int(x as i128)
                }
            }
        )*
    };
}

value_from_int!(u8, u16, u32, u64, i8, i16, i32, i64, i128, usize);

impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Real(x as f64)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Real(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<char> for Value {
    fn from(c: char) -> Self {
        Value::Text(c.to_string())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<Editable> for Value {
    fn from(e: Editable) -> Self {
        Value::Struct(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_len_counts_chars() {
        assert_eq!(Value::from("\0\0\0").len(), Some(3));
        assert_eq!(Value::from("é").len(), Some(1));
        assert_eq!(Value::Int(3).len(), None);
    }

    #[test]
    fn u64_max_fits() {
        let v = Value::from(u64::MAX);
        assert_eq!(v.as_u64(), Some(u64::MAX));
        assert_eq!(v.as_i64(), None);
    }

    #[test]
    fn display_nested_list() {
        let v = Value::List(vec![Value::Int(1), Value::List(vec![Value::Bool(true)])]);
        assert_eq!(v.to_string(), "[1, [true]]");
        assert_eq!(Value::from("\0").to_string(), "\"\\0\"");
    }
}
