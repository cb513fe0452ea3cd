//! Field-type catalog: the closed table of C scalar primitives.
//!
//! Each [`FieldType`] carries its C name, its size in bytes, the native kind of
//! value it holds and, for bounded kinds, the inclusive range of legal values.
//! The standard table is available as [`Catalog::builtin`]; other tables can be
//! built from descriptor strings with [`Catalog::from_descriptors`].
//!
//! Type names missing from a catalog are legal everywhere a type is expected:
//! they describe opaque/custom members and carry no automatic validation.

use std::borrow::Cow;
use std::fmt;

use crate::error::{LayoutError, Result};
use crate::value::Value;

/// Kind of runtime value a catalog type holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeKind {
    Text,
    Boolean,
    Integer,
    Real,
}

impl NativeKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(NativeKind::Text),
            "boolean" => Some(NativeKind::Boolean),
            "integer" => Some(NativeKind::Integer),
            "real" => Some(NativeKind::Real),
            _ => None,
        }
    }

    /// Value synthesized for a slot of this kind when no default is declared.
    pub fn zero(self) -> Value {
        match self {
            NativeKind::Text => Value::Text("\0".to_string()),
            NativeKind::Boolean => Value::Bool(false),
            NativeKind::Integer => Value::Int(0),
            NativeKind::Real => Value::Real(0.0),
        }
    }
}

impl fmt::Display for NativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NativeKind::Text => "text",
            NativeKind::Boolean => "boolean",
            NativeKind::Integer => "integer",
            NativeKind::Real => "real",
        };
        f.write_str(s)
    }
}

/// Inclusive value range. Text and boolean entries carry placeholder integer bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bounds {
    Int { min: i128, max: i128 },
    Real { min: f64, max: f64 },
}

impl Bounds {
    /// True when `value` is numeric and lies in the range. Non-numeric values are never contained.
    pub fn contains(&self, value: &Value) -> bool {
        match (self, value) {
            (Bounds::Int { min, max }, Value::Int(x)) => min <= x && x <= max,
            (Bounds::Real { min, max }, Value::Real(x)) => *min <= *x && *x <= *max,
            _ => false,
        }
    }

    pub fn min_f64(&self) -> f64 {
        match self {
            Bounds::Int { min, .. } => *min as f64,
            Bounds::Real { min, .. } => *min,
        }
    }

    pub fn max_f64(&self) -> f64 {
        match self {
            Bounds::Int { max, .. } => *max as f64,
            Bounds::Real { max, .. } => *max,
        }
    }
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldType {
    name: Cow<'static, str>,
    size: usize,
    kind: NativeKind,
    bounds: Bounds,
}

const fn int_bounds(min: i128, max: i128) -> Bounds {
    Bounds::Int { min, max }
}

pub const CHAR: FieldType = FieldType::builtin("char", 1, NativeKind::Text, int_bounds(0, 0));
pub const BOOL: FieldType = FieldType::builtin("bool", 1, NativeKind::Boolean, int_bounds(0, 1));
pub const UINT8_T: FieldType = FieldType::builtin("uint8_t", 1, NativeKind::Integer, int_bounds(0, 0xFF));
pub const UINT16_T: FieldType =
    FieldType::builtin("uint16_t", 2, NativeKind::Integer, int_bounds(0, 0xFFFF));
pub const UINT32_T: FieldType =
    FieldType::builtin("uint32_t", 4, NativeKind::Integer, int_bounds(0, 0xFFFF_FFFF));
pub const UINT64_T: FieldType =
    FieldType::builtin("uint64_t", 8, NativeKind::Integer, int_bounds(0, u64::MAX as i128));
pub const INT8_T: FieldType = FieldType::builtin("int8_t", 1, NativeKind::Integer, int_bounds(-0x80, 0x7F));
pub const INT16_T: FieldType =
    FieldType::builtin("int16_t", 2, NativeKind::Integer, int_bounds(-0x8000, 0x7FFF));
pub const INT32_T: FieldType = FieldType::builtin(
    "int32_t",
    4,
    NativeKind::Integer,
    int_bounds(-0x8000_0000, 0x7FFF_FFFF),
);
pub const INT64_T: FieldType = FieldType::builtin(
    "int64_t",
    8,
    NativeKind::Integer,
    int_bounds(i64::MIN as i128, i64::MAX as i128),
);
pub const FLOAT: FieldType =
    FieldType::builtin("float", 4, NativeKind::Real, Bounds::Real { min: -1e37, max: 1e37 });
pub const DOUBLE: FieldType =
    FieldType::builtin("double", 8, NativeKind::Real, Bounds::Real { min: -1e37, max: 1e37 });

static BUILTIN: [FieldType; 12] = [
    CHAR, BOOL, UINT8_T, UINT16_T, UINT32_T, UINT64_T, INT8_T, INT16_T, INT32_T, INT64_T, FLOAT,
    DOUBLE,
];

static BUILTIN_CATALOG: Catalog = Catalog {
    entries: Cow::Borrowed(&BUILTIN),
};

impl FieldType {
    const fn builtin(name: &'static str, size: usize, kind: NativeKind, bounds: Bounds) -> Self {
        FieldType {
            name: Cow::Borrowed(name),
            size,
            kind,
            bounds,
        }
    }

    /// Parses a descriptor of the form `name, size[, kind[, min, max]]`.
    ///
    /// Fails with [`LayoutError::InvalidFieldType`] when fewer than two parts are given,
    /// when the size is not a positive integer, or when the kind/bounds do not parse.
    /// Kind defaults to `integer`; bounds default to zero/zero.
    pub fn from_descriptor(descriptor: &str) -> Result<Self> {
        let parts: Vec<&str> = descriptor.split(',').map(str::trim).collect();
        if parts.len() < 2 || parts[0].is_empty() {
            return Err(LayoutError::InvalidFieldType(format!(
                "'{}': a field type needs at least a name and a size in bytes",
                descriptor
            )));
        }
        let name = parts[0].to_string();
        let size: usize = parts[1].parse().map_err(|_| {
            LayoutError::InvalidFieldType(format!("'{}': size '{}' must be an integer", name, parts[1]))
        })?;
        if size == 0 {
            return Err(LayoutError::InvalidFieldType(format!("'{}': size must be positive", name)));
        }
        let kind = match parts.get(2) {
            Some(k) => NativeKind::parse(k).ok_or_else(|| {
                LayoutError::InvalidFieldType(format!("'{}': unknown kind '{}'", name, k))
            })?,
            None => NativeKind::Integer,
        };
        let bounds = match (parts.get(3), parts.get(4)) {
            (None, None) => Self::placeholder_bounds(kind),
            (Some(min), Some(max)) => Self::parse_bounds(&name, kind, min, max)?,
            _ => {
                return Err(LayoutError::InvalidFieldType(format!(
                    "'{}': bounds need both a min and a max",
                    name
                )))
            }
        };
        if parts.len() > 5 {
            return Err(LayoutError::InvalidFieldType(format!(
                "'{}': too many descriptor parts ({})",
                name,
                parts.len()
            )));
        }
        Ok(FieldType {
            name: Cow::Owned(name),
            size,
            kind,
            bounds,
        })
    }

    fn placeholder_bounds(kind: NativeKind) -> Bounds {
        match kind {
            NativeKind::Boolean => int_bounds(0, 1),
            NativeKind::Real => Bounds::Real { min: 0.0, max: 0.0 },
            NativeKind::Text | NativeKind::Integer => int_bounds(0, 0),
        }
    }

    fn parse_bounds(name: &str, kind: NativeKind, min: &str, max: &str) -> Result<Bounds> {
        let bad = |s: &str| LayoutError::InvalidFieldType(format!("'{}': bad bound '{}'", name, s));
        let bounds = match kind {
            NativeKind::Real => {
                let lo: f64 = min.parse().map_err(|_| bad(min))?;
                let hi: f64 = max.parse().map_err(|_| bad(max))?;
                Bounds::Real { min: lo, max: hi }
            }
            _ => {
                let lo = parse_int(min).ok_or_else(|| bad(min))?;
                let hi = parse_int(max).ok_or_else(|| bad(max))?;
                int_bounds(lo, hi)
            }
        };
        if bounds.min_f64() > bounds.max_f64() {
            return Err(LayoutError::InvalidFieldType(format!(
                "'{}': min {} is greater than max {}",
                name, min, max
            )));
        }
        Ok(bounds)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn kind(&self) -> NativeKind {
        self.kind
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// True for kinds whose range is enforced on write (integer, real).
    pub fn is_bounded(&self) -> bool {
        matches!(self.kind, NativeKind::Integer | NativeKind::Real)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Decimal or `0x` hex integer, optionally negative.
pub(crate) fn parse_int(s: &str) -> Option<i128> {
    let s = s.trim();
    let (neg, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i128::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i128>().ok()?,
    };
    Some(if neg { -magnitude } else { magnitude })
}

/// Immutable lookup table of field types, keyed by type name.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Cow<'static, [FieldType]>,
}

impl Catalog {
    /// The standard C primitive table (`char`, `bool`, fixed-width integers, `float`, `double`).
    pub fn builtin() -> &'static Catalog {
        &BUILTIN_CATALOG
    }

    /// Builds a catalog from `(key, entry)` pairs. Every key must equal its entry's name
    /// and keys must be unique.
    pub fn from_entries<K: AsRef<str>>(entries: impl IntoIterator<Item = (K, FieldType)>) -> Result<Self> {
        let mut out: Vec<FieldType> = Vec::new();
        for (key, entry) in entries {
            let key = key.as_ref();
            if key != entry.name() {
                return Err(LayoutError::InvalidFieldType(format!(
                    "catalog key '{}' does not match entry name '{}'",
                    key,
                    entry.name()
                )));
            }
            if out.iter().any(|e| e.name() == key) {
                return Err(LayoutError::InvalidFieldType(format!("duplicate catalog entry '{}'", key)));
            }
            out.push(entry);
        }
        Ok(Catalog {
            entries: Cow::Owned(out),
        })
    }

    /// Builds a catalog from descriptor strings (see [`FieldType::from_descriptor`]).
    pub fn from_descriptors(descriptors: &[&str]) -> Result<Self> {
        let entries = descriptors
            .iter()
            .map(|d| FieldType::from_descriptor(d))
            .collect::<Result<Vec<_>>>()?;
        Self::from_entries(entries.into_iter().map(|e| (e.name().to_string(), e)))
    }

    /// Looks up a type by name; `None` means a custom/opaque type.
    pub fn lookup(&self, name: &str) -> Option<&FieldType> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldType> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
