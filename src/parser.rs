//! Parse struct declarations (the text [`StructField::render`] produces) back into layouts, using PEST.
//!
//! `struct tag` member types resolve against structs declared earlier in the same
//! source (top-level or nested); other type names resolve against the given
//! [`Catalog`] and fall back to custom types.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

use crate::error::{LayoutError, Result};
use crate::field::{element_bytes, ArrayField, Field, PointerField, ScalarField, StructField, TypeRef};
use crate::types::{parse_int, Catalog};
use crate::value::Value;

#[derive(PestParser)]
#[grammar = "declaration.pest"]
struct DeclarationParser;

fn err(msg: impl Into<String>) -> LayoutError {
    LayoutError::Parse(msg.into())
}

/// Parse every top-level struct declaration in `source`.
pub fn parse_declarations(source: &str, catalog: &Catalog) -> Result<Vec<StructField>> {
    let pairs = DeclarationParser::parse(Rule::declarations, source).map_err(|e| err(e.to_string()))?;
    let root = pairs.into_iter().next().ok_or_else(|| err("Empty parse"))?;
    let mut ctx = Context {
        catalog,
        known: Vec::new(),
    };
    let mut out = Vec::new();
    for decl in root.into_inner() {
        if decl.as_rule() != Rule::struct_decl {
            continue;
        }
        let block = decl.into_inner().next().ok_or_else(|| err("struct_decl: missing block"))?;
        out.push(ctx.build_struct(block)?);
    }
    Ok(out)
}

/// Parse exactly one struct declaration.
pub fn parse_struct(source: &str, catalog: &Catalog) -> Result<StructField> {
    let mut structs = parse_declarations(source, catalog)?;
    match structs.len() {
        1 => structs.pop().ok_or_else(|| err("Empty parse")),
        n => Err(err(format!("expected one struct declaration, found {}", n))),
    }
}

struct Context<'a> {
    catalog: &'a Catalog,
    /// Structs declared so far, for `struct tag` references.
    known: Vec<StructField>,
}

/// Resolved member type.
enum MemberType<'s> {
    Plain(TypeRef),
    Struct(&'s StructField),
}

impl<'s> MemberType<'s> {
    fn type_ref(&self) -> TypeRef {
        match self {
            MemberType::Plain(t) => t.clone(),
            MemberType::Struct(s) => TypeRef::Custom(format!("struct {}", s.tag())),
        }
    }
}

impl<'a> Context<'a> {
    fn build_struct(&mut self, pair: Pair<Rule>) -> Result<StructField> {
        let mut is_extern = false;
        let mut tag = String::new();
        let mut declared = String::new();
        let mut fields = Vec::new();
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::extern_kw => is_extern = true,
                Rule::tag => tag = inner.as_str().to_string(),
                Rule::declared => declared = inner.as_str().to_string(),
                Rule::member => fields.push(self.build_member(inner)?),
                _ => {}
            }
        }
        let mut layout = StructField::new(tag.as_str(), fields, declared.as_str())?;
        layout.set_extern(is_extern);
        if !tag.is_empty() {
            self.known.retain(|s| s.tag() != tag);
            self.known.push(layout.clone());
        }
        Ok(layout)
    }

    fn build_member(&mut self, pair: Pair<Rule>) -> Result<Field> {
        let mut field = None;
        let mut default = None;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::struct_block => field = Some(Field::Struct(self.build_struct(inner)?)),
                Rule::field_decl => field = Some(self.build_field(inner)?),
                Rule::default_value => default = Some(build_default(inner)?),
                _ => {}
            }
        }
        let field = field.ok_or_else(|| err("member: missing declaration"))?;
        match (field, default) {
            (Field::Scalar(s), Some(default)) => Ok(Field::Scalar(s.with_default(default))),
            (_, Some(_)) => Err(err("default values are only allowed on scalar members")),
            (field, None) => Ok(field),
        }
    }

    fn resolve_type(&self, pair: Pair<Rule>) -> Result<MemberType<'_>> {
        let inner = pair.into_inner().next().ok_or_else(|| err("type_name: empty"))?;
        match inner.as_rule() {
            Rule::struct_ref => {
                let tag = inner
                    .into_inner()
                    .next()
                    .ok_or_else(|| err("struct reference: missing tag"))?
                    .as_str();
                self.known
                    .iter()
                    .find(|s| s.tag() == tag)
                    .map(MemberType::Struct)
                    .ok_or_else(|| err(format!("struct {} is not declared", tag)))
            }
            _ => Ok(MemberType::Plain(TypeRef::resolve(inner.as_str(), self.catalog))),
        }
    }

    fn build_field(&self, pair: Pair<Rule>) -> Result<Field> {
        let mut ty = None;
        let mut declarator = None;
        let mut width = 0u32;
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::type_name => ty = Some(self.resolve_type(inner)?),
                Rule::declarator => declarator = inner.into_inner().next(),
                Rule::bit_width => {
                    let n = inner.into_inner().next().ok_or_else(|| err("bit width: missing number"))?;
                    width = n.as_str().parse().map_err(|_| err("bit width: bad number"))?;
                }
                _ => {}
            }
        }
        let ty = ty.ok_or_else(|| err("field: missing type"))?;
        let declarator = declarator.ok_or_else(|| err("field: missing declarator"))?;
        let rule = declarator.as_rule();
        let parts = Declarator::from_pair(declarator)?;

        if width > 0 && (rule != Rule::plain || !parts.subscripts.is_empty()) {
            return Err(err(format!("{}: only plain scalars can be bit-fields", parts.name)));
        }
        let (dimension, lengths) = parts.dimensions()?;

        match rule {
            Rule::plain if parts.subscripts.is_empty() => Ok(match &ty {
                MemberType::Struct(s) => ScalarField::new(parts.name, ty.type_ref(), 0, None)
                    .with_size(s.byte_size())
                    .into(),
                MemberType::Plain(t) => ScalarField::new(parts.name, t.clone(), width, None).into(),
            }),
            Rule::plain => {
                let array = ArrayField::new(parts.name, ty.type_ref(), dimension, &lengths)?;
                Ok(match &ty {
                    MemberType::Struct(s) => array
                        .with_size(element_bytes(s.byte_size(), dimension, &lengths)?)
                        .into(),
                    MemberType::Plain(_) => array.into(),
                })
            }
            Rule::pointer => {
                let mut pointer = PointerField::of_type(parts.name, ty.type_ref());
                for _ in 1..parts.stars {
                    pointer = pointer.pointerize();
                }
                if parts.subscripts.is_empty() {
                    Ok(pointer.into())
                } else {
                    Ok(ArrayField::of_pointer(&pointer, dimension, &lengths)?.into())
                }
            }
            Rule::pointer_to_array => {
                let array = ArrayField::new(parts.name, ty.type_ref(), dimension, &lengths)?;
                let mut pointer = PointerField::new(array);
                for _ in 1..parts.stars {
                    pointer = pointer.pointerize();
                }
                Ok(pointer.into())
            }
            other => Err(err(format!("unexpected declarator {:?}", other))),
        }
    }
}

/// Pieces of `**name[3][4]` / `*(name)[]`.
struct Declarator {
    name: String,
    stars: usize,
    /// `None` for an empty `[]`.
    subscripts: Vec<Option<usize>>,
}

impl Declarator {
    fn from_pair(pair: Pair<Rule>) -> Result<Self> {
        let mut out = Declarator {
            name: String::new(),
            stars: 0,
            subscripts: Vec::new(),
        };
        for inner in pair.into_inner() {
            match inner.as_rule() {
                Rule::stars => out.stars = inner.as_str().len(),
                Rule::ident => out.name = inner.as_str().to_string(),
                Rule::subscript => {
                    let len = match inner.into_inner().next() {
                        Some(n) => Some(n.as_str().parse().map_err(|_| err("subscript: bad number"))?),
                        None => None,
                    };
                    out.subscripts.push(len);
                }
                _ => {}
            }
        }
        Ok(out)
    }

    /// `[]` alone is a flexible array (dimension 0); it cannot be mixed with sized subscripts.
    fn dimensions(&self) -> Result<(usize, Vec<usize>)> {
        match self.subscripts.as_slice() {
            [None] => Ok((0, Vec::new())),
            subs => {
                let lengths = subs
                    .iter()
                    .map(|s| s.ok_or_else(|| err(format!("{}: '[]' must be the only subscript", self.name))))
                    .collect::<Result<Vec<usize>>>()?;
                Ok((lengths.len(), lengths))
            }
        }
    }
}

fn build_default(pair: Pair<Rule>) -> Result<Value> {
    let literal = pair
        .into_inner()
        .next()
        .and_then(|l| l.into_inner().next())
        .ok_or_else(|| err("default: missing literal"))?;
    let s = literal.as_str();
    match literal.as_rule() {
        Rule::bool_lit => Ok(Value::Bool(s == "true")),
        Rule::int_lit => parse_int(s)
            .map(Value::Int)
            .ok_or_else(|| err(format!("default: bad integer {}", s))),
        Rule::real_lit => s
            .parse::<f64>()
            .map(Value::Real)
            .map_err(|_| err(format!("default: bad real {}", s))),
        Rule::text_lit => unescape(&s[1..s.len() - 1]).map(Value::Text),
        other => Err(err(format!("default: unexpected literal {:?}", other))),
    }
}

/// Undo the escaping applied by `{:?}` on strings.
fn unescape(s: &str) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('\0'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('u') => {
                let rest: String = chars.by_ref().take_while(|&c| c != '}').collect();
                let hex = rest.trim_start_matches('{');
                let code = u32::from_str_radix(hex, 16).map_err(|_| err(format!("bad escape \\u{}", rest)))?;
                out.push(char::from_u32(code).ok_or_else(|| err(format!("bad code point {:x}", code)))?);
            }
            other => return Err(err(format!("unknown escape \\{}", other.unwrap_or(' ')))),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_source() {
        let structs = parse_declarations("", Catalog::builtin()).expect("empty source can parse");
        assert!(structs.is_empty());
    }

    #[test]
    fn parse_minimal() {
        let s = parse_struct("struct example {\n\tuint64_t id;\n};", Catalog::builtin()).expect("parse");
        assert_eq!(s.tag(), "example");
        assert_eq!(s.byte_size(), 8);
    }

    #[test]
    fn unescape_debug_forms() {
        assert_eq!(unescape("a\\0b\\\"").unwrap(), "a\0b\"");
        assert_eq!(unescape("\\u{e9}").unwrap(), "é");
        assert!(unescape("\\q").is_err());
    }

    #[test]
    fn mixed_flexible_subscript_is_rejected() {
        let src = "struct s {\n\tuint8_t a[][3];\n};";
        assert!(matches!(parse_declarations(src, Catalog::builtin()), Err(LayoutError::Parse(_))));
    }

    #[test]
    fn oversized_struct_array_is_an_error() {
        let src = "struct big {\n\tuint8_t a[4294967296];\n};\nstruct s {\n\tstruct big m[4294967296][4294967296];\n};";
        let e = parse_declarations(src, Catalog::builtin()).unwrap_err();
        assert!(matches!(e, LayoutError::SizeOverflow(_)));
    }

    #[test]
    fn unknown_struct_reference() {
        let src = "struct s {\n\tstruct missing m;\n};";
        let e = parse_declarations(src, Catalog::builtin()).unwrap_err();
        assert!(e.to_string().contains("missing"));
    }
}
