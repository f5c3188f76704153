//! Types, symbols and constant values.

use std::fmt;
use std::rc::Rc;

/// A type.
#[derive(Clone, Debug, PartialEq)]
pub enum Ty {
    Any,
    Number,
    String,
    Boolean,
    Void,
    /// A numeric literal type in canonical form.
    NumberLit(String),
    /// A string literal type, quotes included.
    StringLit(String),
    BoolLit(bool),
    /// A numeric enum, by the name it is visible under.
    Enum(String),
    Function(Box<FnSig>),
}

/// A function signature.
#[derive(Clone, Debug, PartialEq)]
pub struct FnSig {
    pub params: Vec<(String, Ty)>,
    pub ret: Ty,
}

impl Ty {
    /// Drops literal precision, as `let` bindings and inferred returns do.
    pub fn widen(&self) -> Ty {
        match self {
            Ty::NumberLit(_) => Ty::Number,
            Ty::StringLit(_) => Ty::String,
            Ty::BoolLit(_) => Ty::Boolean,
            other => other.clone(),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Ty::NumberLit(_) | Ty::StringLit(_) | Ty::BoolLit(_))
    }

    pub fn is_number_like(&self) -> bool {
        matches!(self, Ty::Number | Ty::NumberLit(_) | Ty::Enum(_))
    }

    pub fn is_string_like(&self) -> bool {
        matches!(self, Ty::String | Ty::StringLit(_))
    }

    /// Returns `true` if a value of type `self` may be stored where `target`
    /// is expected.
    pub fn assignable_to(&self, target: &Ty) -> bool {
        if self == target || matches!(self, Ty::Any) || matches!(target, Ty::Any) {
            return true;
        }
        match (self, target) {
            (Ty::NumberLit(_) | Ty::Enum(_), Ty::Number) => true,
            (Ty::Number | Ty::NumberLit(_), Ty::Enum(_)) => true,
            (Ty::StringLit(_), Ty::String) => true,
            (Ty::BoolLit(_), Ty::Boolean) => true,
            (Ty::Function(source), Ty::Function(target)) => {
                source.params.len() <= target.params.len()
                    && source
                        .params
                        .iter()
                        .zip(&target.params)
                        .all(|((_, s), (_, t))| t.assignable_to(s))
                    && (matches!(target.ret, Ty::Void) || source.ret.assignable_to(&target.ret))
            }
            _ => false,
        }
    }

    /// Collects enum names mentioned by this type.
    pub fn enum_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Ty::Enum(name) => out.push(name),
            Ty::Function(sig) => {
                for (_, param) in &sig.params {
                    param.enum_names(out);
                }
                sig.ret.enum_names(out);
            }
            _ => {}
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Any => f.write_str("any"),
            Ty::Number => f.write_str("number"),
            Ty::String => f.write_str("string"),
            Ty::Boolean => f.write_str("boolean"),
            Ty::Void => f.write_str("void"),
            Ty::NumberLit(text) | Ty::StringLit(text) | Ty::Enum(text) => f.write_str(text),
            Ty::BoolLit(value) => write!(f, "{value}"),
            Ty::Function(sig) => {
                f.write_str("(")?;
                write_params(f, &sig.params)?;
                write!(f, ") => {}", sig.ret)
            }
        }
    }
}

/// Writes `a: number, b: string`.
pub fn write_params(f: &mut impl fmt::Write, params: &[(String, Ty)]) -> fmt::Result {
    for (i, (name, ty)) in params.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{name}: {ty}")?;
    }
    Ok(())
}

/// Canonical text of a numeric literal: `1_000` and `1000.0` both print
/// as `1000`.
pub fn normalize_number(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| *c != '_').collect();
    match cleaned.parse::<f64>() {
        Ok(value) => format_number(value),
        Err(_) => cleaned,
    }
}

/// Formats a number the way it is printed in declarations.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{value}")
    }
}

/// Quotes string contents with double quotes. `value` keeps the escapes of
/// the literal it came from.
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut escaped = false;
    for c in value.chars() {
        if c == '"' && !escaped {
            out.push('\\');
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }
    out.push('"');
    out
}

/// The value of an enum member.
#[derive(Clone, Debug, PartialEq)]
pub enum EnumValue {
    Number(f64),
    /// Quoted string.
    String(String),
}

impl EnumValue {
    /// The literal type of the value.
    pub fn ty(&self) -> Ty {
        match self {
            EnumValue::Number(value) => Ty::NumberLit(format_number(*value)),
            EnumValue::String(text) => Ty::StringLit(text.clone()),
        }
    }
}

impl fmt::Display for EnumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumValue::Number(value) => f.write_str(&format_number(*value)),
            EnumValue::String(text) => f.write_str(text),
        }
    }
}

/// A resolved enum.
#[derive(Clone, Debug, PartialEq)]
pub struct EnumInfo {
    pub name: String,
    pub is_const: bool,
    /// Members in order; `None` where the initializer was not constant.
    pub members: Vec<(String, Option<EnumValue>)>,
}

impl EnumInfo {
    pub fn member(&self, name: &str) -> Option<&Option<EnumValue>> {
        self.members
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, value)| value)
    }
}

/// What a name refers to.
#[derive(Clone, Debug, PartialEq)]
pub enum Symbol {
    Value { ty: Ty, is_const: bool },
    Function(FnSig),
    Enum(Rc<EnumInfo>),
}

impl Symbol {
    /// A `const` binding of `ty`.
    pub fn constant(ty: Ty) -> Self {
        Symbol::Value { ty, is_const: true }
    }

    /// The type of the name used as a value.
    pub fn value_type(&self) -> Ty {
        match self {
            Symbol::Value { ty, .. } => ty.clone(),
            Symbol::Function(sig) => Ty::Function(Box::new(sig.clone())),
            Symbol::Enum(_) => Ty::Any,
        }
    }

    /// Returns `true` for `const enum`s, which have no runtime value.
    pub fn is_const_enum(&self) -> bool {
        matches!(self, Symbol::Enum(info) if info.is_const)
    }

    /// Describes the symbol for signatures: a change to any part of it
    /// changes the text.
    pub fn shape(&self) -> String {
        match self {
            Symbol::Value { ty, is_const } => {
                format!("{} {ty}", if *is_const { "const" } else { "let" })
            }
            Symbol::Function(sig) => Ty::Function(Box::new(sig.clone())).to_string(),
            Symbol::Enum(info) => {
                let members: Vec<String> = info
                    .members
                    .iter()
                    .map(|(name, value)| match value {
                        Some(value) => format!("{name} = {value}"),
                        None => name.clone(),
                    })
                    .collect();
                let keyword = if info.is_const { "const enum" } else { "enum" };
                format!("{keyword} {{ {} }}", members.join(", "))
            }
        }
    }
}
