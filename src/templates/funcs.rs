//! Function library available to every device template.
//!
//! Labels are plain strings, but filters can be chained (`split` then `join`),
//! so intermediate values may be sequences or numbers. Every filter converts
//! its arguments into [`LabelValue`] and fails with a [`FuncError`] for shapes
//! it does not support. A failing filter aborts the whole render.

use std::fmt;

use minijinja::value::{Rest, Value, ValueKind};
use minijinja::{Environment, ErrorKind};
use serde::Serialize;

use crate::error::FuncError;

/// Loosely-typed value passed between template filters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LabelValue {
    #[default]
    Absent,
    Str(String),
    Int(i64),
    Bool(bool),
    Seq(Vec<LabelValue>),
}

static ABSENT: LabelValue = LabelValue::Absent;

impl LabelValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, LabelValue::Absent)
    }

    /// Type name used in type mismatch errors
    pub fn type_name(&self) -> &'static str {
        match self {
            LabelValue::Absent => "nil",
            LabelValue::Str(_) => "string",
            LabelValue::Int(_) => "int",
            LabelValue::Bool(_) => "bool",
            LabelValue::Seq(_) => "sequence",
        }
    }
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelValue::Absent => Ok(()),
            LabelValue::Str(s) => f.write_str(s),
            LabelValue::Int(n) => write!(f, "{}", n),
            LabelValue::Bool(b) => write!(f, "{}", b),
            LabelValue::Seq(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for LabelValue {
    fn from(s: &str) -> Self {
        LabelValue::Str(s.to_string())
    }
}

impl From<String> for LabelValue {
    fn from(s: String) -> Self {
        LabelValue::Str(s)
    }
}

impl From<i64> for LabelValue {
    fn from(n: i64) -> Self {
        LabelValue::Int(n)
    }
}

impl From<bool> for LabelValue {
    fn from(b: bool) -> Self {
        LabelValue::Bool(b)
    }
}

impl<T: Into<LabelValue>> From<Vec<T>> for LabelValue {
    fn from(items: Vec<T>) -> Self {
        LabelValue::Seq(items.into_iter().map(Into::into).collect())
    }
}

impl From<&Value> for LabelValue {
    fn from(value: &Value) -> Self {
        match value.kind() {
            ValueKind::Undefined | ValueKind::None => LabelValue::Absent,
            ValueKind::Bool => LabelValue::Bool(value.is_true()),
            ValueKind::String => LabelValue::Str(value.as_str().unwrap_or_default().to_string()),
            ValueKind::Number => match i64::try_from(value.clone()) {
                Ok(n) => LabelValue::Int(n),
                Err(_) => LabelValue::Str(value.to_string()),
            },
            ValueKind::Seq | ValueKind::Iterable => match value.try_iter() {
                Ok(iter) => LabelValue::Seq(iter.map(|v| LabelValue::from(&v)).collect()),
                Err(_) => LabelValue::Str(value.to_string()),
            },
            _ => LabelValue::Str(value.to_string()),
        }
    }
}

impl From<LabelValue> for Value {
    fn from(value: LabelValue) -> Self {
        match value {
            LabelValue::Absent => Value::from(()),
            LabelValue::Str(s) => Value::from(s),
            LabelValue::Int(n) => Value::from(n),
            LabelValue::Bool(b) => Value::from(b),
            LabelValue::Seq(items) => {
                Value::from(items.into_iter().map(Value::from).collect::<Vec<_>>())
            }
        }
    }
}

/// Placeholder validator. Fails until a validation format is defined.
pub fn expect(_value: &LabelValue, _format: &LabelValue) -> Result<LabelValue, FuncError> {
    Err(FuncError::NotImplemented("expect"))
}

pub fn require(value: &LabelValue) -> Result<LabelValue, FuncError> {
    if value.is_absent() {
        return Err(FuncError::RequiredValueNotSet);
    }
    Ok(value.clone())
}

/// Returns `def` when `value` is absent, empty or false.
///
/// A present value must have the same type as the default. A numeric string
/// counts as an int when the default is an int.
pub fn default(value: &LabelValue, def: &LabelValue) -> Result<LabelValue, FuncError> {
    if def.is_absent() {
        return Err(FuncError::DefaultValueExpected);
    }

    match value {
        LabelValue::Absent | LabelValue::Bool(false) => return Ok(def.clone()),
        LabelValue::Str(s) if s.is_empty() => return Ok(def.clone()),
        _ => {}
    }

    let expected = def.type_name();
    let mut got = value.type_name();
    if let (LabelValue::Str(s), LabelValue::Int(_)) = (value, def) {
        if s.parse::<i64>().is_ok() {
            got = "int";
        }
    }
    if expected != got {
        return Err(FuncError::TypeMismatch {
            expected,
            got,
            value: value.clone(),
        });
    }

    Ok(value.clone())
}

/// Address part of `address/prefix`
pub fn ip(value: &LabelValue) -> Result<LabelValue, FuncError> {
    let s = value.to_string();
    let addr = s.split('/').next().unwrap_or_default();
    Ok(LabelValue::from(addr))
}

/// Prefix length part of `address/prefix`
pub fn ipmask(value: &LabelValue) -> Result<LabelValue, FuncError> {
    let s = value.to_string();
    match s.split('/').nth(1) {
        Some(mask) => Ok(LabelValue::from(mask)),
        None => Err(FuncError::InvalidFormat(format!(
            "expected address/prefix, got {:?}",
            s
        ))),
    }
}

pub fn contains(value: &LabelValue, substr: &LabelValue) -> Result<LabelValue, FuncError> {
    Ok(LabelValue::Bool(
        value.to_string().contains(&substr.to_string()),
    ))
}

pub fn split(value: &LabelValue, sep: &LabelValue) -> Result<LabelValue, FuncError> {
    if value.is_absent() {
        return Ok(LabelValue::Seq(Vec::new()));
    }
    let sep = separator(sep);
    let s = value.to_string();

    // An empty separator splits into single characters
    let parts: Vec<LabelValue> = if sep.is_empty() {
        s.chars().map(|c| LabelValue::Str(c.to_string())).collect()
    } else {
        s.split(sep.as_str()).map(LabelValue::from).collect()
    };
    Ok(LabelValue::Seq(parts))
}

pub fn join(value: &LabelValue, sep: &LabelValue) -> Result<LabelValue, FuncError> {
    let sep = separator(sep);
    match value {
        LabelValue::Seq(items) => Ok(LabelValue::Str(
            items
                .iter()
                .map(|item| item.to_string())
                .collect::<Vec<_>>()
                .join(&sep),
        )),
        other => Err(FuncError::ExpectedSequence(other.clone())),
    }
}

/// Half-open sub-range of a string or sequence; negative indices count from the end
pub fn slice(
    value: &LabelValue,
    start: &LabelValue,
    end: &LabelValue,
) -> Result<LabelValue, FuncError> {
    let start = match start {
        LabelValue::Int(n) => *n,
        other => {
            return Err(FuncError::ExpectedInteger {
                position: "2nd",
                value: other.clone(),
            })
        }
    };
    let end = match end {
        LabelValue::Int(n) => *n,
        other => {
            return Err(FuncError::ExpectedInteger {
                position: "3rd",
                value: other.clone(),
            })
        }
    };

    match value {
        LabelValue::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (from, to) = resolve_range(start, end, chars.len())?;
            Ok(LabelValue::Str(chars[from..to].iter().collect()))
        }
        LabelValue::Seq(items) => {
            let (from, to) = resolve_range(start, end, items.len())?;
            Ok(LabelValue::Seq(items[from..to].to_vec()))
        }
        other => Err(FuncError::Unsupported {
            func: "slice",
            value: other.clone(),
        }),
    }
}

fn resolve_range(start: i64, end: i64, len: usize) -> Result<(usize, usize), FuncError> {
    let n = len as i64;
    let from = if start < 0 { start + n } else { start };
    let to = if end < 0 { end + n } else { end };
    if from < 0 || to < from || to > n {
        return Err(FuncError::OutOfRange {
            func: "slice",
            start,
            end,
            len,
        });
    }
    Ok((from as usize, to as usize))
}

fn separator(sep: &LabelValue) -> String {
    if sep.is_absent() {
        " ".to_string()
    } else {
        sep.to_string()
    }
}

fn arg(args: &[LabelValue], index: usize) -> &LabelValue {
    args.get(index).unwrap_or(&ABSENT)
}

pub type LibraryFn = fn(&[LabelValue]) -> Result<LabelValue, FuncError>;

/// Name and entry point of every library function
pub fn library() -> [(&'static str, LibraryFn); 9] {
    [
        ("expect", |a: &[LabelValue]| expect(arg(a, 0), arg(a, 1))),
        ("require", |a: &[LabelValue]| require(arg(a, 0))),
        ("ip", |a: &[LabelValue]| ip(arg(a, 0))),
        ("ipmask", |a: &[LabelValue]| ipmask(arg(a, 0))),
        ("default", |a: &[LabelValue]| default(arg(a, 0), arg(a, 1))),
        ("contains", |a: &[LabelValue]| contains(arg(a, 0), arg(a, 1))),
        ("split", |a: &[LabelValue]| split(arg(a, 0), arg(a, 1))),
        ("join", |a: &[LabelValue]| join(arg(a, 0), arg(a, 1))),
        ("slice", |a: &[LabelValue]| slice(arg(a, 0), arg(a, 1), arg(a, 2))),
    ]
}

/// Register the library as filters, replacing built-in filters of the same name
pub fn register(env: &mut Environment<'static>) {
    for (name, func) in library() {
        env.add_filter(
            name,
            move |value: Value, rest: Rest<Value>| -> Result<Value, minijinja::Error> {
                let mut args = Vec::with_capacity(rest.0.len() + 1);
                args.push(LabelValue::from(&value));
                args.extend(rest.0.iter().map(LabelValue::from));
                func(&args).map(Value::from).map_err(|err| {
                    tracing::debug!("template function {} failed: {}", name, err);
                    minijinja::Error::new(ErrorKind::InvalidOperation, format!("{}: {}", name, err))
                        .with_source(err)
                })
            },
        );
    }
}
