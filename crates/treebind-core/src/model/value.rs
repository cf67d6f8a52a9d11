//! Generic scalar values carried by leaves and predicates.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::model::path::GenericPath;
use crate::model::qname::QName;

/// A decimal number represented as a scaled integer. No floating point is
/// ever stored in the tree, which keeps `Value` hashable and totally ordered.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Decimal64 {
    digits: i64,
    fraction_digits: u8,
}

impl Decimal64 {
    pub fn new(digits: i64, fraction_digits: u8) -> Self {
        Self {
            digits,
            fraction_digits,
        }
    }

    pub fn digits(&self) -> i64 {
        self.digits
    }

    pub fn fraction_digits(&self) -> u8 {
        self.fraction_digits
    }
}

impl fmt::Display for Decimal64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fraction_digits == 0 {
            return write!(f, "{}", self.digits);
        }
        let scale = 10i64.pow(u32::from(self.fraction_digits));
        let sign = if self.digits < 0 { "-" } else { "" };
        let abs = self.digits.unsigned_abs();
        let scale = scale.unsigned_abs();
        write!(
            f,
            "{sign}{}.{:0width$}",
            abs / scale,
            abs % scale,
            width = self.fraction_digits as usize
        )
    }
}

impl fmt::Debug for Decimal64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A generic scalar value, independent of any generated type.
///
/// This is the only value representation the generic tree knows about:
/// enumerations appear as their declared symbol string, bit fields as the
/// set of set bit names, identity references as the identity's qualified
/// name and structural references as a [`GenericPath`].
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Value {
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Decimal(Decimal64),
    String(Arc<str>),
    Binary(Arc<[u8]>),
    Empty,
    /// Set bit names of a bit-field leaf.
    Bits(BTreeSet<Arc<str>>),
    /// An identity reference.
    Identity(QName),
    /// An opaque structural reference into the generic tree.
    Path(GenericPath),
}

impl Value {
    pub fn string(s: impl Into<Arc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn bits<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Arc<str>>,
    {
        Value::Bits(names.into_iter().map(Into::into).collect())
    }

    /// Integer magnitude for range checking, if this is an integer value.
    pub fn as_int(&self) -> Option<i128> {
        Some(match self {
            Value::Int8(v) => i128::from(*v),
            Value::Int16(v) => i128::from(*v),
            Value::Int32(v) => i128::from(*v),
            Value::Int64(v) => i128::from(*v),
            Value::Uint8(v) => i128::from(*v),
            Value::Uint16(v) => i128::from(*v),
            Value::Uint32(v) => i128::from(*v),
            Value::Uint64(v) => i128::from(*v),
            _ => return None,
        })
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Uint8(v) => write!(f, "{v}"),
            Value::Uint16(v) => write!(f, "{v}"),
            Value::Uint32(v) => write!(f, "{v}"),
            Value::Uint64(v) => write!(f, "{v}"),
            Value::Decimal(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Binary(v) => {
                write!(f, "0x")?;
                for byte in v.iter() {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
            Value::Empty => write!(f, "(empty)"),
            Value::Bits(set) => {
                let mut first = true;
                write!(f, "{{")?;
                for name in set {
                    if !first {
                        write!(f, " ")?;
                    }
                    write!(f, "{name}")?;
                    first = false;
                }
                write!(f, "}}")
            }
            Value::Identity(qname) => write!(f, "{qname}"),
            Value::Path(path) => write!(f, "{path}"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
