//! Derived scalar codec: an encapsulated wrapper enforcing its constraints.

use std::sync::Arc;

use crate::errors::{CodecError, CodecResult};
use crate::model::registry::{Constraint, TypeToken};
use crate::model::typed::TypedValue;
use crate::model::value::Value;
use crate::value::ValueCodec;

/// Codec for one generated derived scalar type. Construction of the typed
/// wrapper goes through the constraint checks, so a typed value of this type
/// is valid by construction.
pub struct DerivedCodec {
    type_token: TypeToken,
    constraints: Vec<Constraint>,
    base: Arc<dyn ValueCodec>,
}

impl DerivedCodec {
    pub fn new(
        type_token: TypeToken,
        constraints: Vec<Constraint>,
        base: Arc<dyn ValueCodec>,
    ) -> Self {
        Self {
            type_token,
            constraints,
            base,
        }
    }

    fn check(&self, value: &Value) -> CodecResult<()> {
        for constraint in &self.constraints {
            let holds = match constraint {
                Constraint::Range { min, max } => value
                    .as_int()
                    .map(|v| v >= *min && v <= *max)
                    .unwrap_or(false),
                Constraint::Length { min, max } => {
                    let length = match value {
                        Value::String(s) => Some(s.chars().count() as u64),
                        Value::Binary(b) => Some(b.len() as u64),
                        _ => None,
                    };
                    length.map(|l| l >= *min && l <= *max).unwrap_or(false)
                }
                Constraint::Pattern { regex } => value
                    .as_str()
                    .map(|s| regex.is_match(s))
                    .unwrap_or(false),
            };
            if !holds {
                return Err(CodecError::ConstraintViolation {
                    type_name: self.type_token.to_string(),
                    value: value.to_string(),
                    constraint: constraint.description(),
                });
            }
        }
        Ok(())
    }
}

impl ValueCodec for DerivedCodec {
    fn to_generic(&self, value: &TypedValue) -> CodecResult<Value> {
        let TypedValue::Scalar {
            type_token,
            value: inner,
        } = value
        else {
            return Err(CodecError::InvalidValue {
                type_name: self.type_token.to_string(),
                value: value.to_string(),
                allowed: vec![self.type_token.to_string()],
            });
        };
        if *type_token != self.type_token {
            return Err(CodecError::InvalidValue {
                type_name: self.type_token.to_string(),
                value: value.to_string(),
                allowed: vec![self.type_token.to_string()],
            });
        }
        let generic = self.base.to_generic(inner)?;
        self.check(&generic)?;
        Ok(generic)
    }

    fn to_typed(&self, value: &Value) -> CodecResult<TypedValue> {
        self.check(value)?;
        let inner = self.base.to_typed(value)?;
        Ok(TypedValue::scalar(self.type_token.clone(), inner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::BuiltinCodec;
    use regex::Regex;

    fn codec(constraints: Vec<Constraint>) -> DerivedCodec {
        DerivedCodec::new(TypeToken::new("Port"), constraints, Arc::new(BuiltinCodec))
    }

    #[test]
    fn range_is_enforced() {
        let codec = codec(vec![Constraint::Range { min: 1, max: 65535 }]);
        assert!(codec.to_typed(&Value::Uint32(80)).is_ok());
        let err = codec.to_typed(&Value::Uint32(0)).unwrap_err();
        let CodecError::ConstraintViolation { constraint, .. } = err else {
            panic!("wrong error");
        };
        assert_eq!(constraint, "range 1..=65535");
    }

    #[test]
    fn pattern_is_enforced() {
        let codec = codec(vec![Constraint::Pattern {
            regex: Regex::new("^[a-z]+$").unwrap(),
        }]);
        assert!(codec.to_typed(&Value::string("abc")).is_ok());
        assert!(codec.to_typed(&Value::string("Abc")).is_err());
    }

    #[test]
    fn serialize_checks_too() {
        let codec = codec(vec![Constraint::Length { min: 2, max: 4 }]);
        let bad = TypedValue::scalar(TypeToken::new("Port"), TypedValue::string("toolong"));
        assert!(codec.to_generic(&bad).is_err());
    }
}
