//! Union codec: ordered member codecs with first-match-wins semantics.

use std::sync::Arc;

use crate::errors::{CodecError, CodecResult};
use crate::model::registry::TypeToken;
use crate::model::typed::TypedValue;
use crate::model::value::Value;
use crate::value::ValueCodec;

/// Codec for one generated union type. Members are tried strictly in schema
/// declaration order and the first success wins, in both directions. This
/// ordering is an observable contract: a value acceptable to several members
/// always binds to the first.
pub struct UnionCodec {
    type_token: TypeToken,
    members: Vec<(Arc<str>, Arc<dyn ValueCodec>)>,
}

impl UnionCodec {
    pub fn new(type_token: TypeToken, members: Vec<(Arc<str>, Arc<dyn ValueCodec>)>) -> Self {
        Self {
            type_token,
            members,
        }
    }

    fn no_match(&self, value: impl ToString) -> CodecError {
        CodecError::NoMatchingMember {
            type_name: self.type_token.to_string(),
            value: value.to_string(),
        }
    }
}

impl ValueCodec for UnionCodec {
    fn to_generic(&self, value: &TypedValue) -> CodecResult<Value> {
        // A tagged union value goes straight to its member codec.
        if let TypedValue::Union {
            type_token,
            member,
            value: inner,
        } = value
        {
            if *type_token == self.type_token {
                let codec = self
                    .members
                    .iter()
                    .find(|(name, _)| name == member)
                    .map(|(_, codec)| codec)
                    .ok_or_else(|| self.no_match(value))?;
                return codec.to_generic(inner);
            }
        }
        for (_, codec) in &self.members {
            if let Ok(generic) = codec.to_generic(value) {
                return Ok(generic);
            }
        }
        Err(self.no_match(value))
    }

    fn to_typed(&self, value: &Value) -> CodecResult<TypedValue> {
        for (name, codec) in &self.members {
            if let Ok(typed) = codec.to_typed(value) {
                return Ok(TypedValue::Union {
                    type_token: self.type_token.clone(),
                    member: name.clone(),
                    value: Box::new(typed),
                });
            }
        }
        Err(self.no_match(value))
    }
}
