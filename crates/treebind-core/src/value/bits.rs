//! Bit-field codec: set-of-names to a fully populated boolean record.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::errors::{CodecError, CodecResult};
use crate::model::registry::{BitField, TypeToken};
use crate::model::typed::TypedValue;
use crate::model::value::Value;
use crate::value::ValueCodec;

/// Codec for one generated bits type. The typed record carries every member
/// in canonical alphabetical order, explicitly true or false; the generic
/// value carries only the set names.
pub struct BitsCodec {
    type_token: TypeToken,
    by_bit: HashMap<Arc<str>, Arc<str>>,
    by_field: HashMap<Arc<str>, Arc<str>>,
    field_names: Vec<Arc<str>>,
}

impl BitsCodec {
    pub fn new(type_token: TypeToken, fields: Vec<BitField>) -> Self {
        let mut by_bit = HashMap::with_capacity(fields.len());
        let mut by_field = HashMap::with_capacity(fields.len());
        let mut field_names: Vec<Arc<str>> = Vec::with_capacity(fields.len());
        for field in fields {
            field_names.push(field.name.clone());
            by_bit.insert(field.bit.clone(), field.name.clone());
            by_field.insert(field.name, field.bit);
        }
        field_names.sort();
        Self {
            type_token,
            by_bit,
            by_field,
            field_names,
        }
    }

    fn invalid(&self, value: impl ToString) -> CodecError {
        CodecError::InvalidValue {
            type_name: self.type_token.to_string(),
            value: value.to_string(),
            allowed: self.by_bit.keys().map(|b| b.to_string()).collect(),
        }
    }
}

impl ValueCodec for BitsCodec {
    fn to_generic(&self, value: &TypedValue) -> CodecResult<Value> {
        let TypedValue::Bits { type_token, fields } = value else {
            return Err(self.invalid(value));
        };
        if *type_token != self.type_token {
            return Err(self.invalid(value));
        }
        let mut set = BTreeSet::new();
        for (name, on) in fields {
            let bit = self.by_field.get(name).ok_or_else(|| self.invalid(name))?;
            if *on {
                set.insert(bit.clone());
            }
        }
        Ok(Value::Bits(set))
    }

    fn to_typed(&self, value: &Value) -> CodecResult<TypedValue> {
        let Value::Bits(set) = value else {
            return Err(self.invalid(value));
        };
        // Any subset of declared bits is accepted; unknown names are not.
        let mut on = BTreeSet::new();
        for bit in set {
            let field = self.by_bit.get(bit).ok_or_else(|| self.invalid(bit))?;
            on.insert(field.clone());
        }
        let mut fields = BTreeMap::new();
        for name in &self.field_names {
            fields.insert(name.clone(), on.contains(name));
        }
        Ok(TypedValue::Bits {
            type_token: self.type_token.clone(),
            fields,
        })
    }
}
