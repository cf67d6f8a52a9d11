//! List key codec: typed key objects to generic key predicates.
//!
//! The two sides disagree on field order. Generic predicates follow the
//! schema-declared key order; the generated key constructor takes its
//! arguments alphabetically by accessor name. The codec computes the
//! permutation between the two once, at construction.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::errors::{CodecError, CodecResult};
use crate::model::qname::QName;
use crate::model::registry::{KeyField, TypeToken};
use crate::model::typed::{ListKey, TypedValue};
use crate::model::value::Value;
use crate::value::ValueCodec;

/// Codec for the key of one keyed list.
pub struct ListKeyCodec {
    key_token: TypeToken,
    /// Key fields in constructor (alphabetical) order, with their codecs.
    fields: Vec<(KeyField, Arc<dyn ValueCodec>)>,
    /// For each schema-order position, the constructor-order index.
    schema_to_ctor: Vec<usize>,
}

impl ListKeyCodec {
    /// Builds the codec from the schema's declared key order and the key
    /// descriptor's constructor-order fields. Every declared key must have
    /// exactly one constructor field and vice versa.
    pub fn new(
        key_token: TypeToken,
        schema_order: &[QName],
        fields: Vec<(KeyField, Arc<dyn ValueCodec>)>,
    ) -> CodecResult<Self> {
        if schema_order.len() != fields.len() {
            return Err(CodecError::InvalidValue {
                type_name: key_token.to_string(),
                value: format!("{} key fields", fields.len()),
                allowed: vec![format!("{} declared keys", schema_order.len())],
            });
        }
        let mut schema_to_ctor = Vec::with_capacity(schema_order.len());
        for declared in schema_order {
            let position = fields
                .iter()
                .position(|(field, _)| &field.qname == declared)
                .ok_or_else(|| CodecError::InvalidValue {
                    type_name: key_token.to_string(),
                    value: declared.to_string(),
                    allowed: fields
                        .iter()
                        .map(|(field, _)| field.qname.to_string())
                        .collect(),
                })?;
            schema_to_ctor.push(position);
        }
        Ok(Self {
            key_token,
            fields,
            schema_to_ctor,
        })
    }

    pub fn key_token(&self) -> &TypeToken {
        &self.key_token
    }

    /// Accessor names of the key fields, in constructor order.
    pub fn field_names(&self) -> impl Iterator<Item = &Arc<str>> + '_ {
        self.fields.iter().map(|(field, _)| &field.name)
    }

    /// Serializes a typed key into generic predicates, iterating the
    /// constructor-order fields.
    pub fn to_generic(&self, key: &ListKey) -> CodecResult<BTreeMap<QName, Value>> {
        if key.type_token() != &self.key_token || key.fields().len() != self.fields.len() {
            return Err(self.shape_mismatch(key));
        }
        let mut predicates = BTreeMap::new();
        for (field, codec) in &self.fields {
            let value = key
                .get(&field.name)
                .ok_or_else(|| self.shape_mismatch(key))?;
            predicates.insert(field.qname.clone(), codec.to_generic(value)?);
        }
        Ok(predicates)
    }

    /// Deserializes generic predicates into a typed key, reading the
    /// predicates in schema order and assembling the constructor argument
    /// list through the precomputed permutation.
    pub fn to_typed(&self, predicates: &BTreeMap<QName, Value>) -> CodecResult<ListKey> {
        if predicates.len() != self.fields.len() {
            return Err(CodecError::InvalidValue {
                type_name: self.key_token.to_string(),
                value: format!("{} predicates", predicates.len()),
                allowed: vec![format!("{} declared keys", self.fields.len())],
            });
        }
        let mut arguments: Vec<Option<(Arc<str>, TypedValue)>> = vec![None; self.fields.len()];
        for ctor_index in &self.schema_to_ctor {
            let (field, codec) = &self.fields[*ctor_index];
            let value =
                predicates
                    .get(&field.qname)
                    .ok_or_else(|| CodecError::InvalidValue {
                        type_name: self.key_token.to_string(),
                        value: format!("missing predicate {}", field.qname),
                        allowed: self
                            .fields
                            .iter()
                            .map(|(f, _)| f.qname.to_string())
                            .collect(),
                    })?;
            arguments[*ctor_index] = Some((field.name.clone(), codec.to_typed(value)?));
        }
        let fields: Vec<(Arc<str>, TypedValue)> = arguments.into_iter().flatten().collect();
        Ok(ListKey::new(self.key_token.clone(), fields))
    }

    fn shape_mismatch(&self, key: &ListKey) -> CodecError {
        CodecError::InvalidValue {
            type_name: self.key_token.to_string(),
            value: format!("{key:?}"),
            allowed: self
                .fields
                .iter()
                .map(|(field, _)| field.name.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::qname::ModuleId;
    use crate::value::BuiltinCodec;

    fn qname(local: &str) -> QName {
        QName::new(ModuleId::new("urn:test", None), local)
    }

    fn field(name: &str) -> (KeyField, Arc<dyn ValueCodec>) {
        (
            KeyField {
                name: Arc::from(name),
                qname: qname(name),
            },
            Arc::new(BuiltinCodec),
        )
    }

    /// Declared key order "serial id name"; constructor order is
    /// alphabetical: id, name, serial.
    fn codec() -> ListKeyCodec {
        ListKeyCodec::new(
            TypeToken::new("PortKey"),
            &[qname("serial"), qname("id"), qname("name")],
            vec![field("id"), field("name"), field("serial")],
        )
        .unwrap()
    }

    #[test]
    fn permutation_bridges_the_two_orders() {
        let codec = codec();
        let mut predicates = BTreeMap::new();
        predicates.insert(qname("serial"), Value::string("SN-1"));
        predicates.insert(qname("id"), Value::Int32(4));
        predicates.insert(qname("name"), Value::string("eth0"));

        let key = codec.to_typed(&predicates).unwrap();
        let names: Vec<&str> = key.fields().iter().map(|(n, _)| &**n).collect();
        assert_eq!(names, ["id", "name", "serial"]);
        assert_eq!(key.get("serial"), Some(&TypedValue::string("SN-1")));

        assert_eq!(codec.to_generic(&key).unwrap(), predicates);
    }

    #[test]
    fn missing_predicate_is_rejected() {
        let codec = codec();
        let mut predicates = BTreeMap::new();
        predicates.insert(qname("id"), Value::Int32(4));
        let err = codec.to_typed(&predicates).unwrap_err();
        assert!(matches!(err, CodecError::InvalidValue { .. }));
    }

    #[test]
    fn extra_predicate_is_rejected() {
        let codec = codec();
        let mut predicates = BTreeMap::new();
        predicates.insert(qname("serial"), Value::string("SN-1"));
        predicates.insert(qname("id"), Value::Int32(4));
        predicates.insert(qname("name"), Value::string("eth0"));
        predicates.insert(qname("extra"), Value::Bool(true));
        assert!(codec.to_typed(&predicates).is_err());
    }

    #[test]
    fn mismatched_declaration_fails_construction() {
        let err = ListKeyCodec::new(
            TypeToken::new("PortKey"),
            &[qname("serial")],
            vec![field("id"), field("serial")],
        )
        .err()
        .unwrap();
        assert!(matches!(err, CodecError::InvalidValue { .. }));
    }
}
