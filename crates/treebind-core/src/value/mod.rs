//! The value codec library: bidirectional converters between generic scalar
//! values and their typed counterparts.
//!
//! Codecs are resolved from a (schema type, accessor value shape) pair. The
//! schema-independent codecs (enumeration, bits, union, derived scalar) are
//! cached for the process lifetime keyed by the generated type token; the
//! schema-context-scoped codecs (identityref, structural reference) are
//! rebuilt per codec tree.

mod bits;
mod derived;
mod enumeration;
mod identity;
mod union;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::{CodecError, CodecResult};
use crate::model::registry::{TypeKind, TypeRegistry, TypeToken, ValueShape};
use crate::model::schema::{SchemaContext, SchemaType};
use crate::model::typed::TypedValue;
use crate::model::value::Value;

pub use bits::BitsCodec;
pub use derived::DerivedCodec;
pub use enumeration::EnumCodec;
pub use identity::{IdentityRefCodec, ReferenceValueCodec};
pub use union::UnionCodec;

/// A bidirectional scalar converter.
///
/// Both directions are total functions of their input except for
/// structurally invalid values, which fail with a conversion-level error
/// naming the offending value.
pub trait ValueCodec: Send + Sync {
    fn to_generic(&self, value: &TypedValue) -> CodecResult<Value>;
    fn to_typed(&self, value: &Value) -> CodecResult<TypedValue>;
}

/// Pass-through codec for primitive scalars: the generic and typed
/// representations coincide.
pub struct BuiltinCodec;

impl ValueCodec for BuiltinCodec {
    fn to_generic(&self, value: &TypedValue) -> CodecResult<Value> {
        Ok(match value {
            TypedValue::Bool(v) => Value::Bool(*v),
            TypedValue::Int8(v) => Value::Int8(*v),
            TypedValue::Int16(v) => Value::Int16(*v),
            TypedValue::Int32(v) => Value::Int32(*v),
            TypedValue::Int64(v) => Value::Int64(*v),
            TypedValue::Uint8(v) => Value::Uint8(*v),
            TypedValue::Uint16(v) => Value::Uint16(*v),
            TypedValue::Uint32(v) => Value::Uint32(*v),
            TypedValue::Uint64(v) => Value::Uint64(*v),
            TypedValue::Decimal(v) => Value::Decimal(*v),
            TypedValue::String(v) => Value::String(v.clone()),
            TypedValue::Binary(v) => Value::Binary(v.clone()),
            TypedValue::Empty => Value::Empty,
            other => {
                return Err(CodecError::InvalidValue {
                    type_name: "builtin".to_string(),
                    value: other.to_string(),
                    allowed: vec!["primitive scalar".to_string()],
                })
            }
        })
    }

    fn to_typed(&self, value: &Value) -> CodecResult<TypedValue> {
        Ok(match value {
            Value::Bool(v) => TypedValue::Bool(*v),
            Value::Int8(v) => TypedValue::Int8(*v),
            Value::Int16(v) => TypedValue::Int16(*v),
            Value::Int32(v) => TypedValue::Int32(*v),
            Value::Int64(v) => TypedValue::Int64(*v),
            Value::Uint8(v) => TypedValue::Uint8(*v),
            Value::Uint16(v) => TypedValue::Uint16(*v),
            Value::Uint32(v) => TypedValue::Uint32(*v),
            Value::Uint64(v) => TypedValue::Uint64(*v),
            Value::Decimal(v) => TypedValue::Decimal(*v),
            Value::String(v) => TypedValue::String(v.clone()),
            Value::Binary(v) => TypedValue::Binary(v.clone()),
            Value::Empty => TypedValue::Empty,
            other => {
                return Err(CodecError::InvalidValue {
                    type_name: "builtin".to_string(),
                    value: other.to_string(),
                    allowed: vec!["primitive scalar".to_string()],
                })
            }
        })
    }
}

/// Process-lifetime cache of token-keyed value codecs.
///
/// The cached codecs depend only on the generated type's descriptor, never
/// on the active schema context, so they survive schema reloads.
#[derive(Default)]
pub struct ValueCodecCache {
    codecs: RwLock<HashMap<TypeToken, Arc<dyn ValueCodec>>>,
}

impl ValueCodecCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build<F>(&self, token: &TypeToken, build: F) -> CodecResult<Arc<dyn ValueCodec>>
    where
        F: FnOnce() -> CodecResult<Arc<dyn ValueCodec>>,
    {
        if let Some(found) = self.codecs.read().get(token) {
            return Ok(found.clone());
        }
        let built = build()?;
        let mut codecs = self.codecs.write();
        // Race losers adopt the winner.
        Ok(codecs.entry(token.clone()).or_insert(built).clone())
    }
}

/// Resolution context tying the token-keyed cache to the active schema.
pub struct ValueCodecResolver {
    registry: Arc<TypeRegistry>,
    schema: Arc<SchemaContext>,
    cache: Arc<ValueCodecCache>,
    reference: Arc<dyn ValueCodec>,
}

impl ValueCodecResolver {
    pub fn new(
        registry: Arc<TypeRegistry>,
        schema: Arc<SchemaContext>,
        cache: Arc<ValueCodecCache>,
        reference: Arc<dyn ValueCodec>,
    ) -> Self {
        Self {
            registry,
            schema,
            cache,
            reference,
        }
    }

    /// Resolves the codec for one leaf or leaf-list value.
    pub fn resolve(
        &self,
        schema_type: &SchemaType,
        shape: &ValueShape,
    ) -> CodecResult<Arc<dyn ValueCodec>> {
        match shape {
            ValueShape::Builtin => Ok(Arc::new(BuiltinCodec)),
            ValueShape::Typed(token) => self.resolve_typed(schema_type, token),
        }
    }

    fn resolve_typed(
        &self,
        schema_type: &SchemaType,
        token: &TypeToken,
    ) -> CodecResult<Arc<dyn ValueCodec>> {
        // Schema-scoped codecs bypass the process-lifetime cache.
        match schema_type {
            SchemaType::IdentityRef { base } => {
                return Ok(Arc::new(IdentityRefCodec::new(
                    token.clone(),
                    base.clone(),
                    self.schema.clone(),
                    self.registry.clone(),
                )));
            }
            SchemaType::InstanceIdentifier => return Ok(self.reference.clone()),
            _ => {}
        }

        self.cache.get_or_build(token, || {
            let descriptor =
                self.registry
                    .get(token)
                    .ok_or_else(|| CodecError::UnresolvableReference {
                        reference: token.to_string(),
                    })?;
            Ok(match descriptor.kind() {
                TypeKind::Enum { variants } => {
                    Arc::new(EnumCodec::new(token.clone(), variants.clone()))
                }
                TypeKind::Bits { fields } => {
                    Arc::new(BitsCodec::new(token.clone(), fields.clone()))
                }
                TypeKind::Union { members } => {
                    let member_types = match schema_type {
                        SchemaType::Union { members } => members.as_slice(),
                        _ => &[],
                    };
                    Arc::new(self.build_union(token, members, member_types)?)
                }
                TypeKind::Scalar { constraints } => Arc::new(DerivedCodec::new(
                    token.clone(),
                    constraints.clone(),
                    Arc::new(BuiltinCodec),
                )),
                other => {
                    return Err(CodecError::InvalidValue {
                        type_name: token.to_string(),
                        value: format!("{other:?}"),
                        allowed: vec![
                            "enumeration".to_string(),
                            "bits".to_string(),
                            "union".to_string(),
                            "derived scalar".to_string(),
                        ],
                    })
                }
            })
        })
    }

    fn build_union(
        &self,
        token: &TypeToken,
        members: &[crate::model::registry::UnionMember],
        member_types: &[SchemaType],
    ) -> CodecResult<UnionCodec> {
        let mut resolved = Vec::with_capacity(members.len());
        for (index, member) in members.iter().enumerate() {
            let member_type = member_types.get(index).unwrap_or(&SchemaType::String);
            let codec = self.resolve(member_type, &member.value)?;
            resolved.push((member.name.clone(), codec));
        }
        Ok(UnionCodec::new(token.clone(), resolved))
    }

}
