//! Schema-context-scoped codecs: identity references and structural
//! references. Both are rebuilt per codec tree; they are never cached across
//! schema contexts.

use std::sync::Arc;

use crate::errors::{CodecError, CodecResult};
use crate::model::qname::QName;
use crate::model::registry::{TypeKind, TypeRegistry, TypeToken};
use crate::model::schema::SchemaContext;
use crate::model::typed::TypedValue;
use crate::model::value::Value;
use crate::path::reference::PathReferenceCodec;
use crate::value::ValueCodec;

/// Codec for one identityref leaf: the identity's qualified name on the
/// generic side, the generated marker type on the typed side. Values must
/// derive from the leaf's declared base identity.
pub struct IdentityRefCodec {
    type_token: TypeToken,
    base: QName,
    schema: Arc<SchemaContext>,
    registry: Arc<TypeRegistry>,
}

impl IdentityRefCodec {
    pub fn new(
        type_token: TypeToken,
        base: QName,
        schema: Arc<SchemaContext>,
        registry: Arc<TypeRegistry>,
    ) -> Self {
        Self {
            type_token,
            base,
            schema,
            registry,
        }
    }

    fn unresolvable(&self, reference: impl ToString) -> CodecError {
        CodecError::UnresolvableReference {
            reference: reference.to_string(),
        }
    }
}

impl ValueCodec for IdentityRefCodec {
    fn to_generic(&self, value: &TypedValue) -> CodecResult<Value> {
        let TypedValue::Identity { type_token } = value else {
            return Err(CodecError::InvalidValue {
                type_name: self.type_token.to_string(),
                value: value.to_string(),
                allowed: vec![format!("identity derived from {}", self.base)],
            });
        };
        let descriptor = self
            .registry
            .get(type_token)
            .ok_or_else(|| self.unresolvable(type_token))?;
        let TypeKind::Identity { qname } = descriptor.kind() else {
            return Err(self.unresolvable(type_token));
        };
        if !self.schema.identity_derives_from(qname, &self.base) {
            return Err(self.unresolvable(qname));
        }
        Ok(Value::Identity(qname.clone()))
    }

    fn to_typed(&self, value: &Value) -> CodecResult<TypedValue> {
        let Value::Identity(qname) = value else {
            return Err(CodecError::InvalidValue {
                type_name: self.type_token.to_string(),
                value: value.to_string(),
                allowed: vec![format!("identity derived from {}", self.base)],
            });
        };
        if self.schema.identity(qname).is_none() {
            return Err(self.unresolvable(qname));
        }
        if !self.schema.identity_derives_from(qname, &self.base) {
            return Err(self.unresolvable(qname));
        }
        let type_token = self
            .registry
            .identity_token(qname)
            .ok_or_else(|| self.unresolvable(qname))?;
        Ok(TypedValue::Identity { type_token })
    }
}

/// Codec for one instance-identifier leaf, delegating the path conversion to
/// the codec tree's reference codec.
pub struct ReferenceValueCodec {
    paths: Arc<dyn PathReferenceCodec>,
}

impl ReferenceValueCodec {
    pub fn new(paths: Arc<dyn PathReferenceCodec>) -> Self {
        Self { paths }
    }
}

impl ValueCodec for ReferenceValueCodec {
    fn to_generic(&self, value: &TypedValue) -> CodecResult<Value> {
        let TypedValue::Reference(path) = value else {
            return Err(CodecError::InvalidValue {
                type_name: "instance-identifier".to_string(),
                value: value.to_string(),
                allowed: vec!["structural reference".to_string()],
            });
        };
        Ok(Value::Path(self.paths.to_generic_path(path)?))
    }

    fn to_typed(&self, value: &Value) -> CodecResult<TypedValue> {
        let Value::Path(path) = value else {
            return Err(CodecError::InvalidValue {
                type_name: "instance-identifier".to_string(),
                value: value.to_string(),
                allowed: vec!["structural reference".to_string()],
            });
        };
        Ok(TypedValue::Reference(self.paths.to_typed_path(path)?))
    }
}
