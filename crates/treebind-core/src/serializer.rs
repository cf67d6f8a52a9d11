//! Streaming serialization of typed objects into generic trees.
//!
//! The walk is driven by the codec context, not the object: declared
//! accessors are visited in declaration order, then augmentations in sorted
//! token order, and every present value is emitted as stream events. Absent
//! accessors emit nothing; defaults are a read-side concern.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::codec::node::{CodecNode, DataObjectNode, ObjectShape};
use crate::errors::{CodecError, CodecResult};
use crate::model::node::GenericNode;
use crate::model::registry::{Accessor, AccessorShape};
use crate::model::stream::{build_tree, StreamWriter};
use crate::model::typed::{ListKey, TypedObject, TypedValue};

/// Serializes one typed object in the given codec context into a generic
/// tree.
pub fn serialize(node: &Arc<DataObjectNode>, object: &TypedObject) -> CodecResult<GenericNode> {
    build_tree(|writer| serialize_into(node, object, writer))
}

/// Serializes one typed object as stream events into `writer`.
pub fn serialize_into(
    node: &Arc<DataObjectNode>,
    object: &TypedObject,
    writer: &mut dyn StreamWriter,
) -> CodecResult<()> {
    if node.token() != object.type_token() {
        return Err(CodecError::IncorrectNesting {
            child: object.type_token().to_string(),
            parent: node.token().to_string(),
        });
    }
    open_frame(node, object, writer)?;
    write_body(node, object, writer)?;
    writer.end_node()
}

fn open_frame(
    node: &Arc<DataObjectNode>,
    object: &TypedObject,
    writer: &mut dyn StreamWriter,
) -> CodecResult<()> {
    match node.shape() {
        ObjectShape::Container { .. } => {
            let qname = require_qname(node)?;
            writer.start_container(qname.clone())
        }
        ObjectShape::ListEntry { key, .. } => {
            let qname = require_qname(node)?;
            let predicates = match key {
                Some(codec) => codec.to_generic(&entry_key(node, object)?)?,
                None => BTreeMap::new(),
            };
            writer.start_list_entry(qname.clone(), predicates)
        }
        ObjectShape::Augmentation { id } => writer.start_augmentation(id.clone()),
        // Cases only appear inside their choice frame.
        ObjectShape::Case { .. } => Err(CodecError::IncorrectNesting {
            child: node.token().to_string(),
            parent: "(root)".to_string(),
        }),
    }
}

fn write_body(
    node: &Arc<DataObjectNode>,
    object: &TypedObject,
    writer: &mut dyn StreamWriter,
) -> CodecResult<()> {
    for accessor in node.descriptor().accessors() {
        let Some(value) = object.field(&accessor.name) else {
            continue;
        };
        write_accessor(node, accessor, &value, writer)?;
    }
    // Augmentations last, in sorted token order.
    for (token, augment) in object.augments() {
        let child = node.stream_child(&token)?;
        let CodecNode::Object(augment_node) = child else {
            return Err(CodecError::IncorrectNesting {
                child: token.to_string(),
                parent: node.token().to_string(),
            });
        };
        serialize_into(&augment_node, &augment, writer)?;
    }
    Ok(())
}

fn write_accessor(
    node: &Arc<DataObjectNode>,
    accessor: &Accessor,
    value: &TypedValue,
    writer: &mut dyn StreamWriter,
) -> CodecResult<()> {
    let context = node
        .child_by_accessor(&accessor.name)
        .ok_or_else(|| mismatch(node, accessor))?;
    match (&accessor.shape, context) {
        (AccessorShape::Leaf { .. }, CodecNode::Leaf(leaf)) => {
            writer.leaf(accessor.qname.clone(), leaf.codec.to_generic(value)?)
        }
        (AccessorShape::LeafList { .. }, CodecNode::LeafList(leaf_list)) => {
            let TypedValue::LeafSet(entries) = value else {
                return Err(mismatch(node, accessor));
            };
            let mut encoded = Vec::with_capacity(entries.len());
            for entry in entries {
                encoded.push(leaf_list.codec.to_generic(entry)?);
            }
            writer.leaf_set(accessor.qname.clone(), encoded)
        }
        (AccessorShape::Container { .. }, CodecNode::Object(child)) => {
            let object = as_object(node, accessor, value)?;
            serialize_into(&child, object, writer)
        }
        (AccessorShape::List { .. }, CodecNode::Object(entry_context)) => {
            let TypedValue::List(entries) = value else {
                return Err(mismatch(node, accessor));
            };
            write_list(node, accessor, &entry_context, entries, writer)
        }
        (AccessorShape::Choice { .. }, CodecNode::Choice(choice)) => {
            let object = as_object(node, accessor, value)?;
            let case = choice.case_by_token(object.type_token()).ok_or_else(|| {
                CodecError::IncorrectNesting {
                    child: object.type_token().to_string(),
                    parent: choice.token().to_string(),
                }
            })?;
            writer.start_choice(choice.qname().clone())?;
            let case_qname = require_qname(&case)?;
            writer.start_case(case_qname.clone())?;
            write_body(&case, object, writer)?;
            writer.end_node()?;
            writer.end_node()
        }
        _ => Err(mismatch(node, accessor)),
    }
}

fn write_list(
    node: &Arc<DataObjectNode>,
    accessor: &Accessor,
    entry_context: &Arc<DataObjectNode>,
    entries: &[TypedValue],
    writer: &mut dyn StreamWriter,
) -> CodecResult<()> {
    match entry_context.shape() {
        ObjectShape::ListEntry {
            key: Some(_),
            user_ordered,
        } => writer.start_keyed_list(accessor.qname.clone(), *user_ordered)?,
        ObjectShape::ListEntry { key: None, .. } => {
            writer.start_unkeyed_list(accessor.qname.clone())?
        }
        _ => return Err(mismatch(node, accessor)),
    }
    for entry in entries {
        let object = as_object(node, accessor, entry)?;
        serialize_into(entry_context, object, writer)?;
    }
    writer.end_node()
}

/// Assembles the typed key of one list entry from its key accessor values.
fn entry_key(node: &Arc<DataObjectNode>, object: &TypedObject) -> CodecResult<ListKey> {
    let codec = node
        .key_codec()
        .ok_or_else(|| CodecError::IncorrectNesting {
            child: "key".to_string(),
            parent: node.token().to_string(),
        })?;
    let mut fields = Vec::new();
    for name in codec.field_names() {
        let value = object
            .field(name)
            .ok_or_else(|| CodecError::InvalidValue {
                type_name: node.token().to_string(),
                value: format!("missing key field {name}"),
                allowed: codec.field_names().map(|n| n.to_string()).collect(),
            })?;
        fields.push((name.clone(), value));
    }
    Ok(ListKey::new(codec.key_token().clone(), fields))
}

fn as_object<'a>(
    node: &Arc<DataObjectNode>,
    accessor: &Accessor,
    value: &'a TypedValue,
) -> CodecResult<&'a TypedObject> {
    value.as_object().ok_or_else(|| mismatch(node, accessor))
}

fn require_qname(node: &Arc<DataObjectNode>) -> CodecResult<&crate::model::qname::QName> {
    node.qname().ok_or_else(|| CodecError::IncorrectNesting {
        child: node.token().to_string(),
        parent: "(unnamed)".to_string(),
    })
}

fn mismatch(node: &Arc<DataObjectNode>, accessor: &Accessor) -> CodecError {
    CodecError::IncorrectNesting {
        child: accessor.qname.to_string(),
        parent: node.token().to_string(),
    }
}
