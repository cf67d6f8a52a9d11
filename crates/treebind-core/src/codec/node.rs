//! Codec context nodes: the per-schema-node dispatch points of the tree.
//!
//! Each data-object context owns a leaf-child table and lazily built indexes
//! of its non-leaf children, keyed by accessor name, by schema qname and by
//! child type token. Indexes only ever grow; a lookup that misses a ready
//! index triggers exactly one structural reload (which is how lazily
//! registered augmentations and cases become visible) before reporting
//! not-found.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use crate::codec::augment;
use crate::codec::choice::ChoiceCodecNode;
use crate::codec::TreeCtx;
use crate::errors::{CodecError, CodecResult};
use crate::model::path::AugmentId;
use crate::model::qname::QName;
use crate::model::registry::{
    Accessor, AccessorShape, TypeDescriptor, TypeKind, TypeToken, ValueShape,
};
use crate::model::schema::{SchemaKind, SchemaNode, SchemaType};
use crate::model::value::Value;
use crate::path::key::ListKeyCodec;
use crate::value::ValueCodec;

/// One resolved child context.
#[derive(Clone)]
pub enum CodecNode {
    Object(Arc<DataObjectNode>),
    Choice(Arc<ChoiceCodecNode>),
    Leaf(Arc<LeafCodecNode>),
    LeafList(Arc<LeafListCodecNode>),
}

/// Context of one leaf child: its value codec plus the schema default.
pub struct LeafCodecNode {
    pub qname: QName,
    pub accessor: Arc<str>,
    pub codec: Arc<dyn ValueCodec>,
    pub default: Option<Value>,
}

/// Context of one leaf-list child.
pub struct LeafListCodecNode {
    pub qname: QName,
    pub accessor: Arc<str>,
    pub codec: Arc<dyn ValueCodec>,
    pub user_ordered: bool,
}

/// Structural role of a data-object context.
pub enum ObjectShape {
    Container {
        presence: bool,
    },
    ListEntry {
        key: Option<Arc<ListKeyCodec>>,
        user_ordered: bool,
    },
    Case {
        choice: TypeToken,
    },
    Augmentation {
        id: AugmentId,
    },
}

#[derive(Default, PartialEq)]
enum IndexState {
    #[default]
    Uninitialized,
    Ready,
}

#[derive(Default)]
struct ChildIndex {
    state: IndexState,
    by_accessor: HashMap<Arc<str>, CodecNode>,
    by_qname: HashMap<QName, CodecNode>,
    by_token: HashMap<TypeToken, CodecNode>,
    /// Case token to the choice child owning the case.
    case_routes: HashMap<TypeToken, Arc<ChoiceCodecNode>>,
    augments: HashMap<AugmentId, Arc<DataObjectNode>>,
    augments_by_token: HashMap<TypeToken, Arc<DataObjectNode>>,
}

/// Codec context of one data object: container, list entry, case or
/// augmentation.
pub struct DataObjectNode {
    ctx: Arc<TreeCtx>,
    descriptor: Arc<TypeDescriptor>,
    schema: Arc<SchemaNode>,
    shape: ObjectShape,
    index: RwLock<ChildIndex>,
}

impl DataObjectNode {
    pub(crate) fn new(
        ctx: Arc<TreeCtx>,
        descriptor: Arc<TypeDescriptor>,
        schema: Arc<SchemaNode>,
    ) -> CodecResult<Arc<Self>> {
        let shape = match descriptor.kind() {
            TypeKind::Container { .. } => ObjectShape::Container {
                presence: matches!(schema.kind(), SchemaKind::Container { presence: true }),
            },
            TypeKind::ListEntry { key, .. } => {
                let user_ordered =
                    matches!(schema.kind(), SchemaKind::List { user_ordered: true, .. });
                let key = match key {
                    Some(key_token) => Some(Arc::new(build_key_codec(
                        &ctx,
                        &descriptor,
                        &schema,
                        key_token,
                    )?)),
                    None => None,
                };
                ObjectShape::ListEntry { key, user_ordered }
            }
            TypeKind::Case { choice, .. } => ObjectShape::Case {
                choice: choice.clone(),
            },
            TypeKind::Augmentation { .. } => ObjectShape::Augmentation {
                id: augment::identifier(&descriptor),
            },
            other => {
                return Err(CodecError::IncorrectNesting {
                    child: format!("{other:?}"),
                    parent: "data object context".to_string(),
                })
            }
        };
        Ok(Arc::new(Self {
            ctx,
            descriptor,
            schema,
            shape,
            index: RwLock::new(ChildIndex::default()),
        }))
    }

    pub fn token(&self) -> &TypeToken {
        self.descriptor.token()
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    pub fn schema(&self) -> &Arc<SchemaNode> {
        &self.schema
    }

    pub fn shape(&self) -> &ObjectShape {
        &self.shape
    }

    /// The schema node this context binds, absent only for augmentations.
    pub fn qname(&self) -> Option<&QName> {
        self.descriptor.qname()
    }

    /// True for containers whose presence itself carries meaning.
    pub fn is_presence(&self) -> bool {
        matches!(self.shape, ObjectShape::Container { presence: true })
    }

    pub fn key_codec(&self) -> Option<&Arc<ListKeyCodec>> {
        match &self.shape {
            ObjectShape::ListEntry { key, .. } => key.as_ref(),
            _ => None,
        }
    }

    pub fn augment_id(&self) -> Option<&AugmentId> {
        match &self.shape {
            ObjectShape::Augmentation { id } => Some(id),
            _ => None,
        }
    }

    // --- lookups -----------------------------------------------------

    /// Child context for streaming a typed child of this object: a direct
    /// child by type token, or a registered augmentation of this type.
    pub fn stream_child(&self, token: &TypeToken) -> CodecResult<CodecNode> {
        let found = self.lookup(|index| {
            index.by_token.get(token).cloned().or_else(|| {
                index
                    .augments_by_token
                    .get(token)
                    .cloned()
                    .map(CodecNode::Object)
            })
        });
        match found {
            Some(node) => Ok(node),
            None => Err(self.not_a_child(token)),
        }
    }

    /// Child context by schema qname; lists resolve to their entry context.
    pub fn child_by_qname(&self, qname: &QName) -> Option<CodecNode> {
        self.lookup(|index| index.by_qname.get(qname).cloned())
    }

    pub fn child_by_accessor(&self, name: &str) -> Option<CodecNode> {
        self.lookup(|index| index.by_accessor.get(name).cloned())
    }

    /// The choice child owning `case_token`, when the case belongs to one of
    /// this object's choices.
    pub fn choice_for_case(&self, case_token: &TypeToken) -> Option<Arc<ChoiceCodecNode>> {
        self.lookup(|index| index.case_routes.get(case_token).cloned())
    }

    pub fn augment_by_id(&self, id: &AugmentId) -> Option<Arc<DataObjectNode>> {
        self.lookup(|index| index.augments.get(id).cloned())
    }

    /// All choice children of this object.
    pub fn choices(&self) -> Vec<Arc<ChoiceCodecNode>> {
        self.ensure_loaded();
        self.index
            .read()
            .by_accessor
            .values()
            .filter_map(|node| match node {
                CodecNode::Choice(choice) => Some(choice.clone()),
                _ => None,
            })
            .collect()
    }

    /// All currently known augmentations, in sorted token order.
    pub fn augmentations(&self) -> Vec<Arc<DataObjectNode>> {
        self.ensure_loaded();
        let index = self.index.read();
        let mut nodes: Vec<Arc<DataObjectNode>> = index.augments.values().cloned().collect();
        nodes.sort_by(|a, b| a.token().cmp(b.token()));
        nodes
    }

    fn not_a_child(&self, token: &TypeToken) -> CodecError {
        if let Some(descriptor) = self.ctx.registry.get(token) {
            if !self.ctx.schema.has_module(descriptor.module()) {
                return CodecError::MissingSchema {
                    module: descriptor.module().to_string(),
                };
            }
        }
        CodecError::IncorrectNesting {
            child: token.to_string(),
            parent: self.token().to_string(),
        }
    }

    /// Check-index, reload once, check again.
    fn lookup<T>(&self, find: impl Fn(&ChildIndex) -> Option<T>) -> Option<T> {
        {
            let index = self.index.read();
            if index.state == IndexState::Ready {
                if let Some(found) = find(&index) {
                    return Some(found);
                }
            }
        }
        self.reload();
        find(&self.index.read())
    }

    fn ensure_loaded(&self) {
        if self.index.read().state == IndexState::Ready {
            return;
        }
        self.reload();
    }

    /// Rebuilds the child indexes, merging monotonically: entries already
    /// present are never replaced or removed.
    fn reload(&self) {
        let mut index = self.index.write();
        self.populate(&mut index);
        index.state = IndexState::Ready;
    }

    fn populate(&self, index: &mut ChildIndex) {
        for accessor in self.descriptor.accessors() {
            if index.by_accessor.contains_key(&accessor.name) {
                continue;
            }
            match self.build_child(accessor) {
                Ok(Some(node)) => self.insert_child(index, accessor, node),
                Ok(None) => {}
                Err(error) => {
                    trace!(
                        parent = %self.token(),
                        accessor = %accessor.name,
                        %error,
                        "child context not resolvable yet"
                    );
                }
            }
        }
        for (id, node) in augment::discover(&self.ctx, self.token(), &self.schema) {
            if index.augments.contains_key(&id) {
                continue;
            }
            index
                .augments_by_token
                .insert(node.token().clone(), node.clone());
            index.augments.insert(id, node);
        }
    }

    fn insert_child(&self, index: &mut ChildIndex, accessor: &Accessor, node: CodecNode) {
        if let CodecNode::Choice(choice) = &node {
            for case in self.ctx.registry.cases_bound_to(choice.token()) {
                index
                    .case_routes
                    .entry(case.token().clone())
                    .or_insert_with(|| choice.clone());
            }
        }
        let token = match &node {
            CodecNode::Object(object) => Some(object.token().clone()),
            CodecNode::Choice(choice) => Some(choice.token().clone()),
            CodecNode::Leaf(_) | CodecNode::LeafList(_) => None,
        };
        if let Some(token) = token {
            index.by_token.entry(token).or_insert_with(|| node.clone());
        }
        index
            .by_qname
            .entry(accessor.qname.clone())
            .or_insert_with(|| node.clone());
        index.by_accessor.insert(accessor.name.clone(), node);
    }

    fn build_child(&self, accessor: &Accessor) -> CodecResult<Option<CodecNode>> {
        let Some(schema_child) = self.schema.child(&accessor.qname) else {
            return Ok(None);
        };
        let node = match &accessor.shape {
            AccessorShape::Leaf { value } => {
                let value_type = leaf_type(schema_child)?;
                let codec = self.ctx.resolver().resolve(&value_type, value)?;
                CodecNode::Leaf(Arc::new(LeafCodecNode {
                    qname: accessor.qname.clone(),
                    accessor: accessor.name.clone(),
                    codec,
                    default: schema_child.default_value().cloned(),
                }))
            }
            AccessorShape::LeafList { value } => {
                let value_type = leaf_type(schema_child)?;
                let codec = self.ctx.resolver().resolve(&value_type, value)?;
                CodecNode::LeafList(Arc::new(LeafListCodecNode {
                    qname: accessor.qname.clone(),
                    accessor: accessor.name.clone(),
                    codec,
                    user_ordered: matches!(
                        schema_child.kind(),
                        SchemaKind::LeafList {
                            user_ordered: true,
                            ..
                        }
                    ),
                }))
            }
            AccessorShape::Container { type_token } | AccessorShape::List { entry: type_token } => {
                let descriptor = self.require_descriptor(type_token)?;
                CodecNode::Object(DataObjectNode::new(
                    self.ctx.clone(),
                    descriptor,
                    schema_child.clone(),
                )?)
            }
            AccessorShape::Choice { type_token } => {
                let descriptor = self.require_descriptor(type_token)?;
                CodecNode::Choice(ChoiceCodecNode::new(
                    self.ctx.clone(),
                    descriptor,
                    schema_child.clone(),
                )?)
            }
        };
        Ok(Some(node))
    }

    fn require_descriptor(&self, token: &TypeToken) -> CodecResult<Arc<TypeDescriptor>> {
        self.ctx
            .registry
            .get(token)
            .ok_or_else(|| CodecError::UnresolvableReference {
                reference: token.to_string(),
            })
    }
}

fn leaf_type(schema: &SchemaNode) -> CodecResult<SchemaType> {
    schema
        .value_type()
        .cloned()
        .ok_or_else(|| CodecError::IncorrectNesting {
            child: schema.qname().to_string(),
            parent: "leaf context".to_string(),
        })
}

fn build_key_codec(
    ctx: &Arc<TreeCtx>,
    entry: &TypeDescriptor,
    schema: &SchemaNode,
    key_token: &TypeToken,
) -> CodecResult<ListKeyCodec> {
    let key_descriptor =
        ctx.registry
            .get(key_token)
            .ok_or_else(|| CodecError::UnresolvableReference {
                reference: key_token.to_string(),
            })?;
    let TypeKind::Key { fields, .. } = key_descriptor.kind() else {
        return Err(CodecError::IncorrectNesting {
            child: key_token.to_string(),
            parent: entry.token().to_string(),
        });
    };
    let mut resolved = Vec::with_capacity(fields.len());
    for field in fields {
        let leaf =
            schema
                .child(&field.qname)
                .ok_or_else(|| CodecError::UnresolvableReference {
                    reference: field.qname.to_string(),
                })?;
        let value_type = leaf_type(leaf)?;
        let shape = entry
            .accessor(&field.name)
            .map(|accessor| match &accessor.shape {
                AccessorShape::Leaf { value } => value.clone(),
                _ => ValueShape::Builtin,
            })
            .unwrap_or(ValueShape::Builtin);
        let codec = ctx.resolver().resolve(&value_type, &shape)?;
        resolved.push((field.clone(), codec));
    }
    ListKeyCodec::new(key_token.clone(), schema.key_order(), resolved)
}
