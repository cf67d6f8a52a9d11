//! The codec context tree: the bridge between typed paths/objects and the
//! generic tree, built lazily over one schema context and one type registry.
//!
//! Contexts are cached at every level. The root caches resolve top-level
//! types by token and by qname; every data-object context caches its child
//! contexts. All caches grow monotonically and are never invalidated; a
//! mismatch between registry and schema surfaces as an error, never as a
//! silently patched cache.

pub(crate) mod augment;
pub mod choice;
pub mod node;

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::errors::{CodecError, CodecResult};
use crate::model::node::GenericNode;
use crate::model::path::{GenericPath, PathSegment, TypedPath, TypedPathStep};
use crate::model::qname::QName;
use crate::model::registry::{TypeKind, TypeRegistry, TypeToken};
use crate::model::schema::SchemaContext;
use crate::model::typed::{TypedObject, TypedValue};
use crate::path::reference::TreeReference;
use crate::serializer;
use crate::value::{ReferenceValueCodec, ValueCodec, ValueCodecCache, ValueCodecResolver};
use crate::view::LazyView;

use choice::ChoiceCodecNode;
use node::{CodecNode, DataObjectNode, ObjectShape};

#[derive(Default)]
struct RootIndex {
    by_token: HashMap<TypeToken, CodecNode>,
    by_qname: HashMap<QName, CodecNode>,
}

/// Shared state of one codec tree.
pub(crate) struct TreeCtx {
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) schema: Arc<SchemaContext>,
    resolver: ValueCodecResolver,
    roots: RwLock<RootIndex>,
}

impl TreeCtx {
    pub(crate) fn resolver(&self) -> &ValueCodecResolver {
        &self.resolver
    }

    // --- root contexts ----------------------------------------------

    fn root_by_token(self: &Arc<Self>, token: &TypeToken) -> CodecResult<CodecNode> {
        if let Some(found) = self.roots.read().by_token.get(token) {
            return Ok(found.clone());
        }
        let built = self.build_root(token)?;
        let mut roots = self.roots.write();
        let node = roots
            .by_token
            .entry(token.clone())
            .or_insert(built)
            .clone();
        if let Some(qname) = node_qname(&node) {
            roots.by_qname.entry(qname).or_insert_with(|| node.clone());
        }
        Ok(node)
    }

    fn root_by_qname(self: &Arc<Self>, qname: &QName) -> CodecResult<CodecNode> {
        if let Some(found) = self.roots.read().by_qname.get(qname) {
            return Ok(found.clone());
        }
        let token = self.registry.token_for_qname(qname).ok_or_else(|| {
            if self.schema.has_module(qname.module()) {
                CodecError::IncorrectNesting {
                    child: qname.to_string(),
                    parent: "(root)".to_string(),
                }
            } else {
                CodecError::MissingSchema {
                    module: qname.module().to_string(),
                }
            }
        })?;
        self.root_by_token(&token)
    }

    fn build_root(self: &Arc<Self>, token: &TypeToken) -> CodecResult<CodecNode> {
        let descriptor =
            self.registry
                .get(token)
                .ok_or_else(|| CodecError::UnresolvableReference {
                    reference: token.to_string(),
                })?;
        if !self.schema.has_module(descriptor.module()) {
            return Err(CodecError::MissingSchema {
                module: descriptor.module().to_string(),
            });
        }
        let qname = descriptor
            .qname()
            .ok_or_else(|| CodecError::IncorrectNesting {
                child: token.to_string(),
                parent: "(root)".to_string(),
            })?;
        let schema_child =
            self.schema
                .root()
                .child(qname)
                .ok_or_else(|| CodecError::IncorrectNesting {
                    child: qname.to_string(),
                    parent: "(root)".to_string(),
                })?;
        Ok(match descriptor.kind() {
            TypeKind::Choice { .. } => CodecNode::Choice(ChoiceCodecNode::new(
                self.clone(),
                descriptor,
                schema_child.clone(),
            )?),
            _ => CodecNode::Object(DataObjectNode::new(
                self.clone(),
                descriptor,
                schema_child.clone(),
            )?),
        })
    }

    // --- typed path resolution --------------------------------------

    pub(crate) fn resolve_typed(
        self: &Arc<Self>,
        path: &TypedPath,
    ) -> CodecResult<(GenericPath, Option<CodecNode>)> {
        let mut generic = GenericPath::empty();
        let mut current: Option<CodecNode> = None;
        for step in path.steps() {
            let next = match &current {
                None => self.root_step(step, &mut generic)?,
                Some(CodecNode::Object(obj)) => self.object_step(obj, step, &mut generic)?,
                Some(other) => {
                    return Err(CodecError::IncorrectNesting {
                        child: step.type_token().to_string(),
                        parent: describe(other),
                    })
                }
            };
            current = Some(next);
        }
        Ok((generic, current))
    }

    fn root_step(
        self: &Arc<Self>,
        step: &TypedPathStep,
        generic: &mut GenericPath,
    ) -> CodecResult<CodecNode> {
        if let Some(case_token) = step.case() {
            let case_descriptor =
                self.registry
                    .get(case_token)
                    .ok_or_else(|| CodecError::UnresolvableReference {
                        reference: case_token.to_string(),
                    })?;
            let TypeKind::Case { choice, .. } = case_descriptor.kind() else {
                return Err(CodecError::IncorrectNesting {
                    child: case_token.to_string(),
                    parent: "(root)".to_string(),
                });
            };
            let CodecNode::Choice(choice_node) = self.root_by_token(choice)? else {
                return Err(CodecError::IncorrectNesting {
                    child: choice.to_string(),
                    parent: "(root)".to_string(),
                });
            };
            return self.case_step(&choice_node, case_token, step, generic);
        }
        let node = self.root_by_token(step.type_token())?;
        push_step_segments(step, &node, generic)?;
        Ok(node)
    }

    fn object_step(
        self: &Arc<Self>,
        obj: &Arc<DataObjectNode>,
        step: &TypedPathStep,
        generic: &mut GenericPath,
    ) -> CodecResult<CodecNode> {
        if let Some(case_token) = step.case() {
            let choice =
                obj.choice_for_case(case_token)
                    .ok_or_else(|| CodecError::IncorrectNesting {
                        child: case_token.to_string(),
                        parent: obj.token().to_string(),
                    })?;
            return self.case_step(&choice, case_token, step, generic);
        }
        match obj.stream_child(step.type_token()) {
            Ok(child) => {
                push_step_segments(step, &child, generic)?;
                Ok(child)
            }
            Err(miss) => {
                // The step may name a case child without naming its case.
                for choice in obj.choices() {
                    if let Some(case) = choice.case_for_child_token(step.type_token()) {
                        generic.push(PathSegment::Node(choice.qname().clone()));
                        let child = case.stream_child(step.type_token())?;
                        push_step_segments(step, &child, generic)?;
                        return Ok(child);
                    }
                }
                Err(miss)
            }
        }
    }

    fn case_step(
        self: &Arc<Self>,
        choice: &Arc<ChoiceCodecNode>,
        case_token: &TypeToken,
        step: &TypedPathStep,
        generic: &mut GenericPath,
    ) -> CodecResult<CodecNode> {
        generic.push(PathSegment::Node(choice.qname().clone()));
        let case = choice
            .case_by_token(case_token)
            .ok_or_else(|| CodecError::IncorrectNesting {
                child: case_token.to_string(),
                parent: choice.token().to_string(),
            })?;
        let child = case.stream_child(step.type_token())?;
        push_step_segments(step, &child, generic)?;
        Ok(child)
    }

    // --- generic path resolution ------------------------------------

    pub(crate) fn resolve_generic(
        self: &Arc<Self>,
        path: &GenericPath,
    ) -> CodecResult<(TypedPath, Option<CodecNode>)> {
        let mut typed = TypedPath::default();
        let mut cursor = Cursor::Root;
        let segments = path.segments();
        let mut i = 0;
        while i < segments.len() {
            match &segments[i] {
                PathSegment::Node(qname) => {
                    let (child, via_case) = match &cursor {
                        Cursor::Root => (self.root_by_qname(qname)?, None),
                        Cursor::Object(obj) => {
                            let child = obj.child_by_qname(qname).ok_or_else(|| {
                                self.classify_missing(obj.token(), qname)
                            })?;
                            (child, None)
                        }
                        Cursor::Choice(choice) => {
                            let case = choice.case_for_child_qname(qname).ok_or_else(|| {
                                CodecError::IncorrectNesting {
                                    child: qname.to_string(),
                                    parent: choice.token().to_string(),
                                }
                            })?;
                            let child = case.child_by_qname(qname).ok_or_else(|| {
                                CodecError::IncorrectNesting {
                                    child: qname.to_string(),
                                    parent: case.token().to_string(),
                                }
                            })?;
                            (child, Some(case.token().clone()))
                        }
                    };
                    match child {
                        CodecNode::Choice(choice) => {
                            // Mixin: no typed step.
                            cursor = Cursor::Choice(choice);
                            i += 1;
                        }
                        CodecNode::Object(obj) => {
                            let consumed = self.object_steps(
                                &obj,
                                qname,
                                segments.get(i + 1),
                                via_case,
                                &mut typed,
                            )?;
                            cursor = Cursor::Object(obj);
                            i += consumed;
                        }
                        CodecNode::Leaf(_) | CodecNode::LeafList(_) => {
                            return Err(CodecError::IncorrectNesting {
                                child: qname.to_string(),
                                parent: "typed path".to_string(),
                            });
                        }
                    }
                }
                PathSegment::Augment(id) => {
                    let Cursor::Object(obj) = &cursor else {
                        return Err(CodecError::IncorrectNesting {
                            child: id.to_string(),
                            parent: "typed path".to_string(),
                        });
                    };
                    let augment =
                        obj.augment_by_id(id)
                            .ok_or_else(|| CodecError::IncorrectNesting {
                                child: id.to_string(),
                                parent: obj.token().to_string(),
                            })?;
                    typed.push(TypedPathStep::new(augment.token().clone()));
                    cursor = Cursor::Object(augment);
                    i += 1;
                }
                other => {
                    // Entry segments are only consumed right behind their
                    // whole-collection segment.
                    return Err(CodecError::IncorrectNesting {
                        child: other.to_string(),
                        parent: "typed path".to_string(),
                    });
                }
            }
        }
        let node = match cursor {
            Cursor::Root => None,
            Cursor::Object(obj) => Some(CodecNode::Object(obj)),
            Cursor::Choice(choice) => Some(CodecNode::Choice(choice)),
        };
        Ok((typed, node))
    }

    /// Emits the typed step(s) for a data-object child, collapsing a
    /// list-as-whole segment with a directly following entry segment into
    /// one keyed step. Returns how many generic segments were consumed.
    fn object_steps(
        self: &Arc<Self>,
        obj: &Arc<DataObjectNode>,
        qname: &QName,
        next: Option<&PathSegment>,
        via_case: Option<TypeToken>,
        typed: &mut TypedPath,
    ) -> CodecResult<usize> {
        let mut consumed = 1;
        let mut step = match obj.shape() {
            ObjectShape::ListEntry { .. } => match next {
                Some(PathSegment::KeyedEntry { name, predicates }) if name == qname => {
                    let codec =
                        obj.key_codec()
                            .ok_or_else(|| CodecError::IncorrectNesting {
                                child: name.to_string(),
                                parent: obj.token().to_string(),
                            })?;
                    consumed = 2;
                    TypedPathStep::keyed(obj.token().clone(), codec.to_typed(predicates)?)
                }
                _ => TypedPathStep::new(obj.token().clone()),
            },
            _ => TypedPathStep::new(obj.token().clone()),
        };
        if let Some(case) = via_case {
            step = step.via_case(case);
        }
        typed.push(step);
        Ok(consumed)
    }

    fn classify_missing(&self, parent: &TypeToken, qname: &QName) -> CodecError {
        if self.schema.has_module(qname.module()) {
            CodecError::IncorrectNesting {
                child: qname.to_string(),
                parent: parent.to_string(),
            }
        } else {
            CodecError::MissingSchema {
                module: qname.module().to_string(),
            }
        }
    }
}

enum Cursor {
    Root,
    Object(Arc<DataObjectNode>),
    Choice(Arc<ChoiceCodecNode>),
}

fn node_qname(node: &CodecNode) -> Option<QName> {
    match node {
        CodecNode::Object(obj) => obj.qname().cloned(),
        CodecNode::Choice(choice) => Some(choice.qname().clone()),
        CodecNode::Leaf(leaf) => Some(leaf.qname.clone()),
        CodecNode::LeafList(leaf_list) => Some(leaf_list.qname.clone()),
    }
}

fn describe(node: &CodecNode) -> String {
    match node {
        CodecNode::Object(obj) => obj.token().to_string(),
        CodecNode::Choice(choice) => choice.token().to_string(),
        CodecNode::Leaf(leaf) => leaf.qname.to_string(),
        CodecNode::LeafList(leaf_list) => leaf_list.qname.to_string(),
    }
}

fn push_step_segments(
    step: &TypedPathStep,
    node: &CodecNode,
    generic: &mut GenericPath,
) -> CodecResult<()> {
    let CodecNode::Object(obj) = node else {
        return Err(CodecError::IncorrectNesting {
            child: step.type_token().to_string(),
            parent: "typed path".to_string(),
        });
    };
    match obj.shape() {
        ObjectShape::Container { .. } | ObjectShape::Case { .. } => {
            let qname = obj.qname().ok_or_else(|| CodecError::IncorrectNesting {
                child: obj.token().to_string(),
                parent: "typed path".to_string(),
            })?;
            if step.key().is_some() {
                return Err(CodecError::IncorrectNesting {
                    child: "key predicate".to_string(),
                    parent: obj.token().to_string(),
                });
            }
            generic.push(PathSegment::Node(qname.clone()));
        }
        ObjectShape::ListEntry { .. } => {
            let qname = obj.qname().ok_or_else(|| CodecError::IncorrectNesting {
                child: obj.token().to_string(),
                parent: "typed path".to_string(),
            })?;
            generic.push(PathSegment::Node(qname.clone()));
            if let Some(key) = step.key() {
                let codec = obj
                    .key_codec()
                    .ok_or_else(|| CodecError::IncorrectNesting {
                        child: "key predicate".to_string(),
                        parent: obj.token().to_string(),
                    })?;
                generic.push(PathSegment::keyed(qname.clone(), codec.to_generic(key)?));
            }
        }
        ObjectShape::Augmentation { id } => {
            if step.key().is_some() {
                return Err(CodecError::IncorrectNesting {
                    child: "key predicate".to_string(),
                    parent: obj.token().to_string(),
                });
            }
            generic.push(PathSegment::Augment(id.clone()));
        }
    }
    Ok(())
}

/// The codec context tree.
pub struct CodecTree {
    ctx: Arc<TreeCtx>,
}

impl CodecTree {
    pub fn new(registry: Arc<TypeRegistry>, schema: Arc<SchemaContext>) -> Self {
        Self::with_cache(registry, schema, Arc::new(ValueCodecCache::new()))
    }

    /// Builds a tree sharing a process-lifetime value codec cache. Trees
    /// over successive schema contexts should share one cache.
    pub fn with_cache(
        registry: Arc<TypeRegistry>,
        schema: Arc<SchemaContext>,
        cache: Arc<ValueCodecCache>,
    ) -> Self {
        let ctx = Arc::new_cyclic(|weak: &Weak<TreeCtx>| {
            let reference: Arc<dyn ValueCodec> = Arc::new(ReferenceValueCodec::new(Arc::new(
                TreeReference::new(weak.clone()),
            )));
            TreeCtx {
                registry: registry.clone(),
                schema: schema.clone(),
                resolver: ValueCodecResolver::new(registry, schema, cache, reference),
                roots: RwLock::new(RootIndex::default()),
            }
        });
        Self { ctx }
    }

    pub fn schema(&self) -> &Arc<SchemaContext> {
        &self.ctx.schema
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.ctx.registry
    }

    /// Translates a typed path into its generic counterpart, expanding
    /// mixin segments (choices, list double-segments, augmentations).
    pub fn to_generic_path(&self, path: &TypedPath) -> CodecResult<GenericPath> {
        Ok(self.ctx.resolve_typed(path)?.0)
    }

    /// Translates a generic path into its typed counterpart, dropping mixin
    /// segments and collapsing list double-segments into keyed steps.
    pub fn to_typed_path(&self, path: &GenericPath) -> CodecResult<TypedPath> {
        Ok(self.ctx.resolve_generic(path)?.0)
    }

    /// The data-object context a typed path addresses.
    pub fn object_context(&self, path: &TypedPath) -> CodecResult<Arc<DataObjectNode>> {
        match self.ctx.resolve_typed(path)?.1 {
            Some(CodecNode::Object(obj)) => Ok(obj),
            _ => Err(CodecError::IncorrectNesting {
                child: format!("{path:?}"),
                parent: "(root)".to_string(),
            }),
        }
    }

    /// Serializes a typed object addressed by `path` into a generic tree.
    pub fn to_generic(
        &self,
        path: &TypedPath,
        object: &TypedObject,
    ) -> CodecResult<(GenericPath, GenericNode)> {
        let (generic, node) = self.ctx.resolve_typed(path)?;
        let Some(CodecNode::Object(ctx_node)) = node else {
            return Err(CodecError::IncorrectNesting {
                child: object.type_token().to_string(),
                parent: "(root)".to_string(),
            });
        };
        if ctx_node.token() != object.type_token() {
            return Err(CodecError::IncorrectNesting {
                child: object.type_token().to_string(),
                parent: ctx_node.token().to_string(),
            });
        }
        let tree = serializer::serialize(&ctx_node, object)?;
        Ok((generic, tree))
    }

    /// Wraps a generic node addressed by `path` into a lazy typed view.
    pub fn from_generic(
        &self,
        path: &GenericPath,
        node: &GenericNode,
    ) -> CodecResult<(TypedPath, TypedValue)> {
        let (typed, ctx_node) = self.ctx.resolve_generic(path)?;
        let Some(CodecNode::Object(obj)) = ctx_node else {
            return Err(CodecError::IncorrectNesting {
                child: path.to_string(),
                parent: "(root)".to_string(),
            });
        };
        let view = LazyView::new(obj, node.clone());
        Ok((typed, TypedValue::Object(TypedObject::View(view))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::path::AugmentId;
    use crate::model::qname::ModuleId;
    use crate::model::typed::{BuiltObject, ListKey};
    use crate::model::value::Value;
    use crate::testing::{inv_q, register_vendor_augment, token, tree, tree_without_augment, vnd_q};

    fn endpoint_key(id: i32, name: &str) -> ListKey {
        ListKey::new(
            token("EndpointKey"),
            vec![
                ("id", TypedValue::Int32(id)),
                ("name", TypedValue::string(name)),
            ],
        )
    }

    #[test]
    fn typed_path_expands_list_double_segment() {
        let tree = tree();
        let typed = TypedPath::of(vec![
            TypedPathStep::new(token("Inventory")),
            TypedPathStep::keyed(token("Endpoint"), endpoint_key(3, "eth0")),
        ]);
        let generic = tree.to_generic_path(&typed).unwrap();
        let segments = generic.segments();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0], PathSegment::Node(inv_q("inventory")));
        assert_eq!(segments[1], PathSegment::Node(inv_q("endpoint")));
        let PathSegment::KeyedEntry { name, predicates } = &segments[2] else {
            panic!("expected keyed entry, got {:?}", segments[2]);
        };
        assert_eq!(name, &inv_q("endpoint"));
        assert_eq!(predicates.get(&inv_q("id")), Some(&Value::Int32(3)));
        assert_eq!(predicates.get(&inv_q("name")), Some(&Value::string("eth0")));

        let back = tree.to_typed_path(&generic).unwrap();
        assert_eq!(back, typed);
    }

    #[test]
    fn wildcard_list_step_emits_only_the_whole_collection() {
        let tree = tree();
        let typed = TypedPath::of(vec![
            TypedPathStep::new(token("Inventory")),
            TypedPathStep::new(token("Endpoint")),
        ]);
        let generic = tree.to_generic_path(&typed).unwrap();
        assert_eq!(generic.segments().len(), 2);
        assert_eq!(
            generic.segments()[1],
            PathSegment::Node(inv_q("endpoint"))
        );
        assert_eq!(tree.to_typed_path(&generic).unwrap(), typed);
    }

    #[test]
    fn case_anchored_step_expands_the_choice_segment() {
        let tree = tree();
        let typed = TypedPath::of(vec![
            TypedPathStep::new(token("Inventory")),
            TypedPathStep::keyed(token("Endpoint"), endpoint_key(1, "eth0")),
            TypedPathStep::new(token("Keepalive")).via_case(token("TcpCase")),
        ]);
        let generic = tree.to_generic_path(&typed).unwrap();
        let segments = generic.segments();
        assert_eq!(segments.len(), 5);
        assert_eq!(segments[3], PathSegment::Node(inv_q("transport")));
        assert_eq!(segments[4], PathSegment::Node(inv_q("keepalive")));

        // A step that omits the case routes through the owning choice.
        let implicit = TypedPath::of(vec![
            TypedPathStep::new(token("Inventory")),
            TypedPathStep::keyed(token("Endpoint"), endpoint_key(1, "eth0")),
            TypedPathStep::new(token("Keepalive")),
        ]);
        assert_eq!(tree.to_generic_path(&implicit).unwrap(), generic);

        // Collapsing back records which case carried the child.
        let back = tree.to_typed_path(&generic).unwrap();
        assert_eq!(back.steps().len(), 3);
        assert_eq!(back.steps()[2].type_token(), &token("Keepalive"));
        assert_eq!(back.steps()[2].case(), Some(&token("TcpCase")));
    }

    #[test]
    fn unknown_module_reports_missing_schema() {
        let tree = tree();
        let foreign = QName::new(ModuleId::new("urn:example:unknown", None), "thing");
        let err = tree
            .to_typed_path(&GenericPath::of(vec![PathSegment::Node(foreign)]))
            .unwrap_err();
        assert!(matches!(err, CodecError::MissingSchema { .. }));
        assert!(err.is_schema_related());
    }

    #[test]
    fn unknown_child_in_known_module_is_incorrect_nesting() {
        let tree = tree();
        let err = tree
            .to_typed_path(&GenericPath::of(vec![
                PathSegment::Node(inv_q("inventory")),
                PathSegment::Node(inv_q("bogus")),
            ]))
            .unwrap_err();
        assert!(matches!(err, CodecError::IncorrectNesting { .. }));
    }

    #[test]
    fn augmentations_registered_late_become_visible() {
        let (registry, tree) = tree_without_augment();
        let id = AugmentId::new(vec![vnd_q("vendor"), vnd_q("firmware")]);
        let generic = GenericPath::of(vec![
            PathSegment::Node(inv_q("inventory")),
            PathSegment::Augment(id),
        ]);
        assert!(tree.to_typed_path(&generic).is_err());

        register_vendor_augment(&registry);
        let typed = tree.to_typed_path(&generic).unwrap();
        assert_eq!(typed.steps()[1].type_token(), &token("VendorAug"));

        // And back out: the augmentation step expands to its identifier.
        let expanded = tree.to_generic_path(&typed).unwrap();
        assert_eq!(expanded, generic);
    }

    #[test]
    fn serialize_then_view_round_trips_the_object() {
        let tree = tree();
        let endpoint = BuiltObject::new(token("Endpoint"))
            .with("id", TypedValue::Int32(3))
            .with("name", TypedValue::string("eth0"))
            .with("mtu", TypedValue::Uint16(1500))
            .with(
                "transport",
                TypedValue::object(
                    BuiltObject::new(token("TcpCase")).with("port", TypedValue::Uint16(179)),
                ),
            );
        let inventory = BuiltObject::new(token("Inventory"))
            .with(
                "mode",
                TypedValue::Enum {
                    type_token: token("Mode"),
                    variant: Arc::from("Turbo"),
                },
            )
            .with(
                "tags",
                TypedValue::LeafSet(vec![TypedValue::string("core")]),
            )
            .with(
                "endpoint",
                TypedValue::List(vec![TypedValue::object(endpoint)]),
            );
        let object = TypedObject::from(inventory);
        let path = TypedPath::of(vec![TypedPathStep::new(token("Inventory"))]);

        let (generic_path, node) = tree.to_generic(&path, &object).unwrap();
        assert_eq!(
            generic_path.segments(),
            &[PathSegment::Node(inv_q("inventory"))]
        );
        // The enum leaf is stored as its declared symbol.
        let mode = node.child_by_name(&inv_q("mode")).unwrap();
        assert_eq!(mode.value(), Some(&Value::string("turbo")));
        // Case children sit directly under the choice node.
        let list = node.child_by_name(&inv_q("endpoint")).unwrap();
        let entry = list.children().unwrap().values().next().unwrap();
        let choice = entry.child_by_name(&inv_q("transport")).unwrap();
        assert_eq!(
            choice.child_by_name(&inv_q("port")).unwrap().value(),
            Some(&Value::Uint16(179))
        );

        let (typed_path, value) = tree.from_generic(&generic_path, &node).unwrap();
        assert_eq!(typed_path, path);
        let TypedValue::Object(view) = value else {
            panic!("expected an object, got {value}");
        };
        assert_eq!(view, object);
    }

    #[test]
    fn serializing_a_mismatched_object_fails() {
        let tree = tree();
        let path = TypedPath::of(vec![TypedPathStep::new(token("Inventory"))]);
        let object = TypedObject::from(BuiltObject::new(token("Endpoint")));
        assert!(tree.to_generic(&path, &object).is_err());
    }
}
