//! Lazy typed views over generic nodes.
//!
//! Deserialization does no upfront work: a view pairs a codec context with a
//! generic node and computes accessor values on first read. Each computed
//! value is published into a per-accessor slot exactly once, so concurrent
//! readers racing on the same accessor all observe the same value; decode
//! failures are not cached and surface to every caller until one succeeds.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hasher;
use std::sync::{Arc, OnceLock};

use crate::codec::node::{CodecNode, DataObjectNode};
use crate::errors::{CodecError, CodecResult};
use crate::model::node::GenericNode;
use crate::model::path::PathSegment;
use crate::model::registry::{Accessor, AccessorShape, TypeToken};
use crate::model::typed::{TypedObject, TypedValue};

struct ViewInner {
    node: Arc<DataObjectNode>,
    data: GenericNode,
    /// Accessor names in declared order, parallel to `slots`.
    names: Vec<Arc<str>>,
    slots: Vec<OnceLock<Option<TypedValue>>>,
    augments: OnceLock<BTreeMap<TypeToken, LazyView>>,
    hash: OnceLock<u64>,
}

/// A typed data object backed by a generic node, decoded field by field on
/// demand.
#[derive(Clone)]
pub struct LazyView {
    inner: Arc<ViewInner>,
}

impl LazyView {
    pub(crate) fn new(node: Arc<DataObjectNode>, data: GenericNode) -> Self {
        let names: Vec<Arc<str>> = node
            .descriptor()
            .accessors()
            .iter()
            .map(|accessor| accessor.name.clone())
            .collect();
        let slots = names.iter().map(|_| OnceLock::new()).collect();
        Self {
            inner: Arc::new(ViewInner {
                node,
                data,
                names,
                slots,
                augments: OnceLock::new(),
                hash: OnceLock::new(),
            }),
        }
    }

    pub fn type_token(&self) -> &TypeToken {
        self.inner.node.token()
    }

    /// Accessor names in declared order.
    pub fn accessor_names(&self) -> &[Arc<str>] {
        &self.inner.names
    }

    /// The value of one accessor, `None` when the child is absent and has no
    /// default. The first successful computation is published; later reads
    /// return the published value even if they raced a concurrent computation.
    pub fn get(&self, name: &str) -> CodecResult<Option<TypedValue>> {
        let slot_index = self
            .inner
            .names
            .iter()
            .position(|known| &**known == name)
            .ok_or_else(|| CodecError::IncorrectNesting {
                child: name.to_string(),
                parent: self.type_token().to_string(),
            })?;
        let slot = &self.inner.slots[slot_index];
        if let Some(cached) = slot.get() {
            return Ok(cached.clone());
        }
        let accessor = &self.inner.node.descriptor().accessors()[slot_index];
        let computed = self.compute(accessor)?;
        Ok(slot.get_or_init(|| computed).clone())
    }

    /// Like [`LazyView::get`], but an absent structural (non-presence)
    /// container reads as an empty instance. Presence containers still read
    /// as `None`: their existence is the information they carry.
    pub fn get_nonnull(&self, name: &str) -> CodecResult<Option<TypedValue>> {
        if let Some(found) = self.get(name)? {
            return Ok(Some(found));
        }
        let Some(accessor) = self.inner.node.descriptor().accessor(name) else {
            return Ok(None);
        };
        if !matches!(accessor.shape, AccessorShape::Container { .. }) {
            return Ok(None);
        }
        let CodecNode::Object(object) = self.child_context(accessor)? else {
            return Err(self.mismatch(accessor));
        };
        if object.is_presence() {
            return Ok(None);
        }
        let empty = GenericNode::container(accessor.qname.clone(), []);
        Ok(Some(TypedValue::Object(TypedObject::View(LazyView::new(
            object, empty,
        )))))
    }

    /// The content hash over every computed accessor plus augmentations,
    /// published once. Racing computations are harmless; one result wins.
    pub(crate) fn content_hash(&self) -> u64 {
        *self.inner.hash.get_or_init(|| {
            let mut hasher = DefaultHasher::new();
            TypedObject::View(self.clone()).hash_content(&mut hasher);
            hasher.finish()
        })
    }

    /// Augmentation views present on this node, keyed by augmentation type.
    pub fn augments(&self) -> CodecResult<BTreeMap<TypeToken, LazyView>> {
        if let Some(found) = self.inner.augments.get() {
            return Ok(found.clone());
        }
        let mut found = BTreeMap::new();
        for augment in self.inner.node.augmentations() {
            let Some(id) = augment.augment_id() else {
                continue;
            };
            if let Some(child) = self.inner.data.child(&PathSegment::Augment(id.clone())) {
                found.insert(
                    augment.token().clone(),
                    LazyView::new(augment.clone(), child.clone()),
                );
            }
        }
        Ok(self.inner.augments.get_or_init(|| found).clone())
    }

    fn compute(&self, accessor: &Accessor) -> CodecResult<Option<TypedValue>> {
        match &accessor.shape {
            AccessorShape::Leaf { .. } => self.compute_leaf(accessor),
            AccessorShape::LeafList { .. } => self.compute_leaf_list(accessor),
            AccessorShape::Container { .. } => self.compute_container(accessor),
            AccessorShape::List { .. } => self.compute_list(accessor),
            AccessorShape::Choice { .. } => self.compute_choice(accessor),
        }
    }

    fn compute_leaf(&self, accessor: &Accessor) -> CodecResult<Option<TypedValue>> {
        let CodecNode::Leaf(leaf) = self.child_context(accessor)? else {
            return Err(self.mismatch(accessor));
        };
        match self.inner.data.child_by_name(&accessor.qname) {
            Some(child) => {
                let value = child.value().ok_or_else(|| self.mismatch(accessor))?;
                Ok(Some(leaf.codec.to_typed(value)?))
            }
            // An absent leaf with a schema default reads as the default.
            None => match &leaf.default {
                Some(default) => Ok(Some(leaf.codec.to_typed(default)?)),
                None => Ok(None),
            },
        }
    }

    fn compute_leaf_list(&self, accessor: &Accessor) -> CodecResult<Option<TypedValue>> {
        let Some(child) = self.inner.data.child_by_name(&accessor.qname) else {
            return Ok(None);
        };
        let CodecNode::LeafList(leaf_list) = self.child_context(accessor)? else {
            return Err(self.mismatch(accessor));
        };
        let GenericNode::LeafSet(data) = child else {
            return Err(self.mismatch(accessor));
        };
        let mut entries = Vec::with_capacity(data.entries.len());
        for value in &data.entries {
            entries.push(leaf_list.codec.to_typed(value)?);
        }
        Ok(Some(TypedValue::LeafSet(entries)))
    }

    fn compute_container(&self, accessor: &Accessor) -> CodecResult<Option<TypedValue>> {
        let Some(child) = self.inner.data.child_by_name(&accessor.qname) else {
            return Ok(None);
        };
        let CodecNode::Object(object) = self.child_context(accessor)? else {
            return Err(self.mismatch(accessor));
        };
        Ok(Some(TypedValue::Object(TypedObject::View(LazyView::new(
            object,
            child.clone(),
        )))))
    }

    fn compute_list(&self, accessor: &Accessor) -> CodecResult<Option<TypedValue>> {
        let Some(child) = self.inner.data.child_by_name(&accessor.qname) else {
            return Ok(None);
        };
        let CodecNode::Object(entry_context) = self.child_context(accessor)? else {
            return Err(self.mismatch(accessor));
        };
        let entries: Vec<TypedValue> = match child {
            GenericNode::KeyedList(data) => data
                .entries
                .values()
                .map(|entry| {
                    TypedValue::Object(TypedObject::View(LazyView::new(
                        entry_context.clone(),
                        entry.clone(),
                    )))
                })
                .collect(),
            GenericNode::UnkeyedList(data) => data
                .entries
                .iter()
                .map(|entry| {
                    TypedValue::Object(TypedObject::View(LazyView::new(
                        entry_context.clone(),
                        entry.clone(),
                    )))
                })
                .collect(),
            _ => return Err(self.mismatch(accessor)),
        };
        Ok(Some(TypedValue::List(entries)))
    }

    /// A choice reads as the view of whichever case is present. Case
    /// children live directly under the generic choice node, so the case
    /// view shares that node as its data.
    fn compute_choice(&self, accessor: &Accessor) -> CodecResult<Option<TypedValue>> {
        let Some(child) = self.inner.data.child_by_name(&accessor.qname) else {
            return Ok(None);
        };
        let CodecNode::Choice(choice) = self.child_context(accessor)? else {
            return Err(self.mismatch(accessor));
        };
        let Some(children) = child.children() else {
            return Err(self.mismatch(accessor));
        };
        let Some(first_name) = children.keys().find_map(PathSegment::name) else {
            return Ok(None);
        };
        let case =
            choice
                .case_for_child_qname(first_name)
                .ok_or_else(|| CodecError::IncorrectNesting {
                    child: first_name.to_string(),
                    parent: choice.token().to_string(),
                })?;
        Ok(Some(TypedValue::Object(TypedObject::View(LazyView::new(
            case,
            child.clone(),
        )))))
    }

    fn child_context(&self, accessor: &Accessor) -> CodecResult<CodecNode> {
        self.inner
            .node
            .child_by_accessor(&accessor.name)
            .ok_or_else(|| self.mismatch(accessor))
    }

    fn mismatch(&self, accessor: &Accessor) -> CodecError {
        CodecError::IncorrectNesting {
            child: accessor.qname.to_string(),
            parent: self.type_token().to_string(),
        }
    }
}

impl fmt::Display for LazyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.type_token())?;
        let mut first = true;
        for name in &self.inner.names {
            if let Ok(Some(value)) = self.get(name) {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{name}: {value}")?;
                first = false;
            }
        }
        if let Ok(augments) = self.augments() {
            for (token, view) in augments {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{token}: {view}")?;
                first = false;
            }
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for LazyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::model::path::{AugmentId, TypedPath, TypedPathStep};
    use crate::model::stream::{build_tree, StreamWriter};
    use crate::model::value::Value;
    use crate::testing::{inv_q, token, tree, vnd_q};

    fn sample() -> GenericNode {
        sample_with_mode("normal")
    }

    fn sample_with_mode(mode: &str) -> GenericNode {
        build_tree(|w| {
            w.start_container(inv_q("inventory"))?;
            w.leaf(inv_q("mode"), Value::string(mode))?;
            w.leaf_set(inv_q("tags"), vec![Value::string("a"), Value::string("b")])?;
            w.start_keyed_list(inv_q("endpoint"), false)?;
            let mut predicates = BTreeMap::new();
            predicates.insert(inv_q("id"), Value::Int32(1));
            predicates.insert(inv_q("name"), Value::string("eth0"));
            w.start_list_entry(inv_q("endpoint"), predicates)?;
            w.leaf(inv_q("id"), Value::Int32(1))?;
            w.leaf(inv_q("name"), Value::string("eth0"))?;
            w.start_choice(inv_q("transport"))?;
            w.start_case(inv_q("udp"))?;
            w.leaf(inv_q("dscp"), Value::Uint8(46))?;
            w.end_node()?;
            w.end_node()?;
            w.end_node()?;
            w.end_node()?;
            w.start_augmentation(AugmentId::new(vec![vnd_q("vendor"), vnd_q("firmware")]))?;
            w.leaf(vnd_q("vendor"), Value::string("acme"))?;
            w.end_node()?;
            w.end_node()
        })
        .unwrap()
    }

    fn root_view() -> LazyView {
        let tree = tree();
        let node = tree
            .object_context(&TypedPath::of(vec![TypedPathStep::new(token("Inventory"))]))
            .unwrap();
        LazyView::new(node, sample())
    }

    fn entry_view(view: &LazyView) -> LazyView {
        let Some(TypedValue::List(entries)) = view.get("endpoint").unwrap() else {
            panic!("endpoint list missing");
        };
        let TypedValue::Object(TypedObject::View(entry)) = entries[0].clone() else {
            panic!("entry is not a view");
        };
        entry
    }

    #[test]
    fn decodes_value_leaves_on_demand() {
        let view = root_view();
        assert_eq!(
            view.get("mode").unwrap(),
            Some(TypedValue::Enum {
                type_token: token("Mode"),
                variant: Arc::from("Normal"),
            })
        );
        assert_eq!(
            view.get("tags").unwrap(),
            Some(TypedValue::LeafSet(vec![
                TypedValue::string("a"),
                TypedValue::string("b"),
            ]))
        );
        assert_eq!(view.get("limit").unwrap(), None);
    }

    #[test]
    fn absent_leaf_with_default_reads_the_default() {
        let view = root_view();
        let entry = entry_view(&view);
        assert_eq!(entry.get("mtu").unwrap(), Some(TypedValue::Uint16(1500)));
    }

    #[test]
    fn choice_reads_as_the_present_case() {
        let view = root_view();
        let entry = entry_view(&view);
        let Some(TypedValue::Object(case)) = entry.get("transport").unwrap() else {
            panic!("transport missing");
        };
        assert_eq!(case.type_token(), &token("UdpCase"));
        assert_eq!(case.field("dscp"), Some(TypedValue::Uint8(46)));
    }

    #[test]
    fn augmented_children_live_under_their_augmentation() {
        let view = root_view();
        let augments = view.augments().unwrap();
        let vendor = augments.get(&token("VendorAug")).unwrap();
        assert_eq!(
            vendor.get("vendor").unwrap(),
            Some(TypedValue::string("acme"))
        );
        assert_eq!(vendor.get("firmware").unwrap(), None);
    }

    #[test]
    fn unknown_accessor_is_rejected() {
        let view = root_view();
        let err = view.get("bogus").unwrap_err();
        assert!(matches!(err, CodecError::IncorrectNesting { .. }));
    }

    #[test]
    fn repeated_reads_return_the_published_value() {
        let view = root_view();
        let first = view.get("mode").unwrap();
        let second = view.get("mode").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn absent_structural_container_reads_nonnull_as_empty() {
        let tree = tree();
        let node = tree
            .object_context(&TypedPath::of(vec![TypedPathStep::new(token("Inventory"))]))
            .unwrap();
        let data = build_tree(|w| {
            w.start_container(inv_q("inventory"))?;
            w.start_keyed_list(inv_q("endpoint"), false)?;
            let mut predicates = BTreeMap::new();
            predicates.insert(inv_q("id"), Value::Int32(2));
            predicates.insert(inv_q("name"), Value::string("eth1"));
            w.start_list_entry(inv_q("endpoint"), predicates)?;
            w.leaf(inv_q("id"), Value::Int32(2))?;
            w.leaf(inv_q("name"), Value::string("eth1"))?;
            w.start_choice(inv_q("transport"))?;
            w.start_case(inv_q("tcp"))?;
            w.leaf(inv_q("port"), Value::Uint16(179))?;
            w.end_node()?;
            w.end_node()?;
            w.end_node()?;
            w.end_node()?;
            w.end_node()
        })
        .unwrap();
        let entry = entry_view(&LazyView::new(node, data));
        let Some(TypedValue::Object(TypedObject::View(case))) =
            entry.get("transport").unwrap()
        else {
            panic!("transport missing");
        };
        assert_eq!(case.get("keepalive").unwrap(), None);
        let Some(TypedValue::Object(keepalive)) = case.get_nonnull("keepalive").unwrap() else {
            panic!("structural container did not materialize");
        };
        assert_eq!(keepalive.field("interval"), None);
    }

    #[test]
    fn absent_presence_container_stays_absent() {
        let view = root_view();
        assert_eq!(view.get("snapshot").unwrap(), None);
        assert_eq!(view.get_nonnull("snapshot").unwrap(), None);
        // Non-container accessors pass through unchanged.
        assert_eq!(view.get_nonnull("limit").unwrap(), None);
    }

    #[test]
    fn views_over_equal_nodes_compare_and_hash_equal() {
        use std::hash::{Hash, Hasher};

        fn fingerprint(object: &TypedObject) -> u64 {
            let mut hasher = DefaultHasher::new();
            object.hash(&mut hasher);
            hasher.finish()
        }

        let a = TypedObject::View(root_view());
        let b = TypedObject::View(root_view());
        assert_eq!(a, b);
        assert_eq!(fingerprint(&a), fingerprint(&b));

        let tree = tree();
        let node = tree
            .object_context(&TypedPath::of(vec![TypedPathStep::new(token("Inventory"))]))
            .unwrap();
        let c = TypedObject::View(LazyView::new(node, sample_with_mode("turbo")));
        assert_ne!(a, c);
    }

    #[test]
    fn concurrent_reads_publish_exactly_one_value() {
        use rayon::prelude::*;

        let view = root_view();
        let values: Vec<_> = (0..64)
            .into_par_iter()
            .map(|_| view.get("endpoint").unwrap())
            .collect();
        assert!(values.iter().all(|v| v == &values[0]));
    }
}
