//! The generic data tree: schema-validated, qualified-name-labeled nodes.
//!
//! The codec only ever reads these nodes; producing them goes through the
//! stream-writer event protocol in [`crate::model::stream`]. All node
//! payloads sit behind `Arc`, so cloning a node (or holding one inside a
//! lazy view) is cheap.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::path::{AugmentId, PathSegment};
use crate::model::qname::QName;
use crate::model::value::Value;

/// A single leaf holding one scalar value.
#[derive(PartialEq, Eq, Debug)]
pub struct LeafData {
    pub name: QName,
    pub value: Value,
}

/// A leaf-list: an ordered collection of scalar values under one name.
#[derive(PartialEq, Eq, Debug)]
pub struct LeafSetData {
    pub name: QName,
    pub entries: Vec<Value>,
}

/// A container-like body: children keyed by their own path segment.
#[derive(PartialEq, Eq, Debug)]
pub struct BranchData {
    pub name: QName,
    pub children: IndexMap<PathSegment, GenericNode>,
}

/// One keyed list entry: children plus the key predicates identifying it.
#[derive(PartialEq, Eq, Debug)]
pub struct ListEntryData {
    pub name: QName,
    pub predicates: BTreeMap<QName, Value>,
    pub children: IndexMap<PathSegment, GenericNode>,
}

/// A keyed list as a whole: entries addressable by their predicates.
#[derive(PartialEq, Eq, Debug)]
pub struct KeyedListData {
    pub name: QName,
    pub entries: IndexMap<PathSegment, GenericNode>,
    pub user_ordered: bool,
}

/// An unkeyed list as a whole: entries addressable by position only.
#[derive(PartialEq, Eq, Debug)]
pub struct UnkeyedListData {
    pub name: QName,
    pub entries: Vec<GenericNode>,
}

/// An augmentation body: the grouped children one augmentation contributed.
#[derive(PartialEq, Eq, Debug)]
pub struct AugmentData {
    pub id: AugmentId,
    pub children: IndexMap<PathSegment, GenericNode>,
}

/// A node of the generic tree.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GenericNode {
    Leaf(Arc<LeafData>),
    LeafSet(Arc<LeafSetData>),
    Container(Arc<BranchData>),
    ListEntry(Arc<ListEntryData>),
    KeyedList(Arc<KeyedListData>),
    UnkeyedList(Arc<UnkeyedListData>),
    /// A choice node holds the children of whichever case is present,
    /// directly: cases have no node of their own.
    Choice(Arc<BranchData>),
    Augmentation(Arc<AugmentData>),
}

fn index_children<I: IntoIterator<Item = GenericNode>>(
    children: I,
) -> IndexMap<PathSegment, GenericNode> {
    children
        .into_iter()
        .map(|child| (child.segment(), child))
        .collect()
}

impl GenericNode {
    pub fn leaf(name: QName, value: Value) -> Self {
        GenericNode::Leaf(Arc::new(LeafData { name, value }))
    }

    pub fn leaf_set<I: IntoIterator<Item = Value>>(name: QName, entries: I) -> Self {
        GenericNode::LeafSet(Arc::new(LeafSetData {
            name,
            entries: entries.into_iter().collect(),
        }))
    }

    pub fn container<I: IntoIterator<Item = GenericNode>>(name: QName, children: I) -> Self {
        GenericNode::Container(Arc::new(BranchData {
            name,
            children: index_children(children),
        }))
    }

    pub fn choice<I: IntoIterator<Item = GenericNode>>(name: QName, children: I) -> Self {
        GenericNode::Choice(Arc::new(BranchData {
            name,
            children: index_children(children),
        }))
    }

    pub fn list_entry<I: IntoIterator<Item = GenericNode>>(
        name: QName,
        predicates: BTreeMap<QName, Value>,
        children: I,
    ) -> Self {
        GenericNode::ListEntry(Arc::new(ListEntryData {
            name,
            predicates,
            children: index_children(children),
        }))
    }

    pub fn keyed_list<I: IntoIterator<Item = GenericNode>>(name: QName, entries: I) -> Self {
        Self::keyed_list_ordered(name, entries, false)
    }

    pub fn keyed_list_ordered<I: IntoIterator<Item = GenericNode>>(
        name: QName,
        entries: I,
        user_ordered: bool,
    ) -> Self {
        GenericNode::KeyedList(Arc::new(KeyedListData {
            name,
            entries: index_children(entries),
            user_ordered,
        }))
    }

    pub fn unkeyed_list<I: IntoIterator<Item = GenericNode>>(name: QName, entries: I) -> Self {
        GenericNode::UnkeyedList(Arc::new(UnkeyedListData {
            name,
            entries: entries.into_iter().collect(),
        }))
    }

    pub fn augmentation<I: IntoIterator<Item = GenericNode>>(id: AugmentId, children: I) -> Self {
        GenericNode::Augmentation(Arc::new(AugmentData {
            id,
            children: index_children(children),
        }))
    }

    /// The qualified name labeling this node, absent for augmentations.
    pub fn name(&self) -> Option<&QName> {
        match self {
            GenericNode::Leaf(data) => Some(&data.name),
            GenericNode::LeafSet(data) => Some(&data.name),
            GenericNode::Container(data) | GenericNode::Choice(data) => Some(&data.name),
            GenericNode::ListEntry(data) => Some(&data.name),
            GenericNode::KeyedList(data) => Some(&data.name),
            GenericNode::UnkeyedList(data) => Some(&data.name),
            GenericNode::Augmentation(_) => None,
        }
    }

    /// The path segment addressing this node within its parent.
    pub fn segment(&self) -> PathSegment {
        match self {
            GenericNode::Leaf(data) => PathSegment::Node(data.name.clone()),
            GenericNode::LeafSet(data) => PathSegment::Node(data.name.clone()),
            GenericNode::Container(data) | GenericNode::Choice(data) => {
                PathSegment::Node(data.name.clone())
            }
            GenericNode::ListEntry(data) => PathSegment::KeyedEntry {
                name: data.name.clone(),
                predicates: data.predicates.clone(),
            },
            GenericNode::KeyedList(data) => PathSegment::Node(data.name.clone()),
            GenericNode::UnkeyedList(data) => PathSegment::Node(data.name.clone()),
            GenericNode::Augmentation(data) => PathSegment::Augment(data.id.clone()),
        }
    }

    /// Direct child lookup by path segment, for container-like nodes.
    pub fn child(&self, segment: &PathSegment) -> Option<&GenericNode> {
        match self {
            GenericNode::Container(data) | GenericNode::Choice(data) => {
                data.children.get(segment)
            }
            GenericNode::ListEntry(data) => data.children.get(segment),
            GenericNode::KeyedList(data) => data.entries.get(segment),
            GenericNode::Augmentation(data) => data.children.get(segment),
            _ => None,
        }
    }

    /// Child lookup by qualified name alone, searching through any
    /// augmentation children as well. Augmented children live inside their
    /// augmentation node in the generic tree but are addressed flat on the
    /// typed side.
    pub fn child_by_name(&self, name: &QName) -> Option<&GenericNode> {
        let children = self.children()?;
        if let Some(found) = children.get(&PathSegment::Node(name.clone())) {
            return Some(found);
        }
        for (segment, child) in children {
            if let PathSegment::Augment(id) = segment {
                if id.contains(name) {
                    if let Some(found) = child.child(&PathSegment::Node(name.clone())) {
                        return Some(found);
                    }
                }
            }
        }
        None
    }

    /// The child map of a container-like node.
    pub fn children(&self) -> Option<&IndexMap<PathSegment, GenericNode>> {
        match self {
            GenericNode::Container(data) | GenericNode::Choice(data) => Some(&data.children),
            GenericNode::ListEntry(data) => Some(&data.children),
            GenericNode::KeyedList(data) => Some(&data.entries),
            GenericNode::Augmentation(data) => Some(&data.children),
            _ => None,
        }
    }

    /// The scalar value of a leaf node.
    pub fn value(&self) -> Option<&Value> {
        match self {
            GenericNode::Leaf(data) => Some(&data.value),
            _ => None,
        }
    }
}

impl fmt::Display for GenericNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenericNode::Leaf(data) => write!(f, "{}={}", data.name.local(), data.value),
            GenericNode::LeafSet(data) => {
                write!(f, "{}=[", data.name.local())?;
                for (i, entry) in data.entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{entry}")?;
                }
                write!(f, "]")
            }
            GenericNode::UnkeyedList(data) => {
                write!(f, "{}[{} entries]", data.name.local(), data.entries.len())
            }
            GenericNode::KeyedList(data) => {
                write!(f, "{}[{} entries]", data.name.local(), data.entries.len())
            }
            other => {
                let label = match other.name() {
                    Some(name) => name.local().to_string(),
                    None => "augmentation".to_string(),
                };
                let count = other.children().map(IndexMap::len).unwrap_or(0);
                write!(f, "{label}{{{count} children}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::qname::ModuleId;

    fn qname(local: &str) -> QName {
        QName::new(ModuleId::new("urn:test", None), local)
    }

    #[test]
    fn container_children_are_indexed_by_segment() {
        let node = GenericNode::container(
            qname("box"),
            vec![
                GenericNode::leaf(qname("a"), Value::Int32(1)),
                GenericNode::leaf(qname("b"), Value::Int32(2)),
            ],
        );
        let found = node.child(&PathSegment::Node(qname("b"))).unwrap();
        assert_eq!(found.value(), Some(&Value::Int32(2)));
        assert!(node.child(&PathSegment::Node(qname("c"))).is_none());
    }

    #[test]
    fn structural_equality_ignores_arc_identity() {
        let make = || {
            GenericNode::container(
                qname("box"),
                vec![GenericNode::leaf(qname("a"), Value::string("x"))],
            )
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn child_by_name_reaches_into_augmentations() {
        let vendor = qname("vendor");
        let augment = GenericNode::augmentation(
            AugmentId::new(vec![vendor.clone()]),
            vec![GenericNode::leaf(vendor.clone(), Value::string("acme"))],
        );
        let node = GenericNode::container(qname("box"), vec![augment]);
        let found = node.child_by_name(&vendor).unwrap();
        assert_eq!(found.value(), Some(&Value::string("acme")));
    }
}
