//! Lazy tree over the schema context, mirroring the addressing structure of
//! the generic data tree.
//!
//! Where the schema context has one node per `list` statement, the generic
//! tree addresses the whole collection and a single entry with two distinct
//! segments; this tree materializes both as distinct nodes. Child nodes are
//! built on demand and cached per parent; the caches only ever grow, and
//! races on first access are resolved by adopting whichever node was
//! published first.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::model::path::{AugmentId, PathSegment};
use crate::model::qname::QName;
use crate::model::schema::{SchemaKind, SchemaNode};

/// Structural role of one tree node.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TreeKind {
    Container,
    Choice,
    Case,
    /// A keyed or unkeyed list as a whole collection.
    ListWhole { keyed: bool },
    /// A single list entry.
    ListEntry { keyed: bool },
    /// A leaf-list as a whole collection.
    LeafListWhole,
    /// A single leaf-list entry, addressed by a value predicate.
    LeafListEntry,
    Leaf,
    /// The children one augmentation contributes to its target.
    Augment(AugmentId),
}

/// One node of the schema context tree.
pub struct SchemaTreeNode {
    schema: Arc<SchemaNode>,
    kind: TreeKind,
    children: RwLock<HashMap<PathSegment, Arc<SchemaTreeNode>>>,
}

impl SchemaTreeNode {
    fn new(schema: Arc<SchemaNode>, kind: TreeKind) -> Arc<Self> {
        Arc::new(Self {
            schema,
            kind,
            children: RwLock::new(HashMap::new()),
        })
    }

    pub fn schema(&self) -> &Arc<SchemaNode> {
        &self.schema
    }

    pub fn qname(&self) -> &QName {
        self.schema.qname()
    }

    pub fn kind(&self) -> &TreeKind {
        &self.kind
    }

    /// Mixin nodes are invisible in typed navigation: they structure the
    /// generic tree but correspond to no typed path step of their own.
    pub fn is_mixin(&self) -> bool {
        matches!(
            self.kind,
            TreeKind::Choice
                | TreeKind::Case
                | TreeKind::ListWhole { .. }
                | TreeKind::LeafListWhole
        )
    }

    /// True only for keyed list entries. Leaf-list entries carry a value
    /// predicate instead of a key and are reported separately.
    pub fn is_keyed_entry(&self) -> bool {
        matches!(self.kind, TreeKind::ListEntry { keyed: true })
    }

    /// Resolves a child of this node by path segment, building and caching
    /// the child node on first access.
    pub fn child_of(&self, segment: &PathSegment) -> Option<Arc<SchemaTreeNode>> {
        if let Some(found) = self.children.read().get(segment) {
            return Some(found.clone());
        }
        let built = self.build_child(segment)?;
        let mut children = self.children.write();
        Some(
            children
                .entry(segment.clone())
                .or_insert(built)
                .clone(),
        )
    }

    fn build_child(&self, segment: &PathSegment) -> Option<Arc<SchemaTreeNode>> {
        match segment {
            PathSegment::Node(qname) => self.build_named_child(qname),
            PathSegment::KeyedEntry { name, .. } => {
                let TreeKind::ListWhole { keyed } = self.kind else {
                    return None;
                };
                if self.schema.qname() != name || !keyed {
                    return None;
                }
                Some(SchemaTreeNode::new(
                    self.schema.clone(),
                    TreeKind::ListEntry { keyed: true },
                ))
            }
            PathSegment::ValueEntry { name, .. } => {
                if self.kind != TreeKind::LeafListWhole || self.schema.qname() != name {
                    return None;
                }
                Some(SchemaTreeNode::new(
                    self.schema.clone(),
                    TreeKind::LeafListEntry,
                ))
            }
            PathSegment::Augment(id) => {
                if !self.schema.augments().contains(id) {
                    return None;
                }
                Some(SchemaTreeNode::new(
                    self.schema.clone(),
                    TreeKind::Augment(id.clone()),
                ))
            }
        }
    }

    fn build_named_child(&self, qname: &QName) -> Option<Arc<SchemaTreeNode>> {
        match &self.kind {
            // An unkeyed-list-as-whole addresses entries positionally, a
            // leaf node has no children at all.
            TreeKind::Leaf | TreeKind::LeafListWhole | TreeKind::LeafListEntry => None,
            TreeKind::ListWhole { keyed: false } => {
                // Entries of an unkeyed list reuse the list name.
                if self.schema.qname() == qname {
                    Some(SchemaTreeNode::new(
                        self.schema.clone(),
                        TreeKind::ListEntry { keyed: false },
                    ))
                } else {
                    None
                }
            }
            TreeKind::ListWhole { keyed: true } => None,
            TreeKind::Choice => {
                // Naming a case directly yields the case node; naming a
                // case's child descends through the case transparently.
                if let Some(case) = self.schema.child(qname) {
                    return Some(SchemaTreeNode::new(case.clone(), TreeKind::Case));
                }
                for case in self.schema.children().values() {
                    if let Some(child) = case.child(qname) {
                        return Some(node_for(child.clone()));
                    }
                }
                None
            }
            TreeKind::Augment(id) => {
                if !id.contains(qname) {
                    return None;
                }
                self.schema.child(qname).map(|c| node_for(c.clone()))
            }
            TreeKind::Container | TreeKind::Case | TreeKind::ListEntry { .. } => {
                self.schema.child(qname).map(|c| node_for(c.clone()))
            }
        }
    }
}

fn node_for(schema: Arc<SchemaNode>) -> Arc<SchemaTreeNode> {
    let kind = match schema.kind() {
        SchemaKind::Container { .. } => TreeKind::Container,
        SchemaKind::List { keys, .. } => TreeKind::ListWhole {
            keyed: !keys.is_empty(),
        },
        SchemaKind::Leaf { .. } => TreeKind::Leaf,
        SchemaKind::LeafList { .. } => TreeKind::LeafListWhole,
        SchemaKind::Choice => TreeKind::Choice,
        SchemaKind::Case => TreeKind::Case,
    };
    SchemaTreeNode::new(schema, kind)
}

/// The schema context tree, rooted at the synthetic schema root.
pub struct SchemaTree {
    root: Arc<SchemaTreeNode>,
}

impl SchemaTree {
    pub fn new(root: Arc<SchemaNode>) -> Self {
        Self {
            root: SchemaTreeNode::new(root, TreeKind::Container),
        }
    }

    pub fn root(&self) -> &Arc<SchemaTreeNode> {
        &self.root
    }

    /// Resolves a whole generic path from the root.
    pub fn resolve(&self, segments: &[PathSegment]) -> Option<Arc<SchemaTreeNode>> {
        let mut current = self.root.clone();
        for segment in segments {
            current = current.child_of(segment)?;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::qname::ModuleId;
    use crate::model::schema::SchemaType;
    use crate::model::value::Value;
    use std::collections::BTreeMap;

    fn qname(local: &str) -> QName {
        QName::new(ModuleId::new("urn:test", None), local)
    }

    fn root() -> SchemaTree {
        let endpoint = SchemaNode::list(
            qname("endpoint"),
            vec![qname("id")],
            vec![SchemaNode::leaf(qname("id"), SchemaType::Int32)],
        );
        let transport = SchemaNode::choice(
            qname("transport"),
            vec![SchemaNode::case(
                qname("tcp"),
                vec![SchemaNode::leaf(qname("port"), SchemaType::Uint16)],
            )],
        );
        let tags = SchemaNode::leaf_list(qname("tags"), SchemaType::String);
        let inventory =
            SchemaNode::container(qname("inventory"), vec![endpoint, transport, tags]);
        SchemaTree::new(Arc::new(SchemaNode::container(
            qname("(root)"),
            vec![inventory],
        )))
    }

    #[test]
    fn list_whole_and_entry_are_distinct() {
        let tree = root();
        let inventory = tree
            .root()
            .child_of(&PathSegment::Node(qname("inventory")))
            .unwrap();
        let whole = inventory
            .child_of(&PathSegment::Node(qname("endpoint")))
            .unwrap();
        assert!(whole.is_mixin());
        assert!(!whole.is_keyed_entry());

        let mut predicates = BTreeMap::new();
        predicates.insert(qname("id"), Value::Int32(1));
        let entry = whole
            .child_of(&PathSegment::keyed(qname("endpoint"), predicates))
            .unwrap();
        assert!(entry.is_keyed_entry());
        assert!(!entry.is_mixin());
    }

    #[test]
    fn choice_descends_transparently() {
        let tree = root();
        let inventory = tree
            .root()
            .child_of(&PathSegment::Node(qname("inventory")))
            .unwrap();
        let choice = inventory
            .child_of(&PathSegment::Node(qname("transport")))
            .unwrap();
        assert_eq!(choice.kind(), &TreeKind::Choice);
        let port = choice.child_of(&PathSegment::Node(qname("port"))).unwrap();
        assert_eq!(port.kind(), &TreeKind::Leaf);
    }

    #[test]
    fn leaf_list_entry_requires_value_predicate() {
        let tree = root();
        let tags = tree
            .resolve(&[
                PathSegment::Node(qname("inventory")),
                PathSegment::Node(qname("tags")),
            ])
            .unwrap();
        assert_eq!(tags.kind(), &TreeKind::LeafListWhole);
        assert!(tags.child_of(&PathSegment::Node(qname("tags"))).is_none());
        let entry = tags
            .child_of(&PathSegment::ValueEntry {
                name: qname("tags"),
                value: Value::string("blue"),
            })
            .unwrap();
        assert_eq!(entry.kind(), &TreeKind::LeafListEntry);
    }

    #[test]
    fn repeated_lookup_reuses_cached_node() {
        let tree = root();
        let first = tree
            .root()
            .child_of(&PathSegment::Node(qname("inventory")))
            .unwrap();
        let second = tree
            .root()
            .child_of(&PathSegment::Node(qname("inventory")))
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn racing_lookups_adopt_one_winner() {
        use rayon::prelude::*;

        let tree = root();
        let nodes: Vec<_> = (0..64)
            .into_par_iter()
            .map(|_| {
                tree.root()
                    .child_of(&PathSegment::Node(qname("inventory")))
                    .unwrap()
            })
            .collect();
        assert!(nodes.iter().all(|node| Arc::ptr_eq(node, &nodes[0])));
    }
}
