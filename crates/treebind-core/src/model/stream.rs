//! The event-stream protocol for producing generic trees.
//!
//! Serialization never assembles nodes by hand; it emits a well-nested
//! sequence of start/leaf/end events into a [`StreamWriter`]. [`TreeWriter`]
//! is the canonical sink, assembling an immutable [`GenericNode`] tree and
//! rejecting duplicate children at the same level.
//!
//! Cases are transparent: `start_case` opens a scope whose children land
//! directly under the enclosing choice, and its matching `end_node` emits
//! no node of its own.

use std::collections::BTreeMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::errors::{CodecError, CodecResult};
use crate::model::node::{
    AugmentData, BranchData, GenericNode, KeyedListData, ListEntryData, UnkeyedListData,
};
use crate::model::path::{AugmentId, PathSegment};
use crate::model::qname::QName;
use crate::model::value::Value;

/// Receiver of generic-tree construction events. Events must be well nested:
/// every `start_*` is closed by a matching [`StreamWriter::end_node`].
pub trait StreamWriter {
    fn start_container(&mut self, name: QName) -> CodecResult<()>;
    fn start_choice(&mut self, name: QName) -> CodecResult<()>;
    fn start_case(&mut self, name: QName) -> CodecResult<()>;
    fn start_keyed_list(&mut self, name: QName, user_ordered: bool) -> CodecResult<()>;
    fn start_list_entry(
        &mut self,
        name: QName,
        predicates: BTreeMap<QName, Value>,
    ) -> CodecResult<()>;
    fn start_unkeyed_list(&mut self, name: QName) -> CodecResult<()>;
    fn start_leaf_set(&mut self, name: QName) -> CodecResult<()>;
    fn leaf_set_entry(&mut self, value: Value) -> CodecResult<()>;
    fn start_augmentation(&mut self, id: AugmentId) -> CodecResult<()>;
    fn leaf(&mut self, name: QName, value: Value) -> CodecResult<()>;
    fn end_node(&mut self) -> CodecResult<()>;

    /// Emits a whole leaf-list in one call.
    fn leaf_set(&mut self, name: QName, entries: Vec<Value>) -> CodecResult<()> {
        self.start_leaf_set(name)?;
        for entry in entries {
            self.leaf_set_entry(entry)?;
        }
        self.end_node()
    }
}

enum Frame {
    Container {
        name: QName,
        children: IndexMap<PathSegment, GenericNode>,
    },
    Choice {
        name: QName,
        children: IndexMap<PathSegment, GenericNode>,
    },
    /// Transparent: children are handed to the enclosing frame on end.
    Case {
        name: QName,
        children: IndexMap<PathSegment, GenericNode>,
    },
    KeyedList {
        name: QName,
        user_ordered: bool,
        entries: IndexMap<PathSegment, GenericNode>,
    },
    ListEntry {
        name: QName,
        predicates: BTreeMap<QName, Value>,
        children: IndexMap<PathSegment, GenericNode>,
    },
    UnkeyedList {
        name: QName,
        entries: Vec<GenericNode>,
    },
    LeafSet {
        name: QName,
        entries: Vec<Value>,
    },
    Augment {
        id: AugmentId,
        children: IndexMap<PathSegment, GenericNode>,
    },
}

impl Frame {
    fn label(&self) -> String {
        match self {
            Frame::Container { name, .. }
            | Frame::Choice { name, .. }
            | Frame::Case { name, .. }
            | Frame::KeyedList { name, .. }
            | Frame::ListEntry { name, .. }
            | Frame::UnkeyedList { name, .. }
            | Frame::LeafSet { name, .. } => name.to_string(),
            Frame::Augment { id, .. } => id.to_string(),
        }
    }
}

/// Assembles a [`GenericNode`] tree from stream events.
#[derive(Default)]
pub struct TreeWriter {
    stack: Vec<Frame>,
    root: Option<GenericNode>,
}

impl TreeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The completed root node. Fails when no tree was written or a frame
    /// is still open.
    pub fn finish(self) -> CodecResult<GenericNode> {
        if let Some(open) = self.stack.last() {
            return Err(CodecError::IncorrectNesting {
                child: "(end of stream)".to_string(),
                parent: open.label(),
            });
        }
        self.root.ok_or_else(|| CodecError::IncorrectNesting {
            child: "(empty stream)".to_string(),
            parent: "(root)".to_string(),
        })
    }

    fn push(&mut self, frame: Frame) -> CodecResult<()> {
        if self.stack.is_empty() && self.root.is_some() {
            return Err(CodecError::IncorrectNesting {
                child: frame.label(),
                parent: "(completed tree)".to_string(),
            });
        }
        if let Some(Frame::LeafSet { name, .. }) = self.stack.last() {
            return Err(CodecError::IncorrectNesting {
                child: frame.label(),
                parent: name.to_string(),
            });
        }
        self.stack.push(frame);
        Ok(())
    }

    fn attach(&mut self, node: GenericNode) -> CodecResult<()> {
        let Some(parent) = self.stack.last_mut() else {
            if self.root.is_some() {
                return Err(CodecError::IncorrectNesting {
                    child: node.to_string(),
                    parent: "(completed tree)".to_string(),
                });
            }
            self.root = Some(node);
            return Ok(());
        };
        match parent {
            Frame::Container { children, .. }
            | Frame::Choice { children, .. }
            | Frame::Case { children, .. }
            | Frame::ListEntry { children, .. }
            | Frame::Augment { children, .. } => {
                let segment = node.segment();
                if children.contains_key(&segment) {
                    return Err(duplicate(&segment));
                }
                children.insert(segment, node);
            }
            Frame::KeyedList { entries, .. } => {
                let segment = node.segment();
                if entries.contains_key(&segment) {
                    return Err(duplicate(&segment));
                }
                entries.insert(segment, node);
            }
            Frame::UnkeyedList { entries, .. } => entries.push(node),
            Frame::LeafSet { name, .. } => {
                return Err(CodecError::IncorrectNesting {
                    child: node.to_string(),
                    parent: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn duplicate(segment: &PathSegment) -> CodecError {
    match segment.name() {
        Some(name) => CodecError::DuplicateChild {
            qname: name.clone(),
        },
        None => CodecError::IncorrectNesting {
            child: segment.to_string(),
            parent: "(duplicate augmentation)".to_string(),
        },
    }
}

impl StreamWriter for TreeWriter {
    fn start_container(&mut self, name: QName) -> CodecResult<()> {
        self.push(Frame::Container {
            name,
            children: IndexMap::new(),
        })
    }

    fn start_choice(&mut self, name: QName) -> CodecResult<()> {
        self.push(Frame::Choice {
            name,
            children: IndexMap::new(),
        })
    }

    fn start_case(&mut self, name: QName) -> CodecResult<()> {
        self.push(Frame::Case {
            name,
            children: IndexMap::new(),
        })
    }

    fn start_keyed_list(&mut self, name: QName, user_ordered: bool) -> CodecResult<()> {
        self.push(Frame::KeyedList {
            name,
            user_ordered,
            entries: IndexMap::new(),
        })
    }

    fn start_list_entry(
        &mut self,
        name: QName,
        predicates: BTreeMap<QName, Value>,
    ) -> CodecResult<()> {
        self.push(Frame::ListEntry {
            name,
            predicates,
            children: IndexMap::new(),
        })
    }

    fn start_unkeyed_list(&mut self, name: QName) -> CodecResult<()> {
        self.push(Frame::UnkeyedList {
            name,
            entries: Vec::new(),
        })
    }

    fn start_leaf_set(&mut self, name: QName) -> CodecResult<()> {
        self.push(Frame::LeafSet {
            name,
            entries: Vec::new(),
        })
    }

    fn leaf_set_entry(&mut self, value: Value) -> CodecResult<()> {
        match self.stack.last_mut() {
            Some(Frame::LeafSet { entries, .. }) => {
                entries.push(value);
                Ok(())
            }
            other => Err(CodecError::IncorrectNesting {
                child: value.to_string(),
                parent: other
                    .map(|frame| frame.label())
                    .unwrap_or_else(|| "(no open node)".to_string()),
            }),
        }
    }

    fn start_augmentation(&mut self, id: AugmentId) -> CodecResult<()> {
        self.push(Frame::Augment {
            id,
            children: IndexMap::new(),
        })
    }

    fn leaf(&mut self, name: QName, value: Value) -> CodecResult<()> {
        self.attach(GenericNode::leaf(name, value))
    }

    fn end_node(&mut self) -> CodecResult<()> {
        let Some(frame) = self.stack.pop() else {
            return Err(CodecError::IncorrectNesting {
                child: "end".to_string(),
                parent: "(no open node)".to_string(),
            });
        };
        let node = match frame {
            Frame::Container { name, children } => {
                GenericNode::Container(Arc::new(BranchData { name, children }))
            }
            Frame::Choice { name, children } => {
                GenericNode::Choice(Arc::new(BranchData { name, children }))
            }
            Frame::Case { children, .. } => {
                // Transparent: hoist the case's children into the parent.
                for (_, child) in children {
                    self.attach(child)?;
                }
                return Ok(());
            }
            Frame::KeyedList {
                name,
                user_ordered,
                entries,
            } => GenericNode::KeyedList(Arc::new(KeyedListData {
                name,
                entries,
                user_ordered,
            })),
            Frame::ListEntry {
                name,
                predicates,
                children,
            } => GenericNode::ListEntry(Arc::new(ListEntryData {
                name,
                predicates,
                children,
            })),
            Frame::UnkeyedList { name, entries } => {
                GenericNode::UnkeyedList(Arc::new(UnkeyedListData { name, entries }))
            }
            Frame::LeafSet { name, entries } => GenericNode::leaf_set(name, entries),
            Frame::Augment { id, children } => {
                GenericNode::Augmentation(Arc::new(AugmentData { id, children }))
            }
        };
        self.attach(node)
    }
}

/// Convenience wrapper running a serialization closure against a fresh
/// [`TreeWriter`] and returning the built tree.
pub fn build_tree<F>(write: F) -> CodecResult<GenericNode>
where
    F: FnOnce(&mut TreeWriter) -> CodecResult<()>,
{
    let mut writer = TreeWriter::new();
    write(&mut writer)?;
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::qname::ModuleId;

    fn qname(local: &str) -> QName {
        QName::new(ModuleId::new("urn:test", None), local)
    }

    #[test]
    fn builds_nested_tree() {
        let tree = build_tree(|w| {
            w.start_container(qname("box"))?;
            w.leaf(qname("name"), Value::string("alpha"))?;
            w.start_keyed_list(qname("entry"), false)?;
            let mut predicates = BTreeMap::new();
            predicates.insert(qname("id"), Value::Int32(1));
            w.start_list_entry(qname("entry"), predicates)?;
            w.leaf(qname("id"), Value::Int32(1))?;
            w.end_node()?;
            w.end_node()?;
            w.end_node()
        })
        .unwrap();

        assert_eq!(tree.name(), Some(&qname("box")));
        let list = tree.child_by_name(&qname("entry")).unwrap();
        assert!(matches!(list, GenericNode::KeyedList(_)));
    }

    #[test]
    fn case_children_land_under_the_choice() {
        let tree = build_tree(|w| {
            w.start_container(qname("box"))?;
            w.start_choice(qname("transport"))?;
            w.start_case(qname("tcp"))?;
            w.leaf(qname("port"), Value::Uint16(8080))?;
            w.end_node()?; // case: emits nothing
            w.end_node()?; // choice
            w.end_node()
        })
        .unwrap();

        let choice = tree.child_by_name(&qname("transport")).unwrap();
        assert!(matches!(choice, GenericNode::Choice(_)));
        let port = choice.child_by_name(&qname("port")).unwrap();
        assert_eq!(port.value(), Some(&Value::Uint16(8080)));
    }

    #[test]
    fn leaf_set_collects_entries() {
        let tree = build_tree(|w| {
            w.start_container(qname("box"))?;
            w.leaf_set(
                qname("tags"),
                vec![Value::string("a"), Value::string("b")],
            )?;
            w.end_node()
        })
        .unwrap();
        let tags = tree.child_by_name(&qname("tags")).unwrap();
        assert!(matches!(tags, GenericNode::LeafSet(_)));
    }

    #[test]
    fn rejects_duplicate_leaf() {
        let err = build_tree(|w| {
            w.start_container(qname("box"))?;
            w.leaf(qname("name"), Value::string("a"))?;
            w.leaf(qname("name"), Value::string("b"))?;
            w.end_node()
        })
        .unwrap_err();
        assert!(matches!(err, CodecError::DuplicateChild { .. }));
    }

    #[test]
    fn rejects_unbalanced_stream() {
        let mut writer = TreeWriter::new();
        writer.start_container(qname("box")).unwrap();
        let err = writer.finish().unwrap_err();
        assert!(matches!(err, CodecError::IncorrectNesting { .. }));
    }

    #[test]
    fn rejects_duplicate_keyed_entry() {
        let err = build_tree(|w| {
            w.start_keyed_list(qname("entry"), false)?;
            for _ in 0..2 {
                let mut predicates = BTreeMap::new();
                predicates.insert(qname("id"), Value::Int32(7));
                w.start_list_entry(qname("entry"), predicates)?;
                w.end_node()?;
            }
            w.end_node()
        })
        .unwrap_err();
        assert!(matches!(err, CodecError::DuplicateChild { .. }));
    }

    #[test]
    fn rejects_leaf_inside_leaf_set() {
        let err = build_tree(|w| {
            w.start_leaf_set(qname("tags"))?;
            w.leaf(qname("oops"), Value::string("x"))?;
            w.end_node()
        })
        .unwrap_err();
        assert!(matches!(err, CodecError::IncorrectNesting { .. }));
    }
}
