//! Choice contexts: routing between a choice and its case contexts.
//!
//! Cases are looked up three ways: by case type token, by the qname of a
//! case child and by the type token of a case child. A child qname claimed
//! by several cases is resolved to the first candidate in canonical token
//! order, with a warning logged once per child; a child token claimed by
//! several cases is treated as unindexable. Case types instantiated from a
//! grouping under a different choice are substitution candidates: they are
//! matched to the instantiated case carrying the same child-qname signature
//! and aliased to it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::codec::node::DataObjectNode;
use crate::codec::TreeCtx;
use crate::errors::CodecResult;
use crate::model::qname::QName;
use crate::model::registry::{AccessorShape, TypeDescriptor, TypeToken};
use crate::model::schema::SchemaNode;

#[derive(Default, PartialEq)]
enum IndexState {
    #[default]
    Uninitialized,
    Ready,
}

#[derive(Default)]
struct ChoiceIndex {
    state: IndexState,
    by_case_token: HashMap<TypeToken, Arc<DataObjectNode>>,
    unambiguous_by_qname: HashMap<QName, Arc<DataObjectNode>>,
    /// Candidates in canonical (token) order.
    ambiguous_by_qname: HashMap<QName, Vec<Arc<DataObjectNode>>>,
    by_child_token: HashMap<TypeToken, Arc<DataObjectNode>>,
}

/// Codec context of one choice.
pub struct ChoiceCodecNode {
    ctx: Arc<TreeCtx>,
    descriptor: Arc<TypeDescriptor>,
    schema: Arc<SchemaNode>,
    index: RwLock<ChoiceIndex>,
    warned: Mutex<HashSet<QName>>,
}

impl ChoiceCodecNode {
    pub(crate) fn new(
        ctx: Arc<TreeCtx>,
        descriptor: Arc<TypeDescriptor>,
        schema: Arc<SchemaNode>,
    ) -> CodecResult<Arc<Self>> {
        Ok(Arc::new(Self {
            ctx,
            descriptor,
            schema,
            index: RwLock::new(ChoiceIndex::default()),
            warned: Mutex::new(HashSet::new()),
        }))
    }

    pub fn token(&self) -> &TypeToken {
        self.descriptor.token()
    }

    pub fn qname(&self) -> &QName {
        self.schema.qname()
    }

    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// The case context for a case type, following substitution aliases.
    pub fn case_by_token(&self, case_token: &TypeToken) -> Option<Arc<DataObjectNode>> {
        self.lookup(|index| index.by_case_token.get(case_token).cloned())
    }

    /// The case context owning a child with the given qname. Ambiguous
    /// names resolve to the first case in canonical order.
    pub fn case_for_child_qname(&self, qname: &QName) -> Option<Arc<DataObjectNode>> {
        if let Some(found) = self.lookup(|index| index.unambiguous_by_qname.get(qname).cloned()) {
            return Some(found);
        }
        let chosen = self.lookup(|index| {
            index
                .ambiguous_by_qname
                .get(qname)
                .and_then(|candidates| candidates.first())
                .cloned()
        })?;
        if self.warned.lock().insert(qname.clone()) {
            warn!(
                choice = %self.token(),
                child = %qname,
                case = %chosen.token(),
                "child name is claimed by multiple cases, using the first in canonical order"
            );
        }
        Some(chosen)
    }

    /// The case context owning a child of the given type, unambiguous only.
    pub fn case_for_child_token(&self, token: &TypeToken) -> Option<Arc<DataObjectNode>> {
        self.lookup(|index| index.by_child_token.get(token).cloned())
    }

    /// All instantiated case contexts, in canonical token order.
    pub fn cases(&self) -> Vec<Arc<DataObjectNode>> {
        self.ensure_loaded();
        let index = self.index.read();
        let mut unique: Vec<Arc<DataObjectNode>> = Vec::new();
        for case in index.by_case_token.values() {
            if !unique.iter().any(|known| Arc::ptr_eq(known, case)) {
                unique.push(case.clone());
            }
        }
        unique.sort_by(|a, b| a.token().cmp(b.token()));
        unique
    }

    fn lookup<T>(&self, find: impl Fn(&ChoiceIndex) -> Option<T>) -> Option<T> {
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

    fn reload(&self) {
        let mut index = self.index.write();
        self.populate(&mut index);
        index.state = IndexState::Ready;
    }

    fn populate(&self, index: &mut ChoiceIndex) {
        let bound = self.ctx.registry.cases_bound_to(self.token());
        let mut substitutes: Vec<Arc<TypeDescriptor>> = Vec::new();

        for descriptor in &bound {
            if index.by_case_token.contains_key(descriptor.token()) {
                continue;
            }
            let Some(case_qname) = descriptor.qname() else {
                continue;
            };
            let Some(case_schema) = self.schema.child(case_qname) else {
                substitutes.push(descriptor.clone());
                continue;
            };
            let node = match DataObjectNode::new(
                self.ctx.clone(),
                descriptor.clone(),
                case_schema.clone(),
            ) {
                Ok(node) => node,
                Err(_) => continue,
            };
            index
                .by_case_token
                .insert(descriptor.token().clone(), node.clone());
            self.index_case_children(index, descriptor, &node);
        }

        // Non-instantiated candidates alias the instantiated case with the
        // same structural signature.
        for candidate in substitutes {
            if index.by_case_token.contains_key(candidate.token()) {
                continue;
            }
            let signature = candidate.child_signature();
            let matched = index
                .by_case_token
                .values()
                .find(|case| case.descriptor().child_signature() == signature)
                .cloned();
            if let Some(case) = matched {
                index.by_case_token.insert(candidate.token().clone(), case);
            }
        }
    }

    fn index_case_children(
        &self,
        index: &mut ChoiceIndex,
        descriptor: &TypeDescriptor,
        node: &Arc<DataObjectNode>,
    ) {
        for accessor in descriptor.accessors() {
            let qname = accessor.qname.clone();
            if let Some(candidates) = index.ambiguous_by_qname.get_mut(&qname) {
                if !candidates.iter().any(|c| Arc::ptr_eq(c, node)) {
                    candidates.push(node.clone());
                    candidates.sort_by(|a, b| a.token().cmp(b.token()));
                }
            } else if let Some(existing) = index.unambiguous_by_qname.remove(&qname) {
                if Arc::ptr_eq(&existing, node) {
                    index.unambiguous_by_qname.insert(qname, existing);
                } else {
                    let mut candidates = vec![existing, node.clone()];
                    candidates.sort_by(|a, b| a.token().cmp(b.token()));
                    index.ambiguous_by_qname.insert(qname, candidates);
                }
            } else {
                index.unambiguous_by_qname.insert(qname, node.clone());
            }

            let child_token = match &accessor.shape {
                AccessorShape::Container { type_token }
                | AccessorShape::Choice { type_token } => Some(type_token.clone()),
                AccessorShape::List { entry } => Some(entry.clone()),
                _ => None,
            };
            if let Some(child_token) = child_token {
                match index.by_child_token.get(&child_token) {
                    Some(existing) if !Arc::ptr_eq(existing, node) => {
                        // Ambiguous across cases: drop from the index.
                        index.by_child_token.remove(&child_token);
                    }
                    Some(_) => {}
                    None => {
                        index.by_child_token.insert(child_token, node.clone());
                    }
                }
            }
        }
    }
}
