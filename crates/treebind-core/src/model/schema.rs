//! The read-only schema context consumed by the codec tree.
//!
//! This is the external collaborator contract for the schema model: enough
//! structure to navigate children, resolve types, keys, defaults, identities
//! and augmentation declarations. How the schema got here (parsing,
//! resolution) is out of scope.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::path::AugmentId;
use crate::model::qname::{ModuleId, QName};
use crate::model::value::Value;

/// A schema-described value type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SchemaType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Decimal { fraction_digits: u8 },
    String,
    Binary,
    Empty,
    Enumeration { symbols: Vec<Arc<str>> },
    Bits { names: Vec<Arc<str>> },
    Union { members: Vec<SchemaType> },
    IdentityRef { base: QName },
    InstanceIdentifier,
}

/// Kind-specific payload of a schema node.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SchemaKind {
    Container {
        presence: bool,
    },
    List {
        /// Key leaf names in declared order; empty means unkeyed.
        keys: Vec<QName>,
        user_ordered: bool,
    },
    Leaf {
        value_type: SchemaType,
        default: Option<Value>,
    },
    LeafList {
        value_type: SchemaType,
        user_ordered: bool,
    },
    /// Children are the cases.
    Choice,
    Case,
}

/// One node of the schema tree. A node may be reachable through multiple
/// schema paths when groupings are reused; comparisons therefore go through
/// structural equality, never identity.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SchemaNode {
    qname: QName,
    kind: SchemaKind,
    children: IndexMap<QName, Arc<SchemaNode>>,
    augments: Vec<AugmentId>,
}

impl SchemaNode {
    pub fn new<I>(qname: QName, kind: SchemaKind, children: I) -> Self
    where
        I: IntoIterator<Item = SchemaNode>,
    {
        Self {
            qname,
            kind,
            children: children
                .into_iter()
                .map(|child| (child.qname.clone(), Arc::new(child)))
                .collect(),
            augments: Vec::new(),
        }
    }

    pub fn container(qname: QName, children: Vec<SchemaNode>) -> Self {
        Self::new(qname, SchemaKind::Container { presence: false }, children)
    }

    pub fn presence_container(qname: QName, children: Vec<SchemaNode>) -> Self {
        Self::new(qname, SchemaKind::Container { presence: true }, children)
    }

    pub fn list(qname: QName, keys: Vec<QName>, children: Vec<SchemaNode>) -> Self {
        Self::new(
            qname,
            SchemaKind::List {
                keys,
                user_ordered: false,
            },
            children,
        )
    }

    pub fn leaf(qname: QName, value_type: SchemaType) -> Self {
        Self::new(
            qname,
            SchemaKind::Leaf {
                value_type,
                default: None,
            },
            Vec::new(),
        )
    }

    pub fn leaf_with_default(qname: QName, value_type: SchemaType, default: Value) -> Self {
        Self::new(
            qname,
            SchemaKind::Leaf {
                value_type,
                default: Some(default),
            },
            Vec::new(),
        )
    }

    pub fn leaf_list(qname: QName, value_type: SchemaType) -> Self {
        Self::new(
            qname,
            SchemaKind::LeafList {
                value_type,
                user_ordered: false,
            },
            Vec::new(),
        )
    }

    pub fn choice(qname: QName, cases: Vec<SchemaNode>) -> Self {
        Self::new(qname, SchemaKind::Choice, cases)
    }

    pub fn case(qname: QName, children: Vec<SchemaNode>) -> Self {
        Self::new(qname, SchemaKind::Case, children)
    }

    /// Records an augmentation contributing `children` to this node. The
    /// children themselves must already be present in the child map; the
    /// declaration only groups them.
    pub fn with_augment<I: IntoIterator<Item = SchemaNode>>(mut self, children: I) -> Self {
        let mut names = BTreeSet::new();
        for child in children {
            names.insert(child.qname.clone());
            self.children
                .insert(child.qname.clone(), Arc::new(child));
        }
        self.augments.push(AugmentId::new(names));
        self
    }

    pub fn qname(&self) -> &QName {
        &self.qname
    }

    pub fn kind(&self) -> &SchemaKind {
        &self.kind
    }

    /// Direct children in declared order, augmented children included.
    pub fn children(&self) -> &IndexMap<QName, Arc<SchemaNode>> {
        &self.children
    }

    pub fn child(&self, qname: &QName) -> Option<&Arc<SchemaNode>> {
        self.children.get(qname)
    }

    /// Augmentations declared against this node.
    pub fn augments(&self) -> &[AugmentId] {
        &self.augments
    }

    /// The augmentation declaration containing `qname`, if any.
    pub fn augment_of(&self, qname: &QName) -> Option<&AugmentId> {
        self.augments.iter().find(|augment| augment.contains(qname))
    }

    pub fn is_choice(&self) -> bool {
        matches!(self.kind, SchemaKind::Choice)
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, SchemaKind::List { .. })
    }

    /// Key names in schema-declared order for a keyed list.
    pub fn key_order(&self) -> &[QName] {
        match &self.kind {
            SchemaKind::List { keys, .. } => keys,
            _ => &[],
        }
    }

    pub fn value_type(&self) -> Option<&SchemaType> {
        match &self.kind {
            SchemaKind::Leaf { value_type, .. } => Some(value_type),
            SchemaKind::LeafList { value_type, .. } => Some(value_type),
            _ => None,
        }
    }

    pub fn default_value(&self) -> Option<&Value> {
        match &self.kind {
            SchemaKind::Leaf { default, .. } => default.as_ref(),
            _ => None,
        }
    }
}

/// One declared identity and its direct bases.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Identity {
    pub qname: QName,
    pub bases: Vec<QName>,
}

/// The active schema context: a set of modules, a tree of schema nodes and
/// an identity registry. Effectively immutable for the lifetime of any
/// codec tree built over it.
#[derive(Debug)]
pub struct SchemaContext {
    modules: BTreeSet<ModuleId>,
    root: Arc<SchemaNode>,
    identities: BTreeMap<QName, Identity>,
}

impl SchemaContext {
    pub fn new<M, T, I>(modules: M, top_level: T, identities: I) -> Self
    where
        M: IntoIterator<Item = ModuleId>,
        T: IntoIterator<Item = SchemaNode>,
        I: IntoIterator<Item = Identity>,
    {
        let modules: BTreeSet<ModuleId> = modules.into_iter().collect();
        let root_module = modules
            .iter()
            .next()
            .cloned()
            .unwrap_or_else(|| ModuleId::new("", None));
        let root = SchemaNode::container(
            QName::new(root_module, "(root)"),
            top_level.into_iter().collect(),
        );
        Self {
            modules,
            root: Arc::new(root),
            identities: identities
                .into_iter()
                .map(|identity| (identity.qname.clone(), identity))
                .collect(),
        }
    }

    /// The synthetic root node holding all top-level schema children.
    pub fn root(&self) -> &Arc<SchemaNode> {
        &self.root
    }

    pub fn has_module(&self, module: &ModuleId) -> bool {
        self.modules.contains(module)
    }

    pub fn identity(&self, qname: &QName) -> Option<&Identity> {
        self.identities.get(qname)
    }

    /// True when `derived` is `base` or transitively derived from it.
    pub fn identity_derives_from(&self, derived: &QName, base: &QName) -> bool {
        if derived == base {
            return true;
        }
        let Some(identity) = self.identities.get(derived) else {
            return false;
        };
        identity
            .bases
            .iter()
            .any(|parent| self.identity_derives_from(parent, base))
    }
}
