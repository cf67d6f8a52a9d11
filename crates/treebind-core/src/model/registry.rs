//! The generated-type shape contract and the runtime type registry.
//!
//! The source-code generator itself is out of scope; what the codec consumes
//! is the *shape* of generated types: one accessor per schema child, a key
//! type with a constructor taking arguments in alphabetical-by-accessor-name
//! order, one type per case and choice, and marker types for augmentations
//! and identities. [`TypeDescriptor`] captures exactly that shape and
//! [`TypeRegistry`] plays the role of the loader resolving type tokens to
//! descriptors, growing monotonically as more generated types are seen.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use tracing::debug;

use crate::model::qname::{ModuleId, QName};

/// Interned identifier of one generated type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeToken(Arc<str>);

impl TypeToken {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shape of a single accessor's value.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum ValueShape {
    /// A primitive scalar carried through unchanged.
    Builtin,
    /// A generated value type: enumeration, bits, union, derived scalar,
    /// identity marker or structural reference.
    Typed(TypeToken),
}

/// Shape of a single accessor declared on a generated data type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum AccessorShape {
    Leaf { value: ValueShape },
    LeafList { value: ValueShape },
    Container { type_token: TypeToken },
    List { entry: TypeToken },
    Choice { type_token: TypeToken },
}

/// One accessor: a generated method reading one schema child.
#[derive(Clone, Debug)]
pub struct Accessor {
    pub name: Arc<str>,
    pub qname: QName,
    pub shape: AccessorShape,
}

impl Accessor {
    pub fn new(name: impl Into<Arc<str>>, qname: QName, shape: AccessorShape) -> Self {
        Self {
            name: name.into(),
            qname,
            shape,
        }
    }
}

/// One field of a generated key type, in constructor order.
#[derive(Clone, Debug)]
pub struct KeyField {
    pub name: Arc<str>,
    pub qname: QName,
}

/// One generated enumeration variant correlated with its declared symbol.
#[derive(Clone, Debug)]
pub struct EnumVariant {
    pub name: Arc<str>,
    pub symbol: Arc<str>,
}

/// One generated bit-field member correlated with its declared bit name.
#[derive(Clone, Debug)]
pub struct BitField {
    pub name: Arc<str>,
    pub bit: Arc<str>,
}

/// One union member, in schema declaration order.
#[derive(Clone, Debug)]
pub struct UnionMember {
    pub name: Arc<str>,
    pub value: ValueShape,
}

/// A constraint enforced by a derived scalar's constructor.
#[derive(Clone, Debug)]
pub enum Constraint {
    Range { min: i128, max: i128 },
    Length { min: u64, max: u64 },
    Pattern { regex: Regex },
}

impl Constraint {
    pub fn description(&self) -> String {
        match self {
            Constraint::Range { min, max } => format!("range {min}..={max}"),
            Constraint::Length { min, max } => format!("length {min}..={max}"),
            Constraint::Pattern { regex } => format!("pattern {}", regex.as_str()),
        }
    }
}

/// The kind-specific payload of a [`TypeDescriptor`].
#[derive(Clone, Debug)]
pub enum TypeKind {
    Container {
        qname: QName,
        accessors: Vec<Accessor>,
    },
    ListEntry {
        qname: QName,
        accessors: Vec<Accessor>,
        key: Option<TypeToken>,
    },
    Choice {
        qname: QName,
        cases: Vec<TypeToken>,
    },
    Case {
        qname: QName,
        choice: TypeToken,
        accessors: Vec<Accessor>,
    },
    Key {
        list: TypeToken,
        fields: Vec<KeyField>,
    },
    Augmentation {
        target: TypeToken,
        accessors: Vec<Accessor>,
    },
    Enum {
        variants: Vec<EnumVariant>,
    },
    Bits {
        fields: Vec<BitField>,
    },
    Scalar {
        constraints: Vec<Constraint>,
    },
    Union {
        members: Vec<UnionMember>,
    },
    Identity {
        qname: QName,
    },
}

/// Runtime description of one generated type: the reflection surface the
/// codec dispatches on.
#[derive(Clone, Debug)]
pub struct TypeDescriptor {
    token: TypeToken,
    module: ModuleId,
    kind: TypeKind,
}

impl TypeDescriptor {
    pub fn new(token: TypeToken, module: ModuleId, kind: TypeKind) -> Self {
        let kind = match kind {
            // Constructor order of key types is alphabetical by accessor
            // name, regardless of the order fields were supplied in.
            TypeKind::Key { list, mut fields } => {
                fields.sort_by(|a, b| a.name.cmp(&b.name));
                TypeKind::Key { list, fields }
            }
            other => other,
        };
        Self {
            token,
            module,
            kind,
        }
    }

    pub fn token(&self) -> &TypeToken {
        &self.token
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// The schema node this data type instantiates, if it has one.
    pub fn qname(&self) -> Option<&QName> {
        match &self.kind {
            TypeKind::Container { qname, .. }
            | TypeKind::ListEntry { qname, .. }
            | TypeKind::Choice { qname, .. }
            | TypeKind::Case { qname, .. }
            | TypeKind::Identity { qname } => Some(qname),
            _ => None,
        }
    }

    /// Declared accessors of a data container type.
    pub fn accessors(&self) -> &[Accessor] {
        match &self.kind {
            TypeKind::Container { accessors, .. }
            | TypeKind::ListEntry { accessors, .. }
            | TypeKind::Case { accessors, .. }
            | TypeKind::Augmentation { accessors, .. } => accessors,
            _ => &[],
        }
    }

    pub fn accessor(&self, name: &str) -> Option<&Accessor> {
        self.accessors().iter().find(|a| &*a.name == name)
    }

    /// Canonical structural signature: the set of schema children this type
    /// reads. Used to match substitution candidates across grouping
    /// instantiations.
    pub fn child_signature(&self) -> BTreeSet<QName> {
        self.accessors().iter().map(|a| a.qname.clone()).collect()
    }
}

#[derive(Default)]
struct RegistryIndex {
    types: HashMap<TypeToken, Arc<TypeDescriptor>>,
    by_qname: HashMap<QName, TypeToken>,
    augments_by_target: HashMap<TypeToken, Vec<TypeToken>>,
    cases_by_choice: HashMap<TypeToken, Vec<TypeToken>>,
    identities: HashMap<QName, TypeToken>,
}

/// Registry of generated-type descriptors, keyed by [`TypeToken`].
///
/// The registry grows monotonically: descriptors may be registered after the
/// codec tree has been built (the loader analogue of late class loading),
/// which is how lazily-discovered augmentations become visible. Existing
/// entries are never replaced.
#[derive(Default)]
pub struct TypeRegistry {
    index: RwLock<RegistryIndex>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor, returning the retained one. Losing a
    /// registration race is harmless: the first registration wins and the
    /// duplicate is discarded.
    pub fn register(&self, descriptor: TypeDescriptor) -> Arc<TypeDescriptor> {
        let mut index = self.index.write();
        if let Some(existing) = index.types.get(descriptor.token()) {
            return existing.clone();
        }
        let descriptor = Arc::new(descriptor);
        let token = descriptor.token().clone();
        match descriptor.kind() {
            TypeKind::Augmentation { target, .. } => {
                index
                    .augments_by_target
                    .entry(target.clone())
                    .or_default()
                    .push(token.clone());
            }
            TypeKind::Case { choice, .. } => {
                index
                    .cases_by_choice
                    .entry(choice.clone())
                    .or_default()
                    .push(token.clone());
            }
            TypeKind::Identity { qname } => {
                index.identities.insert(qname.clone(), token.clone());
            }
            TypeKind::Container { qname, .. }
            | TypeKind::ListEntry { qname, .. }
            | TypeKind::Choice { qname, .. } => {
                index
                    .by_qname
                    .entry(qname.clone())
                    .or_insert_with(|| token.clone());
            }
            _ => {}
        }
        debug!(token = %token, "registered type descriptor");
        index.types.insert(token, descriptor.clone());
        descriptor
    }

    pub fn get(&self, token: &TypeToken) -> Option<Arc<TypeDescriptor>> {
        self.index.read().types.get(token).cloned()
    }

    /// Resolves an instantiated data type by the schema node it binds.
    pub fn token_for_qname(&self, qname: &QName) -> Option<TypeToken> {
        self.index.read().by_qname.get(qname).cloned()
    }

    /// All augmentation descriptors currently registered against `target`.
    pub fn augmentations_of(&self, target: &TypeToken) -> Vec<Arc<TypeDescriptor>> {
        let index = self.index.read();
        index
            .augments_by_target
            .get(target)
            .map(|tokens| {
                tokens
                    .iter()
                    .filter_map(|t| index.types.get(t).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All case descriptors bound to `choice`, including non-instantiated
    /// grouping-derived candidates.
    pub fn cases_bound_to(&self, choice: &TypeToken) -> Vec<Arc<TypeDescriptor>> {
        let index = self.index.read();
        index
            .cases_by_choice
            .get(choice)
            .map(|tokens| {
                tokens
                    .iter()
                    .filter_map(|t| index.types.get(t).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolves an identity's qualified name to its generated marker type.
    pub fn identity_token(&self, qname: &QName) -> Option<TypeToken> {
        self.index.read().identities.get(qname).cloned()
    }
}
