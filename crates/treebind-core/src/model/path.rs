//! Generic and typed hierarchical path representations.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::model::qname::QName;
use crate::model::registry::TypeToken;
use crate::model::typed::ListKey;
use crate::model::value::Value;

/// Identity of an augmentation: the set of child names it contributes to its
/// target node. Augmentations are not separately named in the schema, so the
/// contributed-children set is the only stable handle.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AugmentId {
    children: BTreeSet<QName>,
}

impl AugmentId {
    pub fn new<I: IntoIterator<Item = QName>>(children: I) -> Self {
        Self {
            children: children.into_iter().collect(),
        }
    }

    pub fn children(&self) -> &BTreeSet<QName> {
        &self.children
    }

    pub fn contains(&self, qname: &QName) -> bool {
        self.children.contains(qname)
    }
}

impl fmt::Display for AugmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "augment{{")?;
        let mut first = true;
        for child in &self.children {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{child}")?;
            first = false;
        }
        write!(f, "}}")
    }
}

impl fmt::Debug for AugmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One segment of a generic hierarchical path.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PathSegment {
    /// A plain child: leaf, container, choice, or a list/leaf-list as a
    /// whole collection.
    Node(QName),
    /// A keyed list entry, carrying its key predicates.
    KeyedEntry {
        name: QName,
        predicates: BTreeMap<QName, Value>,
    },
    /// A leaf-list entry, carrying its value.
    ValueEntry { name: QName, value: Value },
    /// An augmentation boundary grouping several schema children.
    Augment(AugmentId),
}

impl PathSegment {
    pub fn keyed(name: QName, predicates: BTreeMap<QName, Value>) -> Self {
        PathSegment::KeyedEntry { name, predicates }
    }

    /// The qualified name of this segment, absent for augmentations.
    pub fn name(&self) -> Option<&QName> {
        match self {
            PathSegment::Node(name) => Some(name),
            PathSegment::KeyedEntry { name, .. } => Some(name),
            PathSegment::ValueEntry { name, .. } => Some(name),
            PathSegment::Augment(_) => None,
        }
    }

    pub fn predicates(&self) -> Option<&BTreeMap<QName, Value>> {
        match self {
            PathSegment::KeyedEntry { predicates, .. } => Some(predicates),
            _ => None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Node(name) => write!(f, "{name}"),
            PathSegment::KeyedEntry { name, predicates } => {
                write!(f, "{name}")?;
                for (key, value) in predicates {
                    write!(f, "[{}={value}]", key.local())?;
                }
                Ok(())
            }
            PathSegment::ValueEntry { name, value } => write!(f, "{name}[.={value}]"),
            PathSegment::Augment(id) => write!(f, "{id}"),
        }
    }
}

impl fmt::Debug for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A generic hierarchical path: a sequence of [`PathSegment`]s rooted at the
/// schema root.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct GenericPath {
    segments: Vec<PathSegment>,
}

impl GenericPath {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of<I: IntoIterator<Item = PathSegment>>(segments: I) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn child(&self, segment: PathSegment) -> GenericPath {
        let mut segments = self.segments.clone();
        segments.push(segment);
        GenericPath { segments }
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.segments.push(segment);
    }
}

impl fmt::Display for GenericPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for GenericPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// One step of a typed hierarchical path: the generated type addressed,
/// optionally anchored through a specific case type (for grouping-derived
/// choice members) and optionally narrowed by a list key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypedPathStep {
    type_token: TypeToken,
    case: Option<TypeToken>,
    key: Option<ListKey>,
}

impl TypedPathStep {
    pub fn new(type_token: TypeToken) -> Self {
        Self {
            type_token,
            case: None,
            key: None,
        }
    }

    pub fn keyed(type_token: TypeToken, key: ListKey) -> Self {
        Self {
            type_token,
            case: None,
            key: Some(key),
        }
    }

    pub fn via_case(mut self, case: TypeToken) -> Self {
        self.case = Some(case);
        self
    }

    pub fn type_token(&self) -> &TypeToken {
        &self.type_token
    }

    pub fn case(&self) -> Option<&TypeToken> {
        self.case.as_ref()
    }

    pub fn key(&self) -> Option<&ListKey> {
        self.key.as_ref()
    }
}

impl fmt::Debug for TypedPathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_token)?;
        if let Some(case) = &self.case {
            write!(f, " (via {case})")?;
        }
        if let Some(key) = &self.key {
            write!(f, "{key:?}")?;
        }
        Ok(())
    }
}

/// A typed hierarchical path: the binding-side mirror of [`GenericPath`].
/// Mixin segments (choice, case, list-as-whole) never appear here.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct TypedPath {
    steps: Vec<TypedPathStep>,
}

impl TypedPath {
    pub fn of<I: IntoIterator<Item = TypedPathStep>>(steps: I) -> Self {
        Self {
            steps: steps.into_iter().collect(),
        }
    }

    pub fn steps(&self) -> &[TypedPathStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push(&mut self, step: TypedPathStep) {
        self.steps.push(step);
    }

    pub fn last(&self) -> Option<&TypedPathStep> {
        self.steps.last()
    }
}

impl fmt::Debug for TypedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for step in &self.steps {
            write!(f, "/{step:?}")?;
        }
        Ok(())
    }
}
